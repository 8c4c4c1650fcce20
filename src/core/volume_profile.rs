// Composite volume profile built from per-session histograms.
//
// Every set_data call rebuilds the whole snapshot from its input and swaps
// it in; readers holding the previous Arc keep a consistent view.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::candle::Candle;
use super::error::{ChartError, ChartResult};
use super::indicator::{field_name, SeriesRole};

/// One price bucket of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfileBin {
    pub price: f64,
    #[serde(rename = "vol", alias = "volume")]
    pub volume: f64,
    #[serde(alias = "lowBound")]
    pub low_bound: f64,
    #[serde(alias = "highBound")]
    pub high_bound: f64,
    #[serde(rename = "in_va", alias = "inValueArea", default)]
    pub in_value_area: bool,
}

impl VolumeProfileBin {
    pub fn new(price: f64, volume: f64, low_bound: f64, high_bound: f64, in_value_area: bool) -> Self {
        Self {
            price,
            volume,
            low_bound,
            high_bound,
            in_value_area,
        }
    }
}

/// One session's histogram as produced upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfileSession {
    pub time: i64,
    #[serde(rename = "profile", alias = "bins")]
    pub bins: Vec<VolumeProfileBin>,
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
}

impl VolumeProfileSession {
    /// Extract the session embedded in a candle under indicator `id`.
    ///
    /// `Ok(None)` when the candle carries no profile for this indicator.
    /// The profile payload is either a JSON string or an array of bins.
    pub fn from_candle(candle: &Candle, id: &str) -> ChartResult<Option<Self>> {
        let raw = match candle.field(&field_name(id, SeriesRole::Profile)) {
            None | Some(Value::Null) => return Ok(None),
            Some(raw) => raw,
        };

        let parsed = match raw {
            Value::String(s) => serde_json::from_str::<Vec<VolumeProfileBin>>(s),
            other => serde_json::from_value::<Vec<VolumeProfileBin>>(other.clone()),
        };
        let bins = parsed.map_err(|e| ChartError::malformed_profile(id, candle.time, e.to_string()))?;

        let level = |role| candle.field_f64(&field_name(id, role)).unwrap_or(0.0);
        Ok(Some(Self {
            time: candle.time,
            bins,
            poc: level(SeriesRole::Poc),
            vah: level(SeriesRole::Vah),
            val: level(SeriesRole::Val),
        }))
    }

    /// Collect every parsable session from a buffer; malformed ones are
    /// logged and skipped.
    pub fn collect(candles: &[Candle], id: &str) -> Vec<Self> {
        candles
            .iter()
            .filter_map(|c| match Self::from_candle(c, id) {
                Ok(session) => session,
                Err(e) => {
                    log::warn!("Skipping volume profile session: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Merged histogram across sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedProfile {
    pub bins: Vec<VolumeProfileBin>,
    pub max_volume: f64,
    pub poc_price: f64,
}

impl AggregatedProfile {
    /// Nothing to draw
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty() || self.max_volume <= 0.0
    }

    pub fn total_volume(&self) -> f64 {
        self.bins.iter().map(|b| b.volume).sum()
    }

    pub fn bin_at(&self, price: f64) -> Option<&VolumeProfileBin> {
        self.bins.iter().find(|b| b.price == price)
    }
}

/// How value-area membership is decided after merging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueAreaMode {
    /// A merged bin is in the value area if any contributing session said so
    #[default]
    CarryForward,
    /// Re-derive from merged volumes, expanding outward from the POC
    Recompute,
}

pub const DEFAULT_VALUE_AREA_RATIO: f64 = 0.70;

/// Owns the composite profile of one VP indicator
#[derive(Debug, Clone)]
pub struct VolumeProfileAggregator {
    mode: ValueAreaMode,
    value_area_ratio: f64,
    snapshot: Arc<AggregatedProfile>,
}

impl VolumeProfileAggregator {
    pub fn new(mode: ValueAreaMode, value_area_ratio: f64) -> Self {
        Self {
            mode,
            value_area_ratio,
            snapshot: Arc::new(AggregatedProfile::default()),
        }
    }

    pub fn mode(&self) -> ValueAreaMode {
        self.mode
    }

    /// Rebuild the composite from `sessions`, replacing any prior result
    pub fn set_data(&mut self, sessions: &[VolumeProfileSession]) -> Arc<AggregatedProfile> {
        let mut profile = merge_sessions(sessions);
        if self.mode == ValueAreaMode::Recompute {
            recompute_value_area(&mut profile, self.value_area_ratio);
        }
        log::debug!(
            "Aggregated {} sessions into {} bins (poc {}, max {})",
            sessions.len(),
            profile.bins.len(),
            profile.poc_price,
            profile.max_volume
        );
        self.snapshot = Arc::new(profile);
        Arc::clone(&self.snapshot)
    }

    /// Current read-only snapshot
    pub fn profile(&self) -> Arc<AggregatedProfile> {
        Arc::clone(&self.snapshot)
    }

    pub fn clear(&mut self) {
        self.snapshot = Arc::new(AggregatedProfile::default());
    }
}

impl Default for VolumeProfileAggregator {
    fn default() -> Self {
        Self::new(ValueAreaMode::default(), DEFAULT_VALUE_AREA_RATIO)
    }
}

/// Merge bins by exact price; first-seen order is kept
fn merge_sessions(sessions: &[VolumeProfileSession]) -> AggregatedProfile {
    let mut index: HashMap<OrderedFloat<f64>, usize> = HashMap::new();
    let mut bins: Vec<VolumeProfileBin> = Vec::new();

    for bin in sessions.iter().flat_map(|s| s.bins.iter()) {
        match index.get(&OrderedFloat(bin.price)) {
            Some(&i) => {
                let existing = &mut bins[i];
                existing.volume += bin.volume;
                existing.in_value_area = existing.in_value_area || bin.in_value_area;
            }
            None => {
                index.insert(OrderedFloat(bin.price), bins.len());
                bins.push(bin.clone());
            }
        }
    }

    let mut max_volume = 0.0;
    let mut poc_price = 0.0;
    for bin in &bins {
        // strict comparison: first bin wins ties
        if bin.volume > max_volume {
            max_volume = bin.volume;
            poc_price = bin.price;
        }
    }

    AggregatedProfile {
        bins,
        max_volume,
        poc_price,
    }
}

/// Mark the contiguous band around the POC holding `ratio` of total volume
fn recompute_value_area(profile: &mut AggregatedProfile, ratio: f64) {
    let total = profile.total_volume();
    for bin in profile.bins.iter_mut() {
        bin.in_value_area = false;
    }
    if total <= 0.0 {
        return;
    }

    let mut order: Vec<usize> = (0..profile.bins.len()).collect();
    order.sort_by(|&a, &b| profile.bins[a].price.total_cmp(&profile.bins[b].price));

    let Some(poc) = order
        .iter()
        .position(|&i| profile.bins[i].price == profile.poc_price)
    else {
        return;
    };

    let target = total * ratio.clamp(0.0, 1.0);
    let volume_at = |pos: usize| profile.bins[order[pos]].volume;
    let (mut lo, mut hi) = (poc, poc);
    let mut covered = volume_at(poc);

    while covered < target && (lo > 0 || hi + 1 < order.len()) {
        let up = (hi + 1 < order.len()).then(|| volume_at(hi + 1));
        let down = (lo > 0).then(|| volume_at(lo - 1));
        match (up, down) {
            (Some(u), Some(d)) if d > u => {
                lo -= 1;
                covered += d;
            }
            (Some(u), _) => {
                hi += 1;
                covered += u;
            }
            (None, Some(d)) => {
                lo -= 1;
                covered += d;
            }
            (None, None) => break,
        }
    }

    for &i in &order[lo..=hi] {
        profile.bins[i].in_value_area = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(time: i64, bins: &[(f64, f64, bool)]) -> VolumeProfileSession {
        VolumeProfileSession {
            time,
            bins: bins
                .iter()
                .map(|&(p, v, va)| VolumeProfileBin::new(p, v, p - 0.5, p + 0.5, va))
                .collect(),
            poc: 0.0,
            vah: 0.0,
            val: 0.0,
        }
    }

    #[test]
    fn test_two_session_scenario() {
        let mut agg = VolumeProfileAggregator::default();
        let profile = agg.set_data(&[
            session(1, &[(100.0, 5.0, true)]),
            session(2, &[(100.0, 7.0, false)]),
        ]);

        assert_eq!(profile.bins.len(), 1);
        assert_eq!(profile.bins[0].volume, 12.0);
        assert!(profile.bins[0].in_value_area);
        assert_eq!(profile.poc_price, 100.0);
        assert_eq!(profile.max_volume, 12.0);
    }

    #[test]
    fn test_empty_input() {
        let mut agg = VolumeProfileAggregator::default();
        let profile = agg.set_data(&[]);
        assert!(profile.bins.is_empty());
        assert_eq!(profile.max_volume, 0.0);
        assert_eq!(profile.poc_price, 0.0);
        assert!(profile.is_empty());
    }

    #[test]
    fn test_poc_first_wins_on_tie() {
        let mut agg = VolumeProfileAggregator::default();
        let profile = agg.set_data(&[session(1, &[(101.0, 4.0, false), (99.0, 4.0, false), (100.0, 1.0, true)])]);
        assert_eq!(profile.poc_price, 101.0);
    }

    #[test]
    fn test_set_data_replaces_wholesale() {
        let mut agg = VolumeProfileAggregator::default();
        let first = agg.set_data(&[session(1, &[(100.0, 5.0, true)])]);
        let second = agg.set_data(&[session(1, &[(100.0, 5.0, true)])]);

        // no accumulation across calls, and the earlier snapshot is untouched
        assert_eq!(second.bins[0].volume, 5.0);
        assert_eq!(first.bins[0].volume, 5.0);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_recompute_value_area() {
        let mut agg = VolumeProfileAggregator::new(ValueAreaMode::Recompute, 0.7);
        let profile = agg.set_data(&[session(
            1,
            &[
                (98.0, 1.0, true),
                (99.0, 10.0, false),
                (100.0, 40.0, false),
                (101.0, 30.0, false),
                (102.0, 19.0, true),
            ],
        )]);

        let in_va: Vec<f64> = profile
            .bins
            .iter()
            .filter(|b| b.in_value_area)
            .map(|b| b.price)
            .collect();
        // 40 + 30 = 70 of 100
        assert_eq!(in_va, vec![100.0, 101.0]);
        assert_eq!(profile.poc_price, 100.0);
    }

    #[test]
    fn test_session_from_candle_string_and_array() {
        let bins = json!([{"price": 10.0, "vol": 2.0, "low_bound": 9.5, "high_bound": 10.5, "in_va": true}]);
        let as_string = Candle::new(5, 1.0, 1.0, 1.0, 1.0, 1.0)
            .with_field("vp_profile", bins.to_string())
            .with_field("vp_poc", 10.0);
        let as_array = Candle::new(6, 1.0, 1.0, 1.0, 1.0, 1.0).with_field("vp_profile", bins);

        let a = VolumeProfileSession::from_candle(&as_string, "vp").unwrap().unwrap();
        let b = VolumeProfileSession::from_candle(&as_array, "vp").unwrap().unwrap();
        assert_eq!(a.bins, b.bins);
        assert_eq!(a.poc, 10.0);
        assert_eq!(b.time, 6);
    }

    #[test]
    fn test_malformed_session_is_skipped() {
        let good = Candle::new(1, 1.0, 1.0, 1.0, 1.0, 1.0).with_field(
            "vp_profile",
            json!([{"price": 1.0, "vol": 1.0, "low_bound": 0.5, "high_bound": 1.5, "in_va": false}]),
        );
        let bad = Candle::new(2, 1.0, 1.0, 1.0, 1.0, 1.0).with_field("vp_profile", "{not json");
        let none = Candle::new(3, 1.0, 1.0, 1.0, 1.0, 1.0);

        assert!(matches!(
            VolumeProfileSession::from_candle(&bad, "vp"),
            Err(ChartError::MalformedProfile { time: 2, .. })
        ));
        let sessions = VolumeProfileSession::collect(&[good, bad, none], "vp");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].time, 1);
    }
}
