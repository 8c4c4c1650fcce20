// Indicator lifecycle: reconciles the desired indicator set against live
// series groups. Groups for ids that stay in the set are never recreated.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::config::{ChartConfig, MarkerConfig, SeriesStyleConfig, VolumeProfileConfig};
use crate::core::{
    field_name, AggregatedProfile, Candle, ChartError, ChartResult, IndicatorSpec, Marker, PaneKind,
    Rgba, Series, SeriesId, SeriesKey, SeriesKind, SeriesPoint, SeriesRole, SeriesShape,
    VolumeProfileAggregator, VolumeProfileSession,
};

/// Rendering handles of one indicator, shaped by its type
#[derive(Debug, Clone)]
pub enum SeriesGroupKind {
    Single {
        value: Series,
    },
    Dual {
        high: Series,
        low: Series,
    },
    Triple {
        upper: Series,
        middle: Series,
        lower: Series,
    },
    LineHistogram {
        macd: Series,
        signal: Series,
        hist: Series,
    },
    MarkerSet {
        markers: Vec<Marker>,
    },
    Primitive {
        aggregator: VolumeProfileAggregator,
        sessions: Vec<VolumeProfileSession>,
    },
}

/// All handles bound to one indicator spec
#[derive(Debug, Clone)]
pub struct SeriesGroup {
    spec: IndicatorSpec,
    kind: SeriesGroupKind,
}

impl SeriesGroup {
    pub fn spec(&self) -> &IndicatorSpec {
        &self.spec
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn kind(&self) -> &SeriesGroupKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut SeriesGroupKind {
        &mut self.kind
    }

    pub fn pane(&self) -> PaneKind {
        self.spec.pane()
    }

    /// Continuous series in role order
    pub fn series(&self) -> Vec<&Series> {
        match &self.kind {
            SeriesGroupKind::Single { value } => vec![value],
            SeriesGroupKind::Dual { high, low } => vec![high, low],
            SeriesGroupKind::Triple { upper, middle, lower } => vec![upper, middle, lower],
            SeriesGroupKind::LineHistogram { macd, signal, hist } => vec![macd, signal, hist],
            SeriesGroupKind::MarkerSet { .. } | SeriesGroupKind::Primitive { .. } => Vec::new(),
        }
    }

    pub(crate) fn series_mut(&mut self) -> Vec<&mut Series> {
        match &mut self.kind {
            SeriesGroupKind::Single { value } => vec![value],
            SeriesGroupKind::Dual { high, low } => vec![high, low],
            SeriesGroupKind::Triple { upper, middle, lower } => vec![upper, middle, lower],
            SeriesGroupKind::LineHistogram { macd, signal, hist } => vec![macd, signal, hist],
            SeriesGroupKind::MarkerSet { .. } | SeriesGroupKind::Primitive { .. } => Vec::new(),
        }
    }

    pub fn series_by_role(&self, role: SeriesRole) -> Option<&Series> {
        self.series().into_iter().find(|s| s.key().role == role)
    }

    /// Identity of every series handle owned by this group
    pub fn handle_ids(&self) -> Vec<SeriesId> {
        self.series().iter().map(|s| s.id()).collect()
    }

    pub fn markers(&self) -> &[Marker] {
        match &self.kind {
            SeriesGroupKind::MarkerSet { markers } => markers,
            _ => &[],
        }
    }

    /// Current composite profile for volume profile indicators
    pub fn profile(&self) -> Option<Arc<AggregatedProfile>> {
        match &self.kind {
            SeriesGroupKind::Primitive { aggregator, .. } => Some(aggregator.profile()),
            _ => None,
        }
    }

    /// Recolor in place after a spec color change
    fn set_color(&mut self, color: Rgba) {
        self.spec.color = color;
        for series in self.series_mut() {
            if series.key().role != SeriesRole::Signal {
                series.set_color(color);
            }
        }
    }

    /// Fill every handle from the candle buffer
    fn populate(&mut self, candles: &[Candle], style: &GroupStyle) {
        let id = self.spec.id.clone();
        if let SeriesGroupKind::MarkerSet { markers } = &mut self.kind {
            *markers = candles
                .iter()
                .flat_map(|c| fvg_markers(c, &id, &style.markers))
                .collect();
            return;
        }
        if let SeriesGroupKind::Primitive { aggregator, sessions } = &mut self.kind {
            *sessions = VolumeProfileSession::collect(candles, &id);
            aggregator.set_data(sessions);
            return;
        }
        for series in self.series_mut() {
            let points = build_points(candles, series.key(), &style.series);
            series.set_data(points);
        }
    }

    /// Drop everything older than `time`; returns how many items went
    fn retain_from(&mut self, time: i64) -> usize {
        if let SeriesGroupKind::MarkerSet { markers } = &mut self.kind {
            let before = markers.len();
            markers.retain(|m| m.time >= time);
            return before - markers.len();
        }
        if let SeriesGroupKind::Primitive { aggregator, sessions } = &mut self.kind {
            let before = sessions.len();
            sessions.retain(|s| s.time >= time);
            let dropped = before - sessions.len();
            if dropped > 0 {
                aggregator.set_data(sessions);
            }
            return dropped;
        }
        self.series_mut()
            .into_iter()
            .map(|series| series.truncate_before(time))
            .sum()
    }

    fn clear_data(&mut self) {
        if let SeriesGroupKind::MarkerSet { markers } = &mut self.kind {
            markers.clear();
            return;
        }
        if let SeriesGroupKind::Primitive { aggregator, sessions } = &mut self.kind {
            sessions.clear();
            aggregator.clear();
            return;
        }
        for series in self.series_mut() {
            series.clear();
        }
    }
}

/// Point for one record, or `None` when the field is absent
pub(crate) fn point_for(candle: &Candle, key: &SeriesKey, style: &SeriesStyleConfig) -> Option<SeriesPoint> {
    let value = candle.field_f64(&key.field())?;
    Some(if key.role.is_histogram() {
        SeriesPoint::colored(candle.time, value, histogram_color(value, style))
    } else {
        SeriesPoint::new(candle.time, value)
    })
}

/// Sign-based histogram bar color
pub fn histogram_color(value: f64, style: &SeriesStyleConfig) -> Rgba {
    if value >= 0.0 {
        style.hist_positive_color
    } else {
        style.hist_negative_color
    }
}

/// Point list for one series; records without the field are dropped
pub fn build_points(candles: &[Candle], key: &SeriesKey, style: &SeriesStyleConfig) -> Vec<SeriesPoint> {
    candles
        .iter()
        .filter_map(|c| point_for(c, key, style))
        .collect()
}

/// Directional markers from the `{id}_bull` / `{id}_bear` flags
pub fn fvg_markers(candle: &Candle, id: &str, style: &MarkerConfig) -> Vec<Marker> {
    let mut markers = Vec::new();
    if candle.field_bool(&field_name(id, SeriesRole::Bull)) == Some(true) {
        markers.push(Marker::up(candle.time, style.fvg_bull_color, "FVG"));
    }
    if candle.field_bool(&field_name(id, SeriesRole::Bear)) == Some(true) {
        markers.push(Marker::down(candle.time, style.fvg_bear_color, "FVG"));
    }
    markers
}

/// Styling shared by every group
#[derive(Debug, Clone, Default)]
pub struct GroupStyle {
    pub series: SeriesStyleConfig,
    pub markers: MarkerConfig,
    pub profile: VolumeProfileConfig,
}

impl GroupStyle {
    pub fn from_config(config: &ChartConfig) -> Self {
        Self {
            series: config.series.clone(),
            markers: config.markers.clone(),
            profile: config.volume_profile.clone(),
        }
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub kept: Vec<String>,
    /// Duplicates and type changes, left as they were
    pub rejected: Vec<String>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Owns every series group, keyed by indicator id
#[derive(Debug, Clone)]
pub struct IndicatorRegistrar {
    groups: BTreeMap<String, SeriesGroup>,
    next_series_id: u64,
    style: GroupStyle,
}

impl IndicatorRegistrar {
    pub fn new(style: GroupStyle) -> Self {
        Self {
            groups: BTreeMap::new(),
            next_series_id: 1,
            style,
        }
    }

    pub fn style(&self) -> &GroupStyle {
        &self.style
    }

    fn alloc_series(&mut self, id: &str, role: SeriesRole, color: Rgba) -> Series {
        let series_id = SeriesId(self.next_series_id);
        self.next_series_id += 1;
        let kind = if role.is_histogram() {
            SeriesKind::Histogram
        } else {
            SeriesKind::Line
        };
        let width = if kind == SeriesKind::Histogram { 1.0 } else { self.style.series.line_width };
        Series::new(series_id, SeriesKey::new(id, role), kind, color, width)
    }

    fn create_group(&mut self, spec: IndicatorSpec) -> SeriesGroup {
        let id = spec.id.clone();
        let color = spec.color;
        let kind = match spec.shape() {
            SeriesShape::Single => SeriesGroupKind::Single {
                value: self.alloc_series(&id, SeriesRole::Value, color),
            },
            SeriesShape::Dual => SeriesGroupKind::Dual {
                high: self.alloc_series(&id, SeriesRole::PrevHigh, color),
                low: self.alloc_series(&id, SeriesRole::PrevLow, color),
            },
            SeriesShape::Triple => SeriesGroupKind::Triple {
                upper: self.alloc_series(&id, SeriesRole::Upper, color),
                middle: self.alloc_series(&id, SeriesRole::Middle, color.with_alpha_factor(0.6)),
                lower: self.alloc_series(&id, SeriesRole::Lower, color),
            },
            SeriesShape::LineHistogram => {
                let signal_color = self.style.series.signal_color;
                SeriesGroupKind::LineHistogram {
                    macd: self.alloc_series(&id, SeriesRole::Macd, color),
                    signal: self.alloc_series(&id, SeriesRole::Signal, signal_color),
                    hist: self.alloc_series(&id, SeriesRole::Hist, color),
                }
            }
            SeriesShape::MarkerSet => SeriesGroupKind::MarkerSet { markers: Vec::new() },
            SeriesShape::Primitive => SeriesGroupKind::Primitive {
                aggregator: VolumeProfileAggregator::new(
                    self.style.profile.value_area_mode,
                    self.style.profile.value_area_ratio,
                ),
                sessions: Vec::new(),
            },
        };
        SeriesGroup { spec, kind }
    }

    /// Create the group for a new indicator and fill it from `candles`
    pub fn add(&mut self, spec: IndicatorSpec, candles: &[Candle]) -> ChartResult<&SeriesGroup> {
        if self.groups.contains_key(&spec.id) {
            return Err(ChartError::duplicate(spec.id));
        }
        let id = spec.id.clone();
        let mut group = self.create_group(spec);
        group.populate(candles, &self.style);
        log::info!(
            "Indicator added: {} ({}, {} pane)",
            id,
            group.spec.indicator_type,
            group.pane()
        );
        let group: &SeriesGroup = self.groups.entry(id).or_insert(group);
        Ok(group)
    }

    /// Destroy the group for `id`; false if it was already gone
    pub fn remove(&mut self, id: &str) -> bool {
        match self.groups.remove(id) {
            Some(group) => {
                log::info!("Indicator removed: {} ({} handles)", id, group.handle_ids().len());
                true
            }
            None => false,
        }
    }

    /// Bring live groups in line with the desired set
    pub fn reconcile(&mut self, desired: &[IndicatorSpec], candles: &[Candle]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let mut seen = HashSet::new();
        let mut wanted: Vec<&IndicatorSpec> = Vec::with_capacity(desired.len());
        for spec in desired {
            if seen.insert(spec.id.as_str()) {
                wanted.push(spec);
            } else {
                log::warn!("{}", ChartError::duplicate(spec.id.clone()));
                report.rejected.push(spec.id.clone());
            }
        }

        let to_remove: Vec<String> = self
            .groups
            .keys()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect();
        for id in to_remove {
            if self.remove(&id) {
                report.removed.push(id);
            }
        }

        for spec in wanted {
            match self.groups.get_mut(&spec.id) {
                Some(group) if group.spec.indicator_type != spec.indicator_type => {
                    let err = ChartError::TypeChange {
                        id: spec.id.clone(),
                        from: group.spec.indicator_type.to_string(),
                        to: spec.indicator_type.to_string(),
                    };
                    log::warn!("{}", err);
                    report.rejected.push(spec.id.clone());
                }
                Some(group) => {
                    if group.spec.color != spec.color {
                        group.set_color(spec.color);
                    }
                    group.spec.params = spec.params.clone();
                    report.kept.push(spec.id.clone());
                }
                None => match self.add(spec.clone(), candles) {
                    Ok(_) => report.added.push(spec.id.clone()),
                    Err(e) => {
                        log::warn!("{}", e);
                        report.rejected.push(spec.id.clone());
                    }
                },
            }
        }

        log::debug!(
            "Reconciled indicators: +{} -{} ={} !{}",
            report.added.len(),
            report.removed.len(),
            report.kept.len(),
            report.rejected.len()
        );
        report
    }

    /// Refill every group from a replaced buffer, keeping handles
    pub fn rebuild(&mut self, candles: &[Candle]) {
        let style = &self.style;
        for group in self.groups.values_mut() {
            group.populate(candles, style);
        }
    }

    /// Follow the buffer's sliding window: forget every point, marker and
    /// session older than `time`
    pub fn retain_from(&mut self, time: i64) -> usize {
        let dropped: usize = self.groups.values_mut().map(|g| g.retain_from(time)).sum();
        if dropped > 0 {
            log::trace!("Evicted {} items older than {}", dropped, time);
        }
        dropped
    }

    /// Drop data but keep the groups
    pub fn clear_data(&mut self) {
        for group in self.groups.values_mut() {
            group.clear_data();
        }
    }

    /// Destroy every group
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn group(&self, id: &str) -> Option<&SeriesGroup> {
        self.groups.get(id)
    }

    pub(crate) fn groups_mut(&mut self) -> impl Iterator<Item = &mut SeriesGroup> {
        self.groups.values_mut()
    }

    pub fn groups(&self) -> impl Iterator<Item = &SeriesGroup> {
        self.groups.values()
    }

    pub fn groups_in(&self, pane: PaneKind) -> impl Iterator<Item = &SeriesGroup> {
        self.groups.values().filter(move |g| g.pane() == pane)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    /// Oscillator slots needed in the secondary pane; MACD counts once
    pub fn oscillator_count(&self) -> usize {
        self.groups
            .values()
            .filter(|g| g.spec.indicator_type.is_oscillator())
            .count()
    }

    /// Markers synthesized from FVG flags, in group order
    pub fn synthesized_markers(&self) -> impl Iterator<Item = &Marker> {
        self.groups.values().flat_map(|g| g.markers().iter())
    }

    /// Composite profiles of every volume profile indicator
    pub fn profiles(&self) -> Vec<(&IndicatorSpec, Arc<AggregatedProfile>)> {
        self.groups
            .values()
            .filter_map(|g| g.profile().map(|p| (&g.spec, p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IndicatorType;

    fn spec(id: &str, t: IndicatorType) -> IndicatorSpec {
        IndicatorSpec::with_id(id, t, BTreeMap::new(), Rgba::rgb(10, 20, 30))
    }

    fn candles() -> Vec<Candle> {
        (1..=4)
            .map(|t| {
                let mut c = Candle::new(t, 1.0, 2.0, 0.5, 1.5, 10.0);
                if t > 1 {
                    c = c.with_field("ema_1", t as f64);
                }
                c.with_field("bb_1_upper", 3.0)
                    .with_field("bb_1_middle", 2.0)
                    .with_field("bb_1_lower", 1.0)
                    .with_field("macd_1_macd", 0.5)
                    .with_field("macd_1_signal", 0.25)
                    .with_field("macd_1_hist", if t % 2 == 0 { 0.25 } else { -0.25 })
                    .with_field("fvg_1_bull", t == 2)
                    .with_field("fvg_1_bear", t == 3)
            })
            .collect()
    }

    fn registrar() -> IndicatorRegistrar {
        IndicatorRegistrar::new(GroupStyle::default())
    }

    #[test]
    fn test_sparse_field_is_filtered() {
        let mut reg = registrar();
        let group = reg.add(spec("ema_1", IndicatorType::Ema), &candles()).unwrap();
        let series = group.series_by_role(SeriesRole::Value).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.points()[0].time, 2);
    }

    #[test]
    fn test_shapes_and_fields() {
        let mut reg = registrar();
        let data = candles();
        reg.add(spec("bb_1", IndicatorType::Bb), &data).unwrap();
        reg.add(spec("macd_1", IndicatorType::Macd), &data).unwrap();
        reg.add(spec("fvg_1", IndicatorType::Fvg), &data).unwrap();

        let bb = reg.group("bb_1").unwrap();
        assert_eq!(bb.series().len(), 3);
        assert_eq!(bb.series_by_role(SeriesRole::Lower).unwrap().value_at(1), Some(1.0));

        let macd = reg.group("macd_1").unwrap();
        let hist = macd.series_by_role(SeriesRole::Hist).unwrap();
        assert_eq!(hist.kind(), SeriesKind::Histogram);
        let style = SeriesStyleConfig::default();
        assert_eq!(hist.points()[0].color, Some(style.hist_negative_color));
        assert_eq!(hist.points()[1].color, Some(style.hist_positive_color));

        let fvg = reg.group("fvg_1").unwrap();
        assert_eq!(fvg.markers().len(), 2);
        assert_eq!(reg.oscillator_count(), 1);
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut reg = registrar();
        let first = reg.add(spec("ema_1", IndicatorType::Ema), &[]).unwrap().handle_ids();
        let err = reg.add(spec("ema_1", IndicatorType::Ema), &[]).unwrap_err();
        assert!(matches!(err, ChartError::DuplicateIndicator { .. }));
        assert_eq!(reg.group("ema_1").unwrap().handle_ids(), first);
    }

    #[test]
    fn test_reconcile_add_keep_remove() {
        let mut reg = registrar();
        let data = candles();
        let report = reg.reconcile(
            &[spec("ema_1", IndicatorType::Ema), spec("rsi_1", IndicatorType::Rsi)],
            &data,
        );
        assert_eq!(report.added, vec!["ema_1", "rsi_1"]);
        let ema_handles = reg.group("ema_1").unwrap().handle_ids();

        let report = reg.reconcile(&[spec("ema_1", IndicatorType::Ema)], &data);
        assert_eq!(report.removed, vec!["rsi_1"]);
        assert_eq!(report.kept, vec!["ema_1"]);
        assert!(report.added.is_empty());
        assert_eq!(reg.group("ema_1").unwrap().handle_ids(), ema_handles);
        assert!(reg.group("rsi_1").is_none());
    }

    #[test]
    fn test_reconcile_rejects_type_change_and_duplicates() {
        let mut reg = registrar();
        reg.reconcile(&[spec("x", IndicatorType::Ema)], &[]);
        let handles = reg.group("x").unwrap().handle_ids();

        let report = reg.reconcile(
            &[spec("x", IndicatorType::Bb), spec("y", IndicatorType::Atr), spec("y", IndicatorType::Atr)],
            &[],
        );
        assert_eq!(report.rejected, vec!["y", "x"]);
        assert_eq!(report.added, vec!["y"]);
        assert_eq!(reg.group("x").unwrap().spec().indicator_type, IndicatorType::Ema);
        assert_eq!(reg.group("x").unwrap().handle_ids(), handles);
    }

    #[test]
    fn test_color_change_keeps_handles() {
        let mut reg = registrar();
        reg.reconcile(&[spec("bb_1", IndicatorType::Bb)], &candles());
        let handles = reg.group("bb_1").unwrap().handle_ids();

        let mut recolored = spec("bb_1", IndicatorType::Bb);
        recolored.color = Rgba::rgb(1, 2, 3);
        let report = reg.reconcile(&[recolored], &candles());

        assert!(report.is_noop());
        let group = reg.group("bb_1").unwrap();
        assert_eq!(group.handle_ids(), handles);
        assert_eq!(group.series_by_role(SeriesRole::Upper).unwrap().color(), Rgba::rgb(1, 2, 3));
        assert_eq!(group.series_by_role(SeriesRole::Upper).unwrap().len(), 4);
    }

    #[test]
    fn test_rebuild_keeps_handles() {
        let mut reg = registrar();
        reg.add(spec("ema_1", IndicatorType::Ema), &candles()).unwrap();
        let handles = reg.group("ema_1").unwrap().handle_ids();

        reg.rebuild(&candles()[..2]);
        let group = reg.group("ema_1").unwrap();
        assert_eq!(group.handle_ids(), handles);
        assert_eq!(group.series()[0].len(), 1);
    }
}
