use serde::Serialize;
use std::collections::BTreeMap;

use crate::chart::registrar::{IndicatorRegistrar, SeriesGroup, SeriesGroupKind};
use crate::core::SeriesRole;

/// Legend values of one indicator at the crosshair time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LegendValue {
    Single {
        val: f64,
    },
    Levels {
        prev_high: Option<f64>,
        prev_low: Option<f64>,
    },
    Band {
        upper: Option<f64>,
        middle: Option<f64>,
        lower: Option<f64>,
    },
    Macd {
        macd: Option<f64>,
        signal: Option<f64>,
        hist: Option<f64>,
    },
    Profile {
        poc: f64,
        max_volume: f64,
    },
}

/// Indicator id to legend values, rebuilt on every crosshair move
pub type CrosshairSnapshot = BTreeMap<String, LegendValue>;

/// Snapshot at `time`; `None` (pointer left the pane) yields an empty map.
///
/// Indicators with no value at that time are left out; FVG markers have
/// no legend entry.
pub fn build_snapshot(registrar: &IndicatorRegistrar, time: Option<i64>) -> CrosshairSnapshot {
    let mut snapshot = CrosshairSnapshot::new();
    let Some(time) = time else {
        return snapshot;
    };

    for group in registrar.groups() {
        if let Some(value) = legend_value(group, time) {
            snapshot.insert(group.id().to_string(), value);
        }
    }
    snapshot
}

fn legend_value(group: &SeriesGroup, time: i64) -> Option<LegendValue> {
    let at = |role: SeriesRole| group.series_by_role(role).and_then(|s| s.value_at(time));

    let value = match group.kind() {
        SeriesGroupKind::Single { value } => LegendValue::Single {
            val: value.value_at(time)?,
        },
        SeriesGroupKind::Dual { .. } => LegendValue::Levels {
            prev_high: at(SeriesRole::PrevHigh),
            prev_low: at(SeriesRole::PrevLow),
        },
        SeriesGroupKind::Triple { .. } => LegendValue::Band {
            upper: at(SeriesRole::Upper),
            middle: at(SeriesRole::Middle),
            lower: at(SeriesRole::Lower),
        },
        SeriesGroupKind::LineHistogram { .. } => LegendValue::Macd {
            macd: at(SeriesRole::Macd),
            signal: at(SeriesRole::Signal),
            hist: at(SeriesRole::Hist),
        },
        SeriesGroupKind::MarkerSet { .. } => return None,
        SeriesGroupKind::Primitive { aggregator, .. } => {
            let profile = aggregator.profile();
            if profile.is_empty() {
                return None;
            }
            LegendValue::Profile {
                poc: profile.poc_price,
                max_volume: profile.max_volume,
            }
        }
    };

    if value.is_blank() {
        None
    } else {
        Some(value)
    }
}

impl LegendValue {
    /// No component has a value
    pub fn is_blank(&self) -> bool {
        match self {
            LegendValue::Single { .. } | LegendValue::Profile { .. } => false,
            LegendValue::Levels { prev_high, prev_low } => prev_high.is_none() && prev_low.is_none(),
            LegendValue::Band { upper, middle, lower } => {
                upper.is_none() && middle.is_none() && lower.is_none()
            }
            LegendValue::Macd { macd, signal, hist } => macd.is_none() && signal.is_none() && hist.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::registrar::GroupStyle;
    use crate::core::{Candle, IndicatorSpec, IndicatorType, Rgba};
    use serde_json::json;

    fn registrar() -> IndicatorRegistrar {
        let candles = vec![
            Candle::new(1, 1.0, 1.0, 1.0, 1.0, 1.0)
                .with_field("rsi", 55.0)
                .with_field("bb_upper", 3.0)
                .with_field("bb_middle", 2.0)
                .with_field("bb_lower", 1.0),
            Candle::new(2, 1.0, 1.0, 1.0, 1.0, 1.0).with_field("bb_upper", 4.0),
        ];
        let mut reg = IndicatorRegistrar::new(GroupStyle::default());
        for (id, t) in [("rsi", IndicatorType::Rsi), ("bb", IndicatorType::Bb), ("fvg", IndicatorType::Fvg)] {
            reg.add(IndicatorSpec::with_id(id, t, BTreeMap::new(), Rgba::rgb(1, 1, 1)), &candles)
                .unwrap();
        }
        reg
    }

    #[test]
    fn test_snapshot_values() {
        let snapshot = build_snapshot(&registrar(), Some(1));
        assert_eq!(snapshot.get("rsi"), Some(&LegendValue::Single { val: 55.0 }));
        assert_eq!(
            snapshot.get("bb"),
            Some(&LegendValue::Band {
                upper: Some(3.0),
                middle: Some(2.0),
                lower: Some(1.0)
            })
        );
        assert!(!snapshot.contains_key("fvg"));
    }

    #[test]
    fn test_sparse_time_omits_entries() {
        let snapshot = build_snapshot(&registrar(), Some(2));
        assert!(!snapshot.contains_key("rsi"));
        let bb = serde_json::to_value(snapshot.get("bb").unwrap()).unwrap();
        assert_eq!(bb, json!({ "upper": 4.0, "middle": null, "lower": null }));
    }

    #[test]
    fn test_pointer_left_gives_empty() {
        assert!(build_snapshot(&registrar(), None).is_empty());
    }
}
