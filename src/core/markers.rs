use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::color::Rgba;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerPosition {
    AboveBar,
    BelowBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
}

/// Bar annotation handed to the price pane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub time: i64,
    pub position: MarkerPosition,
    pub color: Rgba,
    pub shape: MarkerShape,
    #[serde(default)]
    pub text: String,
}

impl Marker {
    /// Bullish marker below the bar
    pub fn up(time: i64, color: Rgba, text: impl Into<String>) -> Self {
        Self {
            time,
            position: MarkerPosition::BelowBar,
            color,
            shape: MarkerShape::ArrowUp,
            text: text.into(),
        }
    }

    /// Bearish marker above the bar
    pub fn down(time: i64, color: Rgba, text: impl Into<String>) -> Self {
        Self {
            time,
            position: MarkerPosition::AboveBar,
            color,
            shape: MarkerShape::ArrowDown,
            text: text.into(),
        }
    }

    pub fn key(&self) -> (i64, MarkerShape) {
        (self.time, self.shape)
    }
}

/// Merge externally supplied trade markers with synthesized ones.
///
/// Entries sharing `(time, shape)` collapse to the first seen, trade
/// markers taking precedence. The result is sorted ascending by time,
/// shape breaking ties, which is the only order the price pane accepts.
pub fn merge_markers<'a, I>(trade: &'a [Marker], synthesized: I) -> Vec<Marker>
where
    I: IntoIterator<Item = &'a Marker>,
{
    let mut seen = HashSet::new();
    let mut merged: Vec<Marker> = trade
        .iter()
        .chain(synthesized)
        .filter(|m| seen.insert(m.key()))
        .cloned()
        .collect();
    merged.sort_by_key(|m| m.key());
    merged
}
