// Indicator configuration types and the field-naming contract between the
// upstream indicator computation and the chart.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::color::Rgba;

/// Indicator kinds the chart knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorType {
    Ema,
    Rsi,
    Vwap,
    Macd,
    Bb,
    Atr,
    Fvg,
    DailyLevels,
    Vp,
}

impl IndicatorType {
    pub const ALL: [IndicatorType; 9] = [
        IndicatorType::Ema,
        IndicatorType::Rsi,
        IndicatorType::Vwap,
        IndicatorType::Macd,
        IndicatorType::Bb,
        IndicatorType::Atr,
        IndicatorType::Fvg,
        IndicatorType::DailyLevels,
        IndicatorType::Vp,
    ];

    /// Drawing shape used for this type
    pub fn shape(&self) -> SeriesShape {
        match self {
            IndicatorType::Ema | IndicatorType::Vwap | IndicatorType::Rsi | IndicatorType::Atr => {
                SeriesShape::Single
            }
            IndicatorType::DailyLevels => SeriesShape::Dual,
            IndicatorType::Bb => SeriesShape::Triple,
            IndicatorType::Macd => SeriesShape::LineHistogram,
            IndicatorType::Fvg => SeriesShape::MarkerSet,
            IndicatorType::Vp => SeriesShape::Primitive,
        }
    }

    /// Oscillators are drawn in the secondary pane
    pub fn is_oscillator(&self) -> bool {
        matches!(self, IndicatorType::Rsi | IndicatorType::Atr | IndicatorType::Macd)
    }

    pub fn pane(&self) -> PaneKind {
        if self.is_oscillator() {
            PaneKind::Secondary
        } else {
            PaneKind::Primary
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::Ema => "EMA",
            IndicatorType::Rsi => "RSI",
            IndicatorType::Vwap => "VWAP",
            IndicatorType::Macd => "MACD",
            IndicatorType::Bb => "BB",
            IndicatorType::Atr => "ATR",
            IndicatorType::Fvg => "FVG",
            IndicatorType::DailyLevels => "DAILY_LEVELS",
            IndicatorType::Vp => "VP",
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of drawing shapes, one per indicator family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesShape {
    /// EMA / VWAP / RSI / ATR
    Single,
    /// Daily levels: previous high and low
    Dual,
    /// Bollinger bands: upper, middle, lower
    Triple,
    /// MACD: macd line, signal line, histogram
    LineHistogram,
    /// FVG: directional markers
    MarkerSet,
    /// Volume profile drawn as a custom primitive
    Primitive,
}

/// Role of one series or field within an indicator group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesRole {
    Value,
    PrevHigh,
    PrevLow,
    Upper,
    Middle,
    Lower,
    Macd,
    Signal,
    Hist,
    Bull,
    Bear,
    Profile,
    Poc,
    Vah,
    Val,
}

impl SeriesRole {
    /// Suffix appended to the indicator id in record field names
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            SeriesRole::Value => None,
            SeriesRole::PrevHigh => Some("prev_high"),
            SeriesRole::PrevLow => Some("prev_low"),
            SeriesRole::Upper => Some("upper"),
            SeriesRole::Middle => Some("middle"),
            SeriesRole::Lower => Some("lower"),
            SeriesRole::Macd => Some("macd"),
            SeriesRole::Signal => Some("signal"),
            SeriesRole::Hist => Some("hist"),
            SeriesRole::Bull => Some("bull"),
            SeriesRole::Bear => Some("bear"),
            SeriesRole::Profile => Some("profile"),
            SeriesRole::Poc => Some("poc"),
            SeriesRole::Vah => Some("vah"),
            SeriesRole::Val => Some("val"),
        }
    }

    /// Name used in crosshair legends
    pub fn label(&self) -> &'static str {
        self.suffix().unwrap_or("val")
    }

    pub fn is_histogram(&self) -> bool {
        matches!(self, SeriesRole::Hist)
    }
}

/// Record field name carrying `role` for indicator `id`
pub fn field_name(id: &str, role: SeriesRole) -> String {
    match role.suffix() {
        Some(suffix) => format!("{}_{}", id, suffix),
        None => id.to_string(),
    }
}

/// Structured handle key: indicator id plus role
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub indicator_id: String,
    pub role: SeriesRole,
}

impl SeriesKey {
    pub fn new(indicator_id: impl Into<String>, role: SeriesRole) -> Self {
        Self {
            indicator_id: indicator_id.into(),
            role,
        }
    }

    /// Record field this series reads from
    pub fn field(&self) -> String {
        field_name(&self.indicator_id, self.role)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.indicator_id, self.role.label())
    }
}

/// Pane an indicator renders in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaneKind {
    Primary,
    Secondary,
}

impl fmt::Display for PaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneKind::Primary => f.write_str("primary"),
            PaneKind::Secondary => f.write_str("secondary"),
        }
    }
}

/// Scalar option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(s) => s.parse().ok(),
            ParamValue::Bool(_) => None,
        }
    }
}

/// One configured indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub indicator_type: IndicatorType,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    #[serde(default = "default_indicator_color")]
    pub color: Rgba,
}

fn default_indicator_color() -> Rgba {
    Rgba::rgb(0xff, 0x8c, 0x00)
}

impl IndicatorSpec {
    /// New spec with a generated `{type}_{uuid}` id
    pub fn new(indicator_type: IndicatorType, params: BTreeMap<String, ParamValue>, color: Rgba) -> Self {
        let id = format!(
            "{}_{}",
            indicator_type.as_str().to_lowercase(),
            uuid::Uuid::new_v4().simple()
        );
        Self::with_id(id, indicator_type, params, color)
    }

    pub fn with_id(
        id: impl Into<String>,
        indicator_type: IndicatorType,
        params: BTreeMap<String, ParamValue>,
        color: Rgba,
    ) -> Self {
        Self {
            id: id.into(),
            indicator_type,
            params,
            color,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn shape(&self) -> SeriesShape {
        self.indicator_type.shape()
    }

    pub fn pane(&self) -> PaneKind {
        self.indicator_type.pane()
    }

}
