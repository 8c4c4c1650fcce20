// Chart configuration structures
// Every section falls back to its defaults when omitted from the file.

use serde::{Deserialize, Serialize};

use crate::core::{Rgba, ValueAreaMode};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub panes: PaneConfig,
    pub volume_profile: VolumeProfileConfig,
    pub markers: MarkerConfig,
    pub series: SeriesStyleConfig,
    pub logging: LoggingConfig,
    pub display: DisplayConfig,
}

/// Pane geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneConfig {
    pub primary_height: f32,
    pub initial_width: f32,
    /// Height of one oscillator slot in the secondary pane
    pub secondary_unit_height: f32,
    /// Candle buffer cap, 0 = unbounded
    pub max_candles: usize,
}

/// Volume profile aggregation and drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileConfig {
    pub max_width_pixels: f32,
    pub color_value_area: Rgba,
    pub color_non_value_area: Rgba,
    pub color_poc: Rgba,
    pub poc_tolerance: f64,
    /// POC line length as a multiple of `max_width_pixels`
    pub poc_line_extension: f32,
    pub poc_line_width: f32,
    pub bar_alpha: f32,
    pub value_area_mode: ValueAreaMode,
    pub value_area_ratio: f64,
}

/// Marker colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub fvg_bull_color: Rgba,
    pub fvg_bear_color: Rgba,
}

/// Series styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesStyleConfig {
    pub line_width: f32,
    pub hist_positive_color: Rgba,
    pub hist_negative_color: Rgba,
    pub signal_color: Rgba,
    pub candle_up_color: Rgba,
    pub candle_down_color: Rgba,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log to this file instead of stderr
    pub file: Option<String>,
}

/// Time label display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub utc_offset_minutes: i32,
}

impl Default for PaneConfig {
    fn default() -> Self {
        Self {
            primary_height: 600.0,
            initial_width: 800.0,
            secondary_unit_height: 150.0,
            max_candles: 0,
        }
    }
}

impl Default for VolumeProfileConfig {
    fn default() -> Self {
        Self {
            max_width_pixels: 150.0,
            color_value_area: Rgba::rgba(41, 98, 255, 0.7),
            color_non_value_area: Rgba::rgba(255, 183, 77, 0.5),
            color_poc: Rgba::rgb(255, 235, 59),
            poc_tolerance: 1e-4,
            poc_line_extension: 1.5,
            poc_line_width: 2.0,
            bar_alpha: 0.8,
            value_area_mode: ValueAreaMode::CarryForward,
            value_area_ratio: 0.70,
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            fvg_bull_color: Rgba::rgb(0x26, 0xa6, 0x9a),
            fvg_bear_color: Rgba::rgb(0xef, 0x53, 0x50),
        }
    }
}

impl Default for SeriesStyleConfig {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            hist_positive_color: Rgba::rgba(38, 166, 154, 0.5),
            hist_negative_color: Rgba::rgba(239, 83, 80, 0.5),
            signal_color: Rgba::rgb(0xff, 0x6d, 0x00),
            candle_up_color: Rgba::rgb(0x26, 0xa6, 0x9a),
            candle_down_color: Rgba::rgb(0xef, 0x53, 0x50),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        // Asia/Kolkata
        Self {
            utc_offset_minutes: 330,
        }
    }
}
