// Configuration module for loading and validating chart settings

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{ChartError, ChartResult};

pub mod chart_config;

pub use chart_config::*;

/// Loads `ChartConfig` from a TOML file
pub struct ConfigManager {
    config_path: PathBuf,
    config: ChartConfig,
    loaded: bool,
}

impl ConfigManager {
    /// Create configuration manager with default path
    pub fn new() -> Self {
        Self::with_path("replay_chart.toml")
    }

    /// Create configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
            config: ChartConfig::default(),
            loaded: false,
        }
    }

    /// Load and validate the configuration file
    pub fn load(&mut self) -> ChartResult<()> {
        if !self.config_path.exists() {
            return Err(ChartError::Config(format!(
                "Configuration file not found: {}",
                self.config_path.display()
            )));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let config = parse_config(&content)?;
        self.config = config;
        self.loaded = true;
        Ok(())
    }

    /// Load with fallback to defaults if the file is missing or invalid
    pub fn load_or_default(&mut self) -> &Self {
        if let Err(e) = self.load() {
            log::warn!("Failed to load config, using defaults: {}", e);
            self.config = ChartConfig::default();
            self.loaded = true;
        }
        self
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ChartConfig {
        &mut self.config
    }

    pub fn into_config(self) -> ChartConfig {
        self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Write the current configuration back to disk
    pub fn save(&self) -> ChartResult<()> {
        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| ChartError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse and validate TOML text
pub fn parse_config(content: &str) -> ChartResult<ChartConfig> {
    let config: ChartConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Reject settings the engine cannot honour
pub fn validate(config: &ChartConfig) -> ChartResult<()> {
    let panes = &config.panes;
    if !(panes.secondary_unit_height > 0.0 && panes.secondary_unit_height.is_finite()) {
        return Err(ChartError::Config(format!(
            "panes.secondary_unit_height must be positive, got {}",
            panes.secondary_unit_height
        )));
    }
    if !(panes.primary_height > 0.0 && panes.primary_height.is_finite()) {
        return Err(ChartError::Config(format!(
            "panes.primary_height must be positive, got {}",
            panes.primary_height
        )));
    }

    let vp = &config.volume_profile;
    if !(vp.value_area_ratio > 0.0 && vp.value_area_ratio <= 1.0) {
        return Err(ChartError::Config(format!(
            "volume_profile.value_area_ratio must be in (0, 1], got {}",
            vp.value_area_ratio
        )));
    }
    if !(vp.max_width_pixels > 0.0) {
        return Err(ChartError::Config(format!(
            "volume_profile.max_width_pixels must be positive, got {}",
            vp.max_width_pixels
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Rgba, ValueAreaMode};

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ChartConfig::default());
        assert_eq!(config.panes.secondary_unit_height, 150.0);
        assert_eq!(config.volume_profile.max_width_pixels, 150.0);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
            [panes]
            secondary_unit_height = 120.0

            [volume_profile]
            value_area_mode = "recompute"
            color_poc = "rgba(255, 0, 0, 1)"

            [logging]
            level = "debug"
            file = "chart.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.panes.secondary_unit_height, 120.0);
        assert_eq!(config.panes.primary_height, 600.0);
        assert_eq!(config.volume_profile.value_area_mode, ValueAreaMode::Recompute);
        assert_eq!(config.volume_profile.color_poc, Rgba::rgba(255, 0, 0, 1.0));
        assert_eq!(config.logging.file.as_deref(), Some("chart.log"));
    }

    #[test]
    fn test_marker_section() {
        let config = parse_config("[markers]\nfvg_bull_color = \"#00ff00\"").unwrap();
        assert_eq!(config.markers.fvg_bull_color, Rgba::rgb(0, 255, 0));
        assert_eq!(config.markers.fvg_bear_color, Rgba::rgb(0xef, 0x53, 0x50));

        let written = toml::to_string(&config.markers).unwrap();
        let keys: Vec<&str> = written.lines().filter_map(|l| l.split(" = ").next()).collect();
        assert_eq!(keys, vec!["fvg_bull_color", "fvg_bear_color"]);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(parse_config("[panes]\nsecondary_unit_height = 0.0").is_err());
        assert!(parse_config("[volume_profile]\nvalue_area_ratio = 1.5").is_err());
        assert!(parse_config("[volume_profile]\ncolor_poc = \"teal\"").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let mut manager = ConfigManager::with_path("/nonexistent/replay_chart.toml");
        assert!(manager.load().is_err());
        manager.load_or_default();
        assert!(manager.is_loaded());
        assert_eq!(manager.config(), &ChartConfig::default());
    }
}
