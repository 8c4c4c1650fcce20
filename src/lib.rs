// Core modules
pub mod chart;
pub mod config;
pub mod core;
#[cfg(feature = "gui")]
pub mod gui;

// Re-export main types
pub use chart::{
    ChartEngine, CrosshairSnapshot, IndicatorRegistrar, MergeReport, PaneCoordinator, PaneLayout, ProfileRenderer,
    ReconcileReport, StreamingMerger, TimeRange,
};
pub use config::{ChartConfig, ConfigManager, LoggingConfig};
pub use core::{
    AggregatedProfile, Candle, ChartError, ChartResult, IndicatorSpec, IndicatorType, Marker,
    VolumeProfileAggregator, VolumeProfileSession,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging.
///
/// `RUST_LOG` wins over the configured level. When a log file is
/// configured but cannot be opened, output falls back to stderr.
pub fn init_logging(config: &LoggingConfig) {
    use std::fs::OpenOptions;

    let level = config
        .level
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Info);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    if let Some(path) = &config.file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}, logging to stderr", path, e),
        }
    }

    // A second init (tests, embedding) keeps the first logger
    let _ = builder.try_init();
}
