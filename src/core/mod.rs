// Core data model: candles, indicator configuration, retained series,
// markers and volume profile aggregation.

pub mod candle;
pub mod color;
pub mod error;
pub mod indicator;
pub mod markers;
pub mod series;
pub mod time_series_store;
pub mod volume_profile;

pub use candle::{format_time, normalize_time, Candle};
pub use color::Rgba;
pub use error::{ChartError, ChartResult};
pub use indicator::{
    field_name, IndicatorSpec, IndicatorType, PaneKind, ParamValue, SeriesKey, SeriesRole, SeriesShape,
};
pub use markers::{merge_markers, Marker, MarkerPosition, MarkerShape};
pub use series::{Series, SeriesId, SeriesKind, SeriesPoint, UpdateOutcome};
pub use time_series_store::{parse_dataset, Dataset, TimeSeriesStore};
pub use volume_profile::{
    AggregatedProfile, ValueAreaMode, VolumeProfileAggregator, VolumeProfileBin, VolumeProfileSession,
};
