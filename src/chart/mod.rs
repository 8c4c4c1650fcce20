// Chart engine: pane coordination, indicator lifecycle, streaming merge and
// volume profile drawing.

pub mod canvas;
pub mod crosshair;
pub mod engine;
pub mod pane;
pub mod price_scale;
pub mod profile_renderer;
pub mod registrar;
pub mod streaming;

pub use canvas::{Canvas, DrawCommand, DrawList, PixelRect};
pub use crosshair::{build_snapshot, CrosshairSnapshot, LegendValue};
pub use engine::ChartEngine;
pub use pane::{Pane, PaneCoordinator, PaneLayout, TimeRange};
pub use price_scale::{LinearPriceScale, PriceScale};
pub use profile_renderer::{BarBand, ProfileBar, ProfileLayout, ProfileRenderer};
pub use registrar::{GroupStyle, IndicatorRegistrar, ReconcileReport, SeriesGroup, SeriesGroupKind};
pub use streaming::{MergeReport, StreamingMerger};
