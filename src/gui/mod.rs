/// GUI module - egui replay viewer over the chart engine
pub mod chart_view;
pub mod painter_canvas;

pub use chart_view::{run, ReplayViewer};
pub use painter_canvas::{color32, PainterCanvas};
