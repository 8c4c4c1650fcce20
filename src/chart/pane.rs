// Primary/secondary pane coordination
//
// The coordinator owns both panes and is the only path by which a viewport
// or crosshair change on one pane reaches the other.

use serde::Serialize;

use crate::config::PaneConfig;
use crate::core::{ChartError, ChartResult, PaneKind};

/// Inclusive visible time window, epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

impl TimeRange {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    pub fn span(&self) -> i64 {
        self.to - self.from
    }

    pub fn contains(&self, time: i64) -> bool {
        time >= self.from && time <= self.to
    }
}

/// Layout signal consumed by the surrounding page
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaneLayout {
    pub secondary_visible: bool,
    pub secondary_height: f32,
}

/// Viewport state of one pane
#[derive(Debug, Clone, PartialEq)]
pub struct Pane {
    kind: PaneKind,
    width: f32,
    height: f32,
    visible: bool,
    visible_range: Option<TimeRange>,
    crosshair: Option<i64>,
}

impl Pane {
    /// Construct a pane surface of the given size.
    ///
    /// Fails when the container cannot host a surface: non-finite or
    /// negative width, or a primary pane without height.
    pub fn new(kind: PaneKind, width: f32, height: f32) -> ChartResult<Self> {
        if !width.is_finite() || width < 0.0 {
            return Err(ChartError::surface_unavailable(
                kind.to_string(),
                format!("invalid container width {}", width),
            ));
        }
        if !height.is_finite() || height < 0.0 || (kind == PaneKind::Primary && height == 0.0) {
            return Err(ChartError::surface_unavailable(
                kind.to_string(),
                format!("invalid container height {}", height),
            ));
        }

        Ok(Self {
            kind,
            width,
            height,
            visible: kind == PaneKind::Primary,
            visible_range: None,
            crosshair: None,
        })
    }

    pub fn kind(&self) -> PaneKind {
        self.kind
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn visible_range(&self) -> Option<TimeRange> {
        self.visible_range
    }

    pub fn crosshair(&self) -> Option<i64> {
        self.crosshair
    }

    /// Horizontal pixel for a time inside the visible range
    pub fn time_to_x(&self, time: i64) -> Option<f32> {
        let range = self.visible_range?;
        if range.span() <= 0 {
            return Some(self.width / 2.0);
        }
        let ratio = (time - range.from) as f64 / range.span() as f64;
        Some((ratio * self.width as f64) as f32)
    }

    /// Time under a horizontal pixel
    pub fn x_to_time(&self, x: f32) -> Option<i64> {
        let range = self.visible_range?;
        if self.width <= 0.0 {
            return None;
        }
        let ratio = (x / self.width).clamp(0.0, 1.0) as f64;
        Some(range.from + (ratio * range.span() as f64).round() as i64)
    }
}

/// Keeps both panes' time viewport and crosshair locked together
#[derive(Debug, Clone)]
pub struct PaneCoordinator {
    primary: Pane,
    secondary: Pane,
    unit_height: f32,
    oscillator_slots: usize,
}

impl PaneCoordinator {
    /// Build both panes; if either fails nothing is kept
    pub fn new(config: &PaneConfig) -> ChartResult<Self> {
        let primary = Pane::new(PaneKind::Primary, config.initial_width, config.primary_height)?;
        let secondary = Pane::new(PaneKind::Secondary, config.initial_width, 0.0)?;
        if !(config.secondary_unit_height > 0.0) {
            return Err(ChartError::surface_unavailable(
                PaneKind::Secondary.to_string(),
                format!("invalid unit height {}", config.secondary_unit_height),
            ));
        }
        log::debug!(
            "Panes created: width {}, primary height {}",
            config.initial_width,
            config.primary_height
        );

        Ok(Self {
            primary,
            secondary,
            unit_height: config.secondary_unit_height,
            oscillator_slots: 0,
        })
    }

    pub fn primary(&self) -> &Pane {
        &self.primary
    }

    pub fn secondary(&self) -> &Pane {
        &self.secondary
    }

    pub fn pane(&self, kind: PaneKind) -> &Pane {
        match kind {
            PaneKind::Primary => &self.primary,
            PaneKind::Secondary => &self.secondary,
        }
    }

    /// Apply a viewport change reported by either pane to both.
    ///
    /// Returns false when nothing changed, which is how the echo from the
    /// mirrored pane terminates.
    pub fn on_visible_range_changed(&mut self, source: PaneKind, range: TimeRange) -> bool {
        if range.from > range.to {
            log::warn!("Ignoring inverted range {:?} from {} pane", range, source);
            return false;
        }
        if self.primary.visible_range == Some(range) && self.secondary.visible_range == Some(range) {
            return false;
        }
        self.primary.visible_range = Some(range);
        self.secondary.visible_range = Some(range);
        true
    }

    /// Mirror a crosshair move to both panes; `None` means the pointer left
    pub fn on_crosshair_moved(&mut self, source: PaneKind, time: Option<i64>) -> Option<i64> {
        log::trace!("Crosshair from {} pane at {:?}", source, time);
        self.primary.crosshair = time;
        self.secondary.crosshair = time;
        time
    }

    /// Recompute secondary pane height from the number of oscillator slots
    pub fn set_oscillator_slots(&mut self, slots: usize) -> PaneLayout {
        self.oscillator_slots = slots;
        self.secondary.height = slots as f32 * self.unit_height;
        self.secondary.visible = slots > 0;
        self.layout()
    }

    pub fn oscillator_slots(&self) -> usize {
        self.oscillator_slots
    }

    pub fn layout(&self) -> PaneLayout {
        PaneLayout {
            secondary_visible: self.secondary.visible,
            secondary_height: self.secondary.height,
        }
    }

    /// Width-only relayout after a container resize; zero width is skipped
    pub fn resize(&mut self, width: f32) -> bool {
        if !(width > 0.0) || !width.is_finite() {
            log::debug!("Skipping resize to width {}", width);
            return false;
        }
        self.primary.width = width;
        self.secondary.width = width;
        true
    }

    /// Forget viewport and crosshair, used when a dataset is superseded
    pub fn reset(&mut self) {
        for pane in [&mut self.primary, &mut self.secondary] {
            pane.visible_range = None;
            pane.crosshair = None;
        }
    }
}
