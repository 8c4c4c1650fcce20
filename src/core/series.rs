use serde::Serialize;
use std::fmt;

use super::color::Rgba;
use super::indicator::SeriesKey;

/// Identity of a live series handle; never reused within a registrar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SeriesId(pub u64);

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "series#{}", self.0)
    }
}

/// How a series is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeriesKind {
    Line,
    Histogram,
}

/// A single time-keyed value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time: i64,
    pub value: f64,
    /// Per-point color override (histogram bars)
    pub color: Option<Rgba>,
}

impl SeriesPoint {
    pub fn new(time: i64, value: f64) -> Self {
        Self {
            time,
            value,
            color: None,
        }
    }

    pub fn colored(time: i64, value: f64, color: Rgba) -> Self {
        Self {
            time,
            value,
            color: Some(color),
        }
    }
}

/// Result of pushing one point into a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateOutcome {
    /// New time, point added at the end
    Appended,
    /// Same time as the last point, replaced in place
    Replaced,
    /// Older than the last point; ignored
    Stale,
}

/// Retained rendering handle for one continuous series
#[derive(Debug, Clone)]
pub struct Series {
    id: SeriesId,
    key: SeriesKey,
    kind: SeriesKind,
    color: Rgba,
    line_width: f32,
    points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new(id: SeriesId, key: SeriesKey, kind: SeriesKind, color: Rgba, line_width: f32) -> Self {
        Self {
            id,
            key,
            kind,
            color,
            line_width,
            points: Vec::new(),
        }
    }

    pub fn id(&self) -> SeriesId {
        self.id
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Replace all points.
    ///
    /// Points must already be strictly ascending in time; an out-of-order
    /// input is logged and kept as given.
    pub fn set_data(&mut self, points: Vec<SeriesPoint>) {
        if let Some(w) = points.windows(2).find(|w| w[0].time >= w[1].time) {
            log::warn!(
                "{} ({}) received non-ascending points: {} then {}",
                self.key,
                self.id,
                w[0].time,
                w[1].time
            );
        }
        self.points = points;
    }

    /// Overwrite-at-time update
    pub fn update(&mut self, point: SeriesPoint) -> UpdateOutcome {
        match self.points.last().map(|p| p.time) {
            Some(t) if t == point.time => {
                let last = self.points.len() - 1;
                self.points[last] = point;
                UpdateOutcome::Replaced
            }
            Some(t) if t > point.time => {
                log::warn!("{} ignored stale point at {} (last {})", self.key, point.time, t);
                UpdateOutcome::Stale
            }
            _ => {
                self.points.push(point);
                UpdateOutcome::Appended
            }
        }
    }

    /// Value at an exact time
    pub fn value_at(&self, time: i64) -> Option<f64> {
        self.points
            .binary_search_by_key(&time, |p| p.time)
            .ok()
            .map(|i| self.points[i].value)
    }

    /// Points whose time falls inside `[from, to]`
    pub fn range(&self, from: i64, to: i64) -> &[SeriesPoint] {
        let start = self.points.partition_point(|p| p.time < from);
        let end = self.points.partition_point(|p| p.time <= to);
        &self.points[start..end.max(start)]
    }

    /// Drop points older than `time`; returns how many went
    pub fn truncate_before(&mut self, time: i64) -> usize {
        let cut = self.points.partition_point(|p| p.time < time);
        self.points.drain(..cut);
        cut
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}
