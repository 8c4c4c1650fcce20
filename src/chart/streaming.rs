// Live record merging.
//
// A streamed record either amends the bar at the latest time or appends a
// new one. Every consumer applies the same overwrite-at-time rule so a
// partially formed bar can be revised until the next bar starts.

use serde::Serialize;

use crate::chart::registrar::{fvg_markers, point_for, IndicatorRegistrar, SeriesGroupKind};
use crate::config::MarkerConfig;
use crate::core::{
    field_name, Candle, Marker, MarkerShape, SeriesRole, TimeSeriesStore, UpdateOutcome,
    VolumeProfileSession,
};

/// What one streamed record changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    /// Outcome for the candle buffer itself
    pub candle: Option<UpdateOutcome>,
    pub appended: usize,
    pub replaced: usize,
    pub stale: usize,
    /// Series whose field was absent from the record
    pub skipped: usize,
    pub markers_changed: bool,
    pub profiles_rebuilt: usize,
    /// Points, markers and sessions that fell out of the capped window
    pub evicted: usize,
}

impl MergeReport {
    fn count(&mut self, outcome: UpdateOutcome) {
        match outcome {
            UpdateOutcome::Appended => self.appended += 1,
            UpdateOutcome::Replaced => self.replaced += 1,
            UpdateOutcome::Stale => self.stale += 1,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.candle == Some(UpdateOutcome::Stale)
    }
}

/// Applies streamed records to the buffer and every live indicator
#[derive(Debug, Default)]
pub struct StreamingMerger {
    records_merged: u64,
}

impl StreamingMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records_merged(&self) -> u64 {
        self.records_merged
    }

    /// Merge one record.
    ///
    /// A record older than the latest bar is dropped whole; nothing in the
    /// registrar is touched for it.
    pub fn apply(
        &mut self,
        store: &mut TimeSeriesStore,
        registrar: &mut IndicatorRegistrar,
        record: Candle,
    ) -> MergeReport {
        let mut report = MergeReport::default();
        let oldest = store.first_time();
        let outcome = store.push(record.clone());
        report.candle = Some(outcome);
        if outcome == UpdateOutcome::Stale {
            log::debug!("Dropping stale record at {}", record.time);
            return report;
        }

        self.records_merged += 1;
        if let Some(first) = store.first_time().filter(|&t| Some(t) != oldest) {
            report.evicted = registrar.retain_from(first);
        }
        merge_into_registrar(registrar, &record, &mut report);
        log::trace!("Merged record {}: {:?}", record.time, report);
        report
    }
}

fn merge_into_registrar(registrar: &mut IndicatorRegistrar, record: &Candle, report: &mut MergeReport) {
    let style = registrar.style().clone();

    for group in registrar.groups_mut() {
        let id = group.id().to_string();
        match group.kind_mut() {
            SeriesGroupKind::MarkerSet { markers } => {
                if merge_markers_at(markers, record, &id, &style.markers) {
                    report.markers_changed = true;
                }
                continue;
            }
            SeriesGroupKind::Primitive { aggregator, sessions } => {
                match VolumeProfileSession::from_candle(record, &id) {
                    Ok(Some(session)) => {
                        upsert_session(sessions, session);
                        aggregator.set_data(sessions);
                        report.profiles_rebuilt += 1;
                    }
                    Ok(None) => {}
                    Err(e) => log::warn!("Ignoring streamed profile: {}", e),
                }
                continue;
            }
            _ => {}
        }

        for series in group.series_mut() {
            match point_for(record, series.key(), &style.series) {
                Some(point) => report.count(series.update(point)),
                None => report.skipped += 1,
            }
        }
    }
}

/// Replace the record's FVG markers at its time. Returns whether the set
/// changed. A flag missing from the record leaves that direction alone.
fn merge_markers_at(
    markers: &mut Vec<Marker>,
    record: &Candle,
    id: &str,
    style: &MarkerConfig,
) -> bool {
    let bull_field = field_name(id, SeriesRole::Bull);
    let bear_field = field_name(id, SeriesRole::Bear);
    if !record.has_field(&bull_field) && !record.has_field(&bear_field) {
        return false;
    }

    let fresh = fvg_markers(record, id, style);
    let mut changed = false;

    for (field, shape) in [
        (&bull_field, MarkerShape::ArrowUp),
        (&bear_field, MarkerShape::ArrowDown),
    ] {
        if !record.has_field(field) {
            continue;
        }
        let key = (record.time, shape);
        let existing = markers.iter().position(|m| m.key() == key);
        let incoming = fresh.iter().find(|m| m.key() == key);
        match (existing, incoming) {
            (Some(i), Some(m)) => {
                if markers[i] != *m {
                    markers[i] = m.clone();
                    changed = true;
                }
            }
            (Some(i), None) => {
                markers.remove(i);
                changed = true;
            }
            (None, Some(m)) => {
                let at = markers.partition_point(|x| x.key() < key);
                markers.insert(at, m.clone());
                changed = true;
            }
            (None, None) => {}
        }
    }

    changed
}

/// Overwrite the session at the same time or append a newer one
fn upsert_session(sessions: &mut Vec<VolumeProfileSession>, session: VolumeProfileSession) {
    match sessions.iter().position(|s| s.time == session.time) {
        Some(i) => sessions[i] = session,
        None => {
            let at = sessions.partition_point(|s| s.time < session.time);
            sessions.insert(at, session);
        }
    }
}
