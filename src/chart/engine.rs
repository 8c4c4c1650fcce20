// Chart engine: the single entry point for the three trigger classes
// (dataset replacement, streaming record, indicator-set change) plus the
// pane events. Each call runs to completion before the next.

use std::sync::Arc;

use crate::chart::crosshair::{build_snapshot, CrosshairSnapshot};
use crate::chart::pane::{PaneCoordinator, PaneLayout, TimeRange};
use crate::chart::registrar::{GroupStyle, IndicatorRegistrar, ReconcileReport};
use crate::chart::streaming::{MergeReport, StreamingMerger};
use crate::config::ChartConfig;
use crate::core::{
    merge_markers, AggregatedProfile, Candle, ChartResult, IndicatorSpec, Marker, PaneKind,
    TimeSeriesStore,
};

pub struct ChartEngine {
    config: ChartConfig,
    store: TimeSeriesStore,
    panes: PaneCoordinator,
    registrar: IndicatorRegistrar,
    merger: StreamingMerger,
    trade_markers: Vec<Marker>,
}

impl ChartEngine {
    /// Build the engine and both panes; a pane failure is returned as is
    pub fn new(config: ChartConfig) -> ChartResult<Self> {
        let panes = PaneCoordinator::new(&config.panes)?;
        let store = TimeSeriesStore::new(config.panes.max_candles);
        let registrar = IndicatorRegistrar::new(GroupStyle::from_config(&config));
        log::info!("Chart engine ready");

        Ok(Self {
            config,
            store,
            panes,
            registrar,
            merger: StreamingMerger::new(),
            trade_markers: Vec::new(),
        })
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn panes(&self) -> &PaneCoordinator {
        &self.panes
    }

    pub fn registrar(&self) -> &IndicatorRegistrar {
        &self.registrar
    }

    /// Replace the whole dataset.
    ///
    /// Everything derived from the previous dataset is cleared before the
    /// new one is applied. Indicator groups survive and are refilled.
    pub fn load_dataset(&mut self, candles: Vec<Candle>) -> ChartResult<()> {
        self.reset();
        self.store.set_data(candles)?;
        self.registrar.rebuild(self.store.candles());
        log::info!(
            "Dataset loaded: {} candles, {} indicators",
            self.store.len(),
            self.registrar.len()
        );
        Ok(())
    }

    /// Drop all data and viewport state; indicator groups stay registered
    /// but empty
    pub fn reset(&mut self) {
        self.store.clear();
        self.registrar.clear_data();
        self.panes.reset();
        log::debug!("Chart state reset");
    }

    /// Apply one streaming record
    pub fn apply_record(&mut self, record: Candle) -> MergeReport {
        self.merger.apply(&mut self.store, &mut self.registrar, record)
    }

    /// Reconcile the indicator set and relayout the secondary pane
    pub fn set_indicators(&mut self, desired: &[IndicatorSpec]) -> (ReconcileReport, PaneLayout) {
        let report = self.registrar.reconcile(desired, self.store.candles());
        let layout = self.panes.set_oscillator_slots(self.registrar.oscillator_count());
        (report, layout)
    }

    pub fn remove_indicator(&mut self, id: &str) -> PaneLayout {
        if self.registrar.remove(id) {
            self.panes.set_oscillator_slots(self.registrar.oscillator_count())
        } else {
            self.panes.layout()
        }
    }

    /// Externally supplied trade markers (entries and exits)
    pub fn set_trade_markers(&mut self, markers: Vec<Marker>) {
        self.trade_markers = markers;
    }

    /// Trade and FVG markers merged for the price pane
    pub fn markers(&self) -> Vec<Marker> {
        merge_markers(&self.trade_markers, self.registrar.synthesized_markers())
    }

    /// Composite profile of a VP indicator
    pub fn profile(&self, id: &str) -> Option<Arc<AggregatedProfile>> {
        self.registrar.group(id).and_then(|g| g.profile())
    }

    pub fn layout(&self) -> PaneLayout {
        self.panes.layout()
    }

    pub fn resize(&mut self, width: f32) -> bool {
        self.panes.resize(width)
    }

    pub fn on_visible_range_changed(&mut self, source: PaneKind, range: TimeRange) -> bool {
        self.panes.on_visible_range_changed(source, range)
    }

    /// Mirror the crosshair and rebuild the legend snapshot
    pub fn on_crosshair_moved(&mut self, source: PaneKind, time: Option<i64>) -> CrosshairSnapshot {
        let time = self.panes.on_crosshair_moved(source, time);
        build_snapshot(&self.registrar, time)
    }

    /// Buffer index to resume replay from after a click at `time`
    pub fn seek_index(&self, time: i64) -> usize {
        self.store.seek_index(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IndicatorType, Rgba};
    use std::collections::BTreeMap;

    fn spec(id: &str, t: IndicatorType) -> IndicatorSpec {
        IndicatorSpec::with_id(id, t, BTreeMap::new(), Rgba::rgb(0, 0, 0))
    }

    fn candles(n: i64) -> Vec<Candle> {
        (1..=n)
            .map(|t| Candle::new(t * 60, 1.0, 2.0, 0.5, 1.5, 1.0).with_field("rsi", 50.0))
            .collect()
    }

    #[test]
    fn test_secondary_pane_follows_oscillators() {
        let mut engine = ChartEngine::new(ChartConfig::default()).unwrap();
        let (_, layout) = engine.set_indicators(&[spec("ema", IndicatorType::Ema)]);
        assert!(!layout.secondary_visible);
        assert_eq!(layout.secondary_height, 0.0);

        let (_, layout) = engine.set_indicators(&[spec("ema", IndicatorType::Ema), spec("rsi", IndicatorType::Rsi)]);
        assert!(layout.secondary_visible);
        assert_eq!(layout.secondary_height, 150.0);

        let (_, layout) = engine.set_indicators(&[spec("rsi", IndicatorType::Rsi), spec("macd", IndicatorType::Macd)]);
        assert_eq!(layout.secondary_height, 300.0);

        assert_eq!(engine.remove_indicator("macd").secondary_height, 150.0);
    }

    #[test]
    fn test_reload_clears_then_refills() {
        let mut engine = ChartEngine::new(ChartConfig::default()).unwrap();
        engine.set_indicators(&[spec("rsi", IndicatorType::Rsi)]);
        engine.load_dataset(candles(5)).unwrap();
        let handles = engine.registrar().group("rsi").unwrap().handle_ids();

        engine.load_dataset(candles(2)).unwrap();
        let group = engine.registrar().group("rsi").unwrap();
        assert_eq!(group.handle_ids(), handles);
        assert_eq!(group.series()[0].len(), 2);
        assert_eq!(engine.store().len(), 2);
    }

    #[test]
    fn test_bad_dataset_leaves_engine_empty() {
        let mut engine = ChartEngine::new(ChartConfig::default()).unwrap();
        engine.load_dataset(candles(3)).unwrap();
        let mut unordered = candles(3);
        unordered.reverse();
        assert!(engine.load_dataset(unordered).is_err());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_crosshair_snapshot() {
        let mut engine = ChartEngine::new(ChartConfig::default()).unwrap();
        engine.set_indicators(&[spec("rsi", IndicatorType::Rsi)]);
        engine.load_dataset(candles(3)).unwrap();

        let snapshot = engine.on_crosshair_moved(PaneKind::Secondary, Some(120));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(engine.panes().primary().crosshair(), Some(120));
        assert!(engine.on_crosshair_moved(PaneKind::Primary, None).is_empty());
    }

    #[test]
    fn test_seek_index() {
        let mut engine = ChartEngine::new(ChartConfig::default()).unwrap();
        engine.load_dataset(candles(4)).unwrap();
        assert_eq!(engine.seek_index(180), 2);
        assert_eq!(engine.seek_index(181), 0);
    }
}
