use serde::Deserialize;

use super::candle::Candle;
use super::error::{ChartError, ChartResult};
use super::series::UpdateOutcome;

/// Ordered candle buffer plus the latest streamed record
///
/// Single source of truth for time coordinates: every time held here is
/// normalized epoch seconds, strictly ascending.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesStore {
    candles: Vec<Candle>,
    /// 0 keeps everything
    max_candles: usize,
    latest: Option<Candle>,
}

impl TimeSeriesStore {
    pub fn new(max_candles: usize) -> Self {
        Self {
            candles: Vec::new(),
            max_candles,
            latest: None,
        }
    }

    /// Replace the whole buffer
    pub fn set_data(&mut self, candles: Vec<Candle>) -> ChartResult<()> {
        if let Some(w) = candles.windows(2).find(|w| w[0].time >= w[1].time) {
            return Err(ChartError::validation_field(
                format!("candle times must be strictly ascending ({} then {})", w[0].time, w[1].time),
                "time",
                w[1].time,
            ));
        }

        self.candles = candles;
        self.trim_to_capacity();
        self.latest = self.candles.last().cloned();
        log::info!("Loaded {} candles", self.candles.len());
        Ok(())
    }

    /// Apply one streamed record with overwrite-at-time semantics
    pub fn push(&mut self, candle: Candle) -> UpdateOutcome {
        let last_time = self.candles.last().map(|c| c.time);
        let outcome = match last_time {
            Some(t) if t == candle.time => {
                let last = self.candles.len() - 1;
                self.candles[last] = candle.clone();
                UpdateOutcome::Replaced
            }
            Some(t) if t > candle.time => {
                log::warn!("Ignoring out-of-order candle at {} (last {})", candle.time, t);
                return UpdateOutcome::Stale;
            }
            _ => {
                self.candles.push(candle.clone());
                self.trim_to_capacity();
                UpdateOutcome::Appended
            }
        };
        self.latest = Some(candle);
        outcome
    }

    fn trim_to_capacity(&mut self) {
        if self.max_candles == 0 {
            return;
        }
        if self.candles.len() > self.max_candles {
            let excess = self.candles.len() - self.max_candles;
            self.candles.drain(..excess);
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    /// Oldest time still held; moves forward when the cap evicts
    pub fn first_time(&self) -> Option<i64> {
        self.candles.first().map(|c| c.time)
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.latest.as_ref()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Buffer index holding exactly `time`
    pub fn index_of(&self, time: i64) -> Option<usize> {
        self.candles.binary_search_by_key(&time, |c| c.time).ok()
    }

    /// Seek target for a clicked time; unknown times seek to the start
    pub fn seek_index(&self, time: i64) -> usize {
        self.index_of(time).unwrap_or(0)
    }

    /// First and last time in the buffer
    pub fn time_range(&self) -> Option<(i64, i64)> {
        Some((self.candles.first()?.time, self.candles.last()?.time))
    }

    /// Lowest low and highest high between two times, inclusive
    pub fn price_range(&self, from: i64, to: i64) -> Option<(f64, f64)> {
        self.candles
            .iter()
            .filter(|c| c.time >= from && c.time <= to)
            .fold(None, |acc, c| match acc {
                None => Some((c.low, c.high)),
                Some((lo, hi)) => Some((f64::min(lo, c.low), f64::max(hi, c.high))),
            })
    }

    pub fn clear(&mut self) {
        self.candles.clear();
        self.latest = None;
    }
}

/// Historical payload as served: either a bare array or an envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoricalPayload {
    Envelope {
        data: Vec<Candle>,
        #[serde(rename = "initialCount")]
        initial_count: Option<usize>,
    },
    Bare(Vec<Candle>),
}

/// Parsed historical response
#[derive(Debug, Clone)]
pub struct Dataset {
    pub candles: Vec<Candle>,
    /// How many candles are shown before replay starts
    pub initial_count: usize,
}

impl Dataset {
    /// Candles visible before replay starts
    pub fn initial(&self) -> &[Candle] {
        &self.candles[..self.initial_count.min(self.candles.len())]
    }

    /// Candles still to be replayed
    pub fn remaining(&self) -> &[Candle] {
        &self.candles[self.initial_count.min(self.candles.len())..]
    }
}

/// Parse a historical response body
pub fn parse_dataset(json: &str) -> ChartResult<Dataset> {
    let payload: HistoricalPayload = serde_json::from_str(json)?;
    Ok(match payload {
        HistoricalPayload::Envelope { data, initial_count } => {
            let initial_count = initial_count.unwrap_or(data.len());
            Dataset {
                candles: data,
                initial_count,
            }
        }
        HistoricalPayload::Bare(candles) => Dataset {
            initial_count: candles.len(),
            candles,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, close: f64) -> Candle {
        Candle::new(time, close, close, close, close, 1.0)
    }

    #[test]
    fn test_set_data_rejects_unordered() {
        let mut store = TimeSeriesStore::new(0);
        let err = store.set_data(vec![candle(2, 1.0), candle(1, 1.0)]).unwrap_err();
        assert!(matches!(err, ChartError::Validation { .. }));

        assert!(store.set_data(vec![candle(1, 1.0), candle(1, 1.0)]).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_push_amends_current_bar() {
        let mut store = TimeSeriesStore::new(0);
        store.set_data(vec![candle(1, 1.0), candle(2, 2.0)]).unwrap();

        assert_eq!(store.push(candle(2, 2.5)), UpdateOutcome::Replaced);
        assert_eq!(store.len(), 2);
        assert_eq!(store.latest().map(|c| c.close), Some(2.5));

        assert_eq!(store.push(candle(3, 3.0)), UpdateOutcome::Appended);
        assert_eq!(store.len(), 3);

        assert_eq!(store.push(candle(1, 9.0)), UpdateOutcome::Stale);
        assert_eq!(store.latest().map(|c| c.time), Some(3));
    }

    #[test]
    fn test_capacity_window() {
        let mut store = TimeSeriesStore::new(3);
        store.set_data((1..=5).map(|t| candle(t, t as f64)).collect()).unwrap();
        assert_eq!(store.time_range(), Some((3, 5)));

        store.push(candle(6, 6.0));
        assert_eq!(store.time_range(), Some((4, 6)));
        assert_eq!(store.first_time(), Some(4));
        assert_eq!(store.index_of(6), Some(2));
    }

    #[test]
    fn test_seek_index() {
        let mut store = TimeSeriesStore::new(0);
        store.set_data(vec![candle(10, 1.0), candle(20, 1.0), candle(30, 1.0)]).unwrap();
        assert_eq!(store.seek_index(20), 1);
        assert_eq!(store.seek_index(25), 0);
    }

    #[test]
    fn test_price_range() {
        let mut store = TimeSeriesStore::new(0);
        store
            .set_data(vec![
                Candle::new(1, 10.0, 12.0, 9.0, 11.0, 1.0),
                Candle::new(2, 11.0, 15.0, 10.0, 14.0, 1.0),
                Candle::new(3, 14.0, 20.0, 13.0, 19.0, 1.0),
            ])
            .unwrap();
        assert_eq!(store.price_range(1, 2), Some((9.0, 15.0)));
        assert_eq!(store.price_range(5, 9), None);
    }

    #[test]
    fn test_parse_dataset_forms() {
        let env = r#"{"data": [{"time": 1, "open": 1, "high": 1, "low": 1, "close": 1, "volume": 1},
                                {"time": 2, "open": 1, "high": 1, "low": 1, "close": 1, "volume": 1}],
                      "initialCount": 1}"#;
        let ds = parse_dataset(env).unwrap();
        assert_eq!(ds.initial().len(), 1);
        assert_eq!(ds.remaining().len(), 1);

        let bare = r#"[{"time": "2024-01-02", "open": 1, "high": 1, "low": 1, "close": 1}]"#;
        let ds = parse_dataset(bare).unwrap();
        assert_eq!(ds.initial_count, 1);
        assert_eq!(ds.candles[0].time, 1_704_153_600);
    }
}
