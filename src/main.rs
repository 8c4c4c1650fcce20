#[cfg(not(feature = "gui"))]
use serde::Serialize;
use std::{env, fs, process};

use replay_chart::core::parse_dataset;
use replay_chart::{init_logging, ChartConfig, ChartEngine, ChartResult, ConfigManager, IndicatorSpec};

const USAGE: &str = "Usage: replay_chart <candles.json> [indicators.json] [config.toml]";

/// Printed to stdout once the replay finishes
#[cfg(not(feature = "gui"))]
#[derive(Debug, Serialize)]
struct ReplaySummary {
    candles: usize,
    streamed: usize,
    stale: usize,
    indicators: Vec<String>,
    rejected: Vec<String>,
    secondary_visible: bool,
    secondary_height: f32,
    markers: usize,
    profiles: Vec<ProfileSummary>,
}

#[cfg(not(feature = "gui"))]
#[derive(Debug, Serialize)]
struct ProfileSummary {
    id: String,
    bins: usize,
    poc_price: f64,
    max_volume: f64,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let Some(candles_path) = args.get(1) else {
        eprintln!("{}", USAGE);
        process::exit(2);
    };

    let mut manager = match args.get(3) {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    manager.load_or_default();
    init_logging(&manager.config().logging);
    log::info!("replay_chart {} using {}", replay_chart::VERSION, manager.path().display());

    if let Err(e) = run(candles_path, args.get(2).map(String::as_str), manager.into_config()) {
        log::error!("Replay failed [{}]: {}", e.category(), e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_indicators(path: Option<&str>) -> ChartResult<Vec<IndicatorSpec>> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(Vec::new()),
    }
}

fn run(candles_path: &str, indicators_path: Option<&str>, config: ChartConfig) -> ChartResult<()> {
    let dataset = parse_dataset(&fs::read_to_string(candles_path)?)?;
    let indicators = load_indicators(indicators_path)?;

    let mut engine = ChartEngine::new(config)?;
    let (report, layout) = engine.set_indicators(&indicators);
    engine.load_dataset(dataset.initial().to_vec())?;
    log::info!(
        "Loaded {} of {} candles, {} indicators, secondary pane {} px",
        dataset.initial().len(),
        dataset.candles.len(),
        report.added.len(),
        layout.secondary_height
    );

    #[cfg(feature = "gui")]
    {
        let cursor = dataset.initial().len();
        return replay_chart::gui::run(engine, dataset.candles, cursor)
            .map_err(|e| replay_chart::ChartError::surface_unavailable("viewer", e.to_string()));
    }

    #[cfg(not(feature = "gui"))]
    {
        let summary = replay(&mut engine, &dataset.candles, dataset.initial().len(), report.rejected);
        let text = serde_json::to_string_pretty(&summary)?;
        println!("{}", text);
        Ok(())
    }
}

/// Stream everything past the initial window; with nothing left, the last
/// candle is replayed as an amendment of the current bar.
#[cfg(not(feature = "gui"))]
fn replay(engine: &mut ChartEngine, candles: &[replay_chart::Candle], initial: usize, rejected: Vec<String>) -> ReplaySummary {
    let mut pending: Vec<_> = candles[initial.min(candles.len())..].to_vec();
    if pending.is_empty() {
        pending.extend(candles.last().cloned());
    }

    let mut stale = 0;
    for record in &pending {
        if engine.apply_record(record.clone()).is_stale() {
            stale += 1;
        }
    }

    let layout = engine.layout();
    let profiles = engine
        .registrar()
        .profiles()
        .into_iter()
        .map(|(spec, profile)| {
            log::info!("{}: {} bins, POC {}", spec.id, profile.bins.len(), profile.poc_price);
            ProfileSummary {
                id: spec.id.clone(),
                bins: profile.bins.len(),
                poc_price: profile.poc_price,
                max_volume: profile.max_volume,
            }
        })
        .collect();

    ReplaySummary {
        candles: engine.store().len(),
        streamed: pending.len(),
        stale,
        indicators: engine.registrar().ids(),
        rejected,
        secondary_visible: layout.secondary_visible,
        secondary_height: layout.secondary_height,
        markers: engine.markers().len(),
        profiles,
    }
}
