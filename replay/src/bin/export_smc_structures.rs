use std::fs;
use std::path::PathBuf;

use replay::replay_candles;
use smc::{SmcConfig, init_logging, load_candles_csv};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "usage: cargo run -p replay --bin export_smc_structures -- <csv_path> [output_json] [config_yaml] [max_rows] [parquet_dir]"
        );
        std::process::exit(2);
    }
    init_logging();

    let csv_path = PathBuf::from(&args[1]);
    let output = match args.get(2) {
        Some(raw) => PathBuf::from(raw),
        None => PathBuf::from("replay/out/smc-structures.json"),
    };
    let config = match args.get(3).filter(|x| !x.is_empty() && x.as_str() != "-") {
        Some(raw) => SmcConfig::from_yaml_file(raw)?,
        None => SmcConfig::default(),
    };
    let max_rows = match args.get(4) {
        Some(raw) => Some(raw.parse::<usize>()?),
        None => None,
    };
    let parquet_dir = args.get(5).map(PathBuf::from);

    let candles = load_candles_csv(&csv_path)?;
    let (engine, payload) = replay_candles(&candles, config, max_rows)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, serde_json::to_vec_pretty(&payload)?)?;

    if let Some(dir) = parquet_dir.as_ref() {
        engine.snapshot().write_parquet_snapshot(dir)?;
    }

    let snapshot = &payload.snapshot;
    println!(
        "exported {} bars to {} (pivots={}, structures={}, order_blocks={}, fvg={}, eq={}, swing_trend={}, internal_trend={})",
        payload.candles.len(),
        output.display(),
        snapshot.swing_points.len(),
        snapshot.structures.len(),
        snapshot.order_blocks.len(),
        snapshot.fair_value_gaps.len(),
        snapshot.equal_highs_lows.len(),
        snapshot.swing_trend.as_str(),
        snapshot.internal_trend.as_str(),
    );

    Ok(())
}
