use smc::{
    CandleUpdate, SmcConfig, SmcEngine, SmcError, TickCandleAggregator, TickInput,
    load_candles_csv,
};

fn temp_csv(name: &str, body: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("smc_{name}_{}.csv", std::process::id()));
    std::fs::write(&path, body).expect("write csv");
    path
}

#[test]
fn csv_with_epoch_and_datetime_columns_loads() {
    let path = temp_csv(
        "mixed",
        "time,open,high,low,close\n\
         1700000000,100.0,101.0,99.0,100.5\n\
         1700000060000,100.5,102.0,100.0,101.5\n\
         2023-11-14 22:15:20,101.5,101.8,100.9,101.0\n",
    );
    let candles = load_candles_csv(&path).expect("csv load");
    let _ = std::fs::remove_file(&path);

    let times = candles.iter().map(|c| c.time).collect::<Vec<_>>();
    assert_eq!(times, vec![1_700_000_000, 1_700_000_060, 1_700_000_120]);
    assert_eq!(candles[1].high, 102.0);
}

#[test]
fn csv_price_aliases_are_accepted() {
    let path = temp_csv(
        "aliases",
        "datetime,open_price,high_price,low_price,close_price\n\
         2023-11-14T22:13:20Z,1.0,2.0,0.5,1.5\n",
    );
    let candles = load_candles_csv(&path).expect("csv load");
    let _ = std::fs::remove_file(&path);

    assert_eq!(candles.len(), 1);
    assert_eq!(candles[0].time, 1_700_000_000);
    assert_eq!((candles[0].low, candles[0].close), (0.5, 1.5));
}

#[test]
fn bad_datetime_surfaces_as_error() {
    let path = temp_csv("bad", "time,open,high,low,close\nnot-a-time,1,2,0.5,1.5\n");
    let err = load_candles_csv(&path).expect_err("bad time");
    let _ = std::fs::remove_file(&path);
    assert!(matches!(err, SmcError::InvalidDatetime(_)));
}

#[test]
fn missing_file_is_csv_error() {
    let path = std::env::temp_dir().join("smc_definitely_missing_input.csv");
    assert!(matches!(load_candles_csv(&path), Err(SmcError::Csv(_))));
}

#[test]
fn aggregated_ticks_drive_the_engine_like_closed_candles() {
    let quotes = (0..600)
        .map(|i| {
            let x = i as f64;
            TickInput {
                time: 1_700_000_000 + i * 7,
                price: 100.0 + 8.0 * (x / 45.0).sin() + 2.0 * (x / 9.0).cos(),
            }
        })
        .collect::<Vec<_>>();

    let config = SmcConfig {
        swing_length: 4,
        internal_length: 2,
        ..SmcConfig::default()
    };
    let mut aggregator = TickCandleAggregator::new(60).expect("granularity");
    let mut live = SmcEngine::new(config.clone()).expect("config");
    let mut upserts = 0usize;
    for quote in quotes {
        if let Some(update) = aggregator.update_tick(quote) {
            if matches!(update, CandleUpdate::UpsertLast(_)) {
                upserts += 1;
            }
            live.apply_update(update).expect("apply update");
        }
    }
    assert!(upserts > 0);
    assert!(live.candles().iter().all(|c| c.time % 60 == 0));

    let mut batch = SmcEngine::new(config).expect("config");
    batch.calculate(live.candles()).expect("batch");
    assert_eq!(live.snapshot(), batch.snapshot());
}
