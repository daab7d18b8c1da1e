use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use tracing::info;

use crate::bar::Candle;
use crate::constant::SmcError;

#[derive(Debug, Deserialize)]
struct CsvCandleRow {
    #[serde(alias = "timestamp", alias = "datetime", alias = "epoch")]
    time: String,
    #[serde(alias = "open_price")]
    open: f64,
    #[serde(alias = "high_price")]
    high: f64,
    #[serde(alias = "low_price")]
    low: f64,
    #[serde(alias = "close_price")]
    close: f64,
}

/// Reads an OHLC csv into candles, in file order. Ordering and price checks are left
/// to the engine.
pub fn load_candles_csv(file_path: impl AsRef<Path>) -> Result<Vec<Candle>, SmcError> {
    let file_path = file_path.as_ref();
    let mut reader = csv::Reader::from_path(file_path)?;
    let mut out = Vec::new();

    for row in reader.deserialize::<CsvCandleRow>() {
        let row = row?;
        let time = parse_time(&row.time)?;
        out.push(Candle::new(time, row.open, row.high, row.low, row.close));
    }

    info!(path = %file_path.display(), rows = out.len(), "loaded candles");
    Ok(out)
}

/// Parses a candle time into epoch seconds.
///
/// Integers with 13 or more digits are read as milliseconds.
pub fn parse_time(value: &str) -> Result<i64, SmcError> {
    let value = value.trim();
    if let Ok(raw) = value.parse::<i64>() {
        let digits = value.trim_start_matches('-').len();
        return Ok(if digits >= 13 { raw.div_euclid(1000) } else { raw });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }

    let patterns = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y%m%d%H%M%S%.f",
    ];

    for pattern in patterns {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Ok(dt.and_utc().timestamp());
        }
    }

    Err(SmcError::InvalidDatetime(value.to_string()))
}
