//! Offline driver that streams a candle file through the engine and packages the
//! result for chart overlays.

use serde::Serialize;
use smc::{Candle, SmcConfig, SmcEngine, SmcError, SmcSnapshot};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct CandlePoint {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<&Candle> for CandlePoint {
    fn from(value: &Candle) -> Self {
        Self {
            time: value.time,
            open: value.open,
            high: value.high,
            low: value.low,
            close: value.close,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportPayload {
    pub candles: Vec<CandlePoint>,
    pub snapshot: SmcSnapshot,
}

/// Feeds `candles` one at a time, the way a live feed would, and returns the
/// engine together with the payload built from its final snapshot. The snapshot
/// is only assembled once, after the last candle.
pub fn replay_candles(
    candles: &[Candle],
    config: SmcConfig,
    max_rows: Option<usize>,
) -> Result<(SmcEngine, ExportPayload), SmcError> {
    let mut engine = SmcEngine::new(config)?;
    for candle in candles.iter().take(max_rows.unwrap_or(usize::MAX)) {
        engine.append_candle(*candle)?;
    }

    let payload = ExportPayload {
        candles: engine.candles().iter().map(CandlePoint::from).collect(),
        snapshot: engine.snapshot().clone(),
    };
    info!(
        candles = payload.candles.len(),
        swing_length = engine.config().swing_length,
        internal_length = engine.config().internal_length,
        structures = payload.snapshot.structures.len(),
        "replay finished"
    );
    Ok((engine, payload))
}
