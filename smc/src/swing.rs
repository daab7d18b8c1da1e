use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::bar::Candle;
use crate::constant::{PivotKind, SwingLabel, Timescale};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwingPoint {
    pub time: i64,
    pub price: f64,
    #[serde(rename = "swing")]
    pub kind: PivotKind,
    #[serde(rename = "type")]
    pub label: SwingLabel,
    pub timescale: Timescale,
}

/// Confirms pivots at one window width as candles arrive.
///
/// The candidate for a candle at index `n` is bar `n - length`; it is evaluated
/// exactly once, against the window `[n - 2 * length, n]` clamped to the start of
/// the history. Ties resolve to the earliest bar.
#[derive(Debug, Clone)]
pub struct PivotDetector {
    timescale: Timescale,
    length: usize,
    rows: Vec<SwingPoint>,
    last_high_price: Option<f64>,
    last_low_price: Option<f64>,
}

impl PivotDetector {
    pub fn new(timescale: Timescale, length: usize) -> Self {
        Self {
            timescale,
            length: length.max(1),
            rows: Vec::new(),
            last_high_price: None,
            last_low_price: None,
        }
    }

    /// Evaluates the candidate whose confirmation window closes with the last
    /// candle of `candles` and returns the pivots confirmed by it.
    pub fn on_candle(&mut self, candles: &[Candle]) -> Vec<SwingPoint> {
        let Some(n) = candles.len().checked_sub(1) else {
            return Vec::new();
        };
        let Some(pivot) = n.checked_sub(self.length) else {
            return Vec::new();
        };
        let start = pivot.saturating_sub(self.length);
        let window = &candles[start..=n];
        let offset = pivot - start;

        let mut out = Vec::with_capacity(2);
        if is_window_extreme(window, offset, PivotKind::High) {
            out.push(self.confirm(&candles[pivot], PivotKind::High));
        }
        if is_window_extreme(window, offset, PivotKind::Low) {
            out.push(self.confirm(&candles[pivot], PivotKind::Low));
        }
        out
    }

    fn confirm(&mut self, candle: &Candle, kind: PivotKind) -> SwingPoint {
        let (price, label) = match kind {
            PivotKind::High => {
                let label = match self.last_high_price {
                    Some(prev) if candle.high <= prev => SwingLabel::LowerHigh,
                    _ => SwingLabel::HigherHigh,
                };
                self.last_high_price = Some(candle.high);
                (candle.high, label)
            }
            PivotKind::Low => {
                let label = match self.last_low_price {
                    Some(prev) if candle.low > prev => SwingLabel::HigherLow,
                    _ => SwingLabel::LowerLow,
                };
                self.last_low_price = Some(candle.low);
                (candle.low, label)
            }
        };

        let point = SwingPoint {
            time: candle.time,
            price,
            kind,
            label,
            timescale: self.timescale,
        };
        trace!(
            timescale = self.timescale.as_str(),
            time = point.time,
            price = point.price,
            label = point.label.as_str(),
            "pivot confirmed"
        );
        self.rows.push(point);
        point
    }

    pub fn all_rows(&self) -> &[SwingPoint] {
        &self.rows
    }

    pub(crate) fn mark(&self) -> PivotMark {
        PivotMark {
            rows: self.rows.len(),
            last_high_price: self.last_high_price,
            last_low_price: self.last_low_price,
        }
    }

    pub(crate) fn rewind(&mut self, mark: PivotMark) {
        self.rows.truncate(mark.rows);
        self.last_high_price = mark.last_high_price;
        self.last_low_price = mark.last_low_price;
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PivotMark {
    rows: usize,
    last_high_price: Option<f64>,
    last_low_price: Option<f64>,
}

/// Batch form of [`PivotDetector`]: every pivot confirmed over `candles`.
pub fn detect_pivots(candles: &[Candle], length: usize, timescale: Timescale) -> Vec<SwingPoint> {
    let mut detector = PivotDetector::new(timescale, length);
    for end in 1..=candles.len() {
        detector.on_candle(&candles[..end]);
    }
    detector.rows
}

fn is_window_extreme(window: &[Candle], offset: usize, kind: PivotKind) -> bool {
    let value = |c: &Candle| match kind {
        PivotKind::High => c.high,
        PivotKind::Low => -c.low,
    };
    let candidate = value(&window[offset]);
    window.iter().enumerate().all(|(idx, c)| {
        if idx < offset {
            value(c) < candidate
        } else {
            value(c) <= candidate
        }
    })
}
