use serde::{Deserialize, Serialize};

use crate::constant::SmcError;

/// One OHLC bar keyed by its opening time in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }

    pub fn is_up(&self) -> bool {
        self.close > self.open
    }

    pub fn is_down(&self) -> bool {
        self.close < self.open
    }

    /// True when `[low, high]` shares at least one price with `[bottom, top]`.
    pub fn overlaps(&self, bottom: f64, top: f64) -> bool {
        self.low <= top && self.high >= bottom
    }

    /// Folds a later print of the same bar into this one.
    pub fn merge(&self, update: &Candle) -> Candle {
        Candle {
            time: self.time,
            open: self.open,
            high: self.high.max(update.high),
            low: self.low.min(update.low),
            close: update.close,
        }
    }

    pub fn validate(&self) -> Result<(), SmcError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|x| !x.is_finite()) {
            return Err(SmcError::InvalidCandle {
                time: self.time,
                reason: "non-finite price".to_string(),
            });
        }
        if self.high < self.low {
            return Err(SmcError::InvalidCandle {
                time: self.time,
                reason: format!("high {} below low {}", self.high, self.low),
            });
        }
        Ok(())
    }
}
