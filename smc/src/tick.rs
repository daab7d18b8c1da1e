use serde::{Deserialize, Serialize};

use crate::bar::Candle;
use crate::constant::SmcError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    pub time: i64,
    pub price: f64,
}

/// How a live update lands on the engine history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CandleUpdate {
    Append(Candle),
    UpsertLast(Candle),
}

/// Folds quotes or partial candles into fixed-width buckets.
///
/// Times are floored to the granularity. An input in the forming bucket extends it,
/// a later bucket starts a new candle and anything older is dropped.
#[derive(Debug, Clone)]
pub struct TickCandleAggregator {
    granularity: i64,
    current: Option<Candle>,
}

impl TickCandleAggregator {
    pub fn new(granularity_secs: i64) -> Result<Self, SmcError> {
        if granularity_secs <= 0 {
            return Err(SmcError::InvalidConfiguration(format!(
                "granularity must be positive, got {granularity_secs}"
            )));
        }
        Ok(Self {
            granularity: granularity_secs,
            current: None,
        })
    }

    fn bucket(&self, time: i64) -> i64 {
        time.div_euclid(self.granularity) * self.granularity
    }

    pub fn update_tick(&mut self, tick: TickInput) -> Option<CandleUpdate> {
        self.update_candle(Candle::new(tick.time, tick.price, tick.price, tick.price, tick.price))
    }

    pub fn update_candle(&mut self, candle: Candle) -> Option<CandleUpdate> {
        let bucket_time = self.bucket(candle.time);
        let aligned = Candle { time: bucket_time, ..candle };

        match self.current.as_mut() {
            Some(current) if current.time == bucket_time => {
                *current = current.merge(&aligned);
                Some(CandleUpdate::UpsertLast(*current))
            }
            Some(current) if bucket_time < current.time => None,
            _ => {
                self.current = Some(aligned);
                Some(CandleUpdate::Append(aligned))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CandleUpdate, TickCandleAggregator, TickInput};

    #[test]
    fn non_positive_granularity_is_rejected() {
        assert!(TickCandleAggregator::new(0).is_err());
        assert!(TickCandleAggregator::new(-60).is_err());
    }

    #[test]
    fn ticks_fold_into_floored_buckets() {
        let mut agg = TickCandleAggregator::new(60).expect("valid granularity");

        let first = agg.update_tick(TickInput { time: 125, price: 10.0 });
        assert!(matches!(first, Some(CandleUpdate::Append(c)) if c.time == 120));

        agg.update_tick(TickInput { time: 130, price: 12.0 });
        let merged = agg.update_tick(TickInput { time: 170, price: 9.0 });
        let Some(CandleUpdate::UpsertLast(c)) = merged else {
            panic!("expected upsert, got {merged:?}");
        };
        assert_eq!((c.time, c.open, c.high, c.low, c.close), (120, 10.0, 12.0, 9.0, 9.0));

        let next = agg.update_tick(TickInput { time: 180, price: 11.0 });
        assert!(matches!(next, Some(CandleUpdate::Append(c)) if c.time == 180));
        assert!(agg.update_tick(TickInput { time: 100, price: 11.0 }).is_none());
    }
}
