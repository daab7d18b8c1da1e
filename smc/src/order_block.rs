use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bar::Candle;
use crate::constant::Bias;
use crate::trend::StructureEvent;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBlock {
    pub time: i64,
    pub high: f64,
    pub low: f64,
    pub bias: Bias,
    /// Close time of the structure break that produced the block.
    pub break_time: i64,
    pub mitigated: bool,
    pub mitigated_time: Option<i64>,
}

impl OrderBlock {
    fn is_mitigated_by(&self, candle: &Candle) -> bool {
        match self.bias {
            Bias::Bullish => candle.low <= self.low,
            Bias::Bearish => candle.high >= self.high,
            Bias::Neutral => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBlockTracker {
    lookback: usize,
    rows: Vec<OrderBlock>,
    active: Vec<usize>,
}

impl OrderBlockTracker {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            rows: Vec::new(),
            active: Vec::new(),
        }
    }

    /// Runs mitigation for the latest candle, then derives blocks from the
    /// structure breaks that closed on it.
    pub fn on_candle(&mut self, candles: &[Candle], breaks: &[StructureEvent]) {
        let Some(last) = candles.last() else {
            return;
        };
        self.mitigate(last);

        let break_index = candles.len() - 1;
        for event in breaks {
            self.push_from_break(candles, break_index, event);
        }
    }

    fn mitigate(&mut self, candle: &Candle) {
        let rows = &mut self.rows;
        self.active.retain(|&idx| {
            let block = &mut rows[idx];
            if !block.is_mitigated_by(candle) {
                return true;
            }
            block.mitigated = true;
            block.mitigated_time = Some(candle.time);
            debug!(
                time = block.time,
                bias = block.bias.as_str(),
                mitigated_time = candle.time,
                "order block mitigated"
            );
            false
        });
    }

    fn push_from_break(&mut self, candles: &[Candle], break_index: usize, event: &StructureEvent) {
        let floor = break_index.saturating_sub(self.lookback);
        let origin = (floor..break_index).rev().map(|idx| &candles[idx]).find(|c| match event.direction {
            Bias::Bullish => c.is_down(),
            Bias::Bearish => c.is_up(),
            Bias::Neutral => false,
        });

        let Some(origin) = origin else {
            debug!(
                break_time = event.time,
                direction = event.direction.as_str(),
                "no opposite candle within look-back, order block skipped"
            );
            return;
        };

        let block = OrderBlock {
            time: origin.time,
            high: origin.high,
            low: origin.low,
            bias: event.direction,
            break_time: event.time,
            mitigated: false,
            mitigated_time: None,
        };
        debug!(
            time = block.time,
            high = block.high,
            low = block.low,
            bias = block.bias.as_str(),
            "order block created"
        );
        self.active.push(self.rows.len());
        self.rows.push(block);
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn all_rows(&self) -> &[OrderBlock] {
        &self.rows
    }

    pub(crate) fn mark(&self) -> OrderBlockMark {
        OrderBlockMark {
            rows: self.rows.len(),
            active: self.active.clone(),
        }
    }

    /// Blocks active at the mark are exactly the ones a later step may have mitigated.
    pub(crate) fn rewind(&mut self, mark: OrderBlockMark) {
        self.rows.truncate(mark.rows);
        for &idx in &mark.active {
            let block = &mut self.rows[idx];
            block.mitigated = false;
            block.mitigated_time = None;
        }
        self.active = mark.active;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OrderBlockMark {
    rows: usize,
    active: Vec<usize>,
}
