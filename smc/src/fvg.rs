use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bar::Candle;
use crate::constant::Bias;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairValueGap {
    /// Time of the middle candle of the three-bar pattern.
    pub time: i64,
    pub top: f64,
    pub bottom: f64,
    pub bias: Bias,
    pub filled: bool,
    pub filled_time: Option<i64>,
}

/// Returns the imbalance formed by `a`, `b`, `c`, if any.
pub fn detect_gap(a: &Candle, b: &Candle, c: &Candle) -> Option<FairValueGap> {
    let (top, bottom, bias) = if a.high < c.low {
        (c.low, a.high, Bias::Bullish)
    } else if a.low > c.high {
        (a.low, c.high, Bias::Bearish)
    } else {
        return None;
    };
    Some(FairValueGap {
        time: b.time,
        top,
        bottom,
        bias,
        filled: false,
        filled_time: None,
    })
}

#[derive(Debug, Clone, Default)]
pub struct FairValueGapTracker {
    rows: Vec<FairValueGap>,
    active: Vec<usize>,
}

impl FairValueGapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_candle(&mut self, candles: &[Candle]) {
        let Some(last) = candles.last() else {
            return;
        };
        self.fill(last);

        let [a, b, c] = match candles {
            [.., a, b, c] => [a, b, c],
            _ => return,
        };
        if let Some(gap) = detect_gap(a, b, c) {
            debug!(
                time = gap.time,
                top = gap.top,
                bottom = gap.bottom,
                bias = gap.bias.as_str(),
                "fair value gap detected"
            );
            self.active.push(self.rows.len());
            self.rows.push(gap);
        }
    }

    fn fill(&mut self, candle: &Candle) {
        let rows = &mut self.rows;
        self.active.retain(|&idx| {
            let gap = &mut rows[idx];
            if !candle.overlaps(gap.bottom, gap.top) {
                return true;
            }
            gap.filled = true;
            gap.filled_time = Some(candle.time);
            debug!(time = gap.time, filled_time = candle.time, "fair value gap filled");
            false
        });
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn all_rows(&self) -> &[FairValueGap] {
        &self.rows
    }

    pub(crate) fn mark(&self) -> GapMark {
        GapMark {
            rows: self.rows.len(),
            active: self.active.clone(),
        }
    }

    pub(crate) fn rewind(&mut self, mark: GapMark) {
        self.rows.truncate(mark.rows);
        for &idx in &mark.active {
            let gap = &mut self.rows[idx];
            gap.filled = false;
            gap.filled_time = None;
        }
        self.active = mark.active;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GapMark {
    rows: usize,
    active: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::{FairValueGapTracker, detect_gap};
    use crate::bar::Candle;
    use crate::constant::Bias;

    #[test]
    fn bearish_gap_spans_a_low_to_c_high() {
        let a = Candle::new(0, 20.0, 21.0, 19.0, 19.5);
        let b = Candle::new(1, 19.5, 19.6, 15.0, 15.2);
        let c = Candle::new(2, 15.2, 16.0, 14.0, 14.5);
        let gap = detect_gap(&a, &b, &c).expect("bearish gap");
        assert_eq!(gap.bias, Bias::Bearish);
        assert_eq!((gap.top, gap.bottom), (19.0, 16.0));
        assert_eq!(gap.time, 1);
    }

    #[test]
    fn overlapping_triple_has_no_gap() {
        let a = Candle::new(0, 10.0, 12.0, 9.0, 11.0);
        let b = Candle::new(1, 11.0, 13.0, 10.0, 12.0);
        let c = Candle::new(2, 12.0, 14.0, 11.5, 13.0);
        assert!(detect_gap(&a, &b, &c).is_none());
    }

    #[test]
    fn gap_is_not_filled_by_its_own_pattern() {
        let candles = vec![
            Candle::new(0, 9.0, 10.0, 8.0, 9.5),
            Candle::new(1, 12.0, 13.0, 12.0, 12.5),
            Candle::new(2, 14.5, 15.0, 14.0, 14.8),
        ];
        let mut tracker = FairValueGapTracker::new();
        for end in 1..=candles.len() {
            tracker.on_candle(&candles[..end]);
        }
        assert_eq!(tracker.all_rows().len(), 1);
        assert!(!tracker.all_rows()[0].filled);
        assert_eq!(tracker.active_count(), 1);
    }

    #[test]
    fn rewound_fill_can_be_replayed_with_a_revised_candle() {
        let mut candles = vec![
            Candle::new(0, 9.0, 10.0, 8.0, 9.5),
            Candle::new(1, 12.0, 13.0, 12.0, 12.5),
            Candle::new(2, 14.5, 15.0, 14.0, 14.8),
        ];
        let mut tracker = FairValueGapTracker::new();
        for end in 1..=candles.len() {
            tracker.on_candle(&candles[..end]);
        }

        let mark = tracker.mark();
        candles.push(Candle::new(3, 14.8, 15.0, 11.0, 11.5));
        tracker.on_candle(&candles);
        assert_eq!(tracker.all_rows()[0].filled_time, Some(3));

        tracker.rewind(mark);
        candles[3] = Candle::new(3, 14.8, 16.0, 14.5, 15.5);
        tracker.on_candle(&candles);
        assert!(!tracker.all_rows()[0].filled);
        assert_eq!(tracker.active_count(), 1);
    }
}
