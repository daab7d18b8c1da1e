use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constant::{EqualKind, PivotKind, Timescale};
use crate::swing::SwingPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualHighLow {
    #[serde(rename = "type")]
    pub kind: EqualKind,
    pub timescale: Timescale,
    pub time1: i64,
    pub time2: i64,
    pub price1: f64,
    pub price2: f64,
}

/// Pairs each new pivot with the previous pivot of the same kind on one timescale.
#[derive(Debug, Clone)]
pub struct EqualHighLowDetector {
    tolerance: f64,
    last_high: Option<SwingPoint>,
    last_low: Option<SwingPoint>,
    /// Time of the first low later than `last_high`.
    low_after_high: Option<i64>,
    /// Time of the first high later than `last_low`.
    high_after_low: Option<i64>,
    rows: Vec<EqualHighLow>,
}

/// Detector state captured before a step, restored by [`EqualHighLowDetector::rewind`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct EqualMark {
    last_high: Option<SwingPoint>,
    last_low: Option<SwingPoint>,
    low_after_high: Option<i64>,
    high_after_low: Option<i64>,
    rows: usize,
}

impl EqualHighLowDetector {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            last_high: None,
            last_low: None,
            low_after_high: None,
            high_after_low: None,
            rows: Vec::new(),
        }
    }

    /// Pivots must arrive in time order.
    pub fn on_pivot(&mut self, pivot: &SwingPoint) -> Option<EqualHighLow> {
        // A bar can be a high and a low pivot at once, so the opposite side only
        // counts once it is strictly later than the same-kind pivot it follows.
        let (previous, opposite_after, last_opposite, opposite_slot) = match pivot.kind {
            PivotKind::High => (
                self.last_high.replace(*pivot),
                self.low_after_high.take(),
                self.last_low,
                &mut self.high_after_low,
            ),
            PivotKind::Low => (
                self.last_low.replace(*pivot),
                self.high_after_low.take(),
                self.last_high,
                &mut self.low_after_high,
            ),
        };
        if opposite_slot.is_none() && last_opposite.is_some_and(|o| o.time < pivot.time) {
            *opposite_slot = Some(pivot.time);
        }

        let previous = previous?;
        let separated = opposite_after.is_some_and(|time| time < pivot.time);
        if separated || !within_tolerance(previous.price, pivot.price, self.tolerance) {
            return None;
        }

        let record = EqualHighLow {
            kind: match pivot.kind {
                PivotKind::High => EqualKind::EqualHighs,
                PivotKind::Low => EqualKind::EqualLows,
            },
            timescale: pivot.timescale,
            time1: previous.time,
            time2: pivot.time,
            price1: previous.price,
            price2: pivot.price,
        };
        debug!(
            kind = record.kind.as_str(),
            timescale = record.timescale.as_str(),
            time1 = record.time1,
            time2 = record.time2,
            "equal pivots"
        );
        self.rows.push(record);
        Some(record)
    }

    pub fn all_rows(&self) -> &[EqualHighLow] {
        &self.rows
    }

    pub(crate) fn mark(&self) -> EqualMark {
        EqualMark {
            last_high: self.last_high,
            last_low: self.last_low,
            low_after_high: self.low_after_high,
            high_after_low: self.high_after_low,
            rows: self.rows.len(),
        }
    }

    pub(crate) fn rewind(&mut self, mark: EqualMark) {
        self.last_high = mark.last_high;
        self.last_low = mark.last_low;
        self.low_after_high = mark.low_after_high;
        self.high_after_low = mark.high_after_low;
        self.rows.truncate(mark.rows);
    }
}

/// Batch form of [`EqualHighLowDetector`] over time-ordered pivots of any timescale.
pub fn detect_equal_highs_lows(pivots: &[SwingPoint], tolerance: f64) -> Vec<EqualHighLow> {
    let mut internal = EqualHighLowDetector::new(tolerance);
    let mut swing = EqualHighLowDetector::new(tolerance);
    let mut out = Vec::new();
    for pivot in pivots {
        let detector = match pivot.timescale {
            Timescale::Internal => &mut internal,
            Timescale::Swing => &mut swing,
        };
        out.extend(detector.on_pivot(pivot));
    }
    out
}

fn within_tolerance(reference: f64, price: f64, tolerance: f64) -> bool {
    if reference == 0.0 {
        return price == 0.0;
    }
    ((reference - price) / reference).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::detect_equal_highs_lows;
    use crate::constant::{EqualKind, PivotKind, SwingLabel, Timescale};
    use crate::swing::SwingPoint;

    fn pivot(time: i64, price: f64, kind: PivotKind) -> SwingPoint {
        SwingPoint {
            time,
            price,
            kind,
            label: SwingLabel::LowerHigh,
            timescale: Timescale::Internal,
        }
    }

    #[test]
    fn opposite_pivot_between_breaks_the_pair() {
        let pivots = vec![
            pivot(1, 100.0, PivotKind::High),
            pivot(2, 95.0, PivotKind::Low),
            pivot(3, 100.02, PivotKind::High),
        ];
        assert!(detect_equal_highs_lows(&pivots, 0.001).is_empty());
    }

    #[test]
    fn equal_lows_pair_only_adjacent_pivots() {
        let pivots = vec![
            pivot(1, 50.0, PivotKind::Low),
            pivot(4, 50.04, PivotKind::Low),
            pivot(9, 50.2, PivotKind::Low),
        ];
        let rows = detect_equal_highs_lows(&pivots, 0.001);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, EqualKind::EqualLows);
        assert_eq!((rows[0].time1, rows[0].time2), (1, 4));
    }

    #[test]
    fn outside_bar_does_not_hide_an_earlier_opposite_pivot() {
        // The bar at t4 is both a high and a low pivot; the high at t2 still separates the lows.
        let pivots = vec![
            pivot(1, 5.0, PivotKind::Low),
            pivot(2, 11.0, PivotKind::High),
            pivot(4, 12.0, PivotKind::High),
            pivot(4, 5.002, PivotKind::Low),
        ];
        assert!(detect_equal_highs_lows(&pivots, 0.001).is_empty());
    }

    #[test]
    fn same_bar_opposite_pivot_does_not_separate() {
        let pivots = vec![
            pivot(1, 5.0, PivotKind::Low),
            pivot(3, 12.0, PivotKind::High),
            pivot(3, 5.002, PivotKind::Low),
        ];
        let rows = detect_equal_highs_lows(&pivots, 0.001);
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].time1, rows[0].time2), (1, 3));
    }

    #[test]
    fn timescales_are_paired_independently() {
        let mut swing_high = pivot(2, 100.01, PivotKind::High);
        swing_high.timescale = Timescale::Swing;
        let pivots = vec![pivot(1, 100.0, PivotKind::High), swing_high];
        assert!(detect_equal_highs_lows(&pivots, 0.001).is_empty());
    }
}
