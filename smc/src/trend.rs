use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bar::Candle;
use crate::constant::{Bias, PivotKind, StructureKind, Timescale};
use crate::swing::SwingPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendState {
    pub direction: Bias,
    pub last_swing_high: Option<SwingPoint>,
    pub last_swing_low: Option<SwingPoint>,
}

impl Default for TrendState {
    fn default() -> Self {
        Self {
            direction: Bias::Neutral,
            last_swing_high: None,
            last_swing_low: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureEvent {
    pub time: i64,
    #[serde(rename = "type")]
    pub kind: StructureKind,
    pub direction: Bias,
    pub timescale: Timescale,
    /// Price of the pivot whose threshold was closed through.
    pub level: f64,
    pub pivot_time: i64,
}

/// A price threshold the close is compared against.
#[derive(Debug, Clone, Copy)]
struct BreakLevel {
    price: f64,
    time: i64,
    from_pivot: bool,
}

/// Trend / structure-break state machine for a single timescale.
#[derive(Debug, Clone)]
pub struct StructureTracker {
    timescale: Timescale,
    state: TrendState,
    high_level: Option<BreakLevel>,
    low_level: Option<BreakLevel>,
    seen_high_pivot: bool,
    seen_low_pivot: bool,
    pivot_count: usize,
    rows: Vec<StructureEvent>,
    swept: HashSet<(i64, PivotKind)>,
    /// Insertion order of `swept`, so a step can be undone.
    swept_log: Vec<(i64, PivotKind)>,
}

/// Tracker state captured before a step, restored by [`StructureTracker::rewind`].
#[derive(Debug, Clone)]
pub(crate) struct StructureMark {
    state: TrendState,
    high_level: Option<BreakLevel>,
    low_level: Option<BreakLevel>,
    seen_high_pivot: bool,
    seen_low_pivot: bool,
    pivot_count: usize,
    rows: usize,
    swept: usize,
}

impl StructureTracker {
    pub fn new(timescale: Timescale) -> Self {
        Self {
            timescale,
            state: TrendState::default(),
            high_level: None,
            low_level: None,
            seen_high_pivot: false,
            seen_low_pivot: false,
            pivot_count: 0,
            rows: Vec::new(),
            swept: HashSet::new(),
            swept_log: Vec::new(),
        }
    }

    pub fn on_pivot(&mut self, pivot: &SwingPoint) {
        self.pivot_count += 1;
        let level = Some(BreakLevel {
            price: pivot.price,
            time: pivot.time,
            from_pivot: true,
        });
        match pivot.kind {
            PivotKind::High => {
                self.state.last_swing_high = Some(*pivot);
                self.seen_high_pivot = true;
                self.high_level = level;
            }
            PivotKind::Low => {
                self.state.last_swing_low = Some(*pivot);
                self.seen_low_pivot = true;
                self.low_level = level;
            }
        }
    }

    /// Compares the close of `candle` with the pending thresholds. Pivots confirmed
    /// on this candle must be registered through [`Self::on_pivot`] beforehand.
    pub fn on_candle(&mut self, candle: &Candle) -> Vec<StructureEvent> {
        self.seed_bootstrap(candle);
        if self.pivot_count == 0 {
            return Vec::new();
        }

        let mut out = Vec::new();
        if let Some(level) = self.high_level {
            if candle.close > level.price {
                self.high_level = None;
                out.extend(self.on_break(candle, level, PivotKind::High));
            }
        }
        if let Some(level) = self.low_level {
            if candle.close < level.price {
                self.low_level = None;
                out.extend(self.on_break(candle, level, PivotKind::Low));
            }
        }
        out
    }

    fn seed_bootstrap(&mut self, candle: &Candle) {
        if !self.seen_high_pivot && self.high_level.is_none() && self.state.direction == Bias::Neutral {
            self.high_level = Some(BreakLevel {
                price: candle.high,
                time: candle.time,
                from_pivot: false,
            });
        }
        if !self.seen_low_pivot && self.low_level.is_none() && self.state.direction == Bias::Neutral {
            self.low_level = Some(BreakLevel {
                price: candle.low,
                time: candle.time,
                from_pivot: false,
            });
        }
    }

    fn on_break(&mut self, candle: &Candle, level: BreakLevel, kind: PivotKind) -> Option<StructureEvent> {
        let direction = match kind {
            PivotKind::High => Bias::Bullish,
            PivotKind::Low => Bias::Bearish,
        };
        let previous = self.state.direction;

        if !level.from_pivot {
            if previous == Bias::Neutral {
                self.state.direction = direction;
                debug!(
                    timescale = self.timescale.as_str(),
                    time = candle.time,
                    direction = direction.as_str(),
                    "trend seeded from opening range"
                );
            }
            return None;
        }

        if self.swept.insert((level.time, kind)) {
            self.swept_log.push((level.time, kind));
        }
        self.state.direction = direction;

        let kind = match previous {
            Bias::Neutral => return None,
            p if p == direction => StructureKind::Bos,
            _ => StructureKind::Choch,
        };
        if self.pivot_count < 2 {
            return None;
        }

        let event = StructureEvent {
            time: candle.time,
            kind,
            direction,
            timescale: self.timescale,
            level: level.price,
            pivot_time: level.time,
        };
        debug!(
            timescale = self.timescale.as_str(),
            time = event.time,
            kind = event.kind.as_str(),
            direction = event.direction.as_str(),
            level = event.level,
            "structure break"
        );
        self.rows.push(event);
        Some(event)
    }

    pub fn state(&self) -> &TrendState {
        &self.state
    }

    pub fn direction(&self) -> Bias {
        self.state.direction
    }

    pub fn is_swept(&self, pivot: &SwingPoint) -> bool {
        self.swept.contains(&(pivot.time, pivot.kind))
    }

    pub fn all_rows(&self) -> &[StructureEvent] {
        &self.rows
    }

    pub(crate) fn mark(&self) -> StructureMark {
        StructureMark {
            state: self.state.clone(),
            high_level: self.high_level,
            low_level: self.low_level,
            seen_high_pivot: self.seen_high_pivot,
            seen_low_pivot: self.seen_low_pivot,
            pivot_count: self.pivot_count,
            rows: self.rows.len(),
            swept: self.swept_log.len(),
        }
    }

    pub(crate) fn rewind(&mut self, mark: StructureMark) {
        for key in self.swept_log.drain(mark.swept..) {
            self.swept.remove(&key);
        }
        self.state = mark.state;
        self.high_level = mark.high_level;
        self.low_level = mark.low_level;
        self.seen_high_pivot = mark.seen_high_pivot;
        self.seen_low_pivot = mark.seen_low_pivot;
        self.pivot_count = mark.pivot_count;
        self.rows.truncate(mark.rows);
    }
}

#[cfg(test)]
mod tests {
    use super::StructureTracker;
    use crate::bar::Candle;
    use crate::constant::{Bias, PivotKind, StructureKind, SwingLabel, Timescale};
    use crate::swing::SwingPoint;

    fn pivot(time: i64, price: f64, kind: PivotKind) -> SwingPoint {
        SwingPoint {
            time,
            price,
            kind,
            label: match kind {
                PivotKind::High => SwingLabel::HigherHigh,
                PivotKind::Low => SwingLabel::LowerLow,
            },
            timescale: Timescale::Swing,
        }
    }

    fn close_at(time: i64, close: f64) -> Candle {
        Candle::new(time, close, close, close, close)
    }

    #[test]
    fn no_pivots_keeps_trend_neutral() {
        let mut tracker = StructureTracker::new(Timescale::Swing);
        for (t, c) in [(0, 10.0), (1, 20.0), (2, 5.0)] {
            assert!(tracker.on_candle(&close_at(t, c)).is_empty());
        }
        assert_eq!(tracker.direction(), Bias::Neutral);
    }

    #[test]
    fn first_break_assigns_direction_then_bos_and_choch_follow() {
        let mut tracker = StructureTracker::new(Timescale::Swing);
        tracker.on_candle(&close_at(0, 100.0));
        tracker.on_pivot(&pivot(1, 105.0, PivotKind::High));
        tracker.on_pivot(&pivot(2, 95.0, PivotKind::Low));

        assert!(tracker.on_candle(&close_at(3, 106.0)).is_empty());
        assert_eq!(tracker.direction(), Bias::Bullish);
        assert!(tracker.on_candle(&close_at(4, 107.0)).is_empty(), "level is retired");

        tracker.on_pivot(&pivot(5, 110.0, PivotKind::High));
        let bos = tracker.on_candle(&close_at(6, 111.0));
        assert_eq!(bos.len(), 1);
        assert_eq!(bos[0].kind, StructureKind::Bos);
        assert_eq!(bos[0].pivot_time, 5);

        let choch = tracker.on_candle(&close_at(7, 94.0));
        assert_eq!(choch.len(), 1);
        assert_eq!(choch[0].kind, StructureKind::Choch);
        assert_eq!(choch[0].direction, Bias::Bearish);
        assert_eq!(tracker.direction(), Bias::Bearish);

        assert!(tracker.is_swept(&pivot(1, 105.0, PivotKind::High)));
        assert!(tracker.is_swept(&pivot(2, 95.0, PivotKind::Low)));
        assert_eq!(tracker.all_rows().len(), 2);
    }

    #[test]
    fn replaced_pivot_is_never_swept() {
        let mut tracker = StructureTracker::new(Timescale::Internal);
        tracker.on_candle(&close_at(0, 100.0));
        tracker.on_pivot(&pivot(1, 105.0, PivotKind::High));
        tracker.on_pivot(&pivot(2, 103.0, PivotKind::High));
        tracker.on_candle(&close_at(3, 104.0));

        assert!(!tracker.is_swept(&pivot(1, 105.0, PivotKind::High)));
        assert!(tracker.is_swept(&pivot(2, 103.0, PivotKind::High)));
    }

    #[test]
    fn rewind_undoes_a_break_and_its_sweep() {
        let mut tracker = StructureTracker::new(Timescale::Internal);
        tracker.on_candle(&close_at(0, 100.0));
        tracker.on_pivot(&pivot(1, 105.0, PivotKind::High));
        tracker.on_pivot(&pivot(2, 95.0, PivotKind::Low));
        tracker.on_candle(&close_at(3, 100.0));

        let mark = tracker.mark();
        let before = tracker.state().clone();
        tracker.on_candle(&close_at(4, 106.0));
        assert!(tracker.is_swept(&pivot(1, 105.0, PivotKind::High)));

        tracker.rewind(mark);
        assert!(!tracker.is_swept(&pivot(1, 105.0, PivotKind::High)));
        assert_eq!(tracker.state(), &before);

        tracker.on_candle(&close_at(4, 104.0));
        assert!(!tracker.is_swept(&pivot(1, 105.0, PivotKind::High)));
        tracker.on_candle(&close_at(5, 94.0));
        assert!(tracker.is_swept(&pivot(2, 95.0, PivotKind::Low)));
        assert_eq!(tracker.direction(), Bias::Bearish);
    }
}
