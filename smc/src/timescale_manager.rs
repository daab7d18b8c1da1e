//! Single-timescale manager.
//!
//! Chains `Candle -> SwingPoint -> StructureEvent -> EqualHighLow` for one pivot
//! width and owns the derived state of that timescale.

use crate::bar::Candle;
use crate::config::SmcConfig;
use crate::constant::Timescale;
use crate::liquidity::{EqualHighLowDetector, EqualMark};
use crate::swing::{PivotDetector, PivotMark};
use crate::trend::{StructureEvent, StructureMark, StructureTracker};

#[derive(Debug, Clone)]
pub(crate) struct TimescaleManager {
    pub(crate) detector: PivotDetector,
    pub(crate) structure: StructureTracker,
    pub(crate) equal: Option<EqualHighLowDetector>,
}

impl TimescaleManager {
    pub(crate) fn new(timescale: Timescale, config: &SmcConfig) -> Self {
        Self {
            detector: PivotDetector::new(timescale, config.length(timescale)),
            structure: StructureTracker::new(timescale),
            equal: config
                .enable_equal_hl
                .then(|| EqualHighLowDetector::new(config.equal_tolerance)),
        }
    }

    /// Returns the structure breaks that closed on the last candle.
    pub(crate) fn on_candle(&mut self, candles: &[Candle]) -> Vec<StructureEvent> {
        let pivots = self.detector.on_candle(candles);
        for pivot in &pivots {
            self.structure.on_pivot(pivot);
            if let Some(equal) = self.equal.as_mut() {
                equal.on_pivot(pivot);
            }
        }

        match candles.last() {
            Some(last) => self.structure.on_candle(last),
            None => Vec::new(),
        }
    }

    pub(crate) fn mark(&self) -> TimescaleMark {
        TimescaleMark {
            detector: self.detector.mark(),
            structure: self.structure.mark(),
            equal: self.equal.as_ref().map(EqualHighLowDetector::mark),
        }
    }

    pub(crate) fn rewind(&mut self, mark: TimescaleMark) {
        self.detector.rewind(mark.detector);
        self.structure.rewind(mark.structure);
        if let (Some(equal), Some(mark)) = (self.equal.as_mut(), mark.equal) {
            equal.rewind(mark);
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TimescaleMark {
    detector: PivotMark,
    structure: StructureMark,
    equal: Option<EqualMark>,
}
