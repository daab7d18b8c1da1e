use std::cell::OnceCell;

use tracing::{info, warn};

use crate::bar::Candle;
use crate::config::SmcConfig;
use crate::constant::{Bias, SmcError, Timescale};
use crate::filter::{
    EqualHighLowFilter, FairValueGapFilter, LevelFilter, OrderBlockFilter, StructureFilter,
    SwingPointFilter,
};
use crate::fvg::{FairValueGap, FairValueGapTracker, GapMark};
use crate::levels::{StrongWeakLevel, classify_levels};
use crate::liquidity::EqualHighLow;
use crate::order_block::{OrderBlock, OrderBlockMark, OrderBlockTracker};
use crate::snapshot::SmcSnapshot;
use crate::swing::SwingPoint;
use crate::tick::CandleUpdate;
use crate::timescale_manager::{TimescaleManager, TimescaleMark};
use crate::trend::{StructureEvent, TrendState};
use crate::zone::{PremiumDiscountZone, premium_discount_zone};

/// Everything derived from the candle history.
#[derive(Debug)]
struct PipelineState {
    internal: TimescaleManager,
    swing: TimescaleManager,
    order_blocks: Option<OrderBlockTracker>,
    fair_value_gaps: Option<FairValueGapTracker>,
}

/// Undo record for one [`PipelineState::step`].
#[derive(Debug, Clone)]
struct PipelineMark {
    internal: TimescaleMark,
    swing: TimescaleMark,
    order_blocks: Option<OrderBlockMark>,
    fair_value_gaps: Option<GapMark>,
}

impl PipelineState {
    fn new(config: &SmcConfig) -> Self {
        Self {
            internal: TimescaleManager::new(Timescale::Internal, config),
            swing: TimescaleManager::new(Timescale::Swing, config),
            order_blocks: config
                .enable_order_blocks
                .then(|| OrderBlockTracker::new(config.order_block_lookback)),
            fair_value_gaps: config.enable_fvg.then(FairValueGapTracker::new),
        }
    }

    fn manager(&self, timescale: Timescale) -> &TimescaleManager {
        match timescale {
            Timescale::Internal => &self.internal,
            Timescale::Swing => &self.swing,
        }
    }

    /// Advances every detector by the last candle of `candles`.
    fn step(&mut self, candles: &[Candle]) {
        self.internal.on_candle(candles);
        let swing_breaks = self.swing.on_candle(candles);
        if let Some(tracker) = self.order_blocks.as_mut() {
            tracker.on_candle(candles, &swing_breaks);
        }
        if let Some(tracker) = self.fair_value_gaps.as_mut() {
            tracker.on_candle(candles);
        }
    }

    fn mark(&self) -> PipelineMark {
        PipelineMark {
            internal: self.internal.mark(),
            swing: self.swing.mark(),
            order_blocks: self.order_blocks.as_ref().map(OrderBlockTracker::mark),
            fair_value_gaps: self.fair_value_gaps.as_ref().map(FairValueGapTracker::mark),
        }
    }

    fn rewind(&mut self, mark: PipelineMark) {
        self.internal.rewind(mark.internal);
        self.swing.rewind(mark.swing);
        if let (Some(tracker), Some(mark)) = (self.order_blocks.as_mut(), mark.order_blocks) {
            tracker.rewind(mark);
        }
        if let (Some(tracker), Some(mark)) = (self.fair_value_gaps.as_mut(), mark.fair_value_gaps) {
            tracker.rewind(mark);
        }
    }
}

/// Batch and streaming front end over the SMC detectors.
///
/// `calculate` and a sequence of `append_candle` / `upsert_last_candle` calls over the
/// same final history produce identical snapshots. Updates only step the detectors;
/// the snapshot is assembled on the first read after a change.
pub struct SmcEngine {
    config: SmcConfig,
    candles: Vec<Candle>,
    state: PipelineState,
    /// Undo record for the last candle, applied when that candle is revised.
    checkpoint: Option<PipelineMark>,
    snapshot: OnceCell<SmcSnapshot>,
}

impl Default for SmcEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SmcEngine {
    pub fn new(config: SmcConfig) -> Result<Self, SmcError> {
        config.validate()?;
        let state = PipelineState::new(&config);
        Ok(Self {
            config,
            candles: Vec::new(),
            state,
            checkpoint: None,
            snapshot: OnceCell::new(),
        })
    }

    pub fn with_defaults() -> Self {
        let config = SmcConfig::default();
        Self {
            state: PipelineState::new(&config),
            config,
            candles: Vec::new(),
            checkpoint: None,
            snapshot: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &SmcConfig {
        &self.config
    }

    /// Discards all state and replays `candles` from scratch.
    pub fn calculate(&mut self, candles: &[Candle]) -> Result<(), SmcError> {
        for (idx, candle) in candles.iter().enumerate() {
            candle.validate()?;
            if let Some(previous) = idx.checked_sub(1).map(|i| candles[i].time) {
                if candle.time <= previous {
                    warn!(previous, received = candle.time, "rejected non-monotonic batch");
                    return Err(SmcError::NonMonotonicInput {
                        previous,
                        received: candle.time,
                    });
                }
            }
        }

        self.candles = candles.to_vec();
        self.replay();
        self.snapshot.take();

        let state = &self.state;
        info!(
            candles = self.candles.len(),
            swing_pivots = state.swing.detector.all_rows().len(),
            swing_structures = state.swing.structure.all_rows().len(),
            order_blocks = state.order_blocks.as_ref().map_or(0, |x| x.all_rows().len()),
            fair_value_gaps = state.fair_value_gaps.as_ref().map_or(0, |x| x.all_rows().len()),
            swing_trend = state.swing.structure.direction().as_str(),
            internal_trend = state.internal.structure.direction().as_str(),
            "smc batch calculated"
        );
        Ok(())
    }

    pub fn append_candle(&mut self, candle: Candle) -> Result<(), SmcError> {
        candle.validate()?;
        if let Some(last) = self.candles.last() {
            if candle.time <= last.time {
                warn!(previous = last.time, received = candle.time, "rejected non-monotonic candle");
                return Err(SmcError::NonMonotonicInput {
                    previous: last.time,
                    received: candle.time,
                });
            }
        }

        self.checkpoint = Some(self.state.mark());
        self.candles.push(candle);
        self.state.step(&self.candles);
        self.snapshot.take();
        Ok(())
    }

    /// Revises the forming candle when `candle.time` equals the last time, appends
    /// when it is newer.
    pub fn upsert_last_candle(&mut self, candle: Candle) -> Result<(), SmcError> {
        candle.validate()?;
        let Some(last) = self.candles.last().copied() else {
            return self.append_candle(candle);
        };
        if candle.time > last.time {
            return self.append_candle(candle);
        }
        if candle.time < last.time {
            warn!(previous = last.time, received = candle.time, "rejected stale candle update");
            return Err(SmcError::NonMonotonicInput {
                previous: last.time,
                received: candle.time,
            });
        }

        if let Some(slot) = self.candles.last_mut() {
            *slot = last.merge(&candle);
        }
        match self.checkpoint.clone() {
            Some(mark) => {
                self.state.rewind(mark);
                self.state.step(&self.candles);
            }
            None => self.replay(),
        }
        self.snapshot.take();
        Ok(())
    }

    pub fn apply_update(&mut self, update: CandleUpdate) -> Result<(), SmcError> {
        match update {
            CandleUpdate::Append(candle) => self.append_candle(candle),
            CandleUpdate::UpsertLast(candle) => self.upsert_last_candle(candle),
        }
    }

    /// Rebuilds the pipeline state from the stored history.
    fn replay(&mut self) {
        let candles = std::mem::take(&mut self.candles);
        self.candles.reserve(candles.len());
        self.state = PipelineState::new(&self.config);
        self.checkpoint = None;
        for (idx, candle) in candles.iter().enumerate() {
            if idx + 1 == candles.len() {
                self.checkpoint = Some(self.state.mark());
            }
            self.candles.push(*candle);
            self.state.step(&self.candles);
        }
    }

    fn build_snapshot(&self) -> SmcSnapshot {
        let state = &self.state;

        let mut swing_points = Vec::new();
        swing_points.extend_from_slice(state.internal.detector.all_rows());
        swing_points.extend_from_slice(state.swing.detector.all_rows());
        swing_points.sort_by_key(|x| x.time);

        let mut structures = Vec::new();
        structures.extend_from_slice(state.internal.structure.all_rows());
        structures.extend_from_slice(state.swing.structure.all_rows());
        structures.sort_by_key(|x| x.time);

        let mut order_blocks = state
            .order_blocks
            .as_ref()
            .map(|x| x.all_rows().to_vec())
            .unwrap_or_default();
        order_blocks.sort_by_key(|x| x.time);

        let fair_value_gaps = state
            .fair_value_gaps
            .as_ref()
            .map(|x| x.all_rows().to_vec())
            .unwrap_or_default();

        let mut equal_highs_lows = Vec::new();
        for manager in [&state.internal, &state.swing] {
            if let Some(equal) = manager.equal.as_ref() {
                equal_highs_lows.extend_from_slice(equal.all_rows());
            }
        }
        equal_highs_lows.sort_by_key(|x| x.time2);

        let strong_weak_levels = classify_levels(&swing_points, |pivot| {
            state.manager(pivot.timescale).structure.is_swept(pivot)
        });

        let swing_state = state.swing.structure.state();
        let premium_discount_zone = self.candles.last().and_then(|last| {
            premium_discount_zone(
                swing_state.last_swing_high.as_ref(),
                swing_state.last_swing_low.as_ref(),
                last.time,
            )
        });

        SmcSnapshot {
            swing_points,
            structures,
            order_blocks,
            fair_value_gaps,
            equal_highs_lows,
            strong_weak_levels,
            premium_discount_zone,
            swing_trend: state.swing.structure.direction(),
            internal_trend: state.internal.structure.direction(),
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn snapshot(&self) -> &SmcSnapshot {
        self.snapshot.get_or_init(|| self.build_snapshot())
    }

    pub fn trend(&self, timescale: Timescale) -> Bias {
        self.state.manager(timescale).structure.direction()
    }

    pub fn trend_state(&self, timescale: Timescale) -> &TrendState {
        self.state.manager(timescale).structure.state()
    }

    pub fn swing_points(&self, filter: &SwingPointFilter) -> Vec<SwingPoint> {
        self.snapshot().swing_points(filter)
    }

    pub fn structures(&self, filter: &StructureFilter) -> Vec<StructureEvent> {
        self.snapshot().structures(filter)
    }

    pub fn order_blocks(&self, filter: &OrderBlockFilter) -> Vec<OrderBlock> {
        self.snapshot().order_blocks(filter)
    }

    pub fn fair_value_gaps(&self, filter: &FairValueGapFilter) -> Vec<FairValueGap> {
        self.snapshot().fair_value_gaps(filter)
    }

    pub fn equal_highs_lows(&self, filter: &EqualHighLowFilter) -> Vec<EqualHighLow> {
        self.snapshot().equal_highs_lows(filter)
    }

    pub fn strong_weak_levels(&self, filter: &LevelFilter) -> Vec<StrongWeakLevel> {
        self.snapshot().strong_weak_levels(filter)
    }

    pub fn premium_discount_zone(&self) -> Option<&PremiumDiscountZone> {
        self.snapshot().premium_discount_zone.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::SmcEngine;
    use crate::bar::Candle;
    use crate::config::SmcConfig;
    use crate::constant::SmcError;

    fn small_config() -> SmcConfig {
        SmcConfig {
            swing_length: 3,
            internal_length: 2,
            ..SmcConfig::default()
        }
    }

    fn zigzag(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + ((i as f64) * 0.7).sin() * 5.0 + i as f64 * 0.1;
                let open = if i % 2 == 0 { base - 0.4 } else { base + 0.4 };
                let close = if i % 2 == 0 { base + 0.4 } else { base - 0.4 };
                Candle::new(i as i64 * 60, open, base + 1.0, base - 1.0, close)
            })
            .collect()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SmcConfig {
            swing_length: 0,
            ..SmcConfig::default()
        };
        assert!(matches!(SmcEngine::new(config), Err(SmcError::InvalidConfiguration(_))));
    }

    #[test]
    fn failed_append_leaves_engine_unchanged() {
        let mut engine = SmcEngine::new(small_config()).expect("valid config");
        engine.calculate(&zigzag(30)).expect("calculate");
        let before = engine.snapshot().clone();

        let stale = Candle::new(0, 1.0, 2.0, 0.5, 1.5);
        assert!(matches!(
            engine.append_candle(stale),
            Err(SmcError::NonMonotonicInput { .. })
        ));
        let broken = Candle::new(10_000, 1.0, 0.5, 2.0, 1.5);
        assert!(matches!(engine.append_candle(broken), Err(SmcError::InvalidCandle { .. })));

        assert_eq!(engine.candles().len(), 30);
        assert_eq!(engine.snapshot(), &before);
    }

    #[test]
    fn upsert_on_empty_history_appends() {
        let mut engine = SmcEngine::new(small_config()).expect("valid config");
        engine
            .upsert_last_candle(Candle::new(60, 1.0, 2.0, 0.5, 1.5))
            .expect("upsert");
        assert_eq!(engine.candles().len(), 1);
    }

    #[test]
    fn calculate_rejects_unordered_batch_without_side_effects() {
        let mut engine = SmcEngine::new(small_config()).expect("valid config");
        engine.calculate(&zigzag(20)).expect("calculate");
        let mut candles = zigzag(5);
        candles.swap(1, 2);
        assert!(engine.calculate(&candles).is_err());
        assert_eq!(engine.candles().len(), 20);
    }

    #[test]
    fn repeated_revisions_of_the_last_candle_match_batch() {
        let candles = zigzag(60);
        let mut stream = SmcEngine::new(small_config()).expect("valid config");
        stream.calculate(&candles[..59]).expect("calculate");

        let last = candles[59];
        let mut forming = Candle::new(last.time, last.open, last.open, last.open, last.open);
        stream.append_candle(forming).expect("append");
        for step in 1..=4 {
            let t = step as f64 / 4.0;
            forming = Candle::new(
                last.time,
                last.open,
                last.open + (last.high - last.open) * t,
                last.open - (last.open - last.low) * t,
                last.open + (last.close - last.open) * t,
            );
            stream.upsert_last_candle(forming).expect("upsert");
            let _ = stream.snapshot();
        }

        let mut batch = SmcEngine::new(small_config()).expect("valid config");
        batch.calculate(&candles).expect("calculate");
        assert_eq!(stream.snapshot(), batch.snapshot());
    }

    #[test]
    fn snapshot_read_between_updates_reflects_latest_candle() {
        let candles = zigzag(120);
        let mut stream = SmcEngine::new(small_config()).expect("valid config");
        for (idx, candle) in candles.iter().enumerate() {
            stream.append_candle(*candle).expect("append");
            if idx % 17 == 0 {
                let mut batch = SmcEngine::new(small_config()).expect("valid config");
                batch.calculate(&candles[..=idx]).expect("calculate");
                assert_eq!(stream.snapshot(), batch.snapshot(), "diverged at {idx}");
            }
        }
    }

    #[test]
    fn long_stream_without_reads_matches_batch() {
        let candles = zigzag(20_000);
        let mut stream = SmcEngine::with_defaults();
        for candle in &candles {
            stream.append_candle(*candle).expect("append");
        }
        let mut batch = SmcEngine::with_defaults();
        batch.calculate(&candles).expect("calculate");
        assert_eq!(stream.snapshot(), batch.snapshot());
    }
}
