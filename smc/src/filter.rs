//! Typed selectors over the snapshot collections.
//!
//! Every field is optional; an unset field matches everything. `limit` keeps the
//! most recent matches while preserving time-ascending order.

use crate::constant::{Bias, EqualKind, PivotKind, Strength, StructureKind, SwingLabel, Timescale};
use crate::fvg::FairValueGap;
use crate::levels::StrongWeakLevel;
use crate::liquidity::EqualHighLow;
use crate::order_block::OrderBlock;
use crate::swing::SwingPoint;
use crate::trend::StructureEvent;

pub trait RecordFilter<T> {
    fn matches(&self, item: &T) -> bool;

    fn limit(&self) -> Option<usize>;

    fn apply(&self, items: &[T]) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = items
            .iter()
            .filter(|x| self.matches(x))
            .cloned()
            .collect::<Vec<_>>();
        if let Some(limit) = self.limit() {
            let skip = out.len().saturating_sub(limit);
            out.drain(..skip);
        }
        out
    }
}

fn accepts<V: PartialEq>(wanted: Option<V>, actual: V) -> bool {
    wanted.is_none_or(|w| w == actual)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwingPointFilter {
    pub timescale: Option<Timescale>,
    pub kind: Option<PivotKind>,
    pub label: Option<SwingLabel>,
    pub limit: Option<usize>,
}

impl RecordFilter<SwingPoint> for SwingPointFilter {
    fn matches(&self, item: &SwingPoint) -> bool {
        accepts(self.timescale, item.timescale)
            && accepts(self.kind, item.kind)
            && accepts(self.label, item.label)
    }

    fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructureFilter {
    pub timescale: Option<Timescale>,
    pub kind: Option<StructureKind>,
    pub direction: Option<Bias>,
    pub limit: Option<usize>,
}

impl RecordFilter<StructureEvent> for StructureFilter {
    fn matches(&self, item: &StructureEvent) -> bool {
        accepts(self.timescale, item.timescale)
            && accepts(self.kind, item.kind)
            && accepts(self.direction, item.direction)
    }

    fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderBlockFilter {
    pub bias: Option<Bias>,
    pub mitigated: Option<bool>,
    pub limit: Option<usize>,
}

impl OrderBlockFilter {
    pub fn active() -> Self {
        Self {
            mitigated: Some(false),
            ..Self::default()
        }
    }
}

impl RecordFilter<OrderBlock> for OrderBlockFilter {
    fn matches(&self, item: &OrderBlock) -> bool {
        accepts(self.bias, item.bias) && accepts(self.mitigated, item.mitigated)
    }

    fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FairValueGapFilter {
    pub bias: Option<Bias>,
    pub filled: Option<bool>,
    pub limit: Option<usize>,
}

impl FairValueGapFilter {
    pub fn open() -> Self {
        Self {
            filled: Some(false),
            ..Self::default()
        }
    }
}

impl RecordFilter<FairValueGap> for FairValueGapFilter {
    fn matches(&self, item: &FairValueGap) -> bool {
        accepts(self.bias, item.bias) && accepts(self.filled, item.filled)
    }

    fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EqualHighLowFilter {
    pub timescale: Option<Timescale>,
    pub kind: Option<EqualKind>,
    pub limit: Option<usize>,
}

impl RecordFilter<EqualHighLow> for EqualHighLowFilter {
    fn matches(&self, item: &EqualHighLow) -> bool {
        accepts(self.timescale, item.timescale) && accepts(self.kind, item.kind)
    }

    fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LevelFilter {
    pub timescale: Option<Timescale>,
    pub kind: Option<PivotKind>,
    pub strength: Option<Strength>,
    pub limit: Option<usize>,
}

impl RecordFilter<StrongWeakLevel> for LevelFilter {
    fn matches(&self, item: &StrongWeakLevel) -> bool {
        accepts(self.timescale, item.timescale)
            && accepts(self.kind, item.kind)
            && accepts(self.strength, item.strength)
    }

    fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::{OrderBlockFilter, RecordFilter};
    use crate::constant::Bias;
    use crate::order_block::OrderBlock;

    fn block(time: i64, bias: Bias, mitigated: bool) -> OrderBlock {
        OrderBlock {
            time,
            high: 2.0,
            low: 1.0,
            bias,
            break_time: time + 1,
            mitigated,
            mitigated_time: mitigated.then_some(time + 2),
        }
    }

    #[test]
    fn limit_keeps_most_recent_matches_in_order() {
        let rows = vec![
            block(1, Bias::Bullish, false),
            block(2, Bias::Bearish, false),
            block(3, Bias::Bullish, true),
            block(4, Bias::Bullish, false),
            block(5, Bias::Bullish, false),
        ];
        let filter = OrderBlockFilter {
            bias: Some(Bias::Bullish),
            mitigated: Some(false),
            limit: Some(2),
        };
        let times = filter.apply(&rows).iter().map(|x| x.time).collect::<Vec<_>>();
        assert_eq!(times, vec![4, 5]);
        assert_eq!(OrderBlockFilter::active().apply(&rows).len(), 4);
    }
}
