//! Immutable result view handed to renderers and other consumers.

use std::fs::{File, create_dir_all};
use std::path::Path;

use polars::df;
use polars::prelude::{DataFrame, ParquetWriter};
use serde::{Deserialize, Serialize};

use crate::constant::{Bias, SmcError, Timescale};
use crate::filter::{
    EqualHighLowFilter, FairValueGapFilter, LevelFilter, OrderBlockFilter, RecordFilter,
    StructureFilter, SwingPointFilter,
};
use crate::fvg::FairValueGap;
use crate::levels::StrongWeakLevel;
use crate::liquidity::EqualHighLow;
use crate::order_block::OrderBlock;
use crate::swing::SwingPoint;
use crate::trend::StructureEvent;
use crate::zone::PremiumDiscountZone;

/// Every sequence is time-ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmcSnapshot {
    pub swing_points: Vec<SwingPoint>,
    pub structures: Vec<StructureEvent>,
    pub order_blocks: Vec<OrderBlock>,
    pub fair_value_gaps: Vec<FairValueGap>,
    pub equal_highs_lows: Vec<EqualHighLow>,
    pub strong_weak_levels: Vec<StrongWeakLevel>,
    pub premium_discount_zone: Option<PremiumDiscountZone>,
    pub swing_trend: Bias,
    pub internal_trend: Bias,
}

pub struct SnapshotFrames {
    pub swing_points: DataFrame,
    pub structures: DataFrame,
    pub order_blocks: DataFrame,
    pub fair_value_gaps: DataFrame,
    pub equal_highs_lows: DataFrame,
    pub strong_weak_levels: DataFrame,
}

impl SmcSnapshot {
    pub fn trend(&self, timescale: Timescale) -> Bias {
        match timescale {
            Timescale::Internal => self.internal_trend,
            Timescale::Swing => self.swing_trend,
        }
    }

    pub fn swing_points(&self, filter: &SwingPointFilter) -> Vec<SwingPoint> {
        filter.apply(&self.swing_points)
    }

    pub fn structures(&self, filter: &StructureFilter) -> Vec<StructureEvent> {
        filter.apply(&self.structures)
    }

    pub fn order_blocks(&self, filter: &OrderBlockFilter) -> Vec<OrderBlock> {
        filter.apply(&self.order_blocks)
    }

    pub fn fair_value_gaps(&self, filter: &FairValueGapFilter) -> Vec<FairValueGap> {
        filter.apply(&self.fair_value_gaps)
    }

    pub fn equal_highs_lows(&self, filter: &EqualHighLowFilter) -> Vec<EqualHighLow> {
        filter.apply(&self.equal_highs_lows)
    }

    pub fn strong_weak_levels(&self, filter: &LevelFilter) -> Vec<StrongWeakLevel> {
        filter.apply(&self.strong_weak_levels)
    }

    pub fn to_frames(&self) -> Result<SnapshotFrames, SmcError> {
        let swing_points = df!(
            "time" => self.swing_points.iter().map(|x| x.time).collect::<Vec<_>>(),
            "price" => self.swing_points.iter().map(|x| x.price).collect::<Vec<_>>(),
            "kind" => self.swing_points.iter().map(|x| x.kind.as_str()).collect::<Vec<_>>(),
            "label" => self.swing_points.iter().map(|x| x.label.as_str()).collect::<Vec<_>>(),
            "timescale" => self.swing_points.iter().map(|x| x.timescale.as_str()).collect::<Vec<_>>()
        )?;

        let structures = df!(
            "time" => self.structures.iter().map(|x| x.time).collect::<Vec<_>>(),
            "kind" => self.structures.iter().map(|x| x.kind.as_str()).collect::<Vec<_>>(),
            "direction" => self.structures.iter().map(|x| x.direction.as_str()).collect::<Vec<_>>(),
            "timescale" => self.structures.iter().map(|x| x.timescale.as_str()).collect::<Vec<_>>(),
            "level" => self.structures.iter().map(|x| x.level).collect::<Vec<_>>(),
            "pivot_time" => self.structures.iter().map(|x| x.pivot_time).collect::<Vec<_>>()
        )?;

        let order_blocks = df!(
            "time" => self.order_blocks.iter().map(|x| x.time).collect::<Vec<_>>(),
            "high" => self.order_blocks.iter().map(|x| x.high).collect::<Vec<_>>(),
            "low" => self.order_blocks.iter().map(|x| x.low).collect::<Vec<_>>(),
            "bias" => self.order_blocks.iter().map(|x| x.bias.as_str()).collect::<Vec<_>>(),
            "break_time" => self.order_blocks.iter().map(|x| x.break_time).collect::<Vec<_>>(),
            "mitigated" => self.order_blocks.iter().map(|x| x.mitigated).collect::<Vec<_>>(),
            "mitigated_time" => self.order_blocks.iter().map(|x| x.mitigated_time).collect::<Vec<_>>()
        )?;

        let fair_value_gaps = df!(
            "time" => self.fair_value_gaps.iter().map(|x| x.time).collect::<Vec<_>>(),
            "top" => self.fair_value_gaps.iter().map(|x| x.top).collect::<Vec<_>>(),
            "bottom" => self.fair_value_gaps.iter().map(|x| x.bottom).collect::<Vec<_>>(),
            "bias" => self.fair_value_gaps.iter().map(|x| x.bias.as_str()).collect::<Vec<_>>(),
            "filled" => self.fair_value_gaps.iter().map(|x| x.filled).collect::<Vec<_>>(),
            "filled_time" => self.fair_value_gaps.iter().map(|x| x.filled_time).collect::<Vec<_>>()
        )?;

        let equal_highs_lows = df!(
            "kind" => self.equal_highs_lows.iter().map(|x| x.kind.as_str()).collect::<Vec<_>>(),
            "timescale" => self.equal_highs_lows.iter().map(|x| x.timescale.as_str()).collect::<Vec<_>>(),
            "time1" => self.equal_highs_lows.iter().map(|x| x.time1).collect::<Vec<_>>(),
            "time2" => self.equal_highs_lows.iter().map(|x| x.time2).collect::<Vec<_>>(),
            "price1" => self.equal_highs_lows.iter().map(|x| x.price1).collect::<Vec<_>>(),
            "price2" => self.equal_highs_lows.iter().map(|x| x.price2).collect::<Vec<_>>()
        )?;

        let strong_weak_levels = df!(
            "time" => self.strong_weak_levels.iter().map(|x| x.time).collect::<Vec<_>>(),
            "price" => self.strong_weak_levels.iter().map(|x| x.price).collect::<Vec<_>>(),
            "kind" => self.strong_weak_levels.iter().map(|x| x.kind.as_str()).collect::<Vec<_>>(),
            "strength" => self.strong_weak_levels.iter().map(|x| x.strength.as_str()).collect::<Vec<_>>(),
            "timescale" => self.strong_weak_levels.iter().map(|x| x.timescale.as_str()).collect::<Vec<_>>()
        )?;

        Ok(SnapshotFrames {
            swing_points,
            structures,
            order_blocks,
            fair_value_gaps,
            equal_highs_lows,
            strong_weak_levels,
        })
    }

    pub fn write_parquet_snapshot(&self, output_dir: impl AsRef<Path>) -> Result<(), SmcError> {
        let output_dir = output_dir.as_ref();
        create_dir_all(output_dir)?;

        let frames = self.to_frames()?;
        let named = [
            ("swing_points", frames.swing_points),
            ("structures", frames.structures),
            ("order_blocks", frames.order_blocks),
            ("fair_value_gaps", frames.fair_value_gaps),
            ("equal_highs_lows", frames.equal_highs_lows),
            ("strong_weak_levels", frames.strong_weak_levels),
        ];
        for (name, mut frame) in named {
            let mut file = File::create(output_dir.join(format!("{name}.parquet")))?;
            ParquetWriter::new(&mut file).finish(&mut frame)?;
        }

        Ok(())
    }
}
