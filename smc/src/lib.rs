pub mod bar;
pub mod config;
pub mod constant;
pub mod engine;
pub mod filter;
pub mod fvg;
pub mod levels;
pub mod liquidity;
pub mod logging;
pub mod order_block;
pub mod receiver;
pub mod snapshot;
pub mod swing;
pub mod tick;
mod timescale_manager;
pub mod trend;
pub mod zone;

pub use bar::Candle;
pub use config::{SmcConfig, SmcConfigPatch};
pub use constant::{
    Bias, Const, EqualKind, PivotKind, SmcError, Strength, StructureKind, SwingLabel, Timescale,
};
pub use engine::SmcEngine;
pub use filter::{
    EqualHighLowFilter, FairValueGapFilter, LevelFilter, OrderBlockFilter, RecordFilter,
    StructureFilter, SwingPointFilter,
};
pub use fvg::{FairValueGap, FairValueGapTracker, detect_gap};
pub use levels::{StrongWeakLevel, classify_levels};
pub use liquidity::{EqualHighLow, EqualHighLowDetector, detect_equal_highs_lows};
pub use logging::init_logging;
pub use order_block::{OrderBlock, OrderBlockTracker};
pub use receiver::{load_candles_csv, parse_time};
pub use snapshot::{SmcSnapshot, SnapshotFrames};
pub use swing::{PivotDetector, SwingPoint, detect_pivots};
pub use tick::{CandleUpdate, TickCandleAggregator, TickInput};
pub use trend::{StructureEvent, StructureTracker, TrendState};
pub use zone::{PremiumDiscountZone, premium_discount_zone};
