use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timescale {
    Internal,
    Swing,
}

impl Timescale {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Swing => "swing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingLabel {
    #[serde(rename = "HH")]
    HigherHigh,
    #[serde(rename = "LH")]
    LowerHigh,
    #[serde(rename = "HL")]
    HigherLow,
    #[serde(rename = "LL")]
    LowerLow,
}

impl SwingLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HigherHigh => "HH",
            Self::LowerHigh => "LH",
            Self::HigherLow => "HL",
            Self::LowerLow => "LL",
        }
    }
}

/// Direction of a trend, a structure break, or the bias of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Bias {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    #[serde(rename = "BOS")]
    Bos,
    #[serde(rename = "CHoCH")]
    Choch,
}

impl StructureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bos => "BOS",
            Self::Choch => "CHoCH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EqualKind {
    #[serde(rename = "EQH")]
    EqualHighs,
    #[serde(rename = "EQL")]
    EqualLows,
}

impl EqualKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EqualHighs => "EQH",
            Self::EqualLows => "EQL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Weak,
}

impl Strength {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Weak => "weak",
        }
    }
}

#[derive(Debug)]
pub enum SmcError {
    InvalidConfiguration(String),
    NonMonotonicInput { previous: i64, received: i64 },
    InvalidCandle { time: i64, reason: String },
    InvalidDatetime(String),
    Io(std::io::Error),
    Csv(csv::Error),
    Yaml(serde_yaml::Error),
    Polars(polars::error::PolarsError),
}

pub struct Const;

impl Const {
    pub const SWING_LENGTH: usize = 50;
    pub const INTERNAL_LENGTH: usize = 5;
    pub const EQUAL_TOLERANCE: f64 = 0.001;
    pub const ORDER_BLOCK_LOOKBACK: usize = 50;
}

impl Display for SmcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration(v) => write!(f, "invalid configuration: {v}"),
            Self::NonMonotonicInput { previous, received } => write!(
                f,
                "non-monotonic candle time: received {received}, latest is {previous}"
            ),
            Self::InvalidCandle { time, reason } => write!(f, "invalid candle at {time}: {reason}"),
            Self::InvalidDatetime(v) => write!(f, "invalid datetime: {v}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Csv(e) => write!(f, "csv error: {e}"),
            Self::Yaml(e) => write!(f, "yaml error: {e}"),
            Self::Polars(e) => write!(f, "polars error: {e}"),
        }
    }
}

impl std::error::Error for SmcError {}

impl From<std::io::Error> for SmcError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for SmcError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_yaml::Error> for SmcError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}

impl From<polars::error::PolarsError> for SmcError {
    fn from(value: polars::error::PolarsError) -> Self {
        Self::Polars(value)
    }
}
