use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constant::{Const, SmcError, Timescale};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmcConfig {
    pub swing_length: usize,
    pub internal_length: usize,
    pub equal_tolerance: f64,
    pub order_block_lookback: usize,

    pub enable_order_blocks: bool,
    pub enable_fvg: bool,
    pub enable_equal_hl: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmcConfigPatch {
    pub swing_length: Option<usize>,
    pub internal_length: Option<usize>,
    pub equal_tolerance: Option<f64>,
    pub order_block_lookback: Option<usize>,

    pub enable_order_blocks: Option<bool>,
    pub enable_fvg: Option<bool>,
    pub enable_equal_hl: Option<bool>,
}

impl Default for SmcConfig {
    fn default() -> Self {
        Self {
            swing_length: Const::SWING_LENGTH,
            internal_length: Const::INTERNAL_LENGTH,
            equal_tolerance: Const::EQUAL_TOLERANCE,
            order_block_lookback: Const::ORDER_BLOCK_LOOKBACK,

            enable_order_blocks: true,
            enable_fvg: true,
            enable_equal_hl: true,
        }
    }
}

impl SmcConfig {
    pub fn apply_patch(mut self, patch: SmcConfigPatch) -> Self {
        if let Some(v) = patch.swing_length {
            self.swing_length = v;
        }
        if let Some(v) = patch.internal_length {
            self.internal_length = v;
        }
        if let Some(v) = patch.equal_tolerance {
            self.equal_tolerance = v;
        }
        if let Some(v) = patch.order_block_lookback {
            self.order_block_lookback = v;
        }

        if let Some(v) = patch.enable_order_blocks {
            self.enable_order_blocks = v;
        }
        if let Some(v) = patch.enable_fvg {
            self.enable_fvg = v;
        }
        if let Some(v) = patch.enable_equal_hl {
            self.enable_equal_hl = v;
        }
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SmcError> {
        let patch: SmcConfigPatch = serde_yaml::from_str(yaml)?;
        let config = Self::default().apply_patch(patch);
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SmcError> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn length(&self, timescale: Timescale) -> usize {
        match timescale {
            Timescale::Internal => self.internal_length,
            Timescale::Swing => self.swing_length,
        }
    }

    pub fn validate(&self) -> Result<(), SmcError> {
        if self.swing_length == 0 {
            return Err(SmcError::InvalidConfiguration(
                "swing_length must be positive".to_string(),
            ));
        }
        if self.internal_length == 0 {
            return Err(SmcError::InvalidConfiguration(
                "internal_length must be positive".to_string(),
            ));
        }
        if self.order_block_lookback == 0 {
            return Err(SmcError::InvalidConfiguration(
                "order_block_lookback must be positive".to_string(),
            ));
        }
        if !self.equal_tolerance.is_finite()
            || self.equal_tolerance < 0.0
            || self.equal_tolerance >= 1.0
        {
            return Err(SmcError::InvalidConfiguration(format!(
                "equal_tolerance must be within [0, 1), got {}",
                self.equal_tolerance
            )));
        }
        Ok(())
    }
}
