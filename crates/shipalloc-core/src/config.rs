use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cost::CostModel;
use crate::shipment::Mode;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No cost rate for mode {0}")]
    MissingModeCost(Mode),
    #[error("Invalid cost rate {rate} for mode {mode}")]
    InvalidCost { mode: Mode, rate: f64 },
    #[error("No share bounds for mode {0}")]
    MissingModeShare(Mode),
    #[error("Invalid share bounds for mode {mode}: min {min}, max {max}")]
    InvalidShare { mode: Mode, min: f64, max: f64 },
    #[error("Invalid capacity factor {0}")]
    InvalidCapacityFactor(f64),
    #[error("No warehouses to allocate from")]
    NoWarehouses,
    #[error("No shipment modes configured")]
    NoModes,
    #[error("Invalid total weight {0} kg")]
    InvalidTotalWeight(f64),
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Fraction of total weight a mode must carry, `min <= share <= max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShareBounds {
    pub min: f64,
    pub max: f64,
}

impl ShareBounds {
    pub const DEFAULT: ShareBounds = ShareBounds { min: 0.2, max: 0.5 };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && 0.0 <= self.min && self.min <= self.max && self.max <= 1.0
    }
}

/// Everything the formulation needs besides the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub cost_per_kg: CostModel,
    pub mode_share: BTreeMap<Mode, ShareBounds>,
    /// A warehouse may ship at most this multiple of its observed weight
    pub capacity_factor: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            cost_per_kg: CostModel::default(),
            mode_share: Mode::ALL.into_iter().map(|m| (m, ShareBounds::DEFAULT)).collect(),
            capacity_factor: 1.1,
        }
    }
}

impl AllocationConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Use the same share band for every mode that has a cost rate
    pub fn with_uniform_share(mut self, bounds: ShareBounds) -> Self {
        self.mode_share = self.cost_per_kg.modes().map(|m| (m, bounds)).collect();
        self
    }

    /// Override one or both share bounds for every costed mode. A bound left
    /// as `None` keeps each mode's configured value. The result is not
    /// validated here.
    pub fn with_share_overrides(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        let modes: Vec<Mode> = self.cost_per_kg.modes().collect();
        for mode in modes {
            let bounds = self.mode_share.entry(mode).or_insert(ShareBounds::DEFAULT);
            if let Some(min) = min {
                bounds.min = min;
            }
            if let Some(max) = max {
                bounds.max = max;
            }
        }
        self
    }

    pub fn with_capacity_factor(mut self, factor: f64) -> Self {
        self.capacity_factor = factor;
        self
    }

    pub fn share(&self, mode: Mode) -> Result<ShareBounds, ConfigError> {
        self.mode_share.get(&mode).copied().ok_or(ConfigError::MissingModeShare(mode))
    }

    /// Check the configuration on its own. Joint feasibility of the share
    /// bands is checked when the model is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cost_per_kg.is_empty() {
            return Err(ConfigError::NoModes);
        }
        self.cost_per_kg.validate()?;

        for mode in self.cost_per_kg.modes() {
            let bounds = self.share(mode)?;
            if !bounds.is_valid() {
                return Err(ConfigError::InvalidShare {
                    mode,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }

        if !self.capacity_factor.is_finite() || self.capacity_factor < 0.0 {
            return Err(ConfigError::InvalidCapacityFactor(self.capacity_factor));
        }

        Ok(())
    }
}
