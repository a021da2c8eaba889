//! Engine configuration
//!
//! Sizes and thresholds fixed when a [`DispersionEngine`] is built. Loaded
//! from JSON, every field optional.
//!
//! [`DispersionEngine`]: crate::dsp::DispersionEngine

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::dsp::bank::DEFAULT_MAX_STAGES;
use crate::dsp::params::FrequencyMapping;
use crate::dsp::silence::{DEFAULT_COUNTER_CAP, DEFAULT_DEACTIVATE_AFTER, DEFAULT_NOISE_FLOOR};
use crate::error::{DisperserError, Result};

/// Sample rate assumed by the legacy coefficient math
pub const LEGACY_SAMPLE_RATE: f64 = 44100.0;

/// Default working-buffer size in samples
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 4096;

/// Which sample rate the coefficient math uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoefficientRate {
    /// The rate passed to `prepare`
    #[default]
    Host,
    /// Always 44100 Hz, regardless of the host rate
    Legacy,
}

impl CoefficientRate {
    pub fn resolve(&self, host_rate: f64) -> f64 {
        match self {
            CoefficientRate::Host => host_rate,
            CoefficientRate::Legacy => LEGACY_SAMPLE_RATE,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stage slots per channel
    pub max_stages: usize,
    /// Largest block processed at once; longer host blocks are split
    pub max_block_size: usize,
    /// Silence threshold (linear amplitude)
    pub noise_floor: f64,
    /// Silent samples before the cascade goes dormant
    pub deactivate_after_samples: u32,
    /// Saturation point of the silence counter
    pub silence_counter_cap: u32,
    /// Sample rate used for coefficients
    pub coefficient_rate: CoefficientRate,
    /// Frequency control to Hz mapping
    pub frequency_mapping: FrequencyMapping,
    /// Retune when frequency or Q change after the first setup
    pub retune_on_change: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_stages: DEFAULT_MAX_STAGES,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            noise_floor: DEFAULT_NOISE_FLOOR,
            deactivate_after_samples: DEFAULT_DEACTIVATE_AFTER,
            silence_counter_cap: DEFAULT_COUNTER_CAP,
            coefficient_rate: CoefficientRate::Host,
            frequency_mapping: FrequencyMapping::Exponential,
            retune_on_change: true,
        }
    }
}

impl EngineConfig {
    /// Legacy behaviour: fixed 44.1 kHz
    /// coefficients and a cascade tuned only once
    pub fn legacy() -> Self {
        Self {
            coefficient_rate: CoefficientRate::Legacy,
            retune_on_change: false,
            ..Default::default()
        }
    }

    /// Check ranges that would otherwise break the engine
    pub fn validate(&self) -> Result<()> {
        if self.max_stages == 0 {
            return Err(DisperserError::InvalidConfig {
                reason: "max_stages must be at least 1".to_string(),
            });
        }

        if self.max_block_size == 0 {
            return Err(DisperserError::InvalidConfig {
                reason: "max_block_size must be at least 1".to_string(),
            });
        }

        if !(self.noise_floor.is_finite() && self.noise_floor > 0.0) {
            return Err(DisperserError::InvalidConfig {
                reason: format!("noise_floor must be positive, got {}", self.noise_floor),
            });
        }

        if self.silence_counter_cap < self.deactivate_after_samples {
            return Err(DisperserError::InvalidConfig {
                reason: format!(
                    "silence_counter_cap ({}) must not be below deactivate_after_samples ({})",
                    self.silence_counter_cap, self.deactivate_after_samples
                ),
            });
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DisperserError::FileNotFound {
                path: path.display().to_string(),
                source: None,
            });
        }

        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    /// Pretty JSON form
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
