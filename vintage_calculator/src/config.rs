use crate::error::{DecompositionError, Result};
use crate::lifetime::{DistributionPolicy, LifetimeTable};
use crate::reducer::RetirementPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the engine needs besides the statistics themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lifetimes: LifetimeTable,
    pub distribution: DistributionPolicy,
    pub retirement: RetirementPolicy,
    /// Built capacities with a magnitude at or below this are dropped from the output
    pub epsilon: f64,
    /// Relative slack allowed when a retirement deficit is not fully absorbed
    pub tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lifetimes: LifetimeTable::default(),
            distribution: DistributionPolicy::default(),
            retirement: RetirementPolicy::default(),
            epsilon: 1e-8,
            tolerance: 1e-9,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in {}", path.display()))
    }

    pub fn with_retirement(mut self, retirement: RetirementPolicy) -> Self {
        self.retirement = retirement;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.lifetimes.validate()?;
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(DecompositionError::Configuration(format!(
                "epsilon must be a non-negative number, got {}",
                self.epsilon
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(DecompositionError::Configuration(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}
