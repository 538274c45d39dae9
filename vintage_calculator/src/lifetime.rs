use crate::error::{DecompositionError, Result};
use crate::models::DistributionMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Assumed operating lifetime in years per technology category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LifetimeTable {
    lifetimes: BTreeMap<String, u32>,
}

impl LifetimeTable {
    pub fn empty() -> Self {
        Self {
            lifetimes: BTreeMap::new(),
        }
    }

    pub fn with_lifetime(mut self, technology: impl Into<String>, years: u32) -> Self {
        self.insert(technology, years);
        self
    }

    pub fn insert(&mut self, technology: impl Into<String>, years: u32) {
        self.lifetimes.insert(technology.into(), years);
    }

    pub fn get(&self, technology: &str) -> Option<u32> {
        self.lifetimes.get(technology).copied()
    }

    /// Lifetime of `technology`. There is no fallback value.
    pub fn lifetime(&self, technology: &str) -> Result<u32> {
        self.get(technology).ok_or_else(|| {
            DecompositionError::Configuration(format!(
                "no lifetime configured for technology '{}'",
                technology
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some((technology, _)) = self.lifetimes.iter().find(|(_, years)| **years == 0) {
            return Err(DecompositionError::Configuration(format!(
                "lifetime of '{}' must be at least one year",
                technology
            )));
        }
        Ok(())
    }
}

impl Default for LifetimeTable {
    fn default() -> Self {
        [
            ("Bioenergy", 20),
            ("Geothermal", 15),
            ("Hard Coal", 45),
            ("Hydro", 100),
            ("Lignite", 45),
            ("Natural Gas", 40),
            ("Nuclear", 50),
            ("Oil", 40),
            ("Other", 5),
            ("Solar", 25),
            ("Waste", 25),
            ("Wind", 25),
        ]
        .into_iter()
        .fold(Self::empty(), |table, (technology, years)| {
            table.with_lifetime(technology, years)
        })
    }
}

/// Which pre-history shape applies to which technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionPolicy {
    #[serde(default)]
    pub overrides: BTreeMap<String, DistributionMode>,
    #[serde(default = "default_mode")]
    pub default: DistributionMode,
}

fn default_mode() -> DistributionMode {
    DistributionMode::Flat
}

impl DistributionPolicy {
    pub fn uniform(mode: DistributionMode) -> Self {
        Self {
            overrides: BTreeMap::new(),
            default: mode,
        }
    }

    pub fn with_mode(mut self, technology: impl Into<String>, mode: DistributionMode) -> Self {
        self.overrides.insert(technology.into(), mode);
        self
    }

    pub fn mode_for(&self, technology: &str) -> DistributionMode {
        self.overrides
            .get(technology)
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for DistributionPolicy {
    /// Variable renewables and bioenergy ramp up, conventional plant is flat.
    fn default() -> Self {
        ["Solar", "Wind", "Bioenergy", "Geothermal"]
            .into_iter()
            .fold(Self::uniform(DistributionMode::Flat), |policy, technology| {
                policy.with_mode(technology, DistributionMode::Triangular)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifetimes() {
        let table = LifetimeTable::default();
        assert_eq!(table.lifetime("Wind").unwrap(), 25);
        assert_eq!(table.lifetime("Hydro").unwrap(), 100);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_missing_lifetime_is_configuration_error() {
        let err = LifetimeTable::default().lifetime("Fusion").unwrap_err();
        assert!(matches!(err, DecompositionError::Configuration(_)));
        assert!(err.to_string().contains("Fusion"));
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        let table = LifetimeTable::empty().with_lifetime("Marine", 0);
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_default_distribution_policy() {
        let policy = DistributionPolicy::default();
        assert_eq!(policy.mode_for("Solar"), DistributionMode::Triangular);
        assert_eq!(policy.mode_for("Geothermal"), DistributionMode::Triangular);
        assert_eq!(policy.mode_for("Nuclear"), DistributionMode::Flat);
        assert_eq!(policy.mode_for("Unknown"), DistributionMode::Flat);
    }
}
