//! Error types for the decomposition engine.
//!
//! Every error is raised at the level of one (region, technology) group. A
//! failing group never leaves partial rows behind; batch runs collect the
//! failures as [`GroupFailure`] values next to the successful groups.

use crate::models::GroupKey;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecompositionError {
    /// Missing lifetime for a technology or an invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The statistic series asks for more retirement than the ledger holds
    #[error(
        "Consistency error for {group} in {year}: {remaining:.6} of capacity could not be retired"
    )]
    Consistency {
        group: GroupKey,
        year: i32,
        remaining: f64,
    },

    /// Empty, duplicated, unordered or otherwise malformed statistic series
    #[error("Input shape error: {0}")]
    InputShape(String),
}

pub type Result<T> = std::result::Result<T, DecompositionError>;

/// A group that could not be decomposed, with the reason.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("group {group} failed: {error}")]
pub struct GroupFailure {
    pub group: GroupKey,
    pub error: DecompositionError,
}

impl GroupFailure {
    pub fn new(group: GroupKey, error: DecompositionError) -> Self {
        Self { group, error }
    }
}
