//! Early retirement of surviving capacity.
//!
//! When a statistic drops by more than natural expiry explains, the deficit is
//! removed from the vintages still alive in that year. Which vintages give up
//! capacity first is a [`RetirementStrategy`]; [`VintageReducer`] runs the
//! strategy and turns an unabsorbed remainder into a consistency error.

use crate::error::{DecompositionError, Result};
use crate::ledger::CohortLedger;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordering policy for retiring surviving capacity in one year.
pub trait RetirementStrategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Remove up to `deficit` of capacity surviving in `year` from the ledger,
    /// changing each touched vintage from `year` to the end of its window.
    /// Returns the part of `deficit` that could not be absorbed.
    fn retire(&self, ledger: &mut CohortLedger, year: i32, deficit: f64) -> f64;
}

/// Greedy retirement over vintage years in the given order.
fn retire_in_order(
    ledger: &mut CohortLedger,
    year: i32,
    mut deficit: f64,
    order: impl IntoIterator<Item = i32>,
) -> f64 {
    for vintage_year in order {
        let remaining = ledger.surviving(vintage_year, year);
        if remaining <= 0.0 {
            continue;
        }
        if deficit > remaining {
            ledger.set_surviving_from(vintage_year, year, 0.0);
            deficit -= remaining;
        } else {
            ledger.set_surviving_from(vintage_year, year, remaining - deficit);
            return 0.0;
        }
    }
    deficit
}

/// Oldest infrastructure leaves first.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestFirst;

impl RetirementStrategy for OldestFirst {
    fn name(&self) -> &'static str {
        "oldest_first"
    }

    fn retire(&self, ledger: &mut CohortLedger, year: i32, deficit: f64) -> f64 {
        let order = ledger.alive_at(year);
        retire_in_order(ledger, year, deficit, order)
    }
}

/// Most recent vintages leave first.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewestFirst;

impl RetirementStrategy for NewestFirst {
    fn name(&self) -> &'static str {
        "newest_first"
    }

    fn retire(&self, ledger: &mut CohortLedger, year: i32, deficit: f64) -> f64 {
        let order = ledger.alive_at(year);
        retire_in_order(ledger, year, deficit, order.into_iter().rev())
    }
}

/// Every surviving vintage loses the same share of its capacity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProRata;

impl RetirementStrategy for ProRata {
    fn name(&self) -> &'static str {
        "pro_rata"
    }

    fn retire(&self, ledger: &mut CohortLedger, year: i32, deficit: f64) -> f64 {
        let survivors = ledger.survivor_sum(year);
        if survivors <= 0.0 {
            return deficit;
        }
        let share = (deficit / survivors).min(1.0);
        for vintage_year in ledger.alive_at(year) {
            let remaining = ledger.surviving(vintage_year, year);
            ledger.set_surviving_from(vintage_year, year, remaining * (1.0 - share));
        }
        (deficit - survivors).max(0.0)
    }
}

/// Configurable choice of the shipped strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetirementPolicy {
    #[default]
    OldestFirst,
    NewestFirst,
    ProRata,
}

impl RetirementPolicy {
    pub fn strategy(self) -> Box<dyn RetirementStrategy> {
        match self {
            RetirementPolicy::OldestFirst => Box::new(OldestFirst),
            RetirementPolicy::NewestFirst => Box::new(NewestFirst),
            RetirementPolicy::ProRata => Box::new(ProRata),
        }
    }
}

#[derive(Debug)]
pub struct VintageReducer {
    strategy: Box<dyn RetirementStrategy>,
    tolerance: f64,
}

impl VintageReducer {
    pub fn new(policy: RetirementPolicy, tolerance: f64) -> Self {
        Self::with_strategy(policy.strategy(), tolerance)
    }

    pub fn with_strategy(strategy: Box<dyn RetirementStrategy>, tolerance: f64) -> Self {
        Self {
            strategy,
            tolerance,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Retire exactly `deficit` of capacity surviving in `year`.
    ///
    /// A remainder above the tolerance (relative to the deficit, at least
    /// absolute) means the ledger holds less than the statistic asks to retire
    /// and is reported as [`DecompositionError::Consistency`].
    pub fn reduce(&self, ledger: &mut CohortLedger, year: i32, deficit: f64) -> Result<f64> {
        if deficit <= 0.0 {
            return Ok(0.0);
        }

        let remaining = self.strategy.retire(ledger, year, deficit);
        if remaining > self.tolerance * deficit.max(1.0) {
            return Err(DecompositionError::Consistency {
                group: ledger.key().clone(),
                year,
                remaining,
            });
        }

        debug!(
            "{}: retired {:.3} MW in {} ({})",
            ledger.key(),
            deficit - remaining,
            year,
            self.strategy.name()
        );
        Ok(deficit - remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupKey;

    fn ledger() -> CohortLedger {
        let mut ledger = CohortLedger::new(GroupKey::new("Poland", "Hard Coal"), 10);
        ledger.register(1995, 10.0);
        ledger.register(1998, 20.0);
        ledger.register(2000, 30.0);
        ledger
    }

    #[test]
    fn test_oldest_first_partial_and_full() {
        let mut ledger = ledger();
        let reducer = VintageReducer::new(RetirementPolicy::OldestFirst, 1e-9);

        let retired = reducer.reduce(&mut ledger, 2001, 15.0).unwrap();

        assert_eq!(retired, 15.0);
        assert_eq!(ledger.surviving(1995, 2001), 0.0);
        assert_eq!(ledger.surviving(1998, 2001), 15.0);
        assert_eq!(ledger.surviving(2000, 2001), 30.0);
        // earlier years are untouched
        assert_eq!(ledger.surviving(1995, 2000), 10.0);
        // reduction holds until the end of the window
        assert_eq!(ledger.surviving(1998, 2007), 15.0);
        assert_eq!(ledger.survivor_sum(2001), 45.0);
    }

    #[test]
    fn test_newest_first() {
        let mut ledger = ledger();
        let reducer = VintageReducer::new(RetirementPolicy::NewestFirst, 1e-9);

        reducer.reduce(&mut ledger, 2001, 35.0).unwrap();

        assert_eq!(ledger.surviving(2000, 2001), 0.0);
        assert_eq!(ledger.surviving(1998, 2001), 15.0);
        assert_eq!(ledger.surviving(1995, 2001), 10.0);
    }

    #[test]
    fn test_pro_rata() {
        let mut ledger = ledger();
        let reducer = VintageReducer::new(RetirementPolicy::ProRata, 1e-9);

        reducer.reduce(&mut ledger, 2001, 30.0).unwrap();

        assert!((ledger.surviving(1995, 2001) - 5.0).abs() < 1e-9);
        assert!((ledger.surviving(1998, 2001) - 10.0).abs() < 1e-9);
        assert!((ledger.surviving(2000, 2001) - 15.0).abs() < 1e-9);
        assert!((ledger.survivor_sum(2001) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_exhausted_ledger_is_a_consistency_error() {
        for policy in [
            RetirementPolicy::OldestFirst,
            RetirementPolicy::NewestFirst,
            RetirementPolicy::ProRata,
        ] {
            let mut ledger = ledger();
            let reducer = VintageReducer::new(policy, 1e-9);
            let err = reducer.reduce(&mut ledger, 2001, 75.0).unwrap_err();
            match err {
                DecompositionError::Consistency {
                    group,
                    year,
                    remaining,
                } => {
                    assert_eq!(group, GroupKey::new("Poland", "Hard Coal"));
                    assert_eq!(year, 2001);
                    assert!((remaining - 15.0).abs() < 1e-9);
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn test_expired_vintages_are_not_retired() {
        let mut ledger = ledger();
        let reducer = VintageReducer::new(RetirementPolicy::OldestFirst, 1e-9);

        // the 1995 vintage is out of its window in 2005
        assert!(reducer.reduce(&mut ledger, 2005, 55.0).is_err());
    }
}
