use crate::error::Result;
use crate::ledger::CohortLedger;
use crate::models::StatisticSeries;
use crate::reducer::VintageReducer;
use log::debug;

/// What happened to the ledger in one calendar year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// New vintage commissioned (possibly zero when the statistic was flat)
    Built { year: i32, capacity: f64 },
    /// Statistic fell below the survivors; capacity retired early
    Retired { year: i32, capacity: f64 },
    /// No statistic reported
    NoData { year: i32 },
}

impl StepOutcome {
    pub fn year(&self) -> i32 {
        match *self {
            StepOutcome::Built { year, .. }
            | StepOutcome::Retired { year, .. }
            | StepOutcome::NoData { year } => year,
        }
    }
}

/// Walks the years after the first statistic and reconciles each observed
/// total against the ledger.
pub struct ForwardStepper<'a> {
    reducer: &'a VintageReducer,
}

impl<'a> ForwardStepper<'a> {
    pub fn new(reducer: &'a VintageReducer) -> Self {
        Self { reducer }
    }

    /// Advance from the year after the first statistic to the last one.
    /// The ledger must already hold the pre-history vintages.
    pub fn run(&self, ledger: &mut CohortLedger, series: &StatisticSeries) -> Result<Vec<StepOutcome>> {
        let (first_year, _) = series.first();
        let last_year = series.last_year();
        let mut outcomes = Vec::with_capacity((last_year - first_year).max(0) as usize);

        for year in first_year + 1..=last_year {
            let outcome = self.step(ledger, series, year)?;
            debug!("{}: {:?}", ledger.key(), outcome);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn step(&self, ledger: &mut CohortLedger, series: &StatisticSeries, year: i32) -> Result<StepOutcome> {
        let Some(statistic) = series.observed(year) else {
            // a gap is missing data, not zero capacity
            ledger.register(year, 0.0);
            return Ok(StepOutcome::NoData { year });
        };

        let addition = statistic - ledger.survivor_sum(year);
        if addition >= 0.0 {
            ledger.register(year, addition);
            Ok(StepOutcome::Built {
                year,
                capacity: addition,
            })
        } else {
            ledger.register(year, 0.0);
            let retired = self.reducer.reduce(ledger, year, -addition)?;
            Ok(StepOutcome::Retired {
                year,
                capacity: retired,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::InitialDistributionModel;
    use crate::models::{CapacityStatistic, DistributionMode, GroupKey};
    use crate::reducer::RetirementPolicy;

    fn run(points: &[(i32, f64)], lifetime: u32) -> (CohortLedger, Vec<StepOutcome>) {
        let stats: Vec<_> = points
            .iter()
            .map(|&(y, c)| CapacityStatistic::new("Austria", "Oil", y, c))
            .collect();
        let series = StatisticSeries::from_sorted(&stats).unwrap();
        let mut ledger = CohortLedger::new(GroupKey::new("Austria", "Oil"), lifetime);
        let (y0, c0) = series.first();
        InitialDistributionModel::new(DistributionMode::Flat).seed(&mut ledger, y0, c0);

        let reducer = VintageReducer::new(RetirementPolicy::OldestFirst, 1e-9);
        let outcomes = ForwardStepper::new(&reducer).run(&mut ledger, &series).unwrap();
        (ledger, outcomes)
    }

    #[test]
    fn test_growth_builds_difference_to_survivors() {
        let (ledger, outcomes) = run(&[(2000, 100.0), (2001, 120.0)], 10);

        // the 1991 pre-history vintage has left the window by 2001
        assert_eq!(ledger.survivor_sum(2001) - ledger.surviving(2001, 2001), 90.0);
        assert_eq!(ledger.get(2001).unwrap().built_capacity(), 30.0);
        assert_eq!(ledger.survivor_sum(2001), 120.0);
        assert_eq!(
            outcomes,
            vec![StepOutcome::Built {
                year: 2001,
                capacity: 30.0
            }]
        );
    }

    #[test]
    fn test_decline_retires_oldest_vintages() {
        let (ledger, outcomes) = run(&[(2000, 100.0), (2001, 60.0)], 10);

        assert_eq!(ledger.get(2001).unwrap().built_capacity(), 0.0);
        assert_eq!(ledger.survivor_sum(2001), 60.0);
        assert_eq!(ledger.surviving(1992, 2001), 0.0);
        assert_eq!(ledger.surviving(1993, 2001), 0.0);
        assert_eq!(ledger.surviving(1994, 2001), 0.0);
        assert_eq!(ledger.surviving(1995, 2001), 10.0);
        assert_eq!(
            outcomes,
            vec![StepOutcome::Retired {
                year: 2001,
                capacity: 30.0
            }]
        );
    }

    #[test]
    fn test_gap_years_never_reconcile() {
        let (ledger, outcomes) = run(&[(2000, 100.0), (2003, 100.0)], 10);

        assert_eq!(ledger.get(2001).unwrap().built_capacity(), 0.0);
        assert_eq!(ledger.get(2002).unwrap().built_capacity(), 0.0);
        // natural expiry only, nothing retired early
        assert_eq!(ledger.survivor_sum(2002), 80.0);
        assert_eq!(ledger.get(2003).unwrap().built_capacity(), 30.0);
        assert_eq!(ledger.survivor_sum(2003), 100.0);
        assert_eq!(outcomes.iter().map(StepOutcome::year).collect::<Vec<_>>(), vec![2001, 2002, 2003]);
        assert!(matches!(outcomes[0], StepOutcome::NoData { year: 2001 }));
    }

    #[test]
    fn test_single_statistic_has_no_steps() {
        let (ledger, outcomes) = run(&[(2015, 50.0)], 5);
        assert!(outcomes.is_empty());
        assert_eq!(ledger.len(), 5);
    }
}
