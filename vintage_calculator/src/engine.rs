use crate::config::EngineConfig;
use crate::distribution::InitialDistributionModel;
use crate::error::{GroupFailure, Result};
use crate::ledger::CohortLedger;
use crate::models::{
    CapacityStatistic, DistributionMode, GroupKey, SnapshotRow, StatisticSeries, VintageRow,
};
use crate::reducer::{RetirementStrategy, VintageReducer};
use crate::stepper::{ForwardStepper, StepOutcome};
use log::{info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// What to do with the remaining groups once one group fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Record the failure and keep the other groups
    #[default]
    Continue,
    /// Return the first failure (in group order) instead of any result
    Abort,
}

/// Decomposition of a single (region, technology) group.
#[derive(Debug, Clone)]
pub struct GroupDecomposition {
    key: GroupKey,
    fueltype: String,
    set_label: String,
    mode: DistributionMode,
    epsilon: f64,
    ledger: CohortLedger,
    rows: Vec<VintageRow>,
    steps: Vec<StepOutcome>,
}

impl GroupDecomposition {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn fueltype(&self) -> &str {
        &self.fueltype
    }

    pub fn lifetime(&self) -> u32 {
        self.ledger.lifetime()
    }

    pub fn mode(&self) -> DistributionMode {
        self.mode
    }

    pub fn ledger(&self) -> &CohortLedger {
        &self.ledger
    }

    /// Vintages with non-negligible built capacity, by vintage year.
    pub fn rows(&self) -> &[VintageRow] {
        &self.rows
    }

    pub fn steps(&self) -> &[StepOutcome] {
        &self.steps
    }

    /// Capacity of the group still in service in `target_year`.
    pub fn capacity_at(&self, target_year: i32) -> f64 {
        self.ledger.survivor_sum(target_year)
    }

    /// Surviving capacity of every vintage in `base_year`, negligible values dropped.
    pub fn snapshot(&self, base_year: i32) -> Vec<SnapshotRow> {
        self.ledger
            .vintages()
            .filter_map(|vintage| {
                let surviving = vintage.surviving_at(base_year);
                (surviving.abs() > self.epsilon).then(|| SnapshotRow {
                    region: self.key.region.clone(),
                    technology: self.key.technology.clone(),
                    fueltype: self.fueltype.clone(),
                    vintage_year: vintage.vintage_year(),
                    base_year,
                    surviving_capacity: surviving,
                    set_label: self.set_label.clone(),
                })
            })
            .collect()
    }
}

/// Result of decomposing many groups at once.
#[derive(Debug, Clone, Default)]
pub struct BatchDecomposition {
    groups: BTreeMap<GroupKey, GroupDecomposition>,
    failures: Vec<GroupFailure>,
}

impl BatchDecomposition {
    pub fn groups(&self) -> impl Iterator<Item = &GroupDecomposition> {
        self.groups.values()
    }

    pub fn get(&self, region: &str, technology: &str) -> Option<&GroupDecomposition> {
        self.groups.get(&GroupKey::new(region, technology))
    }

    pub fn failures(&self) -> &[GroupFailure] {
        &self.failures
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All vintage rows ordered by region, technology and vintage year.
    pub fn rows(&self) -> Vec<VintageRow> {
        self.groups
            .values()
            .flat_map(|g| g.rows().iter().cloned())
            .collect()
    }

    pub fn snapshot(&self, base_year: i32) -> Vec<SnapshotRow> {
        self.groups
            .values()
            .flat_map(|g| g.snapshot(base_year))
            .collect()
    }

    /// Capacity of a group in `target_year`; `None` for groups that were not
    /// decomposed.
    pub fn project(&self, region: &str, technology: &str, target_year: i32) -> Option<f64> {
        self.get(region, technology)
            .map(|g| g.capacity_at(target_year))
    }
}

pub struct DecompositionEngine {
    config: EngineConfig,
    reducer: VintageReducer,
}

impl DecompositionEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let reducer = VintageReducer::new(config.retirement, config.tolerance);
        Ok(Self { config, reducer })
    }

    /// Use a custom retirement strategy instead of the configured policy.
    pub fn with_strategy(config: EngineConfig, strategy: Box<dyn RetirementStrategy>) -> Result<Self> {
        config.validate()?;
        let reducer = VintageReducer::with_strategy(strategy, config.tolerance);
        Ok(Self { config, reducer })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Statistics of one group in any order.
    pub fn decompose_group(&self, statistics: Vec<CapacityStatistic>) -> Result<GroupDecomposition> {
        let series = StatisticSeries::from_unsorted(statistics)?;
        self.decompose_series(&series)
    }

    pub fn decompose_series(&self, series: &StatisticSeries) -> Result<GroupDecomposition> {
        let key = series.key().clone();
        let fueltype = series.fueltype();
        let lifetime = self.config.lifetimes.lifetime(fueltype)?;
        let mode = self.config.distribution.mode_for(fueltype);

        let mut ledger = CohortLedger::new(key.clone(), lifetime);
        let (first_year, first_capacity) = series.first();
        InitialDistributionModel::new(mode).seed(&mut ledger, first_year, first_capacity);

        let steps = ForwardStepper::new(&self.reducer).run(&mut ledger, series)?;

        let rows = ledger
            .vintages()
            .filter(|v| v.built_capacity().abs() > self.config.epsilon)
            .map(|v| VintageRow {
                region: key.region.clone(),
                technology: key.technology.clone(),
                fueltype: fueltype.to_string(),
                vintage_year: v.vintage_year(),
                built_capacity: v.built_capacity(),
                set_label: series.set_label().to_string(),
            })
            .collect();

        Ok(GroupDecomposition {
            key,
            fueltype: fueltype.to_string(),
            set_label: series.set_label().to_string(),
            mode,
            epsilon: self.config.epsilon,
            ledger,
            rows,
            steps,
        })
    }

    /// Group statistics by (region, technology) and decompose every group in
    /// parallel. Groups share no state; only the failure handling differs
    /// between the modes.
    pub fn decompose_all(
        &self,
        statistics: &[CapacityStatistic],
        mode: FailureMode,
    ) -> std::result::Result<BatchDecomposition, GroupFailure> {
        let mut grouped: BTreeMap<GroupKey, Vec<CapacityStatistic>> = BTreeMap::new();
        for stat in statistics {
            grouped.entry(stat.group_key()).or_default().push(stat.clone());
        }

        info!(
            "Decomposing {} groups with {} retirement",
            grouped.len(),
            self.reducer.strategy_name()
        );

        let results: Vec<(GroupKey, Result<GroupDecomposition>)> = grouped
            .into_par_iter()
            .map(|(key, group)| {
                let result = self.decompose_group(group);
                (key, result)
            })
            .collect();

        let mut batch = BatchDecomposition::default();
        for (key, result) in results {
            match result {
                Ok(decomposition) => {
                    batch.groups.insert(key, decomposition);
                }
                Err(error) => {
                    let failure = GroupFailure::new(key, error);
                    if mode == FailureMode::Abort {
                        return Err(failure);
                    }
                    warn!("{}", failure);
                    batch.failures.push(failure);
                }
            }
        }

        info!(
            "Decomposed {} groups, {} failed",
            batch.len(),
            batch.failures.len()
        );
        Ok(batch)
    }
}
