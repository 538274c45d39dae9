use crate::ledger::CohortLedger;
use crate::models::DistributionMode;
use log::debug;

impl DistributionMode {
    /// Build capacities of the `lifetime` pre-history vintages, oldest first.
    /// The values always add up to `first_capacity`.
    pub fn prehistory(self, first_capacity: f64, lifetime: u32) -> Vec<f64> {
        let life = lifetime as f64;
        let height_flat = first_capacity / life;

        match self {
            DistributionMode::Flat => vec![height_flat; lifetime as usize],
            DistributionMode::Triangular => {
                // slope of the triangle and its height at the most recent year
                let decrement = 2.0 * height_flat / life;
                let height = 2.0 * height_flat - decrement / 2.0;
                let mut series: Vec<f64> = (0..lifetime)
                    .map(|i| height - i as f64 * decrement)
                    .collect();
                series.reverse();
                series
            }
        }
    }
}

/// Synthesises the vintages that explain the first observed statistic.
#[derive(Debug, Clone, Copy)]
pub struct InitialDistributionModel {
    mode: DistributionMode,
}

impl InitialDistributionModel {
    pub fn new(mode: DistributionMode) -> Self {
        Self { mode }
    }

    /// Register the pre-history vintages `first_year - life + 1 ..= first_year`.
    pub fn seed(&self, ledger: &mut CohortLedger, first_year: i32, first_capacity: f64) {
        let lifetime = ledger.lifetime();
        let start = first_year - lifetime as i32 + 1;

        debug!(
            "{}: seeding {} {:?} vintages from {} for {:.3} MW",
            ledger.key(),
            lifetime,
            self.mode,
            start,
            first_capacity
        );

        for (offset, built) in self
            .mode
            .prehistory(first_capacity, lifetime)
            .into_iter()
            .enumerate()
        {
            ledger.register(start + offset as i32, built);
        }
    }
}
