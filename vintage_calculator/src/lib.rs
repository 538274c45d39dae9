pub mod config;
pub mod data_loader;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod lifetime;
pub mod models;
pub mod reducer;
pub mod stepper;

pub use config::EngineConfig;
pub use data_loader::{ColumnMapping, DataLoader};
pub use distribution::InitialDistributionModel;
pub use engine::{BatchDecomposition, DecompositionEngine, FailureMode, GroupDecomposition};
pub use error::{DecompositionError, GroupFailure};
pub use ledger::CohortLedger;
pub use lifetime::{DistributionPolicy, LifetimeTable};
pub use models::{CapacityStatistic, DistributionMode, GroupKey, SnapshotRow, StatisticSeries, VintageRow};
pub use reducer::{RetirementPolicy, RetirementStrategy, VintageReducer};
pub use stepper::{ForwardStepper, StepOutcome};
