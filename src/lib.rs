pub mod core;
pub mod report;

// Re-export commonly used types
pub use crate::core::config::SimulationConfig;
pub use crate::core::errors::{PoolError, SimError, SimResult};
pub use crate::core::simulation::Simulation;
pub use crate::core::stats::{Stats, StatsSnapshot};
pub use crate::core::types::{Car, CashRegister, FuelType, PerFuel, Station, TimeRange};
