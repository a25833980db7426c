//! Parkflow Simulation Engine
//!
//! Tick-driven simulator for comparing parking lot allocation policies.

pub mod error;
pub mod types;
pub mod config;
pub mod layout;
pub mod pool;
pub mod queue;
pub mod arrivals;
pub mod dwell;
pub mod policies;
pub mod ledger;
pub mod metrics;
pub mod simulator;

pub use config::{PolicyKind, SimulationConfig};
pub use error::{Result, SimulationError};
pub use simulator::{SimulationResult, Simulator, TickSnapshot, run_batch};
