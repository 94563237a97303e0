//! Many-objective robust decision making for a river-dike network
//!
//! Wraps the externally supplied flood simulation with problem
//! formulations (uncertainty/lever spaces plus outcome aggregations) and
//! drives the study's four batch jobs: scenario discovery, robustness
//! evaluation, policy × scenario cross evaluation, and directed search
//! with convergence diagnostics.
//!
//! # Architecture
//!
//! - **network**: dike-ring layout and the simulation's output surface
//! - **formulations**: the problem-formulation catalog (ids 0–5, 7, 8)
//! - **baseline**: reference scenario, zero policy, table conversion
//! - **runs**: the four batch drivers
//! - **testing**: a deterministic simulation stand-in for tests

pub mod baseline;
pub mod formulations;
pub mod network;
pub mod runs;
pub mod testing;

// Re-exports for convenience
pub use baseline::{
    policies_from_records, reference_scenario, reference_values, scenarios_from_records,
    zero_policy, InputError,
};
pub use formulations::{build_model, FormulationError, ProblemFormulation};
pub use network::{LayoutError, NetworkLayout};
pub use runs::RunError;
