//! Exploratory-modeling glue for the dike network study
//!
//! Declarative parameter/outcome specifications, sequential experiment
//! evaluation, direct-search orchestration seams and result shaping. The
//! simulation itself, the evolutionary solver and the convergence
//! indicator algorithms are external collaborators behind traits.
//!
//! # Architecture
//!
//! - **params**: structured parameter keys and value domains
//! - **outcomes**: aggregation primitives and outcome specifications
//! - **model**: simulation-function seam plus the configured model
//! - **points**: validated scenario/policy records
//! - **sampling**: Monte Carlo scenario generation
//! - **evaluator**: sequential scenario × policy batches
//! - **tables**: experiment tables and CSV persistence
//! - **optimize**: direct-search seam, ε-dominance bookkeeping, baseline
//! - **archive**: compressed per-seed snapshot store
//! - **convergence**: indicator seam and per-seed metric tables
//! - **rng**: deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Outcome wiring is checked against the simulation's declared
//!    variables when a model is built, never at run time.
//! 2. Scenarios and policies are validated against their parameter specs
//!    at construction.
//! 3. All randomness is deterministic (seeded xorshift64*).

pub mod archive;
pub mod convergence;
pub mod evaluator;
pub mod model;
pub mod optimize;
pub mod outcomes;
pub mod params;
pub mod points;
pub mod rng;
pub mod sampling;
pub mod tables;

// Re-exports for convenience
pub use archive::{ArchiveError, ArchiveLogger};
pub use convergence::{
    score_archives, ConvergenceError, Indicator, IndicatorError, IndicatorSuite, MetricsTable,
};
pub use evaluator::{EvaluateError, Evaluator, SequentialEvaluator};
pub use model::{FunctionError, Model, ModelError, SimulationFunction};
pub use optimize::{
    epsilon_nondominated, pareto_dominates, EpsilonArchive, EpsilonProgress, Insertion,
    OptimizationProblem, OptimizeError, Optimizer, RandomSearch, SearchLog, SearchSettings,
    Solution, SolutionSet,
};
pub use outcomes::{sum_over, sum_over_time, Aggregation, Direction, OutcomeSpec, Sample};
pub use params::{ParamKey, Parameter, ParameterError, ParameterKind};
pub use points::{PointError, Policy, Scenario};
pub use rng::RngManager;
pub use sampling::sample_uncertainties;
pub use tables::{read_records, save_results, ExperimentRow, ExperimentTable, TableError};
