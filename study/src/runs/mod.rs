//! Batch run drivers
//!
//! Four independent, run-to-completion batch jobs, all following the same
//! pattern: build the model for a formulation, construct scenarios and/or
//! policies (fixed literal, sampled at scale, or loaded from a table),
//! evaluate or optimize, persist result tables. The drivers are
//! single-threaded and carry no retry or partial-failure handling: the
//! first error aborts the batch and whatever files were already written
//! stay on disk.
//!
//! Progress is reported through `tracing` events; installing (or not
//! installing) a subscriber is the embedding application's choice.

pub mod cross_evaluation;
pub mod directed_search;
pub mod robustness;
pub mod scenario_discovery;

use dikesnet_core::{ArchiveError, ConvergenceError, EvaluateError, OptimizeError, PointError, TableError};
use thiserror::Error;

use crate::baseline::InputError;
use crate::formulations::FormulationError;

/// Any failure a batch driver can abort with.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Formulation(#[from] FormulationError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Point(#[from] PointError),

    #[error(transparent)]
    Evaluate(#[from] EvaluateError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Convergence(#[from] ConvergenceError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turn a free-form policy/scenario name into a file stem fragment.
pub(crate) fn file_fragment(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
