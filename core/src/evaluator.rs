//! Experiment evaluation
//!
//! Runs the scenario × policy cross product through the simulation
//! function and aggregates raw outputs into outcome columns. The
//! evaluator here is strictly sequential: batches run to completion in
//! deterministic order, the first failure aborts the batch, and whatever
//! files an orchestration already wrote stay on disk. Parallel dispatch
//! belongs to the external toolkit, not this crate.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::{FunctionError, Model};
use crate::outcomes::AggregationError;
use crate::points::{Policy, Scenario};
use crate::tables::{ExperimentRow, ExperimentTable, TableError};

/// Errors raised while running experiments.
#[derive(Debug, Error)]
pub enum EvaluateError {
    /// Failure inside the delegated simulation function, unchanged.
    #[error("simulation function failed: {0}")]
    Function(#[from] FunctionError),

    #[error("aggregating outcome '{outcome}' failed: {source}")]
    Aggregation {
        outcome: String,
        #[source]
        source: AggregationError,
    },

    /// The function produced no value for a variable an outcome needs.
    #[error("simulation produced no value for variable '{0}'")]
    MissingVariable(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Batch evaluation of (scenario, policy) pairings.
pub trait Evaluator {
    /// Run every scenario × policy pairing and collect one result row per
    /// experiment.
    fn perform_experiments(
        &mut self,
        model: &Model,
        scenarios: &[Scenario],
        policies: &[Policy],
    ) -> Result<ExperimentTable, EvaluateError>;
}

/// Single-threaded evaluator: scenarios outer, policies inner, in order.
#[derive(Debug, Default)]
pub struct SequentialEvaluator;

impl SequentialEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for SequentialEvaluator {
    fn perform_experiments(
        &mut self,
        model: &Model,
        scenarios: &[Scenario],
        policies: &[Policy],
    ) -> Result<ExperimentTable, EvaluateError> {
        let total = scenarios.len() * policies.len();
        tracing::info!(
            scenarios = scenarios.len(),
            policies = policies.len(),
            total,
            model = model.name(),
            "performing experiments"
        );

        let mut table = ExperimentTable::new(model.parameter_names(), model.outcome_names());

        for scenario in scenarios {
            for policy in policies {
                let row = run_experiment(model, scenario, policy)?;
                table.push(row)?;
            }
        }

        tracing::info!(rows = table.len(), "experiments complete");
        Ok(table)
    }
}

/// Run one experiment: merge the point values, invoke the function,
/// aggregate every outcome.
pub fn run_experiment(
    model: &Model,
    scenario: &Scenario,
    policy: &Policy,
) -> Result<ExperimentRow, EvaluateError> {
    let mut inputs: BTreeMap<String, f64> = scenario.values().clone();
    inputs.extend(policy.values().iter().map(|(k, v)| (k.clone(), *v)));

    let raw = model.function().run(&inputs)?;

    let mut outcomes = Vec::with_capacity(model.outcomes().len());
    for spec in model.outcomes() {
        let mut samples = Vec::with_capacity(spec.variables().len());
        for variable in spec.variables() {
            let sample = raw
                .get(variable)
                .ok_or_else(|| EvaluateError::MissingVariable(variable.clone()))?;
            samples.push(sample.clone());
        }
        let value = spec
            .aggregation()
            .apply(&samples)
            .map_err(|source| EvaluateError::Aggregation {
                outcome: spec.name().to_string(),
                source,
            })?;
        outcomes.push(value);
    }

    let parameters = model
        .parameter_names()
        .iter()
        .map(|name| {
            inputs
                .get(name)
                .copied()
                .ok_or_else(|| EvaluateError::MissingVariable(name.clone()))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    Ok(ExperimentRow {
        scenario: scenario.name().to_string(),
        policy: policy.name().to_string(),
        parameters,
        outcomes,
    })
}
