//! Policy × scenario cross evaluation
//!
//! Every policy found by directed search is re-evaluated on every
//! discovered scenario, not just the scenario it was optimized for.
//! Averaging over the shared scenario set afterwards keeps solutions
//! that are robust across scenarios rather than lucky in one. Uses the
//! directed-search formulation: this step refines the optimization, so
//! only the search objectives matter.

use std::path::PathBuf;

use dikesnet_core::evaluator::Evaluator;
use dikesnet_core::tables::read_records;
use dikesnet_core::{ExperimentTable, SequentialEvaluator, SimulationFunction};

use crate::baseline::{policies_from_records, scenarios_from_records};
use crate::formulations::{build_model, ProblemFormulation};
use crate::network::NetworkLayout;
use crate::runs::RunError;

/// Configuration for one cross-evaluation batch.
#[derive(Debug, Clone)]
pub struct CrossEvaluationConfig {
    /// CSV of policies (fully qualified lever columns).
    pub policies: PathBuf,

    /// CSV of scenarios (fully qualified uncertainty columns).
    pub scenarios: PathBuf,

    /// The single combined output table.
    pub out_file: PathBuf,
}

/// Run the batch and write one combined CSV carrying every
/// policy × scenario row; the `policy` column identifies each policy's
/// block.
pub fn run<F>(
    function: F,
    layout: &NetworkLayout,
    config: &CrossEvaluationConfig,
) -> Result<ExperimentTable, RunError>
where
    F: SimulationFunction + 'static,
{
    let model = build_model(function, layout, ProblemFormulation::DirectedSearch)?;

    let scenarios = scenarios_from_records(&read_records(&config.scenarios)?, &model)?;
    let policies = policies_from_records(&read_records(&config.policies)?, &model)?;
    tracing::info!(
        policies = policies.len(),
        scenarios = scenarios.len(),
        "cross evaluation"
    );

    let mut evaluator = SequentialEvaluator::new();
    let mut combined = ExperimentTable::new(model.parameter_names(), model.outcome_names());
    for policy in &policies {
        let table =
            evaluator.perform_experiments(&model, &scenarios, std::slice::from_ref(policy))?;
        combined.extend(table)?;
    }

    if let Some(parent) = config.out_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    combined.write_csv(&config.out_file)?;
    Ok(combined)
}
