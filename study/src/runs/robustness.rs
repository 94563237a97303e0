//! Robustness evaluation of candidate policies
//!
//! Evaluates a handful of promising policies (typically found by directed
//! search) against a large shared batch of sampled scenarios, one result
//! table per policy. Uses the open-exploration formulation so robustness
//! is judged on the full outcome surface, not just the search objectives.

use std::path::PathBuf;

use dikesnet_core::evaluator::Evaluator;
use dikesnet_core::tables::read_records;
use dikesnet_core::{sample_uncertainties, save_results, RngManager, SequentialEvaluator, SimulationFunction};

use crate::baseline::policies_from_records;
use crate::formulations::{build_model, ProblemFormulation};
use crate::network::NetworkLayout;
use crate::runs::{file_fragment, RunError};

/// Configuration for one robustness batch.
#[derive(Debug, Clone)]
pub struct RobustnessConfig {
    /// CSV of candidate policies (fully qualified lever columns, with an
    /// optional `policy_name` column).
    pub policies: PathBuf,

    /// How many scenarios to sample; the same batch is shared by every
    /// policy.
    pub n_scenarios: usize,

    /// Seed for the scenario sampler.
    pub seed: u64,

    /// Directory the per-policy result tables land in.
    pub out_dir: PathBuf,
}

impl RobustnessConfig {
    /// The study's defaults: 20k scenarios per policy.
    pub fn new(policies: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            policies: policies.into(),
            n_scenarios: 20_000,
            seed: 0,
            out_dir: out_dir.into(),
        }
    }
}

/// Run the batch: one evaluation sweep and one result file per policy.
///
/// Returns the written paths grouped per policy, in policy order.
pub fn run<F>(
    function: F,
    layout: &NetworkLayout,
    config: &RobustnessConfig,
) -> Result<Vec<(String, Vec<PathBuf>)>, RunError>
where
    F: SimulationFunction + 'static,
{
    let model = build_model(function, layout, ProblemFormulation::OpenExploration)?;

    let records = read_records(&config.policies)?;
    let policies = policies_from_records(&records, &model)?;
    tracing::info!(
        policies = policies.len(),
        n_scenarios = config.n_scenarios,
        "robustness evaluation"
    );

    let mut rng = RngManager::new(config.seed);
    let scenarios = sample_uncertainties(&model, config.n_scenarios, &mut rng)?;

    let mut evaluator = SequentialEvaluator::new();
    let mut written = Vec::with_capacity(policies.len());
    for policy in &policies {
        let table =
            evaluator.perform_experiments(&model, &scenarios, std::slice::from_ref(policy))?;
        let stem = format!("results_policy_{}", file_fragment(policy.name()));
        let files = save_results(&table, &config.out_dir, &stem)?;
        written.push((policy.name().to_string(), files));
    }
    Ok(written)
}
