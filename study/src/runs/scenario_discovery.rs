//! Scenario discovery with the do-nothing policy
//!
//! Samples the uncertainty space at scale and evaluates every scenario
//! under the zero policy (no heightening, no Room for the River, no
//! warning), producing the raw material for scenario discovery. Uses the
//! open-exploration formulation so no outcome of interest is excluded.

use std::path::PathBuf;

use dikesnet_core::evaluator::Evaluator;
use dikesnet_core::{sample_uncertainties, save_results, RngManager, SequentialEvaluator, SimulationFunction};

use crate::baseline::zero_policy;
use crate::formulations::{build_model, ProblemFormulation};
use crate::network::NetworkLayout;
use crate::runs::RunError;

/// Configuration for one scenario-discovery batch.
#[derive(Debug, Clone)]
pub struct ScenarioDiscoveryConfig {
    /// How many scenarios to sample.
    pub n_scenarios: usize,

    /// Seed for the scenario sampler.
    pub seed: u64,

    /// Directory the result tables land in.
    pub out_dir: PathBuf,

    /// File stem for the result tables.
    pub stem: String,
}

impl ScenarioDiscoveryConfig {
    /// The study's defaults: 100k scenarios, results under `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            n_scenarios: 100_000,
            seed: 0,
            out_dir: out_dir.into(),
            stem: "scenario_discovery_results".to_string(),
        }
    }
}

/// Run the batch: sample, evaluate against the zero policy, persist.
///
/// Returns the paths written, main table first.
pub fn run<F>(
    function: F,
    layout: &NetworkLayout,
    config: &ScenarioDiscoveryConfig,
) -> Result<Vec<PathBuf>, RunError>
where
    F: SimulationFunction + 'static,
{
    tracing::info!(n_scenarios = config.n_scenarios, seed = config.seed, "scenario discovery");

    let model = build_model(function, layout, ProblemFormulation::OpenExploration)?;
    let policy = zero_policy(&model, layout.planning_steps())?;

    let mut rng = RngManager::new(config.seed);
    let scenarios = sample_uncertainties(&model, config.n_scenarios, &mut rng)?;

    let table =
        SequentialEvaluator::new().perform_experiments(&model, &scenarios, &[policy])?;

    let written = save_results(&table, &config.out_dir, &config.stem)?;
    Ok(written)
}
