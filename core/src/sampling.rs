//! Uncertainty sampling
//!
//! Monte Carlo generation of scenarios over a model's uncertainty space.
//! All draws go through [`RngManager`], so a seed fully determines the
//! sampled batch.

use crate::model::Model;
use crate::points::{PointError, Scenario};
use crate::rng::RngManager;

/// Sample `n` scenarios uniformly over the model's uncertainties.
///
/// Scenarios are named `scenario_0`, `scenario_1`, ... in draw order.
pub fn sample_uncertainties(
    model: &Model,
    n: usize,
    rng: &mut RngManager,
) -> Result<Vec<Scenario>, PointError> {
    let uncertainties = model.uncertainties();
    let mut scenarios = Vec::with_capacity(n);

    for i in 0..n {
        let mut row = std::collections::BTreeMap::new();
        for param in uncertainties {
            row.insert(param.name(), param.sample(rng));
        }
        scenarios.push(Scenario::from_table_row(
            &format!("scenario_{}", i),
            &row,
            uncertainties,
        )?);
    }

    tracing::debug!(count = scenarios.len(), "sampled scenarios");
    Ok(scenarios)
}
