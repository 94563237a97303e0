//! Test support: a deterministic stand-in for the flood simulation.
//!
//! The real flood network is an external collaborator; [`StubNetwork`]
//! produces smooth, fully deterministic outputs with the same variable
//! surface so wiring, drivers and post-processing can be exercised.
//!
//! NOTE: available in all builds to support integration testing, but
//! should only be used in test code.

use std::collections::BTreeMap;

use dikesnet_core::{FunctionError, Sample, SimulationFunction};

use crate::network::{
    NetworkLayout, DIKE_INVESTMENT_COSTS, EXPECTED_ANNUAL_DAMAGE, EXPECTED_EVACUATION_COSTS,
    EXPECTED_NUMBER_OF_DEATHS, RFR_TOTAL_COSTS,
};

/// Deterministic stand-in for the external dike network simulation.
///
/// Damage scales with breach width and failure probability, shrinks with
/// heightening and Room for the River spending; every output is a series
/// over the layout's planning steps.
#[derive(Debug, Clone)]
pub struct StubNetwork {
    layout: NetworkLayout,
}

impl StubNetwork {
    pub fn new(layout: NetworkLayout) -> Self {
        Self { layout }
    }

    fn input(inputs: &BTreeMap<String, f64>, name: &str) -> Result<f64, FunctionError> {
        inputs
            .get(name)
            .copied()
            .ok_or_else(|| FunctionError(format!("missing input '{}'", name)))
    }
}

impl SimulationFunction for StubNetwork {
    fn output_variables(&self) -> Vec<String> {
        self.layout.output_variables()
    }

    fn run(
        &self,
        inputs: &BTreeMap<String, f64>,
    ) -> Result<BTreeMap<String, Sample>, FunctionError> {
        let steps = self.layout.planning_steps();
        let wave = Self::input(inputs, "A.0_ID flood wave shape")?;
        let warning = Self::input(inputs, "EWS_DaysToThreat")?;

        let mut rfr_costs = Vec::with_capacity(steps.len());
        for &step in steps {
            let mut cost = 0.0;
            for project in 0..5 {
                cost += 150.0 * Self::input(inputs, &format!("{}_RfR {}", project, step))?;
            }
            rfr_costs.push(cost);
        }

        let mut out = BTreeMap::new();
        let mut total_deaths_scale = 0.0;

        for ring in self.layout.dikes() {
            let bmax = Self::input(inputs, &format!("{}_Bmax", ring))?;
            let pfail = Self::input(inputs, &format!("{}_pfail", ring))?;

            let mut damage = Vec::with_capacity(steps.len());
            let mut investment = Vec::with_capacity(steps.len());
            let mut deaths = Vec::with_capacity(steps.len());

            for (i, &step) in steps.iter().enumerate() {
                let rate = Self::input(inputs, &format!("discount rate {}", step))?;
                let increase =
                    Self::input(inputs, &format!("{}_DikeIncrease {}", ring, step))?;

                let exposure = bmax * (1.0 - pfail) * (1.0 + wave / 132.0);
                let protection = 1.0 - increase / 20.0 - rfr_costs[i] / 10_000.0;
                let step_damage =
                    (exposure * protection.max(0.0)) / (1.0 + rate / 100.0);

                damage.push(step_damage);
                investment.push(80.0 * increase + 2.0 * increase * increase);
                deaths.push(step_damage * 1e-4 * (1.0 - warning / 8.0));
            }

            total_deaths_scale += deaths.iter().sum::<f64>();
            out.insert(
                NetworkLayout::ring_variable(ring, EXPECTED_ANNUAL_DAMAGE),
                Sample::Series(damage),
            );
            out.insert(
                NetworkLayout::ring_variable(ring, DIKE_INVESTMENT_COSTS),
                Sample::Series(investment),
            );
            out.insert(
                NetworkLayout::ring_variable(ring, EXPECTED_NUMBER_OF_DEATHS),
                Sample::Series(deaths),
            );
        }

        out.insert(RFR_TOTAL_COSTS.to_string(), Sample::Series(rfr_costs));

        let evacuation = steps
            .iter()
            .map(|_| total_deaths_scale * warning * 12.5 / steps.len() as f64)
            .collect();
        out.insert(
            EXPECTED_EVACUATION_COSTS.to_string(),
            Sample::Series(evacuation),
        );

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_produces_every_declared_variable() {
        let layout = NetworkLayout::standard();
        let stub = StubNetwork::new(layout.clone());

        let mut inputs = BTreeMap::new();
        inputs.insert("A.0_ID flood wave shape".to_string(), 4.0);
        inputs.insert("EWS_DaysToThreat".to_string(), 0.0);
        for &step in layout.planning_steps() {
            inputs.insert(format!("discount rate {}", step), 3.5);
            for project in 0..5 {
                inputs.insert(format!("{}_RfR {}", project, step), 0.0);
            }
            for ring in layout.dikes() {
                inputs.insert(format!("{}_DikeIncrease {}", ring, step), 0.0);
            }
        }
        for ring in layout.dikes() {
            inputs.insert(format!("{}_Bmax", ring), 175.0);
            inputs.insert(format!("{}_pfail", ring), 0.5);
            inputs.insert(format!("{}_Brate", ring), 1.5);
        }

        let out = stub.run(&inputs).unwrap();
        for variable in stub.output_variables() {
            let sample = out.get(&variable).expect("missing declared variable");
            match sample {
                Sample::Series(vs) => assert_eq!(vs.len(), layout.planning_steps().len()),
                Sample::Scalar(_) => panic!("stub outputs are series"),
            }
        }
    }

    #[test]
    fn test_missing_input_propagates_as_function_error() {
        let layout = NetworkLayout::standard();
        let stub = StubNetwork::new(layout);
        let err = stub.run(&BTreeMap::new()).unwrap_err();
        assert!(err.0.contains("missing input"));
    }
}
