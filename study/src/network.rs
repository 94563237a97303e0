//! Dike network layout
//!
//! The flood simulation itself is supplied externally; what the study
//! needs from it up front is its shape: which dike rings exist and which
//! planning steps the levers play out over. [`NetworkLayout`] carries
//! that shape and enumerates the output variables the simulation must
//! produce for it.

use thiserror::Error;

/// Per-ring output: expected annual damage, discounted.
pub const EXPECTED_ANNUAL_DAMAGE: &str = "Expected Annual Damage";

/// Per-ring output: cost of the ring's dike heightening program.
pub const DIKE_INVESTMENT_COSTS: &str = "Dike Investment Costs";

/// Per-ring output: expected number of deaths.
pub const EXPECTED_NUMBER_OF_DEATHS: &str = "Expected Number of Deaths";

/// Network-wide output: total cost of Room for the River projects.
pub const RFR_TOTAL_COSTS: &str = "RfR Total Costs";

/// Network-wide output: expected evacuation costs.
pub const EXPECTED_EVACUATION_COSTS: &str = "Expected Evacuation Costs";

/// The three per-ring output attributes, in reporting order.
pub const RING_OUTPUTS: [&str; 3] = [
    EXPECTED_ANNUAL_DAMAGE,
    DIKE_INVESTMENT_COSTS,
    EXPECTED_NUMBER_OF_DEATHS,
];

/// Errors raised while describing a network.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("a network needs at least one dike ring")]
    NoDikes,

    #[error("a network needs at least one planning step")]
    NoPlanningSteps,
}

/// Shape of the flood network: dike rings and planning steps.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkLayout {
    dikes: Vec<String>,
    planning_steps: Vec<u32>,
}

impl NetworkLayout {
    /// The study's standard network: rings A.1–A.5, three planning steps.
    pub fn standard() -> Self {
        Self {
            dikes: (1..=5).map(|i| format!("A.{}", i)).collect(),
            planning_steps: vec![0, 1, 2],
        }
    }

    /// A custom layout (e.g. a subset of rings for a focused analysis).
    pub fn new(dikes: Vec<String>, planning_steps: Vec<u32>) -> Result<Self, LayoutError> {
        if dikes.is_empty() {
            return Err(LayoutError::NoDikes);
        }
        if planning_steps.is_empty() {
            return Err(LayoutError::NoPlanningSteps);
        }
        Ok(Self {
            dikes,
            planning_steps,
        })
    }

    pub fn dikes(&self) -> &[String] {
        &self.dikes
    }

    pub fn planning_steps(&self) -> &[u32] {
        &self.planning_steps
    }

    /// Rendered name of one ring's output variable, e.g.
    /// `A.1_Expected Annual Damage`.
    pub fn ring_variable(ring: &str, output: &str) -> String {
        format!("{}_{}", ring, output)
    }

    /// Every output variable the simulation must produce for this layout:
    /// three per ring plus the two network-wide cost variables.
    pub fn output_variables(&self) -> Vec<String> {
        let mut variables: Vec<String> = self
            .dikes
            .iter()
            .flat_map(|ring| {
                RING_OUTPUTS
                    .iter()
                    .map(move |output| Self::ring_variable(ring, output))
            })
            .collect();
        variables.push(RFR_TOTAL_COSTS.to_string());
        variables.push(EXPECTED_EVACUATION_COSTS.to_string());
        variables
    }
}
