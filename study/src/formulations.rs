//! Problem formulation catalog
//!
//! A problem formulation fixes which objectives the analysis sees: the
//! same network, the same uncertainty and lever space, but a different
//! aggregation of the raw per-ring outputs. Id 6 was never assigned and
//! stays a hole in the catalog.
//!
//! | id | objectives | granularity |
//! |----|-----------|-------------|
//! | 0  | 2 | all costs summed, casualties summed |
//! | 1  | 3 | damages / investment costs / casualties |
//! | 2  | 5 | damages / dike costs / RfR / evacuation / casualties |
//! | 3  | 2 per ring + 2 | disaggregated over dike rings |
//! | 4  | 5 | disaggregated over time (series outcomes) |
//! | 5  | 3 per ring + 2 | fully disaggregated (series outcomes) |
//! | 7  | 4 | open exploration, rings A.1–A.5, no evacuation |
//! | 8  | 3 | directed search, rings A.3–A.4 only |
//!
//! Formulations 4 and 5 produce series-valued outcomes and therefore
//! cannot feed the optimization path; `OptimizationProblem::new` rejects
//! them at the boundary.

use dikesnet_core::params::{ParamKey, Parameter, ParameterError};
use dikesnet_core::{Model, ModelError, OutcomeSpec, SimulationFunction};
use thiserror::Error;

use crate::network::{
    NetworkLayout, DIKE_INVESTMENT_COSTS, EXPECTED_ANNUAL_DAMAGE, EXPECTED_EVACUATION_COSTS,
    EXPECTED_NUMBER_OF_DEATHS, RFR_TOTAL_COSTS, RING_OUTPUTS,
};

/// Discount rate categories, percent per planning step.
const DISCOUNT_RATES: [f64; 4] = [1.5, 2.5, 3.5, 4.5];

/// Breach growth rate categories, m/day.
const BREACH_GROWTH_RATES: [f64; 3] = [1.0, 1.5, 10.0];

/// Maximum breach width bounds, m.
const BMAX_BOUNDS: (f64, f64) = (30.0, 350.0);

/// Number of Room for the River project locations.
const RFR_PROJECTS: usize = 5;

/// Rings the open-exploration formulation reports on.
const OPEN_EXPLORATION_RINGS: [&str; 5] = ["A.1", "A.2", "A.3", "A.4", "A.5"];

/// Rings the directed-search formulation reports on (the water board's
/// own responsibility).
const DIRECTED_SEARCH_RINGS: [&str; 2] = ["A.3", "A.4"];

/// Errors raised while building a formulation's model.
#[derive(Debug, Error, PartialEq)]
pub enum FormulationError {
    /// Unknown formulation identifier; nothing is built.
    #[error("unsupported problem formulation id: {0}")]
    Unsupported(u8),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// The supported problem formulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemFormulation {
    /// 0: total costs and casualties, both network-wide.
    TotalCostAndCasualties,
    /// 1: expected damages, investment costs, casualties.
    DamageCostsAndCasualties,
    /// 2: damages, dike costs, RfR costs, evacuation costs, casualties.
    DisaggregatedCostTypes,
    /// 3: costs and casualties per dike ring.
    PerDikeRing,
    /// 4: disaggregated over time (series outcomes).
    OverTime,
    /// 5: fully disaggregated over rings and time (series outcomes).
    FullyDisaggregated,
    /// 7: open exploration over rings A.1–A.5, evacuation excluded.
    OpenExploration,
    /// 8: directed search over rings A.3–A.4.
    DirectedSearch,
}

impl ProblemFormulation {
    /// Resolve a numeric identifier.
    ///
    /// Unknown ids, including the unassigned 6, fail with a descriptive
    /// error and build nothing.
    pub fn from_id(id: u8) -> Result<Self, FormulationError> {
        match id {
            0 => Ok(Self::TotalCostAndCasualties),
            1 => Ok(Self::DamageCostsAndCasualties),
            2 => Ok(Self::DisaggregatedCostTypes),
            3 => Ok(Self::PerDikeRing),
            4 => Ok(Self::OverTime),
            5 => Ok(Self::FullyDisaggregated),
            7 => Ok(Self::OpenExploration),
            8 => Ok(Self::DirectedSearch),
            other => Err(FormulationError::Unsupported(other)),
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Self::TotalCostAndCasualties => 0,
            Self::DamageCostsAndCasualties => 1,
            Self::DisaggregatedCostTypes => 2,
            Self::PerDikeRing => 3,
            Self::OverTime => 4,
            Self::FullyDisaggregated => 5,
            Self::OpenExploration => 7,
            Self::DirectedSearch => 8,
        }
    }

    /// Whether this formulation produces series-valued outcomes, which
    /// the optimization path rejects.
    pub fn uses_series_outcomes(&self) -> bool {
        matches!(self, Self::OverTime | Self::FullyDisaggregated)
    }

    /// Every supported formulation, in id order.
    pub fn all() -> [Self; 8] {
        [
            Self::TotalCostAndCasualties,
            Self::DamageCostsAndCasualties,
            Self::DisaggregatedCostTypes,
            Self::PerDikeRing,
            Self::OverTime,
            Self::FullyDisaggregated,
            Self::OpenExploration,
            Self::DirectedSearch,
        ]
    }
}

/// Build the configured model for one problem formulation.
///
/// The parameter space is identical across formulations; only the outcome
/// aggregation differs.
pub fn build_model<F>(
    function: F,
    layout: &NetworkLayout,
    formulation: ProblemFormulation,
) -> Result<Model, FormulationError>
where
    F: SimulationFunction + 'static,
{
    let mut model = Model::new("dikesnet", Box::new(function));
    model.set_uncertainties(uncertainties(layout)?)?;
    model.set_levers(levers(layout)?)?;
    model.set_outcomes(outcomes(layout, formulation))?;
    Ok(model)
}

/// The uncertainty space: discount rates per step, the flood wave shape
/// at the upstream node, and breach behavior per ring.
fn uncertainties(layout: &NetworkLayout) -> Result<Vec<Parameter>, ParameterError> {
    let mut params = Vec::new();

    for &step in layout.planning_steps() {
        params.push(Parameter::categorical(
            ParamKey::global("discount rate").at_step(step),
            DISCOUNT_RATES.to_vec(),
        )?);
    }

    params.push(Parameter::integer(
        ParamKey::of("A.0", "ID flood wave shape"),
        0,
        132,
    )?);

    for ring in layout.dikes() {
        params.push(Parameter::real(
            ParamKey::of(ring.clone(), "Bmax"),
            BMAX_BOUNDS.0,
            BMAX_BOUNDS.1,
        )?);
        params.push(Parameter::real(ParamKey::of(ring.clone(), "pfail"), 0.0, 1.0)?);
        params.push(Parameter::categorical(
            ParamKey::of(ring.clone(), "Brate"),
            BREACH_GROWTH_RATES.to_vec(),
        )?);
    }
    Ok(params)
}

/// The lever space: Room for the River projects and dike heightenings
/// per planning step, plus the early warning lead time.
fn levers(layout: &NetworkLayout) -> Result<Vec<Parameter>, ParameterError> {
    let mut params = Vec::new();

    for project in 0..RFR_PROJECTS {
        for &step in layout.planning_steps() {
            params.push(Parameter::integer(
                ParamKey::of(project.to_string(), "RfR").at_step(step),
                0,
                1,
            )?);
        }
    }

    // Days of early warning ahead of the flood.
    params.push(Parameter::integer(ParamKey::of("EWS", "DaysToThreat"), 0, 4)?);

    for ring in layout.dikes() {
        for &step in layout.planning_steps() {
            params.push(Parameter::integer(
                ParamKey::of(ring.clone(), "DikeIncrease").at_step(step),
                0,
                10,
            )?);
        }
    }
    Ok(params)
}

fn ring_vars<'a>(rings: impl Iterator<Item = &'a String>, output: &str) -> Vec<String> {
    rings
        .map(|ring| NetworkLayout::ring_variable(ring, output))
        .collect()
}

fn outcomes(layout: &NetworkLayout, formulation: ProblemFormulation) -> Vec<OutcomeSpec> {
    let dikes = layout.dikes();

    match formulation {
        ProblemFormulation::TotalCostAndCasualties => {
            let mut cost_variables = ring_vars(dikes.iter(), EXPECTED_ANNUAL_DAMAGE);
            cost_variables.extend(ring_vars(dikes.iter(), DIKE_INVESTMENT_COSTS));
            cost_variables.push(RFR_TOTAL_COSTS.to_string());
            cost_variables.push(EXPECTED_EVACUATION_COSTS.to_string());

            vec![
                OutcomeSpec::scalar("All Costs", cost_variables),
                OutcomeSpec::scalar(
                    EXPECTED_NUMBER_OF_DEATHS,
                    ring_vars(dikes.iter(), EXPECTED_NUMBER_OF_DEATHS),
                ),
            ]
        }

        ProblemFormulation::DamageCostsAndCasualties => {
            let mut cost_variables = ring_vars(dikes.iter(), DIKE_INVESTMENT_COSTS);
            cost_variables.push(RFR_TOTAL_COSTS.to_string());
            cost_variables.push(EXPECTED_EVACUATION_COSTS.to_string());

            vec![
                OutcomeSpec::scalar(
                    EXPECTED_ANNUAL_DAMAGE,
                    ring_vars(dikes.iter(), EXPECTED_ANNUAL_DAMAGE),
                ),
                OutcomeSpec::scalar("Total Investment Costs", cost_variables),
                OutcomeSpec::scalar(
                    EXPECTED_NUMBER_OF_DEATHS,
                    ring_vars(dikes.iter(), EXPECTED_NUMBER_OF_DEATHS),
                ),
            ]
        }

        ProblemFormulation::DisaggregatedCostTypes => vec![
            OutcomeSpec::scalar(
                EXPECTED_ANNUAL_DAMAGE,
                ring_vars(dikes.iter(), EXPECTED_ANNUAL_DAMAGE),
            ),
            OutcomeSpec::scalar(
                DIKE_INVESTMENT_COSTS,
                ring_vars(dikes.iter(), DIKE_INVESTMENT_COSTS),
            ),
            OutcomeSpec::scalar("RfR Investment Costs", vec![RFR_TOTAL_COSTS.to_string()]),
            OutcomeSpec::scalar(
                "Evacuation Costs",
                vec![EXPECTED_EVACUATION_COSTS.to_string()],
            ),
            OutcomeSpec::scalar(
                EXPECTED_NUMBER_OF_DEATHS,
                ring_vars(dikes.iter(), EXPECTED_NUMBER_OF_DEATHS),
            ),
        ],

        ProblemFormulation::PerDikeRing => {
            let mut specs = Vec::new();
            for ring in dikes {
                let deaths = NetworkLayout::ring_variable(ring, EXPECTED_NUMBER_OF_DEATHS);
                specs.push(OutcomeSpec::scalar(
                    format!("{} Total Costs", ring),
                    vec![
                        NetworkLayout::ring_variable(ring, EXPECTED_ANNUAL_DAMAGE),
                        NetworkLayout::ring_variable(ring, DIKE_INVESTMENT_COSTS),
                    ],
                ));
                specs.push(OutcomeSpec::scalar(deaths.clone(), vec![deaths]));
            }
            specs.push(OutcomeSpec::scalar(
                RFR_TOTAL_COSTS,
                vec![RFR_TOTAL_COSTS.to_string()],
            ));
            specs.push(OutcomeSpec::scalar(
                EXPECTED_EVACUATION_COSTS,
                vec![EXPECTED_EVACUATION_COSTS.to_string()],
            ));
            specs
        }

        ProblemFormulation::OverTime => vec![
            OutcomeSpec::series(
                EXPECTED_ANNUAL_DAMAGE,
                ring_vars(dikes.iter(), EXPECTED_ANNUAL_DAMAGE),
            ),
            OutcomeSpec::series(
                DIKE_INVESTMENT_COSTS,
                ring_vars(dikes.iter(), DIKE_INVESTMENT_COSTS),
            ),
            OutcomeSpec::series(
                EXPECTED_NUMBER_OF_DEATHS,
                ring_vars(dikes.iter(), EXPECTED_NUMBER_OF_DEATHS),
            ),
            OutcomeSpec::passthrough(RFR_TOTAL_COSTS),
            OutcomeSpec::passthrough(EXPECTED_EVACUATION_COSTS),
        ],

        ProblemFormulation::FullyDisaggregated => {
            let mut specs = Vec::new();
            for ring in dikes {
                for output in RING_OUTPUTS {
                    specs.push(OutcomeSpec::passthrough(NetworkLayout::ring_variable(
                        ring, output,
                    )));
                }
            }
            specs.push(OutcomeSpec::passthrough(RFR_TOTAL_COSTS));
            specs.push(OutcomeSpec::passthrough(EXPECTED_EVACUATION_COSTS));
            specs
        }

        ProblemFormulation::OpenExploration => {
            let rings = || {
                dikes
                    .iter()
                    .filter(|d| OPEN_EXPLORATION_RINGS.contains(&d.as_str()))
            };
            vec![
                OutcomeSpec::scalar(
                    EXPECTED_ANNUAL_DAMAGE,
                    ring_vars(rings(), EXPECTED_ANNUAL_DAMAGE),
                ),
                OutcomeSpec::scalar(
                    DIKE_INVESTMENT_COSTS,
                    ring_vars(rings(), DIKE_INVESTMENT_COSTS),
                ),
                OutcomeSpec::scalar("RfR Investment Costs", vec![RFR_TOTAL_COSTS.to_string()]),
                OutcomeSpec::scalar(
                    EXPECTED_NUMBER_OF_DEATHS,
                    ring_vars(rings(), EXPECTED_NUMBER_OF_DEATHS),
                ),
            ]
        }

        ProblemFormulation::DirectedSearch => {
            let rings = || {
                dikes
                    .iter()
                    .filter(|d| DIRECTED_SEARCH_RINGS.contains(&d.as_str()))
            };
            vec![
                OutcomeSpec::scalar(
                    EXPECTED_ANNUAL_DAMAGE,
                    ring_vars(rings(), EXPECTED_ANNUAL_DAMAGE),
                ),
                OutcomeSpec::scalar(
                    DIKE_INVESTMENT_COSTS,
                    ring_vars(rings(), DIKE_INVESTMENT_COSTS),
                ),
                OutcomeSpec::scalar("RfR Investment Costs", vec![RFR_TOTAL_COSTS.to_string()]),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubNetwork;

    fn model_for(formulation: ProblemFormulation) -> Model {
        let layout = NetworkLayout::standard();
        build_model(StubNetwork::new(layout.clone()), &layout, formulation).unwrap()
    }

    #[test]
    fn test_parameter_space_on_standard_layout() {
        let model = model_for(ProblemFormulation::TotalCostAndCasualties);
        // 3 discount rates + flood wave shape + 3 per ring.
        assert_eq!(model.uncertainties().len(), 19);
        // 15 RfR + EWS + 15 dike increases.
        assert_eq!(model.levers().len(), 31);
    }

    #[test]
    fn test_outcome_counts_per_formulation() {
        let expected = [
            (ProblemFormulation::TotalCostAndCasualties, 2),
            (ProblemFormulation::DamageCostsAndCasualties, 3),
            (ProblemFormulation::DisaggregatedCostTypes, 5),
            (ProblemFormulation::PerDikeRing, 12),
            (ProblemFormulation::OverTime, 5),
            (ProblemFormulation::FullyDisaggregated, 17),
            (ProblemFormulation::OpenExploration, 4),
            (ProblemFormulation::DirectedSearch, 3),
        ];
        for (formulation, count) in expected {
            let model = model_for(formulation);
            assert_eq!(
                model.outcomes().len(),
                count,
                "formulation {}",
                formulation.id()
            );
        }
    }

    #[test]
    fn test_directed_search_outcome_names() {
        let model = model_for(ProblemFormulation::DirectedSearch);
        assert_eq!(
            model.outcome_names(),
            [
                "Expected Annual Damage",
                "Dike Investment Costs",
                "RfR Investment Costs"
            ]
        );
    }

    #[test]
    fn test_directed_search_covers_only_a3_and_a4() {
        let model = model_for(ProblemFormulation::DirectedSearch);
        let damage = &model.outcomes()[0];
        assert_eq!(
            damage.variables(),
            [
                "A.3_Expected Annual Damage".to_string(),
                "A.4_Expected Annual Damage".to_string()
            ]
        );
    }

    #[test]
    fn test_series_formulations_flagged() {
        for formulation in ProblemFormulation::all() {
            let series = formulation.uses_series_outcomes();
            assert_eq!(
                series,
                matches!(
                    formulation,
                    ProblemFormulation::OverTime | ProblemFormulation::FullyDisaggregated
                )
            );
        }
    }

    #[test]
    fn test_unknown_ids_fail_fast() {
        assert_eq!(
            ProblemFormulation::from_id(6).unwrap_err(),
            FormulationError::Unsupported(6)
        );
        assert_eq!(
            ProblemFormulation::from_id(99).unwrap_err(),
            FormulationError::Unsupported(99)
        );
    }

    #[test]
    fn test_ids_roundtrip() {
        for formulation in ProblemFormulation::all() {
            assert_eq!(
                ProblemFormulation::from_id(formulation.id()).unwrap(),
                formulation
            );
        }
    }
}
