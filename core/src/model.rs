//! Model wrapper
//!
//! A [`Model`] couples an externally supplied simulation function with the
//! declarative parameter space (uncertainties, levers) and the outcome
//! specifications that fold its raw outputs into objectives.
//!
//! # Critical Invariants
//!
//! 1. Parameter names are unique across uncertainties and levers.
//! 2. Every outcome's source-variable list is a subset of the variables the
//!    simulation function declares for the current entity set. Violations
//!    are rejected when the outcomes are attached, never discovered at run
//!    time.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::outcomes::{OutcomeSpec, Sample};
use crate::params::Parameter;

/// Failure inside the delegated simulation function.
///
/// The evaluator propagates these unchanged; there is no local recovery.
#[derive(Debug, Error, PartialEq)]
#[error("{0}")]
pub struct FunctionError(pub String);

/// The externally provided simulation.
///
/// Implementations map one fully-specified input assignment (all
/// uncertainty and lever values, keyed by rendered parameter name) to the
/// raw per-location outputs. `output_variables` declares every variable the
/// function will produce, so outcome wiring can be checked up front.
pub trait SimulationFunction {
    /// Every output variable the function produces for its entity set.
    fn output_variables(&self) -> Vec<String>;

    /// Run the simulation for one input assignment.
    fn run(&self, inputs: &BTreeMap<String, f64>) -> Result<BTreeMap<String, Sample>, FunctionError>;
}

/// Errors raised while wiring a model.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("duplicate parameter name '{0}'")]
    DuplicateParameter(String),

    #[error("outcome '{outcome}' aggregates '{variable}', which the simulation does not produce")]
    UnknownVariable { outcome: String, variable: String },
}

/// A configured model: simulation function + parameter space + outcomes.
pub struct Model {
    name: String,
    function: Box<dyn SimulationFunction>,
    uncertainties: Vec<Parameter>,
    levers: Vec<Parameter>,
    outcomes: Vec<OutcomeSpec>,
}

impl Model {
    /// Wrap a simulation function with an empty specification.
    pub fn new(name: impl Into<String>, function: Box<dyn SimulationFunction>) -> Self {
        Self {
            name: name.into(),
            function,
            uncertainties: Vec::new(),
            levers: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Attach the uncertainty space.
    ///
    /// Names must be unique across uncertainties and levers.
    pub fn set_uncertainties(&mut self, uncertainties: Vec<Parameter>) -> Result<(), ModelError> {
        Self::check_unique(uncertainties.iter().chain(self.levers.iter()))?;
        self.uncertainties = uncertainties;
        Ok(())
    }

    /// Attach the lever space.
    pub fn set_levers(&mut self, levers: Vec<Parameter>) -> Result<(), ModelError> {
        Self::check_unique(self.uncertainties.iter().chain(levers.iter()))?;
        self.levers = levers;
        Ok(())
    }

    /// Attach the outcome specifications.
    ///
    /// Every source variable must be declared by the simulation function;
    /// a bad wiring fails here and leaves the previous outcomes in place.
    pub fn set_outcomes(&mut self, outcomes: Vec<OutcomeSpec>) -> Result<(), ModelError> {
        let produced: BTreeSet<String> = self.function.output_variables().into_iter().collect();
        for outcome in &outcomes {
            for variable in outcome.variables() {
                if !produced.contains(variable) {
                    return Err(ModelError::UnknownVariable {
                        outcome: outcome.name().to_string(),
                        variable: variable.clone(),
                    });
                }
            }
        }
        self.outcomes = outcomes;
        Ok(())
    }

    fn check_unique<'a>(params: impl Iterator<Item = &'a Parameter>) -> Result<(), ModelError> {
        let mut seen = BTreeSet::new();
        for param in params {
            if !seen.insert(param.name()) {
                return Err(ModelError::DuplicateParameter(param.name()));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self) -> &dyn SimulationFunction {
        self.function.as_ref()
    }

    pub fn uncertainties(&self) -> &[Parameter] {
        &self.uncertainties
    }

    pub fn levers(&self) -> &[Parameter] {
        &self.levers
    }

    pub fn outcomes(&self) -> &[OutcomeSpec] {
        &self.outcomes
    }

    /// All parameter names in declaration order: uncertainties, then levers.
    pub fn parameter_names(&self) -> Vec<String> {
        self.uncertainties
            .iter()
            .chain(self.levers.iter())
            .map(Parameter::name)
            .collect()
    }

    /// All outcome names in declaration order.
    pub fn outcome_names(&self) -> Vec<String> {
        self.outcomes.iter().map(|o| o.name().to_string()).collect()
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("uncertainties", &self.uncertainties.len())
            .field("levers", &self.levers.len())
            .field("outcomes", &self.outcomes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamKey;

    struct TwoVariableFunction;

    impl SimulationFunction for TwoVariableFunction {
        fn output_variables(&self) -> Vec<String> {
            vec!["damage".to_string(), "costs".to_string()]
        }

        fn run(
            &self,
            _inputs: &BTreeMap<String, f64>,
        ) -> Result<BTreeMap<String, Sample>, FunctionError> {
            let mut out = BTreeMap::new();
            out.insert("damage".to_string(), Sample::Scalar(1.0));
            out.insert("costs".to_string(), Sample::Scalar(2.0));
            Ok(out)
        }
    }

    #[test]
    fn test_unknown_outcome_variable_rejected() {
        let mut model = Model::new("net", Box::new(TwoVariableFunction));
        let err = model
            .set_outcomes(vec![OutcomeSpec::scalar(
                "All Costs",
                vec!["damage".into(), "casualties".into()],
            )])
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownVariable {
                outcome: "All Costs".to_string(),
                variable: "casualties".to_string(),
            }
        );
        assert!(model.outcomes().is_empty(), "no partial outcome state");
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let mut model = Model::new("net", Box::new(TwoVariableFunction));
        let p = Parameter::real(ParamKey::of("A.1", "Bmax"), 30.0, 350.0).unwrap();
        let err = model.set_uncertainties(vec![p.clone(), p]).unwrap_err();
        assert_eq!(err, ModelError::DuplicateParameter("A.1_Bmax".to_string()));
    }

    #[test]
    fn test_duplicate_across_lever_and_uncertainty_rejected() {
        let mut model = Model::new("net", Box::new(TwoVariableFunction));
        let p = Parameter::integer(ParamKey::of("EWS", "DaysToThreat"), 0, 4).unwrap();
        model.set_uncertainties(vec![p.clone()]).unwrap();
        assert!(model.set_levers(vec![p]).is_err());
    }

    #[test]
    fn test_parameter_names_in_declaration_order() {
        let mut model = Model::new("net", Box::new(TwoVariableFunction));
        model
            .set_uncertainties(vec![
                Parameter::real(ParamKey::of("A.1", "Bmax"), 30.0, 350.0).unwrap(),
            ])
            .unwrap();
        model
            .set_levers(vec![
                Parameter::integer(ParamKey::of("EWS", "DaysToThreat"), 0, 4).unwrap(),
            ])
            .unwrap();
        assert_eq!(model.parameter_names(), ["A.1_Bmax", "EWS_DaysToThreat"]);
    }
}
