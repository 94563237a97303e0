//! Scenarios and policies
//!
//! A [`Scenario`] assigns a value to every uncertainty; a [`Policy`]
//! assigns a value to every lever. Both are explicit typed records,
//! validated against the declared parameter specs at construction; a
//! value outside its parameter's domain or a missing parameter never
//! produces a half-built point.
//!
//! # Construction shapes
//!
//! Flat literal tables come in two shapes, distinguished by whether a
//! column name carries an entity/step qualifier:
//!
//! - [`Scenario::from_table_row`] expects fully qualified columns
//!   (`A.1_Bmax`, `discount rate 0`), one per parameter. This is the shape
//!   optimization experiment tables use.
//! - [`Scenario::broadcast`] accepts unqualified reference values (`Bmax`,
//!   `DikeIncrease 0`) and broadcasts each across all entities; parameters
//!   without an entity prefix are still looked up by their full name.
//!
//! The two shapes deliberately remain separate constructors: experiment
//! tables exported by the optimization path carry fully qualified
//! columns, while hand-written reference tables carry unqualified ones.
//! Collapsing the two lookups silently would hide which convention a
//! given input file follows instead of surfacing it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::Parameter;

/// Errors raised while building a scenario or policy.
#[derive(Debug, Error, PartialEq)]
pub enum PointError {
    #[error("no value provided for parameter '{0}'")]
    MissingValue(String),

    #[error("value {value} for parameter '{parameter}' is outside its domain")]
    OutOfRange { parameter: String, value: f64 },
}

/// A named, fully specified, validated assignment over one parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Assignment {
    name: String,
    values: BTreeMap<String, f64>,
}

impl Assignment {
    /// Pick each parameter's value out of a fully-qualified row.
    ///
    /// Columns that match no declared parameter are ignored.
    fn from_table_row(
        name: &str,
        row: &BTreeMap<String, f64>,
        params: &[Parameter],
    ) -> Result<Self, PointError> {
        let mut values = BTreeMap::new();
        for param in params {
            let column = param.name();
            let value = *row
                .get(&column)
                .ok_or_else(|| PointError::MissingValue(column.clone()))?;
            check_domain(param, value)?;
            values.insert(column, value);
        }
        Ok(Self {
            name: name.to_string(),
            values,
        })
    }

    /// Broadcast unqualified reference values across entities.
    fn broadcast(
        name: &str,
        reference: &BTreeMap<String, f64>,
        params: &[Parameter],
    ) -> Result<Self, PointError> {
        let mut values = BTreeMap::new();
        for param in params {
            let lookup = if param.key().entity().is_none() {
                param.name()
            } else {
                param.key().unqualified()
            };
            let value = *reference
                .get(&lookup)
                .ok_or(PointError::MissingValue(lookup))?;
            check_domain(param, value)?;
            values.insert(param.name(), value);
        }
        Ok(Self {
            name: name.to_string(),
            values,
        })
    }
}

fn check_domain(param: &Parameter, value: f64) -> Result<(), PointError> {
    if param.contains(value) {
        Ok(())
    } else {
        Err(PointError::OutOfRange {
            parameter: param.name(),
            value,
        })
    }
}

macro_rules! point_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name(Assignment);

        impl $name {
            /// Build from a fully-qualified table row, validating against
            /// the declared parameters. Extra columns are ignored.
            pub fn from_table_row(
                name: &str,
                row: &BTreeMap<String, f64>,
                params: &[Parameter],
            ) -> Result<Self, PointError> {
                Assignment::from_table_row(name, row, params).map(Self)
            }

            /// Build by broadcasting unqualified reference values across
            /// entities (see the module docs for the lookup rule).
            pub fn broadcast(
                name: &str,
                reference: &BTreeMap<String, f64>,
                params: &[Parameter],
            ) -> Result<Self, PointError> {
                Assignment::broadcast(name, reference, params).map(Self)
            }

            pub fn name(&self) -> &str {
                &self.0.name
            }

            /// Read back one parameter's value by its rendered name.
            pub fn get(&self, parameter: &str) -> Option<f64> {
                self.0.values.get(parameter).copied()
            }

            /// All values, keyed by rendered parameter name.
            pub fn values(&self) -> &BTreeMap<String, f64> {
                &self.0.values
            }
        }
    };
}

point_type! {
    /// A named assignment of a value to every uncertainty.
    Scenario
}

point_type! {
    /// A named assignment of a value to every lever.
    Policy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamKey;

    fn uncertainties() -> Vec<Parameter> {
        vec![
            Parameter::real(ParamKey::of("A.1", "Bmax"), 30.0, 350.0).unwrap(),
            Parameter::real(ParamKey::of("A.2", "Bmax"), 30.0, 350.0).unwrap(),
            Parameter::categorical(ParamKey::global("discount rate").at_step(0), vec![1.5, 2.5, 3.5, 4.5])
                .unwrap(),
        ]
    }

    #[test]
    fn test_broadcast_shares_one_reference_value() {
        let mut reference = BTreeMap::new();
        reference.insert("Bmax".to_string(), 175.0);
        reference.insert("discount rate 0".to_string(), 3.5);

        let scenario = Scenario::broadcast("reference", &reference, &uncertainties()).unwrap();
        assert_eq!(scenario.get("A.1_Bmax"), Some(175.0));
        assert_eq!(scenario.get("A.2_Bmax"), Some(175.0));
        assert_eq!(scenario.get("discount rate 0"), Some(3.5));
    }

    #[test]
    fn test_from_table_row_is_fully_qualified() {
        let mut row = BTreeMap::new();
        row.insert("A.1_Bmax".to_string(), 100.0);
        row.insert("A.2_Bmax".to_string(), 200.0);
        row.insert("discount rate 0".to_string(), 1.5);
        row.insert("unrelated column".to_string(), 9.9);

        let scenario = Scenario::from_table_row("scenario_1", &row, &uncertainties()).unwrap();
        assert_eq!(scenario.get("A.1_Bmax"), Some(100.0));
        assert_eq!(scenario.get("A.2_Bmax"), Some(200.0));
        assert_eq!(scenario.get("unrelated column"), None);
    }

    #[test]
    fn test_missing_value_is_an_error() {
        let row = BTreeMap::new();
        let err = Scenario::from_table_row("s", &row, &uncertainties()).unwrap_err();
        assert_eq!(err, PointError::MissingValue("A.1_Bmax".to_string()));
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let mut reference = BTreeMap::new();
        reference.insert("Bmax".to_string(), 9999.0);
        reference.insert("discount rate 0".to_string(), 3.5);

        let err = Scenario::broadcast("reference", &reference, &uncertainties()).unwrap_err();
        assert_eq!(
            err,
            PointError::OutOfRange {
                parameter: "A.1_Bmax".to_string(),
                value: 9999.0
            }
        );
    }

    #[test]
    fn test_policy_broadcast_with_steps() {
        let levers = vec![
            Parameter::integer(ParamKey::of("A.1", "DikeIncrease").at_step(0), 0, 10).unwrap(),
            Parameter::integer(ParamKey::of("0", "RfR").at_step(0), 0, 1).unwrap(),
            Parameter::integer(ParamKey::of("EWS", "DaysToThreat"), 0, 4).unwrap(),
        ];
        let mut zero = BTreeMap::new();
        zero.insert("DikeIncrease 0".to_string(), 0.0);
        zero.insert("RfR 0".to_string(), 0.0);
        zero.insert("DaysToThreat".to_string(), 0.0);

        let policy = Policy::broadcast("policy 0", &zero, &levers).unwrap();
        assert_eq!(policy.get("A.1_DikeIncrease 0"), Some(0.0));
        assert_eq!(policy.get("0_RfR 0"), Some(0.0));
        assert_eq!(policy.get("EWS_DaysToThreat"), Some(0.0));
    }
}
