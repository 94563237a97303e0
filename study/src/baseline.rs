//! Reference points and input tables
//!
//! Builds the fixed scenario and policy literals the study runs against,
//! and converts flat CSV tables into validated [`Scenario`]/[`Policy`]
//! objects.
//!
//! Reference values are unqualified (`Bmax`, `DikeIncrease 0`) and get
//! broadcast across entities; loaded tables address parameters by their
//! fully qualified column names (`A.1_Bmax`). Input files arrive in both
//! shapes depending on what produced them, so the distinction is kept
//! explicit here instead of being papered over; see the points module
//! in the core crate.

use std::collections::BTreeMap;

use dikesnet_core::tables::{numeric, TableError};
use dikesnet_core::{Model, PointError, Policy, Scenario};
use thiserror::Error;

/// Errors raised while turning literals or tables into points.
#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Point(#[from] PointError),
}

/// The study's reference uncertainty values, unqualified.
///
/// Moderate breach behavior, the median flood wave, and a mid-range
/// discount rate at every planning step.
pub fn reference_values(steps: &[u32]) -> BTreeMap<String, f64> {
    let mut values = BTreeMap::new();
    values.insert("Bmax".to_string(), 175.0);
    values.insert("Brate".to_string(), 1.5);
    values.insert("pfail".to_string(), 0.5);
    values.insert("ID flood wave shape".to_string(), 4.0);
    for &step in steps {
        values.insert(format!("discount rate {}", step), 3.5);
    }
    values
}

/// The reference scenario, broadcast over the model's uncertainties.
pub fn reference_scenario(model: &Model, steps: &[u32]) -> Result<Scenario, PointError> {
    Scenario::broadcast("reference", &reference_values(steps), model.uncertainties())
}

/// The do-nothing policy: no heightening, no Room for the River, no
/// early warning.
pub fn zero_policy(model: &Model, steps: &[u32]) -> Result<Policy, PointError> {
    let mut values = BTreeMap::new();
    values.insert("DaysToThreat".to_string(), 0.0);
    for &step in steps {
        values.insert(format!("DikeIncrease {}", step), 0.0);
        values.insert(format!("RfR {}", step), 0.0);
    }
    Policy::broadcast("policy 0", &values, model.levers())
}

/// Convert loaded table rows into scenarios, named `scenario_1`, ...
///
/// Columns must carry fully qualified parameter names; extra columns
/// (indexes, outcome columns from a previous run) are ignored.
pub fn scenarios_from_records(
    records: &[BTreeMap<String, String>],
    model: &Model,
) -> Result<Vec<Scenario>, InputError> {
    let mut scenarios = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let row = numeric_row(record, model.uncertainties())?;
        scenarios.push(Scenario::from_table_row(
            &format!("scenario_{}", i + 1),
            &row,
            model.uncertainties(),
        )?);
    }
    Ok(scenarios)
}

/// Convert loaded table rows into policies.
///
/// A `policy_name` column names each policy when present; otherwise
/// policies are named `policy_1`, ... in row order.
pub fn policies_from_records(
    records: &[BTreeMap<String, String>],
    model: &Model,
) -> Result<Vec<Policy>, InputError> {
    let mut policies = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let name = match record.get("policy_name") {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("policy_{}", i + 1),
        };
        let row = numeric_row(record, model.levers())?;
        policies.push(Policy::from_table_row(&name, &row, model.levers())?);
    }
    Ok(policies)
}

/// Parse just the columns the parameter list needs.
fn numeric_row(
    record: &BTreeMap<String, String>,
    params: &[dikesnet_core::Parameter],
) -> Result<BTreeMap<String, f64>, TableError> {
    let mut row = BTreeMap::new();
    for param in params {
        let column = param.name();
        row.insert(column.clone(), numeric(record, &column)?);
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulations::{build_model, ProblemFormulation};
    use crate::network::NetworkLayout;
    use crate::testing::StubNetwork;

    fn model() -> (Model, NetworkLayout) {
        let layout = NetworkLayout::standard();
        let model = build_model(
            StubNetwork::new(layout.clone()),
            &layout,
            ProblemFormulation::OpenExploration,
        )
        .unwrap();
        (model, layout)
    }

    #[test]
    fn test_reference_scenario_roundtrip() {
        let (model, layout) = model();
        let reference = reference_values(layout.planning_steps());
        let scenario = reference_scenario(&model, layout.planning_steps()).unwrap();

        for param in model.uncertainties() {
            let expected = if param.key().entity().is_none() {
                reference[&param.name()]
            } else {
                reference[&param.key().unqualified()]
            };
            assert_eq!(
                scenario.get(&param.name()),
                Some(expected),
                "parameter {}",
                param.name()
            );
        }
    }

    #[test]
    fn test_zero_policy_is_all_zeros() {
        let (model, layout) = model();
        let policy = zero_policy(&model, layout.planning_steps()).unwrap();
        assert_eq!(policy.name(), "policy 0");
        for param in model.levers() {
            assert_eq!(policy.get(&param.name()), Some(0.0), "{}", param.name());
        }
    }

    #[test]
    fn test_policies_from_records_names() {
        let (model, _) = model();

        let mut record = BTreeMap::new();
        for param in model.levers() {
            record.insert(param.name(), "0".to_string());
        }
        let mut named = record.clone();
        named.insert("policy_name".to_string(), "best policy".to_string());

        let policies = policies_from_records(&[named, record], &model).unwrap();
        assert_eq!(policies[0].name(), "best policy");
        assert_eq!(policies[1].name(), "policy_2");
    }

    #[test]
    fn test_scenarios_from_records_ignore_extra_columns() {
        let (model, _) = model();

        let mut record = BTreeMap::new();
        for param in model.uncertainties() {
            record.insert(param.name(), "0.5".to_string());
        }
        // Make the discrete/categorical columns valid.
        record.insert("A.0_ID flood wave shape".to_string(), "4".to_string());
        for step in 0..3 {
            record.insert(format!("discount rate {}", step), "3.5".to_string());
        }
        for ring in ["A.1", "A.2", "A.3", "A.4", "A.5"] {
            record.insert(format!("{}_Brate", ring), "1.5".to_string());
            record.insert(format!("{}_Bmax", ring), "175".to_string());
        }
        record.insert("Expected Annual Damage".to_string(), "123.4".to_string());

        let scenarios = scenarios_from_records(&[record], &model).unwrap();
        assert_eq!(scenarios[0].name(), "scenario_1");
        assert_eq!(scenarios[0].get("A.1_pfail"), Some(0.5));
        assert_eq!(scenarios[0].get("Expected Annual Damage"), None);
    }
}
