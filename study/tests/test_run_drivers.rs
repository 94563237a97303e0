//! End-to-end tests for the four batch drivers, using the deterministic
//! simulation stand-in, the baseline random search, and placeholder
//! indicators. The real flood model, solver and indicator computations
//! are external; these tests pin down orchestration order, file naming
//! and table schemas.

use std::collections::BTreeMap;
use std::path::Path;

use dikesnet_core::tables::read_records;
use dikesnet_core::{
    Indicator, IndicatorError, IndicatorSuite, Model, RandomSearch, SolutionSet,
};
use dikesnet_study::baseline::reference_values;
use dikesnet_study::formulations::{build_model, ProblemFormulation};
use dikesnet_study::network::NetworkLayout;
use dikesnet_study::runs::{cross_evaluation, directed_search, robustness, scenario_discovery};
use dikesnet_study::testing::StubNetwork;

fn standard_model(formulation: ProblemFormulation) -> (Model, NetworkLayout) {
    let layout = NetworkLayout::standard();
    let model = build_model(StubNetwork::new(layout.clone()), &layout, formulation).unwrap();
    (model, layout)
}

fn write_csv(path: &Path, header: &[String], rows: &[Vec<String>]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(header).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
}

/// Fully qualified scenario rows: the reference values with a per-row
/// tweak so the scenarios differ.
fn scenario_rows(model: &Model, layout: &NetworkLayout, count: usize) -> (Vec<String>, Vec<Vec<String>>) {
    let reference = reference_values(layout.planning_steps());
    let header: Vec<String> = model.uncertainties().iter().map(|p| p.name()).collect();

    let mut rows = Vec::with_capacity(count);
    for i in 0..count {
        let mut values = BTreeMap::new();
        for param in model.uncertainties() {
            let value = if param.key().entity().is_none() {
                reference[&param.name()]
            } else {
                reference[&param.key().unqualified()]
            };
            values.insert(param.name(), value);
        }
        values.insert("A.1_pfail".to_string(), 0.1 * (i as f64 + 1.0));
        rows.push(header.iter().map(|h| values[h].to_string()).collect());
    }
    (header, rows)
}

/// All-zero policy rows with explicit names.
fn policy_rows(model: &Model, names: &[&str]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut header: Vec<String> = model.levers().iter().map(|p| p.name()).collect();
    header.push("policy_name".to_string());

    let rows = names
        .iter()
        .map(|name| {
            let mut row: Vec<String> = model.levers().iter().map(|_| "0".to_string()).collect();
            row.push(name.to_string());
            row
        })
        .collect();
    (header, rows)
}

#[test]
fn test_scenario_discovery_writes_one_combined_table() {
    let layout = NetworkLayout::standard();
    let tmp = tempfile::tempdir().unwrap();

    let mut config = scenario_discovery::ScenarioDiscoveryConfig::new(tmp.path());
    config.n_scenarios = 25;
    config.seed = 3;

    let written =
        scenario_discovery::run(StubNetwork::new(layout.clone()), &layout, &config).unwrap();
    assert_eq!(written.len(), 1, "open exploration outcomes are all scalar");

    let records = read_records(&written[0]).unwrap();
    assert_eq!(records.len(), 25);

    let first = &records[0];
    assert_eq!(first["policy"], "policy 0");
    assert!(first.contains_key("Expected Annual Damage"));
    assert!(first.contains_key("RfR Investment Costs"));
    assert!(first.contains_key("A.5_Brate"));
    assert!(!first.contains_key("Expected Evacuation Costs"));
}

#[test]
fn test_robustness_writes_one_table_per_policy() {
    let (model, layout) = standard_model(ProblemFormulation::OpenExploration);
    let tmp = tempfile::tempdir().unwrap();

    let policies_path = tmp.path().join("5_best_policies.csv");
    let (header, rows) = policy_rows(&model, &["alpha", "beta"]);
    write_csv(&policies_path, &header, &rows);

    let mut config = robustness::RobustnessConfig::new(&policies_path, tmp.path().join("out"));
    config.n_scenarios = 8;
    config.seed = 1;

    let written = robustness::run(StubNetwork::new(layout.clone()), &layout, &config).unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(written[0].0, "alpha");
    assert!(written[0].1[0].ends_with("results_policy_alpha.csv"));

    for (name, files) in &written {
        let records = read_records(&files[0]).unwrap();
        assert_eq!(records.len(), 8, "policy {}", name);
        assert!(records.iter().all(|r| &r["policy"] == name));
    }
}

#[test]
fn test_cross_evaluation_concatenates_policy_blocks() {
    let (model, layout) = standard_model(ProblemFormulation::DirectedSearch);
    let tmp = tempfile::tempdir().unwrap();

    let scenarios_path = tmp.path().join("final_scenarios.csv");
    let (header, rows) = scenario_rows(&model, &layout, 3);
    write_csv(&scenarios_path, &header, &rows);

    let policies_path = tmp.path().join("policies.csv");
    let (header, rows) = policy_rows(&model, &["p1", "p2"]);
    write_csv(&policies_path, &header, &rows);

    let config = cross_evaluation::CrossEvaluationConfig {
        policies: policies_path,
        scenarios: scenarios_path,
        out_file: tmp.path().join("out").join("combined_results.csv"),
    };

    let combined =
        cross_evaluation::run(StubNetwork::new(layout.clone()), &layout, &config).unwrap();
    assert_eq!(combined.len(), 6);

    let records = read_records(&config.out_file).unwrap();
    assert_eq!(records.len(), 6);
    // Policy blocks in order: p1 over all scenarios, then p2.
    assert!(records[..3].iter().all(|r| r["policy"] == "p1"));
    assert!(records[3..].iter().all(|r| r["policy"] == "p2"));
    assert!(records[0].contains_key("Expected Annual Damage"));
    assert!(records[0].contains_key("Dike Investment Costs"));
    assert!(records[0].contains_key("RfR Investment Costs"));
}

// ============================================================================
// Directed search
// ============================================================================

/// Placeholder indicators with the study's metric names. The real
/// computations live in the external metrics toolkit; these only give the
/// campaign something to score archives with.
struct PlaceholderIndicator {
    name: &'static str,
    reference_size: usize,
}

impl Indicator for PlaceholderIndicator {
    fn name(&self) -> &str {
        self.name
    }

    fn measure(&self, archive: &SolutionSet) -> Result<f64, IndicatorError> {
        if self.reference_size == 0 {
            return Err(IndicatorError("empty reference set".to_string()));
        }
        Ok(archive.len() as f64 / self.reference_size as f64)
    }
}

struct PlaceholderSuite;

impl IndicatorSuite for PlaceholderSuite {
    fn build(&self, reference: &SolutionSet) -> Vec<Box<dyn Indicator>> {
        [
            "generational_distance",
            "hypervolume",
            "epsilon_indicator",
            "inverted_gd",
            "spacing",
        ]
        .into_iter()
        .map(|name| {
            Box::new(PlaceholderIndicator {
                name,
                reference_size: reference.len(),
            }) as Box<dyn Indicator>
        })
        .collect()
    }
}

#[test]
fn test_directed_search_campaign_layout() {
    let (model, layout) = standard_model(ProblemFormulation::DirectedSearch);
    let tmp = tempfile::tempdir().unwrap();

    let scenarios_path = tmp.path().join("final_scenarios.csv");
    let (header, rows) = scenario_rows(&model, &layout, 2);
    write_csv(&scenarios_path, &header, &rows);

    let out_dir = tmp.path().join("search");
    let mut config = directed_search::DirectedSearchConfig::new(&scenarios_path, &out_dir);
    config.seeds = vec![0, 1];
    config.nfe = 40;
    config.snapshot_every = 10;

    let mut optimizer = RandomSearch::new();
    let report = directed_search::run(
        StubNetwork::new(layout.clone()),
        &layout,
        &mut optimizer,
        &PlaceholderSuite,
        &config,
    )
    .unwrap();

    // One result + one convergence table per (seed, scenario).
    assert_eq!(report.result_files.len(), 2 * 2 * 2);
    assert!(out_dir
        .join("optimization_results_seed_1_scenario_0.csv")
        .exists());
    assert!(out_dir
        .join("convergence_data_seed_0_scenario_1.csv")
        .exists());

    assert!(!report.reference_set.is_empty());
    assert_eq!(
        report.reference_set.objective_names,
        [
            "Expected Annual Damage",
            "Dike Investment Costs",
            "RfR Investment Costs"
        ]
    );

    // ε-progress is cumulative and keyed by evaluation count.
    let convergence =
        read_records(&out_dir.join("convergence_data_seed_0_scenario_0.csv")).unwrap();
    let nfes: Vec<usize> = convergence
        .iter()
        .map(|r| r["nfe"].parse().unwrap())
        .collect();
    assert_eq!(nfes, [10, 20, 30, 40]);
    let progress: Vec<usize> = convergence
        .iter()
        .map(|r| r["epsilon_progress"].parse().unwrap())
        .collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    // One metrics table per seed, ascending in nfe, metric columns first.
    assert_eq!(report.metrics_files.len(), 2);
    let metrics = read_records(&report.metrics_files[0]).unwrap();
    assert_eq!(metrics.len(), 4);
    let metric_nfes: Vec<usize> = metrics.iter().map(|r| r["nfe"].parse().unwrap()).collect();
    assert_eq!(metric_nfes, [10, 20, 30, 40]);
    for column in [
        "generational_distance",
        "hypervolume",
        "epsilon_indicator",
        "inverted_gd",
        "spacing",
    ] {
        assert!(metrics[0].contains_key(column), "missing {}", column);
    }
}
