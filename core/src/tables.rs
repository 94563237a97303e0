//! Result tables and tabular file I/O
//!
//! One experiment produces one row: every parameter value, the scenario
//! and policy names, and one column per outcome. Formatting and parsing of
//! the files themselves is delegated to the `csv` crate; this module only
//! fixes the column layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::outcomes::Sample;

/// Errors raised while shaping or persisting tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row shape does not match the table schema")]
    RowShape,

    #[error("schema mismatch when appending experiment tables")]
    SchemaMismatch,

    #[error("outcome '{0}' is series-valued and cannot go into a flat csv")]
    SeriesColumn(String),

    #[error("series outcome '{0}' has ragged lengths across rows")]
    Ragged(String),

    #[error("column '{column}' holds non-numeric value '{value}'")]
    NonNumeric { column: String, value: String },

    #[error("missing column '{0}'")]
    MissingColumn(String),
}

/// One experiment: parameter values plus aggregated outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRow {
    pub scenario: String,
    pub policy: String,
    pub parameters: Vec<f64>,
    pub outcomes: Vec<Sample>,
}

/// Tabular experiment results: one row per (scenario, policy) pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentTable {
    parameter_names: Vec<String>,
    outcome_names: Vec<String>,
    rows: Vec<ExperimentRow>,
}

impl ExperimentTable {
    pub fn new(parameter_names: Vec<String>, outcome_names: Vec<String>) -> Self {
        Self {
            parameter_names,
            outcome_names,
            rows: Vec::new(),
        }
    }

    /// Append one experiment. The row must match the table schema.
    pub fn push(&mut self, row: ExperimentRow) -> Result<(), TableError> {
        if row.parameters.len() != self.parameter_names.len()
            || row.outcomes.len() != self.outcome_names.len()
        {
            return Err(TableError::RowShape);
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append all rows of a schema-identical table.
    pub fn extend(&mut self, other: ExperimentTable) -> Result<(), TableError> {
        if other.parameter_names != self.parameter_names
            || other.outcome_names != self.outcome_names
        {
            return Err(TableError::SchemaMismatch);
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn outcome_names(&self) -> &[String] {
        &self.outcome_names
    }

    pub fn rows(&self) -> &[ExperimentRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as one flat CSV: parameter columns, `scenario`,
    /// `policy`, then one column per outcome.
    ///
    /// Every outcome must be scalar; a series outcome is an error (use
    /// [`save_results`] for tables that carry series outcomes).
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header: Vec<String> = self.parameter_names.clone();
        header.push("scenario".to_string());
        header.push("policy".to_string());
        header.extend(self.outcome_names.iter().cloned());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record: Vec<String> = row.parameters.iter().map(|v| v.to_string()).collect();
            record.push(row.scenario.clone());
            record.push(row.policy.clone());
            for (name, sample) in self.outcome_names.iter().zip(&row.outcomes) {
                match sample {
                    Sample::Scalar(v) => record.push(v.to_string()),
                    Sample::Series(_) => return Err(TableError::SeriesColumn(name.clone())),
                }
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Persist a result table under `dir`.
///
/// `{stem}.csv` holds the parameters, names and scalar outcomes; each
/// series outcome is written to its own `{stem}_{outcome}.csv` with one
/// row per experiment and one column per time step. Returns the paths
/// written, main file first.
pub fn save_results(
    table: &ExperimentTable,
    dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>, TableError> {
    std::fs::create_dir_all(dir)?;

    let scalar_idx: Vec<usize> = (0..table.outcome_names.len())
        .filter(|&i| table.rows.iter().all(|r| matches!(r.outcomes[i], Sample::Scalar(_))))
        .collect();
    let series_idx: Vec<usize> = (0..table.outcome_names.len())
        .filter(|i| !scalar_idx.contains(i))
        .collect();

    let mut written = Vec::new();

    let main_path = dir.join(format!("{}.csv", stem));
    {
        let mut writer = csv::Writer::from_path(&main_path)?;
        let mut header: Vec<String> = table.parameter_names.clone();
        header.push("scenario".to_string());
        header.push("policy".to_string());
        for &i in &scalar_idx {
            header.push(table.outcome_names[i].clone());
        }
        writer.write_record(&header)?;

        for row in &table.rows {
            let mut record: Vec<String> = row.parameters.iter().map(|v| v.to_string()).collect();
            record.push(row.scenario.clone());
            record.push(row.policy.clone());
            for &i in &scalar_idx {
                match &row.outcomes[i] {
                    Sample::Scalar(v) => record.push(v.to_string()),
                    Sample::Series(_) => return Err(TableError::Ragged(table.outcome_names[i].clone())),
                }
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    written.push(main_path);

    for &i in &series_idx {
        let name = &table.outcome_names[i];
        let path = dir.join(format!("{}_{}.csv", stem, sanitize(name)));
        let mut writer = csv::Writer::from_path(&path)?;

        let steps = match table.rows.first().map(|r| &r.outcomes[i]) {
            Some(Sample::Series(vs)) => vs.len(),
            _ => 0,
        };
        let mut header = vec!["scenario".to_string(), "policy".to_string()];
        header.extend((0..steps).map(|s| format!("step_{}", s)));
        writer.write_record(&header)?;

        for row in &table.rows {
            let series = match &row.outcomes[i] {
                Sample::Series(vs) if vs.len() == steps => vs,
                _ => return Err(TableError::Ragged(name.clone())),
            };
            let mut record = vec![row.scenario.clone(), row.policy.clone()];
            record.extend(series.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        written.push(path);
    }

    tracing::info!(files = written.len(), stem, "saved results");
    Ok(written)
}

/// Read a CSV into header-keyed string records.
///
/// Malformed tables propagate the csv error unchanged.
pub fn read_records(path: &Path) -> Result<Vec<BTreeMap<String, String>>, TableError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = BTreeMap::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), field.to_string());
        }
        records.push(row);
    }
    Ok(records)
}

/// Pull a numeric field out of a string record.
pub fn numeric(record: &BTreeMap<String, String>, column: &str) -> Result<f64, TableError> {
    let raw = record
        .get(column)
        .ok_or_else(|| TableError::MissingColumn(column.to_string()))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| TableError::NonNumeric {
            column: column.to_string(),
            value: raw.clone(),
        })
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ExperimentTable {
        let mut t = ExperimentTable::new(
            vec!["A.1_Bmax".to_string()],
            vec!["All Costs".to_string(), "Expected Annual Damage".to_string()],
        );
        t.push(ExperimentRow {
            scenario: "scenario_0".to_string(),
            policy: "policy 0".to_string(),
            parameters: vec![175.0],
            outcomes: vec![Sample::Scalar(12.5), Sample::Series(vec![1.0, 2.0])],
        })
        .unwrap();
        t
    }

    #[test]
    fn test_row_shape_checked() {
        let mut t = ExperimentTable::new(vec!["a".to_string()], vec![]);
        let err = t
            .push(ExperimentRow {
                scenario: "s".to_string(),
                policy: "p".to_string(),
                parameters: vec![],
                outcomes: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, TableError::RowShape));
    }

    #[test]
    fn test_flat_csv_rejects_series() {
        let t = table();
        let dir = tempfile::tempdir().unwrap();
        let err = t.write_csv(&dir.path().join("out.csv")).unwrap_err();
        assert!(matches!(err, TableError::SeriesColumn(name) if name == "Expected Annual Damage"));
    }

    #[test]
    fn test_save_results_splits_series_outcomes() {
        let t = table();
        let dir = tempfile::tempdir().unwrap();
        let written = save_results(&t, dir.path(), "results").unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("results.csv"));
        assert!(written[1].ends_with("results_expected_annual_damage.csv"));

        let records = read_records(&written[0]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["All Costs"], "12.5");
        assert_eq!(records[0]["scenario"], "scenario_0");

        let series = read_records(&written[1]).unwrap();
        assert_eq!(series[0]["step_0"], "1");
        assert_eq!(series[0]["step_1"], "2");
    }

    #[test]
    fn test_extend_requires_matching_schema() {
        let mut a = table();
        let b = ExperimentTable::new(vec!["other".to_string()], vec![]);
        assert!(matches!(a.extend(b), Err(TableError::SchemaMismatch)));
    }

    #[test]
    fn test_numeric_parse_errors_are_descriptive() {
        let mut record = BTreeMap::new();
        record.insert("x".to_string(), "abc".to_string());
        let err = numeric(&record, "x").unwrap_err();
        assert!(matches!(err, TableError::NonNumeric { .. }));
        assert!(matches!(numeric(&record, "y").unwrap_err(), TableError::MissingColumn(_)));
    }
}
