//! Convergence scoring
//!
//! Replays a seed's archive snapshots through a set of quality
//! indicators and shapes the scores into one table per seed, ordered by
//! evaluation count. The indicator computations themselves (hypervolume,
//! generational distance, ε-indicator, inverted generational distance,
//! spacing) are supplied externally through the [`Indicator`] seam; this
//! module owns invocation ordering and the table shape only.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::optimize::SolutionSet;
use crate::tables::TableError;

/// Failure inside one delegated indicator computation.
#[derive(Debug, Error, PartialEq)]
#[error("{0}")]
pub struct IndicatorError(pub String);

/// Errors raised while scoring archives.
#[derive(Debug, Error)]
pub enum ConvergenceError {
    #[error("indicator '{indicator}' failed: {source}")]
    Indicator {
        indicator: String,
        #[source]
        source: IndicatorError,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// One multi-objective quality indicator, typically built against a
/// best-known reference set.
pub trait Indicator {
    fn name(&self) -> &str;

    /// Score one archived candidate set.
    fn measure(&self, archive: &SolutionSet) -> Result<f64, IndicatorError>;
}

/// Factory for the indicator set used to score a study's archives.
///
/// The reference set handed to `build` is the merged ε-non-dominated
/// front across every optimization run.
pub trait IndicatorSuite {
    fn build(&self, reference: &SolutionSet) -> Vec<Box<dyn Indicator>>;
}

/// Indicator scores for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub nfe: usize,
    pub scores: Vec<f64>,
}

/// Per-seed convergence table: one row per snapshot, ascending nfe.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    indicator_names: Vec<String>,
    rows: Vec<MetricsRow>,
}

impl MetricsTable {
    pub fn indicator_names(&self) -> &[String] {
        &self.indicator_names
    }

    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    /// Write the table: indicator columns, then `nfe`.
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = self.indicator_names.clone();
        header.push("nfe".to_string());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record: Vec<String> = row.scores.iter().map(|v| v.to_string()).collect();
            record.push(row.nfe.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Score every snapshot of one seed's archive with every indicator.
///
/// Rows come out ascending in evaluation count regardless of the order
/// snapshots were recorded in.
pub fn score_archives(
    archives: &BTreeMap<usize, SolutionSet>,
    indicators: &[Box<dyn Indicator>],
) -> Result<MetricsTable, ConvergenceError> {
    let indicator_names: Vec<String> =
        indicators.iter().map(|i| i.name().to_string()).collect();

    let mut rows = Vec::with_capacity(archives.len());
    for (&nfe, archive) in archives {
        let mut scores = Vec::with_capacity(indicators.len());
        for indicator in indicators {
            let score = indicator
                .measure(archive)
                .map_err(|source| ConvergenceError::Indicator {
                    indicator: indicator.name().to_string(),
                    source,
                })?;
            scores.push(score);
        }
        rows.push(MetricsRow { nfe, scores });
    }

    tracing::debug!(snapshots = rows.len(), "scored archives");
    Ok(MetricsTable {
        indicator_names,
        rows,
    })
}
