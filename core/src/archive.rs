//! Archive snapshot store
//!
//! During a search the current candidate set is snapshotted at a fixed
//! evaluation cadence; convergence scoring later replays those snapshots.
//! One store holds one seed's snapshots: a `manifest.json` naming the
//! columns and the recorded evaluation counts, plus one compressed CSV
//! per snapshot (`{nfe:08}.csv.zst`). Serialization is delegated to the
//! csv crate, compression to zstd.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimize::{Solution, SolutionSet};

/// zstd compression level for snapshot payloads.
const COMPRESSION_LEVEL: i32 = 3;

const MANIFEST_FILE: &str = "manifest.json";

/// Errors raised by the snapshot store.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("snapshot schema does not match the archive manifest")]
    SchemaMismatch,

    #[error("snapshot for nfe {nfe} holds non-numeric value '{value}'")]
    Corrupt { nfe: usize, value: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    lever_names: Vec<String>,
    objective_names: Vec<String>,
    snapshots: Vec<usize>,
}

/// Writer/reader for one seed's archive snapshots.
#[derive(Debug)]
pub struct ArchiveLogger {
    dir: PathBuf,
    manifest: Manifest,
}

impl ArchiveLogger {
    /// Create a fresh store at `dir`.
    ///
    /// An existing store at the same path is replaced wholesale; a rerun
    /// for the same seed never mixes snapshots from two searches.
    pub fn create(
        dir: &Path,
        lever_names: Vec<String>,
        objective_names: Vec<String>,
    ) -> Result<Self, ArchiveError> {
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::create_dir_all(dir)?;

        let logger = Self {
            dir: dir.to_path_buf(),
            manifest: Manifest {
                lever_names,
                objective_names,
                snapshots: Vec::new(),
            },
        };
        logger.write_manifest()?;
        Ok(logger)
    }

    /// Record one snapshot of the candidate set at `nfe` evaluations.
    pub fn record(&mut self, nfe: usize, set: &SolutionSet) -> Result<(), ArchiveError> {
        if set.lever_names != self.manifest.lever_names
            || set.objective_names != self.manifest.objective_names
        {
            return Err(ArchiveError::SchemaMismatch);
        }

        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            let mut header = set.lever_names.clone();
            header.extend(set.objective_names.iter().cloned());
            writer.write_record(&header)?;
            for solution in &set.solutions {
                let record: Vec<String> = solution
                    .levers
                    .iter()
                    .chain(solution.objectives.iter())
                    .map(|v| v.to_string())
                    .collect();
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }

        let compressed = zstd::encode_all(buf.as_slice(), COMPRESSION_LEVEL)?;
        fs::write(self.snapshot_path(nfe), compressed)?;

        if !self.manifest.snapshots.contains(&nfe) {
            self.manifest.snapshots.push(nfe);
        }
        self.write_manifest()?;

        tracing::debug!(nfe, members = set.len(), "archived snapshot");
        Ok(())
    }

    /// Load every snapshot of a store, keyed and ordered by evaluation
    /// count.
    pub fn load(dir: &Path) -> Result<BTreeMap<usize, SolutionSet>, ArchiveError> {
        let raw = fs::read(dir.join(MANIFEST_FILE))?;
        let manifest: Manifest = serde_json::from_slice(&raw)?;

        let mut expected_header = manifest.lever_names.clone();
        expected_header.extend(manifest.objective_names.iter().cloned());

        let mut snapshots = BTreeMap::new();
        for &nfe in &manifest.snapshots {
            let compressed = fs::read(dir.join(format!("{:08}.csv.zst", nfe)))?;
            let decompressed = zstd::decode_all(compressed.as_slice())?;

            let mut reader = csv::Reader::from_reader(decompressed.as_slice());
            let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
            if header != expected_header {
                return Err(ArchiveError::SchemaMismatch);
            }

            let mut solutions = Vec::new();
            for result in reader.records() {
                let record = result?;
                let values = record
                    .iter()
                    .map(|field| {
                        field.trim().parse::<f64>().map_err(|_| ArchiveError::Corrupt {
                            nfe,
                            value: field.to_string(),
                        })
                    })
                    .collect::<Result<Vec<f64>, _>>()?;
                let (levers, objectives) = values.split_at(manifest.lever_names.len());
                solutions.push(Solution {
                    levers: levers.to_vec(),
                    objectives: objectives.to_vec(),
                });
            }

            snapshots.insert(
                nfe,
                SolutionSet {
                    lever_names: manifest.lever_names.clone(),
                    objective_names: manifest.objective_names.clone(),
                    solutions,
                },
            );
        }
        Ok(snapshots)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, nfe: usize) -> PathBuf {
        self.dir.join(format!("{:08}.csv.zst", nfe))
    }

    fn write_manifest(&self) -> Result<(), ArchiveError> {
        let raw = serde_json::to_vec_pretty(&self.manifest)?;
        fs::write(self.dir.join(MANIFEST_FILE), raw)?;
        Ok(())
    }
}
