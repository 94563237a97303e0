//! Direct policy search
//!
//! Searching over levers against a fixed reference scenario. The
//! evolutionary machinery itself is an external collaborator behind the
//! [`Optimizer`] trait; this module owns everything around that seam:
//!
//! - the [`OptimizationProblem`] boundary (scalar-only outcomes enforced
//!   here, not discovered deep inside a solver),
//! - ε-box dominance bookkeeping ([`EpsilonArchive`]) and the merged
//!   reference-set derivation ([`epsilon_nondominated`]),
//! - convergence progress records ([`EpsilonProgress`]),
//! - a deliberately simple [`RandomSearch`] baseline so the orchestration
//!   can be driven end to end without the external solver.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::archive::{ArchiveError, ArchiveLogger};
use crate::evaluator::{run_experiment, EvaluateError};
use crate::model::Model;
use crate::outcomes::Sample;
use crate::params::Parameter;
use crate::points::{PointError, Policy, Scenario};
use crate::rng::RngManager;
use crate::tables::TableError;

/// Errors raised while setting up or driving a search.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("outcome '{0}' is series-valued; optimization requires scalar outcomes")]
    SeriesObjective(String),

    #[error("model declares no levers to search over")]
    NoLevers,

    #[error("model declares no outcomes to optimize")]
    NoObjectives,

    #[error("candidate carries {found} lever values, expected {expected}")]
    LeverArity { expected: usize, found: usize },

    #[error("{provided} epsilon values provided for {objectives} objectives")]
    EpsilonCount { provided: usize, objectives: usize },

    #[error("solution sets with different schemas cannot be merged")]
    SchemaMismatch,

    #[error("cannot merge an empty collection of solution sets")]
    EmptyMerge,

    #[error(transparent)]
    Point(#[from] PointError),

    #[error(transparent)]
    Evaluate(#[from] EvaluateError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// One candidate policy: lever values plus its evaluated objectives.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub levers: Vec<f64>,
    pub objectives: Vec<f64>,
}

/// A set of candidate solutions under a fixed column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionSet {
    pub lever_names: Vec<String>,
    pub objective_names: Vec<String>,
    pub solutions: Vec<Solution>,
}

impl SolutionSet {
    pub fn empty(lever_names: Vec<String>, objective_names: Vec<String>) -> Self {
        Self {
            lever_names,
            objective_names,
            solutions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// Write as CSV: lever columns first, then objective columns.
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = self.lever_names.clone();
        header.extend(self.objective_names.iter().cloned());
        writer.write_record(&header)?;

        for solution in &self.solutions {
            let record: Vec<String> = solution
                .levers
                .iter()
                .chain(solution.objectives.iter())
                .map(|v| v.to_string())
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Strict Pareto dominance under minimization: `a` is no worse everywhere
/// and better somewhere.
pub fn pareto_dominates(a: &[f64], b: &[f64]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let mut better = false;
    for (x, y) in a.iter().zip(b) {
        if x > y {
            return false;
        }
        if x < y {
            better = true;
        }
    }
    better
}

/// Outcome of an [`EpsilonArchive`] insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The candidate opened or conquered an ε-box: the archive improved.
    Improved,
    /// Same ε-box as an existing member, but closer to the box corner.
    Replaced,
    /// Dominated (or beaten inside its box); archive unchanged.
    Rejected,
}

/// ε-box dominance archive (minimization).
///
/// Objective space is gridded into boxes of edge ε per objective. A
/// candidate is kept when its box is not dominated by any member's box;
/// within one box only the solution closest to the box corner survives.
/// Box-level acceptance is what counts as an improvement for convergence
/// tracking.
#[derive(Debug, Clone)]
pub struct EpsilonArchive {
    epsilons: Vec<f64>,
    members: Vec<(Vec<i64>, Solution)>,
}

impl EpsilonArchive {
    pub fn new(epsilons: Vec<f64>) -> Self {
        Self {
            epsilons,
            members: Vec::new(),
        }
    }

    fn boxes(&self, objectives: &[f64]) -> Vec<i64> {
        objectives
            .iter()
            .zip(&self.epsilons)
            .map(|(o, e)| (o / e).floor() as i64)
            .collect()
    }

    /// Try to insert a candidate, reporting what happened.
    pub fn insert(&mut self, candidate: Solution) -> Insertion {
        let cbox = self.boxes(&candidate.objectives);

        if let Some(pos) = self.members.iter().position(|(b, _)| *b == cbox) {
            let corner: Vec<f64> = cbox
                .iter()
                .zip(&self.epsilons)
                .map(|(b, e)| *b as f64 * e)
                .collect();
            let incumbent = &self.members[pos].1;
            if squared_distance(&candidate.objectives, &corner)
                < squared_distance(&incumbent.objectives, &corner)
            {
                self.members[pos] = (cbox, candidate);
                return Insertion::Replaced;
            }
            return Insertion::Rejected;
        }

        if self
            .members
            .iter()
            .any(|(b, _)| box_dominates(b, &cbox))
        {
            return Insertion::Rejected;
        }

        self.members.retain(|(b, _)| !box_dominates(&cbox, b));
        self.members.push((cbox, candidate));
        Insertion::Improved
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current members as a solution set under the given schema.
    pub fn to_solution_set(
        &self,
        lever_names: Vec<String>,
        objective_names: Vec<String>,
    ) -> SolutionSet {
        SolutionSet {
            lever_names,
            objective_names,
            solutions: self.members.iter().map(|(_, s)| s.clone()).collect(),
        }
    }
}

fn box_dominates(a: &[i64], b: &[i64]) -> bool {
    a != b && a.iter().zip(b).all(|(x, y)| x <= y)
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Merge final result sets across runs and keep the ε-non-dominated
/// subset. This is how the best-known reference set is derived before
/// convergence scoring, with a coarser tolerance than the search itself.
pub fn epsilon_nondominated(
    sets: &[SolutionSet],
    epsilons: &[f64],
) -> Result<SolutionSet, OptimizeError> {
    let first = sets.first().ok_or(OptimizeError::EmptyMerge)?;
    if epsilons.len() != first.objective_names.len() {
        return Err(OptimizeError::EpsilonCount {
            provided: epsilons.len(),
            objectives: first.objective_names.len(),
        });
    }
    for set in sets {
        if set.lever_names != first.lever_names || set.objective_names != first.objective_names {
            return Err(OptimizeError::SchemaMismatch);
        }
    }

    let mut archive = EpsilonArchive::new(epsilons.to_vec());
    for set in sets {
        for solution in &set.solutions {
            archive.insert(solution.clone());
        }
    }
    Ok(archive.to_solution_set(first.lever_names.clone(), first.objective_names.clone()))
}

/// ε-progress records: how many archive improvements had happened by each
/// evaluation count.
#[derive(Debug, Clone, Default)]
pub struct EpsilonProgress {
    records: Vec<(usize, usize)>,
}

impl EpsilonProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, nfe: usize, improvements: usize) {
        self.records.push((nfe, improvements));
    }

    pub fn records(&self) -> &[(usize, usize)] {
        &self.records
    }

    /// Write the progress table (`nfe`, `epsilon_progress`).
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["nfe", "epsilon_progress"])?;
        for (nfe, improvements) in &self.records {
            writer.write_record([nfe.to_string(), improvements.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Search budget and tolerances for one optimization run.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Number of function evaluations to spend.
    pub nfe: usize,

    /// ε-dominance tolerance per objective.
    pub epsilons: Vec<f64>,

    /// Seed for the search's own randomness.
    pub seed: u64,

    /// Snapshot/progress cadence in evaluations.
    pub snapshot_every: usize,
}

/// Where a search reports progress: ε-progress records, and optionally an
/// archive snapshot store.
pub struct SearchLog<'a> {
    pub progress: &'a mut EpsilonProgress,
    pub archive: Option<&'a mut ArchiveLogger>,
}

/// The one search operation this crate consumes.
///
/// The external evolutionary solver stands behind this trait. Contracts:
/// the implementation evaluates candidates only through
/// [`OptimizationProblem::evaluate`], spends at most `settings.nfe`
/// evaluations, and reports progress/snapshots through `log` at the
/// cadence `settings.snapshot_every`.
pub trait Optimizer {
    fn optimize(
        &mut self,
        problem: &OptimizationProblem<'_>,
        settings: &SearchSettings,
        log: &mut SearchLog<'_>,
    ) -> Result<SolutionSet, OptimizeError>;
}

/// A search-over-levers problem: a model plus the reference scenario the
/// candidates are evaluated against.
pub struct OptimizationProblem<'a> {
    model: &'a Model,
    reference: &'a Scenario,
}

impl<'a> OptimizationProblem<'a> {
    /// Wrap a model for direct search.
    ///
    /// Fails when the model has no levers, no outcomes, or any
    /// series-valued outcome. Series outcomes cannot be optimized over
    /// and are rejected here at the boundary.
    pub fn new(model: &'a Model, reference: &'a Scenario) -> Result<Self, OptimizeError> {
        if model.levers().is_empty() {
            return Err(OptimizeError::NoLevers);
        }
        if model.outcomes().is_empty() {
            return Err(OptimizeError::NoObjectives);
        }
        for outcome in model.outcomes() {
            if !outcome.is_scalar() {
                return Err(OptimizeError::SeriesObjective(outcome.name().to_string()));
            }
        }
        Ok(Self { model, reference })
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn reference(&self) -> &Scenario {
        self.reference
    }

    pub fn levers(&self) -> &[Parameter] {
        self.model.levers()
    }

    pub fn lever_names(&self) -> Vec<String> {
        self.model.levers().iter().map(Parameter::name).collect()
    }

    pub fn objective_names(&self) -> Vec<String> {
        self.model.outcome_names()
    }

    /// Draw one candidate uniformly from the lever domains.
    pub fn sample_levers(&self, rng: &mut RngManager) -> Vec<f64> {
        self.model.levers().iter().map(|l| l.sample(rng)).collect()
    }

    /// Evaluate one candidate lever assignment against the reference
    /// scenario, returning the objective vector.
    pub fn evaluate(&self, lever_values: &[f64]) -> Result<Vec<f64>, OptimizeError> {
        let levers = self.model.levers();
        if lever_values.len() != levers.len() {
            return Err(OptimizeError::LeverArity {
                expected: levers.len(),
                found: lever_values.len(),
            });
        }

        let mut row = BTreeMap::new();
        for (param, value) in levers.iter().zip(lever_values) {
            row.insert(param.name(), *value);
        }
        let candidate = Policy::from_table_row("candidate", &row, levers)?;

        let experiment = run_experiment(self.model, self.reference, &candidate)?;
        let objectives = experiment
            .outcomes
            .iter()
            .zip(self.model.outcomes())
            .map(|(sample, spec)| match sample {
                Sample::Scalar(v) => Ok(*v),
                Sample::Series(_) => Err(OptimizeError::SeriesObjective(spec.name().to_string())),
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Ok(objectives)
    }
}

/// Seed salt for the baseline search: xorshift coerces a zero seed to 1,
/// so unsalted seeds 0 and 1 would share one stream.
const SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Uniform random search into an ε-archive.
///
/// This is the wiring baseline, not an evolutionary algorithm: candidates
/// are drawn independently from the lever domains and folded into an
/// [`EpsilonArchive`]. It exists so orchestration and post-processing can
/// run end to end when the external solver is absent.
#[derive(Debug, Default)]
pub struct RandomSearch;

impl RandomSearch {
    pub fn new() -> Self {
        Self
    }
}

impl Optimizer for RandomSearch {
    fn optimize(
        &mut self,
        problem: &OptimizationProblem<'_>,
        settings: &SearchSettings,
        log: &mut SearchLog<'_>,
    ) -> Result<SolutionSet, OptimizeError> {
        if settings.epsilons.len() != problem.objective_names().len() {
            return Err(OptimizeError::EpsilonCount {
                provided: settings.epsilons.len(),
                objectives: problem.objective_names().len(),
            });
        }

        let mut rng = RngManager::new(settings.seed ^ SEED_SALT);
        let mut archive = EpsilonArchive::new(settings.epsilons.clone());
        let mut improvements = 0usize;
        let cadence = settings.snapshot_every.max(1);

        for evaluation in 1..=settings.nfe {
            let levers = problem.sample_levers(&mut rng);
            let objectives = problem.evaluate(&levers)?;
            if archive.insert(Solution { levers, objectives }) == Insertion::Improved {
                improvements += 1;
            }

            if evaluation % cadence == 0 || evaluation == settings.nfe {
                log.progress.record(evaluation, improvements);
                let snapshot =
                    archive.to_solution_set(problem.lever_names(), problem.objective_names());
                if let Some(store) = log.archive.as_mut() {
                    store.record(evaluation, &snapshot)?;
                }
            }
        }

        tracing::info!(
            nfe = settings.nfe,
            archive = archive.len(),
            improvements,
            "search finished"
        );
        Ok(archive.to_solution_set(problem.lever_names(), problem.objective_names()))
    }
}
