//! Outcome specifications and aggregation
//!
//! Raw simulation outputs arrive per location and per planning step; an
//! [`OutcomeSpec`] names the source variables to aggregate and the function
//! that folds them into a single objective. Two aggregation primitives
//! cover every formulation in use:
//!
//! - [`sum_over`]: collapse a mixed bag of scalars and time series into one
//!   scalar (each series is reduced by summation first).
//! - [`sum_over_time`]: stack equal-length series and sum them
//!   position-wise, keeping the time dimension.
//!
//! All outcomes are minimized; every quantity in the study is a cost.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while aggregating raw outputs.
#[derive(Debug, Error, PartialEq)]
pub enum AggregationError {
    #[error("aggregation over time needs at least one series")]
    EmptyInput,

    #[error("aggregation over time got a scalar where a series was required")]
    ScalarInSeriesAggregation,

    #[error("series length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("passthrough outcomes aggregate exactly one variable, got {0}")]
    PassthroughArity(usize),
}

/// One raw output of the simulation function: a scalar or a time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Sample {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Sample {
    /// Collapse to a scalar: series are reduced by summation.
    pub fn reduced(&self) -> f64 {
        match self {
            Sample::Scalar(v) => *v,
            Sample::Series(vs) => vs.iter().sum(),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Sample::Scalar(v) => Some(*v),
            Sample::Series(_) => None,
        }
    }
}

/// Sum a mixed collection of scalars and series into one scalar.
///
/// Each series entry is first reduced by summation, then all reduced values
/// are summed. The result is invariant under permutation and flattening of
/// the inputs:
///
/// ```
/// use dikesnet_core::outcomes::{sum_over, Sample};
///
/// let total = sum_over(&[Sample::Scalar(1.0), Sample::Series(vec![2.0, 3.0])]);
/// assert_eq!(total, 6.0);
/// ```
pub fn sum_over(entries: &[Sample]) -> f64 {
    entries.iter().map(Sample::reduced).sum()
}

/// Sum equal-length series position-wise, keeping the time dimension.
///
/// Output length equals the (shared) input length, and `out[i]` is the sum
/// of `entries[*][i]`. Scalars, empty input and ragged lengths are errors.
pub fn sum_over_time(entries: &[Sample]) -> Result<Vec<f64>, AggregationError> {
    let mut iter = entries.iter();
    let first = match iter.next() {
        Some(Sample::Series(vs)) => vs,
        Some(Sample::Scalar(_)) => return Err(AggregationError::ScalarInSeriesAggregation),
        None => return Err(AggregationError::EmptyInput),
    };

    let mut summed = first.clone();
    for entry in iter {
        let series = match entry {
            Sample::Series(vs) => vs,
            Sample::Scalar(_) => return Err(AggregationError::ScalarInSeriesAggregation),
        };
        if series.len() != summed.len() {
            return Err(AggregationError::LengthMismatch {
                expected: summed.len(),
                found: series.len(),
            });
        }
        for (acc, v) in summed.iter_mut().zip(series) {
            *acc += v;
        }
    }
    Ok(summed)
}

/// How an outcome folds its source variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    /// Scalars and series collapse into one scalar.
    SumOver,

    /// Equal-length series sum position-wise into a series.
    SumOverTime,

    /// A single variable is reported unchanged (series-shaped).
    Passthrough,
}

impl Aggregation {
    /// Apply this aggregation to the gathered source samples.
    pub fn apply(&self, samples: &[Sample]) -> Result<Sample, AggregationError> {
        match self {
            Aggregation::SumOver => Ok(Sample::Scalar(sum_over(samples))),
            Aggregation::SumOverTime => sum_over_time(samples).map(Sample::Series),
            Aggregation::Passthrough => match samples {
                [one] => Ok(one.clone()),
                other => Err(AggregationError::PassthroughArity(other.len())),
            },
        }
    }

    /// Whether the aggregated value is a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Aggregation::SumOver)
    }
}

/// Optimization direction. Fixed: every outcome in the study is a cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Minimize,
}

/// A named objective: source variables plus the aggregation folding them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSpec {
    name: String,
    variables: Vec<String>,
    aggregation: Aggregation,
    direction: Direction,
}

impl OutcomeSpec {
    /// Scalar outcome: sum over the named variables.
    pub fn scalar(name: impl Into<String>, variables: Vec<String>) -> Self {
        Self {
            name: name.into(),
            variables,
            aggregation: Aggregation::SumOver,
            direction: Direction::Minimize,
        }
    }

    /// Series outcome: position-wise sum over the named variables.
    pub fn series(name: impl Into<String>, variables: Vec<String>) -> Self {
        Self {
            name: name.into(),
            variables,
            aggregation: Aggregation::SumOverTime,
            direction: Direction::Minimize,
        }
    }

    /// Series outcome reporting a single raw variable unchanged.
    pub fn passthrough(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            variables: vec![name.clone()],
            name,
            aggregation: Aggregation::Passthrough,
            direction: Direction::Minimize,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_scalar(&self) -> bool {
        self.aggregation.is_scalar()
    }
}
