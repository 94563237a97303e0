//! Parameter specifications
//!
//! Declarative descriptions of the uncertainty and lever space a model is
//! explored over. A [`Parameter`] couples a structured [`ParamKey`] with a
//! kind (continuous range, discrete range, categorical set) and is immutable
//! once built; one instance exists per uncertainty or lever.
//!
//! # Naming
//!
//! Parameter names historically encoded their structure in a delimited
//! string (`entity_attribute step`). That convention is easy to violate
//! silently, so the structure is explicit here: [`ParamKey`] carries the
//! entity, attribute and planning step as separate fields and only renders
//! the legacy string form at the file boundary. Rendering and parsing
//! round-trip for every shape in use:
//!
//! - `A.1_Bmax`: entity + attribute
//! - `A.1_DikeIncrease 0`: entity + attribute + step
//! - `discount rate 0`: attribute + step
//! - `EWS_DaysToThreat`: entity + attribute
//!
//! Attributes may contain spaces but never an underscore; the first
//! underscore is what separates the entity prefix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::RngManager;

/// Errors raised while building or parsing parameter specifications.
#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("invalid bounds for '{name}': lower {lower} must be below upper {upper}")]
    InvalidBounds {
        name: String,
        lower: f64,
        upper: f64,
    },

    #[error("categorical parameter '{name}' needs at least one category")]
    EmptyCategories { name: String },

    #[error("parameter name '{0}' has an empty attribute")]
    EmptyAttribute(String),
}

/// Structured parameter key: entity, attribute, planning step.
///
/// The legacy string rendering (`entity_attribute step`) is produced by
/// [`fmt::Display`] and recovered by [`FromStr`]; downstream tables keep
/// using the rendered form as their column headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamKey {
    entity: Option<String>,
    attribute: String,
    step: Option<u32>,
}

impl ParamKey {
    /// A key with no entity prefix and no step, e.g. `EWS_DaysToThreat`
    /// rendered without its prefix.
    pub fn global(attribute: impl Into<String>) -> Self {
        Self {
            entity: None,
            attribute: attribute.into(),
            step: None,
        }
    }

    /// A key scoped to one entity (dike ring, RfR project, warning system).
    pub fn of(entity: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            entity: Some(entity.into()),
            attribute: attribute.into(),
            step: None,
        }
    }

    /// Attach a planning step to this key.
    pub fn at_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn step(&self) -> Option<u32> {
        self.step
    }

    /// Rendering without the entity prefix (`attribute` or
    /// `attribute step`). Broadcast lookups use this to share one reference
    /// value across all entities.
    pub fn unqualified(&self) -> String {
        match self.step {
            Some(n) => format!("{} {}", self.attribute, n),
            None => self.attribute.clone(),
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(entity) = &self.entity {
            write!(f, "{}_", entity)?;
        }
        f.write_str(&self.attribute)?;
        if let Some(step) = self.step {
            write!(f, " {}", step)?;
        }
        Ok(())
    }
}

impl FromStr for ParamKey {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (entity, rest) = match s.split_once('_') {
            Some((prefix, rest)) => (Some(prefix.to_string()), rest),
            None => (None, s),
        };

        // A trailing all-digit token is the planning step.
        let (attribute, step) = match rest.rsplit_once(' ') {
            Some((head, tail))
                if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) =>
            {
                match tail.parse::<u32>() {
                    Ok(step) => (head.to_string(), Some(step)),
                    Err(_) => (rest.to_string(), None),
                }
            }
            _ => (rest.to_string(), None),
        };

        if attribute.is_empty() {
            return Err(ParameterError::EmptyAttribute(s.to_string()));
        }

        Ok(Self {
            entity,
            attribute,
            step,
        })
    }
}

/// Value domain of a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous range, sampled over [lower, upper).
    Real { lower: f64, upper: f64 },

    /// Discrete range with inclusive bounds.
    Integer { lower: i64, upper: i64 },

    /// Finite set of admissible values.
    Categorical { categories: Vec<f64> },
}

/// One uncertainty or lever: a structured key plus its value domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    key: ParamKey,
    kind: ParameterKind,
}

impl Parameter {
    /// Continuous parameter over [lower, upper).
    pub fn real(key: ParamKey, lower: f64, upper: f64) -> Result<Self, ParameterError> {
        if lower >= upper {
            return Err(ParameterError::InvalidBounds {
                name: key.to_string(),
                lower,
                upper,
            });
        }
        Ok(Self {
            key,
            kind: ParameterKind::Real { lower, upper },
        })
    }

    /// Discrete parameter over the inclusive range [lower, upper].
    pub fn integer(key: ParamKey, lower: i64, upper: i64) -> Result<Self, ParameterError> {
        if lower >= upper {
            return Err(ParameterError::InvalidBounds {
                name: key.to_string(),
                lower: lower as f64,
                upper: upper as f64,
            });
        }
        Ok(Self {
            key,
            kind: ParameterKind::Integer { lower, upper },
        })
    }

    /// Categorical parameter over a finite value set.
    pub fn categorical(key: ParamKey, categories: Vec<f64>) -> Result<Self, ParameterError> {
        if categories.is_empty() {
            return Err(ParameterError::EmptyCategories {
                name: key.to_string(),
            });
        }
        Ok(Self {
            key,
            kind: ParameterKind::Categorical { categories },
        })
    }

    pub fn key(&self) -> &ParamKey {
        &self.key
    }

    /// The rendered column-header form of the key.
    pub fn name(&self) -> String {
        self.key.to_string()
    }

    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    /// Whether `value` lies inside this parameter's domain.
    pub fn contains(&self, value: f64) -> bool {
        match &self.kind {
            ParameterKind::Real { lower, upper } => value >= *lower && value <= *upper,
            ParameterKind::Integer { lower, upper } => {
                value.fract() == 0.0 && value >= *lower as f64 && value <= *upper as f64
            }
            ParameterKind::Categorical { categories } => categories.iter().any(|c| *c == value),
        }
    }

    /// Draw a value uniformly from this parameter's domain.
    pub fn sample(&self, rng: &mut RngManager) -> f64 {
        match &self.kind {
            ParameterKind::Real { lower, upper } => rng.uniform(*lower, *upper),
            ParameterKind::Integer { lower, upper } => rng.int_range(*lower, *upper) as f64,
            ParameterKind::Categorical { categories } => categories[rng.index(categories.len())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ParamKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_key_roundtrip_entity_attribute() {
        let key = parse("A.1_Bmax");
        assert_eq!(key.entity(), Some("A.1"));
        assert_eq!(key.attribute(), "Bmax");
        assert_eq!(key.step(), None);
        assert_eq!(key.to_string(), "A.1_Bmax");
    }

    #[test]
    fn test_key_roundtrip_entity_attribute_step() {
        let key = parse("A.4_DikeIncrease 2");
        assert_eq!(key.entity(), Some("A.4"));
        assert_eq!(key.attribute(), "DikeIncrease");
        assert_eq!(key.step(), Some(2));
        assert_eq!(key.to_string(), "A.4_DikeIncrease 2");
    }

    #[test]
    fn test_key_roundtrip_global_with_step() {
        let key = parse("discount rate 1");
        assert_eq!(key.entity(), None);
        assert_eq!(key.attribute(), "discount rate");
        assert_eq!(key.step(), Some(1));
        assert_eq!(key.to_string(), "discount rate 1");
    }

    #[test]
    fn test_key_spaced_attribute_without_step() {
        let key = parse("A.0_ID flood wave shape");
        assert_eq!(key.entity(), Some("A.0"));
        assert_eq!(key.attribute(), "ID flood wave shape");
        assert_eq!(key.step(), None);
    }

    #[test]
    fn test_key_numeric_entity() {
        let key = parse("0_RfR 1");
        assert_eq!(key.entity(), Some("0"));
        assert_eq!(key.attribute(), "RfR");
        assert_eq!(key.step(), Some(1));
        assert_eq!(key.unqualified(), "RfR 1");
    }

    #[test]
    fn test_key_empty_attribute_rejected() {
        assert!("A.1_".parse::<ParamKey>().is_err());
    }

    #[test]
    fn test_real_bounds_validated() {
        let err = Parameter::real(ParamKey::global("pfail"), 1.0, 0.0).unwrap_err();
        assert!(matches!(err, ParameterError::InvalidBounds { .. }));
    }

    #[test]
    fn test_integer_contains_rejects_fractions() {
        let p = Parameter::integer(ParamKey::of("EWS", "DaysToThreat"), 0, 4).unwrap();
        assert!(p.contains(3.0));
        assert!(!p.contains(3.5));
        assert!(!p.contains(5.0));
    }

    #[test]
    fn test_categorical_contains() {
        let p = Parameter::categorical(ParamKey::of("A.2", "Brate"), vec![1.0, 1.5, 10.0]).unwrap();
        assert!(p.contains(1.5));
        assert!(!p.contains(2.0));
    }

    #[test]
    fn test_sampling_stays_in_domain() {
        let mut rng = RngManager::new(31);
        let real = Parameter::real(ParamKey::of("A.1", "Bmax"), 30.0, 350.0).unwrap();
        let int = Parameter::integer(ParamKey::global("seedless"), 0, 132).unwrap();
        let cat = Parameter::categorical(ParamKey::global("rate"), vec![1.5, 2.5, 3.5, 4.5]).unwrap();

        for _ in 0..500 {
            assert!(real.contains(real.sample(&mut rng)));
            assert!(int.contains(int.sample(&mut rng)));
            assert!(cat.contains(cat.sample(&mut rng)));
        }
    }
}
