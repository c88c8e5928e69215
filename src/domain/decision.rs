//! Trade signal policies and the threshold rule.

use crate::domain::error::{ClassifierError, DayError, ScoreTraderError};
use crate::ports::classifier_port::{Classifier, VariableSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

/// Bounds of the random baseline draw.
pub const RANDOM_SIGNAL_BOUND: f64 = 1.1;

/// Configured decision variant, before a policy is built for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionType {
    Deterministic,
    RandomBaseline,
    ProbabilityTransform,
}

impl DecisionType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(DecisionType::Deterministic),
            1 => Some(DecisionType::RandomBaseline),
            2 => Some(DecisionType::ProbabilityTransform),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            DecisionType::Deterministic => 0,
            DecisionType::RandomBaseline => 1,
            DecisionType::ProbabilityTransform => 2,
        }
    }

    pub fn is_random(self) -> bool {
        self == DecisionType::RandomBaseline
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionType::Deterministic => "deterministic",
            DecisionType::RandomBaseline => "random",
            DecisionType::ProbabilityTransform => "probability",
        };
        f.write_str(name)
    }
}

impl FromStr for DecisionType {
    type Err = ScoreTraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            if let Some(t) = DecisionType::from_code(code) {
                return Ok(t);
            }
        }
        match s.to_lowercase().as_str() {
            "deterministic" => Ok(DecisionType::Deterministic),
            "random" => Ok(DecisionType::RandomBaseline),
            "probability" => Ok(DecisionType::ProbabilityTransform),
            _ => Err(ScoreTraderError::ConfigInvalid {
                section: "backtest".into(),
                key: "decision_type".into(),
                reason: format!("unknown decision type {s:?}"),
            }),
        }
    }
}

/// Signal source for one run. Each run owns its policy, and with it its RNG.
#[derive(Debug, Clone)]
pub enum DecisionPolicy {
    Deterministic { method: String },
    RandomBaseline { rng: StdRng },
    ProbabilityTransform { method: String },
}

impl DecisionPolicy {
    pub fn new(decision_type: DecisionType, method: &str, seed: u64) -> Self {
        match decision_type {
            DecisionType::Deterministic => DecisionPolicy::Deterministic {
                method: method.to_string(),
            },
            DecisionType::RandomBaseline => DecisionPolicy::RandomBaseline {
                rng: StdRng::seed_from_u64(seed),
            },
            DecisionType::ProbabilityTransform => DecisionPolicy::ProbabilityTransform {
                method: method.to_string(),
            },
        }
    }

    pub fn decision_type(&self) -> DecisionType {
        match self {
            DecisionPolicy::Deterministic { .. } => DecisionType::Deterministic,
            DecisionPolicy::RandomBaseline { .. } => DecisionType::RandomBaseline,
            DecisionPolicy::ProbabilityTransform { .. } => DecisionType::ProbabilityTransform,
        }
    }

    /// Whether the signal depends on the classifier.
    pub fn uses_classifier(&self) -> bool {
        !matches!(self, DecisionPolicy::RandomBaseline { .. })
    }

    pub fn signal(
        &mut self,
        classifier: &dyn Classifier,
        variables: &VariableSet,
    ) -> Result<f64, DayError> {
        match self {
            DecisionPolicy::Deterministic { method } => score(classifier, method, variables),
            DecisionPolicy::RandomBaseline { rng } => {
                Ok(rng.gen_range(-RANDOM_SIGNAL_BOUND..RANDOM_SIGNAL_BOUND))
            }
            DecisionPolicy::ProbabilityTransform { method } => {
                score(classifier, method, variables).map(|s| 0.5 * (1.0 + s))
            }
        }
    }
}

fn score(classifier: &dyn Classifier, method: &str, variables: &VariableSet) -> Result<f64, DayError> {
    let s = classifier.score(method, variables)?;
    if s.is_finite() {
        Ok(s)
    } else {
        Err(ClassifierError::NonFinite {
            method: method.to_string(),
            score: s,
        }
        .into())
    }
}

/// signal >= cut opens a position.
pub fn passes_threshold(signal: f64, cut: f64) -> bool {
    signal >= cut
}
