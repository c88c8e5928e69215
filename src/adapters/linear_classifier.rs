//! Weighted-sum classifier configured from the `[classifier]` INI section.
//!
//! `score = tanh(bias + sum(weight_i * x_i))`, so scores fall in (-1, 1).
//! Variable names are matched case-insensitively because INI keys are
//! lowercased on load.

use crate::domain::backtest::DEFAULT_METHOD;
use crate::domain::error::{ClassifierError, ScoreTraderError};
use crate::ports::classifier_port::{Classifier, VariableSet};
use crate::ports::config_port::ConfigPort;

const WEIGHT_PREFIX: &str = "weight.";

#[derive(Debug, Clone, PartialEq)]
pub struct LinearClassifier {
    method: String,
    bias: f64,
    weights: Vec<(String, f64)>,
}

impl LinearClassifier {
    pub fn new(method: &str, bias: f64, weights: Vec<(String, f64)>) -> Self {
        LinearClassifier {
            method: method.to_string(),
            bias,
            weights: weights
                .into_iter()
                .map(|(name, w)| (name.to_lowercase(), w))
                .collect(),
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScoreTraderError> {
        let method = config
            .get_string("classifier", "method")
            .unwrap_or_else(|| DEFAULT_METHOD.to_string());
        let bias = config.get_double("classifier", "bias", 0.0);

        let mut weights = Vec::new();
        for key in config.keys("classifier") {
            let Some(name) = key.strip_prefix(WEIGHT_PREFIX) else {
                continue;
            };
            let raw = config.get_string("classifier", &key).unwrap_or_default();
            let weight: f64 = raw.trim().parse().map_err(|_| ScoreTraderError::ConfigInvalid {
                section: "classifier".into(),
                key: key.clone(),
                reason: format!("weight must be a number, got {raw:?}"),
            })?;
            weights.push((name.to_string(), weight));
        }
        if weights.is_empty() {
            return Err(ScoreTraderError::ConfigMissing {
                section: "classifier".into(),
                key: format!("{WEIGHT_PREFIX}<variable>"),
            });
        }
        Ok(Self::new(&method, bias, weights))
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl Classifier for LinearClassifier {
    fn score(&self, method: &str, variables: &VariableSet) -> Result<f64, ClassifierError> {
        if !method.eq_ignore_ascii_case(&self.method) {
            return Err(ClassifierError::UnknownMethod {
                method: method.to_string(),
                booked: self.method.clone(),
            });
        }
        let mut sum = self.bias;
        for (name, weight) in &self.weights {
            let value = variables
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
                .ok_or_else(|| ClassifierError::UnboundVariable { name: name.clone() })?;
            sum += weight * value;
        }
        Ok(sum.tanh())
    }

    fn input_variables(&self) -> Vec<String> {
        self.weights.iter().map(|(n, _)| n.clone()).collect()
    }
}
