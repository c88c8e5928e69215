//! Classifier port trait and the per-run variable binding session.

use crate::domain::error::ClassifierError;
use std::collections::BTreeMap;

/// Named float inputs bound for one scoring call.
///
/// Each backtest run owns its own set, so concurrent sweep iterations never
/// share bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    values: BTreeMap<String, f64>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Scores a bound variable set with a named method.
pub trait Classifier: Send + Sync {
    fn score(&self, method: &str, variables: &VariableSet) -> Result<f64, ClassifierError>;

    /// Variables the classifier reads, if it declares them.
    fn input_variables(&self) -> Vec<String> {
        Vec::new()
    }
}
