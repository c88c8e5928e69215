//! Cut-value sweeps: repeated runs over a shared, frozen indicator table.
//!
//! Each iteration owns its position book, variable set and RNG, so iterations
//! can run sequentially or on the rayon pool with identical results. Seeds are
//! derived by hashing (base seed, instrument, iteration), which keeps them
//! independent of scheduling order.

use log::{info, warn};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::backtest::{run_backtest, BacktestResult, Leaf, RunParams};
use super::decision::DecisionType;
use super::indicator_store::IndicatorStore;
use crate::ports::classifier_port::Classifier;

#[derive(Debug, Clone, PartialEq)]
pub struct CutValueSweep {
    values: Vec<f64>,
}

impl CutValueSweep {
    /// value_i = min + ((max - min) / n) * i, for i in 0..n.
    pub fn linear(min: f64, max: f64, n: usize) -> Self {
        let step = if n > 0 { (max - min) / n as f64 } else { 0.0 };
        CutValueSweep {
            values: (0..n).map(|i| min + step * i as f64).collect(),
        }
    }

    pub fn fixed(value: f64, n: usize) -> Self {
        CutValueSweep {
            values: vec![value; n],
        }
    }

    /// Linear over [min, max] for multi-iteration non-random sweeps, otherwise
    /// `cut` repeated.
    pub fn for_decision(
        decision_type: DecisionType,
        cut: f64,
        min: f64,
        max: f64,
        n: usize,
    ) -> Self {
        if n > 1 && !decision_type.is_random() {
            Self::linear(min, max, n)
        } else {
            Self::fixed(cut, n.max(1))
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Deterministic per-iteration seed.
pub fn iteration_seed(base_seed: u64, instrument: &str, iteration: usize) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&base_seed.to_le_bytes());
    hasher.update(instrument.as_bytes());
    hasher.update(&(iteration as u64).to_le_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub holding_horizon: usize,
    pub decision_type: DecisionType,
    pub cuts: CutValueSweep,
    pub base_seed: u64,
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IterationOutcome {
    Completed(BacktestResult),
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    /// One entry per iteration, in iteration order.
    pub iterations: Vec<IterationOutcome>,
}

impl SweepOutcome {
    pub fn completed(&self) -> impl Iterator<Item = (usize, &BacktestResult)> {
        self.iterations.iter().enumerate().filter_map(|(i, o)| match o {
            IterationOutcome::Completed(r) => Some((i, r)),
            _ => None,
        })
    }

    pub fn failed_count(&self) -> usize {
        self.iterations
            .iter()
            .filter(|o| matches!(o, IterationOutcome::Failed(_)))
            .count()
    }

    pub fn cancelled(&self) -> bool {
        self.iterations.iter().any(|o| match o {
            IterationOutcome::Skipped => true,
            IterationOutcome::Completed(r) => r.cancelled,
            IterationOutcome::Failed(_) => false,
        })
    }
}

/// Runs one backtest per cut value. A failed iteration is logged and the
/// remaining iterations still run.
pub fn run_sweep(
    store: &IndicatorStore,
    classifier: &dyn Classifier,
    leaves: &[Leaf],
    method: &str,
    config: &SweepConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> SweepOutcome {
    let instrument = store.series().instrument.as_str();
    let n = config.cuts.len();
    info!(
        "{instrument}: sweeping {n} iterations ({}, horizon {}, {})",
        config.decision_type,
        config.holding_horizon,
        if config.parallel { "parallel" } else { "sequential" }
    );

    let run_one = |index: usize| -> IterationOutcome {
        if cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return IterationOutcome::Skipped;
        }
        let params = RunParams {
            holding_horizon: config.holding_horizon,
            decision_type: config.decision_type,
            cut_value: config.cuts.values()[index],
            seed: iteration_seed(config.base_seed, instrument, index),
        };
        match run_backtest(store, classifier, leaves, method, &params, cancel.clone()) {
            Ok(result) => {
                info!(
                    "iteration {index}: cut {:.4}, {} trades over {} dates, {} skipped days",
                    params.cut_value, result.trades, result.dates_processed, result.day_errors
                );
                IterationOutcome::Completed(result)
            }
            Err(e) => {
                warn!("iteration {index} failed: {e}");
                IterationOutcome::Failed(e.to_string())
            }
        }
    };

    let iterations = if config.parallel {
        (0..n).into_par_iter().map(run_one).collect()
    } else {
        (0..n).map(run_one).collect()
    };
    SweepOutcome { iterations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_sweep_values() {
        let sweep = CutValueSweep::linear(-0.001, 1.0, 5);
        let expected = [-0.001, 0.1992, 0.3994, 0.5996, 0.7998];
        assert_eq!(sweep.len(), 5);
        for (v, e) in sweep.values().iter().zip(expected) {
            assert_relative_eq!(*v, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn fixed_sweep_repeats() {
        let sweep = CutValueSweep::fixed(0.3, 4);
        assert_eq!(sweep.values(), &[0.3, 0.3, 0.3, 0.3]);
    }

    #[test]
    fn for_decision_selects_shape() {
        let random = CutValueSweep::for_decision(DecisionType::RandomBaseline, 0.1, 0.0, 1.0, 3);
        assert_eq!(random.values(), &[0.1, 0.1, 0.1]);

        let single = CutValueSweep::for_decision(DecisionType::Deterministic, 0.1, 0.0, 1.0, 1);
        assert_eq!(single.values(), &[0.1]);

        let linear = CutValueSweep::for_decision(DecisionType::Deterministic, 0.1, 0.0, 1.0, 4);
        assert_eq!(linear.values(), &[0.0, 0.25, 0.5, 0.75]);

        let zero = CutValueSweep::for_decision(DecisionType::Deterministic, 0.1, 0.0, 1.0, 0);
        assert_eq!(zero.len(), 1);
    }

    #[test]
    fn seeds_are_stable_and_distinct() {
        assert_eq!(iteration_seed(100, "BHP", 0), iteration_seed(100, "BHP", 0));
        assert_ne!(iteration_seed(100, "BHP", 0), iteration_seed(100, "BHP", 1));
        assert_ne!(iteration_seed(100, "BHP", 0), iteration_seed(101, "BHP", 0));
        assert_ne!(iteration_seed(100, "BHP", 0), iteration_seed(100, "CBA", 0));
    }
}
