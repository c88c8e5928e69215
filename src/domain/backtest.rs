//! Backtest configuration and the per-date simulation loop.
//!
//! A [`BacktestRunner`] walks the eligible bars in date order. For each date
//! it reads the leaf indicators at-or-before the date, scores them, and hands
//! the signal to [`check_buy`]. Failures confined to one date are logged and
//! skipped; an out-of-range lookup aborts the run.

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::decision::{DecisionPolicy, DecisionType};
use super::error::{DayError, LookupError, ScoreTraderError};
use super::execution::{check_buy, BuyOutcome};
use super::indicator::composite_title;
use super::indicator_store::IndicatorStore;
use super::point_in_time::PointInTimeAccessor;
use super::position::Position;
use super::position_book::PositionBook;
use crate::ports::classifier_port::{Classifier, VariableSet};

pub const DEFAULT_HOLDING_HORIZON: usize = 7;
pub const DEFAULT_CUT_VALUE: f64 = -0.01;
pub const DEFAULT_CUT_MIN: f64 = -0.001;
pub const DEFAULT_CUT_MAX: f64 = 1.0;
pub const DEFAULT_SEED: u64 = 100;
pub const DEFAULT_METHOD: &str = "TMlpANN";
pub const DEFAULT_LEAVES: [&str; 7] = ["BOP", "APO", "STDDEV", "CCI", "ADO", "ADX", "MACD:signal"];

/// Derived leaf: STOCHRSI_D - STOCHRSI_K.
pub const STOCHRSI_SPREAD: &str = "STOCHRSIDK";

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub instrument: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub holding_horizon: usize,
    pub decision_type: DecisionType,
    pub cut_value: f64,
    pub cut_min: f64,
    pub cut_max: f64,
    pub iterations: usize,
    pub seed: u64,
    pub parallel: bool,
    pub method: String,
}

impl BacktestConfig {
    pub fn new(instrument: &str, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        BacktestConfig {
            instrument: instrument.to_string(),
            start_date,
            end_date,
            holding_horizon: DEFAULT_HOLDING_HORIZON,
            decision_type: DecisionType::Deterministic,
            cut_value: DEFAULT_CUT_VALUE,
            cut_min: DEFAULT_CUT_MIN,
            cut_max: DEFAULT_CUT_MAX,
            iterations: 1,
            seed: DEFAULT_SEED,
            parallel: false,
            method: DEFAULT_METHOD.to_string(),
        }
    }
}

/// A classifier input read from the indicator table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaf {
    Indicator { title: String, component: String },
    StochRsiSpread,
}

impl Leaf {
    pub fn indicator(title: &str, component: &str) -> Self {
        Leaf::Indicator {
            title: title.to_string(),
            component: component.to_string(),
        }
    }

    /// Variable name bound in the classifier session.
    pub fn name(&self) -> String {
        match self {
            Leaf::Indicator { title, component } => composite_title(title, component),
            Leaf::StochRsiSpread => STOCHRSI_SPREAD.to_string(),
        }
    }

    /// Table titles this leaf reads.
    pub fn required_titles(&self) -> Vec<String> {
        match self {
            Leaf::Indicator { .. } => vec![self.name()],
            Leaf::StochRsiSpread => vec!["STOCHRSI_K".into(), "STOCHRSI_D".into()],
        }
    }

    pub fn evaluate(
        &self,
        accessor: &PointInTimeAccessor<'_>,
        date: NaiveDate,
    ) -> Result<f64, LookupError> {
        match self {
            Leaf::Indicator { title, component } => accessor
                .evaluate_at_or_before(title, date, component)
                .map(|p| p.value),
            Leaf::StochRsiSpread => {
                let d = accessor.evaluate_at_or_before("STOCHRSI", date, "D")?;
                let k = accessor.evaluate_at_or_before("STOCHRSI", date, "K")?;
                Ok(d.value - k.value)
            }
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Indicator { title, component } if component.is_empty() => f.write_str(title),
            Leaf::Indicator { title, component } => write!(f, "{title}:{component}"),
            Leaf::StochRsiSpread => f.write_str(STOCHRSI_SPREAD),
        }
    }
}

/// `TITLE`, `TITLE:component`, or `STOCHRSIDK`.
impl FromStr for Leaf {
    type Err = ScoreTraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ScoreTraderError::ConfigInvalid {
                section: "classifier".into(),
                key: "leaves".into(),
                reason: "empty leaf".into(),
            });
        }
        if s == STOCHRSI_SPREAD {
            return Ok(Leaf::StochRsiSpread);
        }
        Ok(match s.split_once(':') {
            Some((title, component)) => Leaf::indicator(title.trim(), component.trim()),
            None => Leaf::indicator(s, ""),
        })
    }
}

pub fn default_leaves() -> Vec<Leaf> {
    DEFAULT_LEAVES
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// Parameters of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub holding_horizon: usize,
    pub decision_type: DecisionType,
    pub cut_value: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub cut_value: f64,
    pub seed: u64,
    pub decision_type: DecisionType,
    pub positions: Vec<Position>,
    pub dates_processed: usize,
    pub day_errors: usize,
    pub trades: usize,
    pub cancelled: bool,
}

impl BacktestResult {
    pub fn closed_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| !p.is_open())
    }
}

pub struct BacktestRunner<'a> {
    accessor: PointInTimeAccessor<'a>,
    classifier: &'a dyn Classifier,
    leaves: Vec<Leaf>,
    method: String,
    ready: bool,
    state: RunState,
    book: PositionBook,
    variables: VariableSet,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> BacktestRunner<'a> {
    pub fn new(store: &'a IndicatorStore, classifier: &'a dyn Classifier) -> Self {
        BacktestRunner {
            accessor: PointInTimeAccessor::new(store),
            classifier,
            leaves: Vec::new(),
            method: DEFAULT_METHOD.to_string(),
            ready: false,
            state: RunState::Idle,
            book: PositionBook::new(),
            variables: VariableSet::new(),
            cancel: None,
        }
    }

    /// Stops the run between dates once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Wires the classifier inputs. Every leaf must resolve to a registered title.
    pub fn setup(&mut self, leaves: Vec<Leaf>, method: &str) -> Result<(), ScoreTraderError> {
        let store = self.accessor.store();
        if !store.is_initialised() {
            return Err(ScoreTraderError::NotSetUp);
        }
        for leaf in &leaves {
            if let Some(missing) = leaf
                .required_titles()
                .into_iter()
                .find(|t| !store.has_title(t))
            {
                return Err(ScoreTraderError::ConfigInvalid {
                    section: "classifier".into(),
                    key: "leaves".into(),
                    reason: format!("leaf {leaf} needs unregistered indicator {missing}"),
                });
            }
        }
        let names: Vec<String> = leaves.iter().map(Leaf::name).collect();
        for input in self.classifier.input_variables() {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&input)) {
                warn!("classifier input {input} is not bound by any leaf");
            }
        }
        debug!("classifier {method} reads {names:?}");

        self.leaves = leaves;
        self.method = method.to_string();
        self.ready = true;
        Ok(())
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn run(&mut self, params: &RunParams) -> Result<BacktestResult, ScoreTraderError> {
        if !self.ready {
            return Err(ScoreTraderError::NotSetUp);
        }
        if self.state != RunState::Idle {
            return Err(ScoreTraderError::AlreadyCompleted);
        }
        let store = self.accessor.store();
        let start = store.start_index().ok_or(ScoreTraderError::NotSetUp)?;
        let len = store.series().len();
        let end = len.checked_sub(params.holding_horizon + 1);

        self.state = RunState::Running;
        let mut policy = DecisionPolicy::new(params.decision_type, &self.method, params.seed);
        let mut dates_processed = 0;
        let mut day_errors = 0;
        let mut trades = 0;
        let mut cancelled = false;

        if let Some(end) = end.filter(|&e| e >= start) {
            for index in start..=end {
                if self.is_cancelled() {
                    info!("run cancelled after {dates_processed} dates");
                    cancelled = true;
                    break;
                }
                let Some(date) = store.series().get(index).map(|b| b.date) else {
                    break;
                };
                dates_processed += 1;
                match self.trade(date, &mut policy, params) {
                    Ok(outcome) => {
                        if outcome.is_trade() {
                            trades += 1;
                        }
                    }
                    Err(e) => {
                        if let Some(fatal) = e.clone().into_fatal() {
                            self.state = RunState::Completed;
                            return Err(fatal);
                        }
                        warn!("{date}: {e}, skipping");
                        day_errors += 1;
                    }
                }
            }
        } else {
            warn!(
                "no eligible dates: {len} bars, start {start}, horizon {}",
                params.holding_horizon
            );
        }

        self.state = RunState::Completed;
        Ok(BacktestResult {
            cut_value: params.cut_value,
            seed: params.seed,
            decision_type: params.decision_type,
            positions: self.book.positions().to_vec(),
            dates_processed,
            day_errors,
            trades,
            cancelled,
        })
    }

    /// One simulated date: bind leaves, compute the signal, attempt a buy.
    pub fn trade(
        &mut self,
        date: NaiveDate,
        policy: &mut DecisionPolicy,
        params: &RunParams,
    ) -> Result<BuyOutcome, DayError> {
        for leaf in &self.leaves {
            let value = leaf.evaluate(&self.accessor, date)?;
            self.variables.set(&leaf.name(), value);
        }
        let signal = policy.signal(self.classifier, &self.variables)?;
        Ok(check_buy(
            &mut self.book,
            self.accessor.store().series(),
            date,
            signal,
            params.cut_value,
            params.holding_horizon,
        ))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Builds a runner, wires it, and runs it once.
pub fn run_backtest(
    store: &IndicatorStore,
    classifier: &dyn Classifier,
    leaves: &[Leaf],
    method: &str,
    params: &RunParams,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<BacktestResult, ScoreTraderError> {
    let mut runner = BacktestRunner::new(store, classifier);
    if let Some(flag) = cancel {
        runner = runner.with_cancel_flag(flag);
    }
    runner.setup(leaves.to_vec(), method)?;
    runner.run(params)
}
