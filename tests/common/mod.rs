#![allow(dead_code)]

use chrono::NaiveDate;
use scoretrader::adapters::native_indicator_engine::NativeIndicatorEngine;
use scoretrader::domain::backtest::BacktestConfig;
use scoretrader::domain::error::{ClassifierError, ScoreTraderError};
pub use scoretrader::domain::ohlcv::Bar;
use scoretrader::domain::indicator::IndicatorDescriptor;
use scoretrader::domain::indicator_store::IndicatorStore;
use scoretrader::domain::series::PriceSeries;
use scoretrader::ports::classifier_port::{Classifier, VariableSet};
use scoretrader::ports::data_port::DataPort;
use scoretrader::ports::output_port::TabularSink;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, ScoreTraderError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(ScoreTraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(instrument)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_instruments(&self) -> Result<Vec<String>, ScoreTraderError> {
        let mut names: Vec<String> = self.data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Sink that keeps rows in memory.
#[derive(Default)]
pub struct MemorySink {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, f64>>,
    current: HashMap<String, f64>,
    pub flushed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(&self, name: &str) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.get(name).copied()).collect()
    }
}

impl TabularSink for MemorySink {
    fn add_column(&mut self, name: &str) -> Result<(), ScoreTraderError> {
        self.columns.push(name.to_string());
        Ok(())
    }

    fn set_column(&mut self, name: &str, value: f64) -> Result<(), ScoreTraderError> {
        if !self.columns.iter().any(|c| c == name) {
            return Err(ScoreTraderError::Sink {
                reason: format!("unknown column {name}"),
            });
        }
        self.current.insert(name.to_string(), value);
        Ok(())
    }

    fn write_row(&mut self) -> Result<(), ScoreTraderError> {
        self.rows.push(std::mem::take(&mut self.current));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ScoreTraderError> {
        self.flushed = true;
        Ok(())
    }
}

/// Classifier returning the same score for every call.
pub struct FixedClassifier(pub f64);

impl Classifier for FixedClassifier {
    fn score(&self, _method: &str, _variables: &VariableSet) -> Result<f64, ClassifierError> {
        Ok(self.0)
    }
}

/// Classifier returning the first bound variable, or an error when none is bound.
pub struct PassThroughClassifier;

impl Classifier for PassThroughClassifier {
    fn score(&self, _method: &str, variables: &VariableSet) -> Result<f64, ClassifierError> {
        variables
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| ClassifierError::failed("no variables bound"))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, open: f64, close: f64) -> Bar {
    Bar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        adj_close: close,
        volume: 1000.0,
    }
}

/// Daily bars with a wavy but deterministic price path. `open[i]` is
/// `100 + i`, so fills are easy to check by index.
pub fn generate_bars(start_date: &str, count: usize) -> Vec<Bar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let x = i as f64;
            let open = 100.0 + x;
            let close = open + 2.0 * (x * 0.7).sin();
            Bar {
                date: start + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0 + (x * 0.3).cos().abs(),
                low: open.min(close) - 1.0 - (x * 0.5).sin().abs(),
                close,
                adj_close: close,
                volume: 1000.0 + 100.0 * (x * 0.9).cos(),
            }
        })
        .collect()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig::new("BHP", date(2020, 1, 1), date(2024, 12, 31))
}

pub fn descriptor(definition: &str) -> IndicatorDescriptor {
    definition.parse().unwrap()
}

/// Store over `bars` with `definitions` registered and initialised.
pub fn build_store(bars: Vec<Bar>, definitions: &[&str]) -> IndicatorStore {
    let mut store = IndicatorStore::new(
        PriceSeries::new("BHP", bars),
        Box::new(NativeIndicatorEngine::new()),
    );
    for definition in definitions {
        assert!(store.add_indicator(descriptor(definition)).unwrap(), "{definition}");
    }
    store.initialise();
    store
}
