//! Calendar-indexed indicator table and its registration lifecycle.
//!
//! Indicators are registered one at a time; each registration computes the
//! indicator once over the whole series and writes its usable values into the
//! table. `initialise` freezes registration and fixes the first bar eligible
//! for simulation.

use crate::domain::error::ScoreTraderError;
use crate::domain::indicator::{IndicatorDescriptor, IndicatorOutput};
use crate::domain::series::PriceSeries;
use crate::ports::indicator_port::IndicatorEngine;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::RangeBounds;

/// Ordered map of date -> (title -> value).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorTable {
    rows: BTreeMap<NaiveDate, HashMap<String, f64>>,
}

impl IndicatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, title: &str, value: f64) {
        self.rows
            .entry(date)
            .or_default()
            .insert(title.to_string(), value);
    }

    pub fn get(&self, date: NaiveDate, title: &str) -> Option<f64> {
        self.rows.get(&date).and_then(|row| row.get(title)).copied()
    }

    pub fn row(&self, date: NaiveDate) -> Option<&HashMap<String, f64>> {
        self.rows.get(&date)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    /// Earliest date carrying `title`.
    pub fn first_date_for(&self, title: &str) -> Option<NaiveDate> {
        self.rows
            .iter()
            .find(|(_, row)| row.contains_key(title))
            .map(|(d, _)| *d)
    }

    /// Latest row within `range` carrying `title`, scanning backwards.
    pub fn latest_in<R>(&self, range: R, title: &str) -> Option<(NaiveDate, f64)>
    where
        R: RangeBounds<NaiveDate>,
    {
        self.rows
            .range(range)
            .rev()
            .find_map(|(d, row)| row.get(title).map(|v| (*d, *v)))
    }
}

pub struct IndicatorStore {
    series: PriceSeries,
    engine: Box<dyn IndicatorEngine>,
    table: IndicatorTable,
    descriptors: Vec<IndicatorDescriptor>,
    titles: HashSet<String>,
    global_warmup: usize,
    start_index: Option<usize>,
}

impl IndicatorStore {
    pub fn new(series: PriceSeries, engine: Box<dyn IndicatorEngine>) -> Self {
        IndicatorStore {
            series,
            engine,
            table: IndicatorTable::new(),
            descriptors: Vec::new(),
            titles: HashSet::new(),
            global_warmup: 0,
            start_index: None,
        }
    }

    /// Registers `descriptor`, returning the precise reason on rejection.
    ///
    /// The table is only written once the computation has succeeded, so a
    /// rejected registration leaves it untouched.
    pub fn try_add_indicator(
        &mut self,
        descriptor: IndicatorDescriptor,
    ) -> Result<(), ScoreTraderError> {
        let title = descriptor.title();
        if self.is_initialised() {
            return Err(ScoreTraderError::RegistrationClosed { title });
        }
        descriptor.validate()?;

        let component_titles = descriptor.component_titles();
        if let Some(dup) = component_titles.iter().find(|t| self.titles.contains(*t)) {
            return Err(ScoreTraderError::DuplicateIndicator { title: dup.clone() });
        }

        let output = self.engine.compute(&descriptor, &self.series)?;
        self.check_output(&title, component_titles.len(), &output)?;
        let dates = &self.series.bars()[output.begin_index..];
        for (component_title, values) in component_titles.iter().zip(&output.components) {
            for (bar, &value) in dates.iter().zip(values) {
                self.table.insert(bar.date, component_title, value);
            }
        }

        self.global_warmup = self
            .global_warmup
            .max(output.begin_index)
            .max(descriptor.period_floor());
        debug!(
            "added {} as {:?}: begin index {}, {} values",
            descriptor,
            component_titles,
            output.begin_index,
            output.count()
        );
        self.titles.extend(component_titles);
        self.descriptors.push(descriptor);
        Ok(())
    }

    fn check_output(
        &self,
        title: &str,
        expected_components: usize,
        output: &IndicatorOutput,
    ) -> Result<(), ScoreTraderError> {
        let malformed = |reason: String| ScoreTraderError::MalformedOutput {
            title: title.to_string(),
            reason,
        };
        if output.components.len() != expected_components {
            return Err(malformed(format!(
                "expected {expected_components} components, got {}",
                output.components.len()
            )));
        }
        let count = output.count();
        if let Some(len) = output.components.iter().map(Vec::len).find(|&l| l != count) {
            return Err(malformed(format!(
                "component lengths differ: {count} and {len}"
            )));
        }
        if output.begin_index + count > self.series.len() {
            return Err(malformed(format!(
                "begin index {} with {count} values overruns {} bars",
                output.begin_index,
                self.series.len()
            )));
        }
        Ok(())
    }

    /// Registers `descriptor`.
    ///
    /// Returns `Ok(false)` after logging when the parameters are invalid, the
    /// title is taken, or registration is closed. Insufficient data and
    /// malformed engine output are returned as errors.
    pub fn add_indicator(
        &mut self,
        descriptor: IndicatorDescriptor,
    ) -> Result<bool, ScoreTraderError> {
        let label = descriptor.to_string();
        match self.try_add_indicator(descriptor) {
            Ok(()) => Ok(true),
            Err(
                e @ (ScoreTraderError::InsufficientData { .. }
                | ScoreTraderError::MalformedOutput { .. }),
            ) => Err(e),
            Err(e) => {
                warn!("skipping indicator {label}: {e}");
                Ok(false)
            }
        }
    }

    /// Freezes registration and fixes the simulation start at bar `global_warmup`.
    pub fn initialise(&mut self) {
        if self.is_initialised() {
            return;
        }
        self.start_index = Some(self.global_warmup);
        let start_date = self.start_date();
        let mut titles: Vec<&String> = self.titles.iter().collect();
        titles.sort();
        info!(
            "{}: {} indicators, warmup offset {}, start date {}",
            self.series.instrument,
            self.descriptors.len(),
            self.global_warmup,
            start_date.map_or_else(|| "none".to_string(), |d| d.to_string())
        );
        info!("indicator titles: {titles:?}");
        if start_date.is_none() {
            warn!(
                "{}: warmup offset {} leaves no bars to simulate",
                self.series.instrument, self.global_warmup
            );
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.start_index.is_some()
    }

    pub fn global_warmup(&self) -> usize {
        self.global_warmup
    }

    /// First bar index eligible for simulation; `None` before `initialise`.
    pub fn start_index(&self) -> Option<usize> {
        self.start_index
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_index
            .and_then(|i| self.series.get(i))
            .map(|b| b.date)
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn table(&self) -> &IndicatorTable {
        &self.table
    }

    pub fn descriptors(&self) -> &[IndicatorDescriptor] {
        &self.descriptors
    }

    pub fn has_title(&self, title: &str) -> bool {
        self.titles.contains(title)
    }

    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.titles.iter().cloned().collect();
        titles.sort();
        titles
    }
}
