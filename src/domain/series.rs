//! Ordered, date-unique bar sequence for one instrument.

use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;
use log::warn;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub instrument: String,
    bars: Vec<Bar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    /// Sorts bars by date. Later duplicates of a date are dropped.
    pub fn new(instrument: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        let instrument = instrument.into();
        bars.sort_by_key(|b| b.date);
        let before = bars.len();
        bars.dedup_by_key(|b| b.date);
        if bars.len() != before {
            warn!(
                "{}: dropped {} bars with duplicate dates",
                instrument,
                before - bars.len()
            );
        }

        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            instrument,
            bars,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn bar_on(&self, date: NaiveDate) -> Option<&Bar> {
        self.index_of(date).map(|i| &self.bars[i])
    }

    /// The bar `offset` trading days after `date` (`offset >= 1`).
    ///
    /// `date` need not be a trading day: the count starts at the first bar
    /// strictly after it.
    pub fn after(&self, date: NaiveDate, offset: usize) -> Option<&Bar> {
        if offset == 0 {
            return None;
        }
        let first_after = self.bars.partition_point(|b| b.date <= date);
        self.bars.get(first_after + offset - 1)
    }

    /// The most recent bar strictly earlier than `date`.
    pub fn before(&self, date: NaiveDate) -> Option<&Bar> {
        let idx = self.bars.partition_point(|b| b.date < date);
        idx.checked_sub(1).map(|i| &self.bars[i])
    }

    /// The most recent bar dated on or before `date`.
    pub fn at_or_before(&self, date: NaiveDate) -> Option<&Bar> {
        let idx = self.bars.partition_point(|b| b.date <= date);
        idx.checked_sub(1).map(|i| &self.bars[i])
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn adj_closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.adj_close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}
