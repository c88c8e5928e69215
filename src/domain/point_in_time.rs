//! Look-ahead free reads of the indicator table.
//!
//! A lookup resolves to the most recent row carrying the title whose date is
//! on or before (`evaluate_at_or_before`) or strictly before
//! (`evaluate_before`) the query date. Rows need not exist on the query date.

use crate::domain::error::LookupError;
use crate::domain::indicator::composite_title;
use crate::domain::indicator_store::IndicatorStore;
use chrono::NaiveDate;

/// A value together with the date of the row it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointValue {
    pub source_date: NaiveDate,
    pub value: f64,
}

#[derive(Clone, Copy)]
pub struct PointInTimeAccessor<'a> {
    store: &'a IndicatorStore,
}

impl<'a> PointInTimeAccessor<'a> {
    pub fn new(store: &'a IndicatorStore) -> Self {
        PointInTimeAccessor { store }
    }

    pub fn store(&self) -> &'a IndicatorStore {
        self.store
    }

    pub fn evaluate_at_or_before(
        &self,
        title: &str,
        date: NaiveDate,
        component: &str,
    ) -> Result<PointValue, LookupError> {
        let full = self.resolve(title, date, component)?;
        self.store
            .table()
            .latest_in(..=date, &full)
            .map(|(source_date, value)| PointValue { source_date, value })
            .ok_or(LookupError::NoValue { title: full, date })
    }

    pub fn evaluate_before(
        &self,
        title: &str,
        date: NaiveDate,
        component: &str,
    ) -> Result<PointValue, LookupError> {
        let full = self.resolve(title, date, component)?;
        self.store
            .table()
            .latest_in(..date, &full)
            .map(|(source_date, value)| PointValue { source_date, value })
            .ok_or(LookupError::NoValue { title: full, date })
    }

    fn resolve(&self, title: &str, date: NaiveDate, component: &str) -> Result<String, LookupError> {
        let full = composite_title(title, component);
        let series_start = self.store.series().first_date();
        if let Some(series_start) = series_start.filter(|start| date < *start) {
            return Err(LookupError::OutOfRange {
                title: full,
                date,
                series_start,
            });
        }
        if !self.store.has_title(&full) {
            return Err(LookupError::UnknownTitle { title: full });
        }
        match series_start {
            Some(_) => Ok(full),
            None => Err(LookupError::NoValue { title: full, date }),
        }
    }
}
