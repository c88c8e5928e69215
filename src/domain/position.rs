//! Long position lifecycle.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: usize,
    pub instrument: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<f64>,
    pub status: PositionStatus,
}

impl Position {
    pub fn open(id: usize, instrument: &str, entry_date: NaiveDate, entry_price: f64) -> Self {
        Position {
            id,
            instrument: instrument.to_string(),
            entry_date,
            entry_price,
            exit_date: None,
            exit_price: None,
            status: PositionStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Marks the position closed. Closing twice keeps the first exit.
    pub fn close(&mut self, exit_date: NaiveDate, exit_price: f64) {
        if !self.is_open() {
            return;
        }
        self.exit_date = Some(exit_date);
        self.exit_price = Some(exit_price);
        self.status = PositionStatus::Closed;
    }

    /// exit / entry - 1, once closed.
    pub fn return_pct(&self) -> Option<f64> {
        let exit = self.exit_price?;
        if self.entry_price == 0.0 {
            return None;
        }
        Some(exit / self.entry_price - 1.0)
    }

    pub fn holding_days(&self) -> Option<i64> {
        self.exit_date.map(|d| (d - self.entry_date).num_days())
    }
}
