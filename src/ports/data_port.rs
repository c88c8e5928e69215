//! Price data access port trait.

use crate::domain::error::ScoreTraderError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `instrument` within `[start_date, end_date]`, sorted by date.
    fn fetch_bars(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, ScoreTraderError>;

    fn list_instruments(&self) -> Result<Vec<String>, ScoreTraderError>;
}
