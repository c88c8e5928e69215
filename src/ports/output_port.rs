//! Tabular output port trait.

use crate::domain::error::ScoreTraderError;

/// Row-oriented sink of named float columns.
///
/// Columns are declared once with `add_column`, filled with `set_column`, and
/// committed with `write_row`. Unset columns are written empty.
pub trait TabularSink {
    fn add_column(&mut self, name: &str) -> Result<(), ScoreTraderError>;
    fn set_column(&mut self, name: &str, value: f64) -> Result<(), ScoreTraderError>;
    fn write_row(&mut self) -> Result<(), ScoreTraderError>;
    fn flush(&mut self) -> Result<(), ScoreTraderError> {
        Ok(())
    }
}
