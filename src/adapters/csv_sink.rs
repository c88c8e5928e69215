//! CSV implementation of the tabular output port.

use crate::domain::error::ScoreTraderError;
use crate::ports::output_port::TabularSink;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes named float columns as CSV. The header row is emitted with the
/// first data row, after which the column set is fixed.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    columns: Vec<String>,
    row: Vec<Option<f64>>,
    header_written: bool,
}

fn sink_error(e: impl std::fmt::Display) -> ScoreTraderError {
    ScoreTraderError::Sink {
        reason: e.to_string(),
    }
}

impl CsvSink<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ScoreTraderError> {
        let file = File::create(path.as_ref()).map_err(|e| ScoreTraderError::Sink {
            reason: format!("failed to create {}: {}", path.as_ref().display(), e),
        })?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(writer: W) -> Self {
        CsvSink {
            writer: csv::Writer::from_writer(writer),
            columns: Vec::new(),
            row: Vec::new(),
            header_written: false,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn into_inner(self) -> Result<W, ScoreTraderError> {
        self.writer.into_inner().map_err(sink_error)
    }
}

impl<W: Write> TabularSink for CsvSink<W> {
    fn add_column(&mut self, name: &str) -> Result<(), ScoreTraderError> {
        if self.header_written {
            return Err(sink_error(format!(
                "cannot add column {name} after rows were written"
            )));
        }
        if self.columns.iter().any(|c| c == name) {
            return Err(sink_error(format!("duplicate column {name}")));
        }
        self.columns.push(name.to_string());
        self.row.push(None);
        Ok(())
    }

    fn set_column(&mut self, name: &str, value: f64) -> Result<(), ScoreTraderError> {
        let index = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| sink_error(format!("unknown column {name}")))?;
        self.row[index] = Some(value);
        Ok(())
    }

    fn write_row(&mut self) -> Result<(), ScoreTraderError> {
        if !self.header_written {
            self.writer.write_record(&self.columns).map_err(sink_error)?;
            self.header_written = true;
        }
        let record: Vec<String> = self
            .row
            .iter_mut()
            .map(|slot| slot.take().map(|v| v.to_string()).unwrap_or_default())
            .collect();
        self.writer.write_record(&record).map_err(sink_error)
    }

    fn flush(&mut self) -> Result<(), ScoreTraderError> {
        if !self.header_written && !self.columns.is_empty() {
            self.writer.write_record(&self.columns).map_err(sink_error)?;
            self.header_written = true;
        }
        self.writer.flush().map_err(sink_error)
    }
}
