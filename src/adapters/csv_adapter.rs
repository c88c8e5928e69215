//! CSV file data adapter.
//!
//! Reads `<instrument>.csv` from a base directory. Columns are located by
//! header name, so column order does not matter. `adj_close` is optional and
//! falls back to `close`.

use crate::domain::error::ScoreTraderError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    adj_close: Option<usize>,
    volume: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ScoreTraderError> {
        let normalised: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_lowercase().replace([' ', '-'], "_"))
            .collect();
        let find = |names: &[&str]| normalised.iter().position(|h| names.contains(&h.as_str()));
        let require = |name: &str| {
            find(&[name]).ok_or_else(|| ScoreTraderError::Data {
                reason: format!("missing {name} column"),
            })
        };
        Ok(Columns {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            adj_close: find(&["adj_close", "adjclose", "adjusted_close"]),
            volume: require("volume")?,
        })
    }
}

fn field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, ScoreTraderError> {
    let raw = record.get(index).ok_or_else(|| ScoreTraderError::Data {
        reason: format!("missing {name} value"),
    })?;
    raw.trim().parse().map_err(|e| ScoreTraderError::Data {
        reason: format!("invalid {name} value {raw:?}: {e}"),
    })
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, ScoreTraderError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| ScoreTraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| ScoreTraderError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let cols = Columns::from_headers(headers)?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| ScoreTraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(cols.date).ok_or_else(|| ScoreTraderError::Data {
                reason: "missing date value".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT).map_err(|e| {
                ScoreTraderError::Data {
                    reason: format!("invalid date {date_str:?}: {e}"),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            let close = field(&record, cols.close, "close")?;
            let adj_close = match cols.adj_close {
                Some(index) => field(&record, index, "adj_close")?,
                None => close,
            };

            bars.push(Bar {
                date,
                open: field(&record, cols.open, "open")?,
                high: field(&record, cols.high, "high")?,
                low: field(&record, cols.low, "low")?,
                close,
                adj_close,
                volume: field(&record, cols.volume, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_instruments(&self) -> Result<Vec<String>, ScoreTraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ScoreTraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ScoreTraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                instruments.push(stem.to_string());
            }
        }

        instruments.sort();
        Ok(instruments)
    }
}
