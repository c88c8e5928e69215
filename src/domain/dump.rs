//! Per-date export of leaf indicator values with forward-change labels.
//!
//! For each eligible bar, `change = close[i + horizon] / close[i]`. Rows whose
//! price did not move are skipped. Rising rows are labelled signal, the rest
//! background, with weight columns for classifier training.

use log::{info, warn};

use super::backtest::Leaf;
use super::error::ScoreTraderError;
use super::indicator_store::IndicatorStore;
use super::point_in_time::PointInTimeAccessor;
use crate::ports::output_port::TabularSink;
use chrono::Datelike;

pub const LABEL_COLUMNS: [&str; 8] = [
    "day",
    "month",
    "year",
    "close",
    "nsig",
    "nbkg",
    "nsig_S_sw",
    "nbkg_B_sw",
];

/// Label values for a forward change ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeLabels {
    pub nsig: f64,
    pub nbkg: f64,
    pub nsig_s_sw: f64,
    pub nbkg_b_sw: f64,
}

impl ChangeLabels {
    pub fn from_change(change: f64) -> Self {
        if change > 1.0 {
            ChangeLabels {
                nsig: change,
                nbkg: 0.0,
                nsig_s_sw: change,
                nbkg_b_sw: 1.0 - change,
            }
        } else {
            ChangeLabels {
                nsig: 0.0,
                nbkg: 2.0 - change,
                nsig_s_sw: change - 1.0,
                nbkg_b_sw: 2.0 - change,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpStats {
    pub rows: usize,
    pub unchanged: usize,
    pub day_errors: usize,
}

/// Writes one row per eligible date to `sink`.
pub fn dump_indicators(
    store: &IndicatorStore,
    leaves: &[Leaf],
    holding_horizon: usize,
    sink: &mut dyn TabularSink,
) -> Result<DumpStats, ScoreTraderError> {
    let start = store.start_index().ok_or(ScoreTraderError::NotSetUp)?;
    let series = store.series();
    let accessor = PointInTimeAccessor::new(store);

    for column in LABEL_COLUMNS {
        sink.add_column(column)?;
    }
    let leaf_names: Vec<String> = leaves.iter().map(Leaf::name).collect();
    for name in &leaf_names {
        sink.add_column(name)?;
    }

    let mut stats = DumpStats::default();
    let Some(end) = series.len().checked_sub(holding_horizon + 1) else {
        sink.flush()?;
        return Ok(stats);
    };

    'dates: for index in start..=end {
        let (Some(bar), Some(future)) = (series.get(index), series.get(index + holding_horizon))
        else {
            break;
        };
        if bar.close == 0.0 {
            stats.day_errors += 1;
            continue;
        }
        let change = future.close / bar.close;
        if change == 1.0 {
            stats.unchanged += 1;
            continue;
        }

        let mut values = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            match leaf.evaluate(&accessor, bar.date) {
                Ok(v) => values.push(v),
                Err(e) => {
                    warn!("{}: {e}, skipping", bar.date);
                    stats.day_errors += 1;
                    continue 'dates;
                }
            }
        }

        let labels = ChangeLabels::from_change(change);
        sink.set_column("day", bar.date.day() as f64)?;
        sink.set_column("month", bar.date.month() as f64)?;
        sink.set_column("year", bar.date.year() as f64)?;
        sink.set_column("close", bar.close)?;
        sink.set_column("nsig", labels.nsig)?;
        sink.set_column("nbkg", labels.nbkg)?;
        sink.set_column("nsig_S_sw", labels.nsig_s_sw)?;
        sink.set_column("nbkg_B_sw", labels.nbkg_b_sw)?;
        for (name, value) in leaf_names.iter().zip(values) {
            sink.set_column(name, value)?;
        }
        sink.write_row()?;
        stats.rows += 1;
    }

    sink.flush()?;
    info!(
        "{}: dumped {} rows, {} unchanged, {} skipped",
        series.instrument, stats.rows, stats.unchanged, stats.day_errors
    );
    Ok(stats)
}
