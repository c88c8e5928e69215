//! Per-run trade statistics and the sweep summary table.

use super::backtest::BacktestResult;
use super::error::ScoreTraderError;
use super::position::Position;
use super::sweep::SweepOutcome;
use crate::ports::output_port::TabularSink;
use chrono::NaiveDate;

const DAYS_PER_YEAR: f64 = 365.25;

pub const SUMMARY_COLUMNS: [&str; 13] = [
    "iteration",
    "cut_value",
    "seed",
    "n_positions",
    "roi",
    "avg",
    "stddev",
    "skew",
    "max_drawdown",
    "win_rate",
    "sharpe",
    "cagr",
    "avg_holding_days",
];

#[derive(Debug, Clone, PartialEq)]
pub struct TradeSummary {
    pub n_positions: usize,
    /// Compounded return over all trades.
    pub roi: f64,
    pub avg: f64,
    /// Sample standard deviation of per-trade returns.
    pub stddev: f64,
    pub skew: f64,
    /// Largest peak-to-trough fall of the compounded trade equity.
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// avg / stddev, per trade.
    pub sharpe: f64,
    pub cagr: f64,
    pub avg_holding_days: f64,
}

impl TradeSummary {
    pub fn compute(positions: &[Position]) -> Self {
        let closed: Vec<&Position> = positions.iter().filter(|p| !p.is_open()).collect();
        let returns: Vec<f64> = closed.iter().filter_map(|p| p.return_pct()).collect();
        let n = returns.len();

        let roi = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
        let (avg, stddev, skew) = moments(&returns);
        let wins = returns.iter().filter(|&&r| r > 0.0).count();
        let win_rate = if n > 0 { wins as f64 / n as f64 } else { 0.0 };
        let sharpe = if stddev > 0.0 { avg / stddev } else { 0.0 };

        let span = date_span(&closed);
        let cagr = match span {
            Some(days) if days > 0 && roi > -1.0 => {
                (1.0 + roi).powf(DAYS_PER_YEAR / days as f64) - 1.0
            }
            _ => 0.0,
        };
        let holding: Vec<i64> = closed.iter().filter_map(|p| p.holding_days()).collect();
        let avg_holding_days = if holding.is_empty() {
            0.0
        } else {
            holding.iter().sum::<i64>() as f64 / holding.len() as f64
        };

        TradeSummary {
            n_positions: n,
            roi,
            avg,
            stddev,
            skew,
            max_drawdown: compute_drawdown(&returns),
            win_rate,
            sharpe,
            cagr,
            avg_holding_days,
        }
    }

    pub fn from_result(result: &BacktestResult) -> Self {
        Self::compute(&result.positions)
    }
}

/// (mean, sample stddev, sample skewness); zeros where undefined.
fn moments(returns: &[f64]) -> (f64, f64, f64) {
    let n = returns.len();
    if n == 0 {
        return (0.0, 0.0, 0.0);
    }
    let nf = n as f64;
    let mean = returns.iter().sum::<f64>() / nf;
    if n < 2 {
        return (mean, 0.0, 0.0);
    }

    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (nf - 1.0);
    let stddev = variance.sqrt();
    let skew = if n > 2 && stddev > 0.0 {
        let m3 = returns.iter().map(|r| ((r - mean) / stddev).powi(3)).sum::<f64>();
        m3 * nf / ((nf - 1.0) * (nf - 2.0))
    } else {
        0.0
    };
    (mean, stddev, skew)
}

fn compute_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut max_dd = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak);
        }
    }
    max_dd
}

fn date_span(closed: &[&Position]) -> Option<i64> {
    let first: NaiveDate = closed.iter().map(|p| p.entry_date).min()?;
    let last: NaiveDate = closed.iter().filter_map(|p| p.exit_date).max()?;
    Some((last - first).num_days())
}

/// Writes one summary row per completed iteration, in iteration order.
pub fn write_summaries(
    sink: &mut dyn TabularSink,
    outcome: &SweepOutcome,
) -> Result<usize, ScoreTraderError> {
    for column in SUMMARY_COLUMNS {
        sink.add_column(column)?;
    }
    let mut rows = 0;
    for (index, result) in outcome.completed() {
        let s = TradeSummary::from_result(result);
        let values = [
            index as f64,
            result.cut_value,
            result.seed as f64,
            s.n_positions as f64,
            s.roi,
            s.avg,
            s.stddev,
            s.skew,
            s.max_drawdown,
            s.win_rate,
            s.sharpe,
            s.cagr,
            s.avg_holding_days,
        ];
        for (column, value) in SUMMARY_COLUMNS.iter().zip(values) {
            sink.set_column(column, value)?;
        }
        sink.write_row()?;
        rows += 1;
    }
    sink.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn closed(entry: u32, entry_price: f64, exit: u32, exit_price: f64) -> Position {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let mut p = Position::open(0, "BHP", d(entry), entry_price);
        p.close(d(exit), exit_price);
        p
    }

    #[test]
    fn empty_positions() {
        let s = TradeSummary::compute(&[]);
        assert_eq!(s.n_positions, 0);
        assert_eq!(s.roi, 0.0);
        assert_eq!(s.sharpe, 0.0);
        assert_eq!(s.max_drawdown, 0.0);
    }

    #[test]
    fn compounded_roi_and_win_rate() {
        let positions = vec![
            closed(1, 100.0, 8, 110.0),
            closed(9, 100.0, 16, 90.0),
            closed(17, 100.0, 24, 120.0),
        ];
        let s = TradeSummary::compute(&positions);
        assert_eq!(s.n_positions, 3);
        assert_relative_eq!(s.roi, 1.1 * 0.9 * 1.2 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.avg, (0.1 - 0.1 + 0.2) / 3.0, epsilon = 1e-12);
        assert_relative_eq!(s.win_rate, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(s.avg_holding_days, 7.0, epsilon = 1e-12);
        // peak 1.1, trough 0.99
        assert_relative_eq!(s.max_drawdown, 0.1, epsilon = 1e-12);
        assert!(s.sharpe > 0.0);
    }

    #[test]
    fn sample_stddev() {
        let positions = vec![closed(1, 100.0, 2, 101.0), closed(3, 100.0, 4, 103.0)];
        let s = TradeSummary::compute(&positions);
        // returns 0.01, 0.03: sample sd = sqrt(0.0002)
        assert_relative_eq!(s.stddev, 0.0002_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(s.skew, 0.0);
    }

    #[test]
    fn skew_sign() {
        let positions = vec![
            closed(1, 100.0, 2, 100.0),
            closed(3, 100.0, 4, 100.0),
            closed(5, 100.0, 6, 130.0),
        ];
        assert!(TradeSummary::compute(&positions).skew > 0.0);
    }

    #[test]
    fn open_positions_are_ignored() {
        let open = Position::open(1, "BHP", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 100.0);
        let s = TradeSummary::compute(&[open, closed(2, 100.0, 9, 105.0)]);
        assert_eq!(s.n_positions, 1);
        assert_relative_eq!(s.roi, 0.05, epsilon = 1e-12);
    }
}
