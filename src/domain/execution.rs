//! Threshold entry with a fixed holding horizon.
//!
//! Entry fills at the open of the bar after the signal date. The exit fills at
//! the open of the bar `horizon` bars after the signal date and is booked in
//! the same call.

use chrono::NaiveDate;
use log::debug;

use super::decision::passes_threshold;
use super::position_book::PositionBook;
use super::series::PriceSeries;

/// Result of a buy attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BuyOutcome {
    Traded {
        position_id: usize,
        entry_date: NaiveDate,
        entry_price: f64,
        exit_date: NaiveDate,
        exit_price: f64,
        closed: usize,
    },
    AlreadyOpen,
    NoExitBar,
    BelowThreshold,
    NoEntryBar,
}

impl BuyOutcome {
    pub fn is_trade(&self) -> bool {
        matches!(self, BuyOutcome::Traded { .. })
    }
}

/// Attempts to open a position for `series.instrument` on the signal of `date`.
///
/// Checks, in order: no open position, an exit bar `horizon` bars ahead, the
/// threshold, and a next bar to enter on. Any failed check leaves the book
/// unchanged.
pub fn check_buy(
    book: &mut PositionBook,
    series: &PriceSeries,
    date: NaiveDate,
    signal: f64,
    cut: f64,
    horizon: usize,
) -> BuyOutcome {
    let instrument = series.instrument.as_str();
    if book.has_open(instrument) {
        debug!("{date}: {instrument} already has an open position");
        return BuyOutcome::AlreadyOpen;
    }

    let Some(exit_bar) = series.after(date, horizon) else {
        debug!("{date}: no bar {horizon} days ahead to close on");
        return BuyOutcome::NoExitBar;
    };

    if !passes_threshold(signal, cut) {
        return BuyOutcome::BelowThreshold;
    }

    let Some(entry_bar) = series.after(date, 1) else {
        debug!("{date}: no next bar to enter on");
        return BuyOutcome::NoEntryBar;
    };

    let Some(position_id) = book.open(instrument, entry_bar.date, entry_bar.open) else {
        return BuyOutcome::AlreadyOpen;
    };
    let closed = book.close_all_open(instrument, exit_bar.date, exit_bar.open);
    debug!(
        "{date}: signal {signal:.4} >= {cut:.4}, bought {instrument} {} @ {:.4}, sold {} @ {:.4}",
        entry_bar.date, entry_bar.open, exit_bar.date, exit_bar.open
    );

    BuyOutcome::Traded {
        position_id,
        entry_date: entry_bar.date,
        entry_price: entry_bar.open,
        exit_date: exit_bar.date,
        exit_price: exit_bar.open,
        closed,
    }
}
