//! MACD and the absolute price oscillator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Fast and slow are swapped when given out of order.
//! Warmup: slow - 1 + signal - 1 bars. APO is the bare MACD line, warmup slow - 1.

use super::ema::ema;

fn ordered(fast: usize, slow: usize) -> (usize, usize) {
    if fast > slow { (slow, fast) } else { (fast, slow) }
}

/// EMA(fast) - EMA(slow), first value at input index slow - 1.
fn oscillator_line(values: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let (fast, slow) = ordered(fast, slow);
    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);
    if ema_slow.is_empty() {
        return Vec::new();
    }
    let offset = slow - fast;
    ema_slow
        .iter()
        .enumerate()
        .map(|(j, s)| ema_fast[j + offset] - s)
        .collect()
}

pub fn macd_lookback(signal: usize, fast: usize, slow: usize) -> usize {
    let (_, slow) = ordered(fast, slow);
    slow.saturating_sub(1) + signal.saturating_sub(1)
}

/// Returns (line, signal, histogram), equal length.
pub fn macd(
    values: &[f64],
    signal_period: usize,
    fast: usize,
    slow: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    if fast == 0 || slow == 0 || signal_period == 0 {
        return (Vec::new(), Vec::new(), Vec::new());
    }
    let line = oscillator_line(values, fast, slow);
    let signal = ema(&line, signal_period);
    if signal.is_empty() {
        return (Vec::new(), Vec::new(), Vec::new());
    }

    let line = line[signal_period - 1..].to_vec();
    let hist = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
    (line, signal, hist)
}

pub fn apo_lookback(fast: usize, slow: usize) -> usize {
    fast.max(slow).saturating_sub(1)
}

pub fn apo(values: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    if fast == 0 || slow == 0 {
        return Vec::new();
    }
    oscillator_line(values, fast, slow)
}
