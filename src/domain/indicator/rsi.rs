//! Wilder-smoothed oscillators: RSI, CMO and the stochastic RSI.
//!
//! avg_gain/avg_loss are seeded with the mean of the first n changes, then
//! smoothed with avg = (prev*(n-1) + cur)/n.
//! RSI = 100 * g/(g+l), CMO = 100 * (g-l)/(g+l); both 0 on a flat window.
//! Lookback n.
//!
//! STOCHRSI applies a fast stochastic (K window, SMA(D) smoothing) to the RSI.
//! Lookback n + (K-1) + (D-1).

use super::ema::sma;

pub fn rsi_lookback(period: usize) -> usize {
    period
}

fn wilder_averages(values: &[f64], period: usize) -> Vec<(f64, f64)> {
    if period == 0 || values.len() <= period {
        return Vec::new();
    }

    let mut gain = 0.0;
    let mut loss = 0.0;
    for i in 1..=period {
        let diff = values[i] - values[i - 1];
        if diff > 0.0 {
            gain += diff;
        } else {
            loss -= diff;
        }
    }
    gain /= period as f64;
    loss /= period as f64;

    let n = period as f64;
    let mut out = Vec::with_capacity(values.len() - period);
    out.push((gain, loss));
    for i in (period + 1)..values.len() {
        let diff = values[i] - values[i - 1];
        let (g, l) = if diff > 0.0 { (diff, 0.0) } else { (0.0, -diff) };
        gain = (gain * (n - 1.0) + g) / n;
        loss = (loss * (n - 1.0) + l) / n;
        out.push((gain, loss));
    }
    out
}

pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    wilder_averages(values, period)
        .into_iter()
        .map(|(g, l)| if g + l == 0.0 { 0.0 } else { 100.0 * g / (g + l) })
        .collect()
}

pub fn cmo(values: &[f64], period: usize) -> Vec<f64> {
    wilder_averages(values, period)
        .into_iter()
        .map(|(g, l)| {
            if g + l == 0.0 {
                0.0
            } else {
                100.0 * (g - l) / (g + l)
            }
        })
        .collect()
}

pub fn stoch_rsi_lookback(period: usize, k_period: usize, d_period: usize) -> usize {
    rsi_lookback(period) + k_period.saturating_sub(1) + d_period.saturating_sub(1)
}

/// Returns (fast K, fast D), equal length.
pub fn stoch_rsi(
    values: &[f64],
    period: usize,
    k_period: usize,
    d_period: usize,
) -> (Vec<f64>, Vec<f64>) {
    if k_period == 0 || d_period == 0 {
        return (Vec::new(), Vec::new());
    }
    let rsi_values = rsi(values, period);
    if rsi_values.len() < k_period {
        return (Vec::new(), Vec::new());
    }

    let fast_k: Vec<f64> = rsi_values
        .windows(k_period)
        .map(|w| {
            let hh = w.iter().copied().fold(f64::MIN, f64::max);
            let ll = w.iter().copied().fold(f64::MAX, f64::min);
            let last = w[w.len() - 1];
            if hh > ll {
                100.0 * (last - ll) / (hh - ll)
            } else {
                0.0
            }
        })
        .collect();

    let fast_d = sma(&fast_k, d_period);
    if fast_d.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let k_aligned = fast_k[d_period - 1..].to_vec();
    (k_aligned, fast_d)
}
