//! Simple and exponential moving averages.
//!
//! SMA(n)[i] = mean(x[i-n+1..=i]). Lookback n-1.
//! EMA(n): k = 2/(n+1), seeded with the first SMA, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k). Lookback n-1.

pub fn sma_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut sum: f64 = values[..period].iter().sum();
    out.push(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out.push(sum / period as f64);
    }
    out
}

pub fn ema_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out.push(ema);
    for &x in &values[period..] {
        ema = x * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

/// EMA seeded with the first input value instead of an SMA; one output per input.
pub fn ema_from_first(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = first;
    let mut out = Vec::with_capacity(values.len());
    out.push(ema);
    for &x in &values[1..] {
        ema = x * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}
