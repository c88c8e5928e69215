//! Indicators built on the bar's high/low range.
//!
//! ADX(n):   Wilder-smoothed directional movement index. Lookback 2n-1.
//! WILLR(n): (HH - C) / (HH - LL) * -100 over n bars. Lookback n-1.
//! CCI(n):   (TP - SMA(TP)) / (0.015 * mean deviation). Lookback n-1.
//! BOP:      (C - O) / (H - L). Lookback 0.
//! A degenerate denominator yields 0.

use crate::domain::ohlcv::Bar;

pub fn adx_lookback(period: usize) -> usize {
    (2 * period).saturating_sub(1)
}

pub fn adx(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() <= adx_lookback(period) {
        return Vec::new();
    }

    let n = period as f64;
    let mut plus_dm = 0.0;
    let mut minus_dm = 0.0;
    let mut tr = 0.0;
    let mut dx_window = Vec::with_capacity(period);
    let mut out = Vec::with_capacity(bars.len() - adx_lookback(period));
    let mut adx = 0.0;

    for i in 1..bars.len() {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        let pdm = if up > down && up > 0.0 { up } else { 0.0 };
        let mdm = if down > up && down > 0.0 { down } else { 0.0 };
        let cur_tr = bars[i].true_range(bars[i - 1].close);

        if i <= period {
            plus_dm += pdm;
            minus_dm += mdm;
            tr += cur_tr;
            if i < period {
                continue;
            }
        } else {
            plus_dm = plus_dm - plus_dm / n + pdm;
            minus_dm = minus_dm - minus_dm / n + mdm;
            tr = tr - tr / n + cur_tr;
        }

        let dx = if tr > 0.0 {
            let plus_di = 100.0 * plus_dm / tr;
            let minus_di = 100.0 * minus_dm / tr;
            let sum = plus_di + minus_di;
            if sum > 0.0 {
                100.0 * (plus_di - minus_di).abs() / sum
            } else {
                0.0
            }
        } else {
            0.0
        };

        if dx_window.len() < period {
            dx_window.push(dx);
            if dx_window.len() == period {
                adx = dx_window.iter().sum::<f64>() / n;
                out.push(adx);
            }
        } else {
            adx = (adx * (n - 1.0) + dx) / n;
            out.push(adx);
        }
    }
    out
}

pub fn willr_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

pub fn willr(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    bars.windows(period)
        .map(|w| {
            let hh = w.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let ll = w.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let close = w[w.len() - 1].close;
            if hh > ll {
                (hh - close) / (hh - ll) * -100.0
            } else {
                0.0
            }
        })
        .collect()
}

pub fn cci_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

pub fn cci(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    let tp: Vec<f64> = bars.iter().map(Bar::typical_price).collect();
    tp.windows(period)
        .map(|w| {
            let mean = w.iter().sum::<f64>() / period as f64;
            let mean_dev = w.iter().map(|x| (x - mean).abs()).sum::<f64>() / period as f64;
            let last = w[w.len() - 1];
            if mean_dev > 0.0 {
                (last - mean) / (0.015 * mean_dev)
            } else {
                0.0
            }
        })
        .collect()
}

pub fn bop(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .map(|b| {
            let range = b.high - b.low;
            if range > 0.0 {
                (b.close - b.open) / range
            } else {
                0.0
            }
        })
        .collect()
}
