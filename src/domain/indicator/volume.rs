//! Volume-weighted indicators.
//!
//! MFI(n): 100 * positive flow / (positive + negative flow) over n bars, where
//! flow = typical price * volume, signed by the change in typical price. Lookback n.
//!
//! ADOSC(fast, slow): EMA(fast) - EMA(slow) of the Chaikin accumulation/distribution
//! line. Both EMAs start from the first AD value. Lookback max(fast, slow) - 1.
//!
//! GTND(n): volume minus the mean volume of the preceding n bars. Lookback n.

use super::ema::ema_from_first;
use crate::domain::ohlcv::Bar;

pub fn mfi_lookback(period: usize) -> usize {
    period
}

pub fn mfi(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() <= period {
        return Vec::new();
    }

    // flows[j] describes bar j + 1
    let flows: Vec<(f64, f64)> = bars
        .windows(2)
        .map(|w| {
            let tp_prev = w[0].typical_price();
            let tp = w[1].typical_price();
            let raw = tp * w[1].volume;
            if tp > tp_prev {
                (raw, 0.0)
            } else if tp < tp_prev {
                (0.0, raw)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();

    flows
        .windows(period)
        .map(|w| {
            let pos: f64 = w.iter().map(|f| f.0).sum();
            let neg: f64 = w.iter().map(|f| f.1).sum();
            if pos + neg > 0.0 {
                100.0 * pos / (pos + neg)
            } else {
                0.0
            }
        })
        .collect()
}

/// Cumulative accumulation/distribution line, one value per bar.
pub fn ad_line(bars: &[Bar]) -> Vec<f64> {
    let mut ad = 0.0;
    bars.iter()
        .map(|b| {
            let range = b.high - b.low;
            if range > 0.0 {
                ad += ((b.close - b.low) - (b.high - b.close)) / range * b.volume;
            }
            ad
        })
        .collect()
}

pub fn adosc_lookback(fast: usize, slow: usize) -> usize {
    fast.max(slow).saturating_sub(1)
}

pub fn adosc(bars: &[Bar], fast: usize, slow: usize) -> Vec<f64> {
    let lookback = adosc_lookback(fast, slow);
    if fast == 0 || slow == 0 || bars.len() <= lookback {
        return Vec::new();
    }

    let ad = ad_line(bars);
    let ema_fast = ema_from_first(&ad, fast);
    let ema_slow = ema_from_first(&ad, slow);
    (lookback..bars.len())
        .map(|i| ema_fast[i] - ema_slow[i])
        .collect()
}

pub fn gtnd_lookback(period: usize) -> usize {
    period
}

pub fn gtnd(volumes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || volumes.len() <= period {
        return Vec::new();
    }

    (period..volumes.len())
        .map(|i| {
            let mean = volumes[i - period..i].iter().sum::<f64>() / period as f64;
            volumes[i] - mean
        })
        .collect()
}
