//! Bollinger Bands.
//!
//! Middle = SMA(n), Upper = Middle + up * STDDEV(n), Lower = Middle - down * STDDEV(n).
//! Population standard deviation. Lookback n-1.

use super::ema::sma;
use super::stddev::stddev;

pub const DEFAULT_DEVIATIONS: f64 = 2.0;

pub fn bbands_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

/// Returns (upper, middle, lower), equal length.
pub fn bbands(values: &[f64], period: usize, up: f64, down: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let middle = sma(values, period);
    let sd = stddev(values, period, 1.0);
    let upper = middle.iter().zip(&sd).map(|(m, s)| m + up * s).collect();
    let lower = middle.iter().zip(&sd).map(|(m, s)| m - down * s).collect();
    (upper, middle, lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_around_sma() {
        let prices = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let (upper, middle, lower) = bbands(&prices, 8, 2.0, 1.0);
        assert!((middle[0] - 5.0).abs() < 1e-9);
        assert!((upper[0] - 9.0).abs() < 1e-9);
        assert!((lower[0] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn constant_prices_collapse() {
        let (upper, middle, lower) = bbands(&[100.0; 5], 3, 2.0, 2.0);
        assert_eq!(middle.len(), 3);
        for i in 0..3 {
            assert!((upper[i] - middle[i]).abs() < f64::EPSILON);
            assert!((lower[i] - middle[i]).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn upper_above_lower() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + ((i * 3) % 7) as f64).collect();
        let (upper, middle, lower) = bbands(&prices, 5, 2.0, 2.0);
        for i in 0..middle.len() {
            assert!(upper[i] >= middle[i]);
            assert!(middle[i] >= lower[i]);
        }
    }
}
