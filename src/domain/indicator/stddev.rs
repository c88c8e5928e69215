//! Rolling population variance and standard deviation.
//!
//! VAR(n)[i] = sum((x[i-j] - mean)^2 for j in 0..n) / n
//! STDDEV(n, k)[i] = sqrt(VAR(n)[i]) * k
//! Lookback n-1.

pub fn variance_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

pub fn variance(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    values
        .windows(period)
        .map(|w| {
            let mean = w.iter().sum::<f64>() / period as f64;
            let var = w.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / period as f64;
            var.max(0.0)
        })
        .collect()
}

pub fn stddev(values: &[f64], period: usize, deviations: f64) -> Vec<f64> {
    variance(values, period)
        .into_iter()
        .map(|v| v.sqrt() * deviations)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_known_value() {
        // mean 5, population variance 4
        let out = stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8, 1.0);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn stddev_scales_by_deviations() {
        let out = stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8, 2.5);
        assert!((out[0] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn variance_rolling() {
        let out = variance(&[1.0, 3.0, 1.0, 3.0], 2);
        assert_eq!(out.len(), 3);
        for v in out {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_prices_zero() {
        for v in stddev(&[100.0; 6], 3, 1.0) {
            assert!(v.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn too_short_is_empty() {
        assert!(variance(&[1.0, 2.0], 3).is_empty());
        assert_eq!(variance_lookback(3), 2);
    }
}
