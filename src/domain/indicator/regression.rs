//! Least-squares linear regression over a rolling window.
//!
//! The window x = 0..n-1 is fitted with y = b + m*x.
//! LSLR is the fitted value at the last point (b + m*(n-1)), LSLR_M the slope m,
//! LSLR_C the intercept b. Lookback n-1.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressionOutput {
    Value,
    Intercept,
    Slope,
}

pub fn regression_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

pub fn linear_regression(values: &[f64], period: usize, output: RegressionOutput) -> Vec<f64> {
    if period < 2 || values.len() < period {
        return Vec::new();
    }

    let n = period as f64;
    let sum_x = n * (n - 1.0) / 2.0;
    let sum_xx = (n - 1.0) * n * (2.0 * n - 1.0) / 6.0;
    let divisor = n * sum_xx - sum_x * sum_x;

    values
        .windows(period)
        .map(|w| {
            let sum_y: f64 = w.iter().sum();
            let sum_xy: f64 = w.iter().enumerate().map(|(x, y)| x as f64 * y).sum();
            let m = (n * sum_xy - sum_x * sum_y) / divisor;
            let b = (sum_y - m * sum_x) / n;
            match output {
                RegressionOutput::Value => b + m * (n - 1.0),
                RegressionOutput::Intercept => b,
                RegressionOutput::Slope => m,
            }
        })
        .collect()
}
