//! Rate of change family and momentum over n bars.
//!
//! ROC  = (x[i]/x[i-n] - 1) * 100
//! ROCP = (x[i] - x[i-n]) / x[i-n]
//! ROCR = x[i] / x[i-n]
//! MOM  = x[i] - x[i-n]
//! Lookback n. A zero reference price yields 0.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeForm {
    Percent,
    Fraction,
    Ratio,
    Momentum,
}

pub fn change_lookback(period: usize) -> usize {
    period
}

pub fn change(values: &[f64], period: usize, form: ChangeForm) -> Vec<f64> {
    if period == 0 || values.len() <= period {
        return Vec::new();
    }

    (period..values.len())
        .map(|i| {
            let prev = values[i - period];
            let cur = values[i];
            match form {
                ChangeForm::Momentum => cur - prev,
                _ if prev == 0.0 => 0.0,
                ChangeForm::Percent => (cur / prev - 1.0) * 100.0,
                ChangeForm::Fraction => (cur - prev) / prev,
                ChangeForm::Ratio => cur / prev,
            }
        })
        .collect()
}
