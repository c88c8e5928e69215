//! In-crate indicator engine backed by [`crate::domain::indicator`].

use crate::domain::error::ScoreTraderError;
use crate::domain::indicator::bollinger::{self, bbands, bbands_lookback};
use crate::domain::indicator::ema::{ema, ema_lookback, sma, sma_lookback};
use crate::domain::indicator::macd::{apo, apo_lookback, macd, macd_lookback};
use crate::domain::indicator::range::{adx, adx_lookback, bop, cci, cci_lookback, willr, willr_lookback};
use crate::domain::indicator::regression::{linear_regression, regression_lookback, RegressionOutput};
use crate::domain::indicator::roc::{change, change_lookback, ChangeForm};
use crate::domain::indicator::rsi::{cmo, rsi, rsi_lookback, stoch_rsi, stoch_rsi_lookback};
use crate::domain::indicator::stddev::{stddev, variance, variance_lookback};
use crate::domain::indicator::volume::{adosc, adosc_lookback, gtnd, gtnd_lookback, mfi, mfi_lookback};
use crate::domain::indicator::{IndicatorDescriptor, IndicatorKind, IndicatorOutput, ParamKey};
use crate::domain::series::PriceSeries;
use crate::ports::indicator_port::IndicatorEngine;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeIndicatorEngine;

impl NativeIndicatorEngine {
    pub fn new() -> Self {
        NativeIndicatorEngine
    }

    /// Number of leading bars consumed before the first output.
    pub fn lookback(descriptor: &IndicatorDescriptor) -> Result<usize, ScoreTraderError> {
        use IndicatorKind::*;
        let period = || descriptor.require(ParamKey::Period);
        let fast = || descriptor.require(ParamKey::Fast);
        let slow = || descriptor.require(ParamKey::Slow);
        Ok(match descriptor.kind {
            Sma => sma_lookback(period()?),
            Ema => ema_lookback(period()?),
            Gtnd => gtnd_lookback(period()?),
            Mfi => mfi_lookback(period()?),
            Cmo | Rsi => rsi_lookback(period()?),
            Adx => adx_lookback(period()?),
            Willr => willr_lookback(period()?),
            Cci => cci_lookback(period()?),
            Roc | Rocp | Rocr | Mom => change_lookback(period()?),
            Lslr | LslrC | LslrM => regression_lookback(period()?),
            Macd => macd_lookback(period()?, fast()?, slow()?),
            StochRsi => stoch_rsi_lookback(period()?, slow()?, fast()?),
            Var | Stddev => variance_lookback(period()?),
            Apo => apo_lookback(fast()?, slow()?),
            Ado | Adosc => adosc_lookback(fast()?, slow()?),
            Bbands => bbands_lookback(period()?),
            Bop => 0,
        })
    }
}

impl IndicatorEngine for NativeIndicatorEngine {
    fn compute(
        &self,
        descriptor: &IndicatorDescriptor,
        series: &PriceSeries,
    ) -> Result<IndicatorOutput, ScoreTraderError> {
        use IndicatorKind::*;

        let lookback = Self::lookback(descriptor)?;
        if series.len() <= lookback {
            return Err(ScoreTraderError::InsufficientData {
                title: descriptor.title(),
                bars: series.len(),
                lookback,
            });
        }

        let period = || descriptor.require(ParamKey::Period);
        let fast = || descriptor.require(ParamKey::Fast);
        let slow = || descriptor.require(ParamKey::Slow);
        let bars = series.bars();
        let closes = series.closes();
        let params = &descriptor.params;

        let components = match descriptor.kind {
            Sma => vec![sma(&closes, period()?)],
            Ema => vec![ema(&closes, period()?)],
            Gtnd => vec![gtnd(&series.volumes(), period()?)],
            Mfi => vec![mfi(bars, period()?)],
            Cmo => vec![cmo(&closes, period()?)],
            Rsi => vec![rsi(&closes, period()?)],
            Adx => vec![adx(bars, period()?)],
            Willr => vec![willr(bars, period()?)],
            Cci => vec![cci(bars, period()?)],
            Roc => vec![change(&closes, period()?, ChangeForm::Percent)],
            Rocp => vec![change(&closes, period()?, ChangeForm::Fraction)],
            Rocr => vec![change(&closes, period()?, ChangeForm::Ratio)],
            Mom => vec![change(&closes, period()?, ChangeForm::Momentum)],
            Lslr => vec![linear_regression(&closes, period()?, RegressionOutput::Value)],
            LslrC => vec![linear_regression(&closes, period()?, RegressionOutput::Intercept)],
            LslrM => vec![linear_regression(&closes, period()?, RegressionOutput::Slope)],
            Macd => {
                let (line, signal, hist) = macd(&closes, period()?, fast()?, slow()?);
                vec![line, signal, hist]
            }
            // slow sizes the %K window, fast smooths %D
            StochRsi => {
                let (k, d) = stoch_rsi(&closes, period()?, slow()?, fast()?);
                vec![k, d]
            }
            Var => vec![variance(&closes, period()?)],
            Stddev => vec![stddev(
                &closes,
                period()?,
                params.deviation_up.unwrap_or(1.0),
            )],
            Apo => vec![apo(&closes, fast()?, slow()?)],
            Ado | Adosc => vec![adosc(bars, fast()?, slow()?)],
            Bbands => {
                let (upper, middle, lower) = bbands(
                    &closes,
                    period()?,
                    params.deviation_up.unwrap_or(bollinger::DEFAULT_DEVIATIONS),
                    params.deviation_down.unwrap_or(bollinger::DEFAULT_DEVIATIONS),
                );
                vec![upper, middle, lower]
            }
            Bop => vec![bop(bars)],
        };

        let output = IndicatorOutput {
            begin_index: lookback,
            components,
        };
        if output.count() != series.len() - lookback {
            return Err(ScoreTraderError::InsufficientData {
                title: descriptor.title(),
                bars: series.len(),
                lookback,
            });
        }
        Ok(output)
    }
}
