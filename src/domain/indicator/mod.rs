//! Technical indicator definitions and math.
//!
//! This module provides the types that describe an indicator request and the
//! shape of its result:
//! - `IndicatorKind`: the recognised indicator families, parsed by exact name
//! - `IndicatorParams`: optional numeric parameters (period, fast, slow, deviations)
//! - `IndicatorDescriptor`: kind + params + optional title suffix
//! - `IndicatorOutput`: one or more value arrays plus the begin index
//!
//! The math lives in the submodules. Every function there follows the same
//! contract: the returned vector only holds usable values, the first of which
//! corresponds to input index `lookback`.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod range;
pub mod regression;
pub mod roc;
pub mod rsi;
pub mod stddev;
pub mod volume;

use crate::domain::error::ScoreTraderError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Gtnd,
    Mfi,
    Cmo,
    Adx,
    Willr,
    Cci,
    Roc,
    Rocp,
    Rocr,
    Rsi,
    Mom,
    Lslr,
    LslrC,
    LslrM,
    Macd,
    StochRsi,
    Var,
    Stddev,
    Apo,
    Ado,
    Adosc,
    Bbands,
    Bop,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 25] = [
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::Gtnd,
        IndicatorKind::Mfi,
        IndicatorKind::Cmo,
        IndicatorKind::Adx,
        IndicatorKind::Willr,
        IndicatorKind::Cci,
        IndicatorKind::Roc,
        IndicatorKind::Rocp,
        IndicatorKind::Rocr,
        IndicatorKind::Rsi,
        IndicatorKind::Mom,
        IndicatorKind::Lslr,
        IndicatorKind::LslrC,
        IndicatorKind::LslrM,
        IndicatorKind::Macd,
        IndicatorKind::StochRsi,
        IndicatorKind::Var,
        IndicatorKind::Stddev,
        IndicatorKind::Apo,
        IndicatorKind::Ado,
        IndicatorKind::Adosc,
        IndicatorKind::Bbands,
        IndicatorKind::Bop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IndicatorKind::Sma => "SMA",
            IndicatorKind::Ema => "EMA",
            IndicatorKind::Gtnd => "GTND",
            IndicatorKind::Mfi => "MFI",
            IndicatorKind::Cmo => "CMO",
            IndicatorKind::Adx => "ADX",
            IndicatorKind::Willr => "WILLR",
            IndicatorKind::Cci => "CCI",
            IndicatorKind::Roc => "ROC",
            IndicatorKind::Rocp => "ROCP",
            IndicatorKind::Rocr => "ROCR",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Mom => "MOM",
            IndicatorKind::Lslr => "LSLR",
            IndicatorKind::LslrC => "LSLR_C",
            IndicatorKind::LslrM => "LSLR_M",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::StochRsi => "STOCHRSI",
            IndicatorKind::Var => "VAR",
            IndicatorKind::Stddev => "STDDEV",
            IndicatorKind::Apo => "APO",
            IndicatorKind::Ado => "ADO",
            IndicatorKind::Adosc => "ADOSC",
            IndicatorKind::Bbands => "BBANDS",
            IndicatorKind::Bop => "BOP",
        }
    }

    /// Parameters that must be supplied for this kind.
    pub fn required_params(self) -> &'static [ParamKey] {
        use IndicatorKind::*;
        match self {
            Macd | StochRsi => &[ParamKey::Period, ParamKey::Fast, ParamKey::Slow],
            Apo | Ado | Adosc => &[ParamKey::Fast, ParamKey::Slow],
            Bop => &[],
            _ => &[ParamKey::Period],
        }
    }

    /// Smallest accepted value for a period-like parameter.
    pub fn min_period(self, key: ParamKey) -> i64 {
        use IndicatorKind::*;
        match (self, key) {
            (Macd, ParamKey::Period) | (StochRsi, ParamKey::Fast) | (StochRsi, ParamKey::Slow) => {
                1
            }
            (Adx | Cci | Willr | Mfi | Cmo | Rsi | Lslr | LslrC | LslrM | Bbands, _) => 2,
            (Apo | Ado | Adosc | Macd | StochRsi, _) => 2,
            _ => 1,
        }
    }

    /// Component names, in output order. An empty name is the base title.
    pub fn components(self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Macd => &["", "signal", "hist"],
            IndicatorKind::Bbands => &["upper", "middle", "lower"],
            IndicatorKind::StochRsi => &["K", "D"],
            _ => &[""],
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndicatorKind {
    type Err = ScoreTraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| ScoreTraderError::ConfigInvalid {
                section: "indicators".into(),
                key: s.to_string(),
                reason: "unknown indicator kind".into(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKey {
    Period,
    Fast,
    Slow,
}

impl ParamKey {
    pub fn name(self) -> &'static str {
        match self {
            ParamKey::Period => "period",
            ParamKey::Fast => "fast",
            ParamKey::Slow => "slow",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorParams {
    pub period: Option<i64>,
    pub fast: Option<i64>,
    pub slow: Option<i64>,
    pub deviation_up: Option<f64>,
    pub deviation_down: Option<f64>,
}

impl IndicatorParams {
    pub fn period(period: i64) -> Self {
        IndicatorParams {
            period: Some(period),
            ..Default::default()
        }
    }

    pub fn get(&self, key: ParamKey) -> Option<i64> {
        match key {
            ParamKey::Period => self.period,
            ParamKey::Fast => self.fast,
            ParamKey::Slow => self.slow,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorDescriptor {
    pub kind: IndicatorKind,
    pub params: IndicatorParams,
    pub suffix: Option<String>,
}

impl IndicatorDescriptor {
    pub fn new(kind: IndicatorKind, params: IndicatorParams) -> Self {
        IndicatorDescriptor {
            kind,
            params,
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.suffix = if suffix.is_empty() { None } else { Some(suffix) };
        self
    }

    /// KIND, or KIND_suffix.
    pub fn title(&self) -> String {
        match &self.suffix {
            Some(s) => format!("{}_{}", self.kind.name(), s),
            None => self.kind.name().to_string(),
        }
    }

    /// Titles written to the table, one per output component.
    pub fn component_titles(&self) -> Vec<String> {
        let base = self.title();
        self.kind
            .components()
            .iter()
            .map(|c| composite_title(&base, c))
            .collect()
    }

    /// Resolved period-like parameter, failing if a required one is absent
    /// or not positive.
    pub fn require(&self, key: ParamKey) -> Result<usize, ScoreTraderError> {
        let v = self
            .params
            .get(key)
            .ok_or_else(|| ScoreTraderError::invalid_param(&self.title(), key.name(), "required"))?;
        usize::try_from(v).ok().filter(|&p| p > 0).ok_or_else(|| {
            ScoreTraderError::invalid_param(&self.title(), key.name(), format!("must be > 0, got {v}"))
        })
    }

    pub fn validate(&self) -> Result<(), ScoreTraderError> {
        let title = self.title();
        for &key in self.kind.required_params() {
            if self.params.get(key).is_none() {
                return Err(ScoreTraderError::invalid_param(&title, key.name(), "required"));
            }
        }
        for key in [ParamKey::Period, ParamKey::Fast, ParamKey::Slow] {
            if let Some(v) = self.params.get(key) {
                let min = self.kind.min_period(key);
                if v < min {
                    return Err(ScoreTraderError::invalid_param(
                        &title,
                        key.name(),
                        format!("must be >= {min}, got {v}"),
                    ));
                }
            }
        }
        for (name, dev) in [
            ("up", self.params.deviation_up),
            ("down", self.params.deviation_down),
        ] {
            if let Some(d) = dev {
                if d <= 0.0 || !d.is_finite() {
                    return Err(ScoreTraderError::invalid_param(
                        &title,
                        name,
                        format!("deviation must be > 0, got {d}"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Largest `p - 1` over the period-like parameters.
    pub fn period_floor(&self) -> usize {
        [self.params.period, self.params.fast, self.params.slow]
            .into_iter()
            .flatten()
            .filter_map(|p| usize::try_from(p.saturating_sub(1)).ok())
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for IndicatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        let parts: Vec<String> = [self.params.period, self.params.fast, self.params.slow]
            .into_iter()
            .flatten()
            .map(|p| p.to_string())
            .collect();
        if !parts.is_empty() {
            write!(f, "({})", parts.join(","))?;
        }
        if let Some(s) = &self.suffix {
            write!(f, "[{s}]")?;
        }
        Ok(())
    }
}

/// Parses `KIND key=value ...`, e.g. `MACD period=9 fast=12 slow=26`.
///
/// Recognised keys: period, fast, slow, up, down, suffix.
impl FromStr for IndicatorDescriptor {
    type Err = ScoreTraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let kind_str = tokens.next().ok_or_else(|| ScoreTraderError::ConfigInvalid {
            section: "indicators".into(),
            key: s.to_string(),
            reason: "empty indicator definition".into(),
        })?;
        let kind: IndicatorKind = kind_str.parse()?;
        let mut params = IndicatorParams::default();
        let mut suffix = None;

        for token in tokens {
            let (key, value) = token.split_once('=').ok_or_else(|| {
                ScoreTraderError::invalid_param(kind_str, token, "expected key=value")
            })?;
            let bad = |reason: String| ScoreTraderError::invalid_param(kind_str, key, reason);
            match key {
                "period" | "fast" | "slow" => {
                    let v: i64 = value
                        .parse()
                        .map_err(|e| bad(format!("{value}: {e}")))?;
                    match key {
                        "period" => params.period = Some(v),
                        "fast" => params.fast = Some(v),
                        _ => params.slow = Some(v),
                    }
                }
                "up" | "down" => {
                    let v: f64 = value
                        .parse()
                        .map_err(|e| bad(format!("{value}: {e}")))?;
                    if key == "up" {
                        params.deviation_up = Some(v);
                    } else {
                        params.deviation_down = Some(v);
                    }
                }
                "suffix" => suffix = Some(value.to_string()),
                _ => return Err(bad("unknown parameter".into())),
            }
        }

        let descriptor = IndicatorDescriptor::new(kind, params);
        Ok(match suffix {
            Some(s) => descriptor.with_suffix(s),
            None => descriptor,
        })
    }
}

/// `title` or `title_component`.
pub fn composite_title(title: &str, component: &str) -> String {
    if component.is_empty() {
        title.to_string()
    } else {
        format!("{title}_{component}")
    }
}

/// Result of computing one descriptor over a full series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorOutput {
    /// Input index of the first usable value.
    pub begin_index: usize,
    /// One array per component, all of equal length.
    pub components: Vec<Vec<f64>>,
}

impl IndicatorOutput {
    pub fn single(begin_index: usize, values: Vec<f64>) -> Self {
        IndicatorOutput {
            begin_index,
            components: vec![values],
        }
    }

    /// Number of usable values per component.
    pub fn count(&self) -> usize {
        self.components.first().map_or(0, Vec::len)
    }
}
