//! Domain error types.
//!
//! Two categories: [`ScoreTraderError`] for setup and run-level failures that
//! are surfaced to the caller, and [`DayError`] for failures confined to a
//! single simulated date, which the backtest loop logs and skips.

use chrono::NaiveDate;

/// Top-level error type for scoretrader.
#[derive(Debug, thiserror::Error)]
pub enum ScoreTraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("indicator title {title} is already registered")]
    DuplicateIndicator { title: String },

    #[error("indicator registration is closed, cannot add {title}")]
    RegistrationClosed { title: String },

    #[error("insufficient data for {title}: have {bars} bars, need more than {lookback}")]
    InsufficientData {
        title: String,
        bars: usize,
        lookback: usize,
    },

    #[error("malformed engine output for {title}: {reason}")]
    MalformedOutput { title: String, reason: String },

    #[error("lookup of {title} on {date} precedes series start {series_start}")]
    OutOfRange {
        title: String,
        date: NaiveDate,
        series_start: NaiveDate,
    },

    #[error("backtest run requested before setup")]
    NotSetUp,

    #[error("backtest run has already completed")]
    AlreadyCompleted,

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("classifier error: {reason}")]
    Classifier { reason: String },

    #[error("output error: {reason}")]
    Sink { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScoreTraderError {
    /// Shorthand for an invalid indicator parameter.
    pub fn invalid_param(title: &str, key: &str, reason: impl Into<String>) -> Self {
        ScoreTraderError::ConfigInvalid {
            section: format!("indicators.{title}"),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&ScoreTraderError> for std::process::ExitCode {
    fn from(err: &ScoreTraderError) -> Self {
        let code: u8 = match err {
            ScoreTraderError::Io(_) => 1,
            ScoreTraderError::ConfigParse { .. }
            | ScoreTraderError::ConfigMissing { .. }
            | ScoreTraderError::ConfigInvalid { .. } => 2,
            ScoreTraderError::Data { .. } | ScoreTraderError::Sink { .. } => 3,
            ScoreTraderError::DuplicateIndicator { .. }
            | ScoreTraderError::RegistrationClosed { .. }
            | ScoreTraderError::InsufficientData { .. }
            | ScoreTraderError::MalformedOutput { .. } => 4,
            ScoreTraderError::OutOfRange { .. }
            | ScoreTraderError::NotSetUp
            | ScoreTraderError::AlreadyCompleted
            | ScoreTraderError::Classifier { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Failure of a point-in-time lookup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("unknown indicator title {title}")]
    UnknownTitle { title: String },

    #[error("no value for {title} at or before {date}")]
    NoValue { title: String, date: NaiveDate },

    #[error("lookup of {title} on {date} precedes series start {series_start}")]
    OutOfRange {
        title: String,
        date: NaiveDate,
        series_start: NaiveDate,
    },
}

/// Failure of a single classifier scoring call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("method {method} is not booked (have {booked})")]
    UnknownMethod { method: String, booked: String },

    #[error("variable {name} is not bound")]
    UnboundVariable { name: String },

    #[error("{method} returned non-finite score {score}")]
    NonFinite { method: String, score: f64 },

    #[error("{reason}")]
    Failed { reason: String },
}

impl ClassifierError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ClassifierError::Failed {
            reason: reason.into(),
        }
    }
}

/// Recoverable failure while processing one simulated date.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DayError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("classifier failed: {0}")]
    Classifier(#[from] ClassifierError),
}

impl DayError {
    /// Out-of-range lookups are caller errors and abort the run.
    pub fn into_fatal(self) -> Option<ScoreTraderError> {
        match self {
            DayError::Lookup(LookupError::OutOfRange {
                title,
                date,
                series_start,
            }) => Some(ScoreTraderError::OutOfRange {
                title,
                date,
                series_start,
            }),
            _ => None,
        }
    }
}
