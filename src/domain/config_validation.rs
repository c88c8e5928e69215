//! Configuration validation.
//!
//! Validates all config fields before a backtest or dump runs.

use crate::domain::backtest::Leaf;
use crate::domain::decision::DecisionType;
use crate::domain::error::ScoreTraderError;
use crate::domain::indicator::IndicatorDescriptor;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    validate_dates(config)?;
    validate_instrument(config)?;
    validate_horizon(config)?;
    validate_decision_type(config)?;
    validate_sweep(config)?;
    validate_seed(config)?;
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    let keys = config.keys("indicators");
    if keys.is_empty() {
        return Err(ScoreTraderError::ConfigMissing {
            section: "indicators".to_string(),
            key: "<any>".to_string(),
        });
    }
    for key in keys {
        let value = config.get_string("indicators", &key).unwrap_or_default();
        value.parse::<IndicatorDescriptor>()?;
    }
    Ok(())
}

pub fn validate_classifier_config(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    if let Some(leaves) = config.get_list("classifier", "leaves") {
        if leaves.is_empty() {
            return Err(ScoreTraderError::ConfigInvalid {
                section: "classifier".to_string(),
                key: "leaves".to_string(),
                reason: "leaves must not be empty".to_string(),
            });
        }
        for leaf in leaves {
            leaf.parse::<Leaf>()?;
        }
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(ScoreTraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, ScoreTraderError> {
    match value {
        None => Err(ScoreTraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            ScoreTraderError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }
        }),
    }
}

fn validate_instrument(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    match config.get_string("backtest", "instrument") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(ScoreTraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "instrument".to_string(),
        }),
    }
}

fn validate_horizon(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    let value = config.get_int("backtest", "holding_horizon", 7);
    if value < 1 {
        return Err(ScoreTraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "holding_horizon".to_string(),
            reason: "holding_horizon must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_decision_type(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    if let Some(s) = config.get_string("backtest", "decision_type") {
        s.parse::<DecisionType>()?;
    }
    Ok(())
}

fn validate_sweep(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    let iterations = config.get_int("backtest", "iterations", 1);
    if iterations < 1 {
        return Err(ScoreTraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "iterations".to_string(),
            reason: "iterations must be at least 1".to_string(),
        });
    }
    let min = config.get_double("backtest", "cut_min", -0.001);
    let max = config.get_double("backtest", "cut_max", 1.0);
    if iterations > 1 && min >= max {
        return Err(ScoreTraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "cut_min".to_string(),
            reason: "cut_min must be below cut_max".to_string(),
        });
    }
    Ok(())
}

fn validate_seed(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    if config.get_int("backtest", "seed", 0) < 0 {
        return Err(ScoreTraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "seed".to_string(),
            reason: "seed must be non-negative".to_string(),
        });
    }
    Ok(())
}
