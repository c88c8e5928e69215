//! Core domain types and logic.

pub mod ohlcv;
pub mod series;
pub mod position;
pub mod position_book;
pub mod execution;
pub mod indicator;
pub mod indicator_store;
pub mod point_in_time;
pub mod decision;
pub mod backtest;
pub mod sweep;
pub mod metrics;
pub mod dump;
pub mod config_validation;
pub mod error;
