//! Integration tests for the indicator store, point-in-time lookups, the
//! backtest runner and cut-value sweeps.
//!
//! Tests cover:
//! - Indicator registration and warm-up alignment across mixed lookbacks
//! - Point-in-time lookups that never return future values
//! - Threshold trading with a fixed holding horizon
//! - Run lifecycle errors and per-day error recovery
//! - Reproducible random baselines and parallel sweeps
//! - Property tests for look-ahead, warm-up and single open position

mod common;

use common::*;
use proptest::prelude::*;
use scoretrader::adapters::native_indicator_engine::NativeIndicatorEngine;
use scoretrader::domain::backtest::{run_backtest, BacktestRunner, Leaf, RunParams, RunState};
use scoretrader::domain::decision::{DecisionPolicy, DecisionType};
use scoretrader::domain::error::ScoreTraderError;
use scoretrader::domain::indicator_store::IndicatorStore;
use scoretrader::domain::metrics::{write_summaries, SUMMARY_COLUMNS};
use scoretrader::domain::point_in_time::PointInTimeAccessor;
use scoretrader::domain::series::PriceSeries;
use scoretrader::domain::sweep::{run_sweep, CutValueSweep, SweepConfig};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn params(decision_type: DecisionType, cut_value: f64, horizon: usize, seed: u64) -> RunParams {
    RunParams {
        holding_horizon: horizon,
        decision_type,
        cut_value,
        seed,
    }
}

fn sma_leaf() -> Vec<Leaf> {
    vec![Leaf::indicator("SMA", "")]
}

mod indicator_registration {
    use super::*;

    #[test]
    fn sma5_on_30_bars_starts_at_bar_4() {
        let bars = generate_bars("2024-01-01", 30);
        let store = build_store(bars.clone(), &["SMA period=5"]);

        assert_eq!(store.table().first_date_for("SMA"), Some(bars[4].date));
        assert_eq!(store.global_warmup(), 4);
        assert_eq!(store.start_date(), Some(bars[4].date));
    }

    #[test]
    fn duplicate_title_is_rejected_without_changing_table() {
        let bars = generate_bars("2024-01-01", 30);
        let mut store = IndicatorStore::new(
            PriceSeries::new("BHP", bars),
            Box::new(NativeIndicatorEngine::new()),
        );
        assert!(store.add_indicator(descriptor("SMA period=5")).unwrap());
        let before = store.table().clone();

        assert!(!store.add_indicator(descriptor("SMA period=10")).unwrap());
        assert_eq!(store.table(), &before);
        assert_eq!(store.global_warmup(), 4);
    }

    #[test]
    fn insufficient_data_is_fatal() {
        let bars = generate_bars("2024-01-01", 3);
        let mut store = IndicatorStore::new(
            PriceSeries::new("BHP", bars),
            Box::new(NativeIndicatorEngine::new()),
        );
        assert!(matches!(
            store.add_indicator(descriptor("SMA period=5")),
            Err(ScoreTraderError::InsufficientData { .. })
        ));
    }

    #[test]
    fn invalid_parameters_are_skipped() {
        let bars = generate_bars("2024-01-01", 30);
        let mut store = IndicatorStore::new(
            PriceSeries::new("BHP", bars),
            Box::new(NativeIndicatorEngine::new()),
        );
        assert!(!store.add_indicator(descriptor("RSI period=1")).unwrap());
        assert!(!store.has_title("RSI"));
    }

    #[test]
    fn mixed_lookbacks_align_on_the_longest() {
        let bars = generate_bars("2024-01-01", 120);
        let definitions = [
            "SMA period=5",
            "MACD period=9 fast=12 slow=26",
            "ADX period=14",
            "BOP",
            "STOCHRSI period=14 fast=3 slow=5",
            "BBANDS period=20",
        ];
        let store = build_store(bars.clone(), &definitions);

        let mut expected = 0;
        for definition in definitions {
            let d = descriptor(definition);
            let lookback = NativeIndicatorEngine::lookback(&d).unwrap();
            expected = expected.max(lookback).max(d.period_floor());
            for title in d.component_titles() {
                let first = store.table().first_date_for(&title).unwrap();
                assert!(first >= bars[lookback].date, "{title} starts before its lookback");
            }
        }
        assert_eq!(store.global_warmup(), expected);
        assert_eq!(store.start_index(), Some(expected));
    }

    #[test]
    fn registration_closes_after_initialise() {
        let mut store = build_store(generate_bars("2024-01-01", 30), &["SMA period=5"]);
        assert!(!store.add_indicator(descriptor("EMA period=5")).unwrap());
        assert!(!store.has_title("EMA"));
    }
}

mod point_in_time_lookups {
    use super::*;

    #[test]
    fn before_excludes_the_query_date() {
        let bars = generate_bars("2024-01-01", 30);
        let store = build_store(bars.clone(), &["SMA period=5"]);
        let accessor = PointInTimeAccessor::new(&store);

        let at = accessor.evaluate_at_or_before("SMA", bars[10].date, "").unwrap();
        let before = accessor.evaluate_before("SMA", bars[10].date, "").unwrap();
        assert_eq!(at.source_date, bars[10].date);
        assert_eq!(before.source_date, bars[9].date);
    }

    #[test]
    fn gap_dates_resolve_to_the_previous_row() {
        let mut bars = generate_bars("2024-01-01", 30);
        bars.remove(12);
        let store = build_store(bars.clone(), &["SMA period=5"]);
        let accessor = PointInTimeAccessor::new(&store);

        let missing = date(2024, 1, 13);
        let v = accessor.evaluate_at_or_before("SMA", missing, "").unwrap();
        assert_eq!(v.source_date, date(2024, 1, 12));
    }

    #[test]
    fn multi_output_components_are_addressable() {
        let bars = generate_bars("2024-01-01", 60);
        let store = build_store(bars.clone(), &["MACD period=9 fast=12 slow=26"]);
        let accessor = PointInTimeAccessor::new(&store);
        let d = bars[50].date;

        let line = accessor.evaluate_at_or_before("MACD", d, "").unwrap().value;
        let signal = accessor.evaluate_at_or_before("MACD", d, "signal").unwrap().value;
        let hist = accessor.evaluate_at_or_before("MACD", d, "hist").unwrap().value;
        approx::assert_relative_eq!(hist, line - signal, epsilon = 1e-9);
    }

    #[test]
    fn stochrsi_spread_leaf_is_d_minus_k() {
        let bars = generate_bars("2024-01-01", 60);
        let store = build_store(bars.clone(), &["STOCHRSI period=14 fast=3 slow=5"]);
        let accessor = PointInTimeAccessor::new(&store);
        let d = bars[55].date;

        let k = accessor.evaluate_at_or_before("STOCHRSI", d, "K").unwrap().value;
        let dd = accessor.evaluate_at_or_before("STOCHRSI", d, "D").unwrap().value;
        let spread = Leaf::StochRsiSpread.evaluate(&accessor, d).unwrap();
        approx::assert_relative_eq!(spread, dd - k, epsilon = 1e-12);
    }
}

mod backtest_scenarios {
    use super::*;

    #[test]
    fn threshold_trades_open_next_bar_and_close_after_horizon() {
        let bars = generate_bars("2024-01-01", 30);
        let store = build_store(bars.clone(), &["SMA period=5"]);
        let classifier = FixedClassifier(0.5);

        let result = run_backtest(
            &store,
            &classifier,
            &sma_leaf(),
            "TMlpANN",
            &params(DecisionType::Deterministic, 0.2, 7, 0),
            None,
        )
        .unwrap();

        // dates 4..=22 are eligible; each position is closed in the same step
        assert_eq!(result.dates_processed, 19);
        assert_eq!(result.trades, 19);
        let first = &result.positions[0];
        assert_eq!(first.entry_date, bars[5].date);
        assert_eq!(first.entry_price, bars[5].open);
        assert_eq!(first.exit_date, Some(bars[11].date));
        assert_eq!(first.exit_price, Some(bars[11].open));

        let last = result.positions.last().unwrap();
        assert_eq!(last.exit_date, Some(bars[29].date));
        assert!(result.positions.iter().all(|p| !p.is_open()));
    }

    #[test]
    fn signal_below_cut_never_trades() {
        let store = build_store(generate_bars("2024-01-01", 30), &["SMA period=5"]);
        let result = run_backtest(
            &store,
            &FixedClassifier(0.1),
            &sma_leaf(),
            "TMlpANN",
            &params(DecisionType::Deterministic, 0.2, 7, 0),
            None,
        )
        .unwrap();
        assert_eq!(result.trades, 0);
        assert!(result.positions.is_empty());
    }

    #[test]
    fn probability_transform_maps_score_into_unit_interval() {
        let store = build_store(generate_bars("2024-01-01", 30), &["SMA period=5"]);
        // 0.5 * (1 - 0.5) = 0.25
        let traded = run_backtest(
            &store,
            &FixedClassifier(-0.5),
            &sma_leaf(),
            "TMlpANN",
            &params(DecisionType::ProbabilityTransform, 0.2, 7, 0),
            None,
        )
        .unwrap();
        assert!(traded.trades > 0);

        let skipped = run_backtest(
            &store,
            &FixedClassifier(-0.5),
            &sma_leaf(),
            "TMlpANN",
            &params(DecisionType::ProbabilityTransform, 0.3, 7, 0),
            None,
        )
        .unwrap();
        assert_eq!(skipped.trades, 0);
    }

    #[test]
    fn classifier_failures_are_skipped_per_day() {
        let store = build_store(generate_bars("2024-01-01", 30), &["SMA period=5"]);
        let result = run_backtest(
            &store,
            &PassThroughClassifier,
            &[],
            "TMlpANN",
            &params(DecisionType::Deterministic, 0.2, 7, 0),
            None,
        )
        .unwrap();
        assert_eq!(result.day_errors, result.dates_processed);
        assert_eq!(result.trades, 0);
    }

    #[test]
    fn horizon_longer_than_series_processes_nothing() {
        let store = build_store(generate_bars("2024-01-01", 10), &["SMA period=5"]);
        let result = run_backtest(
            &store,
            &FixedClassifier(0.9),
            &sma_leaf(),
            "TMlpANN",
            &params(DecisionType::Deterministic, 0.2, 20, 0),
            None,
        )
        .unwrap();
        assert_eq!(result.dates_processed, 0);
        assert!(result.positions.is_empty());
    }

    #[test]
    fn run_requires_setup_and_runs_once() {
        let store = build_store(generate_bars("2024-01-01", 30), &["SMA period=5"]);
        let classifier = FixedClassifier(0.5);
        let p = params(DecisionType::Deterministic, 0.2, 7, 0);

        let mut runner = BacktestRunner::new(&store, &classifier);
        assert!(matches!(runner.run(&p), Err(ScoreTraderError::NotSetUp)));

        runner.setup(sma_leaf(), "TMlpANN").unwrap();
        assert_eq!(runner.state(), RunState::Idle);
        runner.run(&p).unwrap();
        assert_eq!(runner.state(), RunState::Completed);
        assert!(matches!(
            runner.run(&p),
            Err(ScoreTraderError::AlreadyCompleted)
        ));
    }

    #[test]
    fn setup_rejects_unregistered_leaf() {
        let store = build_store(generate_bars("2024-01-01", 30), &["SMA period=5"]);
        let classifier = FixedClassifier(0.5);
        let mut runner = BacktestRunner::new(&store, &classifier);
        let err = runner
            .setup(vec![Leaf::indicator("MACD", "signal")], "TMlpANN")
            .unwrap_err();
        assert!(matches!(err, ScoreTraderError::ConfigInvalid { .. }));
    }

    #[test]
    fn setup_requires_initialised_store() {
        let store = IndicatorStore::new(
            PriceSeries::new("BHP", generate_bars("2024-01-01", 30)),
            Box::new(NativeIndicatorEngine::new()),
        );
        let classifier = FixedClassifier(0.5);
        let mut runner = BacktestRunner::new(&store, &classifier);
        assert!(matches!(
            runner.setup(vec![], "TMlpANN"),
            Err(ScoreTraderError::NotSetUp)
        ));
    }

    #[test]
    fn cancelled_run_stops_before_first_date() {
        let store = build_store(generate_bars("2024-01-01", 30), &["SMA period=5"]);
        let flag = Arc::new(AtomicBool::new(true));
        let result = run_backtest(
            &store,
            &FixedClassifier(0.5),
            &sma_leaf(),
            "TMlpANN",
            &params(DecisionType::Deterministic, 0.2, 7, 0),
            Some(flag),
        )
        .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.dates_processed, 0);
    }
}

mod sweeps {
    use super::*;

    fn sweep_config(decision_type: DecisionType, cuts: CutValueSweep, parallel: bool) -> SweepConfig {
        SweepConfig {
            holding_horizon: 7,
            decision_type,
            cuts,
            base_seed: 100,
            parallel,
        }
    }

    #[test]
    fn random_baseline_is_reproducible() {
        let store = build_store(generate_bars("2024-01-01", 60), &["SMA period=5"]);
        let classifier = FixedClassifier(0.0);
        let p = params(DecisionType::RandomBaseline, 0.0, 7, 42);

        let a = run_backtest(&store, &classifier, &sma_leaf(), "TMlpANN", &p, None).unwrap();
        let b = run_backtest(&store, &classifier, &sma_leaf(), "TMlpANN", &p, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parallel_sweep_matches_sequential() {
        let store = build_store(generate_bars("2024-01-01", 80), &["SMA period=5"]);
        let classifier = FixedClassifier(0.0);
        let cuts = CutValueSweep::fixed(0.0, 6);

        let sequential = run_sweep(
            &store,
            &classifier,
            &sma_leaf(),
            "TMlpANN",
            &sweep_config(DecisionType::RandomBaseline, cuts.clone(), false),
            None,
        );
        let parallel = run_sweep(
            &store,
            &classifier,
            &sma_leaf(),
            "TMlpANN",
            &sweep_config(DecisionType::RandomBaseline, cuts, true),
            None,
        );
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.completed().count(), 6);
    }

    #[test]
    fn linear_sweep_writes_one_summary_row_per_cut() {
        let store = build_store(generate_bars("2024-01-01", 60), &["SMA period=5"]);
        let cuts = CutValueSweep::for_decision(DecisionType::Deterministic, -0.01, -0.001, 1.0, 5);
        let outcome = run_sweep(
            &store,
            &FixedClassifier(0.5),
            &sma_leaf(),
            "TMlpANN",
            &sweep_config(DecisionType::Deterministic, cuts, false),
            None,
        );

        let mut sink = MemorySink::new();
        assert_eq!(write_summaries(&mut sink, &outcome).unwrap(), 5);
        assert_eq!(sink.columns.len(), SUMMARY_COLUMNS.len());
        assert!(sink.flushed);

        let positions = sink.column("n_positions");
        // cuts -0.001, 0.1992, 0.3994 pass a 0.5 signal; 0.5996, 0.7998 do not
        assert!(positions[..3].iter().all(|&n| n > 0.0));
        assert_eq!(&positions[3..], &[0.0, 0.0]);
        approx::assert_relative_eq!(sink.column("cut_value")[1], 0.1992, epsilon = 1e-12);
    }

    #[test]
    fn failed_iterations_do_not_stop_the_sweep() {
        let store = build_store(generate_bars("2024-01-01", 60), &["SMA period=5"]);
        let outcome = run_sweep(
            &store,
            &FixedClassifier(0.5),
            &[Leaf::indicator("EMA", "")],
            "TMlpANN",
            &sweep_config(DecisionType::Deterministic, CutValueSweep::fixed(0.1, 3), false),
            None,
        );
        assert_eq!(outcome.failed_count(), 3);
        assert_eq!(outcome.completed().count(), 0);
    }
}

proptest! {
    #[test]
    fn warmup_equals_period_floor_for_sma(period in 2usize..20, extra in 1usize..30) {
        let bars = generate_bars("2024-01-01", period + extra);
        let store = build_store(bars.clone(), &[format!("SMA period={period}").as_str()]);
        prop_assert_eq!(store.global_warmup(), period - 1);
        prop_assert_eq!(store.table().first_date_for("SMA"), Some(bars[period - 1].date));
    }

    #[test]
    fn lookups_never_look_ahead(n in 40usize..90, q in 0usize..400) {
        let bars = generate_bars("2024-01-01", n);
        let store = build_store(bars.clone(), &["RSI period=14", "EMA period=10"]);
        let accessor = PointInTimeAccessor::new(&store);
        let query = bars[0].date + chrono::Duration::days((q % (n + 5)) as i64);

        for title in ["RSI", "EMA"] {
            if let Ok(v) = accessor.evaluate_at_or_before(title, query, "") {
                prop_assert!(v.source_date <= query);
            }
            if let Ok(v) = accessor.evaluate_before(title, query, "") {
                prop_assert!(v.source_date < query);
            }
        }
    }

    #[test]
    fn at_most_one_open_position(seed in any::<u64>(), horizon in 1usize..10) {
        let bars = generate_bars("2024-01-01", 40);
        let store = build_store(bars.clone(), &["SMA period=5"]);
        let classifier = FixedClassifier(0.0);
        let mut runner = BacktestRunner::new(&store, &classifier);
        runner.setup(sma_leaf(), "TMlpANN").unwrap();

        let p = params(DecisionType::RandomBaseline, 0.0, horizon, seed);
        let mut policy = DecisionPolicy::new(p.decision_type, "TMlpANN", seed);
        for bar in &bars[store.global_warmup()..] {
            runner.trade(bar.date, &mut policy, &p).unwrap();
            prop_assert!(runner.book().open_count("BHP") <= 1);
        }
    }

    #[test]
    fn random_runs_are_reproducible(seed in any::<u64>()) {
        let store = build_store(generate_bars("2024-01-01", 40), &["SMA period=5"]);
        let classifier = FixedClassifier(0.0);
        let p = params(DecisionType::RandomBaseline, 0.3, 5, seed);
        let a = run_backtest(&store, &classifier, &sma_leaf(), "TMlpANN", &p, None).unwrap();
        let b = run_backtest(&store, &classifier, &sma_leaf(), "TMlpANN", &p, None).unwrap();
        prop_assert_eq!(a, b);
    }
}
