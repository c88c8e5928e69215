//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_sink::CsvSink;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::linear_classifier::LinearClassifier;
use crate::adapters::native_indicator_engine::NativeIndicatorEngine;
use crate::domain::backtest::{default_leaves, BacktestConfig, Leaf};
use crate::domain::config_validation::{
    parse_date, validate_backtest_config, validate_classifier_config, validate_indicator_config,
};
use crate::domain::decision::DecisionType;
use crate::domain::dump::{dump_indicators, DumpStats};
use crate::domain::error::ScoreTraderError;
use crate::domain::indicator::IndicatorDescriptor;
use crate::domain::indicator_store::IndicatorStore;
use crate::domain::metrics::{write_summaries, TradeSummary};
use crate::domain::series::PriceSeries;
use crate::domain::sweep::{run_sweep, CutValueSweep, SweepConfig, SweepOutcome};
use crate::ports::classifier_port::Classifier;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::output_port::TabularSink;

#[derive(Parser, Debug)]
#[command(name = "scoretrader", about = "Classifier-score driven backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a cut-value sweep and write one summary row per iteration
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        instrument: Option<String>,
        #[arg(long)]
        parallel: bool,
    },
    /// Export leaf indicator values with forward-change labels
    Dump {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        instrument: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in the data directory
    ListInstruments {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            instrument,
            parallel,
        } => run_backtest(&config, output.as_deref(), instrument.as_deref(), parallel),
        Command::Dump {
            config,
            output,
            instrument,
        } => run_dump(&config, output.as_deref(), instrument.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListInstruments { config } => run_list_instruments(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = ScoreTraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: &ScoreTraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn validate_all(adapter: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    validate_backtest_config(adapter)?;
    validate_indicator_config(adapter)?;
    validate_classifier_config(adapter)
}

fn data_dir(adapter: &dyn ConfigPort) -> PathBuf {
    adapter
        .get_string("backtest", "data_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn output_path(cli_output: Option<&Path>, adapter: &dyn ConfigPort) -> Option<PathBuf> {
    cli_output
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("backtest", "output").map(PathBuf::from))
}

fn open_sink(path: Option<&Path>) -> Result<Box<dyn TabularSink>, ScoreTraderError> {
    let sink: Box<dyn TabularSink> = match path {
        Some(p) => Box::new(CsvSink::create(p)?),
        None => Box::new(CsvSink::from_writer(std::io::stdout())),
    };
    Ok(sink)
}

fn run_backtest(
    config_path: &Path,
    output: Option<&Path>,
    instrument: Option<&str>,
    parallel: bool,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(&e);
    }

    // Stage 2: Build run inputs
    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Some(i) = instrument {
        bt_config.instrument = i.to_string();
    }
    bt_config.parallel |= parallel;

    let (descriptors, leaves, classifier) = match (
        load_descriptors(&adapter),
        load_leaves(&adapter),
        LinearClassifier::from_config(&adapter),
    ) {
        (Ok(d), Ok(l), Ok(c)) => (d, l, c),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return fail(&e),
    };

    // Stage 3: Load data, compute indicators, sweep
    let data_port = CsvAdapter::new(data_dir(&adapter));
    let mut sink = match open_sink(output_path(output, &adapter).as_deref()) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    match run_backtest_pipeline(
        &data_port,
        &bt_config,
        descriptors,
        &leaves,
        &classifier,
        sink.as_mut(),
    ) {
        Ok(outcome) => {
            print_summary(&outcome);
            if outcome.completed().next().is_none() {
                eprintln!("error: no iteration completed");
                return ExitCode::from(5);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn print_summary(outcome: &SweepOutcome) {
    eprintln!("\n=== Sweep Results ===");
    for (index, result) in outcome.completed() {
        let s = TradeSummary::from_result(result);
        eprintln!(
            "  #{index:<3} cut {:>8.4}  {:>4} trades  roi {:>7.2}%  win {:>5.1}%",
            result.cut_value,
            s.n_positions,
            s.roi * 100.0,
            s.win_rate * 100.0
        );
    }
    let failed = outcome.failed_count();
    if failed > 0 {
        eprintln!("  {failed} iterations failed");
    }
    if outcome.cancelled() {
        eprintln!("  sweep was cancelled");
    }
}

fn run_dump(config_path: &Path, output: Option<&Path>, instrument: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(&e);
    }

    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Some(i) = instrument {
        bt_config.instrument = i.to_string();
    }
    let (descriptors, leaves) = match (load_descriptors(&adapter), load_leaves(&adapter)) {
        (Ok(d), Ok(l)) => (d, l),
        (Err(e), _) | (_, Err(e)) => return fail(&e),
    };

    let data_port = CsvAdapter::new(data_dir(&adapter));
    let mut sink = match open_sink(output_path(output, &adapter).as_deref()) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    match run_dump_pipeline(&data_port, &bt_config, descriptors, &leaves, sink.as_mut()) {
        Ok(stats) => {
            eprintln!(
                "Dumped {} rows ({} unchanged, {} skipped)",
                stats.rows, stats.unchanged, stats.day_errors
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(&e);
    }

    let descriptors = match load_descriptors(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    for descriptor in &descriptors {
        if let Err(e) = descriptor.validate() {
            eprintln!("warning: {descriptor} will be skipped: {e}");
        }
    }
    if let Err(e) = LinearClassifier::from_config(&adapter) {
        return fail(&e);
    }

    eprintln!("Configuration is valid: {} indicators", descriptors.len());
    ExitCode::SUCCESS
}

fn run_list_instruments(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_port = CsvAdapter::new(data_dir(&adapter));
    match data_port.list_instruments() {
        Ok(instruments) => {
            for instrument in &instruments {
                println!("{}", instrument);
            }
            eprintln!("{} instruments found", instruments.len());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, ScoreTraderError> {
    let instrument = adapter.get_string("backtest", "instrument").ok_or_else(|| {
        ScoreTraderError::ConfigMissing {
            section: "backtest".into(),
            key: "instrument".into(),
        }
    })?;
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    let mut config = BacktestConfig::new(instrument.trim(), start_date, end_date);
    config.holding_horizon = adapter
        .get_int("backtest", "holding_horizon", config.holding_horizon as i64)
        .max(1) as usize;
    if let Some(s) = adapter.get_string("backtest", "decision_type") {
        config.decision_type = s.parse::<DecisionType>()?;
    }
    config.cut_value = adapter.get_double("backtest", "cut_value", config.cut_value);
    config.cut_min = adapter.get_double("backtest", "cut_min", config.cut_min);
    config.cut_max = adapter.get_double("backtest", "cut_max", config.cut_max);
    config.iterations = adapter.get_int("backtest", "iterations", 1).max(1) as usize;
    config.seed = adapter.get_int("backtest", "seed", config.seed as i64).max(0) as u64;
    config.parallel = adapter.get_bool("backtest", "parallel", false);
    if let Some(method) = adapter.get_string("classifier", "method") {
        config.method = method;
    }
    Ok(config)
}

/// Indicator descriptors from `[indicators]`, in key order. The key is only a
/// label; the value carries kind, parameters and suffix.
pub fn load_descriptors(
    adapter: &dyn ConfigPort,
) -> Result<Vec<IndicatorDescriptor>, ScoreTraderError> {
    adapter
        .keys("indicators")
        .into_iter()
        .map(|key| {
            let value = adapter.get_string("indicators", &key).unwrap_or_default();
            value.parse::<IndicatorDescriptor>()
        })
        .collect()
}

/// Classifier leaves from `[classifier] leaves`, or the default set.
pub fn load_leaves(adapter: &dyn ConfigPort) -> Result<Vec<Leaf>, ScoreTraderError> {
    match adapter.get_list("classifier", "leaves") {
        Some(list) => list.iter().map(|s| s.parse::<Leaf>()).collect(),
        None => Ok(default_leaves()),
    }
}

/// Fetches the instrument's bars, registers every descriptor, and freezes the store.
pub fn build_store(
    data_port: &dyn DataPort,
    config: &BacktestConfig,
    descriptors: Vec<IndicatorDescriptor>,
) -> Result<IndicatorStore, ScoreTraderError> {
    let bars = data_port.fetch_bars(&config.instrument, config.start_date, config.end_date)?;
    if bars.is_empty() {
        return Err(ScoreTraderError::Data {
            reason: format!(
                "no bars for {} between {} and {}",
                config.instrument, config.start_date, config.end_date
            ),
        });
    }
    eprintln!("Loaded {} bars for {}", bars.len(), config.instrument);

    let series = PriceSeries::new(config.instrument.as_str(), bars);
    let mut store = IndicatorStore::new(series, Box::new(NativeIndicatorEngine::new()));
    let mut added = 0;
    for descriptor in descriptors {
        if store.add_indicator(descriptor)? {
            added += 1;
        }
    }
    store.initialise();
    eprintln!(
        "Registered {} indicators, warmup {} bars",
        added,
        store.global_warmup()
    );
    Ok(store)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &BacktestConfig,
    descriptors: Vec<IndicatorDescriptor>,
    leaves: &[Leaf],
    classifier: &dyn Classifier,
    sink: &mut dyn TabularSink,
) -> Result<SweepOutcome, ScoreTraderError> {
    let store = build_store(data_port, config, descriptors)?;

    let sweep = SweepConfig {
        holding_horizon: config.holding_horizon,
        decision_type: config.decision_type,
        cuts: CutValueSweep::for_decision(
            config.decision_type,
            config.cut_value,
            config.cut_min,
            config.cut_max,
            config.iterations,
        ),
        base_seed: config.seed,
        parallel: config.parallel,
    };
    eprintln!(
        "Running {} iterations on {} ({} to {})",
        sweep.cuts.len(),
        config.instrument,
        config.start_date,
        config.end_date
    );

    let outcome = run_sweep(&store, classifier, leaves, &config.method, &sweep, None);
    write_summaries(sink, &outcome)?;
    Ok(outcome)
}

pub fn run_dump_pipeline(
    data_port: &dyn DataPort,
    config: &BacktestConfig,
    descriptors: Vec<IndicatorDescriptor>,
    leaves: &[Leaf],
    sink: &mut dyn TabularSink,
) -> Result<DumpStats, ScoreTraderError> {
    let store = build_store(data_port, config, descriptors)?;
    for leaf in leaves {
        if let Some(missing) = leaf
            .required_titles()
            .into_iter()
            .find(|t| !store.has_title(t))
        {
            return Err(ScoreTraderError::ConfigInvalid {
                section: "classifier".into(),
                key: "leaves".into(),
                reason: format!("leaf {leaf} needs unregistered indicator {missing}"),
            });
        }
    }
    dump_indicators(&store, leaves, config.holding_horizon, sink)
}
