//! negsel-sweep CLI
//!
//! Runs a negative-selection `(n, r)` sweep and reports how well each cell
//! separates the anomalous label from the rest:
//!
//! 1. Settings: `negsel.toml` (or `--config`), then command-line overrides
//! 2. Inputs: every labeled input file is read up front
//! 3. Sweep: one training artifact per `n`, one scorer session per `(n, r)`
//! 4. Evaluation: ROC AUC per cell, printed as each cell finishes
//! 5. Output: optional JSON with every cell's scored lines and evaluation

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use negsel_sweep::config::{DEFAULT_CONFIG_FILE, ExperimentConfig, InputSpec};
use negsel_sweep::eval::{self, CellEvaluation};
use negsel_sweep::{
    CellResults, LineModifier, MergeKey, ParamRange, RemainderPolicy, ResultSet, Scorer,
    SweepPoint, SweepRunner, TableScorer,
};

/// Sweep a negative-selection scorer over chunk width and threshold
///
/// For every chunk width n, the training file is re-chunked into a staging
/// artifact. For every threshold r, a fresh scorer is started on that
/// artifact and every input line is scored as the mean of its chunk scores.
///
/// Examples:
///   negsel-sweep                                  # Everything from negsel.toml
///   negsel-sweep --n 9..12 --r 1..9 \
///       --training english.train \
///       --input english.test --input tagalog.test # No config file
///   negsel-sweep --table scores.json              # Dry run without a JVM
#[derive(Parser, Debug)]
#[command(name = "negsel-sweep")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Experiment file
    ///
    /// Defaults to negsel.toml in the working directory when present.
    /// Command-line flags override values from the file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Chunk width range, e.g. 9..12 or 10
    #[arg(long, value_name = "LO..HI")]
    n: Option<ParamRange>,

    /// Matching threshold range, e.g. 1..9
    #[arg(long, value_name = "LO..HI")]
    r: Option<ParamRange>,

    /// Training file: one "self" sample per line
    #[arg(long, value_name = "PATH")]
    training: Option<PathBuf>,

    /// Labeled input file (can be repeated)
    ///
    /// The label defaults to the file stem:
    ///   --input english.test          labelled "english"
    ///   --input data/b.test:tagalog   labelled "tagalog"
    ///
    /// Replaces the [[input]] list of the config file.
    #[arg(short, long = "input", value_name = "PATH[:LABEL]")]
    inputs: Vec<InputSpec>,

    /// Remainder policy when chunking input lines
    #[arg(long, value_enum)]
    chunk_policy: Option<RemainderPolicy>,

    /// Remainder policy when chunking the training file
    #[arg(long, value_enum)]
    train_policy: Option<RemainderPolicy>,

    /// Score each input line whole instead of chunking it
    #[arg(long)]
    whole_lines: bool,

    /// Where the chunked training artifact is written
    ///
    /// Rewritten for every chunk width; must not be shared with another
    /// running sweep.
    #[arg(long, value_name = "PATH")]
    staging: Option<PathBuf>,

    /// Scorer command, split on whitespace
    ///
    /// Session arguments are appended: -self <artifact> -n <n> -r <r> -c -l
    ///
    /// Closing a session kills only this process. A wrapper script must
    /// `exec` the real scorer, otherwise the scorer outlives its session.
    #[arg(long, value_name = "CMD")]
    scorer: Option<String>,

    /// Seconds to wait for a single scorer response
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    /// Answer from a JSON table {"token": score} instead of a scorer process
    ///
    /// Unknown tokens score 0. Useful for checking inputs and configuration
    /// without starting the external scorer.
    #[arg(long, value_name = "FILE")]
    table: Option<PathBuf>,

    /// How lines are identified when inputs are merged
    #[arg(long, value_enum)]
    merge_key: Option<MergeKey>,

    /// Label treated as anomalous for AUC (default: label of the last input)
    #[arg(long, value_name = "LABEL")]
    anomalous_label: Option<String>,

    /// Write scored cells and their evaluation as JSON
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbose output
    ///
    /// Logs sweep progress at info level. RUST_LOG takes precedence when set.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    anomalous_label: Option<&'a str>,
    results: &'a ResultSet,
    evaluations: &'a [CellEvaluation],
    best: Option<SweepPoint>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;
    if cli.verbose {
        eprintln!("{}", config.display_summary());
    }

    match cli.table {
        Some(ref table) => {
            let scorer = TableScorer::from_json_file(table, 0.0)
                .with_context(|| format!("Failed to load score table {}", table.display()))?;
            run(&cli, &config, scorer)
        }
        None => {
            let scorer = config.scorer().context("Invalid scorer command")?;
            run(&cli, &config, scorer)
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Config file first, then flag overrides.
fn resolve_config(cli: &Cli) -> Result<ExperimentConfig> {
    let mut config = match cli.config {
        Some(ref path) => ExperimentConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
            ExperimentConfig::discover(&cwd)
                .with_context(|| format!("Failed to load {DEFAULT_CONFIG_FILE}"))?
        }
    };

    if let Some(n) = cli.n {
        config.n = Some(n);
    }
    if let Some(r) = cli.r {
        config.r = Some(r);
    }
    if let Some(ref training) = cli.training {
        config.training = Some(training.clone());
    }
    if !cli.inputs.is_empty() {
        config.inputs = cli.inputs.clone();
    }
    if let Some(policy) = cli.chunk_policy {
        config.chunk_policy = policy;
    }
    if let Some(policy) = cli.train_policy {
        config.train_policy = policy;
    }
    if let Some(ref staging) = cli.staging {
        config.staging = staging.clone();
    }
    if let Some(ref scorer) = cli.scorer {
        config.scorer_command = scorer.split_whitespace().map(String::from).collect();
    }
    if let Some(secs) = cli.timeout {
        if !(secs.is_finite() && secs > 0.0) {
            bail!("--timeout must be a positive number of seconds, got {secs}");
        }
        config.timeout = Duration::from_secs_f64(secs);
    }
    if let Some(key) = cli.merge_key {
        config.merge_key = key;
    }
    if let Some(ref label) = cli.anomalous_label {
        config.anomalous_label = Some(label.clone());
    }

    Ok(config)
}

fn run<S: Scorer>(cli: &Cli, config: &ExperimentConfig, scorer: S) -> Result<()> {
    let start = Instant::now();

    let sweep = config.sweep_config().context("Incomplete sweep settings")?;
    let inputs = config.load_inputs().context("Failed to read inputs")?;
    let anomalous = config.effective_anomalous_label();

    let chunking = if cli.whole_lines {
        LineModifier::Identity
    } else {
        LineModifier::Chunked(sweep.chunk_policy)
    };
    let train_prep = LineModifier::Chunked(config.train_policy);

    println!();
    println!("{}", " NEGSEL PARAMETER SWEEP ".bold().on_magenta());
    println!(
        "   n {}  r {}  {} cells  {} inputs  anomalous: {}",
        sweep.n_range(),
        sweep.r_range(),
        sweep.cell_count(),
        inputs.len(),
        anomalous.unwrap_or("-")
    );
    println!();

    let runner = SweepRunner::new(scorer, &config.staging).with_merge_key(config.merge_key);
    let results = runner
        .run_with(&sweep, &inputs, chunking, train_prep, |point, cell| {
            print_cell(point, cell, anomalous);
        })
        .context("Sweep aborted")?;

    let evaluations = match anomalous {
        Some(label) => eval::evaluate(&results, label),
        None => Vec::new(),
    };
    let best = eval::best_cell(&evaluations);

    println!();
    println!("{}", " SWEEP COMPLETE ".bold().on_green());
    println!(
        "   {} cells in {:.1}s",
        results.len(),
        start.elapsed().as_secs_f64()
    );
    if let Some(best) = best {
        println!(
            "   Best: {}  AUC {:.4}",
            best.point().bold(),
            best.auc.unwrap_or(f64::NAN)
        );
    }
    if let Some(mean) = eval::mean_auc(&evaluations) {
        println!("   Mean AUC: {mean:.4}");
    }

    if let Some(ref path) = cli.output {
        let report = Report {
            anomalous_label: anomalous,
            results: &results,
            evaluations: &evaluations,
            best: best.map(CellEvaluation::point),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("   Results: {}", path.display());
    }

    Ok(())
}

fn print_cell(point: SweepPoint, cell: &CellResults, anomalous: Option<&str>) {
    let evaluation = anomalous.map(|label| eval::evaluate_cell(point, cell, label));
    match evaluation.and_then(|e| e.auc) {
        Some(auc) if auc >= 0.9 => {
            println!("   {point}  {} lines  AUC {}", cell.len(), format!("{auc:.4}").green())
        }
        Some(auc) if auc < 0.6 => {
            println!("   {point}  {} lines  AUC {}", cell.len(), format!("{auc:.4}").red())
        }
        Some(auc) => println!("   {point}  {} lines  AUC {auc:.4}", cell.len()),
        None => println!("   {point}  {} lines  AUC {}", cell.len(), "n/a".dimmed()),
    }
}
