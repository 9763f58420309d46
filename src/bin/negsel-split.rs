//! negsel-split: split a labeled dataset into one input file per label
//!
//! ## Usage
//!
//! ```bash
//! # lang.test holds one string per line, lang.labels the matching labels
//! negsel-split lang.test lang.labels --out data/
//! ```
//!
//! Produces `data/lang.<label>.test` for every label, in first-seen order.
//! Each output file is ready to pass to `negsel-sweep --input`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use negsel_sweep::dataset::{read_labeled, split_by_label, stem_label, write_lines};

#[derive(Parser)]
#[command(name = "negsel-split")]
#[command(about = "Split a labeled dataset into one file per label")]
struct Args {
    /// Data file: one string per line
    data: PathBuf,

    /// Label file: line i labels line i of the data file
    labels: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Log each written file
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let fallback = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    let pairs = read_labeled(&args.data, &args.labels).context("Failed to read dataset")?;
    let total = pairs.len();
    let stem = stem_label(&args.data);

    let groups = split_by_label(pairs);
    for (label, lines) in &groups {
        let path = args.out.join(format!("{stem}.{label}.test"));
        write_lines(lines, &path).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(label = %label, lines = lines.len(), path = %path.display(), "split written");
        println!("   {} {:>6} lines  {}", label.bold(), lines.len(), path.display());
    }

    println!(
        "{} {} lines into {} labels",
        "✓".green(),
        total,
        groups.len()
    );
    Ok(())
}
