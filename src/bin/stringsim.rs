//! stringsim - compare strings with a selectable similarity metric
//!
//! Usage:
//!   stringsim adam adan aden                      # s1 = adam, compared to adan, aden
//!   stringsim adam adan Aden -i -o output.json    # case insensitive, write to file
//!   stringsim café cafe -u -m Levenshtein         # compare ASCII transliterations
//!   stringsim adam --f2 strings.txt -m Levenshtein
//!   stringsim --f1 strings_one.json --f2 strings_two.txt -o out.csv
//!
//! Environment:
//!   STRINGSIM_THRESHOLD  pair count above which results stream to the output file
//!   STRINGSIM_WORKERS    upper bound on worker threads
//!   RUST_LOG             log filter (overrides -v)

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use stringsim::config::DEFAULT_METRIC;
use stringsim::utils::{check_input_extension, read_strings};
use stringsim::{ComputeErrorPolicy, RunConfig, DEFAULT_THRESHOLD};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stringsim")]
#[command(version)]
#[command(about = "Calculate the similarity between strings")]
struct Cli {
    /// Strings to compare: s1 followed by s2, s3, ... (see --f1 / --f2)
    strings: Vec<String>,

    /// File with many s1 (.txt one per line, or .json array of strings)
    #[arg(long = "f1")]
    file1: Option<PathBuf>,

    /// File with many s2 (.txt one per line, or .json array of strings)
    #[arg(long = "f2")]
    file2: Option<PathBuf>,

    /// Output file (.json, .csv, .jsonl); required above the streaming threshold
    #[arg(short, long = "out")]
    output: Option<PathBuf>,

    /// Metric: Jaro, Levenshtein, LevenshteinRatio, DamerauLevenshtein, Hamming, LCS
    #[arg(short, long, default_value = DEFAULT_METRIC)]
    metric: String,

    /// Case insensitive comparison
    #[arg(short, long)]
    insensitive: bool,

    /// Use ASCII transliterations of Unicode text
    #[arg(short, long)]
    unidecode: bool,

    /// Do not print results to stdout
    #[arg(short, long)]
    silent: bool,

    /// Skip pairs that fail to score (e.g. Hamming length mismatch) instead of aborting
    #[arg(long)]
    skip_errors: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Resolve (s1 list, s2 list) from positional arguments and input files.
    fn inputs(&self) -> Result<(Vec<String>, Vec<String>)> {
        for path in [&self.file1, &self.file2].into_iter().flatten() {
            check_input_extension(path)?;
        }

        let load = |path: &PathBuf| {
            read_strings(path).with_context(|| format!("Failed to read strings from {:?}", path))
        };

        match (&self.file1, &self.file2) {
            (Some(f1), Some(f2)) => Ok((load(f1)?, load(f2)?)),
            (Some(f1), None) => {
                require_args(&self.strings, 1)?;
                Ok((load(f1)?, self.strings.clone()))
            }
            (None, Some(f2)) => {
                require_args(&self.strings, 1)?;
                Ok((self.strings.clone(), load(f2)?))
            }
            (None, None) => {
                require_args(&self.strings, 2)?;
                Ok((vec![self.strings[0].clone()], self.strings[1..].to_vec()))
            }
        }
    }

    fn run_config(&self) -> Result<RunConfig> {
        let threshold = env_usize("STRINGSIM_THRESHOLD")?.unwrap_or(DEFAULT_THRESHOLD);

        let mut config = RunConfig::default()
            .with_metric(&self.metric)
            .insensitive(self.insensitive)
            .unidecode(self.unidecode)
            .silent(self.silent)
            .with_threshold(threshold);

        if let Some(workers) = env_usize("STRINGSIM_WORKERS")? {
            config = config.with_workers(workers);
        }
        if let Some(output) = &self.output {
            config = config.with_output(output);
        }
        if self.skip_errors {
            config = config.on_compute_error(ComputeErrorPolicy::Skip);
        }

        Ok(config)
    }
}

fn require_args(args: &[String], n: usize) -> Result<()> {
    if args.len() < n {
        Cli::command().print_help()?;
        bail!("Expected {} arguments, got {}", n, args.len());
    }
    Ok(())
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a positive integer, got '{}'", name, value)),
        Err(_) => Ok(None),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "stringsim=warn",
        1 => "stringsim=info",
        _ => "stringsim=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.strings.is_empty() && cli.file1.is_none() && cli.file2.is_none() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let (primary, comparison) = cli.inputs()?;
    let config = cli.run_config()?;

    tracing::info!(
        "Comparing {} x {} strings (metric: {}, insensitive: {}, unidecode: {})",
        primary.len(),
        comparison.len(),
        config.metric,
        config.insensitive,
        config.unidecode
    );

    let summary = stringsim::run(&primary, &comparison, &config)?;

    if summary.skipped > 0 {
        eprintln!("Skipped {} pairs that could not be scored", summary.skipped);
    }
    tracing::info!("Finished in {:?}", summary.elapsed);

    Ok(())
}
