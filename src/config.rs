//! Run configuration
//!
//! A run is driven by one immutable `RunConfig` value. Nothing in the
//! engine reads process-wide state; the CLI builds this value from its
//! arguments and environment and hands it over.

use crate::error::{Result, SimError};
use std::path::{Path, PathBuf};

/// Pair count above which results are streamed to disk instead of buffered.
pub const DEFAULT_THRESHOLD: usize = 100_000;

/// Metric used when none is given.
pub const DEFAULT_METRIC: &str = "jaro";

/// What a worker does when a single pair fails to score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeErrorPolicy {
    /// Stop the run and return the error
    #[default]
    Abort,
    /// Log the pair, count it in the summary, keep going
    Skip,
}

/// On-disk result container, chosen from the output file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON array of record objects
    Json,
    /// `metric,s1,s2,score` header plus one row per record
    Csv,
    /// One compact JSON object per line
    JsonLines,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("json") => Ok(OutputFormat::Json),
            Some("csv") => Ok(OutputFormat::Csv),
            Some("jsonl") | Some("ndjson") => Ok(OutputFormat::JsonLines),
            _ => Err(SimError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub metric: String,
    pub insensitive: bool,
    /// Transliterate inputs to ASCII before scoring
    pub unidecode: bool,
    pub silent: bool,
    pub output: Option<PathBuf>,
    pub threshold: usize,
    /// Upper bound on worker count; defaults to available parallelism
    pub workers: Option<usize>,
    pub on_compute_error: ComputeErrorPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            metric: DEFAULT_METRIC.to_string(),
            insensitive: false,
            unidecode: false,
            silent: false,
            output: None,
            threshold: DEFAULT_THRESHOLD,
            workers: None,
            on_compute_error: ComputeErrorPolicy::Abort,
        }
    }
}

impl RunConfig {
    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn insensitive(mut self, insensitive: bool) -> Self {
        self.insensitive = insensitive;
        self
    }

    pub fn unidecode(mut self, unidecode: bool) -> Self {
        self.unidecode = unidecode;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn on_compute_error(mut self, policy: ComputeErrorPolicy) -> Self {
        self.on_compute_error = policy;
        self
    }

    /// Output format, if an output path is set
    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        self.output.as_deref().map(OutputFormat::from_path).transpose()
    }

    /// Worker bound: the configured override, else available hardware parallelism
    pub fn max_workers(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}
