//! Error taxonomy for similarity runs
//!
//! Every failure is fatal to the run that raised it. Config errors are
//! always reported before any worker starts; compute, I/O and container
//! errors can surface mid-run.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("metric not supported: '{0}'")]
    UnsupportedMetric(String),

    #[error("output path required: {pairs} comparisons exceed the in-memory threshold of {threshold}")]
    MissingOutputPath { pairs: usize, threshold: usize },

    #[error("unsupported output format for {path:?} (expected .json, .csv, .jsonl or .ndjson)")]
    UnsupportedFormat { path: PathBuf },

    #[error("unsupported input format for {path:?} (expected .txt or .json)")]
    UnsupportedInput { path: PathBuf },

    /// Hamming is only defined for strings of equal length.
    #[error("{metric}: length mismatch between '{s1}' and '{s2}'")]
    LengthMismatch {
        metric: &'static str,
        s1: String,
        s2: String,
    },

    #[error("{path:?} is not a JSON array with a closing ']' in its last 3 bytes")]
    MalformedContainer { path: PathBuf },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Export(#[from] polars::prelude::PolarsError),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("result sink lock poisoned by a panicked worker")]
    SinkPoisoned,
}

impl SimError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SimError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the errors detected before computation starts.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SimError::UnsupportedMetric(_)
                | SimError::MissingOutputPath { .. }
                | SimError::UnsupportedFormat { .. }
                | SimError::UnsupportedInput { .. }
        )
    }

    /// True for per-pair scoring failures (the only kind the skip policy tolerates).
    pub fn is_compute_error(&self) -> bool {
        matches!(self, SimError::LengthMismatch { .. })
    }
}
