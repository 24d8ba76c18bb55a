//! String similarity engine
//!
//! Scores every (primary, comparison) string pair with a selectable metric,
//! in parallel, and materializes the results either in memory (sorted,
//! printed, written once) or by streaming each record into an output file.
//!
//! Module layout:
//! - `metrics/`: Metric registry (Jaro, Levenshtein, ..., LCS)
//! - `partition`: Round-robin sharding of the comparison set
//! - `engine`: Worker pool and run orchestration
//! - `sink`: Batch collector and streaming appender
//! - `container`: JSON / CSV / JSON Lines file codec and append protocol
//! - `utils/`: Input loading and console output

pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod partition;
pub mod record;
pub mod sink;
pub mod utils;

// Re-export commonly used types
pub use config::{ComputeErrorPolicy, OutputFormat, RunConfig, DEFAULT_THRESHOLD};
pub use container::AppendableContainer;
pub use engine::{compute, run, run_with_console, score_all, ComputeStats, RunSummary, SinkMode};
pub use error::{Result, SimError};
pub use metrics::{resolve, Metric};
pub use record::Record;
pub use sink::{BatchCollector, ResultSink, StreamingAppender};
