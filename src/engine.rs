//! Similarity engine - cross-product computation and run orchestration
//!
//! A run resolves its metric, picks a result sink by pair count, partitions
//! the comparison set, and fans out one worker per shard on a dedicated
//! Rayon pool sized `min(|comparison|, max_workers)`. The pool is a single
//! join barrier: sorting, printing and closing the output only happen after
//! every worker has returned.
//!
//! Sink selection:
//! - `pairs <= threshold`: `BatchCollector`, then sort, print (unless
//!   silent), and write the output file once if one was given
//! - `pairs > threshold`: `StreamingAppender`; an output path is mandatory
//!   and its absence is reported before any work starts

use crate::config::{ComputeErrorPolicy, RunConfig};
use crate::container;
use crate::error::{Result, SimError};
use crate::metrics::{self, Metric};
use crate::partition;
use crate::record::Record;
use crate::sink::{BatchCollector, ResultSink, StreamingAppender};
use crate::utils::display;
use rayon::prelude::*;
use std::borrow::Cow;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Which result sink a run used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Batch,
    Streaming,
}

/// Per-pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputeStats {
    pub workers: usize,
    pub records: usize,
    pub skipped: usize,
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub metric: Metric,
    pub mode: SinkMode,
    pub pairs: usize,
    pub workers: usize,
    pub records: usize,
    pub skipped: usize,
    pub output: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Lower-case and/or transliterate every item to ASCII, in that order,
/// borrowing when neither is requested.
fn normalize<'a>(items: &'a [String], config: &RunConfig) -> Vec<Cow<'a, str>> {
    items
        .iter()
        .map(|s| {
            let mut item = Cow::Borrowed(s.as_str());
            if config.insensitive {
                item = Cow::Owned(item.to_lowercase());
            }
            if config.unidecode {
                item = Cow::Owned(deunicode::deunicode(&item));
            }
            item
        })
        .collect()
}

/// Score the full cross product `primary × comparison` into `sink`.
///
/// Blocks until every worker has finished. With `ComputeErrorPolicy::Abort`
/// the first failing pair stops all workers and its error is returned; with
/// `Skip`, failing pairs are logged and counted instead.
pub fn compute<S: ResultSink>(
    primary: &[String],
    comparison: &[String],
    metric: Metric,
    config: &RunConfig,
    sink: &S,
) -> Result<ComputeStats> {
    let primary = normalize(primary, config);
    let comparison = normalize(comparison, config);
    let comparison_refs: Vec<&str> = comparison.iter().map(|s| s.as_ref()).collect();

    let k = partition::shard_count(comparison_refs.len(), config.max_workers());
    let shards = partition::split(&comparison_refs, k);
    if shards.is_empty() || primary.is_empty() {
        return Ok(ComputeStats::default());
    }

    tracing::debug!(
        "Partitioned {} comparison strings into {} shards (sizes {:?})",
        comparison_refs.len(),
        shards.len(),
        shards.iter().map(Vec::len).collect::<Vec<_>>()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(shards.len())
        .thread_name(|i| format!("stringsim-worker-{}", i))
        .build()?;

    let worker = Worker {
        primary: &primary,
        metric,
        policy: config.on_compute_error,
        sink,
        abort: AtomicBool::new(false),
        records: AtomicUsize::new(0),
        skipped: AtomicUsize::new(0),
    };

    pool.install(|| shards.par_iter().try_for_each(|shard| worker.run(shard)))?;

    Ok(ComputeStats {
        workers: shards.len(),
        records: worker.records.into_inner(),
        skipped: worker.skipped.into_inner(),
    })
}

/// Shared read-only state for the worker routine
struct Worker<'a, S> {
    primary: &'a [Cow<'a, str>],
    metric: Metric,
    policy: ComputeErrorPolicy,
    sink: &'a S,
    abort: AtomicBool,
    records: AtomicUsize,
    skipped: AtomicUsize,
}

impl<S: ResultSink> Worker<'_, S> {
    fn run(&self, shard: &[&str]) -> Result<()> {
        let name = self.metric.display_name();

        for s1 in self.primary {
            for &s2 in shard {
                if self.abort.load(Ordering::Relaxed) {
                    return Ok(());
                }

                let score = match self.metric.score(s1, s2) {
                    Ok(score) => score,
                    Err(e) if e.is_compute_error() && self.policy == ComputeErrorPolicy::Skip => {
                        tracing::warn!("Skipping pair: {}", e);
                        self.skipped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    Err(e) => return Err(self.fail(e)),
                };

                self.sink
                    .accept(Record::new(name, s1, s2, score))
                    .map_err(|e| self.fail(e))?;
                self.records.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    fn fail(&self, e: SimError) -> SimError {
        self.abort.store(true, Ordering::Relaxed);
        e
    }
}

/// Score every pair and return the records in batch order, without
/// printing, writing files or applying the threshold gate.
///
/// Every record is held in memory; the up-front reservation is capped at
/// `config.threshold`.
pub fn score_all(primary: &[String], comparison: &[String], config: &RunConfig) -> Result<Vec<Record>> {
    let metric = metrics::resolve(&config.metric)?;
    let pairs = primary.len().saturating_mul(comparison.len());
    let collector = BatchCollector::with_capacity(pairs.min(config.threshold));
    compute(primary, comparison, metric, config, &collector)?;
    collector.into_sorted()
}

/// Run with console output going to stdout.
pub fn run(primary: &[String], comparison: &[String], config: &RunConfig) -> Result<RunSummary> {
    let stdout = std::io::stdout();
    let mut console = stdout.lock();
    run_with_console(primary, comparison, config, &mut console)
}

/// Run a full comparison, printing batch results to `console`.
///
/// All config errors (unknown metric, unsupported output extension, missing
/// output path above the threshold) are returned before any worker starts.
pub fn run_with_console<W: Write>(
    primary: &[String],
    comparison: &[String],
    config: &RunConfig,
    console: &mut W,
) -> Result<RunSummary> {
    let start = Instant::now();

    let metric = metrics::resolve(&config.metric)?;
    let format = config.output_format()?;
    let pairs = primary.len().saturating_mul(comparison.len());

    if pairs > config.threshold {
        let (path, format) = match (config.output.as_deref(), format) {
            (Some(path), Some(format)) => (path, format),
            _ => {
                return Err(SimError::MissingOutputPath {
                    pairs,
                    threshold: config.threshold,
                })
            }
        };

        tracing::info!(
            "{} pairs exceed threshold {}: streaming {} scores to {:?}",
            pairs,
            config.threshold,
            metric,
            path
        );

        let appender = StreamingAppender::create(path, format)?;
        let stats = compute(primary, comparison, metric, config, &appender)?;
        appender.finish()?;

        return Ok(summarize(metric, SinkMode::Streaming, pairs, stats, config, start));
    }

    tracing::info!("Scoring {} pairs with {} in memory", pairs, metric);

    let collector = BatchCollector::with_capacity(pairs);
    let stats = compute(primary, comparison, metric, config, &collector)?;
    let records = collector.into_sorted()?;

    if !config.silent {
        display::print_records(console, &records).map_err(|e| SimError::io("<stdout>", e))?;
    }

    if let (Some(path), Some(format)) = (config.output.as_deref(), format) {
        container::serialize_all(path, format, &records)?;
        tracing::info!("Wrote {} records to {:?}", records.len(), path);
    }

    Ok(summarize(metric, SinkMode::Batch, pairs, stats, config, start))
}

fn summarize(
    metric: Metric,
    mode: SinkMode,
    pairs: usize,
    stats: ComputeStats,
    config: &RunConfig,
    start: Instant,
) -> RunSummary {
    let summary = RunSummary {
        metric,
        mode,
        pairs,
        workers: stats.workers,
        records: stats.records,
        skipped: stats.skipped,
        output: config.output.clone(),
        elapsed: start.elapsed(),
    };
    tracing::info!(
        "Run complete: {} records from {} workers ({} skipped) in {:?}",
        summary.records,
        summary.workers,
        summary.skipped,
        summary.elapsed
    );
    summary
}
