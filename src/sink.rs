//! Result sinks
//!
//! Workers hand every record to a `ResultSink`. Each sink owns exactly one
//! shared mutable resource behind exactly one mutex:
//! - `BatchCollector`: an in-memory `Vec<Record>`, sorted and emitted once
//!   after all workers have joined
//! - `StreamingAppender`: an open output file plus its emptiness flag; every
//!   record is appended immediately, so nothing is buffered in memory

use crate::config::OutputFormat;
use crate::container::AppendableContainer;
use crate::error::{Result, SimError};
use crate::record::Record;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Destination for records produced by concurrent workers
pub trait ResultSink: Sync {
    fn accept(&self, record: Record) -> Result<()>;
}

/// Accumulates records in memory for a single sort-and-emit pass
#[derive(Debug, Default)]
pub struct BatchCollector {
    records: Mutex<Vec<Record>>,
}

impl BatchCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Number of records collected so far. A poisoned lock still reports
    /// what was pushed before the panic.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the collector and return records in batch order
    /// (descending score, then s1, then s2).
    pub fn into_sorted(self) -> Result<Vec<Record>> {
        let mut records = self.records.into_inner().map_err(|_| SimError::SinkPoisoned)?;
        records.sort_by(Record::batch_order);
        Ok(records)
    }
}

impl ResultSink for BatchCollector {
    fn accept(&self, record: Record) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| SimError::SinkPoisoned)?
            .push(record);
        Ok(())
    }
}

/// Appends every record straight into an initialized output file
///
/// The whole read-modify-write append sequence runs under one lock, so
/// concurrent appends never interleave. Element order in the file follows
/// lock acquisition order.
#[derive(Debug)]
pub struct StreamingAppender {
    container: Mutex<AppendableContainer>,
}

impl StreamingAppender {
    /// Initialize `path` as an empty container, reopen it read/write and
    /// probe its emptiness.
    pub fn create(path: &Path, format: OutputFormat) -> Result<Self> {
        let container = AppendableContainer::create(path, format)?;
        tracing::debug!(
            "Initialized {:?} container at {:?} (empty: {})",
            format,
            path,
            container.is_empty()
        );
        Ok(Self::from_container(container))
    }

    pub fn from_container(container: AppendableContainer) -> Self {
        Self {
            container: Mutex::new(container),
        }
    }

    /// Close the file once every worker has joined.
    pub fn finish(self) -> Result<()> {
        self.container
            .into_inner()
            .map_err(|_| SimError::SinkPoisoned)?
            .finish()
    }
}

impl ResultSink for StreamingAppender {
    fn accept(&self, record: Record) -> Result<()> {
        self.container
            .lock()
            .map_err(|_| SimError::SinkPoisoned)?
            .append(&record)
    }
}
