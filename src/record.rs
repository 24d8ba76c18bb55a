//! Scored pair record
//!
//! One record is produced per (primary, comparison) pair and never mutated
//! afterwards. Field names double as the JSON keys and the CSV header.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// CSV header row, in field order.
pub const CSV_HEADER: [&str; 4] = ["metric", "s1", "s2", "score"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub metric: String,
    pub s1: String,
    pub s2: String,
    pub score: f64,
}

impl Record {
    pub fn new(metric: &str, s1: &str, s2: &str, score: f64) -> Self {
        Self {
            metric: metric.to_string(),
            s1: s1.to_string(),
            s2: s2.to_string(),
            score,
        }
    }

    /// Score rendered as fixed-point with 6 decimals (CSV and console).
    pub fn score_fixed(&self) -> String {
        format!("{:.6}", self.score)
    }

    /// Batch output order: descending score, then s1, then s2.
    pub fn batch_order(a: &Record, b: &Record) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.s1.cmp(&b.s1))
            .then_with(|| a.s2.cmp(&b.s2))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {}  {}  {}",
            self.metric,
            self.s1,
            self.s2,
            self.score_fixed()
        )
    }
}
