//! Metric registry
//!
//! Maps a user-supplied metric name to a pure scoring function. Lookup is
//! case-insensitive and ignores `-`, `_` and spaces, so `Levenshtein-Ratio`,
//! `levenshtein_ratio` and `LEVENSHTEINRATIO` resolve to the same metric.
//!
//! Resolution happens once per run, before any worker is spawned.

pub mod lcs;

pub use lcs::longest_common_subsequence;

use crate::error::{Result, SimError};
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// Supported string metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Jaro similarity with the Winkler common-prefix boost (0-1, HIGH = similar)
    Jaro,
    /// Edit distance (insertions, deletions, substitutions)
    Levenshtein,
    /// `1 - levenshtein / max(len)` (0-1, HIGH = similar)
    LevenshteinRatio,
    /// Edit distance that also counts adjacent transpositions
    DamerauLevenshtein,
    /// Number of differing positions; equal lengths only
    Hamming,
    /// Length of the longest common subsequence
    LongestCommonSubsequence,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Jaro,
        Metric::Levenshtein,
        Metric::LevenshteinRatio,
        Metric::DamerauLevenshtein,
        Metric::Hamming,
        Metric::LongestCommonSubsequence,
    ];

    /// Canonical name written into every record
    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Jaro => "Jaro",
            Metric::Levenshtein => "Levenshtein",
            Metric::LevenshteinRatio => "LevenshteinRatio",
            Metric::DamerauLevenshtein => "DamerauLevenshtein",
            Metric::Hamming => "Hamming",
            Metric::LongestCommonSubsequence => "LongestCommonSubsequence",
        }
    }

    /// Score one pair.
    ///
    /// Only Hamming can fail, with `LengthMismatch` when the strings differ
    /// in length.
    pub fn score(self, s1: &str, s2: &str) -> Result<f64> {
        let score = match self {
            Metric::Jaro => jaro_prefix_boosted(s1, s2),
            Metric::Levenshtein => strsim::levenshtein(s1, s2) as f64,
            Metric::LevenshteinRatio => levenshtein_ratio(s1, s2),
            Metric::DamerauLevenshtein => strsim::damerau_levenshtein(s1, s2) as f64,
            Metric::Hamming => strsim::hamming(s1, s2).map_err(|_| SimError::LengthMismatch {
                metric: self.display_name(),
                s1: s1.to_string(),
                s2: s2.to_string(),
            })? as f64,
            Metric::LongestCommonSubsequence => longest_common_subsequence(s1, s2) as f64,
        };
        Ok(score)
    }
}

impl std::str::FromStr for Metric {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self> {
        resolve(name)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

fn registry() -> &'static FxHashMap<&'static str, Metric> {
    static REGISTRY: OnceLock<FxHashMap<&'static str, Metric>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = FxHashMap::default();
        map.insert("jaro", Metric::Jaro);
        map.insert("levenshtein", Metric::Levenshtein);
        map.insert("levenshteinratio", Metric::LevenshteinRatio);
        map.insert("dameraulevenshtein", Metric::DamerauLevenshtein);
        map.insert("hamming", Metric::Hamming);
        map.insert("lcs", Metric::LongestCommonSubsequence);
        map.insert("longestcommonsubsequence", Metric::LongestCommonSubsequence);
        map
    })
}

/// Resolve a metric name, failing with `UnsupportedMetric` on unknown keys.
pub fn resolve(name: &str) -> Result<Metric> {
    let key: String = name
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect();

    registry()
        .get(key.as_str())
        .copied()
        .ok_or_else(|| SimError::UnsupportedMetric(name.to_string()))
}

/// Jaro similarity plus the Winkler bonus for a shared prefix of up to 4
/// characters, applied unconditionally (scaling factor 0.1).
fn jaro_prefix_boosted(s1: &str, s2: &str) -> f64 {
    let jaro = strsim::jaro(s1, s2);
    let prefix = s1
        .chars()
        .zip(s2.chars())
        .take(4)
        .take_while(|(a, b)| a == b)
        .count();
    (jaro + 0.1 * prefix as f64 * (1.0 - jaro)).min(1.0)
}

fn levenshtein_ratio(s1: &str, s2: &str) -> f64 {
    let longest = s1.chars().count().max(s2.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(s1, s2) as f64 / longest as f64
}
