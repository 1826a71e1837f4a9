use std::collections::BTreeMap;
use std::fmt::Write as _;

use estail_types::{Severity, known_level_name};

/// Running counts of emitted documents per level name.
///
/// Names outside the level vocabulary, and documents without a level, are
/// counted under the lowest severity bucket's label. Counts only ever go up
/// during a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelStats {
    counts: BTreeMap<&'static str, u64>,
}

impl LevelStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one emitted document with the given level field
    pub fn record(&mut self, level: Option<&str>) {
        *self.counts.entry(Self::key(level)).or_insert(0) += 1;
    }

    /// Count for one level name (zero if never seen)
    pub fn get(&self, level: &str) -> u64 {
        self.counts.get(level).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Level names with at least one document, in name order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.counts.iter().map(|(name, count)| (*name, *count))
    }

    /// Summary line: `STATS: <index_count> logs, ERROR=1, WARN=3`
    pub fn summary(&self, index_count: u64) -> String {
        let mut line = format!("STATS: {} logs", index_count);
        for (name, count) in self.iter() {
            let _ = write!(line, ", {}={}", name, count);
        }
        line
    }

    fn key(level: Option<&str>) -> &'static str {
        level
            .and_then(known_level_name)
            .unwrap_or_else(|| Severity::default().label())
    }
}
