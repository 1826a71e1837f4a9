//! Shared types for estail
//!
//! This crate contains data structures used across multiple estail crates.

use serde_json::{Map, Value};

// ============================================================================
// Severity
// ============================================================================

/// Display severity of a log document.
///
/// Ordered from least to most severe so that `>=` comparisons read naturally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// Lowest bucket; also where unknown or missing levels land
    #[default]
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Level names the backend is known to emit, and the bucket each one maps to.
///
/// The names are sent verbatim in level filter clauses, so keep their case.
pub const LEVEL_VOCABULARY: &[(&str, Severity)] = &[
    ("debug", Severity::Debug),
    ("DEBUG", Severity::Debug),
    ("notice", Severity::Debug),
    ("NOTICE", Severity::Debug),
    ("info", Severity::Info),
    ("INFO", Severity::Info),
    ("WARN", Severity::Warning),
    ("warning", Severity::Warning),
    ("err", Severity::Error),
    ("alert", Severity::Error),
    ("ERROR", Severity::Error),
    ("FATAL", Severity::Critical),
];

impl Severity {
    /// Map a backend level name to a severity bucket.
    ///
    /// Total: anything outside the vocabulary falls back to [`Severity::Debug`].
    pub fn from_name(name: &str) -> Self {
        LEVEL_VOCABULARY
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, severity)| *severity)
            .unwrap_or_default()
    }

    /// Severity for an optional level field
    pub fn from_level(level: Option<&str>) -> Self {
        level.map(Self::from_name).unwrap_or_default()
    }

    /// Upper-case bucket name, used in stats lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

/// The vocabulary spelling of a level name.
///
/// Exact spellings win; otherwise the first case-insensitive match is used.
/// `None` when the name is outside the vocabulary.
pub fn known_level_name(name: &str) -> Option<&'static str> {
    LEVEL_VOCABULARY
        .iter()
        .find(|(known, _)| *known == name)
        .or_else(|| {
            LEVEL_VOCABULARY
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(name))
        })
        .map(|(known, _)| *known)
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Level filter
// ============================================================================

/// Server-side level restriction selected on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelFilter {
    /// Only the lowest bucket (debug/notice)
    Notice,
    /// Error and above
    Error,
    /// Fatal/critical only
    Fatal,
}

impl LevelFilter {
    /// Whether documents in this severity bucket pass the filter
    pub fn admits(&self, severity: Severity) -> bool {
        match self {
            Self::Notice => severity == Severity::Debug,
            Self::Error => severity >= Severity::Error,
            Self::Fatal => severity == Severity::Critical,
        }
    }

    /// Vocabulary names admitted by this filter, in vocabulary order
    pub fn level_names(&self) -> Vec<&'static str> {
        LEVEL_VOCABULARY
            .iter()
            .filter(|(_, severity)| self.admits(*severity))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Space-separated names, ready for an OR-combined match clause
    pub fn match_terms(&self) -> String {
        self.level_names().join(" ")
    }
}

// ============================================================================
// Log documents
// ============================================================================

/// A log document as fetched from the index
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogDocument {
    /// Backend identifier (`_id`)
    pub id: String,

    /// Seconds since the Unix epoch
    pub timestamp: i64,

    /// Raw level name, if the document carries one
    pub level: Option<String>,

    /// Originating program
    pub program: String,

    /// Message body
    pub message: String,
}

impl LogDocument {
    /// Create a document with no level and an empty program
    pub fn new(id: impl Into<String>, timestamp: i64, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            level: None,
            program: String::new(),
            message: message.into(),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Build a document from a hit's `_id` and `_source`.
    ///
    /// Returns `None` when the source has no usable `timestamp`.
    pub fn from_source(id: &str, source: &Map<String, Value>) -> Option<Self> {
        let timestamp = source.get("timestamp").and_then(epoch_seconds)?;

        let text = |key: &str| match source.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Some(Self {
            id: id.to_string(),
            timestamp,
            level: text("level"),
            program: text("program").unwrap_or_default(),
            message: text("msg").or_else(|| text("message")).unwrap_or_default(),
        })
    }

    /// Severity bucket for this document's level
    pub fn severity(&self) -> Severity {
        Severity::from_level(self.level.as_deref())
    }
}

/// Coerce a JSON timestamp (integer, float, or numeric string) to whole seconds
fn epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}
