use serde_json::{Value, json};

use estail_search::SearchRequest;
use estail_types::LevelFilter;

/// Default look-back when no history depth is requested (1 hour and 1 minute)
pub const DEFAULT_LOOKBACK_SECS: i64 = 3600 + 60;

/// Extra look-back per active filter clause, to absorb indexing skew
pub const CLAUSE_MARGIN_SECS: i64 = 60;

/// Field holding the document timestamp
const TIMESTAMP_FIELD: &str = "timestamp";

/// Field holding the level name
const LEVEL_FIELD: &str = "level";

/// Field searched by include/exclude patterns
const MESSAGE_FIELD: &str = "msg";

/// Turn a user pattern into query-string syntax.
///
/// Several space-separated terms become an AND of those terms; inside a
/// `/regex/` every space becomes ` AND ` as well, and nothing else changes.
/// A single term is wrapped as a substring wildcard unless it already starts
/// or ends with `*`.
pub fn normalize_pattern(pattern: &str) -> String {
    if pattern.starts_with('/') {
        return pattern.replace(' ', " AND ");
    }

    let terms: Vec<&str> = pattern.split(' ').filter(|t| !t.is_empty()).collect();
    match terms.as_slice() {
        [] => String::new(),
        [term] if term.starts_with('*') || term.ends_with('*') => (*term).to_string(),
        [term] => format!("*{}*", term),
        _ => terms.join(" AND "),
    }
}

/// Lower bound of the very first query.
///
/// `from_hours` of `None` or `Some(0)` means the default look-back.
pub fn initial_watermark(now: i64, from_hours: Option<u32>, active_clauses: usize) -> i64 {
    let lookback = match from_hours {
        Some(hours) if hours > 0 => i64::from(hours) * 3600,
        _ => DEFAULT_LOOKBACK_SECS,
    };
    now - lookback - CLAUSE_MARGIN_SECS * active_clauses as i64
}

/// Time-ranged log query with optional level and text clauses.
///
/// Only the lower bound changes between polls; the clauses are fixed for a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogQuery {
    lower_bound: i64,
    levels: Option<String>,
    include: Option<String>,
    exclude: Option<String>,
}

impl LogQuery {
    pub fn new(lower_bound: i64) -> Self {
        Self {
            lower_bound,
            ..Default::default()
        }
    }

    /// Restrict to the level names admitted by `filter`
    pub fn with_levels(mut self, filter: LevelFilter) -> Self {
        let terms = filter.match_terms();
        if !terms.is_empty() {
            self.levels = Some(terms);
        }
        self
    }

    /// Only keep messages matching `pattern` (normalized)
    pub fn with_include(mut self, pattern: &str) -> Self {
        self.include = Some(normalize_pattern(pattern)).filter(|p| !p.is_empty());
        self
    }

    /// Drop messages matching `pattern` (normalized)
    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.exclude = Some(normalize_pattern(pattern)).filter(|p| !p.is_empty());
        self
    }

    pub fn lower_bound(&self) -> i64 {
        self.lower_bound
    }

    pub fn set_lower_bound(&mut self, lower_bound: i64) {
        self.lower_bound = lower_bound;
    }

    pub fn include(&self) -> Option<&str> {
        self.include.as_deref()
    }

    pub fn exclude(&self) -> Option<&str> {
        self.exclude.as_deref()
    }

    /// Number of level/include/exclude clauses in use
    pub fn active_clauses(&self) -> usize {
        [&self.levels, &self.include, &self.exclude]
            .iter()
            .filter(|clause| clause.is_some())
            .count()
    }

    /// Query body for the backend
    pub fn to_value(&self) -> Value {
        let mut must = Vec::new();
        if let Some(levels) = &self.levels {
            must.push(json!({
                "match": { LEVEL_FIELD: { "query": levels, "operator": "or" } }
            }));
        }
        if let Some(include) = &self.include {
            must.push(json!({
                "query_string": { "fields": [MESSAGE_FIELD], "query": include }
            }));
        }

        let mut must_not = Vec::new();
        if let Some(exclude) = &self.exclude {
            must_not.push(json!({
                "query_string": { "fields": [MESSAGE_FIELD], "query": exclude }
            }));
        }

        let mut bool_query = serde_json::Map::new();
        bool_query.insert(
            "filter".to_string(),
            json!([{ "range": { TIMESTAMP_FIELD: { "gte": self.lower_bound } } }]),
        );
        if !must.is_empty() {
            bool_query.insert("must".to_string(), Value::Array(must));
        }
        if !must_not.is_empty() {
            bool_query.insert("must_not".to_string(), Value::Array(must_not));
        }

        json!({ "query": { "bool": bool_query } })
    }

    /// Search request for one page of `size` hits
    pub fn to_request(&self, size: usize) -> SearchRequest {
        SearchRequest::new(self.to_value(), size)
    }
}
