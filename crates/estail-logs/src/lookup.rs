use std::fmt::Write as _;

use serde_json::{Map, Value};

use estail_search::{SearchBackend, SearchError};

/// Attempts made before a missing document is reported as not found
pub const LOOKUP_ATTEMPTS: u32 = 4;

/// A document fetched by identifier
#[derive(Clone, Debug, PartialEq)]
pub struct Lookup {
    pub id: String,
    pub source: Map<String, Value>,
    /// Attempt that succeeded, starting at 1
    pub tries: u32,
}

/// Fetch one document by identifier.
///
/// Only "not found" is retried, immediately and up to `attempts` times in
/// total, since a freshly written document may not be visible yet. Returns
/// `Ok(None)` once the attempts run out; any other failure is returned as is.
pub async fn lookup_document<B: SearchBackend>(
    backend: &B,
    id: &str,
    attempts: u32,
) -> Result<Option<Lookup>, SearchError> {
    let attempts = attempts.max(1);

    for tries in 1..=attempts {
        match backend.get(id).await {
            Ok(source) => {
                return Ok(Some(Lookup {
                    id: id.to_string(),
                    source,
                    tries,
                }));
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("Document {} not found (attempt {}/{})", id, tries, attempts);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(None)
}

/// Render a lookup result as a header line and one `field: value` line per
/// source field.
pub fn format_lookup(lookup: &Lookup) -> String {
    let mut out = format!("RESULT for ES#{} ({} tries) :\n", lookup.id, lookup.tries);
    for (field, value) in &lookup.source {
        let _ = writeln!(out, "{:<14}: {}", field, display_value(value));
    }
    out
}

/// Strings print bare, everything else as JSON
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
