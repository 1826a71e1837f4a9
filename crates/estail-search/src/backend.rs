//! The search contract consumed by the polling engine.

use std::future::Future;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Result;
use estail_types::LogDocument;

/// One search call: a query body and how many hits to return.
///
/// Results are always requested in ascending timestamp order.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    /// The `query` part of the request body
    pub query: Value,

    /// Maximum number of hits
    pub size: usize,
}

impl SearchRequest {
    pub fn new(query: Value, size: usize) -> Self {
        Self { query, size }
    }

    /// Full request body, with ascending timestamp sort and size applied
    pub fn body(&self) -> Value {
        let mut body = match &self.query {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        body.insert(
            "sort".to_string(),
            serde_json::json!([{ "timestamp": { "order": "asc" } }]),
        );
        body.insert("size".to_string(), Value::from(self.size));
        Value::Object(body)
    }
}

/// One page of search results
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Total matching documents as reported by the backend
    pub total: u64,

    /// Hits in ascending timestamp order
    pub hits: Vec<LogDocument>,
}

impl SearchPage {
    pub fn new(total: u64, hits: Vec<LogDocument>) -> Self {
        Self { total, hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Decode a raw `_search` response body.
    ///
    /// Hits whose source has no usable timestamp are dropped.
    pub fn from_response(body: Value) -> Result<Self> {
        let response: RawSearchResponse = serde_json::from_value(body)?;
        let mut hits = Vec::with_capacity(response.hits.hits.len());

        for hit in response.hits.hits {
            match LogDocument::from_source(&hit.id, &hit.source) {
                Some(doc) => hits.push(doc),
                None => tracing::debug!("Skipping hit {} without a timestamp", hit.id),
            }
        }

        Ok(Self {
            total: response.hits.total.value(),
            hits,
        })
    }
}

#[derive(Deserialize)]
struct RawSearchResponse {
    hits: RawHits,
}

#[derive(Deserialize)]
struct RawHits {
    total: RawTotal,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// `hits.total` is a bare integer on older servers and an object on newer ones
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Count(u64),
    Object { value: u64 },
}

impl RawTotal {
    fn value(&self) -> u64 {
        match self {
            Self::Count(n) | Self::Object { value: n } => *n,
        }
    }
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
}

/// Trait for log search backends.
///
/// The engine only ever awaits one call at a time, but the futures are `Send`
/// so implementations can be driven from any runtime flavor.
pub trait SearchBackend {
    /// Total number of documents in the index.
    fn count(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Run a time-ranged search, ascending by timestamp.
    fn search(&self, request: &SearchRequest) -> impl Future<Output = Result<SearchPage>> + Send;

    /// Fetch one document's source by identifier.
    ///
    /// Returns [`SearchError::NotFound`](crate::SearchError::NotFound) when the
    /// document does not exist.
    fn get(&self, id: &str) -> impl Future<Output = Result<Map<String, Value>>> + Send;
}
