//! Elasticsearch HTTP client

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Map, Value};
use url::Url;

use crate::backend::{SearchBackend, SearchPage, SearchRequest};
use crate::error::{Result, SearchError};

/// Failure bodies are clipped to this many characters in error messages
const MAX_REASON_CHARS: usize = 300;

/// Connection settings for [`EsClient`]
#[derive(Clone, Debug)]
pub struct EsClientConfig {
    /// Base endpoint, e.g. `http://localhost:9200`
    pub url: String,

    /// Index holding the log documents
    pub index: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for EsClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "logs".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Elasticsearch client wrapper scoped to one index
#[derive(Clone, Debug)]
pub struct EsClient {
    http: reqwest::Client,
    base: Url,
    index: String,
}

impl EsClient {
    /// Create a client for the configured endpoint and index
    pub fn new(config: &EsClientConfig) -> Result<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| SearchError::Endpoint(format!("{}: {}", config.url, e)))?;
        if base.cannot_be_a_base() {
            return Err(SearchError::Endpoint(config.url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base,
            index: config.index.clone(),
        })
    }

    /// The endpoint this client talks to
    pub fn url(&self) -> &str {
        self.base.as_str()
    }

    /// The index this client queries
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Build `<base>/<index>/<segments...>`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SearchError::Endpoint(self.base.to_string()))?
            .pop_if_empty()
            .push(&self.index)
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode a successful JSON body
    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                reason: clip(&body),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

impl SearchBackend for EsClient {
    async fn count(&self) -> Result<u64> {
        let url = self.endpoint(&["_count"])?;
        let body = self.send_json(self.http.get(url)).await?;

        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| SearchError::Decode(format!("no count in {}", clip(&body.to_string()))))
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let url = self.endpoint(&["_search"])?;
        let body = self
            .send_json(self.http.post(url).json(&request.body()))
            .await?;

        SearchPage::from_response(body)
    }

    async fn get(&self, id: &str) -> Result<Map<String, Value>> {
        let url = self.endpoint(&["_doc", id])?;
        let body = match self.send_json(self.http.get(url)).await {
            Err(SearchError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(SearchError::NotFound(id.to_string()));
            }
            other => other?,
        };

        if body.get("found").and_then(Value::as_bool) == Some(false) {
            return Err(SearchError::NotFound(id.to_string()));
        }

        match body.get("_source") {
            Some(Value::Object(source)) => Ok(source.clone()),
            _ => Err(SearchError::Decode(format!("no _source for {}", id))),
        }
    }
}

/// Clip a response body for inclusion in an error message
fn clip(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_REASON_CHARS {
        trimmed.to_string()
    } else {
        let clipped: String = trimmed.chars().take(MAX_REASON_CHARS).collect();
        format!("{}...", clipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> EsClient {
        EsClient::new(&EsClientConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_index_and_segments() {
        let es = client("http://localhost:9200");
        let url = es.endpoint(&["_search"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/logs/_search");
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let es = client("https://proxy.example.com/es/");
        let url = es.endpoint(&["_count"]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/es/logs/_count");
    }

    #[test]
    fn test_endpoint_encodes_document_id() {
        let es = client("http://localhost:9200");
        let url = es.endpoint(&["_doc", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/logs/_doc/a%2Fb%20c");
    }

    #[test]
    fn test_rejects_invalid_url() {
        let err = EsClient::new(&EsClientConfig {
            url: "not a url".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, SearchError::Endpoint(_)));

        let err = EsClient::new(&EsClientConfig {
            url: "mailto:ops@example.com".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, SearchError::Endpoint(_)));
    }

    #[test]
    fn test_clip_long_bodies() {
        let long = "x".repeat(MAX_REASON_CHARS + 50);
        let clipped = clip(&long);
        assert_eq!(clipped.chars().count(), MAX_REASON_CHARS + 3);
        assert!(clipped.ends_with("..."));
        assert_eq!(clip("  short  "), "short");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_connection_error() {
        let es = EsClient::new(&EsClientConfig {
            url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();
        let err = es.count().await.unwrap_err();
        assert!(err.is_connection(), "unexpected error: {err}");
    }
}
