//! Scripted in-memory backend for engine tests.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use estail_search::{Result, SearchBackend, SearchError, SearchPage, SearchRequest};
use estail_types::LogDocument;

/// Plays back a fixed sequence of search results.
///
/// Once the script runs dry every search returns an empty page and, if a
/// token was attached, cancels it so a poll loop under test winds down.
#[derive(Default)]
pub struct ScriptedBackend {
    searches: Mutex<VecDeque<Result<SearchPage>>>,
    gets: Mutex<VecDeque<Result<Map<String, Value>>>>,
    requests: Mutex<Vec<SearchRequest>>,
    count: Mutex<Option<u64>>,
    count_calls: Mutex<usize>,
    get_calls: Mutex<usize>,
    stop_when_done: Option<CancellationToken>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_when_done(mut self, cancel: &CancellationToken) -> Self {
        self.stop_when_done = Some(cancel.clone());
        self
    }

    pub fn page(self, total: u64, hits: Vec<LogDocument>) -> Self {
        self.searches.lock().push_back(Ok(SearchPage::new(total, hits)));
        self
    }

    pub fn failure(self, error: SearchError) -> Self {
        self.searches.lock().push_back(Err(error));
        self
    }

    pub fn count(self, count: u64) -> Self {
        *self.count.lock() = Some(count);
        self
    }

    pub fn get_result(self, result: Result<Map<String, Value>>) -> Self {
        self.gets.lock().push_back(result);
        self
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().clone()
    }

    pub fn count_calls(&self) -> usize {
        *self.count_calls.lock()
    }

    pub fn get_calls(&self) -> usize {
        *self.get_calls.lock()
    }
}

impl SearchBackend for ScriptedBackend {
    async fn count(&self) -> Result<u64> {
        *self.count_calls.lock() += 1;
        (*self.count.lock()).ok_or_else(|| SearchError::Connection("no count scripted".to_string()))
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        self.requests.lock().push(request.clone());
        let next = self.searches.lock().pop_front();
        match next {
            Some(result) => result,
            None => {
                if let Some(cancel) = &self.stop_when_done {
                    cancel.cancel();
                }
                Ok(SearchPage::default())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Map<String, Value>> {
        *self.get_calls.lock() += 1;
        let next = self.gets.lock().pop_front();
        next.unwrap_or_else(|| Err(SearchError::NotFound(id.to_string())))
    }
}
