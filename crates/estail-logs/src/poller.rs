use std::io::Write;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::query::LogQuery;
use crate::reporter::ProgressReporter;
use crate::stats::LevelStats;
use crate::window::DedupWindow;
use estail_search::SearchBackend;
use estail_types::LogDocument;

/// Receives each document the first time it is seen
pub trait DocumentSink {
    fn accept(&mut self, doc: &LogDocument);
}

/// Collecting sink, handy for tests and batch use
impl DocumentSink for Vec<LogDocument> {
    fn accept(&mut self, doc: &LogDocument) {
        self.push(doc.clone());
    }
}

/// Timing for the poll loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollerConfig {
    /// Pause between successful cycles
    pub interval: Duration,

    /// Pause before retrying a failed search
    pub retry_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Result of a single poll cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The search failed; nothing changed
    Failed,
    /// Nothing beyond what was already seen
    Idle,
    /// The page was folded in; `fresh` documents were emitted
    Active { fresh: usize },
}

/// Incremental poll loop over a search backend.
///
/// Owns all streaming state: the query, the dedup window, the level tallies
/// and the progress reporter.
pub struct Poller<B, S, W: Write> {
    backend: B,
    query: LogQuery,
    window: DedupWindow,
    stats: LevelStats,
    sink: S,
    reporter: ProgressReporter<W>,
    config: PollerConfig,
}

impl<B, S, W> Poller<B, S, W>
where
    B: SearchBackend,
    S: DocumentSink,
    W: Write,
{
    pub fn new(
        backend: B,
        query: LogQuery,
        window: DedupWindow,
        sink: S,
        reporter: ProgressReporter<W>,
        config: PollerConfig,
    ) -> Self {
        Self {
            backend,
            query,
            window,
            stats: LevelStats::new(),
            sink,
            reporter,
            config,
        }
    }

    pub fn window(&self) -> &DedupWindow {
        &self.window
    }

    pub fn stats(&self) -> &LevelStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn reporter(&self) -> &ProgressReporter<W> {
        &self.reporter
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one search and fold its results in
    pub async fn poll_once(&mut self) -> CycleOutcome {
        self.query.set_lower_bound(self.window.watermark());
        let request = self.query.to_request(self.window.page_size());

        let page = match self.backend.search(&request).await {
            Ok(page) => page,
            Err(e) if e.is_connection() => {
                tracing::warn!("Search backend connection error: {}", e);
                return CycleOutcome::Failed;
            }
            Err(e) => {
                tracing::error!(
                    "Search backend is unreachable, will retry in {:.1}s ... ({})",
                    self.config.retry_delay.as_secs_f64(),
                    e
                );
                return CycleOutcome::Failed;
            }
        };

        if self.window.is_idle(page.total) {
            self.reporter.idle_cycle(&self.backend, &self.stats).await;
            return CycleOutcome::Idle;
        }

        self.reporter.active_cycle();
        let fresh = self.window.absorb(page.hits);
        for doc in &fresh {
            self.stats.record(doc.level.as_deref());
            self.sink.accept(doc);
        }

        CycleOutcome::Active { fresh: fresh.len() }
    }

    /// Poll until `cancel` fires.
    ///
    /// A search in flight always completes; only the pauses between cycles
    /// are cut short by cancellation.
    pub async fn run(&mut self, cancel: &CancellationToken) {
        tracing::debug!(
            "Polling from watermark {} every {:.1}s",
            self.window.watermark(),
            self.config.interval.as_secs_f64()
        );

        while !cancel.is_cancelled() {
            let pause = match self.poll_once().await {
                CycleOutcome::Failed => self.config.retry_delay,
                CycleOutcome::Idle | CycleOutcome::Active { .. } => self.config.interval,
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        self.reporter.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::DEFAULT_STATS_INTERVAL;
    use crate::testing::ScriptedBackend;
    use estail_search::SearchError;
    use estail_types::LevelFilter;
    use tokio::time::Instant;

    type TestPoller = Poller<ScriptedBackend, Vec<LogDocument>, Vec<u8>>;

    fn doc(id: &str, ts: i64) -> LogDocument {
        LogDocument::new(id, ts, format!("message {}", id))
    }

    fn poller(backend: ScriptedBackend, watermark: i64, base_page_size: usize, progress: bool) -> TestPoller {
        Poller::new(
            backend,
            LogQuery::new(watermark),
            DedupWindow::with_base_page_size(watermark, base_page_size),
            Vec::new(),
            ProgressReporter::new(progress, DEFAULT_STATS_INTERVAL, Vec::new()),
            PollerConfig::default(),
        )
    }

    fn rendered(poller: &TestPoller) -> Vec<&str> {
        poller.sink().iter().map(|d| d.id.as_str()).collect()
    }

    fn gte(request: &estail_search::SearchRequest) -> i64 {
        request.query["query"]["bool"]["filter"][0]["range"]["timestamp"]["gte"]
            .as_i64()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_pages_split_on_shared_timestamp() {
        let backend = ScriptedBackend::new()
            .page(3, vec![doc("a", 100), doc("b", 100)])
            .page(3, vec![doc("a", 100), doc("b", 100), doc("c", 101)]);
        let mut poller = poller(backend, 100, 2, false);

        assert_eq!(poller.poll_once().await, CycleOutcome::Active { fresh: 2 });
        assert_eq!(poller.window().watermark(), 100);
        assert_eq!(poller.window().page_size(), 4);

        assert_eq!(poller.poll_once().await, CycleOutcome::Active { fresh: 1 });
        assert_eq!(poller.window().watermark(), 101);
        assert_eq!(poller.window().page_size(), 2);
        assert_eq!(poller.window().seen_count(), 1);

        assert_eq!(rendered(&poller), vec!["a", "b", "c"]);

        let requests = poller.backend().requests();
        assert_eq!(requests[0].size, 2);
        assert_eq!(requests[1].size, 4);
        assert_eq!(gte(&requests[0]), 100);
        assert_eq!(gte(&requests[1]), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_changes_nothing() {
        let backend = ScriptedBackend::new()
            .failure(SearchError::Connection("refused".to_string()))
            .failure(SearchError::Status {
                status: 503,
                reason: "unavailable".to_string(),
            })
            .page(1, vec![doc("a", 7)]);
        let mut poller = poller(backend, 5, 100, false);

        assert_eq!(poller.poll_once().await, CycleOutcome::Failed);
        assert_eq!(poller.poll_once().await, CycleOutcome::Failed);
        assert_eq!(poller.window().watermark(), 5);
        assert!(poller.sink().is_empty());

        assert_eq!(poller.poll_once().await, CycleOutcome::Active { fresh: 1 });
        assert_eq!(poller.window().watermark(), 7);

        // The retried cycle repeats the same request
        let requests = poller.backend().requests();
        assert_eq!(gte(&requests[0]), 5);
        assert_eq!(gte(&requests[2]), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_page_is_not_rendered() {
        let backend = ScriptedBackend::new()
            .page(2, vec![doc("a", 10), doc("b", 10)])
            .page(2, vec![doc("a", 10), doc("b", 10)]);
        let mut poller = poller(backend, 0, 100, true);

        assert_eq!(poller.poll_once().await, CycleOutcome::Active { fresh: 2 });
        assert_eq!(poller.poll_once().await, CycleOutcome::Idle);
        assert!(poller.reporter().is_idle());
        assert_eq!(rendered(&poller), vec!["a", "b"]);
        assert_eq!(poller.reporter().output().as_slice(), b".");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_tally_by_level_name() {
        let backend = ScriptedBackend::new().page(
            5,
            vec![
                doc("a", 1).with_level("ERROR"),
                doc("b", 2).with_level("err"),
                doc("c", 3).with_level("mystery"),
                doc("d", 4),
                doc("e", 5).with_level("ERROR"),
            ],
        );
        let mut poller = poller(backend, 0, 100, false);
        poller.poll_once().await;

        assert_eq!(poller.stats().get("ERROR"), 2);
        assert_eq!(poller.stats().get("err"), 1);
        assert_eq!(poller.stats().get("DEBUG"), 2);
        assert_eq!(poller.stats().total(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_cancelled() {
        let cancel = CancellationToken::new();
        let backend = ScriptedBackend::new()
            .page(2, vec![doc("a", 10), doc("b", 11)])
            .failure(SearchError::Connection("reset".to_string()))
            .page(2, vec![doc("b", 11), doc("c", 12)])
            .stop_when_done(&cancel);

        let mut poller = Poller::new(
            backend,
            LogQuery::new(0).with_levels(LevelFilter::Error),
            DedupWindow::new(0),
            Vec::new(),
            ProgressReporter::new(true, DEFAULT_STATS_INTERVAL, Vec::new()),
            PollerConfig {
                interval: Duration::from_secs(2),
                retry_delay: Duration::from_secs(1),
            },
        );

        let start = Instant::now();
        poller.run(&cancel).await;

        assert_eq!(rendered(&poller), vec!["a", "b", "c"]);
        assert_eq!(poller.window().watermark(), 12);
        // interval + retry delay + interval, then the final search cancels
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        // Fourth search found nothing and went idle, finish() closed the dots
        assert_eq!(poller.reporter().output().as_slice(), b".\n");

        let watermarks: Vec<i64> = poller.backend().requests().iter().map(gte).collect();
        assert_eq!(watermarks, vec![0, 11, 11, 12]);
        assert!(watermarks.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_immediately_when_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut poller = poller(ScriptedBackend::new().page(1, vec![doc("a", 1)]), 0, 100, false);

        poller.run(&cancel).await;
        assert!(poller.backend().requests().is_empty());
        assert!(poller.sink().is_empty());
    }
}
