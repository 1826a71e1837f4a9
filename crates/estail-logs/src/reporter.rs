use std::io::Write;
use std::time::Duration;

use tokio::time::Instant;

use crate::stats::LevelStats;
use estail_search::SearchBackend;

/// Minimum spacing between two idle stats lines
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(60);

/// What the reporter did on an idle cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdleReport {
    /// Wrote one progress dot
    Dot,
    /// Logged a stats summary line
    Stats(String),
    /// Nothing due yet
    Quiet,
}

/// Tracks whether the stream is idle and reports on idle cycles.
///
/// In progress mode every idle cycle writes a dot to `out`; otherwise a stats
/// line is logged at most once per `stats_interval`.
pub struct ProgressReporter<W: Write> {
    progress_mode: bool,
    idle: bool,
    stats_interval: Duration,
    last_stats: Instant,
    out: W,
}

impl<W: Write> ProgressReporter<W> {
    /// The stats timer starts now
    pub fn new(progress_mode: bool, stats_interval: Duration, out: W) -> Self {
        Self {
            progress_mode,
            idle: false,
            stats_interval,
            last_stats: Instant::now(),
            out,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// The progress output
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Handle a cycle that brought nothing new
    pub async fn idle_cycle<B: SearchBackend>(&mut self, backend: &B, stats: &LevelStats) -> IdleReport {
        self.idle = true;

        if self.progress_mode {
            self.write_progress(".");
            return IdleReport::Dot;
        }

        if self.last_stats.elapsed() < self.stats_interval {
            return IdleReport::Quiet;
        }

        match backend.count().await {
            Ok(count) => {
                self.last_stats = Instant::now();
                let line = stats.summary(count);
                tracing::info!("{}", line);
                IdleReport::Stats(line)
            }
            Err(e) => {
                tracing::warn!("Could not count documents for stats: {}", e);
                IdleReport::Quiet
            }
        }
    }

    /// Handle a cycle that brought new documents
    pub fn active_cycle(&mut self) {
        if self.idle && self.progress_mode {
            self.write_progress("\n");
        }
        self.idle = false;
    }

    /// Close an open progress line before exiting
    pub fn finish(&mut self) {
        self.active_cycle();
    }

    fn write_progress(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::debug!("Progress output failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    fn output(reporter: &ProgressReporter<Vec<u8>>) -> String {
        String::from_utf8_lossy(reporter.output()).into_owned()
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_mode_dots_then_newline() {
        let backend = ScriptedBackend::new().count(10);
        let stats = LevelStats::new();
        let mut reporter = ProgressReporter::new(true, DEFAULT_STATS_INTERVAL, Vec::new());

        reporter.active_cycle();
        assert_eq!(output(&reporter), "");

        assert_eq!(reporter.idle_cycle(&backend, &stats).await, IdleReport::Dot);
        assert_eq!(reporter.idle_cycle(&backend, &stats).await, IdleReport::Dot);
        assert!(reporter.is_idle());
        assert_eq!(output(&reporter), "..");

        reporter.active_cycle();
        assert!(!reporter.is_idle());
        assert_eq!(output(&reporter), "..\n");
        assert_eq!(backend.count_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_at_most_once_per_interval() {
        let backend = ScriptedBackend::new().count(500);
        let mut stats = LevelStats::new();
        stats.record(Some("ERROR"));
        let mut reporter = ProgressReporter::new(false, DEFAULT_STATS_INTERVAL, Vec::new());

        // Timer starts at construction
        assert_eq!(reporter.idle_cycle(&backend, &stats).await, IdleReport::Quiet);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(
            reporter.idle_cycle(&backend, &stats).await,
            IdleReport::Stats("STATS: 500 logs, ERROR=1".to_string())
        );

        // Fast polling inside the window stays quiet
        for _ in 0..30 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert_eq!(reporter.idle_cycle(&backend, &stats).await, IdleReport::Quiet);
        }

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(matches!(reporter.idle_cycle(&backend, &stats).await, IdleReport::Stats(_)));
        assert_eq!(backend.count_calls(), 2);
        assert_eq!(output(&reporter), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_count_retries_next_idle_cycle() {
        let failing = ScriptedBackend::new();
        let working = ScriptedBackend::new().count(3);
        let stats = LevelStats::new();
        let mut reporter = ProgressReporter::new(false, DEFAULT_STATS_INTERVAL, Vec::new());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(reporter.idle_cycle(&failing, &stats).await, IdleReport::Quiet);
        assert_eq!(
            reporter.idle_cycle(&working, &stats).await,
            IdleReport::Stats("STATS: 3 logs".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_closes_progress_line() {
        let backend = ScriptedBackend::new();
        let stats = LevelStats::new();
        let mut reporter = ProgressReporter::new(true, DEFAULT_STATS_INTERVAL, Vec::new());

        reporter.idle_cycle(&backend, &stats).await;
        reporter.finish();
        assert_eq!(output(&reporter), ".\n");
    }
}
