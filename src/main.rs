mod config;
mod exit;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::Subscriber;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use config::{FileConfig, Overrides, Settings};
use estail_logs::{
    DedupWindow, LOOKUP_ATTEMPTS, LevelFilter, LogQuery, Poller, PollerConfig, ProgressReporter,
    format_lookup, initial_watermark, lookup_document,
};
use estail_render::{EVENTS_TARGET, EventRenderer, RenderOptions, Theme, TracingSink};
use estail_search::{EsClient, EsClientConfig, SearchBackend};
use exit::{codes, exit_code};

/// Rendered events print as bare lines; diagnostics keep their level
fn output_layers<S, W>(make_writer: W, ansi: bool) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Clone + Send + Sync + 'static,
{
    let events = tracing_subscriber::fmt::layer()
        .with_writer(make_writer.clone())
        .with_ansi(ansi)
        .with_level(false)
        .with_target(false)
        .without_time()
        .with_filter(filter_fn(|meta| meta.target() == EVENTS_TARGET));

    let diagnostics = tracing_subscriber::fmt::layer()
        .with_writer(make_writer)
        .with_ansi(ansi)
        .with_target(false)
        .without_time()
        .with_filter(filter_fn(|meta| meta.target() != EVENTS_TARGET));

    events.and_then(diagnostics)
}

/// Default log filter: diagnostics at info, every rendered event
const DEFAULT_LOG_FILTER: &str = "info,events=trace";

/// estail - Follow a search-indexed log store from the terminal
#[derive(Parser, Debug)]
#[command(name = "estail")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Do not truncate messages
    #[arg(long)]
    full: bool,

    /// Only errors and worse
    #[arg(long, group = "level")]
    error: bool,

    /// Only fatals
    #[arg(long, group = "level")]
    fatal: bool,

    /// Only notices and debug messages
    #[arg(long, group = "level")]
    notice: bool,

    /// Start from N hours ago
    #[arg(long = "from", value_name = "HOURS")]
    from: Option<u32>,

    /// Print a dot per idle poll instead of periodic stats
    #[arg(long)]
    progress: bool,

    /// Only messages matching PATTERN; use /pattern/ for a regex
    #[arg(long, value_name = "PATTERN")]
    grep: Option<String>,

    /// Drop messages matching PATTERN; use /pattern/ for a regex
    #[arg(long, value_name = "PATTERN")]
    exclude: Option<String>,

    /// Fetch a single document by identifier and exit
    #[arg(long, value_name = "ID")]
    id: Option<String>,

    /// Seconds between polls [default: 1]
    #[arg(long, value_name = "SECONDS")]
    interval: Option<f64>,

    /// Search backend endpoint [default: http://localhost:9200]
    #[arg(long, env = "ESTAIL_URL")]
    url: Option<String>,

    /// Index holding the logs [default: logs]
    #[arg(long, env = "ESTAIL_INDEX")]
    index: Option<String>,

    /// Alternate config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Args {
    fn level_filter(&self) -> Option<LevelFilter> {
        if self.notice {
            Some(LevelFilter::Notice)
        } else if self.error {
            Some(LevelFilter::Error)
        } else if self.fatal {
            Some(LevelFilter::Fatal)
        } else {
            None
        }
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            index: self.index.clone(),
            interval: self.interval,
        }
    }

    fn query(&self) -> LogQuery {
        let mut query = LogQuery::new(0);
        if let Some(filter) = self.level_filter() {
            query = query.with_levels(filter);
        }
        if let Some(pattern) = &self.grep {
            query = query.with_include(pattern);
        }
        if let Some(pattern) = &self.exclude {
            query = query.with_exclude(pattern);
        }
        query
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(output_layers(io::stderr, io::stderr().is_terminal()))
        .init();

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
        .and_then(|runtime| runtime.block_on(run(args)));

    match result {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code(codes::FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    let file = FileConfig::discover(args.config.as_deref()).context("Failed to load config")?;
    let settings = Settings::resolve(file, args.overrides()).context("Invalid configuration")?;

    let client = EsClient::new(&EsClientConfig {
        url: settings.url.clone(),
        index: settings.index.clone(),
        timeout: settings.request_timeout,
    })
    .context("Failed to create search client")?;

    match &args.id {
        Some(id) => lookup(&client, id, &mut io::stdout()).await,
        None => tail(&args, &settings, client).await,
    }
}

/// One-shot fetch of a single document, printed to `out`
async fn lookup<B, W>(backend: &B, id: &str, out: &mut W) -> Result<u8>
where
    B: SearchBackend,
    W: Write,
{
    let found = lookup_document(backend, id, LOOKUP_ATTEMPTS)
        .await
        .with_context(|| format!("Failed to fetch document {}", id))?;

    let code = match found {
        Some(lookup) => {
            write!(out, "{}", format_lookup(&lookup))?;
            codes::SUCCESS
        }
        None => {
            writeln!(out, "Not Found.")?;
            codes::NOT_FOUND
        }
    };
    out.flush()?;

    Ok(code)
}

/// Follow the index until interrupted
async fn tail(args: &Args, settings: &Settings, client: EsClient) -> Result<u8> {
    match client.count().await {
        Ok(count) => tracing::info!("[{}] {} logs in index {}", client.url(), count, client.index()),
        Err(e) => tracing::warn!("[{}] could not count logs in index {}: {}", client.url(), client.index(), e),
    }

    let mut query = args.query();
    let watermark = initial_watermark(Utc::now().timestamp(), args.from, query.active_clauses());
    query.set_lower_bound(watermark);
    tracing::debug!("Search query: {}", query.to_value());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupted, stopping");
            on_interrupt.cancel();
        }
    });

    let theme = if std::io::stderr().is_terminal() {
        Theme::colored()
    } else {
        Theme::plain()
    };
    let renderer = EventRenderer::new(theme, RenderOptions { full: args.full }, TracingSink);
    let reporter = ProgressReporter::new(args.progress, settings.stats_interval, std::io::stdout());

    let mut poller = Poller::new(
        client,
        query,
        DedupWindow::with_base_page_size(watermark, settings.page_size),
        renderer,
        reporter,
        PollerConfig {
            interval: settings.interval,
            retry_delay: settings.retry_delay,
        },
    );
    poller.run(&cancel).await;

    Ok(codes::SUCCESS)
}
