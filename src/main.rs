//! Listing watcher — one scan per invocation (drive it from cron/CI).
//!
//! Usage: `listing-watch [location]`. Configuration comes from
//! `$LISTING_WATCH_CONFIG` or `config/listing_watch.{toml,json}`.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use listing_watch::config::{FetcherKind, WatchConfig, ENV_LOCATION};
use listing_watch::ingest::http::HttpPageFetcher;
use listing_watch::{NotifierMux, Pipeline, RunReport};

/// Compact logs by default; `LOG_FORMAT=json` for machine-readable output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("listing_watch=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[cfg(feature = "browser")]
async fn run_with_browser(pipeline: &Pipeline) -> Result<RunReport> {
    use listing_watch::ingest::browser::BrowserPageFetcher;

    let pages = BrowserPageFetcher::launch(&pipeline.config().user_agent).await?;
    let report = pipeline.run_once(&pages).await;
    if let Err(e) = pages.shutdown().await {
        tracing::warn!(error = ?e, "browser shutdown failed");
    }
    report
}

#[cfg(not(feature = "browser"))]
async fn run_with_browser(_pipeline: &Pipeline) -> Result<RunReport> {
    anyhow::bail!("fetcher = \"browser\" requires building with `--features browser`")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Positional argument wins over the environment.
    let location = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(ENV_LOCATION).ok());
    let cfg = WatchConfig::load_default()?
        .with_location(location.as_deref())
        .validated()?;
    info!(
        location = %cfg.location,
        sources = cfg.enabled_sources().count(),
        fetcher = ?cfg.fetcher,
        "scan starting"
    );

    let pipeline = Pipeline::new(cfg, NotifierMux::from_env())?;
    let report = match pipeline.config().fetcher {
        FetcherKind::Http => {
            let pages = HttpPageFetcher::new(&pipeline.config().user_agent)?;
            pipeline.run_once(&pages).await?
        }
        FetcherKind::Browser => run_with_browser(&pipeline).await?,
    };

    info!(
        status = ?report.status,
        fetched = report.fetched,
        new = report.new_listings.len(),
        stored = report.stored,
        failed_sources = ?report.failed_sources,
        "scan finished"
    );
    Ok(())
}
