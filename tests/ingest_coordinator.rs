// tests/ingest_coordinator.rs
use anyhow::Result;
use async_trait::async_trait;
use listing_watch::config::{DelayRange, PacingConfig, ScrollConfig};
use listing_watch::ingest::coordinator::IngestionCoordinator;
use listing_watch::ingest::fetcher::SourceTarget;
use listing_watch::ingest::page::{Page, PageFetcher, StaticPageFetcher};
use listing_watch::ingest::providers::extractor_for;
use listing_watch::Source;
use std::time::Duration;
use tokio::time::Instant;

const E_URL: &str = "https://e.test/";
const H_URL: &str = "https://h.test/";
const S_URL: &str = "https://s.test/";

fn pacing(nav_timeout_ms: u64) -> PacingConfig {
    paced(nav_timeout_ms, DelayRange::ZERO, DelayRange::ZERO)
}

fn paced(nav_timeout_ms: u64, pre_nav_delay: DelayRange, inter_source_delay: DelayRange) -> PacingConfig {
    PacingConfig {
        nav_timeout_ms,
        settle_ms: 0,
        pre_nav_delay,
        inter_source_delay,
        scroll: ScrollConfig {
            enabled: false,
            max_rounds: 0,
            step_delay_ms: 0,
        },
    }
}

fn targets() -> Vec<SourceTarget> {
    [(Source::Emlakjet, E_URL), (Source::Hepsiemlak, H_URL), (Source::Sahibinden, S_URL)]
        .into_iter()
        .map(|(source, url)| SourceTarget {
            source,
            url: url.to_string(),
            location: None,
            extractor: extractor_for(source),
        })
        .collect()
}

fn fixtures() -> StaticPageFetcher {
    StaticPageFetcher::new()
        .with_page(E_URL, include_str!("fixtures/emlakjet.html"))
        .with_page(H_URL, include_str!("fixtures/hepsiemlak.html"))
        .with_page(S_URL, include_str!("fixtures/sahibinden.html"))
}

/// Delays navigation per URL so concurrent sources finish out of order.
struct Delayed {
    inner: StaticPageFetcher,
    delays: Vec<(&'static str, Duration)>,
}

struct DelayedPage {
    inner: Box<dyn Page>,
    delays: Vec<(&'static str, Duration)>,
}

#[async_trait]
impl PageFetcher for Delayed {
    async fn open_page(&self) -> Result<Box<dyn Page>> {
        Ok(Box::new(DelayedPage {
            inner: self.inner.open_page().await?,
            delays: self.delays.clone(),
        }))
    }
}

#[async_trait]
impl Page for DelayedPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        if let Some((_, d)) = self.delays.iter().find(|(u, _)| *u == url) {
            tokio::time::sleep(*d).await;
        }
        self.inner.navigate(url, timeout).await
    }
    async fn content(&mut self) -> Result<String> {
        self.inner.content().await
    }
    async fn document_height(&mut self) -> Result<u64> {
        self.inner.document_height().await
    }
    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.inner.scroll_to_bottom().await
    }
    async fn close(self: Box<Self>) -> Result<()> {
        self.inner.close().await
    }
}

fn ids(out: &listing_watch::ingest::coordinator::IngestOutcome) -> Vec<String> {
    out.listings().into_iter().map(|l| l.id).collect()
}

#[tokio::test]
async fn concurrent_order_matches_sequential_order() {
    let pages = Delayed {
        inner: fixtures(),
        delays: vec![(E_URL, Duration::from_millis(150)), (H_URL, Duration::from_millis(50))],
    };
    let sequential = IngestionCoordinator::new(targets(), pacing(2_000), false)
        .collect(&pages)
        .await;
    let concurrent = IngestionCoordinator::new(targets(), pacing(2_000), true)
        .collect(&pages)
        .await;
    assert_eq!(sequential.total(), 7);
    assert_eq!(ids(&sequential), ids(&concurrent));
    let sources: Vec<Source> = concurrent.reports.iter().map(|r| r.source).collect();
    assert_eq!(sources, vec![Source::Emlakjet, Source::Hepsiemlak, Source::Sahibinden]);
    assert_eq!(pages.inner.closed(), 6);
}

#[tokio::test]
async fn slow_navigation_times_out_as_a_source_failure() {
    let pages = Delayed {
        inner: fixtures(),
        delays: vec![(H_URL, Duration::from_millis(500))],
    };
    let out = IngestionCoordinator::new(targets(), pacing(100), true)
        .collect(&pages)
        .await;
    let failed: Vec<Source> = out.failed().map(|r| r.source).collect();
    assert_eq!(failed, vec![Source::Hepsiemlak]);
    assert!(out.reports[1]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("timed out"));
    assert_eq!(out.total(), 5);
    // the timed-out tab is still released
    assert_eq!(pages.inner.closed(), 3);
}

#[tokio::test]
async fn all_sources_failing_is_an_empty_but_valid_outcome() {
    let pages = StaticPageFetcher::new()
        .with_failure(E_URL, "dns")
        .with_failure(H_URL, "dns")
        .with_failure(S_URL, "dns");
    let out = IngestionCoordinator::new(targets(), pacing(1_000), false)
        .collect(&pages)
        .await;
    assert!(out.is_empty());
    assert_eq!(out.failed().count(), 3);
    assert_eq!(pages.closed(), 3);
}

#[tokio::test(start_paused = true)]
async fn sequential_run_waits_before_each_source_and_between_sources() {
    let pages = fixtures();
    let pacing = paced(1_000, DelayRange::new(100, 100), DelayRange::new(1_000, 1_000));
    let t0 = Instant::now();
    let out = IngestionCoordinator::new(targets(), pacing, false)
        .collect(&pages)
        .await;
    let elapsed = t0.elapsed();
    assert_eq!(out.total(), 7);
    // three pre-navigation pauses plus two gaps
    assert!(elapsed >= Duration::from_millis(3 * 100 + 2 * 1_000), "elapsed {elapsed:?}");
    assert!(out.reports.iter().all(|r| r.elapsed_ms >= 100));
}

#[tokio::test(start_paused = true)]
async fn concurrent_run_staggers_source_starts() {
    let pages = fixtures();
    let pacing = paced(1_000, DelayRange::new(100, 100), DelayRange::new(1_000, 1_000));
    let t0 = Instant::now();
    let out = IngestionCoordinator::new(targets(), pacing, true)
        .collect(&pages)
        .await;
    let elapsed = t0.elapsed();
    assert_eq!(out.total(), 7);
    // last source starts two gaps in, then waits its own pre-navigation pause
    assert!(elapsed >= Duration::from_millis(2 * 1_000 + 100), "elapsed {elapsed:?}");
    // overlapping pre-navigation pauses make it shorter than a sequential run
    assert!(elapsed < Duration::from_millis(3 * 100 + 2 * 1_000), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn randomized_delays_stay_within_their_windows() {
    let pages = fixtures();
    let pacing = paced(1_000, DelayRange::new(50, 150), DelayRange::new(400, 900));
    let t0 = Instant::now();
    let out = IngestionCoordinator::new(targets(), pacing, false)
        .collect(&pages)
        .await;
    let elapsed = t0.elapsed();
    assert_eq!(out.failed().count(), 0);
    assert!(elapsed >= Duration::from_millis(3 * 50 + 2 * 400), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(3 * 150 + 2 * 900), "elapsed {elapsed:?}");
}
