// src/ingest/fetcher.rs
//! One source, one page: navigate, settle, scroll, extract.
//!
//! Failures never leave this module as errors; they become a `SourceReport`
//! with `error` set and no listings, so the rest of the run carries on.

use anyhow::{anyhow, Context, Result};
use metrics::{counter, histogram};
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{PacingConfig, ScrollConfig};
use crate::ingest::extract::{PageContext, SiteExtractor};
use crate::ingest::page::{Page, PageFetcher};
use crate::ingest::types::{Listing, Source};

/// A resolved source: concrete URL plus the extractor that understands it.
#[derive(Clone)]
pub struct SourceTarget {
    pub source: Source,
    pub url: String,
    pub location: Option<String>,
    pub extractor: Arc<dyn SiteExtractor>,
}

impl std::fmt::Debug for SourceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTarget")
            .field("source", &self.source)
            .field("url", &self.url)
            .field("location", &self.location)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: Source,
    pub url: String,
    pub listings: Vec<Listing>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl SourceReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Fetcher<'a> {
    pacing: &'a PacingConfig,
}

impl<'a> Fetcher<'a> {
    pub fn new(pacing: &'a PacingConfig) -> Self {
        Self { pacing }
    }

    pub async fn fetch(&self, pages: &dyn PageFetcher, target: &SourceTarget) -> SourceReport {
        let t0 = Instant::now();

        let delay = self.pacing.pre_nav_delay.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match pages.open_page().await {
            Ok(mut page) => {
                let res = self.drive(page.as_mut(), target).await;
                // Release on every path, whatever `drive` returned.
                if let Err(e) = page.close().await {
                    tracing::warn!(error = ?e, source = %target.source, "page close failed");
                }
                res
            }
            Err(e) => Err(e.context("opening page")),
        };

        let elapsed_ms = t0.elapsed().as_millis() as u64;
        histogram!("ingest_source_ms", "source" => target.source.as_str()).record(elapsed_ms as f64);

        match result {
            Ok(listings) => {
                counter!("ingest_listings_extracted_total", "source" => target.source.as_str())
                    .increment(listings.len() as u64);
                tracing::info!(
                    source = %target.source,
                    url = %target.url,
                    count = listings.len(),
                    elapsed_ms,
                    "source fetched"
                );
                SourceReport {
                    source: target.source,
                    url: target.url.clone(),
                    listings,
                    error: None,
                    elapsed_ms,
                }
            }
            Err(e) => {
                counter!("ingest_source_errors_total", "source" => target.source.as_str())
                    .increment(1);
                tracing::error!(
                    source = %target.source,
                    url = %target.url,
                    error = ?e,
                    "source failed, skipping"
                );
                SourceReport {
                    source: target.source,
                    url: target.url.clone(),
                    listings: Vec::new(),
                    error: Some(format!("{e:#}")),
                    elapsed_ms,
                }
            }
        }
    }

    async fn drive(&self, page: &mut dyn Page, target: &SourceTarget) -> Result<Vec<Listing>> {
        let timeout = Duration::from_millis(self.pacing.nav_timeout_ms);
        match tokio::time::timeout(timeout, page.navigate(&target.url, timeout)).await {
            Ok(res) => res?,
            Err(_) => {
                return Err(anyhow!(
                    "navigation timed out after {}ms",
                    self.pacing.nav_timeout_ms
                ))
            }
        }

        if self.pacing.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.pacing.settle_ms)).await;
        }

        if self.pacing.scroll.enabled {
            // Best effort: a broken scroll still leaves whatever already rendered.
            match scroll_until_stable(page, &self.pacing.scroll).await {
                Ok(rounds) => tracing::debug!(source = %target.source, rounds, "scroll settled"),
                Err(e) => tracing::warn!(source = %target.source, error = ?e, "scroll failed"),
            }
        }

        let html = page.content().await.context("reading rendered page")?;
        let ctx = PageContext {
            page_url: target.url.clone(),
            location: target.location.clone(),
        };
        Ok(extract_from_html(target.extractor.as_ref(), &html, &ctx))
    }
}

// Kept synchronous: the parsed DOM is not `Send` and must not live across an await.
fn extract_from_html(extractor: &dyn SiteExtractor, html: &str, ctx: &PageContext) -> Vec<Listing> {
    let doc = Html::parse_document(html);
    extractor.extract(&doc, ctx)
}

/// Scroll until the document stops growing or `max_rounds` is hit.
/// Returns the number of scroll steps taken.
pub async fn scroll_until_stable(page: &mut dyn Page, cfg: &ScrollConfig) -> Result<u32> {
    let mut last = page.document_height().await?;
    for round in 1..=cfg.max_rounds {
        page.scroll_to_bottom().await?;
        if cfg.step_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(cfg.step_delay_ms)).await;
        }
        let h = page.document_height().await?;
        if h <= last {
            return Ok(round);
        }
        last = h;
    }
    Ok(cfg.max_rounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelayRange;
    use crate::ingest::page::StaticPageFetcher;
    use crate::ingest::providers::extractor_for;

    fn quick_pacing() -> PacingConfig {
        PacingConfig {
            nav_timeout_ms: 1_000,
            settle_ms: 0,
            pre_nav_delay: DelayRange::ZERO,
            inter_source_delay: DelayRange::ZERO,
            scroll: ScrollConfig {
                enabled: true,
                max_rounds: 10,
                step_delay_ms: 0,
            },
        }
    }

    fn target(url: &str) -> SourceTarget {
        SourceTarget {
            source: Source::Emlakjet,
            url: url.to_string(),
            location: Some("istanbul-kadikoy".into()),
            extractor: extractor_for(Source::Emlakjet),
        }
    }

    const CARD: &str = r#"<div class="styles_listingItem__a1" data-id="ID"><a href="/ilan/ID"><h3>Flat ID</h3></a><div class="styles_price__b2">10.000 TL</div></div>"#;

    #[tokio::test]
    async fn scroll_stops_when_height_is_stable() {
        let chunks = vec!["<p>1</p>".to_string(), "<p>2</p>".to_string()];
        let f = StaticPageFetcher::new()
            .with_page("u", "<html><body></body></html>")
            .with_lazy_chunks("u", chunks);
        let mut page = f.open_page().await.unwrap();
        page.navigate("u", Duration::from_secs(1)).await.unwrap();
        let cfg = ScrollConfig {
            enabled: true,
            max_rounds: 50,
            step_delay_ms: 0,
        };
        // two growing steps, then one that observes no growth
        assert_eq!(scroll_until_stable(page.as_mut(), &cfg).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn scroll_is_bounded_by_max_rounds() {
        let chunks: Vec<String> = (0..20).map(|i| format!("<p>{i}</p>")).collect();
        let f = StaticPageFetcher::new()
            .with_page("u", "<html><body></body></html>")
            .with_lazy_chunks("u", chunks);
        let mut page = f.open_page().await.unwrap();
        page.navigate("u", Duration::from_secs(1)).await.unwrap();
        let cfg = ScrollConfig {
            enabled: true,
            max_rounds: 4,
            step_delay_ms: 0,
        };
        assert_eq!(scroll_until_stable(page.as_mut(), &cfg).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn lazy_loaded_cards_are_extracted_after_scroll() {
        let html = format!("<html><body>{}</body></html>", CARD.replace("ID", "1"));
        let f = StaticPageFetcher::new()
            .with_page("u", &html)
            .with_lazy_chunks("u", vec![CARD.replace("ID", "2")]);
        let pacing = quick_pacing();
        let report = Fetcher::new(&pacing).fetch(&f, &target("u")).await;
        assert!(report.is_ok());
        let ids: Vec<&str> = report.listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["emlakjet-1", "emlakjet-2"]);
        assert_eq!(f.closed(), 1);
    }

    #[tokio::test]
    async fn navigation_failure_yields_empty_report_and_releases_page() {
        let f = StaticPageFetcher::new().with_failure("u", "net::ERR_TIMED_OUT");
        let pacing = quick_pacing();
        let report = Fetcher::new(&pacing).fetch(&f, &target("u")).await;
        assert!(!report.is_ok());
        assert!(report.listings.is_empty());
        assert!(report.error.unwrap().contains("ERR_TIMED_OUT"));
        assert_eq!(f.opened(), 1);
        assert_eq!(f.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_navigation_delay_is_waited_out() {
        let html = format!("<html><body>{}</body></html>", CARD.replace("ID", "1"));
        let f = StaticPageFetcher::new().with_page("u", &html);
        let pacing = PacingConfig {
            pre_nav_delay: DelayRange::new(250, 400),
            ..quick_pacing()
        };
        let t0 = Instant::now();
        let report = Fetcher::new(&pacing).fetch(&f, &target("u")).await;
        let waited = t0.elapsed();
        assert!(report.is_ok());
        assert!(waited >= Duration::from_millis(250), "waited {waited:?}");
        assert!(waited <= Duration::from_millis(400), "waited {waited:?}");
        assert!(report.elapsed_ms >= 250);
    }
}
