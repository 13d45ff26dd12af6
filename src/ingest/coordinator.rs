// src/ingest/coordinator.rs
//! Runs the fetcher over every configured source and flattens the results.
//!
//! Output order is always source-declaration order, then DOM order within a
//! source, regardless of whether sources ran one by one or concurrently.

use anyhow::Result;
use futures::future::join_all;

use crate::config::{PacingConfig, WatchConfig};
use crate::ingest::fetcher::{Fetcher, SourceReport, SourceTarget};
use crate::ingest::page::PageFetcher;
use crate::ingest::providers::extractor_for;
use crate::ingest::types::Listing;

#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    /// One report per target, in declaration order.
    pub reports: Vec<SourceReport>,
}

impl IngestOutcome {
    pub fn listings(&self) -> Vec<Listing> {
        self.reports
            .iter()
            .flat_map(|r| r.listings.iter().cloned())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.reports.iter().map(|r| r.listings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn failed(&self) -> impl Iterator<Item = &SourceReport> {
        self.reports.iter().filter(|r| !r.is_ok())
    }
}

pub struct IngestionCoordinator {
    targets: Vec<SourceTarget>,
    pacing: PacingConfig,
    concurrent: bool,
}

impl IngestionCoordinator {
    pub fn new(targets: Vec<SourceTarget>, pacing: PacingConfig, concurrent: bool) -> Self {
        Self {
            targets,
            pacing,
            concurrent,
        }
    }

    /// Resolve URL templates for every enabled source.
    pub fn from_config(cfg: &WatchConfig) -> Result<Self> {
        let location = cfg.location_tag();
        let targets = cfg
            .enabled_sources()
            .map(|s| SourceTarget {
                source: s.source,
                url: s.resolve_url(location.as_deref().unwrap_or_default()),
                location: location.clone(),
                extractor: extractor_for(s.source),
            })
            .collect::<Vec<_>>();
        if targets.is_empty() {
            anyhow::bail!("no enabled sources configured");
        }
        Ok(Self::new(targets, cfg.pacing.clone(), cfg.concurrent))
    }

    pub fn targets(&self) -> &[SourceTarget] {
        &self.targets
    }

    pub async fn collect(&self, pages: &dyn PageFetcher) -> IngestOutcome {
        crate::ingest::ensure_metrics_described();
        let fetcher = Fetcher::new(&self.pacing);

        let reports = if self.concurrent {
            // Staggered starts; join_all keeps input order whatever finishes first.
            let futs = self.targets.iter().enumerate().map(|(i, t)| {
                let fetcher = &fetcher;
                async move {
                    if i > 0 {
                        let stagger = self.pacing.inter_source_delay.sample() * i as u32;
                        tokio::time::sleep(stagger).await;
                    }
                    fetcher.fetch(pages, t).await
                }
            });
            join_all(futs).await
        } else {
            let mut out = Vec::with_capacity(self.targets.len());
            for (i, t) in self.targets.iter().enumerate() {
                if i > 0 {
                    let gap = self.pacing.inter_source_delay.sample();
                    if !gap.is_zero() {
                        tracing::debug!(gap_ms = gap.as_millis() as u64, "pausing between sources");
                        tokio::time::sleep(gap).await;
                    }
                }
                out.push(fetcher.fetch(pages, t).await);
            }
            out
        };

        let outcome = IngestOutcome { reports };
        let failed = outcome.failed().count();
        tracing::info!(
            sources = outcome.reports.len(),
            failed,
            listings = outcome.total(),
            "ingest finished"
        );
        outcome
    }
}
