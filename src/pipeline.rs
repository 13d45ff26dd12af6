// src/pipeline.rs
//! One run: ingest → load store → merge → save → publish page → notify.
//!
//! Ordering matters: the store is persisted before anything external
//! happens, and an empty ingest touches nothing on disk.

use anyhow::Result;
use metrics::gauge;

use crate::config::WatchConfig;
use crate::ingest::coordinator::IngestionCoordinator;
use crate::ingest::page::PageFetcher;
use crate::ingest::types::{Listing, Source};
use crate::notify::{DispatchSummary, NotifierMux};
use crate::publish::publish_page;
use crate::store::ListingStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Published,
    /// Every source came back empty; store and page left untouched.
    SkippedNoData,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub fetched: usize,
    pub failed_sources: Vec<Source>,
    pub new_listings: Vec<Listing>,
    pub stored: usize,
    pub page_written: bool,
    pub notifications: DispatchSummary,
}

pub struct Pipeline {
    config: WatchConfig,
    coordinator: IngestionCoordinator,
    notifier: NotifierMux,
}

impl Pipeline {
    pub fn new(config: WatchConfig, notifier: NotifierMux) -> Result<Self> {
        let coordinator = IngestionCoordinator::from_config(&config)?;
        Ok(Self {
            config,
            coordinator,
            notifier,
        })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Only a failed store write is an error; everything else is logged.
    pub async fn run_once(&self, pages: &dyn PageFetcher) -> Result<RunReport> {
        let outcome = self.coordinator.collect(pages).await;
        let failed_sources: Vec<Source> = outcome.failed().map(|r| r.source).collect();

        if outcome.is_empty() {
            tracing::warn!(
                failed = ?failed_sources,
                "no listings from any source, keeping previous store and page"
            );
            return Ok(RunReport {
                status: RunStatus::SkippedNoData,
                fetched: 0,
                failed_sources,
                new_listings: Vec::new(),
                stored: 0,
                page_written: false,
                notifications: DispatchSummary::default(),
            });
        }

        let candidates = outcome.listings();
        let mut store = ListingStore::load(
            &self.config.store_path,
            self.config.max_size,
            self.config.merge_policy,
        );
        let known_before = store.len();
        let fresh = store.merge(&candidates);
        store.save(&self.config.store_path)?;
        tracing::info!(
            candidates = candidates.len(),
            known_before,
            new = fresh.len(),
            stored = store.len(),
            "store merged"
        );

        let page_written = match publish_page(&self.config.output_path, store.entries()) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = ?e, "page publish failed, store already saved");
                false
            }
        };

        let notifications = self.notifier.notify_all(&fresh).await;
        if notifications.failed > 0 {
            tracing::warn!(
                sent = notifications.sent,
                failed = notifications.failed,
                "some notifications were not delivered"
            );
        }

        gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        Ok(RunReport {
            status: RunStatus::Published,
            fetched: candidates.len(),
            failed_sources,
            new_listings: fresh,
            stored: store.len(),
            page_written,
            notifications,
        })
    }
}
