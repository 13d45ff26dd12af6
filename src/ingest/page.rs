// src/ingest/page.rs
//! Page acquisition capability consumed by the fetcher.
//!
//! A `PageFetcher` is the shared browser/session; each call to `open_page`
//! hands out an independent tab that the caller owns until `close`.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait Page: Send {
    /// Navigate and wait until the DOM is interactable (not network idle).
    /// Exceeding `timeout` is an error.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Serialized DOM as currently rendered.
    async fn content(&mut self) -> Result<String>;

    async fn document_height(&mut self) -> Result<u64>;

    async fn scroll_to_bottom(&mut self) -> Result<()>;

    /// Release the tab. Called exactly once by the fetcher on every exit path.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Must be safe to call concurrently; every page is independent.
    async fn open_page(&self) -> Result<Box<dyn Page>>;
}

/// Serves canned HTML by URL. Used for offline replay and tests.
///
/// Pages can be made to fail navigation, and `closed()` counts released tabs
/// so callers can assert that no page leaks.
#[derive(Default)]
pub struct StaticPageFetcher {
    pages: HashMap<String, String>,
    failing: HashMap<String, String>,
    // Simulated lazy-load: each scroll appends one more fragment.
    lazy: HashMap<String, Vec<String>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl StaticPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
        self.failing.insert(url.to_string(), reason.to_string());
        self
    }

    /// Fragments appended to the page body one per scroll step.
    pub fn with_lazy_chunks(mut self, url: &str, chunks: Vec<String>) -> Self {
        self.lazy.insert(url.to_string(), chunks);
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    async fn open_page(&self) -> Result<Box<dyn Page>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticPage {
            pages: self.pages.clone(),
            failing: self.failing.clone(),
            lazy: self.lazy.clone(),
            current: None,
            loaded_chunks: 0,
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct StaticPage {
    pages: HashMap<String, String>,
    failing: HashMap<String, String>,
    lazy: HashMap<String, Vec<String>>,
    current: Option<String>,
    loaded_chunks: usize,
    closed: Arc<AtomicUsize>,
}

impl StaticPage {
    fn current_url(&self) -> Result<&str> {
        self.current
            .as_deref()
            .ok_or_else(|| anyhow!("page has not navigated yet"))
    }

    fn rendered(&self) -> Result<String> {
        let url = self.current_url()?;
        let base = self
            .pages
            .get(url)
            .ok_or_else(|| anyhow!("no page registered for {url}"))?;
        let extra: String = self
            .lazy
            .get(url)
            .map(|chunks| chunks.iter().take(self.loaded_chunks).cloned().collect())
            .unwrap_or_default();
        if extra.is_empty() {
            return Ok(base.clone());
        }
        match base.rfind("</body>") {
            Some(pos) => Ok(format!("{}{}{}", &base[..pos], extra, &base[pos..])),
            None => Ok(format!("{base}{extra}")),
        }
    }
}

#[async_trait]
impl Page for StaticPage {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        if let Some(reason) = self.failing.get(url) {
            bail!("navigation to {url} failed: {reason}");
        }
        if !self.pages.contains_key(url) {
            bail!("navigation to {url} failed: 404");
        }
        self.current = Some(url.to_string());
        self.loaded_chunks = 0;
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.rendered()
    }

    async fn document_height(&mut self) -> Result<u64> {
        // Rough stand-in for layout height.
        Ok(self.rendered()?.len() as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        let url = self.current_url()?.to_string();
        let available = self.lazy.get(&url).map_or(0, |c| c.len());
        if self.loaded_chunks < available {
            self.loaded_chunks += 1;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lazy_chunks_grow_height_until_exhausted() {
        let f = StaticPageFetcher::new()
            .with_page("u", "<html><body>a</body></html>")
            .with_lazy_chunks("u", vec!["<p>b</p>".into()]);
        let mut p = f.open_page().await.unwrap();
        p.navigate("u", Duration::from_secs(1)).await.unwrap();
        let h0 = p.document_height().await.unwrap();
        p.scroll_to_bottom().await.unwrap();
        let h1 = p.document_height().await.unwrap();
        p.scroll_to_bottom().await.unwrap();
        let h2 = p.document_height().await.unwrap();
        assert!(h1 > h0);
        assert_eq!(h1, h2);
        assert!(p.content().await.unwrap().contains("<p>b</p></body>"));
        p.close().await.unwrap();
        assert_eq!(f.closed(), 1);
    }

    #[tokio::test]
    async fn registered_failure_is_an_error() {
        let f = StaticPageFetcher::new().with_failure("u", "timeout");
        let mut p = f.open_page().await.unwrap();
        let err = p.navigate("u", Duration::from_secs(1)).await.unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
