// src/ingest/browser.rs
//! Headless Chromium page fetcher (feature `browser`).

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::ingest::page::{Page, PageFetcher};

const VIEWPORT_WIDTH: u32 = 1280;
const VIEWPORT_HEIGHT: u32 = 800;
const READY_POLL: Duration = Duration::from_millis(100);

pub struct BrowserPageFetcher {
    browser: Browser,
    user_agent: String,
    handler: JoinHandle<()>,
}

impl BrowserPageFetcher {
    pub async fn launch(user_agent: &str) -> Result<Self> {
        let config = BrowserConfig::builder()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Viewport::default()
            })
            .build()
            .map_err(|e| anyhow!("browser config: {e}"))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("launching chromium")?;
        let handler = tokio::spawn(async move {
            while let Some(ev) = handler.next().await {
                if let Err(e) = ev {
                    tracing::debug!(error = ?e, "browser handler event error");
                }
            }
        });
        Ok(Self {
            browser,
            user_agent: user_agent.to_string(),
            handler,
        })
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.browser.close().await.context("closing chromium")?;
        let _ = self.browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for BrowserPageFetcher {
    async fn open_page(&self) -> Result<Box<dyn Page>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("opening tab")?;
        page.set_user_agent(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .context("setting user agent")?;
        Ok(Box::new(BrowserPage { page }))
    }
}

struct BrowserPage {
    page: chromiumoxide::Page,
}

#[async_trait]
impl Page for BrowserPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, navigate_until_interactive(&self.page, url)).await {
            Ok(res) => res,
            Err(_) => Err(anyhow!(
                "navigation to {url} timed out after {}ms",
                timeout.as_millis()
            )),
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.page.content().await.context("reading page content")
    }

    async fn document_height(&mut self) -> Result<u64> {
        let h: f64 = self
            .page
            .evaluate("document.body ? document.body.scrollHeight : 0")
            .await
            .context("evaluating scrollHeight")?
            .into_value()
            .context("decoding scrollHeight")?;
        Ok(h.max(0.0) as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .context("scrolling")?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.context("closing tab")
    }
}

/// Resolves once the DOM is parsed (`readyState` past `loading`), without
/// waiting for the `load` event and its ad/tracker subresources.
async fn navigate_until_interactive(page: &chromiumoxide::Page, url: &str) -> Result<()> {
    let nav = page
        .execute(NavigateParams::new(url))
        .await
        .with_context(|| format!("navigating to {url}"))?;
    if let Some(err) = nav.result.error_text.as_deref() {
        bail!("navigating to {url}: {err}");
    }
    loop {
        let state: String = page
            .evaluate("document.readyState")
            .await
            .context("reading readyState")?
            .into_value()
            .context("decoding readyState")?;
        if state != "loading" {
            return Ok(());
        }
        tokio::time::sleep(READY_POLL).await;
    }
}
