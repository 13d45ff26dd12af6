// src/ingest/http.rs
//! Plain HTTP page fetcher. No JavaScript, so "rendered DOM" is the server
//! response and scrolling never loads anything more.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::ingest::page::{Page, PageFetcher};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn open_page(&self) -> Result<Box<dyn Page>> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            body: None,
        }))
    }
}

struct HttpPage {
    client: Client,
    body: Option<String>,
}

#[async_trait]
impl Page for HttpPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let rsp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("http get {url}"))?
            .error_for_status()
            .with_context(|| format!("http status for {url}"))?;
        let body = rsp.text().await.context("http .text()")?;
        self.body = Some(body);
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.body
            .clone()
            .ok_or_else(|| anyhow!("page has not navigated yet"))
    }

    async fn document_height(&mut self) -> Result<u64> {
        Ok(0)
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
