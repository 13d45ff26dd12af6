// src/notify/mod.rs
//! Per-listing notifications. Delivery is best effort: failures are logged
//! and counted, never retried inline and never propagated.

pub mod discord;
pub mod email;
pub mod slack;
pub mod telegram;

use anyhow::Result;
use metrics::counter;

use crate::ingest::types::{Listing, Source};

/// Payload for one newly seen listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingAlert {
    pub title: String,
    pub price: String,
    pub link: String,
    pub source: Source,
}

impl From<&Listing> for ListingAlert {
    fn from(l: &Listing) -> Self {
        Self {
            title: l.title.clone(),
            price: l.price.clone(),
            link: l.link.clone(),
            source: l.source,
        }
    }
}

impl ListingAlert {
    /// Plain-text rendering shared by the text-based channels.
    pub fn text(&self) -> String {
        format!(
            "New listing ({}): {}\nPrice: {}\n{}",
            self.source, self.title, self.price, self.link
        )
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, alert: &ListingAlert) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
}

/// Fans each alert out to every configured channel.
#[derive(Default)]
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, n: Box<dyn Notifier>) -> Self {
        self.channels.push(n);
        self
    }

    /// Channels enabled by their environment variables.
    pub fn from_env() -> Self {
        let mut mux = Self::new();
        if let Some(d) = discord::DiscordNotifier::from_env() {
            mux = mux.with(Box::new(d));
        }
        if let Some(s) = slack::SlackNotifier::from_env() {
            mux = mux.with(Box::new(s));
        }
        if let Some(t) = telegram::TelegramNotifier::from_env() {
            mux = mux.with(Box::new(t));
        }
        match email::EmailSender::from_env() {
            Ok(Some(e)) => mux = mux.with(Box::new(e)),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = ?e, "email channel misconfigured, disabled"),
        }
        tracing::info!(channels = ?mux.channel_names(), "notification channels");
        mux
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub async fn notify(&self, alert: &ListingAlert) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for ch in &self.channels {
            match ch.send(alert).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    summary.failed += 1;
                    counter!("notify_errors_total", "channel" => ch.name()).increment(1);
                    tracing::warn!(channel = ch.name(), link = %alert.link, error = ?e, "notification failed");
                }
            }
        }
        summary
    }

    /// One alert per listing, in order.
    pub async fn notify_all(&self, listings: &[Listing]) -> DispatchSummary {
        let mut total = DispatchSummary::default();
        if self.is_empty() {
            for l in listings {
                tracing::info!(source = %l.source, title = %l.title, price = %l.price, link = %l.link, "new listing");
            }
            return total;
        }
        for l in listings {
            let s = self.notify(&ListingAlert::from(l)).await;
            total.sent += s.sent;
            total.failed += s.failed;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }
        async fn send(&self, alert: &ListingAlert) -> Result<()> {
            self.seen.lock().unwrap().push(alert.title.clone());
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn listing(title: &str) -> Listing {
        Listing {
            id: title.into(),
            title: title.into(),
            price: "1".into(),
            link: "https://x.test".into(),
            source: Source::Emlakjet,
            location: None,
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_stop_the_others() {
        let mux = NotifierMux::new()
            .with(Box::new(Recorder {
                seen: Mutex::new(vec![]),
                fail: true,
            }))
            .with(Box::new(Recorder {
                seen: Mutex::new(vec![]),
                fail: false,
            }));
        let s = mux.notify_all(&[listing("a"), listing("b")]).await;
        assert_eq!(s, DispatchSummary { sent: 2, failed: 2 });
    }

    #[test]
    fn alert_text_carries_title_price_link() {
        let t = ListingAlert::from(&listing("flat")).text();
        assert!(t.contains("flat"));
        assert!(t.contains("Price: 1"));
        assert!(t.contains("https://x.test"));
    }
}
