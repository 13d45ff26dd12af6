use super::{ListingAlert, Notifier};
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, alert: &ListingAlert) -> Result<()> {
        let description = format!(
            "**Price:** {}\n**Source:** {}\n{}",
            alert.price, alert.source, alert.link
        );
        let payload = DiscordWebhookPayload::embed(&alert.title, &description, &alert.link);

        let rsp = self
            .client
            .post(&self.webhook)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("Discord webhook request failed: {e}"))?;
        rsp.error_for_status_ref()
            .map_err(|e| anyhow!("Discord webhook HTTP error: {e}"))?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    url: String,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn embed(title: &str, description: &str, url: &str) -> Self {
        // Discord rejects embed titles over 256 chars.
        let title: String = title.chars().take(256).collect();
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title,
                description: description.to_string(),
                url: url.to_string(),
            }],
        }
    }
}
