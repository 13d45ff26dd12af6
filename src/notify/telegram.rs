use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::{ListingAlert, Notifier};

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    client: Client,
}

impl TelegramNotifier {
    /// Enabled when both TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID are set.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        if token.trim().is_empty() || chat_id.trim().is_empty() {
            return None;
        }
        Some(Self::new(token, chat_id))
    }

    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            token,
            chat_id,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, alert: &ListingAlert) -> Result<()> {
        let url = format!("{API_BASE}/bot{}/sendMessage", self.token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": alert.text(),
            "disable_web_page_preview": false,
        });

        self.client
            .post(url)
            .timeout(Duration::from_secs(10))
            .json(&body)
            .send()
            .await
            .context("telegram sendMessage")?
            .error_for_status()
            .context("telegram non-2xx")?;
        Ok(())
    }
}
