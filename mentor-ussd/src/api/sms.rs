//! SMS notification sink (Africa's Talking messaging API)

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::resilience::HttpConfig;

const SANDBOX_ENDPOINT: &str = "https://api.sandbox.africastalking.com/version1/messaging";
const LIVE_ENDPOINT: &str = "https://api.africastalking.com/version1/messaging";

/// Best-effort message delivery; callers never learn whether a message arrived
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, to: &str, message: &str) -> Result<()>;
}

/// Gateways deliver numbers with or without the leading `+`; SMS needs it
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+{}", trimmed)
    }
}

#[derive(Debug, Clone)]
pub struct SmsClient {
    http: reqwest::Client,
    endpoint: &'static str,
    username: String,
    api_key: String,
    sender_id: Option<String>,
}

impl SmsClient {
    pub fn new(
        username: &str,
        api_key: &str,
        sender_id: Option<String>,
        config: &HttpConfig,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .context("Failed to build SMS HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint_for(username),
            username: username.to_string(),
            api_key: api_key.to_string(),
            sender_id,
        })
    }
}

fn endpoint_for(username: &str) -> &'static str {
    if username == "sandbox" {
        SANDBOX_ENDPOINT
    } else {
        LIVE_ENDPOINT
    }
}

#[async_trait]
impl NotificationSink for SmsClient {
    async fn send(&self, to: &str, message: &str) -> Result<()> {
        let mut form = vec![
            ("username", self.username.as_str()),
            ("to", to),
            ("message", message),
        ];
        if let Some(sender) = &self.sender_id {
            form.push(("from", sender.as_str()));
        }

        let response = self
            .http
            .post(self.endpoint)
            .header("apiKey", &self.api_key)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .context("Failed to reach SMS gateway")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("SMS gateway returned {}: {}", status, body);
        }

        log::debug!("SMS queued for {}", to);
        Ok(())
    }
}

/// Sink used when no SMS credentials are configured
#[derive(Debug, Clone, Default)]
pub struct LogOnlySink;

#[async_trait]
impl NotificationSink for LogOnlySink {
    async fn send(&self, to: &str, message: &str) -> Result<()> {
        log::info!("SMS to {} (not sent, no gateway configured): {}", to, message);
        Ok(())
    }
}
