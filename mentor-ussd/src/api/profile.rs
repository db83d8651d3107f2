//! Profile persistence API client
//!
//! Registrations completed over USSD are forwarded to the platform API
//! (`POST /mentee/setup/`) with the service's bearer credential.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::resilience::HttpConfig;
use crate::ussd::menu::RegistrationDraft;

/// Device recorded for USSD registrations
pub const USSD_DEVICE: &str = "phone";
/// Communication preference recorded for USSD registrations
pub const USSD_PREFERENCE: &str = "ussd";

/// Request body of the mentee setup endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenteeSetup {
    pub name: String,
    pub age: u32,
    pub county: String,
    pub device: String,
    pub interests: Vec<String>,
    pub communication_preference: String,
}

impl MenteeSetup {
    pub fn from_draft(draft: &RegistrationDraft) -> Self {
        Self {
            name: draft.name.clone(),
            age: draft.age,
            county: draft.county.clone(),
            device: USSD_DEVICE.to_string(),
            interests: draft.interests.clone(),
            communication_preference: USSD_PREFERENCE.to_string(),
        }
    }
}

/// Durable destination for completed registrations
#[async_trait]
pub trait ProfileSink: Send + Sync {
    async fn setup_mentee(&self, profile: &MenteeSetup) -> Result<()>;
}

/// HTTP client for the platform's profile API
#[derive(Debug, Clone)]
pub struct ProfileApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ProfileApiClient {
    pub fn new(base_url: &str, token: Option<String>, config: &HttpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .context("Failed to build profile API HTTP client")?;

        if token.is_none() {
            log::warn!(
                "No profile API token configured; registrations will likely land in the fallback sink"
            );
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ProfileSink for ProfileApiClient {
    async fn setup_mentee(&self, profile: &MenteeSetup) -> Result<()> {
        let url = self.endpoint("mentee/setup/");
        let mut request = self.http.post(&url).json(profile);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach profile API at {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Profile API returned {}: {}", status, body);
        }

        log::debug!("Profile API accepted mentee {}", profile.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_from_draft() {
        let draft = RegistrationDraft {
            name: "Ann".to_string(),
            age: 30,
            county: "Unknown".to_string(),
            interests: vec!["Coding".to_string(), "Unknown".to_string()],
        };
        let setup = MenteeSetup::from_draft(&draft);
        assert_eq!(setup.device, "phone");
        assert_eq!(setup.communication_preference, "ussd");
        assert_eq!(setup.interests, draft.interests);

        let json = serde_json::to_value(&setup).unwrap();
        assert_eq!(json["age"], 30);
        assert_eq!(json["county"], "Unknown");
    }

    #[test]
    fn test_endpoint_joining() {
        let config = HttpConfig::default();
        let client = ProfileApiClient::new("http://localhost:8000/api/", None, &config).unwrap();
        assert_eq!(client.endpoint("mentee/setup/"), "http://localhost:8000/api/mentee/setup/");
        assert_eq!(client.endpoint("/match-mentor/"), "http://localhost:8000/api/match-mentor/");
    }
}
