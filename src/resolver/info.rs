use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BackendError;

use super::InfoBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoCategory {
    Weather,
    News,
    Employment,
    Market,
    Projects,
}

impl InfoCategory {
    #[cfg(test)]
    pub const ALL: [InfoCategory; 5] = [
        InfoCategory::Weather,
        InfoCategory::News,
        InfoCategory::Employment,
        InfoCategory::Market,
        InfoCategory::Projects,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InfoCategory::Weather => "weather",
            InfoCategory::News => "news",
            InfoCategory::Employment => "employment",
            InfoCategory::Market => "market",
            InfoCategory::Projects => "projects",
        }
    }

    /// Path segment under `/api/` on the info service.
    pub fn path(&self) -> &'static str {
        match self {
            InfoCategory::Projects => "brenin_projects",
            other => other.name(),
        }
    }

    /// Reply used when the info service cannot be reached.
    pub fn canned(&self) -> &'static str {
        match self {
            InfoCategory::Weather => "It's currently 72°F and sunny in your area.",
            InfoCategory::News => "I can't reach the news feed right now. Please check back in a little while for the latest headlines.",
            InfoCategory::Employment => "Employment figures are unavailable at the moment, but the job market has been holding steady. Ask me again shortly for the latest numbers.",
            InfoCategory::Market => "Live market data is unavailable right now. Please try again in a moment for the latest index figures.",
            InfoCategory::Projects => "Brenin Technologies is working on digital human AI, real-time conversation processing, and enterprise AI solutions.",
        }
    }
}

impl fmt::Display for InfoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Deserialize)]
struct InfoPayload {
    message: Option<String>,
}

/// HTTP client for the info service (`GET {base}/api/{category}`).
pub struct InfoClient {
    base_url: String,
    client: reqwest::Client,
}

impl InfoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, category: InfoCategory) -> String {
        format!("{}/api/{}", self.base_url, category.path())
    }
}

#[async_trait]
impl InfoBackend for InfoClient {
    async fn fetch(&self, category: InfoCategory) -> Result<String, BackendError> {
        let url = self.url(category);
        debug!("Fetching info category {} from {}", category, url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: InfoPayload = response.json().await?;
        payload
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or(BackendError::EmptyReply)
    }
}
