use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BackendError;

use super::CompletionBackend;

/// Body accepted by the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Body returned by the completion endpoint. Exactly one field is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionResponse {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            response: None,
            error: Some(text.into()),
        }
    }
}

/// HTTP client for the completion endpoint (`POST {message, context}`).
pub struct CompletionClient {
    url: String,
    client: reqwest::Client,
}

impl CompletionClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(&self, utterance: &str, context: &str) -> Result<String, BackendError> {
        let request = CompletionRequest {
            message: utterance.to_string(),
            context: Some(context.to_string()),
        };
        debug!("-> Completion request to {}", self.url);

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: CompletionResponse = response.json().await?;
        if let Some(err) = payload.error {
            return Err(BackendError::Malformed(format!("error field in success body: {}", err)));
        }
        payload
            .response
            .filter(|text| !text.trim().is_empty())
            .ok_or(BackendError::EmptyReply)
    }
}
