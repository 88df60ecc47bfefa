use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::BackendError;

pub const NO_CONTENT_REPLY: &str = "I apologize, but I could not generate a response.";

// Chat-completions wire types (OpenAI-compatible)

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .filter(|c| !c.is_empty())
    }
}

pub struct DeepSeekClient {
    api_key: String,
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl DeepSeekClient {
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            api_url,
            model,
            client,
        })
    }

    /// Runs one non-streaming completion. A success without content yields
    /// the stock apology rather than an error.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            max_tokens: 1000,
            temperature: 0.7,
            stream: false,
        };
        debug!("-> DeepSeek request with model {}", self.model);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("DeepSeek API error: {} {}", status, body);
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ChatResponse = response.json().await?;
        Ok(payload
            .first_content()
            .unwrap_or(NO_CONTENT_REPLY)
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> DeepSeekClient {
        DeepSeekClient::new(
            "sk-test".into(),
            format!("{}/v1/chat/completions", server.uri()),
            "deepseek-chat".into(),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_request_shape_and_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "deepseek-chat",
                "messages": [
                    {"role": "system", "content": "persona"},
                    {"role": "user", "content": "hello"}
                ],
                "max_tokens": 1000,
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi there"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server).complete("persona", "hello").await.unwrap();
        assert_eq!(text, "Hi there");
    }

    #[tokio::test]
    async fn test_missing_content_yields_stock_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let text = client(&server).complete("persona", "hello").await.unwrap();
        assert_eq!(text, NO_CONTENT_REPLY);
    }

    #[tokio::test]
    async fn test_upstream_status_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client(&server).complete("persona", "hello").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }
}
