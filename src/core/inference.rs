//! The hosted inference endpoint, seen as prompt in and text out.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::{ChatRequest, ChatResponse};
use crate::core::credentials::ApiKey;
use crate::core::prompt::PromptPayload;
use crate::utils::url::construct_api_url;

/// Failures of an inference call, grouped by what the user can do about them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// The endpoint rejected the API key.
    Auth(String),

    /// The endpoint is throttling requests.
    RateLimit(String),

    /// The endpoint could not be reached or timed out.
    Network(String),

    /// Anything else, including malformed responses.
    Unknown(String),
}

impl InferenceError {
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Auth(_) => "auth",
            InferenceError::RateLimit(_) => "rate-limit",
            InferenceError::Network(_) => "network",
            InferenceError::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::Auth(detail) => {
                write!(f, "Authentication failed, check your API key: {detail}")
            }
            InferenceError::RateLimit(detail) => {
                write!(f, "Rate limited by the API, wait a moment and retry: {detail}")
            }
            InferenceError::Network(detail) => {
                write!(f, "Could not reach the API: {detail}")
            }
            InferenceError::Unknown(detail) => write!(f, "API error: {detail}"),
        }
    }
}

impl StdError for InferenceError {}

/// Contract for anything that turns a prompt into assistant text.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, payload: &PromptPayload) -> Result<String, InferenceError>;
}

/// Endpoint settings taken from the config file.
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

/// OpenAI-compatible chat-completions client.
pub struct HttpInferenceClient {
    client: reqwest::Client,
    settings: EndpointSettings,
    api_key: ApiKey,
}

impl HttpInferenceClient {
    pub fn new(settings: EndpointSettings, api_key: ApiKey) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InferenceError::Unknown(err.to_string()))?;
        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn complete(&self, payload: &PromptPayload) -> Result<String, InferenceError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: &payload.messages,
            temperature: self.settings.temperature,
            stream: false,
        };
        let url = construct_api_url(&self.settings.base_url, "chat/completions");
        debug!(
            url = %url,
            model = %self.settings.model,
            messages = payload.messages.len(),
            "sending inference request"
        );

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|err| classify_transport(&err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| classify_transport(&err))?;

        if !status.is_success() {
            let err = classify_status(status, &body);
            warn!(status = status.as_u16(), kind = err.kind(), "inference request failed");
            return Err(err);
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|err| InferenceError::Unknown(format!("unreadable response: {err}")))?;
        match parsed.first_content() {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            _ => Err(InferenceError::Unknown(
                "the API returned an empty response".to_string(),
            )),
        }
    }
}

fn classify_transport(err: &reqwest::Error) -> InferenceError {
    if err.is_decode() || err.is_builder() {
        InferenceError::Unknown(err.to_string())
    } else {
        InferenceError::Network(err.to_string())
    }
}

pub(crate) fn classify_status(status: StatusCode, body: &str) -> InferenceError {
    let summary = summarize_api_error(body)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InferenceError::Auth(summary),
        StatusCode::TOO_MANY_REQUESTS => InferenceError::RateLimit(summary),
        StatusCode::REQUEST_TIMEOUT
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => InferenceError::Network(summary),
        _ => InferenceError::Unknown(summary),
    }
}

/// Pull a one-line message out of an error body, JSON or plain text.
fn summarize_api_error(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let summary = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .or_else(|| {
                value.get("error").and_then(|v| match v {
                    serde_json::Value::String(s) => Some(s.to_string()),
                    _ => None,
                })
            })
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str().map(str::to_owned))
            })?,
        Err(_) if trimmed.starts_with('<') => return None,
        Err(_) => trimmed.to_string(),
    };

    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_error_kinds() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, body),
            InferenceError::Auth("Invalid API Key".to_string())
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, r#"{"error":"slow down"}"#),
            InferenceError::RateLimit("slow down".to_string())
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, "<html>down</html>"),
            InferenceError::Network("HTTP 503".to_string())
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, "model   not\nfound"),
            InferenceError::Unknown("model not found".to_string())
        );
    }

    #[test]
    fn empty_error_body_falls_back_to_status() {
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, ""),
            InferenceError::Auth("HTTP 403".to_string())
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"status":"failed"}"#),
            InferenceError::Unknown("HTTP 500".to_string())
        );
    }

    #[test]
    fn display_is_user_facing() {
        let err = InferenceError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "Could not reach the API: connection refused");
        assert_eq!(err.kind(), "network");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let client = HttpInferenceClient::new(
            EndpointSettings {
                base_url: "http://127.0.0.1:9".to_string(),
                model: "test-model".to_string(),
                temperature: 0.5,
                timeout: Duration::from_secs(2),
            },
            ApiKey::new("test-key").unwrap(),
        )
        .unwrap();
        let payload = PromptPayload {
            messages: vec![crate::api::ChatMessage::user("hi")],
            sources: Vec::new(),
        };

        let err = client.complete(&payload).await.unwrap_err();
        assert!(matches!(err, InferenceError::Network(_)), "got {err:?}");
    }
}
