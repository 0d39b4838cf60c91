//! Client for OpenAI-compatible Chat Completions endpoints

use super::{CompletionClient, CompletionRequest};
use crate::config::CompletionSettings;
use crate::error::{LabError, LabResult};
use crate::models::Message;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    settings: CompletionSettings,
}

impl OpenAiClient {
    pub fn new(settings: CompletionSettings) -> LabResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| LabError::upstream(None, format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }
}

fn map_http_error(status: StatusCode, body: &str) -> LabError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    let message = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("The API key was rejected ({})", detail)
        }
        StatusCode::TOO_MANY_REQUESTS => format!("Rate limit exceeded ({})", detail),
        s if s.is_server_error() => format!("The completion service is unavailable ({})", detail),
        _ => detail,
    };

    LabError::upstream(Some(status.as_u16()), message)
}

fn extract_text(response: ChatCompletionResponse) -> LabResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| LabError::upstream(None, "The completion service returned no text"))
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> LabResult<String> {
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            LabError::upstream(
                None,
                "No API key configured. Add one in settings or set OPENAI_API_KEY",
            )
        })?;

        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: request.wire_messages(),
            max_tokens: self.settings.max_tokens,
        };

        log::debug!(
            "Requesting completion from {} ({} messages)",
            self.settings.model,
            body.messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "timed out"
                } else if e.is_connect() {
                    "could not connect"
                } else {
                    "failed"
                };
                LabError::upstream(None, format!("Completion request {}: {}", reason, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            log::warn!("Completion request failed with HTTP {}", status);
            return Err(map_http_error(status, &body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            LabError::upstream(None, format!("Failed to parse completion response: {}", e))
        })?;

        extract_text(parsed)
    }
}
