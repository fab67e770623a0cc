//! Anthropic Claude API provider implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::traits::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider,
    LlmResult, Role, TokenUsage,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: usize = 1024;

/// Anthropic API request format.
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for AnthropicMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: match msg.role {
                Role::User => "user".to_string(),
                Role::Assistant => "assistant".to_string(),
                // System messages are handled separately in Anthropic API
                Role::System => "user".to_string(),
            },
            content: msg.content.clone(),
        }
    }
}

/// Anthropic API response format.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}

/// Anthropic API error response.
#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Provider for Anthropic's Claude API.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: ANTHROPIC_API_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Creates a provider with Claude 3 Haiku (fast labeling).
    pub fn claude_haiku(api_key: impl Into<String>) -> Self {
        Self::new(api_key, "claude-3-haiku-20240307")
    }

    /// Creates a provider with Claude 3.5 Sonnet (summaries).
    pub fn claude_sonnet(api_key: impl Into<String>) -> Self {
        Self::new(api_key, "claude-3-5-sonnet-20241022")
    }

    /// Overrides the HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Overrides the messages endpoint (proxies, gateways).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers
    }

    fn build_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(AnthropicMessage::from)
            .collect();

        // Combine system prompt with any system messages from the conversation
        let system_prompt = {
            let system_messages: Vec<&str> = request
                .messages
                .iter()
                .filter(|m| m.role == Role::System)
                .map(|m| m.content.as_str())
                .collect();

            match (&request.system_prompt, system_messages.is_empty()) {
                (Some(prompt), true) => Some(prompt.clone()),
                (Some(prompt), false) => {
                    Some(format!("{}\n\n{}", prompt, system_messages.join("\n\n")))
                }
                (None, false) => Some(system_messages.join("\n\n")),
                (None, true) => None,
            }
        };

        AnthropicRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: system_prompt,
            temperature: Some(request.temperature),
        }
    }

    fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("max_tokens") => FinishReason::Length,
            _ => FinishReason::Other,
        }
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> LlmError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());

            return LlmError::RateLimited {
                retry_after_secs: retry_after,
            };
        }

        match response.json::<AnthropicError>().await {
            Ok(error) => classify_error(status, error.error),
            Err(_) => LlmError::ApiError {
                status,
                message: format!("HTTP {}", status),
            },
        }
    }
}

fn classify_error(status: u16, detail: AnthropicErrorDetail) -> LlmError {
    if status == 401
        || status == 403
        || detail.error_type == "authentication_error"
        || detail.error_type == "permission_error"
    {
        return LlmError::AuthenticationError(detail.message);
    }
    LlmError::ApiError {
        status,
        message: detail.message,
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(&self.api_url)
            .headers(self.build_headers())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.handle_error_response(response).await);
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let text = api_response
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        let tokens_used = TokenUsage {
            prompt_tokens: api_response.usage.input_tokens,
            completion_tokens: api_response.usage.output_tokens,
            total_tokens: api_response.usage.input_tokens + api_response.usage.output_tokens,
        };

        Ok(CompletionResponse {
            text,
            tokens_used,
            finish_reason: Self::parse_finish_reason(api_response.stop_reason.as_deref()),
        })
    }
}
