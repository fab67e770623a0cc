//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, Ollama, vLLM, LM Studio, and other compatible endpoints.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::traits::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider,
    LlmResult, Role, TokenUsage,
};

/// Default base URL for OpenAI API.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Ollama API URL.
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434/v1";

/// OpenAI API request format.
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: match msg.role {
                Role::System => "system".to_string(),
                Role::User => "user".to_string(),
                Role::Assistant => "assistant".to_string(),
            },
            content: msg.content.clone(),
        }
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    code: Option<String>,
}

/// Provider for OpenAI-compatible APIs.
///
/// Works with:
/// - OpenAI API (api.openai.com)
/// - Ollama (localhost:11434)
/// - vLLM, LM Studio and other compatible endpoints
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    name: &'static str,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Creates a new provider for OpenAI's API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: "openai",
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: Some(api_key.into()),
            model: model.into(),
        }
    }

    /// Creates a new provider for a custom endpoint.
    pub fn custom(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: "openai-compatible",
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    /// Creates a provider for a local Ollama server.
    pub fn ollama(base_url: Option<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string());
        Self {
            name: "ollama",
            ..Self::custom(base_url, None, model)
        }
    }

    /// Overrides the HTTP client (useful for custom timeouts or proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref api_key) = self.api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", api_key)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    fn build_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        let mut messages: Vec<OpenAiMessage> = Vec::new();

        if let Some(ref system) = request.system_prompt {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.extend(request.messages.iter().map(OpenAiMessage::from));

        OpenAiRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(request.temperature),
            max_tokens: request.max_tokens,
        }
    }

    fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
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

        if let Ok(error) = response.json::<OpenAiError>().await {
            if status == 401
                || status == 403
                || error.error.code.as_deref() == Some("invalid_api_key")
            {
                return LlmError::AuthenticationError(error.error.message);
            }
            return LlmError::ApiError {
                status,
                message: error.error.message,
            };
        }

        LlmError::ApiError {
            status,
            message: format!("HTTP {}", status),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request(request);

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.handle_error_response(response).await);
        }

        let api_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        let text = choice.message.content.unwrap_or_default();

        let tokens_used = api_response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            tokens_used,
            finish_reason: Self::parse_finish_reason(choice.finish_reason.as_deref()),
        })
    }
}
