//! AI/LLM provider implementations.
//!
//! This module provides a unified interface for the text-generation backends
//! that label and summarize email threads.
//!
//! # Supported Providers
//!
//! - **Anthropic**: Claude models via Anthropic's API
//! - **OpenAI-compatible**: OpenAI, vLLM, LM Studio and local Ollama servers
//!
//! # Example
//!
//! ```rust,no_run
//! use threadline::providers::ai::{AnthropicProvider, CompletionRequest, LlmProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = AnthropicProvider::claude_haiku("sk-ant-...");
//! let request = CompletionRequest::prompt("Suggest a label for: Q3 budget review");
//!
//! let response = provider.complete(&request).await?;
//! println!("Response: {}", response.text);
//! # Ok(())
//! # }
//! ```

mod anthropic;
mod openai;
mod traits;

use std::sync::Arc;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiCompatibleProvider;
pub use traits::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider,
    LlmResult, Role, TokenUsage,
};

use crate::config::{AiSettings, ProviderKind};

/// Builds a provider for `model` from settings.
///
/// Returns `None` when the backend needs an API key and none is configured.
pub fn build_provider(settings: &AiSettings, model: &str) -> Option<Arc<dyn LlmProvider>> {
    let client = match reqwest::Client::builder().timeout(settings.timeout()).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Failed to build HTTP client, using defaults: {}", e);
            reqwest::Client::new()
        }
    };

    let provider: Arc<dyn LlmProvider> = match settings.provider {
        ProviderKind::Anthropic => {
            let mut provider = AnthropicProvider::new(settings.api_key()?, model).with_client(client);
            if let Some(ref url) = settings.base_url {
                provider = provider.with_api_url(url.clone());
            }
            Arc::new(provider)
        }
        ProviderKind::OpenAi => {
            let api_key = settings.api_key()?;
            let provider = match settings.base_url {
                Some(ref url) => OpenAiCompatibleProvider::custom(url.clone(), Some(api_key), model),
                None => OpenAiCompatibleProvider::openai(api_key, model),
            };
            Arc::new(provider.with_client(client))
        }
        ProviderKind::Ollama => Arc::new(
            OpenAiCompatibleProvider::ollama(settings.base_url.clone(), model).with_client(client),
        ),
    };

    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        "Classifier backend configured"
    );
    Some(provider)
}
