//! External service provider implementations.
//!
//! - [`ai`] - AI/LLM providers (Anthropic, OpenAI-compatible, Ollama)

pub mod ai;
