//! Pipeline settings and configuration types.
//!
//! Settings are persisted as JSON, by default under the platform config
//! directory (`~/.config/threadline/settings.json` or equivalent). Every
//! section has defaults, so partial files load fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("no config directory available on this platform")]
    NoConfigDir,
}

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Top-level pipeline settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Thread reconstruction parameters.
    pub threading: ThreadingSettings,
    /// Category assignment parameters.
    pub categorization: CategorizationSettings,
    /// Category summarization parameters.
    pub summarization: SummarizationSettings,
    /// Body cleanup toggles.
    pub cleaning: CleaningSettings,
    /// Classifier backend configuration.
    pub ai: AiSettings,
    /// Concurrent job limits.
    pub jobs: JobSettings,
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> SettingsResult<PathBuf> {
        ProjectDirs::from("", "", "threadline")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Loads and validates settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_json::from_str(&raw)?;
        settings.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "Loaded settings");
        Ok(settings)
    }

    /// Loads settings from `path`, falling back to defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> SettingsResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Writes settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Checks value ranges.
    pub fn validate(&self) -> SettingsResult<()> {
        let threshold = self.threading.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SettingsError::Invalid(format!(
                "threading.similarity_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.threading.max_gap_days < 0 {
            return Err(SettingsError::Invalid(
                "threading.max_gap_days must not be negative".to_string(),
            ));
        }
        if self.categorization.top_n_keywords == 0 {
            return Err(SettingsError::Invalid(
                "categorization.top_n_keywords must be positive".to_string(),
            ));
        }
        if self.categorization.sample_length == 0 {
            return Err(SettingsError::Invalid(
                "categorization.sample_length must be positive".to_string(),
            ));
        }
        if self.jobs.max_concurrent == 0 {
            return Err(SettingsError::Invalid(
                "jobs.max_concurrent must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Thread reconstruction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadingSettings {
    /// Minimum participant overlap ratio to join an existing cluster.
    pub similarity_threshold: f64,
    /// Maximum gap in days between consecutive dated messages of one thread.
    pub max_gap_days: i64,
}

impl Default for ThreadingSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            max_gap_days: 7,
        }
    }
}

/// Category assignment parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizationSettings {
    /// Advisory cap; exceeding it is logged, never enforced.
    pub max_categories: usize,
    /// Keywords sent to the classifier per thread.
    pub top_n_keywords: usize,
    /// Maximum characters of the sample body sent to the classifier.
    pub sample_length: usize,
    /// Whether the external classifier is consulted at all.
    pub classifier_enabled: bool,
}

impl Default for CategorizationSettings {
    fn default() -> Self {
        Self {
            max_categories: 15,
            top_n_keywords: 10,
            sample_length: 500,
            classifier_enabled: true,
        }
    }
}

/// Category summarization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationSettings {
    /// Whether the summarization stage runs.
    pub enabled: bool,
    /// Message bodies forwarded to the summarizer per category.
    pub max_messages: usize,
    /// Participants forwarded to the summarizer per category.
    pub max_participants: usize,
}

impl Default for SummarizationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages: 5,
            max_participants: 5,
        }
    }
}

/// Toggles for [`ContentCleaner`](crate::text::ContentCleaner) stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningSettings {
    pub remove_signatures: bool,
    pub remove_disclaimers: bool,
    pub remove_quoted_text: bool,
}

impl Default for CleaningSettings {
    fn default() -> Self {
        Self {
            remove_signatures: true,
            remove_disclaimers: true,
            remove_quoted_text: true,
        }
    }
}

/// Supported classifier backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI or any compatible endpoint.
    OpenAi,
    /// Local Ollama server.
    Ollama,
}

/// Classifier backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Backend to use.
    pub provider: ProviderKind,
    /// Model used for per-thread labeling.
    pub model_labeling: String,
    /// Model used for per-category summaries.
    pub model_summary: String,
    /// Custom API endpoint (for self-hosted or compatible APIs).
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per summary response.
    pub max_tokens: usize,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Anthropic,
            model_labeling: "claude-3-haiku-20240307".to_string(),
            model_summary: "claude-3-5-sonnet-20241022".to_string(),
            base_url: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            timeout_secs: 60,
        }
    }
}

impl AiSettings {
    /// Reads the API key from the configured environment variable.
    ///
    /// Returns `None` when unset, empty, or the `not_set` placeholder.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && key != "not_set")
    }

    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Concurrent job limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Jobs allowed to run at the same time.
    pub max_concurrent: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self { max_concurrent: 5 }
    }
}
