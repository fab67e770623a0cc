//! Configuration and settings management.
//!
//! This module provides pipeline settings types and persistence.
//! Settings are stored in the user's config directory as JSON.

mod settings;

pub use settings::{
    AiSettings, CategorizationSettings, CleaningSettings, JobSettings, ProviderKind, Settings,
    SettingsError, SettingsResult, SummarizationSettings, ThreadingSettings,
};
