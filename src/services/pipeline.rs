//! End-to-end pipeline: threads, categories, summaries.
//!
//! A [`Pipeline`] is immutable configuration plus an optional classifier.
//! Each [`Pipeline::run`] creates its own [`ClassifierAdapter`], so breaker
//! state never leaks between runs.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use super::category_service::CategoryAssigner;
use super::classifier::{Classifier, ClassifierAdapter};
use super::llm_classifier::LlmClassifier;
use super::summary_service::CategorySummarizer;
use super::thread_service::ThreadReconstructor;
use crate::config::{Settings, SettingsError};
use crate::domain::{Message, Report, RunStats};

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run was cancelled before the given stage.
    #[error("run cancelled before {0} stage")]
    Cancelled(Stage),

    /// Settings failed validation.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline progress markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    Threading,
    Categorization,
    Summarization,
    Completed,
}

impl Stage {
    /// Rough completion percentage at the start of the stage.
    pub fn progress(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Threading => 10,
            Self::Categorization => 40,
            Self::Summarization => 70,
            Self::Completed => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Threading => "threading",
            Self::Categorization => "categorization",
            Self::Summarization => "summarization",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Cancellation flag and stage reporting for one run.
///
/// Clones share state, so a caller can keep one handle and give another to
/// the run.
#[derive(Debug, Clone)]
pub struct RunControl {
    cancelled: Arc<AtomicBool>,
    stage: Arc<watch::Sender<Stage>>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        let (stage, _) = watch::channel(Stage::Queued);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            stage: Arc::new(stage),
        }
    }

    /// Requests cancellation. Takes effect at the next stage boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        *self.stage.borrow()
    }

    /// Receiver that observes stage changes.
    pub fn subscribe(&self) -> watch::Receiver<Stage> {
        self.stage.subscribe()
    }

    fn enter(&self, stage: Stage) -> PipelineResult<()> {
        if self.is_cancelled() {
            tracing::info!(%stage, "Run cancelled");
            return Err(PipelineError::Cancelled(stage));
        }
        self.stage.send_replace(stage);
        Ok(())
    }

    /// Marks the run complete. No stage is left to skip, so a late cancel is
    /// ignored.
    fn finish(&self) {
        self.stage.send_replace(Stage::Completed);
    }
}

/// Configured pipeline.
pub struct Pipeline {
    settings: Settings,
    classifier: Option<Arc<dyn Classifier>>,
}

impl Pipeline {
    /// Creates a pipeline with an explicit classifier (or none).
    pub fn new(settings: Settings, classifier: Option<Arc<dyn Classifier>>) -> PipelineResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            classifier,
        })
    }

    /// Creates a pipeline whose classifier is built from `settings.ai`.
    ///
    /// Without a usable backend the pipeline still runs on fallbacks.
    pub fn from_settings(settings: Settings) -> PipelineResult<Self> {
        let classifier: Option<Arc<dyn Classifier>> = if settings.categorization.classifier_enabled
        {
            LlmClassifier::from_settings(&settings.ai).map(|c| Arc::new(c) as Arc<dyn Classifier>)
        } else {
            None
        };
        if classifier.is_none() {
            tracing::warn!("No classifier backend configured, using fallback labels");
        }
        Self::new(settings, classifier)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn adapter(&self) -> ClassifierAdapter {
        ClassifierAdapter::new(
            self.classifier.clone(),
            self.settings.categorization.classifier_enabled,
        )
        .with_timeout(self.settings.ai.timeout())
    }

    /// Runs the pipeline without external cancellation.
    pub async fn process(&self, messages: &[Message]) -> Report {
        match self.run(messages, &RunControl::new()).await {
            Ok(report) => report,
            // A fresh control is never cancelled.
            Err(_) => Report::default(),
        }
    }

    /// Runs every stage over `messages`.
    ///
    /// Cancellation is checked between stages; empty input yields an empty
    /// report.
    pub async fn run(&self, messages: &[Message], control: &RunControl) -> PipelineResult<Report> {
        tracing::info!(messages = messages.len(), "Pipeline run started");
        let mut adapter = self.adapter();

        control.enter(Stage::Threading)?;
        let threads =
            ThreadReconstructor::from_settings(&self.settings.threading).build_threads(messages);

        control.enter(Stage::Categorization)?;
        let categories = CategoryAssigner::new(self.settings.categorization.clone())
            .assign_categories(&threads, &mut adapter)
            .await;
        let fallback_labels = adapter.fallbacks();

        let summaries = if self.settings.summarization.enabled {
            control.enter(Stage::Summarization)?;
            CategorySummarizer::new(
                self.settings.summarization.clone(),
                self.settings.cleaning.clone(),
            )
            .summarize_categories(&categories, &mut adapter)
            .await
        } else {
            Vec::new()
        };

        let stats = RunStats {
            total_messages: messages.len(),
            total_threads: threads.len(),
            total_categories: categories.len(),
            total_attachments: messages.iter().map(|m| m.attachment_count).sum(),
            fallback_labels,
            classifier_tripped: adapter.is_tripped(),
        };
        let report = Report::new(&categories, summaries, stats);

        control.finish();
        tracing::info!(
            threads = report.stats.total_threads,
            categories = report.stats.total_categories,
            fallback_labels = report.stats.fallback_labels,
            "Pipeline run finished"
        );
        Ok(report)
    }
}
