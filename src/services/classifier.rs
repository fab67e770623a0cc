//! Classifier capability and per-run adapter.
//!
//! The [`Classifier`] trait is the boundary to the external labeling and
//! summarization backend. [`ClassifierAdapter`] wraps one classifier for the
//! duration of a single run and guarantees that every call produces a usable
//! result: failures fall back to fixed templates, and an authentication
//! failure disables the backend for the rest of the run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::StructuredSummary;
use crate::providers::ai::LlmError;
use crate::text::truncate_chars;

/// Maximum characters of a subject used as a fallback label.
pub const FALLBACK_LABEL_CHARS: usize = 50;

/// Lowercase fragments that identify credential failures in error text.
const AUTH_SIGNATURES: [&str; 6] = [
    "authentication_error",
    "invalid x-api-key",
    "error code: 401",
    "unauthorized",
    "forbidden",
    "invalid_api_key",
];

/// Errors returned by a classifier backend.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier authentication failed: {0}")]
    Authentication(String),

    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),

    #[error("classifier call timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Provider(#[from] LlmError),
}

impl ClassifierError {
    /// Returns true for credential failures, which trip the breaker.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Authentication(_) => true,
            Self::Provider(err) if err.is_auth_failure() => true,
            other => matches_auth_signature(&other.to_string()),
        }
    }
}

/// Returns true if error text matches a known credential failure signature.
pub fn matches_auth_signature(text: &str) -> bool {
    let lower = text.to_lowercase();
    AUTH_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

/// Result type for classifier operations.
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Label assigned to one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Display name of the category.
    pub name: String,
    /// One-sentence description of the context.
    pub description: String,
}

impl Label {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Input for a category summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    /// Category display name.
    pub category: String,
    /// Category description.
    pub context: String,
    /// Cleaned message bodies.
    pub messages: Vec<String>,
    /// Participant identities.
    pub participants: Vec<String>,
    /// Human-readable date range.
    pub date_range: String,
}

/// External labeling and summarization capability.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Suggests a category label for a thread.
    async fn classify(
        &self,
        subject: &str,
        keywords: &[String],
        sample: &str,
    ) -> ClassifierResult<Label>;

    /// Writes a structured narrative summary for a category.
    async fn summarize(&self, request: &SummaryRequest) -> ClassifierResult<StructuredSummary>;
}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Returned by the external classifier.
    Classifier,
    /// Template used because the classifier is disabled or tripped.
    Disabled,
    /// Template used because the call failed.
    Failed,
}

impl Source {
    /// Returns true for template results.
    pub fn is_fallback(self) -> bool {
        self != Self::Classifier
    }
}

/// Breaker state of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Usable,
    Disabled,
    Tripped,
}

/// Per-run wrapper around a [`Classifier`] with fallbacks.
///
/// Owned by exactly one run; the breaker is never shared between runs.
pub struct ClassifierAdapter {
    classifier: Option<Arc<dyn Classifier>>,
    state: BreakerState,
    timeout: Option<Duration>,
    calls: usize,
    fallbacks: usize,
}

impl ClassifierAdapter {
    /// Wraps a classifier. Missing or disabled classifiers always fall back.
    pub fn new(classifier: Option<Arc<dyn Classifier>>, enabled: bool) -> Self {
        let state = if enabled && classifier.is_some() {
            BreakerState::Usable
        } else {
            BreakerState::Disabled
        };
        Self {
            classifier,
            state,
            timeout: None,
            calls: 0,
            fallbacks: 0,
        }
    }

    /// Adapter that never calls out.
    pub fn disabled() -> Self {
        Self::new(None, false)
    }

    /// Bounds every external call; an elapsed timeout counts as a failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns true while the external classifier may still be called.
    pub fn is_usable(&self) -> bool {
        self.state == BreakerState::Usable
    }

    /// Returns true once an auth failure disabled the classifier.
    pub fn is_tripped(&self) -> bool {
        self.state == BreakerState::Tripped
    }

    /// Number of external calls attempted.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Number of template results handed out.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// Labels a thread, falling back to its subject on any failure.
    pub async fn label(
        &mut self,
        subject: &str,
        keywords: &[String],
        sample: &str,
        message_count: usize,
    ) -> (Label, Source) {
        let Some(classifier) = self.active() else {
            self.fallbacks += 1;
            return (fallback_label(subject, message_count), Source::Disabled);
        };

        match self
            .guarded(classifier.classify(subject, keywords, sample))
            .await
        {
            Ok(label) => (label, Source::Classifier),
            Err(err) => {
                self.record_failure("categorize thread", &err);
                (fallback_label(subject, message_count), Source::Failed)
            }
        }
    }

    /// Summarizes a category, falling back to a template on any failure.
    pub async fn summarize(&mut self, request: &SummaryRequest) -> (StructuredSummary, Source) {
        let classifier = match self.active() {
            Some(classifier) if !request.messages.is_empty() => classifier,
            _ => {
                self.fallbacks += 1;
                return (disabled_summary(request), Source::Disabled);
            }
        };

        match self.guarded(classifier.summarize(request)).await {
            Ok(summary) => (summary, Source::Classifier),
            Err(err) => {
                self.record_failure("summarize category", &err);
                (failed_summary(request), Source::Failed)
            }
        }
    }

    fn active(&self) -> Option<Arc<dyn Classifier>> {
        match self.state {
            BreakerState::Usable => self.classifier.clone(),
            BreakerState::Disabled | BreakerState::Tripped => None,
        }
    }

    async fn guarded<T>(
        &mut self,
        call: impl Future<Output = ClassifierResult<T>>,
    ) -> ClassifierResult<T> {
        self.calls += 1;
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ClassifierError::Timeout(limit))?,
            None => call.await,
        }
    }

    fn record_failure(&mut self, operation: &str, err: &ClassifierError) {
        self.fallbacks += 1;
        tracing::error!(operation, "Classifier call failed: {}", err);
        if err.is_auth_failure() {
            tracing::warn!("Classifier credentials rejected, using fallback for the rest of the run");
            self.state = BreakerState::Tripped;
        }
    }
}

/// Label used when the classifier cannot be consulted.
pub fn fallback_label(subject: &str, message_count: usize) -> Label {
    Label {
        name: truncate_chars(subject, FALLBACK_LABEL_CHARS).to_string(),
        description: format!("Thread with {} messages", message_count),
    }
}

fn listed_parties(request: &SummaryRequest) -> String {
    request
        .participants
        .iter()
        .take(5)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Summary used when the classifier is disabled or there is nothing to send.
pub fn disabled_summary(request: &SummaryRequest) -> StructuredSummary {
    StructuredSummary {
        context: request.context.clone(),
        actions: vec!["Correspondence on this topic".to_string()],
        result: "In progress".to_string(),
        parties: listed_parties(request),
        remarks: String::new(),
        recommendations: String::new(),
    }
}

/// Summary used when a summarization call failed.
pub fn failed_summary(request: &SummaryRequest) -> StructuredSummary {
    StructuredSummary {
        context: request.context.clone(),
        actions: vec!["Correspondence processed in basic mode without AI summarization".to_string()],
        result: "In progress".to_string(),
        parties: listed_parties(request),
        remarks: String::new(),
        recommendations: "Check the classifier credentials and re-run for a detailed summary"
            .to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted classifier fakes shared by service tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and records every call.
    #[derive(Default)]
    pub struct ScriptedClassifier {
        labels: Mutex<VecDeque<ClassifierResult<Label>>>,
        summaries: Mutex<VecDeque<ClassifierResult<StructuredSummary>>>,
        pub label_calls: Mutex<Vec<String>>,
        pub summary_calls: Mutex<Vec<SummaryRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedClassifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_labels(self, labels: Vec<ClassifierResult<Label>>) -> Self {
            *self.labels.lock().unwrap() = labels.into();
            self
        }

        pub fn with_summaries(self, summaries: Vec<ClassifierResult<StructuredSummary>>) -> Self {
            *self.summaries.lock().unwrap() = summaries.into();
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn label_call_count(&self) -> usize {
            self.label_calls.lock().unwrap().len()
        }

        pub fn summary_call_count(&self) -> usize {
            self.summary_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(
            &self,
            subject: &str,
            _keywords: &[String],
            _sample: &str,
        ) -> ClassifierResult<Label> {
            self.label_calls.lock().unwrap().push(subject.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.labels.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Label::new(subject, "scripted")))
        }

        async fn summarize(
            &self,
            request: &SummaryRequest,
        ) -> ClassifierResult<StructuredSummary> {
            self.summary_calls.lock().unwrap().push(request.clone());
            let next = self.summaries.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                Ok(StructuredSummary {
                    context: format!("Summary of {}", request.category),
                    ..Default::default()
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedClassifier;
    use super::*;

    fn request(messages: Vec<&str>) -> SummaryRequest {
        SummaryRequest {
            category: "Budget".to_string(),
            context: "Quarterly numbers".to_string(),
            messages: messages.into_iter().map(String::from).collect(),
            participants: (1..=7).map(|i| format!("p{}@x.com", i)).collect(),
            date_range: "N/A".to_string(),
        }
    }

    #[test]
    fn auth_failures_are_detected() {
        assert!(ClassifierError::Authentication("nope".into()).is_auth_failure());
        assert!(ClassifierError::Provider(LlmError::AuthenticationError("x".into())).is_auth_failure());
        assert!(ClassifierError::Unavailable("Error code: 401 - Unauthorized".into()).is_auth_failure());
        assert!(ClassifierError::Provider(LlmError::ApiError {
            status: 400,
            message: "invalid x-api-key".into()
        })
        .is_auth_failure());
        assert!(!ClassifierError::Unavailable("connection reset".into()).is_auth_failure());
        assert!(!ClassifierError::Timeout(Duration::from_secs(1)).is_auth_failure());
    }

    #[test]
    fn fallback_label_truncates_subject() {
        let subject = "x".repeat(80);
        let label = fallback_label(&subject, 3);
        assert_eq!(label.name.chars().count(), FALLBACK_LABEL_CHARS);
        assert_eq!(label.description, "Thread with 3 messages");
    }

    #[test]
    fn disabled_adapter_never_calls_out() {
        let classifier = Arc::new(ScriptedClassifier::new());
        let mut adapter = ClassifierAdapter::new(Some(classifier.clone()), false);

        let (label, source) = tokio_test::block_on(adapter.label("Budget", &[], "", 2));
        assert_eq!(label.name, "Budget");
        assert_eq!(source, Source::Disabled);
        assert_eq!(classifier.label_call_count(), 0);
        assert!(!adapter.is_usable());
    }

    #[tokio::test]
    async fn transient_failure_falls_back_without_tripping() {
        let classifier = Arc::new(ScriptedClassifier::new().with_labels(vec![
            Err(ClassifierError::Unavailable("connection reset".into())),
            Ok(Label::new("Finance", "Money talk")),
        ]));
        let mut adapter = ClassifierAdapter::new(Some(classifier.clone()), true);

        let (first, source) = adapter.label("Budget", &[], "", 1).await;
        assert_eq!(first, fallback_label("Budget", 1));
        assert_eq!(source, Source::Failed);
        assert!(adapter.is_usable());

        let (second, source) = adapter.label("Budget", &[], "", 1).await;
        assert_eq!(second.name, "Finance");
        assert_eq!(source, Source::Classifier);
        assert_eq!(classifier.label_call_count(), 2);
        assert_eq!(adapter.fallbacks(), 1);
    }

    #[tokio::test]
    async fn auth_failure_trips_breaker_for_good() {
        let classifier = Arc::new(ScriptedClassifier::new().with_labels(vec![Err(
            ClassifierError::Provider(LlmError::AuthenticationError("invalid x-api-key".into())),
        )]));
        let mut adapter = ClassifierAdapter::new(Some(classifier.clone()), true);

        adapter.label("One", &[], "", 1).await;
        assert!(adapter.is_tripped());

        for subject in ["Two", "Three", "Four"] {
            let (label, source) = adapter.label(subject, &[], "", 1).await;
            assert_eq!(label.name, subject);
            assert_eq!(source, Source::Disabled);
        }
        let (_, source) = adapter.summarize(&request(vec!["body"])).await;
        assert_eq!(source, Source::Disabled);

        assert_eq!(classifier.label_call_count(), 1);
        assert_eq!(classifier.summary_call_count(), 0);
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let classifier =
            Arc::new(ScriptedClassifier::new().with_delay(Duration::from_millis(200)));
        let mut adapter = ClassifierAdapter::new(Some(classifier), true)
            .with_timeout(Duration::from_millis(10));

        let (label, source) = adapter.label("Slow", &[], "", 4).await;
        assert_eq!(label, fallback_label("Slow", 4));
        assert_eq!(source, Source::Failed);
        assert!(adapter.is_usable());
    }

    #[tokio::test]
    async fn summary_without_messages_uses_template() {
        let classifier = Arc::new(ScriptedClassifier::new());
        let mut adapter = ClassifierAdapter::new(Some(classifier.clone()), true);

        let (summary, source) = adapter.summarize(&request(vec![])).await;
        assert_eq!(source, Source::Disabled);
        assert_eq!(summary.context, "Quarterly numbers");
        assert_eq!(summary.result, "In progress");
        assert_eq!(summary.parties.split(", ").count(), 5);
        assert_eq!(classifier.summary_call_count(), 0);
    }

    #[tokio::test]
    async fn failed_summary_uses_failure_template() {
        let classifier = Arc::new(ScriptedClassifier::new().with_summaries(vec![Err(
            ClassifierError::InvalidResponse("not json".into()),
        )]));
        let mut adapter = ClassifierAdapter::new(Some(classifier), true);

        let (summary, source) = adapter.summarize(&request(vec!["body"])).await;
        assert_eq!(source, Source::Failed);
        assert!(summary.recommendations.contains("credentials"));
        assert!(source.is_fallback());
    }
}
