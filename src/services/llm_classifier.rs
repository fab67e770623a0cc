//! [`Classifier`] backed by an [`LlmProvider`].
//!
//! Labeling and summarization may run on different models: a small fast
//! model labels every thread, a larger one writes the per-category summaries.

use std::sync::Arc;

use async_trait::async_trait;

use super::classifier::{Classifier, ClassifierError, ClassifierResult, Label, SummaryRequest};
use crate::config::AiSettings;
use crate::domain::StructuredSummary;
use crate::providers::ai::{build_provider, CompletionRequest, LlmProvider};
use crate::text::truncate_chars;

/// Label used when the response carries no category line.
const DEFAULT_LABEL: &str = "Uncategorized";

/// Token budget for a labeling response.
const LABEL_MAX_TOKENS: usize = 200;

/// Characters of free text kept when a summary response has no JSON object.
const UNSTRUCTURED_CHARS: usize = 500;

const CATEGORY_PREFIXES: [&str; 2] = ["category:", "категория:"];
const DESCRIPTION_PREFIXES: [&str; 2] = ["description:", "описание:"];

const LABEL_SYSTEM_PROMPT: &str = "You group business email threads into topical categories. \
Answer with exactly two lines:\n\
Category: <short category name, at most five words>\n\
Description: <one sentence describing the context>";

const SUMMARY_SYSTEM_PROMPT: &str = "You write concise structured summaries of business \
correspondence. Reply with a single JSON object with the keys \"context\", \"actions\" \
(array of strings), \"result\", \"parties\", \"remarks\" and \"recommendations\".";

/// Classifier that prompts language models for labels and summaries.
pub struct LlmClassifier {
    labeler: Arc<dyn LlmProvider>,
    summarizer: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmClassifier {
    /// Uses one provider for both labeling and summaries.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            labeler: Arc::clone(&provider),
            summarizer: provider,
            temperature: 0.3,
            max_tokens: 2048,
        }
    }

    /// Uses a separate provider for category summaries.
    pub fn with_summary_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.summarizer = provider;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Builds both providers from settings.
    ///
    /// Returns `None` when no backend can be configured (typically a missing
    /// API key), in which case runs use fallback labels and summaries.
    pub fn from_settings(settings: &AiSettings) -> Option<Self> {
        let labeler = build_provider(settings, &settings.model_labeling)?;
        let summarizer = build_provider(settings, &settings.model_summary)?;
        Some(
            Self::new(labeler)
                .with_summary_provider(summarizer)
                .with_temperature(settings.temperature)
                .with_max_tokens(settings.max_tokens),
        )
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(
        &self,
        subject: &str,
        keywords: &[String],
        sample: &str,
    ) -> ClassifierResult<Label> {
        let request = CompletionRequest::prompt(label_prompt(subject, keywords, sample))
            .with_system_prompt(LABEL_SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_max_tokens(LABEL_MAX_TOKENS);

        let response = self.labeler.complete(&request).await?;
        tracing::debug!(
            model = self.labeler.model(),
            tokens = response.tokens_used.total_tokens,
            "Label response received"
        );
        Ok(parse_label(&response.text))
    }

    async fn summarize(&self, request: &SummaryRequest) -> ClassifierResult<StructuredSummary> {
        let completion = CompletionRequest::prompt(summary_prompt(request))
            .with_system_prompt(SUMMARY_SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.summarizer.complete(&completion).await?;
        tracing::debug!(
            model = self.summarizer.model(),
            tokens = response.tokens_used.total_tokens,
            "Summary response received"
        );
        parse_summary(&response.text, request)
    }
}

fn label_prompt(subject: &str, keywords: &[String], sample: &str) -> String {
    format!(
        "Subject: {}\nKeywords: {}\nSample content:\n{}\n\n\
         Suggest a category for this thread.",
        subject,
        keywords.join(", "),
        sample
    )
}

fn summary_prompt(request: &SummaryRequest) -> String {
    let mut prompt = format!(
        "Category: {}\nContext: {}\nPeriod: {}\nParticipants: {}\n\nMessages:\n",
        request.category,
        request.context,
        request.date_range,
        request.participants.join(", ")
    );
    for (i, body) in request.messages.iter().enumerate() {
        prompt.push_str(&format!("\n--- Message {} ---\n{}\n", i + 1, body));
    }
    prompt.push_str("\nSummarize what happened in this correspondence.");
    prompt
}

/// Strips the first matching case-insensitive prefix from `line`.
fn strip_prefix_ci<'a>(line: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| {
        let split = line
            .char_indices()
            .nth(prefix.chars().count())
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        let (head, tail) = line.split_at(split);
        (head.to_lowercase() == *prefix)
            .then(|| tail.trim_matches(|c: char| c == '*' || c.is_whitespace()))
    })
}

/// Parses `Category:` and `Description:` lines out of a label response.
fn parse_label(text: &str) -> Label {
    let mut label = Label::new(DEFAULT_LABEL, "");

    for line in text.lines() {
        let line = line.trim().trim_start_matches('*');
        if let Some(name) = strip_prefix_ci(line, &CATEGORY_PREFIXES) {
            if !name.is_empty() {
                label.name = name.to_string();
            }
        } else if let Some(description) = strip_prefix_ci(line, &DESCRIPTION_PREFIXES) {
            label.description = description.to_string();
        }
    }

    label
}

/// Extracts the JSON object from a summary response.
///
/// Text without any object becomes a single action flagged for clarification.
fn parse_summary(text: &str, request: &SummaryRequest) -> ClassifierResult<StructuredSummary> {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&text[start..=end])
            .map_err(|e| ClassifierError::InvalidResponse(format!("summary JSON: {}", e))),
        _ => Ok(StructuredSummary {
            context: request.context.clone(),
            actions: vec![truncate_chars(text.trim(), UNSTRUCTURED_CHARS).to_string()],
            result: "Needs clarification".to_string(),
            parties: request.participants.join(", "),
            remarks: String::new(),
            recommendations: String::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ai::{CompletionResponse, FinishReason, LlmError, LlmResult, TokenUsage};
    use std::sync::Mutex;

    struct CannedProvider {
        model: &'static str,
        reply: LlmResult<String>,
        prompts: Mutex<Vec<CompletionRequest>>,
    }

    impl CannedProvider {
        fn replying(model: &'static str, text: &str) -> Arc<Self> {
            Arc::new(Self {
                model,
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: LlmError) -> Arc<Self> {
            Arc::new(Self {
                model: "broken",
                reply: Err(error),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse> {
            self.prompts.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    text: text.clone(),
                    tokens_used: TokenUsage::default(),
                    finish_reason: FinishReason::Stop,
                }),
                Err(LlmError::AuthenticationError(msg)) => {
                    Err(LlmError::AuthenticationError(msg.clone()))
                }
                Err(other) => Err(LlmError::Unavailable(other.to_string())),
            }
        }

        fn model(&self) -> &str {
            self.model
        }
    }

    fn request() -> SummaryRequest {
        SummaryRequest {
            category: "Budget".to_string(),
            context: "Quarterly planning".to_string(),
            messages: vec!["We need numbers by Friday".to_string()],
            participants: vec!["a@x.com".to_string(), "b@x.com".to_string()],
            date_range: "01.03.2024–05.03.2024".to_string(),
        }
    }

    #[test]
    fn parses_category_and_description() {
        let label = parse_label("Category: Budget Planning\nDescription: Q3 numbers.");
        assert_eq!(label, Label::new("Budget Planning", "Q3 numbers."));
    }

    #[test]
    fn parses_case_and_markdown_variants() {
        let label = parse_label("**CATEGORY:** Legal\n  description:  Contract review ");
        assert_eq!(label.name, "Legal");
        assert_eq!(label.description, "Contract review");

        let label = parse_label("Категория: Финансы\nОписание: Бюджет");
        assert_eq!(label.name, "Финансы");
        assert_eq!(label.description, "Бюджет");
    }

    #[test]
    fn missing_category_line_uses_default() {
        let label = parse_label("I am not sure what this is.");
        assert_eq!(label.name, DEFAULT_LABEL);
        assert!(label.description.is_empty());
    }

    #[test]
    fn summary_json_is_extracted_from_prose() {
        let text = r#"Here you go:
{"context": "Budget talks", "actions": ["Sent draft", "Agreed totals"], "result": "Approved", "parties": "a, b"}
Thanks!"#;
        let summary = parse_summary(text, &request()).unwrap();
        assert_eq!(summary.context, "Budget talks");
        assert_eq!(summary.actions.len(), 2);
        assert_eq!(summary.result, "Approved");
        assert!(summary.remarks.is_empty());
    }

    #[test]
    fn summary_without_json_needs_clarification() {
        let text = "x".repeat(800);
        let summary = parse_summary(&text, &request()).unwrap();
        assert_eq!(summary.result, "Needs clarification");
        assert_eq!(summary.actions[0].chars().count(), UNSTRUCTURED_CHARS);
        assert_eq!(summary.parties, "a@x.com, b@x.com");
        assert_eq!(summary.context, "Quarterly planning");
    }

    #[test]
    fn malformed_json_is_invalid_response() {
        let result = parse_summary("{ not really json }", &request());
        assert!(matches!(result, Err(ClassifierError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn classify_prompts_labeler_with_thread_details() {
        let labeler = CannedProvider::replying("small", "Category: Budget\nDescription: Money");
        let summarizer = CannedProvider::replying("large", "{}");
        let classifier =
            LlmClassifier::new(labeler.clone()).with_summary_provider(summarizer.clone());

        let keywords = vec!["budget".to_string(), "quarter".to_string()];
        let label = classifier
            .classify("Q3 budget", &keywords, "Numbers attached")
            .await
            .unwrap();

        assert_eq!(label.name, "Budget");
        let prompts = labeler.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].max_tokens, Some(LABEL_MAX_TOKENS));
        assert!(prompts[0].messages[0].content.contains("Q3 budget"));
        assert!(prompts[0].messages[0].content.contains("budget, quarter"));
        assert!(summarizer.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn summarize_uses_summary_provider() {
        let labeler = CannedProvider::replying("small", "Category: X");
        let summarizer =
            CannedProvider::replying("large", r#"{"context": "c", "result": "done"}"#);
        let classifier = LlmClassifier::new(labeler.clone())
            .with_summary_provider(summarizer.clone())
            .with_max_tokens(512);

        let summary = classifier.summarize(&request()).await.unwrap();
        assert_eq!(summary.result, "done");

        let prompts = summarizer.prompts.lock().unwrap();
        assert_eq!(prompts[0].max_tokens, Some(512));
        assert!(prompts[0].messages[0].content.contains("--- Message 1 ---"));
        assert!(labeler.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_auth_errors_surface_as_auth_failures() {
        let provider = CannedProvider::failing(LlmError::AuthenticationError(
            "invalid x-api-key".to_string(),
        ));
        let classifier = LlmClassifier::new(provider);

        let err = classifier.classify("s", &[], "").await.unwrap_err();
        assert!(err.is_auth_failure());
    }
}
