//! Category summarization.
//!
//! Builds one [`CategorySummary`] per category. Message bodies are cleaned
//! before they reach the classifier, and every category gets a summary even
//! when the classifier is unavailable.

use std::collections::HashSet;

use super::classifier::{ClassifierAdapter, SummaryRequest};
use crate::config::{CleaningSettings, SummarizationSettings};
use crate::domain::{Category, CategorySummary};
use crate::text::ContentCleaner;

/// Participants listed on a finished summary.
const LISTED_PARTICIPANTS: usize = 10;

/// Writes per-category summaries.
#[derive(Debug, Clone, Default)]
pub struct CategorySummarizer {
    cleaner: ContentCleaner,
    settings: SummarizationSettings,
}

impl CategorySummarizer {
    pub fn new(settings: SummarizationSettings, cleaning: CleaningSettings) -> Self {
        Self {
            cleaner: ContentCleaner::new(cleaning),
            settings,
        }
    }

    /// Summarizes every category, in category order.
    pub async fn summarize_categories(
        &self,
        categories: &[Category<'_>],
        adapter: &mut ClassifierAdapter,
    ) -> Vec<CategorySummary> {
        tracing::info!(categories = categories.len(), "Summarizing categories");

        let mut summaries = Vec::with_capacity(categories.len());
        for category in categories {
            summaries.push(self.summarize_category(category, adapter).await);
        }
        summaries
    }

    async fn summarize_category(
        &self,
        category: &Category<'_>,
        adapter: &mut ClassifierAdapter,
    ) -> CategorySummary {
        let participants = correspondents(category);
        let request = SummaryRequest {
            category: category.name().to_string(),
            context: category.description().to_string(),
            messages: self.cleaned_bodies(category),
            participants: participants
                .iter()
                .take(self.settings.max_participants)
                .cloned()
                .collect(),
            date_range: category.date_range_label(),
        };

        let (summary, source) = adapter.summarize(&request).await;
        tracing::debug!(
            category = %category.id(),
            fallback = source.is_fallback(),
            "Category summarized"
        );

        CategorySummary {
            category_id: category.id().clone(),
            category_name: request.category,
            date_range: request.date_range,
            participants: participants.into_iter().take(LISTED_PARTICIPANTS).collect(),
            message_count: category.message_count(),
            attachment_count: category.attachment_count(),
            summary,
        }
    }

    /// Cleaned, non-empty bodies of the first messages in the category.
    fn cleaned_bodies(&self, category: &Category<'_>) -> Vec<String> {
        category
            .threads()
            .iter()
            .copied()
            .flat_map(|t| t.messages())
            .map(|m| self.cleaner.extract_main_content(&m.body))
            .filter(|body| !body.is_empty())
            .take(self.settings.max_messages)
            .collect()
    }
}

/// Senders and primary recipients in order of first appearance.
fn correspondents(category: &Category<'_>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();

    let messages = category.threads().iter().copied().flat_map(|t| t.messages());
    for message in messages {
        let identities = std::iter::once(&message.sender).chain(message.recipients.iter());
        for identity in identities {
            if !identity.is_empty() && seen.insert(identity.as_str()) {
                ordered.push(identity.clone());
            }
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryId, Message, StructuredSummary, Thread, ThreadBuilder, ThreadId};
    use crate::services::classifier::testing::ScriptedClassifier;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn thread<'a>(messages: &'a [Message]) -> Thread<'a> {
        let mut builder = ThreadBuilder::new(ThreadId::sequential(1));
        builder.extend(messages.iter());
        builder.build()
    }

    fn messages() -> Vec<Message> {
        vec![
            Message::new("1", "Budget", "a@x.com")
                .with_recipient("b@x.com")
                .with_cc("cc@x.com")
                .with_date(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
                .with_body("Numbers attached.\n\n-- \nAlice")
                .with_attachments(2),
            Message::new("2", "Re: Budget", "b@x.com")
                .with_recipient("a@x.com")
                .with_date(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap())
                .with_body("Looks good.\n> Numbers attached."),
        ]
    }

    #[tokio::test]
    async fn summary_carries_category_facts() {
        let messages = messages();
        let t = thread(&messages);
        let mut category = Category::new(CategoryId::sequential(1), "Budget", "Money", "budget");
        category.push(&t);

        let mut adapter = ClassifierAdapter::disabled();
        let summaries = CategorySummarizer::default()
            .summarize_categories(&[category], &mut adapter)
            .await;

        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.category_id.0, "CAT_001");
        assert_eq!(summary.category_name, "Budget");
        assert_eq!(summary.date_range, "01.03.2024–05.03.2024");
        assert_eq!(summary.participants, vec!["a@x.com", "b@x.com"]);
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.attachment_count, 2);
        assert_eq!(summary.summary.context, "Money");
        assert_eq!(summary.summary.parties, "a@x.com, b@x.com");
    }

    #[tokio::test]
    async fn classifier_receives_cleaned_bodies() {
        let messages = messages();
        let t = thread(&messages);
        let mut category = Category::new(CategoryId::sequential(1), "Budget", "Money", "budget");
        category.push(&t);

        let classifier = Arc::new(ScriptedClassifier::new().with_summaries(vec![Ok(
            StructuredSummary {
                context: "Budget review".to_string(),
                result: "Approved".to_string(),
                ..Default::default()
            },
        )]));
        let mut adapter = ClassifierAdapter::new(Some(classifier.clone()), true);

        let summaries = CategorySummarizer::default()
            .summarize_categories(&[category], &mut adapter)
            .await;

        assert_eq!(summaries[0].summary.result, "Approved");
        let calls = classifier.summary_calls.lock().unwrap();
        assert_eq!(calls[0].messages, vec!["Numbers attached.", "Looks good."]);
        assert_eq!(calls[0].participants, vec!["a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn limits_forwarded_bodies() {
        let messages: Vec<Message> = (0..8)
            .map(|i| {
                Message::new(i.to_string(), "Topic", format!("u{}@x.com", i))
                    .with_body(format!("Body {}", i))
            })
            .collect();
        let t = thread(&messages);
        let mut category = Category::new(CategoryId::sequential(1), "Topic", "", "topic");
        category.push(&t);

        let classifier = Arc::new(ScriptedClassifier::new());
        let mut adapter = ClassifierAdapter::new(Some(classifier.clone()), true);
        let summaries = CategorySummarizer::new(
            SummarizationSettings {
                max_messages: 3,
                max_participants: 2,
                ..Default::default()
            },
            CleaningSettings::default(),
        )
        .summarize_categories(&[category], &mut adapter)
        .await;

        let calls = classifier.summary_calls.lock().unwrap();
        assert_eq!(calls[0].messages.len(), 3);
        assert_eq!(calls[0].participants.len(), 2);
        assert_eq!(summaries[0].participants.len(), 8);
    }

    #[tokio::test]
    async fn undated_category_reports_unknown_range() {
        let messages = vec![Message::new("1", "Topic", "a@x.com")];
        let t = thread(&messages);
        let mut category = Category::new(CategoryId::sequential(1), "Topic", "", "topic");
        category.push(&t);

        let mut adapter = ClassifierAdapter::disabled();
        let summaries = CategorySummarizer::default()
            .summarize_categories(&[category], &mut adapter)
            .await;

        assert_eq!(summaries[0].date_range, "N/A");
        assert_eq!(summaries[0].summary.actions, vec!["Correspondence on this topic"]);
    }
}
