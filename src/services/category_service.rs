//! Category assignment.
//!
//! Each thread is labeled once through the [`ClassifierAdapter`]. Labels are
//! reduced to a normalized key and threads with equal keys share a category.
//! The first thread to produce a key fixes the category's name and
//! description.

use std::collections::HashMap;

use super::classifier::ClassifierAdapter;
use crate::config::CategorizationSettings;
use crate::domain::{Category, CategoryId, Thread};
use crate::text::{extract_keywords, truncate_chars};

/// Key used when a label is empty after normalization.
pub const UNCATEGORIZED_KEY: &str = "uncategorized";

/// Display name used when a label is empty.
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";

/// Maximum characters of a category key.
pub const MAX_KEY_CHARS: usize = 120;

/// Canonical deduplication key for a category label.
///
/// Collapses whitespace runs, trims, lowercases and truncates. Labels that
/// normalize to nothing map to [`UNCATEGORIZED_KEY`].
pub fn normalize_category_key(label: &str) -> String {
    let collapsed = label.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();
    if lowered.is_empty() {
        return UNCATEGORIZED_KEY.to_string();
    }
    truncate_chars(&lowered, MAX_KEY_CHARS).to_string()
}

/// Content excerpt sent to the classifier for one thread.
///
/// Taken from the earliest message body; longer text is cut to `max_chars`
/// and marked with `...`.
pub fn sample_content(thread: &Thread<'_>, max_chars: usize) -> String {
    let body = thread.first_message().map(|m| m.body.as_str()).unwrap_or_default();
    if body.chars().count() > max_chars {
        format!("{}...", truncate_chars(body, max_chars))
    } else {
        body.to_string()
    }
}

/// Assigns threads to deduplicated categories.
#[derive(Debug, Clone, Default)]
pub struct CategoryAssigner {
    settings: CategorizationSettings,
}

impl CategoryAssigner {
    pub fn new(settings: CategorizationSettings) -> Self {
        Self { settings }
    }

    /// Labels every thread and groups them by normalized key.
    ///
    /// Categories are numbered `CAT_001`, `CAT_002`, ... in creation order.
    /// Every thread ends up in exactly one category; classifier failures
    /// never abort the run.
    pub async fn assign_categories<'a>(
        &self,
        threads: &'a [Thread<'a>],
        adapter: &mut ClassifierAdapter,
    ) -> Vec<Category<'a>> {
        tracing::info!(threads = threads.len(), "Assigning categories");

        let mut categories: Vec<Category<'a>> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();

        for thread in threads {
            let keywords = extract_keywords(&thread.combined_body(), self.settings.top_n_keywords);
            let sample = sample_content(thread, self.settings.sample_length);

            let (label, source) = adapter
                .label(thread.subject(), &keywords, &sample, thread.message_count())
                .await;

            let key = normalize_category_key(&label.name);
            let idx = match by_key.get(&key) {
                Some(&idx) => idx,
                None => {
                    let name = if label.name.trim().is_empty() {
                        UNCATEGORIZED_NAME.to_string()
                    } else {
                        label.name.trim().to_string()
                    };
                    let id = CategoryId::sequential(categories.len() + 1);
                    tracing::debug!(category = %id, key = %key, "New category");
                    categories.push(Category::new(id, name, label.description, key.clone()));
                    by_key.insert(key, categories.len() - 1);
                    categories.len() - 1
                }
            };

            categories[idx].push(thread);
            tracing::info!(
                thread = %thread.id(),
                category = categories[idx].name(),
                fallback = source.is_fallback(),
                "Thread categorized"
            );
        }

        if categories.len() > self.settings.max_categories {
            tracing::warn!(
                categories = categories.len(),
                limit = self.settings.max_categories,
                "Category count exceeds configured maximum"
            );
        }

        tracing::info!(categories = categories.len(), "Categories assigned");
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, ThreadBuilder, ThreadId};
    use crate::services::classifier::testing::ScriptedClassifier;
    use crate::services::classifier::{ClassifierError, Label};
    use crate::providers::ai::LlmError;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn thread<'a>(n: usize, messages: &'a [Message]) -> Thread<'a> {
        let mut builder = ThreadBuilder::new(ThreadId::sequential(n));
        builder.extend(messages.iter());
        builder.build()
    }

    #[test]
    fn key_normalization() {
        assert_eq!(normalize_category_key("Project Alpha"), "project alpha");
        assert_eq!(normalize_category_key("  project \t  ALPHA "), "project alpha");
        assert_eq!(normalize_category_key("   "), UNCATEGORIZED_KEY);
        assert_eq!(normalize_category_key(""), UNCATEGORIZED_KEY);
        assert_eq!(
            normalize_category_key(&"a".repeat(300)).chars().count(),
            MAX_KEY_CHARS
        );
    }

    #[test]
    fn labels_differing_past_the_key_limit_merge() {
        let base = "x".repeat(MAX_KEY_CHARS);
        assert_eq!(
            normalize_category_key(&format!("{} one", base)),
            normalize_category_key(&format!("{} two", base))
        );
    }

    #[test]
    fn sample_is_truncated_with_ellipsis() {
        let messages = vec![Message::new("1", "S", "a@x.com").with_body("x".repeat(600))];
        let t = thread(1, &messages);

        let sample = sample_content(&t, 500);
        assert_eq!(sample.chars().count(), 503);
        assert!(sample.ends_with("..."));

        let messages = vec![
            Message::new("1", "S", "a@x.com").with_body("short"),
            Message::new("2", "S", "a@x.com").with_body("second body"),
        ];
        let t = thread(1, &messages);
        assert_eq!(sample_content(&t, 500), "short");
    }

    #[tokio::test]
    async fn equal_keys_share_a_category() {
        let m1 = vec![Message::new("1", "Alpha kickoff", "a@x.com")];
        let m2 = vec![Message::new("2", "Alpha followup", "b@x.com")];
        let m3 = vec![Message::new("3", "Lunch", "c@x.com")];
        let threads = vec![thread(1, &m1), thread(2, &m2), thread(3, &m3)];

        let classifier = Arc::new(ScriptedClassifier::new().with_labels(vec![
            Ok(Label::new("Project Alpha", "First description")),
            Ok(Label::new("project   alpha", "Second description")),
            Ok(Label::new("Social", "Food")),
        ]));
        let mut adapter = ClassifierAdapter::new(Some(classifier), true);

        let categories = CategoryAssigner::default()
            .assign_categories(&threads, &mut adapter)
            .await;

        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].id().0, "CAT_001");
        assert_eq!(categories[0].name(), "Project Alpha");
        assert_eq!(categories[0].description(), "First description");
        assert_eq!(categories[0].thread_count(), 2);
        assert_eq!(categories[1].id().0, "CAT_002");
        assert_eq!(categories[1].name(), "Social");
    }

    #[tokio::test]
    async fn empty_label_goes_to_uncategorized() {
        let m1 = vec![Message::new("1", "", "a@x.com")];
        let threads = vec![thread(1, &m1)];

        let mut adapter = ClassifierAdapter::disabled();
        let categories = CategoryAssigner::default()
            .assign_categories(&threads, &mut adapter)
            .await;

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].key(), UNCATEGORIZED_KEY);
        assert_eq!(categories[0].name(), UNCATEGORIZED_NAME);
        assert_eq!(categories[0].description(), "Thread with 1 messages");
    }

    #[tokio::test]
    async fn disabled_classifier_labels_by_subject() {
        let m1 = vec![Message::new("1", "Budget", "a@x.com")];
        let m2 = vec![
            Message::new("2", "budget", "b@x.com"),
            Message::new("3", "budget", "b@x.com"),
        ];
        let threads = vec![thread(1, &m1), thread(2, &m2)];

        let mut adapter = ClassifierAdapter::disabled();
        let categories = CategoryAssigner::default()
            .assign_categories(&threads, &mut adapter)
            .await;

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name(), "Budget");
        assert_eq!(categories[0].message_count(), 3);
        assert_eq!(adapter.fallbacks(), 2);
    }

    #[tokio::test]
    async fn auth_failure_stops_further_calls() {
        let subjects = ["One", "Two", "Three", "Four"];
        let owned: Vec<Vec<Message>> = subjects
            .iter()
            .enumerate()
            .map(|(i, s)| vec![Message::new(i.to_string(), *s, "a@x.com")])
            .collect();
        let threads: Vec<Thread<'_>> = owned
            .iter()
            .enumerate()
            .map(|(i, m)| thread(i + 1, m))
            .collect();

        let classifier = Arc::new(ScriptedClassifier::new().with_labels(vec![
            Ok(Label::new("Ops", "")),
            Err(ClassifierError::Provider(LlmError::AuthenticationError(
                "invalid x-api-key".into(),
            ))),
        ]));
        let mut adapter = ClassifierAdapter::new(Some(classifier.clone()), true);

        let categories = CategoryAssigner::default()
            .assign_categories(&threads, &mut adapter)
            .await;

        assert_eq!(classifier.label_call_count(), 2);
        assert!(adapter.is_tripped());
        let names: Vec<&str> = categories.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Ops", "Two", "Three", "Four"]);
    }

    #[tokio::test]
    async fn exceeding_max_categories_is_advisory() {
        let owned: Vec<Vec<Message>> = (0..4)
            .map(|i| vec![Message::new(i.to_string(), format!("Topic {}", i), "a@x.com")])
            .collect();
        let threads: Vec<Thread<'_>> = owned
            .iter()
            .enumerate()
            .map(|(i, m)| thread(i + 1, m))
            .collect();

        let assigner = CategoryAssigner::new(CategorizationSettings {
            max_categories: 2,
            classifier_enabled: false,
            ..Default::default()
        });
        let mut adapter = ClassifierAdapter::disabled();
        let categories = assigner.assign_categories(&threads, &mut adapter).await;

        assert_eq!(categories.len(), 4);
    }
}
