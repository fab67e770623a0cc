//! Report handoff types.
//!
//! Owned, serializable snapshot of a finished run, handed to the document
//! renderer and attachment persistence collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, CategoryId, CategorySummary, MessageId, Thread, ThreadId};

/// Owned view of a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadDigest {
    pub id: ThreadId,
    pub subject: String,
    /// Member message ids, oldest first.
    pub message_ids: Vec<MessageId>,
    pub participants: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub attachment_count: u32,
}

impl From<&Thread<'_>> for ThreadDigest {
    fn from(thread: &Thread<'_>) -> Self {
        Self {
            id: thread.id().clone(),
            subject: thread.subject().to_string(),
            message_ids: thread.messages().iter().map(|m| m.id.clone()).collect(),
            participants: thread.participants().iter().map(|p| p.to_string()).collect(),
            start_date: thread.start_date(),
            end_date: thread.end_date(),
            attachment_count: thread.attachment_count(),
        }
    }
}

/// Owned view of a category with its threads and optional summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub threads: Vec<ThreadDigest>,
    pub message_count: usize,
    pub attachment_count: u32,
    pub date_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CategorySummary>,
}

impl From<&Category<'_>> for CategoryReport {
    fn from(category: &Category<'_>) -> Self {
        Self {
            id: category.id().clone(),
            name: category.name().to_string(),
            description: category.description().to_string(),
            threads: category
                .threads()
                .iter()
                .map(|t| ThreadDigest::from(*t))
                .collect(),
            message_count: category.message_count(),
            attachment_count: category.attachment_count(),
            date_range: category.date_range_label(),
            summary: None,
        }
    }
}

/// Counters describing one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_messages: usize,
    pub total_threads: usize,
    pub total_categories: usize,
    pub total_attachments: u32,
    /// Threads labeled by the template instead of the classifier.
    pub fallback_labels: usize,
    /// Whether the classifier was disabled mid-run after an auth failure.
    pub classifier_tripped: bool,
}

/// Final output of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub categories: Vec<CategoryReport>,
    pub stats: RunStats,
}

impl Report {
    /// Builds a report from categories, attaching summaries by category id.
    pub fn new(
        categories: &[Category<'_>],
        summaries: Vec<CategorySummary>,
        stats: RunStats,
    ) -> Self {
        let mut reports: Vec<CategoryReport> =
            categories.iter().map(CategoryReport::from).collect();

        for summary in summaries {
            if let Some(report) = reports.iter_mut().find(|r| r.id == summary.category_id) {
                report.summary = Some(summary);
            }
        }

        Self {
            categories: reports,
            stats,
        }
    }

    /// Total threads across all categories.
    pub fn thread_count(&self) -> usize {
        self.categories.iter().map(|c| c.threads.len()).sum()
    }

    /// Returns true if the run produced no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, StructuredSummary, ThreadBuilder};

    #[test]
    fn report_attaches_summaries_by_id() {
        let msg = Message::new("m1", "Budget", "a@x.com")
            .with_recipient("b@x.com")
            .with_attachments(1);
        let mut builder = ThreadBuilder::new(ThreadId::sequential(1));
        builder.push(&msg);
        let thread = builder.build();

        let mut category = Category::new(CategoryId::sequential(1), "Budget", "Costs", "budget");
        category.push(&thread);

        let summary = CategorySummary {
            category_id: CategoryId::sequential(1),
            category_name: "Budget".to_string(),
            date_range: "N/A".to_string(),
            participants: vec![],
            message_count: 1,
            attachment_count: 1,
            summary: StructuredSummary::default(),
        };

        let report = Report::new(&[category], vec![summary], RunStats::default());

        assert_eq!(report.categories.len(), 1);
        assert_eq!(report.thread_count(), 1);
        assert!(report.categories[0].summary.is_some());
        assert_eq!(
            report.categories[0].threads[0].message_ids,
            vec![MessageId::from("m1")]
        );
        assert_eq!(report.categories[0].date_range, "N/A");
    }

    #[test]
    fn report_serializes_without_missing_summary() {
        let category = Category::new(CategoryId::sequential(1), "Empty", "", "empty");
        let report = Report::new(&[category], vec![], RunStats::default());

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("summary"));
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
