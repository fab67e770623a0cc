//! Category domain types.
//!
//! A category is a deduplicated topical grouping of threads. It is created the
//! first time a normalized label key is seen during category assignment and
//! only grows afterwards.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{CategoryId, Thread};

/// Placeholder for date ranges when no member message carries a date.
pub const UNKNOWN_DATE_RANGE: &str = "N/A";

/// A topical grouping of threads.
#[derive(Debug, Clone)]
pub struct Category<'a> {
    id: CategoryId,
    name: String,
    description: String,
    key: String,
    threads: Vec<&'a Thread<'a>>,
}

impl<'a> Category<'a> {
    /// Creates an empty category.
    pub fn new(
        id: CategoryId,
        name: impl Into<String>,
        description: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            key: key.into(),
            threads: Vec::new(),
        }
    }

    /// Appends a thread. Name and description are left untouched.
    pub(crate) fn push(&mut self, thread: &'a Thread<'a>) {
        self.threads.push(thread);
    }

    /// Category identifier.
    pub fn id(&self) -> &CategoryId {
        &self.id
    }

    /// Display name from the first thread that created the category.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description from the first thread that created the category.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Normalized deduplication key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Member threads in insertion order.
    pub fn threads(&self) -> &[&'a Thread<'a>] {
        &self.threads
    }

    /// Number of member threads.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Total messages across member threads.
    pub fn message_count(&self) -> usize {
        self.threads.iter().map(|t| t.message_count()).sum()
    }

    /// Total attachments across member threads.
    pub fn attachment_count(&self) -> u32 {
        self.threads.iter().map(|t| t.attachment_count()).sum()
    }

    /// Earliest defined date across member threads.
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.threads.iter().filter_map(|t| t.start_date()).min()
    }

    /// Latest defined date across member threads.
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.threads.iter().filter_map(|t| t.end_date()).max()
    }

    /// Sorted union of all thread participants.
    pub fn participants(&self) -> BTreeSet<&'a str> {
        self.threads
            .iter()
            .flat_map(|t| t.participants().iter().copied())
            .collect()
    }

    /// Human-readable date range, e.g. `01.03.2024–15.03.2024`.
    pub fn date_range_label(&self) -> String {
        format_date_range(self.start_date(), self.end_date())
    }
}

/// Formats an optional date range as `dd.mm.yyyy` or `dd.mm.yyyy–dd.mm.yyyy`.
pub fn format_date_range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => {
            let start = start.format("%d.%m.%Y").to_string();
            let end = end.format("%d.%m.%Y").to_string();
            if start == end {
                start
            } else {
                format!("{}–{}", start, end)
            }
        }
        (Some(only), None) | (None, Some(only)) => only.format("%d.%m.%Y").to_string(),
        (None, None) => UNKNOWN_DATE_RANGE.to_string(),
    }
}
