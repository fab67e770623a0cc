//! Thread domain types.
//!
//! A thread is a reconstructed conversation: an ordered run of messages that
//! the reconstruction stage inferred to belong to one exchange. Threads are
//! assembled through [`ThreadBuilder`] and frozen once built.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{Message, ThreadId};

/// A reconstructed conversation thread.
///
/// Borrows its messages from the caller's message slice. Membership and the
/// derived attributes are fixed at construction.
#[derive(Debug, Clone)]
pub struct Thread<'a> {
    id: ThreadId,
    messages: Vec<&'a Message>,
    subject: String,
    participants: BTreeSet<&'a str>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    attachment_count: u32,
}

impl<'a> Thread<'a> {
    /// Thread identifier.
    pub fn id(&self) -> &ThreadId {
        &self.id
    }

    /// Member messages, oldest first. Undated messages come first.
    pub fn messages(&self) -> &[&'a Message] {
        &self.messages
    }

    /// Subject of the earliest message.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Union of sender, recipients and cc over all messages.
    pub fn participants(&self) -> &BTreeSet<&'a str> {
        &self.participants
    }

    /// Earliest defined message date.
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    /// Latest defined message date.
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    /// Number of messages in the thread.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Total attachments across all messages.
    pub fn attachment_count(&self) -> u32 {
        self.attachment_count
    }

    /// Returns true if any message carries an attachment.
    pub fn has_attachments(&self) -> bool {
        self.attachment_count > 0
    }

    /// First message of the thread.
    pub fn first_message(&self) -> Option<&'a Message> {
        self.messages.first().copied()
    }

    /// All non-empty message bodies joined by a single space.
    pub fn combined_body(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.body.as_str())
            .filter(|body| !body.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Append-only builder for a [`Thread`].
#[derive(Debug)]
pub struct ThreadBuilder<'a> {
    id: ThreadId,
    messages: Vec<&'a Message>,
}

impl<'a> ThreadBuilder<'a> {
    /// Starts a new, empty thread.
    pub fn new(id: ThreadId) -> Self {
        Self {
            id,
            messages: Vec::new(),
        }
    }

    /// Appends a message.
    pub fn push(&mut self, message: &'a Message) -> &mut Self {
        self.messages.push(message);
        self
    }

    /// Appends every message from an iterator.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = &'a Message>) -> &mut Self {
        self.messages.extend(messages);
        self
    }

    /// Number of messages pushed so far.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Freezes the builder into a thread and computes derived attributes.
    pub fn build(self) -> Thread<'a> {
        let mut messages = self.messages;
        // Stable: `None` sorts before any date and ties keep push order.
        messages.sort_by_key(|m| m.date);

        let subject = messages
            .first()
            .map(|m| m.subject.clone())
            .unwrap_or_default();

        let participants = messages
            .iter()
            .copied()
            .flat_map(Message::participants)
            .collect::<BTreeSet<_>>();

        let start_date = messages.iter().filter_map(|m| m.date).min();
        let end_date = messages.iter().filter_map(|m| m.date).max();
        let attachment_count = messages.iter().map(|m| m.attachment_count).sum();

        Thread {
            id: self.id,
            messages,
            subject,
            participants,
            start_date,
            end_date,
            attachment_count,
        }
    }
}
