//! Message domain types.
//!
//! Represents an already-parsed email message as handed over by the upstream
//! parser. The pipeline only ever reads these records.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MessageId;

/// An individual email message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier assigned by the upstream parser.
    pub id: MessageId,
    /// Raw subject line.
    #[serde(default)]
    pub subject: String,
    /// Sender identity.
    #[serde(default)]
    pub sender: String,
    /// Primary recipient identities, in header order.
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Carbon copy identities, in header order.
    #[serde(default)]
    pub cc: Vec<String>,
    /// Send date; `None` when the parser could not determine one.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Number of file attachments.
    #[serde(default)]
    pub attachment_count: u32,
    /// Plain text body.
    #[serde(default)]
    pub body: String,
}

impl Message {
    /// Creates a message with a subject and sender and nothing else.
    pub fn new(
        id: impl Into<MessageId>,
        subject: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            sender: sender.into(),
            recipients: Vec::new(),
            cc: Vec::new(),
            date: None,
            attachment_count: 0,
            body: String::new(),
        }
    }

    /// Adds a primary recipient.
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipients.push(recipient.into());
        self
    }

    /// Adds a carbon copy recipient.
    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc.push(cc.into());
        self
    }

    /// Sets the send date.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the plain text body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the attachment count.
    pub fn with_attachments(mut self, count: u32) -> Self {
        self.attachment_count = count;
        self
    }

    /// Returns true if the message carries any attachment.
    pub fn has_attachments(&self) -> bool {
        self.attachment_count > 0
    }

    /// Returns every identity involved in this message.
    ///
    /// Sender, recipients and cc are merged; empty identities are skipped.
    pub fn participants(&self) -> HashSet<&str> {
        std::iter::once(self.sender.as_str())
            .chain(self.recipients.iter().map(String::as_str))
            .chain(self.cc.iter().map(String::as_str))
            .filter(|identity| !identity.is_empty())
            .collect()
    }
}
