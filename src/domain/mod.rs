//! Domain layer types for threadline.
//!
//! This module contains the core domain types used throughout the pipeline:
//! upstream messages, reconstructed threads, categories, summaries and the
//! owned report handed to downstream collaborators.

mod category;
mod message;
mod report;
mod summary;
mod thread;
mod types;

pub use category::{format_date_range, Category, UNKNOWN_DATE_RANGE};
pub use message::Message;
pub use report::{CategoryReport, Report, RunStats, ThreadDigest};
pub use summary::{CategorySummary, StructuredSummary};
pub use thread::{Thread, ThreadBuilder};
pub use types::{CategoryId, JobId, MessageId, ThreadId};
