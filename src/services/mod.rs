//! Pipeline services layer.
//!
//! Services turn a flat batch of messages into a categorized, summarized
//! report, coordinating the text helpers, the classifier providers and the
//! domain types.
//!
//! # Architecture
//!
//! ```text
//!   JobRunner (background jobs, bounded concurrency)
//!        |
//!        v
//!   Pipeline::run
//!        |-- ThreadReconstructor   subject -> participants -> time gaps
//!        |-- CategoryAssigner      label, normalize key, deduplicate
//!        `-- CategorySummarizer    clean bodies, structured summary
//!                 |
//!                 v
//!        ClassifierAdapter (per run, fallbacks, sticky breaker)
//!                 |
//!                 v
//!        Classifier (LlmClassifier over providers::ai)
//! ```

mod category_service;
mod classifier;
mod job_service;
mod llm_classifier;
mod pipeline;
mod summary_service;
mod thread_service;

pub use category_service::{
    normalize_category_key, sample_content, CategoryAssigner, MAX_KEY_CHARS, UNCATEGORIZED_KEY,
    UNCATEGORIZED_NAME,
};
pub use classifier::{
    disabled_summary, failed_summary, fallback_label, matches_auth_signature, Classifier,
    ClassifierAdapter, ClassifierError, ClassifierResult, Label, Source, SummaryRequest,
    FALLBACK_LABEL_CHARS,
};
pub use job_service::{JobError, JobResult, JobRunner, JobState, JobStatus};
pub use llm_classifier::LlmClassifier;
pub use pipeline::{Pipeline, PipelineError, PipelineResult, RunControl, Stage};
pub use summary_service::CategorySummarizer;
pub use thread_service::{build_threads, ThreadReconstructor};
