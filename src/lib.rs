//! threadline - email thread reconstruction, categorization and summaries
//!
//! This crate turns a flat batch of parsed email messages into conversation
//! threads, groups the threads into topical categories with the help of an
//! optional language-model classifier, and writes a structured summary for
//! every category. Classifier failures never abort a run: every label and
//! summary has a deterministic fallback.
//!
//! ```rust,no_run
//! use threadline::config::Settings;
//! use threadline::domain::Message;
//! use threadline::services::Pipeline;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::from_settings(Settings::default())?;
//! let messages = vec![Message::new("1", "Q3 budget", "a@example.com")];
//! let report = pipeline.process(&messages).await;
//! println!("{} categories", report.categories.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod text;

pub use domain::{Message, Report};
pub use services::{JobRunner, Pipeline};
