//! Svar - Survey Question Answering
//!
//! Answers free-text questions against a survey of clinicians and payers.
//!
//! The name "Svar" is Norwegian for "answer."
//!
//! # Overview
//!
//! A query is answered in stages:
//! - narrow the survey questions by category and country
//! - keep the questions semantically closest to the query
//! - select respondents by stakeholder type, country grouping or name
//! - join their recorded answers and condense the first one
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `catalog` - Question store, user directory and CSV loading
//! - `embedding` - Embedding generation
//! - `index` - Exact nearest-neighbour search
//! - `search` - Relative-threshold semantic filtering
//! - `summarize` - Answer summarization
//! - `assistant` - The end-to-end question-answering flow
//!
//! # Example
//!
//! ```rust,no_run
//! use svar::assistant::{AskRequest, Assistant, QueryOutcome};
//! use svar::catalog::QuestionFilter;
//! use svar::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let assistant = Assistant::new(settings)?;
//!
//!     let request = AskRequest::new("How satisfied are payers with treatment X?")
//!         .with_questions(QuestionFilter::category("Landscape"));
//!
//!     if let QueryOutcome::Answered { summary, .. } = assistant.ask(&request).await? {
//!         println!("{}", summary);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod openai;
pub mod search;
pub mod summarize;

pub use error::{Result, SvarError};
