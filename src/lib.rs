//! Diligent - AI-assisted due diligence questionnaires
//!
//! Answers a fixed compliance questionnaire from an uploaded evidence document.
//!
//! # Overview
//!
//! Diligent allows you to:
//! - Load a plain-text or PDF evidence document
//! - Retrieve the passages most relevant to each question
//! - Let a language model pick an answer, constrained to the question's options
//! - Review, edit and score the answers
//! - Inspect every API call in a bounded telemetry log
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `document` - Text normalization and document ingestion
//! - `chunking` - Sliding-window chunking
//! - `openai` - HTTP plumbing and the API credential
//! - `embedding` - Embedding generation
//! - `completion` - Text generation and response envelopes
//! - `retrieval` - Similarity ranking and evidence gathering
//! - `assist` - Prompt building, decision parsing, per-question orchestration
//! - `telemetry` - API call ledger and token accounting
//! - `questionnaire` - Question catalog, answers and progress
//! - `session` - Document store and the command surface for interfaces
//!
//! # Example
//!
//! ```rust,no_run
//! use diligent::config::Settings;
//! use diligent::openai::ApiKey;
//! use diligent::session::Session;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let session = Session::from_settings(&settings)?;
//!     let key = ApiKey::new(std::env::var("OPENAI_API_KEY")?);
//!
//!     session.load_file(Path::new("policy.pdf")).await?;
//!     let outcome = session.on_ask_ai("3.1", key.as_ref()).await?;
//!     println!("{}", outcome.status_message);
//!
//!     Ok(())
//! }
//! ```

pub mod assist;
pub mod chunking;
pub mod cli;
pub mod completion;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod questionnaire;
pub mod retrieval;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use error::{DiligentError, Result};
