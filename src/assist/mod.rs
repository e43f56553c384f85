//! AI assist for individual questions.
//!
//! Retrieval picks evidence from the loaded document, [`build_prompt`] turns it
//! into a prompt, and [`parse_decision`] reads the model's answer back. The
//! [`AssistEngine`] drives these steps for one question at a time.

mod decision;
mod engine;
mod prompt;

pub use decision::{parse_decision, Decision};
pub use engine::{AskOutcome, AssistEngine, AssistState, DEFAULT_TEMPERATURE};
pub use prompt::build_prompt;
