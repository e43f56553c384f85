//! Configuration module for Diligent.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{DecisionPrompts, Prompts};
pub use settings::{
    ApiSettings, CompletionSettings, EmbeddingSettings, GeneralSettings, PromptSettings,
    RetrievalSettings, Settings, TelemetrySettings,
};
