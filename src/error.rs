//! Error types for Diligent.

use thiserror::Error;

/// Library-level error type for Diligent operations.
#[derive(Error, Debug)]
pub enum DiligentError {
    #[error("No API credential configured")]
    MissingCredential,

    #[error("Document is empty: {0}")]
    EmptyDocument(String),

    #[error("Embedding count mismatch: expected {expected} vectors, received {actual}")]
    EmbeddingMismatch { expected: usize, actual: usize },

    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Option '{value}' is not available for question {question}")]
    InvalidOption { question: String, value: String },

    #[error("Unknown question: {0}")]
    UnknownQuestion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DiligentError {
    /// The status line shown next to a question after a failed invocation.
    pub fn user_message(&self) -> String {
        match self {
            DiligentError::MissingCredential => "Add your OpenAI API key first.".to_string(),
            DiligentError::EmptyDocument(_) => {
                "Upload an evidence document before using the AI.".to_string()
            }
            DiligentError::EmbeddingMismatch { .. } => {
                "The document index could not be built. Please try again.".to_string()
            }
            DiligentError::Http { status, .. } => format!("Request failed with status {}", status),
            DiligentError::MalformedResponse(_) => {
                "AI response did not contain a JSON object.".to_string()
            }
            DiligentError::InvalidOption { .. } => {
                "AI returned an option that is not available for this question.".to_string()
            }
            DiligentError::Document(_) => {
                "Unable to read document. Please try a different file.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for Diligent operations.
pub type Result<T> = std::result::Result<T, DiligentError>;
