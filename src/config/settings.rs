//! Configuration settings for Diligent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub api: ApiSettings,
    pub embedding: EmbeddingSettings,
    pub completion: CompletionSettings,
    pub retrieval: RetrievalSettings,
    pub telemetry: TelemetrySettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Remote API settings shared by the embedding and completion clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Environment variable consulted for the bearer token.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Number of texts sent per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            batch_size: 8,
        }
    }
}

/// Completion (decision) model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Generative model used to answer questions.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.2,
        }
    }
}

/// Document chunking and evidence selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Sliding window size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    pub chunk_overlap: usize,
    /// Maximum number of excerpts placed into a prompt.
    pub max_context_chunks: usize,
    /// Minimum cosine similarity for an excerpt to count as evidence.
    pub min_similarity: f32,
    /// Characters of normalized document text kept for analysis.
    pub max_document_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            max_context_chunks: 5,
            min_similarity: 0.18,
            max_document_chars: 15_000,
        }
    }
}

/// Telemetry ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Maximum number of records retained.
    pub capacity: usize,
    /// Characters of response text kept per record.
    pub preview_chars: usize,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            capacity: 200,
            preview_chars: 280,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the chunker and ledger cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::DiligentError;

        let retrieval = &self.retrieval;
        if retrieval.chunk_size == 0 {
            return Err(DiligentError::Config("retrieval.chunk_size must be positive".to_string()));
        }
        if retrieval.chunk_overlap * 2 >= retrieval.chunk_size {
            return Err(DiligentError::Config(format!(
                "retrieval.chunk_overlap ({}) must be less than half of chunk_size ({})",
                retrieval.chunk_overlap, retrieval.chunk_size
            )));
        }
        let max_batch = crate::retrieval::EMBEDDING_BATCH_SIZE;
        if self.embedding.batch_size == 0 || self.embedding.batch_size > max_batch {
            return Err(DiligentError::Config(format!(
                "embedding.batch_size ({}) must be between 1 and {}",
                self.embedding.batch_size, max_batch
            )));
        }
        if self.telemetry.capacity == 0 {
            return Err(DiligentError::Config("telemetry.capacity must be positive".to_string()));
        }
        url::Url::parse(&self.api.base_url)
            .map_err(|e| DiligentError::Config(format!("api.base_url: {}", e)))?;
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::DiligentError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diligent")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Read the bearer token from the configured environment variable.
    pub fn api_key_from_env(&self) -> Option<String> {
        std::env::var(&self.api.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}
