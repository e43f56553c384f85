//! Pre-flight checks before expensive operations.
//!
//! Validates that the document and credential are available before starting
//! work that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{DiligentError, Result};
use crate::openai::ApiKey;
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions requires a readable document and an API key.
    Ask,
    /// Inspecting chunks requires a readable document.
    Chunks,
}

/// Run pre-flight checks for the given operation.
///
/// Returns the credential for operations that need one.
pub fn check(
    operation: Operation,
    document: &Path,
    api_key: Option<&str>,
    settings: &Settings,
) -> Result<Option<ApiKey>> {
    check_document(document)?;
    match operation {
        Operation::Ask => resolve_api_key(api_key, settings).map(Some),
        Operation::Chunks => Ok(None),
    }
}

/// Take the key from the flag, or from the configured environment variable.
pub fn resolve_api_key(api_key: Option<&str>, settings: &Settings) -> Result<ApiKey> {
    api_key
        .and_then(ApiKey::new)
        .or_else(|| settings.api_key_from_env().and_then(ApiKey::new))
        .ok_or_else(|| {
            DiligentError::Config(format!(
                "No API key. Pass --api-key or set it with: export {}='sk-...'",
                settings.api.api_key_env
            ))
        })
}

/// Check that the document exists and is a file.
fn check_document(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DiligentError::Document(format!("{} not found", path.display())));
    }
    if !path.is_file() {
        return Err(DiligentError::Document(format!("{} is not a file", path.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_needs_no_key() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut settings = Settings::default();
        settings.api.api_key_env = "DILIGENT_TEST_UNSET_KEY".to_string();

        assert!(check(Operation::Chunks, file.path(), None, &settings).unwrap().is_none());
        assert!(check(Operation::Ask, file.path(), None, &settings).is_err());
        assert!(check(Operation::Ask, file.path(), Some("sk-test"), &settings)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let result = check(Operation::Chunks, &dir.path().join("nope.txt"), None, &Settings::default());
        assert!(matches!(result, Err(DiligentError::Document(_))));

        let result = check(Operation::Chunks, dir.path(), None, &Settings::default());
        assert!(matches!(result, Err(DiligentError::Document(_))));
    }

    #[test]
    fn test_blank_flag_is_not_a_key() {
        let mut settings = Settings::default();
        settings.api.api_key_env = "DILIGENT_TEST_UNSET_KEY".to_string();
        assert!(resolve_api_key(Some("   "), &settings).is_err());
    }
}
