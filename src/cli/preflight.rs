//! Pre-flight checks before loading models and data.
//!
//! Validates that required files and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{EmbeddingProvider, Settings};
use crate::error::{Result, SvarError};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Listing questions needs the questions file.
    Questions,
    /// Listing users needs the users file.
    Users,
    /// Search needs questions and an embedding provider.
    Search,
    /// Asking needs every data file and an embedding provider.
    Ask,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Questions => {
            check_file("questions file", &settings.questions_path())?;
        }
        Operation::Users => {
            check_file("users file", &settings.users_path())?;
        }
        Operation::Search => {
            check_file("questions file", &settings.questions_path())?;
            check_embedding(settings)?;
        }
        Operation::Ask => {
            check_file("questions file", &settings.questions_path())?;
            check_file("users file", &settings.users_path())?;
            check_file("answers file", &settings.answers_path())?;
            check_embedding(settings)?;
        }
    }
    Ok(())
}

fn check_file(what: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SvarError::Config(format!(
            "{} not found at {}. Set its path under [data] in the config file.",
            what,
            path.display()
        )))
    }
}

fn check_embedding(settings: &Settings) -> Result<()> {
    match settings.embedding.provider {
        EmbeddingProvider::Minilm => {
            check_file("MiniLM weights", &Settings::expand_path(&settings.embedding.model_path))?;
            check_file(
                "MiniLM tokenizer",
                &Settings::expand_path(&settings.embedding.tokenizer_path),
            )
        }
        EmbeddingProvider::Openai => check_api_key(),
        EmbeddingProvider::Hash => Ok(()),
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    require_api_key(crate::openai::api_key_configured())
}

fn require_api_key(configured: bool) -> Result<()> {
    if configured {
        Ok(())
    } else {
        Err(SvarError::Config(
            "OPENAI_API_KEY not set or empty. Set it with: export OPENAI_API_KEY='sk-...'"
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_in(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.embedding.provider = EmbeddingProvider::Hash;
        settings.data.questions_path = dir.join("questions.csv").display().to_string();
        settings.data.users_path = dir.join("users.csv").display().to_string();
        settings.data.answers_path = dir.join("answers.csv").display().to_string();
        settings
    }

    #[test]
    fn test_missing_questions_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());

        let err = check(Operation::Questions, &settings).unwrap_err();
        assert!(err.to_string().contains("questions file"));
    }

    #[test]
    fn test_ask_with_hash_embedder() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        for name in ["questions.csv", "users.csv", "answers.csv"] {
            std::fs::write(dir.path().join(name), "x\n").unwrap();
        }

        assert!(check(Operation::Ask, &settings).is_ok());
        assert!(check(Operation::Search, &settings).is_ok());
    }

    #[test]
    fn test_require_api_key() {
        assert!(require_api_key(true).is_ok());
        let err = require_api_key(false).unwrap_err();
        assert!(matches!(err, SvarError::Config(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_minilm_needs_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        std::fs::write(dir.path().join("questions.csv"), "x\n").unwrap();
        settings.embedding.provider = EmbeddingProvider::Minilm;
        settings.embedding.model_path = dir.path().join("none.safetensors").display().to_string();

        let err = check(Operation::Search, &settings).unwrap_err();
        assert!(err.to_string().contains("MiniLM weights"));
    }
}
