//! Configuration settings for Svar.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub data: DataSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub summarizer: SummarizerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.svar".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Locations of the survey catalogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Questions table (`Question Id, Question, Category, Country`).
    pub questions_path: String,
    /// Users table (`user_id, username, stakeholder_type, Country_grouping`).
    pub users_path: String,
    /// Answers table (`question_id, user_id, answer`).
    pub answers_path: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            questions_path: "data/questions.csv".to_string(),
            users_path: "data/user_table.csv".to_string(),
            answers_path: "data/answer_table.csv".to_string(),
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local all-MiniLM-L6-v2 sentence transformer (default).
    #[default]
    Minilm,
    /// OpenAI embeddings API.
    Openai,
    /// Token hashing, no model files needed.
    Hash,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minilm" | "local" => Ok(EmbeddingProvider::Minilm),
            "openai" => Ok(EmbeddingProvider::Openai),
            "hash" => Ok(EmbeddingProvider::Hash),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::Minilm => write!(f, "minilm"),
            EmbeddingProvider::Openai => write!(f, "openai"),
            EmbeddingProvider::Hash => write!(f, "hash"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (minilm, openai, hash).
    pub provider: EmbeddingProvider,
    /// Model name (used by the openai provider).
    pub model: String,
    /// Embedding dimensions (openai and hash providers).
    pub dimensions: u32,
    /// Safetensors weights for the minilm provider.
    pub model_path: String,
    /// Tokenizer JSON for the minilm provider.
    pub tokenizer_path: String,
    /// Upper bound for a single embedding call.
    pub timeout_seconds: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Minilm,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            model_path: "~/.svar/models/all-MiniLM-L6-v2.safetensors".to_string(),
            tokenizer_path: "~/.svar/models/all-MiniLM-L6-v2-tokenizer.json".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the SQLite database holding the questions table.
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.svar/questions.db".to_string(),
        }
    }
}

/// Answer summarization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerSettings {
    /// Condense answers with an LLM before display.
    pub enabled: bool,
    /// Chat model used for summarization.
    pub model: String,
    /// Upper bound for a single summarization call.
    pub timeout_seconds: u64,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 60,
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
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SvarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svar")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }

    pub fn questions_path(&self) -> PathBuf {
        Self::expand_path(&self.data.questions_path)
    }

    pub fn users_path(&self) -> PathBuf {
        Self::expand_path(&self.data.users_path)
    }

    pub fn answers_path(&self) -> PathBuf {
        Self::expand_path(&self.data.answers_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Minilm);
        assert_eq!(settings.summarizer.model, "gpt-4o-mini");
        assert!(settings.summarizer.enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [embedding]
            provider = "hash"
            dimensions = 64

            [data]
            questions_path = "/srv/survey/questions.csv"
            "#,
        )
        .unwrap();

        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hash);
        assert_eq!(settings.embedding.dimensions, 64);
        assert_eq!(settings.embedding.timeout_seconds, 30);
        assert_eq!(
            settings.questions_path(),
            PathBuf::from("/srv/survey/questions.csv")
        );
        assert_eq!(settings.data.users_path, "data/user_table.csv");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.summarizer.enabled = false;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert!(!loaded.summarizer.enabled);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::Openai);
        assert_eq!("local".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::Minilm);
        assert!("faiss".parse::<EmbeddingProvider>().is_err());
    }
}
