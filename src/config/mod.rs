//! Configuration module for Svar.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, SummarizerPrompts};
pub use settings::{
    DataSettings, EmbeddingProvider, EmbeddingSettings, GeneralSettings, PromptSettings, Settings,
    StoreSettings, SummarizerSettings,
};
