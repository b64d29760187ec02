//! Condensing recorded answers for display.

mod openai;

pub use openai::OpenAISummarizer;

use crate::config::{Prompts, SummarizerSettings};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Turns a raw answer into display text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Returns the answer unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSummarizer;

#[async_trait]
impl Summarizer for PassthroughSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Build the configured summarizer.
///
/// Falls back to [`PassthroughSummarizer`] when summarization is disabled or
/// no API key is available.
pub fn create_summarizer(settings: &SummarizerSettings, prompts: Prompts) -> Result<Arc<dyn Summarizer>> {
    if !settings.enabled {
        info!("Summarization disabled");
        return Ok(Arc::new(PassthroughSummarizer));
    }
    if !crate::openai::api_key_configured() {
        info!("OPENAI_API_KEY not set, answers will be shown verbatim");
        return Ok(Arc::new(PassthroughSummarizer));
    }

    let summarizer = OpenAISummarizer::new(
        &settings.model,
        Duration::from_secs(settings.timeout_seconds),
    )?
    .with_prompts(prompts);
    info!("Summarizing answers with {}", settings.model);
    Ok(Arc::new(summarizer))
}

/// Run `fut` under `timeout`, reporting expiry as [`SvarError::Timeout`].
pub async fn with_timeout<T>(
    operation: &str,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| SvarError::Timeout {
            operation: operation.to_string(),
            seconds: timeout.as_secs(),
        })?
}

/// Whether `text` is a single token that should be shown as-is.
pub fn is_single_word(text: &str) -> bool {
    text.split_whitespace().count() == 1
}
