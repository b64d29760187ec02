//! Chat-completion summarizer.

use super::{is_single_word, Summarizer};
use crate::config::Prompts;
use crate::error::{Result, SvarError};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Extra time the HTTP client allows beyond the summarization bound, so an
/// expired call surfaces as a timeout rather than a transport error.
const HTTP_GRACE: Duration = Duration::from_secs(5);

fn http_timeout(bound: Duration) -> Duration {
    bound + HTTP_GRACE
}

/// Summarizer backed by an OpenAI chat model.
pub struct OpenAISummarizer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl OpenAISummarizer {
    /// `timeout` is the bound the caller enforces around each call.
    pub fn new(model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(http_timeout(timeout))?,
            model: model.to_string(),
            prompts: Prompts::default(),
        })
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    fn messages(&self, text: &str) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut vars = HashMap::new();
        vars.insert("answer".to_string(), text.to_string());
        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.summarizer.user, &vars);

        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.summarizer.system.clone())
                .build()
                .map_err(|e| SvarError::Summarizer(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| SvarError::Summarizer(e.to_string()))?
                .into(),
        ])
    }
}

#[async_trait]
impl Summarizer for OpenAISummarizer {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn summarize(&self, text: &str) -> Result<String> {
        // Single words are returned verbatim without a round trip.
        if text.trim().is_empty() || is_single_word(text) {
            return Ok(text.trim().to_string());
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.messages(text)?)
            .temperature(0.0)
            .build()
            .map_err(|e| SvarError::Summarizer(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SvarError::Summarizer(format!("Failed to summarize answer: {}", e)))?;

        let summary = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| SvarError::Summarizer("Empty response from LLM".to_string()))?
            .trim()
            .to_string();

        debug!("Summarized {} chars into {}", text.len(), summary.len());
        Ok(summary)
    }
}
