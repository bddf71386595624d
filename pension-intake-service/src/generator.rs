//! rig-core implementation of the response-generation seam: one agent per
//! call, the slot prompt as preamble, and the bounded history window
//! replayed for continuity.

use std::time::Duration;

use async_trait::async_trait;
use intake_flow::{ChatMessage, GenerateError, ResponseGenerator, Role};
use rig::client::CompletionClient;
use rig::completion::{Chat, Message};
use rig::providers::openrouter;
use tracing::debug;

const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

// The remote call is the only suspension point in a turn; cap it so a
// hung upstream delays the next assistant message by at most this much.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(15);

pub struct OpenRouterGenerator {
    api_key: Option<String>,
    model: String,
}

impl OpenRouterGenerator {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENROUTER_API_KEY").ok(),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl ResponseGenerator for OpenRouterGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        utterance: &str,
    ) -> Result<String, GenerateError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerateError::MissingCredential)?;

        let client = openrouter::Client::new(api_key);
        let agent = client
            .agent(&self.model)
            .preamble(system_prompt)
            .temperature(0.7)
            .max_tokens(150)
            .build();

        let chat_history: Vec<Message> = history
            .iter()
            .map(|message| match message.role {
                Role::User => Message::user(message.content.clone()),
                Role::Assistant => Message::assistant(message.content.clone()),
            })
            .collect();

        debug!(
            model = %self.model,
            history_len = chat_history.len(),
            "calling text generation"
        );

        tokio::time::timeout(GENERATION_TIMEOUT, agent.chat(utterance, chat_history))
            .await
            .map_err(|_| GenerateError::Remote("generation timed out".to_string()))?
            .map_err(|e| GenerateError::Remote(e.to_string()))
    }
}
