//! OpenAiCompatibleGenerator -- [`ReplyGenerator`] over any OpenAI-compatible
//! `/chat/completions` endpoint (Groq, OpenAI, local proxies).
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building the `Authorization` header. It never appears in Debug
//! output or tracing logs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use chatline_core::generation::generator::ReplyGenerator;
use chatline_types::chat::Sender;
use chatline_types::config::GeneratorConfig;
use chatline_types::generation::{GenerationError, HistoryTurn};

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Reply generator for OpenAI-compatible chat completion APIs.
///
/// Does NOT derive Debug so the API key can never be printed by accident.
pub struct OpenAiCompatibleGenerator {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
    system_prompt: String,
    timeout_secs: u64,
}

impl OpenAiCompatibleGenerator {
    pub fn new(config: &GeneratorConfig, api_key: SecretString) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, history: &'a [HistoryTurn]) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !self.system_prompt.is_empty() {
            messages.push(CompletionMessage {
                role: "system",
                content: &self.system_prompt,
            });
        }
        messages.extend(history.iter().map(|turn| CompletionMessage {
            role: match turn.sender {
                Sender::User => "user",
                Sender::Bot => "assistant",
            },
            content: &turn.content,
        }));

        CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        }
    }
}

impl ReplyGenerator for OpenAiCompatibleGenerator {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn generate(&self, history: &[HistoryTurn]) -> Result<String, GenerationError> {
        let body = self.build_request(history);
        debug!(model = %self.model, turns = history.len(), "Requesting completion");

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::Unavailable(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("failed to parse response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::Malformed("response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        let reply = content.trim();
        if reply.is_empty() {
            return Err(GenerationError::EmptyReply);
        }
        Ok(reply.to_string())
    }
}
