use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use rig::client::Nothing;
use rig::completion::Chat;
use rig::message::Message as RigMessage;
use rig::prelude::CompletionClient;
use rig::providers::ollama;
use tracing::{debug, error, warn};

use super::{ChunkStream, Generator};
use crate::errors::AssistantError;
use crate::models::{GenerationRequest, MessageRole, WireMessage};

pub const DEFAULT_MODEL: &str = "llama3.2";

/// Splits the wire history into rig's shape: system messages become the
/// preamble, the last user message the prompt, everything before it history.
fn to_rig_turn(messages: &[WireMessage]) -> (String, Vec<RigMessage>, String) {
    let preamble = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt_index = messages.iter().rposition(|m| m.role == MessageRole::User);
    let prompt = prompt_index
        .map(|i| messages[i].content.clone())
        .unwrap_or_default();
    let earlier = prompt_index.map_or(messages, |i| &messages[..i]);

    let history = earlier
        .iter()
        .filter_map(|m| match m.role {
            MessageRole::User => Some(RigMessage::user(&m.content)),
            MessageRole::Assistant => Some(RigMessage::assistant(&m.content)),
            MessageRole::System => None, // carried by the preamble
        })
        .collect();

    (preamble, history, prompt)
}

/// Talks to a local Ollama model through rig. The model's reply arrives in
/// one piece and is delivered as a single chunk.
#[derive(Clone)]
pub struct OllamaGenerator {
    client: ollama::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str) -> Result<Self, AssistantError> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(base_url)
            .build()
            .map_err(|e| AssistantError::config("OLLAMA_API_BASE_URL", e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<ChunkStream, AssistantError> {
        if request.messages.iter().any(|m| !m.attachments.is_empty()) {
            warn!("Image attachments are not forwarded to Ollama");
        }

        let (preamble, history, prompt) = to_rig_turn(&request.messages);
        debug!("Sending turn to {} with {} history messages", self.model, history.len());

        let agent = self
            .client
            .agent(&self.model)
            .preamble(&preamble)
            .build();

        let content = agent
            .chat(prompt.as_str(), history)
            .await
            .map_err(|e| {
                error!("Ollama inference failed: {e}");
                let msg = e.to_string();
                if msg.contains("Connection refused") || msg.contains("connect") {
                    AssistantError::OllamaUnavailable { host: self.base_url.clone() }
                } else if msg.contains("model") {
                    AssistantError::ModelNotFound { model_name: self.model.clone() }
                } else {
                    AssistantError::InferenceError { message: msg }
                }
            })?;

        Ok(stream::iter(vec![Ok(content)]).boxed())
    }
}
