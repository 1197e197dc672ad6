use thiserror::Error;

/// Fallback text shown when a generation failure carries no message of its own.
pub const GENERIC_GENERATION_ERROR: &str = "An error occurred while generating UI";

/// Top-level assistant error.
/// Every variant renders to a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AssistantError {
    // ── Generation errors ────────────────────────────────────────────────────
    #[error("Generation endpoint unavailable at {url}")]
    EndpointUnavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Generation endpoint returned {status}: {body}")]
    GenerationFailed { status: u16, body: String },

    #[error("Response stream interrupted: {message}")]
    StreamInterrupted { message: String },

    #[error("Ollama service unavailable at {host}")]
    OllamaUnavailable { host: String },

    #[error("Model '{model_name}' not found in Ollama")]
    ModelNotFound { model_name: String },

    #[error("Inference error: {message}")]
    InferenceError { message: String },

    // ── Session errors ───────────────────────────────────────────────────────
    #[error("Message '{id}' not found")]
    MessageNotFound { id: String },

    #[error("Message '{message_id}' has no variant {variant_index}")]
    VariantNotFound { message_id: String, variant_index: usize },

    // ── Host errors ──────────────────────────────────────────────────────────
    #[error("Host document error: {message}")]
    Host {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse component catalog {path}: {source}")]
    CatalogParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Capability errors ────────────────────────────────────────────────────
    #[error("Failed to read attachment {path}")]
    AttachmentRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Speech error: {0}")]
    Speech(String),

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Invalid configuration for {key}: {message}")]
    Config { key: String, message: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AssistantError {
    pub fn host(message: impl Into<String>, source: std::io::Error) -> Self {
        AssistantError::Host { message: message.into(), source }
    }

    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        AssistantError::Config { key: key.into(), message: message.into() }
    }

    /// Failures of the outbound generation request, as opposed to local faults.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            AssistantError::EndpointUnavailable { .. }
                | AssistantError::GenerationFailed { .. }
                | AssistantError::StreamInterrupted { .. }
                | AssistantError::OllamaUnavailable { .. }
                | AssistantError::ModelNotFound { .. }
                | AssistantError::InferenceError { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AssistantError::MessageNotFound { .. } | AssistantError::VariantNotFound { .. }
        )
    }

    /// Inline error text for the transcript. Never empty.
    pub fn user_message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            GENERIC_GENERATION_ERROR.to_string()
        } else {
            text
        }
    }
}
