use std::path::PathBuf;

use crate::agent::ollama::DEFAULT_MODEL;
use crate::errors::AssistantError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:15387/api/chat";
pub const DEFAULT_REQUEST_VIA: &str = "playroom";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_DOCUMENT: &str = "playroom.jsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Http,
    Ollama,
}

impl TryFrom<&str> for Backend {
    type Error = AssistantError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Backend::Http),
            "ollama" => Ok(Backend::Ollama),
            other => Err(AssistantError::config(
                "ASSISTANT_BACKEND",
                format!("expected 'http' or 'ollama', got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: Backend,
    pub endpoint: String,
    pub request_via: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub document: PathBuf,
    pub catalog: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AssistantError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AssistantError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("ASSISTANT_BACKEND") {
            Some(value) => Backend::try_from(value.as_str())?,
            None => Backend::Http,
        };

        let endpoint = get("ASSISTANT_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(AssistantError::config(
                "ASSISTANT_ENDPOINT",
                format!("'{endpoint}' is not an http(s) URL"),
            ));
        }

        Ok(Self {
            backend,
            endpoint,
            request_via: get("ASSISTANT_REQUEST_VIA")
                .unwrap_or_else(|| DEFAULT_REQUEST_VIA.to_string()),
            ollama_base_url: get("OLLAMA_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            document: get("PLAYROOM_DOCUMENT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENT)),
            catalog: get("PLAYROOM_CATALOG").map(PathBuf::from),
        })
    }
}
