use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use tracing::{debug, error};

use super::{ChunkStream, Generator};
use crate::errors::AssistantError;
use crate::models::GenerationRequest;

/// Header identifying which surface is calling the endpoint.
pub const REQUEST_VIA_HEADER: &str = "X-Request-Via";

/// Posts the message history to a chat endpoint and streams back its plain
/// text body.
#[derive(Clone)]
pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    request_via: String,
}

impl HttpGenerator {
    pub fn new(endpoint: &str, request_via: &str) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, request_via)
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str, request_via: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            request_via: request_via.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<ChunkStream, AssistantError> {
        debug!(
            "Posting {} messages to {}",
            request.messages.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(REQUEST_VIA_HEADER, &self.request_via)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Generation request to {} failed: {e}", self.endpoint);
                AssistantError::EndpointUnavailable { url: self.endpoint.clone(), source: e }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Generation endpoint returned {status}: {body}");
            return Err(AssistantError::GenerationFailed { status: status.as_u16(), body });
        }

        let bytes = response.bytes_stream().boxed();
        let chunks = stream::unfold(
            (bytes, Utf8Decoder::default(), false),
            |(mut bytes, mut decoder, done)| async move {
                if done {
                    return None;
                }
                loop {
                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            let text = decoder.push(&chunk);
                            if !text.is_empty() {
                                return Some((Ok(text), (bytes, decoder, false)));
                            }
                        }
                        Some(Err(e)) => {
                            error!("Response stream interrupted: {e}");
                            let err = AssistantError::StreamInterrupted { message: e.to_string() };
                            return Some((Err(err), (bytes, decoder, true)));
                        }
                        None => {
                            let rest = decoder.finish();
                            if rest.is_empty() {
                                return None;
                            }
                            return Some((Ok(rest), (bytes, decoder, true)));
                        }
                    }
                }
            },
        );

        Ok(chunks.boxed())
    }
}

/// Decodes UTF-8 that may be split across network chunks. An incomplete
/// trailing sequence is held back until the next chunk; invalid bytes become
/// U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    /// Flushes whatever is left; a truncated sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
