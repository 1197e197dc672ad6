pub mod http;
pub mod ollama;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::errors::AssistantError;
use crate::models::GenerationRequest;

pub use http::HttpGenerator;
pub use ollama::OllamaGenerator;

/// Text chunks of one reply, in arrival order.
pub type ChunkStream = BoxStream<'static, Result<String, AssistantError>>;

/// The external text-generation collaborator.
///
/// One call per submitted turn. The returned stream ends when the reply is
/// complete; an `Err` item aborts the turn.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: GenerationRequest) -> Result<ChunkStream, AssistantError>;
}
