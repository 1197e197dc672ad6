use futures_util::StreamExt;
use tracing::{debug, error, info};

use crate::agent::Generator;
use crate::errors::AssistantError;
use crate::host::HostBridge;
use crate::models::{GenerationRequest, Message};
use crate::preamble;
use crate::session::AssistantSession;

/// How a submitted turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank text or a request already in flight; nothing was sent.
    Ignored,
    /// The stream ended. `previewed` is set when the first variant was pushed
    /// to the host preview.
    Completed { previewed: bool },
    /// The request failed; the session holds the error text.
    Failed { message: String },
}

/// One assistant panel: the session store wired to a generator and a host.
pub struct AssistantService<H: HostBridge> {
    session: AssistantSession,
    generator: Box<dyn Generator>,
    host: H,
}

impl<H: HostBridge> AssistantService<H> {
    pub fn new(generator: Box<dyn Generator>, host: H) -> Self {
        let session = AssistantSession::new(Self::seed_from(&host));
        Self { session, generator, host }
    }

    fn seed_from(host: &H) -> Vec<Message> {
        preamble::seed(&host.catalog(), host.current_code().as_deref())
    }

    pub fn session(&self) -> &AssistantSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut AssistantSession {
        &mut self.session
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    pub async fn submit(&mut self, text: &str, image: Option<String>) -> TurnOutcome {
        self.submit_with(text, image, |_| {}).await
    }

    /// Submits and streams the reply, calling `on_update` after every change.
    pub async fn submit_with(
        &mut self,
        text: &str,
        image: Option<String>,
        on_update: impl FnMut(&AssistantSession),
    ) -> TurnOutcome {
        match self.session.submit(text, image) {
            Some(request) => self.run_turn(request, on_update).await,
            None => TurnOutcome::Ignored,
        }
    }

    /// Submits the session's own input and pending image.
    pub async fn submit_input_with(
        &mut self,
        on_update: impl FnMut(&AssistantSession),
    ) -> TurnOutcome {
        match self.session.submit_input() {
            Some(request) => self.run_turn(request, on_update).await,
            None => TurnOutcome::Ignored,
        }
    }

    async fn run_turn(
        &mut self,
        request: GenerationRequest,
        mut on_update: impl FnMut(&AssistantSession),
    ) -> TurnOutcome {
        on_update(&self.session);

        let mut chunks = match self.generator.generate(request).await {
            Ok(chunks) => chunks,
            Err(e) => return self.fail_turn(e, &mut on_update),
        };

        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    self.session.append_chunk(&chunk);
                    on_update(&self.session);
                }
                Err(e) => return self.fail_turn(e, &mut on_update),
            }
        }

        let preview = self.session.finish();
        let previewed = match preview {
            Some(code) => match self.host.preview_code(&code) {
                Ok(()) => true,
                Err(e) => {
                    error!("Failed to preview first variant: {e}");
                    false
                }
            },
            None => false,
        };
        debug!("Turn completed via {} (previewed: {previewed})", self.generator.name());
        on_update(&self.session);
        TurnOutcome::Completed { previewed }
    }

    fn fail_turn(
        &mut self,
        err: AssistantError,
        on_update: &mut impl FnMut(&AssistantSession),
    ) -> TurnOutcome {
        let message = err.user_message();
        self.session.fail(message.clone());
        on_update(&self.session);
        TurnOutcome::Failed { message }
    }

    /// Mirrors a variant into the host preview and marks it active.
    pub fn preview_variant(
        &mut self,
        message_id: &str,
        variant_index: usize,
    ) -> Result<(), AssistantError> {
        let code = self.session.variant(message_id, variant_index)?;
        self.host.preview_code(&code)?;
        self.session.preview_variant(message_id, variant_index)?;
        Ok(())
    }

    /// Commits a variant as the new document content. The preview pointer is
    /// cleared once the document write succeeds.
    pub fn apply_variant(
        &mut self,
        message_id: &str,
        variant_index: usize,
    ) -> Result<(), AssistantError> {
        let code = self.session.variant(message_id, variant_index)?;
        self.host.update_code(&code)?;
        self.session.apply_variant(message_id, variant_index)?;
        info!("Applied variant {} of message {message_id}", variant_index + 1);
        Ok(())
    }

    pub fn clear_preview(&mut self) {
        self.session.clear_preview();
    }

    /// Starts over from a seed built from the host's current document.
    pub fn reset(&mut self) {
        let seed = Self::seed_from(&self.host);
        self.session.reset(seed);
    }
}
