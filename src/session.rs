//! Conversation state for one assistant panel.
//!
//! The store is plain data plus intents. It never performs I/O: `submit`
//! hands back the request to send, streamed text is fed in through
//! `append_chunk`/`finish`/`fail`, and preview/apply return the markup the
//! caller forwards to the host bridge.

use tracing::{debug, warn};

use crate::errors::{AssistantError, GENERIC_GENERATION_ERROR};
use crate::interpreter::{display_text, hidden_while_streaming};
use crate::models::{ActiveSuggestion, Attachment, GenerationRequest, Message, MessageRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    /// Request sent, nothing received yet.
    Submitted,
    Streaming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayVariant {
    pub code: String,
    pub active: bool,
}

/// A transcript entry as the user sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub variants: Vec<DisplayVariant>,
}

#[derive(Debug, Clone)]
struct InFlight {
    prompt: String,
    reply_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssistantSession {
    messages: Vec<Message>,
    input: String,
    pending_image: Option<String>,
    status: Status,
    error: Option<String>,
    active: Option<ActiveSuggestion>,
    in_flight: Option<InFlight>,
}

impl AssistantSession {
    pub fn new(seed: Vec<Message>) -> Self {
        Self {
            messages: seed,
            input: String::new(),
            pending_image: None,
            status: Status::Ready,
            error: None,
            active: None,
            in_flight: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn pending_image(&self) -> Option<&str> {
        self.pending_image.as_deref()
    }

    /// Replaces the pending image; `None` clears it.
    pub fn attach_image(&mut self, data_url: Option<String>) {
        self.pending_image = data_url;
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn active_suggestion(&self) -> Option<&ActiveSuggestion> {
        self.active.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.error.is_none() && self.status != Status::Ready
    }

    pub fn can_submit(&self) -> bool {
        !self.is_loading() && self.in_flight.is_none() && !self.input.trim().is_empty()
    }

    /// Reset is only offered once the user has something beyond the welcome.
    pub fn can_reset(&self) -> bool {
        self.display_messages().len() > 1
    }

    /// Appends a user message and returns the request to send, or `None` when
    /// a request is already in flight or the text is blank.
    pub fn submit(&mut self, text: &str, image: Option<String>) -> Option<GenerationRequest> {
        if self.in_flight.is_some() || self.is_loading() {
            debug!("Ignoring submit while a generation request is in flight");
            return None;
        }
        if text.trim().is_empty() {
            return None;
        }

        self.error = None;
        self.active = None;

        let attachments = image.map(Attachment::image).into_iter().collect();
        self.messages
            .push(Message::new(MessageRole::User, text).with_attachments(attachments));

        self.input.clear();
        self.pending_image = None;
        self.status = Status::Submitted;
        self.in_flight = Some(InFlight { prompt: text.to_string(), reply_id: None });

        Some(GenerationRequest::from_history(&self.messages))
    }

    /// `submit` with the stored input and pending image.
    pub fn submit_input(&mut self) -> Option<GenerationRequest> {
        let text = self.input.clone();
        let image = self.pending_image.clone();
        self.submit(&text, image)
    }

    pub fn append_chunk(&mut self, chunk: &str) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            debug!("Dropping chunk with no request in flight");
            return;
        };

        let reply_id = match &in_flight.reply_id {
            Some(id) => id.clone(),
            None => {
                let reply = Message::streaming_reply();
                let id = reply.id.clone();
                self.messages.push(reply);
                in_flight.reply_id = Some(id.clone());
                id
            }
        };

        if let Some(reply) = self.messages.iter_mut().find(|m| m.id == reply_id) {
            reply.content.push_str(chunk);
        }
        self.status = Status::Streaming;
    }

    /// Ends the stream. Returns the markup to preview when the reply carries
    /// at least one variant; that variant becomes the active suggestion.
    pub fn finish(&mut self) -> Option<String> {
        let in_flight = self.in_flight.take()?;
        self.status = Status::Ready;

        let reply_id = in_flight.reply_id?;
        let reply = self.messages.iter_mut().find(|m| m.id == reply_id)?;
        let parsed = reply.reply.complete(&reply.content);
        debug!(
            "Reply {reply_id} complete: structured={}, variants={}",
            parsed.is_structured(),
            parsed.variants().len()
        );

        let first = parsed.variants().first()?.clone();
        self.active = Some(ActiveSuggestion { message_id: reply_id, variant_index: 0 });
        Some(first)
    }

    /// Records a failed request. The partial reply stays in the transcript and
    /// the submitted text returns to an empty input.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("Generation failed: {message}");

        if let Some(in_flight) = self.in_flight.take() {
            if let Some(reply_id) = in_flight.reply_id {
                if let Some(reply) = self.messages.iter_mut().find(|m| m.id == reply_id) {
                    reply.reply.complete(&reply.content);
                }
            }
            if self.input.trim().is_empty() {
                self.input = in_flight.prompt;
            }
        }

        self.status = Status::Ready;
        self.error = Some(if message.trim().is_empty() {
            GENERIC_GENERATION_ERROR.to_string()
        } else {
            message
        });
    }

    /// Returns to the given seed and drops every transient.
    pub fn reset(&mut self, seed: Vec<Message>) {
        self.messages = seed;
        self.pending_image = None;
        self.active = None;
        self.error = None;
        self.in_flight = None;
        self.status = Status::Ready;
    }

    /// Markup of one variant, without touching the preview pointer.
    pub fn variant(&self, message_id: &str, variant_index: usize) -> Result<String, AssistantError> {
        let message = self
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| AssistantError::MessageNotFound { id: message_id.to_string() })?;
        message
            .variant(variant_index)
            .map(str::to_string)
            .ok_or_else(|| AssistantError::VariantNotFound {
                message_id: message_id.to_string(),
                variant_index,
            })
    }

    /// Marks the variant as previewed and returns its markup.
    pub fn preview_variant(
        &mut self,
        message_id: &str,
        variant_index: usize,
    ) -> Result<String, AssistantError> {
        let code = self.variant(message_id, variant_index)?;
        self.active = Some(ActiveSuggestion { message_id: message_id.to_string(), variant_index });
        Ok(code)
    }

    /// Returns the variant's markup for committing and clears the preview pointer.
    pub fn apply_variant(
        &mut self,
        message_id: &str,
        variant_index: usize,
    ) -> Result<String, AssistantError> {
        let code = self.variant(message_id, variant_index)?;
        self.active = None;
        Ok(code)
    }

    pub fn clear_preview(&mut self) {
        self.active = None;
    }

    /// Most recent assistant message that has variants.
    pub fn latest_with_variants(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && m.variant_count() > 0)
    }

    /// The transcript without system messages and without a reply that is
    /// still too incomplete to show.
    pub fn display_messages(&self) -> Vec<DisplayMessage> {
        let loading = self.is_loading();
        let last = self.messages.len().saturating_sub(1);

        self.messages
            .iter()
            .enumerate()
            .filter(|(index, m)| {
                m.role != MessageRole::System
                    && !(loading && *index == last && hidden_while_streaming(&m.content))
            })
            .map(|(_, m)| self.to_display(m))
            .collect()
    }

    fn to_display(&self, m: &Message) -> DisplayMessage {
        let (text, variants) = match m.role {
            MessageRole::Assistant => {
                let parsed = m.parsed();
                let variants = parsed
                    .map(|p| p.variants())
                    .unwrap_or_default()
                    .iter()
                    .enumerate()
                    .map(|(index, code)| DisplayVariant {
                        code: code.clone(),
                        active: self.active.as_ref().is_some_and(|a| {
                            a.message_id == m.id && a.variant_index == index
                        }),
                    })
                    .collect();
                (display_text(&m.content, parsed).to_string(), variants)
            }
            _ => (m.content.clone(), Vec::new()),
        };

        DisplayMessage {
            id: m.id.clone(),
            role: m.role,
            text,
            attachments: m.attachments.clone(),
            variants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Catalog;
    use crate::preamble;
    use pretty_assertions::assert_eq;

    const STRUCTURED: &str = r#"{"1":"<a/>","2":"<b/>","message":"ok"}"#;

    fn session() -> AssistantSession {
        AssistantSession::new(preamble::seed(&Catalog::default(), Some("<Box />")))
    }

    fn reply(session: &mut AssistantSession, text: &str, chunks: &[&str]) -> Option<String> {
        session.submit(text, None).expect("request");
        for chunk in chunks {
            session.append_chunk(chunk);
        }
        session.finish()
    }

    #[test]
    fn display_hides_system_messages_only() {
        let mut s = session();
        reply(&mut s, "hello", &["hi there"]);
        let shown: Vec<_> = s.display_messages().into_iter().map(|m| m.role).collect();
        assert_eq!(
            shown,
            [MessageRole::Assistant, MessageRole::User, MessageRole::Assistant]
        );
        let visible = s.messages().iter().filter(|m| m.role != MessageRole::System).count();
        assert_eq!(visible, shown.len());
    }

    #[test]
    fn blank_submission_is_ignored() {
        let mut s = session();
        let before = s.messages().len();
        assert!(s.submit("   \n", None).is_none());
        assert_eq!(s.messages().len(), before);
        assert_eq!(s.status(), Status::Ready);
    }

    #[test]
    fn second_submit_while_in_flight_is_rejected() {
        let mut s = session();
        assert!(s.submit("one", None).is_some());
        let count = s.messages().len();
        assert!(s.submit("two", None).is_none());
        assert_eq!(s.messages().len(), count);
    }

    #[test]
    fn request_carries_full_history_and_image() {
        let mut s = session();
        s.set_input("make a card");
        s.attach_image(Some("data:image/png;base64,AA".into()));
        let request = s.submit_input().expect("request");

        assert_eq!(request.messages.len(), 4);
        let prompt = request.prompt().expect("prompt");
        assert_eq!(prompt.content, "make a card");
        assert_eq!(prompt.attachments, vec![Attachment::image("data:image/png;base64,AA")]);
        assert_eq!(s.input(), "");
        assert_eq!(s.pending_image(), None);
    }

    #[test]
    fn structured_reply_is_hidden_until_stream_ends() {
        let mut s = session();
        s.submit("card", None);
        assert_eq!(s.display_messages().len(), 2);

        s.append_chunk(r#"{"1":"<a/>","#);
        assert!(s.is_loading());
        assert_eq!(s.display_messages().len(), 2);

        s.append_chunk(r#""message":"ok"}"#);
        let preview = s.finish();
        assert_eq!(preview.as_deref(), Some("<a/>"));

        let shown = s.display_messages();
        assert_eq!(shown.len(), 3);
        let last = shown.last().unwrap();
        assert_eq!(last.text, "ok");
        assert_eq!(
            last.variants,
            vec![DisplayVariant { code: "<a/>".into(), active: true }]
        );
    }

    #[test]
    fn prose_reply_streams_incrementally() {
        let mut s = session();
        s.submit("hi", None);
        s.append_chunk("Sure, I can {help}");
        let shown = s.display_messages();
        assert_eq!(shown.last().unwrap().text, "Sure, I can {help}");
        assert_eq!(s.finish(), None);
        assert!(s.active_suggestion().is_none());
    }

    #[test]
    fn finish_selects_first_variant() {
        let mut s = session();
        reply(&mut s, "card", &[STRUCTURED]);
        let reply_id = s.messages().last().unwrap().id.clone();
        assert_eq!(
            s.active_suggestion(),
            Some(&ActiveSuggestion { message_id: reply_id, variant_index: 0 })
        );
    }

    #[test]
    fn malformed_reply_shows_raw_text_after_stream() {
        let mut s = session();
        let raw = r#"{"1":"<a/>","message":"#;
        assert_eq!(reply(&mut s, "card", &[raw]), None);
        let last = s.display_messages().pop().unwrap();
        assert_eq!(last.text, raw);
        assert!(last.variants.is_empty());
        assert!(s.error().is_none());
    }

    #[test]
    fn preview_then_apply() {
        let mut s = session();
        reply(&mut s, "card", &[STRUCTURED]);
        let id = s.messages().last().unwrap().id.clone();

        assert_eq!(s.preview_variant(&id, 1).unwrap(), "<b/>");
        assert_eq!(
            s.active_suggestion(),
            Some(&ActiveSuggestion { message_id: id.clone(), variant_index: 1 })
        );

        assert_eq!(s.apply_variant(&id, 0).unwrap(), "<a/>");
        assert!(s.active_suggestion().is_none());
    }

    #[test]
    fn preview_rejects_dangling_pointers() {
        let mut s = session();
        reply(&mut s, "card", &[STRUCTURED]);
        let id = s.messages().last().unwrap().id.clone();

        assert!(s.preview_variant("missing", 0).unwrap_err().is_not_found());
        assert!(matches!(
            s.preview_variant(&id, 2),
            Err(AssistantError::VariantNotFound { variant_index: 2, .. })
        ));
        assert_eq!(s.active_suggestion().map(|a| a.variant_index), Some(0));
    }

    #[test]
    fn reset_restores_seed() {
        let mut s = session();
        reply(&mut s, "card", &[STRUCTURED]);
        s.attach_image(Some("data:image/png;base64,AA".into()));
        assert!(s.can_reset());

        let seed = preamble::seed(&Catalog::default(), Some("<a/>"));
        let seed_len = seed.len();
        s.reset(seed);

        assert_eq!(s.messages().len(), seed_len);
        assert_eq!(s.pending_image(), None);
        assert!(s.active_suggestion().is_none());
        assert!(!s.can_reset());
    }

    #[test]
    fn failure_keeps_partial_reply_and_restores_input() {
        let mut s = session();
        s.set_input("make it blue");
        s.submit_input();
        s.append_chunk("Working on");
        s.fail("connection reset");

        assert_eq!(s.error(), Some("connection reset"));
        assert!(!s.is_loading());
        assert_eq!(s.input(), "make it blue");
        assert_eq!(s.display_messages().last().unwrap().text, "Working on");

        assert!(s.submit_input().is_some());
        assert!(s.error().is_none());
    }

    #[test]
    fn empty_failure_message_gets_generic_text() {
        let mut s = session();
        s.submit("x", None);
        s.fail("");
        assert_eq!(s.error(), Some(GENERIC_GENERATION_ERROR));
    }

    #[test]
    fn chunks_after_reset_are_dropped() {
        let mut s = session();
        s.submit("x", None);
        let seed = preamble::seed(&Catalog::default(), None);
        let len = seed.len();
        s.reset(seed);
        s.append_chunk("late");
        assert_eq!(s.messages().len(), len);
        assert_eq!(s.finish(), None);
    }
}
