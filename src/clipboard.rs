use std::time::{Duration, Instant};

use tracing::error;

use crate::errors::AssistantError;

/// How long the "copied" state stays visible.
pub const COPY_FEEDBACK_WINDOW: Duration = Duration::from_secs(2);

pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), AssistantError>;
}

/// The operating-system clipboard.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), AssistantError> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| {
            error!("Failed to initialize clipboard: {e}");
            AssistantError::Clipboard(format!("Failed to initialize clipboard: {e}"))
        })?;
        clipboard.set_text(text).map_err(|e| {
            error!("Failed to set clipboard text: {e}");
            AssistantError::Clipboard(format!("Failed to set clipboard text: {e}"))
        })
    }
}

/// Copy button state: copies once, then reports `copying` until the feedback
/// window has passed. Clicks inside the window are ignored.
#[derive(Debug)]
pub struct CopyFeedback<C: ClipboardSink> {
    sink: C,
    content: String,
    copied_at: Option<Instant>,
}

impl<C: ClipboardSink> CopyFeedback<C> {
    pub fn new(sink: C) -> Self {
        Self { sink, content: String::new(), copied_at: None }
    }

    /// Returns `Ok(false)` when a previous copy is still inside its window.
    pub fn copy(&mut self, text: &str, now: Instant) -> Result<bool, AssistantError> {
        if self.is_copying(now) {
            return Ok(false);
        }
        self.sink.set_text(text)?;
        self.content = text.to_string();
        self.copied_at = Some(now);
        Ok(true)
    }

    /// Whether the "copied" state is showing; clears it once the window is over.
    pub fn is_copying(&mut self, now: Instant) -> bool {
        match self.copied_at {
            Some(at) if now.duration_since(at) < COPY_FEEDBACK_WINDOW => true,
            Some(_) => {
                self.copied_at = None;
                self.content.clear();
                false
            }
            None => false,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sink(&self) -> &C {
        &self.sink
    }
}
