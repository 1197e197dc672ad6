use std::fmt::Write as _;

use crate::models::MessageRole;
use crate::session::{AssistantSession, DisplayMessage};

fn label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    }
}

fn variants_block(message: &DisplayMessage) -> String {
    let mut out = String::new();
    for (i, variant) in message.variants.iter().enumerate() {
        let marker = if variant.active { "*" } else { " " };
        let _ = writeln!(out, "  [{}]{marker} {}", i + 1, variant.code.replace('\n', "\n       "));
    }
    if !message.variants.is_empty() {
        let _ = writeln!(out, "  (message id {})", message.id);
    }
    out
}

pub fn format_message(message: &DisplayMessage) -> String {
    let mut out = format!("{}: {}\n", label(message.role), message.text);
    if !message.attachments.is_empty() {
        let _ = writeln!(out, "  ({} image attached)", message.attachments.len());
    }
    out.push_str(&variants_block(message));
    out
}

/// Prints a reply while it streams: prose appears as it grows, structured
/// replies only once complete.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    message_id: Option<String>,
    printed: usize,
}

impl StreamPrinter {
    /// Text to print for this update, if any.
    pub fn update(&mut self, session: &AssistantSession) -> Option<String> {
        if !session.is_loading() {
            return None;
        }
        let last = session.display_messages().pop()?;
        if last.role != MessageRole::Assistant {
            return None;
        }

        let mut out = String::new();
        if self.message_id.as_deref() != Some(last.id.as_str()) {
            self.message_id = Some(last.id.clone());
            self.printed = 0;
            out.push_str("assistant: ");
        }
        let delta = last.text.get(self.printed..).unwrap_or_default();
        out.push_str(delta);
        self.printed = last.text.len();
        (!out.is_empty()).then_some(out)
    }

    /// Whatever is left to show once the turn has ended.
    pub fn finish(&mut self, session: &AssistantSession) -> String {
        let mut out = String::new();
        if let Some(last) = session.display_messages().pop() {
            if last.role == MessageRole::Assistant {
                if self.message_id.as_deref() == Some(last.id.as_str()) {
                    out.push_str(last.text.get(self.printed..).unwrap_or_default());
                    out.push('\n');
                    out.push_str(&variants_block(&last));
                } else {
                    out.push_str(&format_message(&last));
                }
            }
        }
        if let Some(error) = session.error() {
            let _ = writeln!(out, "error: {error}");
        }
        self.message_id = None;
        self.printed = 0;
        out
    }
}
