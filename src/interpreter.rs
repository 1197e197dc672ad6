//! Turns raw reply text into something safe to show.
//!
//! A reply is either prose, shown as it streams, or a JSON object of the form
//! `{ "1": "<markup>", ..., "message": "<prose>" }`. The end of a JSON document
//! is unknown until the stream finishes, so any reply starting with `{` is held
//! back while streaming and parsed once at the end.

use serde_json::Value;

const MESSAGE_KEY: &str = "message";

/// How far the raw content can be interpreted before the stream ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Nothing received yet.
    Pending,
    /// Starts with `{`; may become a structured reply.
    PossiblyStructured,
    /// Plain text, safe to display incrementally.
    Prose,
}

pub fn classify(content: &str) -> ContentKind {
    if content.is_empty() {
        ContentKind::Pending
    } else if content.starts_with('{') {
        ContentKind::PossiblyStructured
    } else {
        ContentKind::Prose
    }
}

/// Whether a reply still streaming must be kept out of the displayed list.
pub fn hidden_while_streaming(content: &str) -> bool {
    !matches!(classify(content), ContentKind::Prose)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReply {
    Prose { message: String },
    Structured { message: String, variants: Vec<String> },
}

impl ParsedReply {
    pub fn message(&self) -> &str {
        match self {
            ParsedReply::Prose { message } | ParsedReply::Structured { message, .. } => message,
        }
    }

    pub fn variants(&self) -> &[String] {
        match self {
            ParsedReply::Prose { .. } => &[],
            ParsedReply::Structured { variants, .. } => variants,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedReply::Structured { .. })
    }
}

/// Decodes a complete structured reply. `None` means "not structured".
///
/// Every string-valued key other than `message` is a variant. Integer keys
/// come first in numeric order, the remaining keys follow in document order.
/// Non-string values are skipped.
pub fn parse_structured(content: &str) -> Option<ParsedReply> {
    let Value::Object(map) = serde_json::from_str::<Value>(content).ok()? else {
        return None;
    };

    let mut message = String::new();
    let mut numbered: Vec<(u64, String)> = Vec::new();
    let mut named: Vec<String> = Vec::new();
    for (key, value) in map {
        match (key.as_str(), value) {
            (MESSAGE_KEY, Value::String(s)) => message = s,
            (MESSAGE_KEY, _) => {}
            (k, Value::String(s)) => match index_key(k) {
                Some(n) => numbered.push((n, s)),
                None => named.push(s),
            },
            _ => {}
        }
    }
    numbered.sort_by_key(|(n, _)| *n);

    let variants = numbered.into_iter().map(|(_, s)| s).chain(named).collect();
    Some(ParsedReply::Structured { message, variants })
}

/// Canonical decimal integers only, so `"01"` and `"+1"` keep document order.
fn index_key(key: &str) -> Option<u64> {
    key.parse::<u64>().ok().filter(|n| n.to_string() == key)
}

/// Structured parse with the prose fallback applied.
pub fn interpret(content: &str) -> ParsedReply {
    match classify(content) {
        ContentKind::PossiblyStructured => parse_structured(content)
            .unwrap_or_else(|| ParsedReply::Prose { message: content.to_string() }),
        ContentKind::Pending | ContentKind::Prose => {
            ParsedReply::Prose { message: content.to_string() }
        }
    }
}

/// Parser state attached to each message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyState {
    /// Chunks are still arriving; no parse has been attempted.
    Accumulating,
    /// The stream ended and the content was interpreted exactly once.
    Complete(ParsedReply),
}

impl ReplyState {
    pub fn settled(content: &str) -> Self {
        ReplyState::Complete(interpret(content))
    }

    /// Ends accumulation. Calling it again keeps the first result.
    pub fn complete(&mut self, content: &str) -> &ParsedReply {
        if let ReplyState::Accumulating = self {
            *self = ReplyState::settled(content);
        }
        match self {
            ReplyState::Complete(parsed) => parsed,
            ReplyState::Accumulating => unreachable!("reply state completed above"),
        }
    }

    pub fn parsed(&self) -> Option<&ParsedReply> {
        match self {
            ReplyState::Accumulating => None,
            ReplyState::Complete(parsed) => Some(parsed),
        }
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self, ReplyState::Accumulating)
    }
}

/// Text to show for a message: the structured `message` when present,
/// otherwise the raw content.
pub fn display_text<'a>(content: &'a str, parsed: Option<&'a ParsedReply>) -> &'a str {
    match parsed {
        Some(ParsedReply::Structured { message, .. }) if !message.is_empty() => message,
        _ => content,
    }
}
