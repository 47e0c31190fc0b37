//! MIME body extraction: first `text/plain` and first `text/html` leaf part.

use mail_parser::{Message, MessagePart, MimeHeaders, PartType};

/// Maximum depth for descending into attached `message/rfc822` parts.
const MAX_DEPTH: usize = 10;

/// Bodies found while walking a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBodies {
    pub text: Option<String>,
    pub html: Option<String>,
}

impl ExtractedBodies {
    fn is_complete(&self) -> bool {
        self.text.is_some() && self.html.is_some()
    }
}

/// Walk every leaf part in document order and keep the first non-empty
/// `text/plain` and `text/html` payloads.
///
/// `mail-parser` has already undone the transfer encoding and decoded each
/// text part with its declared charset (UTF-8 when absent, lossy UTF-8 when
/// the label is unknown), so the payloads arrive here as strings.
pub fn extract_bodies(message: &Message<'_>) -> ExtractedBodies {
    let mut found = ExtractedBodies::default();
    walk(message, 0, &mut found);
    found
}

fn walk(message: &Message<'_>, depth: usize, found: &mut ExtractedBodies) {
    for part in &message.parts {
        if found.is_complete() {
            return;
        }
        match &part.body {
            PartType::Text(text) => consider(part, text, found),
            PartType::Html(html) => consider(part, html, found),
            PartType::Message(nested) if depth < MAX_DEPTH => walk(nested, depth + 1, found),
            // Containers, binary leaves and too-deep nesting carry no body we show.
            _ => {}
        }
    }
}

fn consider(part: &MessagePart<'_>, payload: &str, found: &mut ExtractedBodies) {
    if payload.is_empty() {
        return;
    }
    let slot = match leaf_content_type(part).as_str() {
        "text/plain" => &mut found.text,
        "text/html" => &mut found.html,
        _ => return,
    };
    if slot.is_none() {
        *slot = Some(payload.to_string());
    }
}

/// Lowercased `type/subtype` of a part; a missing header means `text/plain`.
fn leaf_content_type(part: &MessagePart<'_>) -> String {
    match part.content_type() {
        Some(ct) => {
            let main = ct.ctype().to_ascii_lowercase();
            match ct.subtype() {
                Some(sub) => format!("{main}/{}", sub.to_ascii_lowercase()),
                None => main,
            }
        }
        None => "text/plain".to_string(),
    }
}
