//! Parser for raw RFC 5322 messages as delivered over SMTP.

use mail_parser::MessageParser;

use crate::model::mail::{HeaderValue, Headers, ParsedMessage};
use crate::parser::{header, mime};

/// Parse a raw message into its [`ParsedMessage`] view.
///
/// Lenient: the header block ends at the first blank line or at the first
/// line that is not a header, and whatever follows is the body. Input with no
/// headers at all is a plain-text body. No I/O, no side effects.
pub fn parse_message(raw: &[u8]) -> ParsedMessage {
    let split = split_header_block(raw);
    let headers = parse_header_block(&raw[..split.header_end]);
    let body = &raw[split.body_start..];

    let mut bodies = if split.separated {
        parse_bodies(raw)
    } else if split.header_end == 0 {
        mime::ExtractedBodies::default()
    } else {
        // Re-insert the missing separator so the MIME parser sees the same
        // header/body boundary as the header parser.
        let mut repaired = Vec::with_capacity(raw.len() + 2);
        repaired.extend_from_slice(&raw[..split.header_end]);
        repaired.extend_from_slice(b"\r\n");
        repaired.extend_from_slice(body);
        parse_bodies(&repaired)
    };

    if bodies.text.is_none() && bodies.html.is_none() {
        bodies = single_part_fallback(&headers, body);
    }

    ParsedMessage {
        headers,
        body_text: bodies.text,
        body_html: bodies.html,
    }
}

fn parse_bodies(raw: &[u8]) -> mime::ExtractedBodies {
    MessageParser::default()
        .parse(raw)
        .map(|msg| mime::extract_bodies(&msg))
        .unwrap_or_default()
}

/// Body of a non-multipart message the MIME parser produced nothing for.
///
/// The declared `Content-Type` picks the slot (none means `text/plain`) and
/// its charset decodes the bytes; other types yield no body.
fn single_part_fallback(headers: &Headers, body: &[u8]) -> mime::ExtractedBodies {
    let mut found = mime::ExtractedBodies::default();
    if body.is_empty() {
        return found;
    }

    let content_type = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Type"))
        .and_then(|(_, value)| value.first())
        .unwrap_or("text/plain");
    let mut params = content_type.split(';');
    let mime_type = params.next().unwrap_or_default().trim().to_ascii_lowercase();
    let charset = params.find_map(|p| {
        let (key, value) = p.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    });

    let text = charset
        .and_then(|cs| header::decode_charset(cs, body))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    match mime_type.as_str() {
        "" | "text/plain" => found.text = Some(text),
        "text/html" => found.html = Some(text),
        _ => {}
    }
    found
}

/// Group header values by name (first-seen order) and decode each value.
fn parse_header_block(header_bytes: &[u8]) -> Headers {
    let text = header::decode_header_bytes(header_bytes);
    let fields = header::unfold_headers(&text);

    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (name, raw_value) in fields {
        let decoded = header::decode_encoded_words(&raw_value);
        match grouped.iter_mut().find(|(k, _)| *k == name) {
            Some((_, values)) => values.push(decoded),
            None => grouped.push((name, vec![decoded])),
        }
    }

    Headers::from_entries(
        grouped
            .into_iter()
            .filter_map(|(name, values)| HeaderValue::from_values(values).map(|v| (name, v)))
            .collect(),
    )
}

/// Where the header block ends and the body begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderSplit {
    /// End of the last header line (exclusive).
    header_end: usize,
    /// First byte of the body.
    body_start: usize,
    /// Whether a blank line (or end of input) closed the header block.
    separated: bool,
}

/// Scan header lines until a blank line or the first line that is neither a
/// `name:` field nor a continuation.
fn split_header_block(data: &[u8]) -> HeaderSplit {
    let mut pos = 0;
    while pos < data.len() {
        let next = data[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |i| pos + i + 1);
        let line = &data[pos..next];
        let content = line
            .strip_suffix(b"\n")
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .unwrap_or(line);

        if content.is_empty() {
            return HeaderSplit {
                header_end: pos,
                body_start: next,
                separated: true,
            };
        }
        if !is_header_line(content) {
            return HeaderSplit {
                header_end: pos,
                body_start: pos,
                separated: false,
            };
        }
        pos = next;
    }

    HeaderSplit {
        header_end: data.len(),
        body_start: data.len(),
        separated: true,
    }
}

/// A field (`name:` with printable, colon-free name) or a folded continuation.
fn is_header_line(line: &[u8]) -> bool {
    if line.starts_with(b" ") || line.starts_with(b"\t") {
        return true;
    }
    match line.iter().position(|&b| b == b':') {
        Some(colon) => line[..colon].iter().all(|&b| (0x21..=0x7e).contains(&b)),
        None => false,
    }
}
