//! RFC 5322 header parsing: folding and encoded-words (RFC 2047).

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::debug;

/// Base64 engine for encoded-words: senders are sloppy about padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Plain text around the encoded-words is kept as is; whitespace that only
/// separates two encoded-words is dropped (RFC 2047 §6.2). If any encoded-word
/// cannot be decoded (unknown charset, broken base64) the whole value is
/// returned unchanged.
pub fn decode_encoded_words(input: &str) -> String {
    match try_decode_encoded_words(input) {
        Some(decoded) => decoded,
        None => {
            debug!(value = input, "Undecodable encoded-word, keeping raw header");
            input.to_string()
        }
    }
}

fn try_decode_encoded_words(input: &str) -> Option<String> {
    if !input.contains("=?") {
        return Some(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        match try_decode_one_word(after_start) {
            Word::Decoded(decoded) => {
                result.push_str(&decoded.text);
                remaining = &after_start[decoded.consumed..];
                last_was_encoded = true;
            }
            Word::Literal => {
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
            Word::Failed => return None,
        }
    }

    result.push_str(remaining);
    Some(result)
}

enum Word {
    /// A well-formed encoded-word and its text.
    Decoded(DecodedWord),
    /// `=?` that does not start an encoded-word; kept as plain text.
    Literal,
    /// A well-formed encoded-word whose payload or charset is unusable.
    Failed,
}

struct DecodedWord {
    text: String,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

fn try_decode_one_word(s: &str) -> Word {
    // Format: charset?encoding?encoded_text?=
    let Some(first_q) = s.find('?') else {
        return Word::Literal;
    };
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let Some(second_q) = rest.find('?') else {
        return Word::Literal;
    };
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let Some(end) = rest2.find("?=") else {
        return Word::Literal;
    };
    let encoded_text = &rest2[..end];

    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return Word::Literal;
    }

    let bytes = match encoding {
        "B" | "b" => match LENIENT_BASE64.decode(encoded_text.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return Word::Failed,
        },
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => return Word::Literal,
    };

    match decode_charset(charset, &bytes) {
        Some(text) => Word::Decoded(DecodedWord {
            text,
            consumed: first_q + 1 + second_q + 1 + end + 2,
        }),
        None => Word::Failed,
    }
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    result.push(byte);
                    i += 3;
                } else {
                    result.push(b'=');
                    i += 1;
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset, replacing malformed sequences.
///
/// Returns `None` when the charset label is unknown. An RFC 2231 language
/// suffix (`utf-8*ja`) is ignored.
pub(crate) fn decode_charset(charset: &str, bytes: &[u8]) -> Option<String> {
    let label = charset.split('*').next().unwrap_or(charset).trim();
    match label.to_lowercase().as_str() {
        "utf-8" | "utf8" => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => encoding_rs::Encoding::for_label(label.as_bytes()).map(|encoding| {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }),
    }
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub(crate) fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns `(name, raw_value)` pairs in source order, names exactly as written.
pub(crate) fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                let continuation = line.trim();
                if !continuation.is_empty() {
                    if !last.1.is_empty() {
                        last.1.push(' ');
                    }
                    last.1.push_str(continuation);
                }
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim();
            if name.is_empty() {
                continue;
            }
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name.to_string(), value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}
