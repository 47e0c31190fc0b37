//! Captured message records and their parsed view.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::Serializer;
use serde::Serialize;
use uuid::Uuid;

/// Opaque identifier of a captured message.
///
/// Backed by a random (v4) UUID so ids never collide in practice, even
/// across concurrent ingestion threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Serialize for MessageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Decoded value(s) of one header name.
///
/// Serialized untagged: a single occurrence is a JSON string, repeated
/// occurrences (e.g. `Received`) are a JSON array in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// Collapse a list of decoded values: one value stays `Single`.
    ///
    /// Returns `None` for an empty list.
    pub fn from_values(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Self::Single),
            _ => Some(Self::Multiple(values)),
        }
    }

    /// The first (or only) value.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(v) => Some(v),
            Self::Multiple(vs) => vs.first().map(String::as_str),
        }
    }

    /// All values in source order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// Number of occurrences of the header in the message.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Header map keyed by the name as written in the message.
///
/// Keeps the order in which each distinct name first appeared and
/// serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

impl Headers {
    /// Build from `(name, value)` pairs that are already grouped by name.
    pub fn from_entries(entries: Vec<(String, HeaderValue)>) -> Self {
        Self { entries }
    }

    /// Exact-name lookup. Header names are not case-folded.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Headers {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

/// Structured view of a message, computed once at ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedMessage {
    /// Decoded headers grouped by name.
    pub headers: Headers,

    /// First `text/plain` part, if any.
    pub body_text: Option<String>,

    /// First `text/html` part, if any.
    pub body_html: Option<String>,
}

impl ParsedMessage {
    /// Convenience accessor for the first `Subject` value.
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("Subject").and_then(HeaderValue::first)
    }
}

/// A message as received over SMTP.
///
/// Built once by the store and never mutated; the store hands it out behind
/// an `Arc`. Serializing it omits the raw bytes, which are only served as an
/// `.eml` download, and carries the receive time twice: `timestamp` as Unix
/// seconds and `received_at` as RFC 3339.
#[derive(Debug, Clone)]
pub struct CapturedMessage {
    id: MessageId,
    received_at: DateTime<Utc>,
    raw: Vec<u8>,
    parsed: ParsedMessage,
}

impl Serialize for CapturedMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("CapturedMessage", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("timestamp", &self.timestamp())?;
        state.serialize_field("received_at", &self.received_at)?;
        state.serialize_field("parsed", &self.parsed)?;
        state.end()
    }
}

impl CapturedMessage {
    pub(crate) fn new(
        id: MessageId,
        received_at: DateTime<Utc>,
        raw: Vec<u8>,
        parsed: ParsedMessage,
    ) -> Self {
        Self {
            id,
            received_at,
            raw,
            parsed,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Receive time as fractional Unix seconds.
    pub fn timestamp(&self) -> f64 {
        self.received_at.timestamp_micros() as f64 / 1_000_000.0
    }

    /// The exact bytes handed to the store.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn parsed(&self) -> &ParsedMessage {
        &self.parsed
    }
}
