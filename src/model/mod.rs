//! Core data model types for captured messages.

pub mod mail;

pub use mail::{CapturedMessage, HeaderValue, Headers, MessageId, ParsedMessage};
