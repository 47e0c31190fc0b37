//! Email parsing: header decoding, MIME body extraction, and the message parser.

pub mod eml;
pub mod header;
pub mod mime;

pub use eml::parse_message;
