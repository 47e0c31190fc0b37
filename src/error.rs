//! Centralized error types for mailorca.
//!
//! The capture path itself (parse, store, ingest) is infallible by contract;
//! these errors cover process setup: configuration, templates and listener
//! sockets.

use thiserror::Error;

/// All errors produced by the mailorca library.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// I/O error while running a listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A listener could not be bound to its address.
    #[error("Could not bind {service} listener to {addr}: {source}")]
    Bind {
        service: &'static str,
        addr: String,
        source: std::io::Error,
    },

    /// The configuration contains a value the server cannot run with.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration could not be rendered as TOML.
    #[error("Could not serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// The built-in HTML templates failed to load.
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    /// A built-in pattern failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Convenience alias for `Result<T, CaptureError>`.
pub type Result<T> = std::result::Result<T, CaptureError>;

impl CaptureError {
    /// Create a `Bind` variant for the named service.
    pub fn bind(service: &'static str, addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            service,
            addr: addr.into(),
            source,
        }
    }
}
