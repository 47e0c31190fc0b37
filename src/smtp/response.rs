//! SMTP replies

use crate::ingest::Ack;
use crate::smtp::error::SmtpError;

/// A reply sent to the SMTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    /// Three-digit reply code (e.g. "250", "354", "500")
    pub code: &'static str,
    /// Reply text, one entry per line
    pub lines: Vec<String>,
}

impl SmtpResponse {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![message.into()],
        }
    }

    pub fn ok() -> Self {
        Self::new("250", "OK")
    }

    pub fn greeting(hostname: &str) -> Self {
        Self::new("220", format!("{hostname} ESMTP mailorca ready"))
    }

    pub fn helo(hostname: &str, client_domain: &str) -> Self {
        Self::new("250", format!("{hostname} Hello {client_domain}"))
    }

    /// Multi-line EHLO reply listing the extensions we support
    pub fn ehlo(hostname: &str, client_domain: &str, max_message_size: usize) -> Self {
        Self {
            code: "250",
            lines: vec![
                format!("{hostname} Hello {client_domain}"),
                "PIPELINING".to_string(),
                "8BITMIME".to_string(),
                format!("SIZE {max_message_size}"),
            ],
        }
    }

    pub fn data_start() -> Self {
        Self::new("354", "End data with <CR><LF>.<CR><LF>")
    }

    pub fn quit() -> Self {
        Self::new("221", "Bye")
    }

    pub fn from_error(err: &SmtpError) -> Self {
        Self::new(err.to_response_code(), err.to_response_message())
    }

    pub fn from_ack(ack: &Ack) -> Self {
        let (code, text) = ack.smtp_reply();
        Self::new(code, text)
    }

    /// Format the reply for the wire: `code-text` for every line but the
    /// last, which uses `code text`.
    pub fn format(&self) -> String {
        let mut result = String::new();
        let last = self.lines.len().saturating_sub(1);
        for (i, line) in self.lines.iter().enumerate() {
            let sep = if i == last { ' ' } else { '-' };
            result.push_str(self.code);
            result.push(sep);
            result.push_str(line);
            result.push_str("\r\n");
        }
        if self.lines.is_empty() {
            result.push_str(self.code);
            result.push_str("\r\n");
        }
        result
    }
}
