//! The hand-off point between the SMTP transport and the mail store.

use std::sync::Arc;

use tracing::{debug, error};

use crate::model::mail::MessageId;
use crate::store::MailStore;

/// A message transaction as finished by the SMTP transport.
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    /// Envelope sender (`MAIL FROM`), empty for the null reverse-path.
    pub mail_from: String,
    /// Envelope recipients (`RCPT TO`).
    pub rcpt_to: Vec<String>,
    /// Raw message bytes. `None` means the transport finished a transaction
    /// without handing over content, which is an integration bug.
    pub content: Option<Vec<u8>>,
}

/// Outcome reported back to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Stored; reply `250`.
    Accepted(MessageId),
    /// The transport broke its contract; reply with a transient failure.
    TransportFault,
}

impl Ack {
    /// SMTP reply code and text for this outcome.
    pub fn smtp_reply(&self) -> (&'static str, &'static str) {
        match self {
            Ack::Accepted(_) => ("250", "OK"),
            Ack::TransportFault => ("451", "Requested action aborted: local error in processing"),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Ack::Accepted(_))
    }
}

/// Entry point called once per accepted SMTP message.
#[derive(Debug, Clone)]
pub struct Ingestor {
    store: Arc<MailStore>,
}

impl Ingestor {
    pub fn new(store: Arc<MailStore>) -> Self {
        Self { store }
    }

    /// Store the delivered message and acknowledge it.
    ///
    /// Every delivery with content is accepted, however malformed the message;
    /// only a delivery without content is refused.
    pub fn on_message_received(&self, delivery: Delivery) -> Ack {
        let Some(raw) = delivery.content else {
            error!(
                mail_from = %delivery.mail_from,
                rcpt_to = ?delivery.rcpt_to,
                "Transport delivered a message without content"
            );
            return Ack::TransportFault;
        };

        debug!(
            mail_from = %delivery.mail_from,
            rcpt_to = ?delivery.rcpt_to,
            size = raw.len(),
            "Mail received"
        );
        let record = self.store.add(raw);
        Ack::Accepted(record.id())
    }

    pub fn store(&self) -> &Arc<MailStore> {
        &self.store
    }
}
