//! Bounded in-memory history of captured messages.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::model::mail::{CapturedMessage, MessageId, ParsedMessage};
use crate::parser;

/// Newest-first, size-bounded store of captured messages.
///
/// Shared by handle (`Arc<MailStore>`) between the SMTP sessions that write
/// to it and the HTTP handlers that read from it. Records are handed out as
/// `Arc<CapturedMessage>`, so a reader keeps its snapshot alive even after the
/// record has been evicted.
///
/// Parsing runs before the lock is taken; only the insert-and-trim step is
/// exclusive. Order is the order in which writers acquire the lock.
#[derive(Debug)]
pub struct MailStore {
    messages: RwLock<VecDeque<Arc<CapturedMessage>>>,
    max_history: NonZeroUsize,
}

impl MailStore {
    /// Create an empty store retaining at most `max_history` messages.
    pub fn new(max_history: NonZeroUsize) -> Self {
        Self {
            messages: RwLock::new(VecDeque::with_capacity(max_history.get())),
            max_history,
        }
    }

    /// Capture a raw message and return the stored record.
    ///
    /// Never fails: unparseable input (even a panicking parser) is stored with
    /// an empty [`ParsedMessage`] and its raw bytes intact.
    pub fn add(&self, raw: Vec<u8>) -> Arc<CapturedMessage> {
        let id = MessageId::generate();
        let received_at = Utc::now();
        let parsed = parse_or_default(&raw);
        let record = Arc::new(CapturedMessage::new(id, received_at, raw, parsed));

        let evicted = {
            let mut messages = self.messages.write();
            messages.push_front(Arc::clone(&record));
            let excess = messages.len().saturating_sub(self.max_history.get());
            for _ in 0..excess {
                messages.pop_back();
            }
            excess
        };

        debug!(
            id = %id,
            size = record.raw().len(),
            subject = record.parsed().subject().unwrap_or(""),
            evicted,
            "Stored message"
        );
        record
    }

    /// Look up a message by id. An unknown id is simply `None`.
    pub fn get(&self, id: &MessageId) -> Option<Arc<CapturedMessage>> {
        self.messages
            .read()
            .iter()
            .find(|m| m.id() == *id)
            .cloned()
    }

    /// Snapshot of all messages, newest first.
    ///
    /// The returned vector is detached from the store: concurrent `add`
    /// calls do not affect it.
    pub fn list(&self) -> Vec<Arc<CapturedMessage>> {
        self.messages.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Configured capacity.
    pub fn max_history(&self) -> NonZeroUsize {
        self.max_history
    }
}

fn parse_or_default(raw: &[u8]) -> ParsedMessage {
    match panic::catch_unwind(AssertUnwindSafe(|| parser::parse_message(raw))) {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(size = raw.len(), "Parser panicked, storing message without parsed view");
            ParsedMessage::default()
        }
    }
}
