//! Message storage.

pub mod mail_store;

pub use mail_store::MailStore;
