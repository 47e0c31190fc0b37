//! `mailorca`: a local SMTP mail catcher for development.
//!
//! Messages submitted over SMTP are parsed once, kept in a bounded
//! in-memory history and served back through a web UI and a JSON API.

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod parser;
pub mod smtp;
pub mod store;
pub mod web;
