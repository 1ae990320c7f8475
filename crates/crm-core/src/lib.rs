//! Core domain + application logic for the Telegram CRM.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind
//! ports (traits) implemented in adapter crates; persistence is `crm-db`.

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fanout;
pub mod importer;
pub mod ingest;
pub mod logging;
pub mod pending;
pub mod port;
pub mod resolver;
pub mod stats;

pub use errors::{Error, Result};
