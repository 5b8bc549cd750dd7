//! Core of the anonymous relay bridge.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `DeliveryGateway` port (trait) implemented in the adapter crate.

pub mod config;
pub mod content;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod registry;

pub use errors::{Error, Result};
