//! Messenger-facing abstractions: the inbound event model and the outbound
//! delivery port.

pub mod port;
pub mod throttled;
pub mod types;
