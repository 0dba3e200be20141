//! Wire protocol and internal session events for the match front end.
//!
//! Mirrors the split used elsewhere in session-oriented transports: an
//! internal [`Event`] enum for process-local signalling that never crosses
//! the wire, and a serializable [`ClientMessage`]/[`ServerMessage`] pair
//! handled by the stateless [`Protocol`] encoder/decoder.
mod client;
mod event;
mod message;
mod protocol;

pub use client::*;
pub use event::*;
pub use message::*;
pub use protocol::*;
