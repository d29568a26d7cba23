//! Wire protocol between a gatelink device and its gateway.
//!
//! ```text
//!  uplink   payload ─▶ cipher ─▶ frame ─▶ crc ─▶ transport
//!  downlink transport ─▶ downlink (prefix, channel, len) ─▶ cipher ─▶ text
//!                                       ├─▶ tokens   (GRANT / DENY5)
//!                                       └─▶ command  (REMOTE_UNLOCK / REMOTE_LOCK)
//! ```
//!
//! Everything in here is pure: no clocks, no I/O, no logging of note.

pub mod cipher;
pub mod command;
pub mod crc;
pub mod downlink;
pub mod frame;
pub mod json;
pub mod tokens;

use crate::config::ConfigUpdate;
use command::ParsedCommand;
use tokens::Decision;

/// Meaning of one validated inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Grant/deny for the open exchange.
    Decision(Decision),
    /// An administrator command, valid or not.
    Command(ParsedCommand),
    /// Runtime change to the remote-access limits.
    ConfigUpdate(ConfigUpdate),
    /// Structurally valid but carrying nothing we act on.
    Unrecognized,
}

impl Inbound {
    /// Classify the text of a downlink frame.
    pub fn from_text(payload: &[u8], remote: &crate::config::RemoteConfig) -> Self {
        if let Some(decision) = tokens::classify_decision(payload) {
            return Self::Decision(decision);
        }
        core::str::from_utf8(payload)
            .ok()
            .and_then(|text| command::parse_with(text, remote))
            .map_or(Self::Unrecognized, Self::Command)
    }
}
