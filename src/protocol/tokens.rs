//! Status token vocabulary.
//!
//! Decisions are two fixed 5-byte tokens compared byte for byte.  Gate
//! status strings are short ASCII text, at most 16 bytes on the wire.

/// Access granted.
pub const GRANT: &[u8] = b"GRANT";
/// Access denied.
pub const DENY: &[u8] = b"DENY5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Grant,
    Deny,
}

/// Match a payload against the two decision tokens.  Anything else,
/// including case variants and padded text, is unrecognized.
pub fn classify_decision(payload: &[u8]) -> Option<Decision> {
    match payload {
        GRANT => Some(Decision::Grant),
        DENY => Some(Decision::Deny),
        _ => None,
    }
}

/// Gate state reported in STATUS frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Boot announcement.
    Online,
    /// Periodic liveness.
    Heartbeat,
    /// Opened after a granted scan.
    Opened,
    /// Closed after the grant hold.
    Closed,
    /// Closed at the end of a remote unlock.
    RemoteAutoClosed,
    /// Closed by a remote lock.
    RemoteClosed,
}

impl GateStatus {
    pub fn token(self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Heartbeat => "ALIVE",
            Self::Opened => "open",
            Self::Closed => "clos",
            Self::RemoteAutoClosed => "AUTO_CLOS",
            Self::RemoteClosed => "REMOTE_CLOS",
        }
    }
}
