//! Unified error types for the gatelink firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! can be logged, counted and passed through events without allocation.
//!
//! None of these are fatal: the control loop discards the offending input,
//! logs the reason and keeps running.

use core::fmt;

use crate::config::ConfigError;
use crate::protocol::command::CommandKind;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An inbound or outbound frame violated the wire format.
    Frame(FrameError),
    /// The transport refused or failed to carry a packet.
    Link(LinkError),
    /// A remote command could not be parsed.
    Command(CommandError),
    /// The sensor handed over an identifier the protocol cannot carry.
    InvalidIdentifier { len: usize },
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::InvalidIdentifier { len } => write!(f, "invalid identifier length {len}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

/// Structural problems with a frame.  Inbound frames carrying any of these
/// are discarded without being acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer shorter than the fixed header.
    TooShort { len: usize, min: usize },
    /// Fixed prefix bytes do not match the protocol constant.
    BadMagic,
    /// Channel byte of a downlink frame is not the configured channel.
    BadChannel { found: u8 },
    /// Declared payload length is inconsistent with the buffer length.
    LengthMismatch { declared: usize, actual: usize },
    /// Trailing checksum disagrees with the recomputed one.
    ChecksumMismatch { expected: u32, computed: u32 },
    /// Payload exceeds what the message type may carry.
    PayloadTooLarge { len: usize, max: usize },
    /// Structured bus message could not be parsed.
    InvalidJson,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len, min } => write!(f, "too short ({len} < {min} bytes)"),
            Self::BadMagic => write!(f, "bad header magic"),
            Self::BadChannel { found } => write!(f, "bad channel 0x{found:02X}"),
            Self::LengthMismatch { declared, actual } => {
                write!(f, "length mismatch (declared {declared}, got {actual} bytes)")
            }
            Self::ChecksumMismatch { expected, computed } => {
                write!(f, "checksum mismatch (frame {expected:08x}, computed {computed:08x})")
            }
            Self::PayloadTooLarge { len, max } => write!(f, "payload too large ({len} > {max})"),
            Self::InvalidJson => write!(f, "invalid JSON message"),
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The transport refused the packet or wrote nothing.
    SendFailed,
    /// The transport has no connection to the peer.
    Disconnected,
    /// Packet is larger than the transport can carry.
    PacketTooLarge { len: usize, max: usize },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed => write!(f, "send failed"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::PacketTooLarge { len, max } => write!(f, "packet too large ({len} > {max})"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The command kind was recognised but its fields were not.
    InvalidFormat(CommandKind),
    /// The text does not name a known command kind.
    UnknownKind,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat(kind) => write!(f, "invalid {kind:?} command format"),
            Self::UnknownKind => write!(f, "unknown command kind"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
