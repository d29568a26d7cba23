//! Downlink envelope: decisions and remote commands from the gateway.
//!
//! ```text
//!  0          3     5    6    7            7+len         +4 (opt-in)
//!  ┌──────────┬─────┬────┬────┬────────────┬─────────────┐
//!  │ C0 00 00 │00 00│ CH │LEN │  PAYLOAD   │ CRC32 u32le │
//!  └──────────┴─────┴────┴────┴────────────┴─────────────┘
//! ```
//!
//! The deployed gateway sends no checksum on this direction.  Setting
//! [`DownlinkOptions::verify_checksum`] expects a trailing CRC over bytes
//! `[3 .. 7+len]` (same variant as the uplink) and rejects frames whose
//! trailer disagrees.

use serde::{Deserialize, Serialize};

use super::cipher::PayloadCipher;
use super::crc;
use super::frame::Payload;
use crate::error::FrameError;
use crate::transport::Packet;

pub const PREFIX: [u8; 3] = [0xC0, 0x00, 0x00];
/// Radio channel the gate listens on.
pub const CHANNEL: u8 = 0x17;
pub const HEADER_LEN: usize = 7;
pub const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownlinkOptions {
    /// Require and verify a trailing checksum.
    pub verify_checksum: bool,
}

impl DownlinkOptions {
    pub fn trailer_len(self) -> usize {
        if self.verify_checksum { CHECKSUM_LEN } else { 0 }
    }
}

/// A validated downlink frame.  The payload is raw and de-obfuscated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownlinkFrame {
    pub payload: Payload,
}

impl DownlinkFrame {
    pub fn text(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}

/// Validate one inbound packet.
pub fn decode(
    bytes: &[u8],
    opts: DownlinkOptions,
    cipher: &impl PayloadCipher,
) -> Result<DownlinkFrame, FrameError> {
    if bytes.len() < HEADER_LEN {
        return Err(FrameError::TooShort {
            len: bytes.len(),
            min: HEADER_LEN,
        });
    }
    if bytes[..3] != PREFIX {
        return Err(FrameError::BadMagic);
    }
    if bytes[5] != CHANNEL {
        return Err(FrameError::BadChannel { found: bytes[5] });
    }

    let len = bytes[6] as usize;
    let end = HEADER_LEN + len;
    if bytes.len() != end + opts.trailer_len() {
        return Err(FrameError::LengthMismatch {
            declared: len,
            actual: bytes.len(),
        });
    }
    if len > crate::protocol::frame::MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge {
            len,
            max: crate::protocol::frame::MAX_PAYLOAD_LEN,
        });
    }

    if opts.verify_checksum {
        let trailer = [bytes[end], bytes[end + 1], bytes[end + 2], bytes[end + 3]];
        let expected = u32::from_le_bytes(trailer);
        let computed = crc::checksum(&bytes[3..end]);
        if expected != computed {
            return Err(FrameError::ChecksumMismatch { expected, computed });
        }
    }

    let mut payload = Payload::new();
    let _ = payload.extend_from_slice(&bytes[HEADER_LEN..end]);
    cipher.apply(&mut payload);
    Ok(DownlinkFrame { payload })
}

/// Build a downlink packet the way the gateway does.
pub fn encode(
    payload: &[u8],
    opts: DownlinkOptions,
    cipher: &impl PayloadCipher,
) -> Result<Packet, FrameError> {
    let max = crate::protocol::frame::MAX_PAYLOAD_LEN;
    if payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max,
        });
    }

    let mut out = Packet::new();
    let _ = out.extend_from_slice(&PREFIX);
    let _ = out.extend_from_slice(&[0x00, 0x00, CHANNEL, payload.len() as u8]);
    let start = out.len();
    let _ = out.extend_from_slice(payload);
    cipher.apply(&mut out[start..]);
    if opts.verify_checksum {
        let crc = crc::checksum(&out[3..]);
        let _ = out.extend_from_slice(&crc.to_le_bytes());
    }
    Ok(out)
}
