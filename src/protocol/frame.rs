//! Uplink frame codec.
//!
//! ```text
//!  0      3    4    5      7          11   12          12+len      +4
//!  ┌──────┬────┬────┬──────┬──────────┬────┬────────────┬──────────┐
//!  │MAGIC │T|V │F|D │ SEQ  │ TIMESTAMP│LEN │  PAYLOAD   │  CRC32   │
//!  │00 02 │    │    │ u16le│  u32le   │ u8 │  LEN bytes │  u32le   │
//!  │  17  │    │    │      │          │    │            │          │
//!  └──────┴────┴────┴──────┴──────────┴────┴────────────┴──────────┘
//!          ◀──────────────── checksum-covered ──────────▶
//! ```
//!
//! * `T|V`: high nibble message type, low nibble protocol version.
//! * `F|D`: high nibble flags, low nibble device type.
//! * The payload passes through the [`PayloadCipher`] stage before the
//!   checksum is computed, so the checksum always covers the bytes on air.
//!
//! Decoding never interprets the payload; it is handed back as raw bytes.

use heapless::Vec as HVec;
use serde::{Deserialize, Serialize};

use super::cipher::PayloadCipher;
use super::crc;
use crate::error::FrameError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Protocol family identifier at offsets 0–2.
pub const MAGIC: [u8; 3] = [0x00, 0x02, 0x17];
pub const PROTOCOL_VERSION: u8 = 0x01;
pub const HEADER_LEN: usize = 12;
pub const CHECKSUM_LEN: usize = 4;
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CHECKSUM_LEN;

/// Identifier payloads longer than this are rejected.
pub const MAX_IDENTIFIER_LEN: usize = 10;
/// Status text longer than this is truncated.
pub const MAX_STATUS_LEN: usize = 16;
/// Upper bound for any payload (acknowledgment text uses the status type
/// but is not held to the status limit).
pub const MAX_PAYLOAD_LEN: usize = 112;
pub const MAX_FRAME_LEN: usize = MIN_FRAME_LEN + MAX_PAYLOAD_LEN;

/// Stack buffer holding one encoded frame.
pub type FrameBuf = HVec<u8, MAX_FRAME_LEN>;
pub type Payload = HVec<u8, MAX_PAYLOAD_LEN>;

// ---------------------------------------------------------------------------
// Header fields
// ---------------------------------------------------------------------------

/// A header nibble with no assigned meaning.
///
/// Only `from_nibble` builds one, so it never holds a code that has a named
/// variant and header fields always survive an encode/decode cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNibble(u8);

impl RawNibble {
    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    Scan,
    Status,
    Unknown(RawNibble),
}

impl MsgType {
    pub fn to_nibble(self) -> u8 {
        match self {
            Self::Scan => 0x01,
            Self::Status => 0x06,
            Self::Unknown(n) => n.get(),
        }
    }

    pub fn from_nibble(n: u8) -> Self {
        match n & 0x0F {
            0x01 => Self::Scan,
            0x06 => Self::Status,
            other => Self::Unknown(RawNibble(other)),
        }
    }

    /// Size rule applied by [`encode`] for this message type.
    pub fn payload_policy(self) -> PayloadPolicy {
        match self {
            Self::Scan => PayloadPolicy::Reject(MAX_IDENTIFIER_LEN),
            Self::Status => PayloadPolicy::Truncate(MAX_STATUS_LEN),
            Self::Unknown(_) => PayloadPolicy::Reject(MAX_PAYLOAD_LEN),
        }
    }
}

/// Physical role of the sending device.  Serialized as its nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DeviceType {
    Gate,
    Keypad,
    Fan,
    Sensor,
    Unknown(RawNibble),
}

impl DeviceType {
    pub fn to_nibble(self) -> u8 {
        match self {
            Self::Gate => 0x01,
            Self::Keypad => 0x02,
            Self::Fan => 0x03,
            Self::Sensor => 0x04,
            Self::Unknown(n) => n.get(),
        }
    }

    pub fn from_nibble(n: u8) -> Self {
        match n & 0x0F {
            0x01 => Self::Gate,
            0x02 => Self::Keypad,
            0x03 => Self::Fan,
            0x04 => Self::Sensor,
            other => Self::Unknown(RawNibble(other)),
        }
    }
}

impl From<u8> for DeviceType {
    fn from(n: u8) -> Self {
        Self::from_nibble(n)
    }
}

impl From<DeviceType> for u8 {
    fn from(d: DeviceType) -> Self {
        d.to_nibble()
    }
}

/// What [`encode_with_policy`] does with an oversized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadPolicy {
    Reject(usize),
    Truncate(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub msg_type: MsgType,
    pub version: u8,
    /// Only the low nibble is carried.
    pub flags: u8,
    pub device_type: DeviceType,
    pub sequence: u16,
    /// Seconds since boot.
    pub timestamp: u32,
}

impl FrameHeader {
    pub fn new(msg_type: MsgType, device_type: DeviceType, sequence: u16, timestamp: u32) -> Self {
        Self {
            msg_type,
            version: PROTOCOL_VERSION,
            flags: 0,
            device_type,
            sequence,
            timestamp,
        }
    }
}

/// A decoded uplink frame.  `payload` is already de-obfuscated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Payload,
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a frame, applying the message type's size rule.
pub fn encode(
    header: &FrameHeader,
    payload: &[u8],
    cipher: &impl PayloadCipher,
) -> Result<FrameBuf, FrameError> {
    encode_with_policy(header, payload, header.msg_type.payload_policy(), cipher)
}

/// Encode a frame under an explicit size rule.
pub fn encode_with_policy(
    header: &FrameHeader,
    payload: &[u8],
    policy: PayloadPolicy,
    cipher: &impl PayloadCipher,
) -> Result<FrameBuf, FrameError> {
    let payload = match policy {
        PayloadPolicy::Reject(max) if payload.len() > max => {
            return Err(FrameError::PayloadTooLarge {
                len: payload.len(),
                max,
            });
        }
        PayloadPolicy::Reject(_) => payload,
        PayloadPolicy::Truncate(max) => &payload[..payload.len().min(max)],
    };
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut buf = [0u8; MAX_FRAME_LEN];
    buf[..3].copy_from_slice(&MAGIC);
    buf[3] = (header.msg_type.to_nibble() << 4) | (header.version & 0x0F);
    buf[4] = ((header.flags & 0x0F) << 4) | header.device_type.to_nibble();
    buf[5..7].copy_from_slice(&header.sequence.to_le_bytes());
    buf[7..11].copy_from_slice(&header.timestamp.to_le_bytes());
    buf[11] = payload.len() as u8;

    let end = HEADER_LEN + payload.len();
    buf[HEADER_LEN..end].copy_from_slice(payload);
    cipher.apply(&mut buf[HEADER_LEN..end]);

    let crc = crc::checksum(&buf[3..end]);
    buf[end..end + CHECKSUM_LEN].copy_from_slice(&crc.to_le_bytes());

    // Length is bounded by MAX_FRAME_LEN above.
    let mut out = FrameBuf::new();
    let _ = out.extend_from_slice(&buf[..end + CHECKSUM_LEN]);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode and verify one uplink frame.
///
/// Checks, in order: minimum length, magic, declared length against the
/// buffer length, checksum.  Only then is the payload de-obfuscated.
pub fn decode(bytes: &[u8], cipher: &impl PayloadCipher) -> Result<Frame, FrameError> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort {
            len: bytes.len(),
            min: MIN_FRAME_LEN,
        });
    }
    if bytes[..3] != MAGIC {
        return Err(FrameError::BadMagic);
    }

    let len = bytes[11] as usize;
    let expected = MIN_FRAME_LEN + len;
    if bytes.len() != expected || len > MAX_PAYLOAD_LEN {
        return Err(FrameError::LengthMismatch {
            declared: len,
            actual: bytes.len(),
        });
    }

    let end = HEADER_LEN + len;
    let mut trailer = [0u8; CHECKSUM_LEN];
    trailer.copy_from_slice(&bytes[end..end + CHECKSUM_LEN]);
    let expected_crc = u32::from_le_bytes(trailer);
    let computed = crc::checksum(&bytes[3..end]);
    if computed != expected_crc {
        return Err(FrameError::ChecksumMismatch {
            expected: expected_crc,
            computed,
        });
    }

    let mut payload = Payload::new();
    let _ = payload.extend_from_slice(&bytes[HEADER_LEN..end]);
    cipher.apply(&mut payload);

    let header = FrameHeader {
        msg_type: MsgType::from_nibble(bytes[3] >> 4),
        version: bytes[3] & 0x0F,
        flags: bytes[4] >> 4,
        device_type: DeviceType::from_nibble(bytes[4]),
        sequence: u16::from_le_bytes([bytes[5], bytes[6]]),
        timestamp: u32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]),
    };

    Ok(Frame { header, payload })
}
