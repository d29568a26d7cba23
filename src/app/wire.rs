//! Wire codecs: how the control loop's messages look on a given transport.
//!
//! ```text
//!                 ┌──────────────┐  framed radio protocol
//!  GateService ──▶│ WireCodec    │──▶ BinaryWire  (frame + crc + cipher)
//!                 └──────────────┘──▶ JsonWire    (keypad bus JSON, HMAC)
//! ```
//!
//! The binary codec serves both the radio link and the bus mimic; only the
//! cipher stage and the [`Link`](crate::transport::Link) differ.

use log::debug;

use crate::config::{DeviceConfig, RemoteConfig};
use crate::error::FrameError;
use crate::protocol::Inbound;
use crate::protocol::cipher::CipherStage;
use crate::protocol::command::{Ack, MAX_ACK_LEN};
use crate::protocol::downlink::{self, DownlinkOptions};
use crate::protocol::frame::{self, DeviceType, FrameHeader, MsgType, PayloadPolicy};
use crate::protocol::json::{self, AckMessage, KeypadCredentials, StatusMessage};
use crate::protocol::tokens::GateStatus;
use crate::transport::{MAX_PACKET_LEN, Packet, Route};

/// One encoded message ready for the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub route: Route,
    /// Frame sequence number, when the format carries one.
    pub sequence: Option<u16>,
    pub bytes: Packet,
}

/// What the decoder needs from the control loop.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub remote: &'a RemoteConfig,
    pub now_ms: u64,
}

pub trait WireCodec {
    fn encode_scan(&mut self, identifier: &[u8], now_ms: u64) -> Result<Outbound, FrameError>;
    fn encode_status(&mut self, status: GateStatus, now_ms: u64) -> Result<Outbound, FrameError>;
    fn encode_ack(&mut self, ack: &Ack, now_ms: u64) -> Result<Outbound, FrameError>;
    fn decode(&self, packet: &[u8], ctx: &DecodeContext<'_>) -> Result<Inbound, FrameError>;
}

fn to_packet(bytes: &[u8]) -> Result<Packet, FrameError> {
    Packet::from_slice(bytes).map_err(|_| FrameError::PayloadTooLarge {
        len: bytes.len(),
        max: MAX_PACKET_LEN,
    })
}

fn uptime_secs(now_ms: u64) -> u32 {
    (now_ms / 1000) as u32
}

// ═══════════════════════════════════════════════════════════════
//  Binary frames
// ═══════════════════════════════════════════════════════════════

pub struct BinaryWire {
    device_type: DeviceType,
    /// Next sequence number; wraps at 65536.
    sequence: u16,
    cipher: CipherStage,
    downlink: DownlinkOptions,
}

impl BinaryWire {
    pub fn new(device_type: DeviceType, cipher: CipherStage, downlink: DownlinkOptions) -> Self {
        Self {
            device_type,
            sequence: 0,
            cipher,
            downlink,
        }
    }

    pub fn from_config(cfg: &DeviceConfig) -> Self {
        Self::new(cfg.device_type, cfg.cipher, cfg.downlink)
    }

    /// Sequence number the next frame will carry.
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    fn frame(
        &mut self,
        msg_type: MsgType,
        payload: &[u8],
        policy: PayloadPolicy,
        now_ms: u64,
    ) -> Result<Outbound, FrameError> {
        let header = FrameHeader::new(msg_type, self.device_type, self.sequence, uptime_secs(now_ms));
        let buf = frame::encode_with_policy(&header, payload, policy, &self.cipher)?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Outbound {
            route: Route::Uplink,
            sequence: Some(header.sequence),
            bytes: to_packet(&buf)?,
        })
    }
}

impl WireCodec for BinaryWire {
    fn encode_scan(&mut self, identifier: &[u8], now_ms: u64) -> Result<Outbound, FrameError> {
        self.frame(MsgType::Scan, identifier, MsgType::Scan.payload_policy(), now_ms)
    }

    fn encode_status(&mut self, status: GateStatus, now_ms: u64) -> Result<Outbound, FrameError> {
        let policy = MsgType::Status.payload_policy();
        self.frame(MsgType::Status, status.token().as_bytes(), policy, now_ms)
    }

    /// Acks ride in STATUS frames but may exceed the status text limit.
    fn encode_ack(&mut self, ack: &Ack, now_ms: u64) -> Result<Outbound, FrameError> {
        let text = ack.to_text();
        let policy = PayloadPolicy::Reject(MAX_ACK_LEN);
        self.frame(MsgType::Status, text.as_bytes(), policy, now_ms)
    }

    fn decode(&self, packet: &[u8], ctx: &DecodeContext<'_>) -> Result<Inbound, FrameError> {
        let frame = downlink::decode(packet, self.downlink, &self.cipher)?;
        Ok(Inbound::from_text(&frame.payload, ctx.remote))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Keypad JSON
// ═══════════════════════════════════════════════════════════════

pub struct JsonWire {
    device_id: String,
    creds: KeypadCredentials,
}

impl JsonWire {
    pub fn new(device_id: &str, creds: KeypadCredentials) -> Self {
        Self {
            device_id: device_id.to_string(),
            creds,
        }
    }

    /// Fresh request nonce in `[0, 2^31)`.
    fn next_nonce(&mut self) -> u32 {
        random_u32() & 0x7FFF_FFFF
    }

    fn status_fields(status: GateStatus) -> (&'static str, &'static str) {
        match status {
            GateStatus::Online => ("online", "boot"),
            GateStatus::Heartbeat => ("online", "heartbeat"),
            GateStatus::Opened => ("unlocked", "keypad"),
            GateStatus::Closed | GateStatus::RemoteAutoClosed => ("locked", "auto_lock"),
            GateStatus::RemoteClosed => ("locked", "remote_lock"),
        }
    }
}

impl WireCodec for JsonWire {
    fn encode_scan(&mut self, identifier: &[u8], now_ms: u64) -> Result<Outbound, FrameError> {
        let nonce = self.next_nonce();
        let bytes = json::sign_access_request(
            &self.device_id,
            identifier,
            &self.creds,
            uptime_secs(now_ms),
            nonce,
        )?;
        debug!("signed access request, nonce={}", nonce);
        Ok(Outbound {
            route: Route::Request,
            sequence: None,
            bytes: to_packet(&bytes)?,
        })
    }

    fn encode_status(&mut self, status: GateStatus, now_ms: u64) -> Result<Outbound, FrameError> {
        let (state, method) = Self::status_fields(status);
        let msg = StatusMessage {
            device_id: self.device_id.as_str(),
            state,
            method,
            timestamp: uptime_secs(now_ms),
        };
        let bytes = serde_json::to_vec(&msg).map_err(|_| FrameError::InvalidJson)?;
        Ok(Outbound {
            route: Route::Status,
            sequence: None,
            bytes: to_packet(&bytes)?,
        })
    }

    fn encode_ack(&mut self, ack: &Ack, now_ms: u64) -> Result<Outbound, FrameError> {
        let msg = AckMessage {
            device_id: self.device_id.as_str(),
            command_id: ack.command_id.as_str(),
            success: ack.success,
            status: ack.status.as_str(),
            timestamp: uptime_secs(now_ms),
        };
        let bytes = serde_json::to_vec(&msg).map_err(|_| FrameError::InvalidJson)?;
        Ok(Outbound {
            route: Route::Status,
            sequence: None,
            bytes: to_packet(&bytes)?,
        })
    }

    fn decode(&self, packet: &[u8], ctx: &DecodeContext<'_>) -> Result<Inbound, FrameError> {
        json::parse_command(packet, ctx.remote, ctx.now_ms)
    }
}

// ── Platform nonce source ─────────────────────────────────────

/// ESP-IDF: hardware RNG via `esp_fill_random`.
#[cfg(target_os = "espidf")]
fn random_u32() -> u32 {
    let mut buf = [0u8; 4];
    // SAFETY: esp_fill_random writes exactly `buf.len()` bytes into a
    // buffer we own for the duration of the call.
    unsafe {
        esp_idf_svc::sys::esp_fill_random(buf.as_mut_ptr().cast(), buf.len());
    }
    u32::from_le_bytes(buf)
}

/// Host builds: `RandomState` keys, non-cryptographic.
#[cfg(not(target_os = "espidf"))]
fn random_u32() -> u32 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    RandomState::new().build_hasher().finish() as u32
}
