//! Structured bus messages used by the keypad lock variant.
//!
//! ```text
//!   home/devices/<id>/command   ◀── {"cmd": "...", ...}
//!   home/devices/<id>/status    ──▶ ack / status objects
//!   home/devices/<id>/request   ──▶ {"body": "<json text>", "hmac": "<hex>"}
//! ```
//!
//! Timestamps are seconds since boot, the same clock the binary frames use.

use core::fmt::Write as _;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use super::Inbound;
use super::command::{Action, CommandKind, Field, ParsedCommand, RemoteCommand};
use super::tokens::Decision;
use crate::config::{ConfigUpdate, RemoteConfig};
use crate::error::FrameError;

pub const CMD_REMOTE_UNLOCK: &str = "remote_unlock";
pub const CMD_REMOTE_LOCK: &str = "remote_lock";
pub const CMD_UPDATE_CONFIG: &str = "update_config";
pub const CMD_OPEN: &str = "OPEN";
pub const CMD_LOCK: &str = "LOCK";
pub const CMD_UNLOCK_REQUEST: &str = "unlock_request";

const UNKNOWN_USER: &str = "unknown";

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Everything the command topic may carry; unused fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusCommand {
    pub cmd: String,
    #[serde(default)]
    pub command_id: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub remote_enabled: Option<bool>,
    #[serde(default)]
    pub default_duration_ms: Option<u32>,
    #[serde(default)]
    pub max_duration_ms: Option<u32>,
}

/// Parse a command-topic message.
///
/// A missing `command_id` becomes the current millisecond clock rendered
/// as text; a missing `user` becomes `"unknown"`.
pub fn parse_command(bytes: &[u8], cfg: &RemoteConfig, now_ms: u64) -> Result<Inbound, FrameError> {
    let msg: BusCommand = serde_json::from_slice(bytes).map_err(|_| FrameError::InvalidJson)?;

    if let Some(reason) = msg.reason.as_deref() {
        log::debug!("bus command '{}' reason: {}", msg.cmd, reason);
    }

    let inbound = match msg.cmd.as_str() {
        CMD_OPEN => Inbound::Decision(Decision::Grant),
        CMD_LOCK => Inbound::Decision(Decision::Deny),
        CMD_REMOTE_UNLOCK => {
            let action = Action::Unlock {
                duration_ms: cfg.resolve_duration(msg.duration_ms),
            };
            Inbound::Command(remote(&msg, action, CommandKind::Unlock, now_ms))
        }
        CMD_REMOTE_LOCK => Inbound::Command(remote(&msg, Action::Lock, CommandKind::Lock, now_ms)),
        CMD_UPDATE_CONFIG => Inbound::ConfigUpdate(ConfigUpdate {
            command_id: command_id(&msg, now_ms).unwrap_or_default(),
            remote_enabled: msg.remote_enabled,
            default_duration_ms: msg.default_duration_ms,
            max_duration_ms: msg.max_duration_ms,
        }),
        _ => Inbound::Unrecognized,
    };
    Ok(inbound)
}

fn remote(msg: &BusCommand, action: Action, kind: CommandKind, now_ms: u64) -> ParsedCommand {
    let user = msg.user.as_deref().unwrap_or(UNKNOWN_USER);
    match (command_id(msg, now_ms), bounded(user)) {
        (Some(command_id), Some(initiator)) => ParsedCommand::Valid(RemoteCommand {
            command_id,
            initiator,
            action,
        }),
        _ => ParsedCommand::Invalid(kind),
    }
}

fn command_id(msg: &BusCommand, now_ms: u64) -> Option<Field> {
    match msg.command_id.as_deref() {
        Some(id) => bounded(id),
        None => {
            let mut out = Field::new();
            write!(out, "{now_ms}").ok()?;
            Some(out)
        }
    }
}

fn bounded(s: &str) -> Option<Field> {
    let mut out = Field::new();
    out.push_str(s).ok()?;
    Some(out)
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AckMessage<'a> {
    pub device_id: &'a str,
    pub command_id: &'a str,
    pub success: bool,
    pub status: &'a str,
    pub timestamp: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusMessage<'a> {
    pub device_id: &'a str,
    pub state: &'a str,
    pub method: &'a str,
    pub timestamp: u32,
}

/// Body of a keypad access request; signed as rendered text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessRequestBody<'a> {
    pub cmd: &'a str,
    pub client_id: &'a str,
    /// `hex(SHA-256(salt ‖ passcode))`
    pub pw: &'a str,
    pub ts: u32,
    pub nonce: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedRequest {
    /// The body exactly as signed.
    pub body: String,
    /// `hex(HMAC-SHA256(key, body))`
    pub hmac: String,
}

/// Secrets provisioned on a keypad.
#[derive(Clone)]
pub struct KeypadCredentials {
    pub salt: Vec<u8>,
    pub hmac_key: Vec<u8>,
}

impl core::fmt::Debug for KeypadCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("KeypadCredentials { .. }")
    }
}

/// Build the signed access request for `passcode`.
pub fn sign_access_request(
    client_id: &str,
    passcode: &[u8],
    creds: &KeypadCredentials,
    ts: u32,
    nonce: u32,
) -> Result<Vec<u8>, FrameError> {
    let mut hasher = hmac_sha256::Hash::new();
    hasher.update(&creds.salt);
    hasher.update(passcode);
    let pw = hex::encode(hasher.finalize());

    let body = AccessRequestBody {
        cmd: CMD_UNLOCK_REQUEST,
        client_id,
        pw: &pw,
        ts,
        nonce,
    };
    let body = serde_json::to_string(&body).map_err(|_| FrameError::InvalidJson)?;
    let hmac = hex::encode(hmac_sha256::HMAC::mac(body.as_bytes(), &creds.hmac_key));

    serde_json::to_vec(&SignedRequest { body, hmac }).map_err(|_| FrameError::InvalidJson)
}

/// Check a signed request the way the gateway does.
pub fn verify_access_request(bytes: &[u8], hmac_key: &[u8]) -> bool {
    let Ok(req) = serde_json::from_slice::<SignedRequest>(bytes) else {
        return false;
    };
    let mut received = [0u8; 32];
    if hex::decode_to_slice(&req.hmac, &mut received).is_err() {
        return false;
    }
    let computed = hmac_sha256::HMAC::mac(req.body.as_bytes(), hmac_key);
    computed[..].ct_eq(&received[..]).into()
}
