//! Device configuration parameters
//!
//! All tunable parameters for a gatelink device.  Values are compiled in
//! or supplied by the integrator; the remote-access block can also be
//! changed at runtime by an `update_config` bus command.

use core::fmt;

use heapless::String as HString;
use serde::{Deserialize, Serialize};

use crate::protocol::cipher::{CipherStage, DEFAULT_XOR_KEY};
use crate::protocol::downlink::DownlinkOptions;
use crate::protocol::frame::DeviceType;

/// Errors raised when configuration fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Remote access
// ---------------------------------------------------------------------------

/// Limits applied to administrator-issued unlock commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Remote unlock accepted at all.
    pub enabled: bool,
    /// Hold time used when none is requested or the request is too short.
    pub default_duration_ms: u32,
    /// Requests shorter than this fall back to the default.
    pub min_duration_ms: u32,
    /// Requests longer than this are clamped down to it.
    pub max_duration_ms: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_duration_ms: 5_000,
            min_duration_ms: 1_000,
            max_duration_ms: 30_000,
        }
    }
}

impl RemoteConfig {
    /// Turn a requested hold time into the one actually used.
    ///
    /// Above the maximum clamps to the maximum; below the minimum (or
    /// absent) yields the default, not the minimum.
    pub fn resolve_duration(&self, requested: Option<u64>) -> u32 {
        match requested {
            None => self.default_duration_ms,
            Some(ms) if ms > u64::from(self.max_duration_ms) => self.max_duration_ms,
            Some(ms) if ms < u64::from(self.min_duration_ms) => self.default_duration_ms,
            Some(ms) => ms as u32,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_duration_ms == 0 {
            return Err(ConfigError::ValidationFailed("remote.min_duration_ms must be > 0"));
        }
        if self.min_duration_ms > self.max_duration_ms {
            return Err(ConfigError::ValidationFailed(
                "remote.min_duration_ms must not exceed max_duration_ms",
            ));
        }
        if self.default_duration_ms < self.min_duration_ms
            || self.default_duration_ms > self.max_duration_ms
        {
            return Err(ConfigError::ValidationFailed(
                "remote.default_duration_ms must lie within [min, max]",
            ));
        }
        Ok(())
    }

    /// Apply a runtime update.  Nothing changes unless the result validates.
    pub fn apply(&mut self, update: &ConfigUpdate) -> Result<(), ConfigError> {
        let mut next = *self;
        if let Some(enabled) = update.remote_enabled {
            next.enabled = enabled;
        }
        if let Some(ms) = update.default_duration_ms {
            next.default_duration_ms = ms;
        }
        if let Some(ms) = update.max_duration_ms {
            next.max_duration_ms = ms;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Fields of an `update_config` command.  Absent fields are left as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigUpdate {
    pub command_id: HString<64>,
    pub remote_enabled: Option<bool>,
    pub default_duration_ms: Option<u32>,
    pub max_duration_ms: Option<u32>,
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Identity ---
    pub device_id: HString<32>,
    pub device_type: DeviceType,

    // --- Exchange timing ---
    /// How long a scan waits for its decision (milliseconds)
    pub response_window_ms: u32,
    /// Transport poll interval while waiting (milliseconds)
    pub poll_interval_ms: u32,
    /// Gate hold time after a granted scan (milliseconds)
    pub grant_hold_ms: u32,
    /// Liveness report interval (milliseconds)
    pub heartbeat_interval_ms: u32,

    // --- Actuator ---
    /// Servo angle for open (degrees)
    pub open_angle: u8,
    /// Servo angle for closed (degrees)
    pub closed_angle: u8,
    /// Pause after each remote-unlock movement (milliseconds)
    pub settle_ms: u32,

    // --- Link ---
    pub downlink: DownlinkOptions,
    pub cipher: CipherStage,

    pub remote: RemoteConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::radio_gate()
    }
}

impl DeviceConfig {
    /// Gate controller on the point-to-point radio link.
    pub fn radio_gate() -> Self {
        Self {
            device_id: id("rfid_gate_01"),
            device_type: DeviceType::Gate,

            response_window_ms: 12_000,
            poll_interval_ms: 10,
            grant_hold_ms: 5_000,
            heartbeat_interval_ms: 60_000,

            open_angle: 90,
            closed_angle: 0,
            settle_ms: 500,

            downlink: DownlinkOptions::default(),
            cipher: CipherStage::None,

            remote: RemoteConfig::default(),
        }
    }

    /// Gate controller carrying the radio frames over the message bus,
    /// with payload obfuscation on.
    pub fn bus_gate() -> Self {
        Self {
            cipher: CipherStage::Xor(DEFAULT_XOR_KEY),
            ..Self::radio_gate()
        }
    }

    /// Keypad lock on the structured (JSON) bus protocol.
    pub fn keypad() -> Self {
        Self {
            device_id: id("passkey_01"),
            device_type: DeviceType::Keypad,
            open_angle: 180,
            ..Self::radio_gate()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.is_empty() {
            return Err(ConfigError::ValidationFailed("device_id must not be empty"));
        }
        if self.response_window_ms == 0 {
            return Err(ConfigError::ValidationFailed("response_window_ms must be > 0"));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms >= self.response_window_ms {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be > 0 and below response_window_ms",
            ));
        }
        if self.grant_hold_ms == 0 {
            return Err(ConfigError::ValidationFailed("grant_hold_ms must be > 0"));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("heartbeat_interval_ms must be > 0"));
        }
        if self.open_angle > 180 || self.closed_angle > 180 {
            return Err(ConfigError::ValidationFailed("servo angles must be within 0..=180"));
        }
        if self.open_angle == self.closed_angle {
            return Err(ConfigError::ValidationFailed("open_angle must differ from closed_angle"));
        }
        self.remote.validate()
    }
}

fn id(s: &str) -> HString<32> {
    let mut out = HString::new();
    let _ = out.push_str(s);
    out
}
