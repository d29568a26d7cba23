//! Remote command text parser and acknowledgment text.
//!
//! ```text
//!   REMOTE_UNLOCK:<command_id>:<initiator>:<duration_ms>
//!   REMOTE_LOCK:<command_id>:<initiator>
//!   ACK:<command_id>:<0|1>:<status>
//! ```
//!
//! Fields are split on `:` and the field count must match the kind
//! exactly.  A well-formed unlock with an unparsable duration is still
//! valid; the duration falls back to the configured default.

use core::fmt::Write as _;

use heapless::String as HString;

use crate::config::RemoteConfig;
use crate::error::CommandError;

pub const UNLOCK_PREFIX: &str = "REMOTE_UNLOCK:";
pub const LOCK_PREFIX: &str = "REMOTE_LOCK:";
pub const ACK_PREFIX: &str = "ACK:";

/// Longest `command_id` or initiator the device will carry.
pub const MAX_FIELD_LEN: usize = 64;
/// Longest rendered acknowledgment.
pub const MAX_ACK_LEN: usize = crate::protocol::frame::MAX_PAYLOAD_LEN;

pub type Field = HString<MAX_FIELD_LEN>;
pub type AckText = HString<MAX_ACK_LEN>;

/// `command_id` used on the failure ack for an unparsable unlock.
pub const UNPARSABLE_COMMAND_ID: &str = "error";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Unlock,
    Lock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Unlock { duration_ms: u32 },
    Lock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub command_id: Field,
    pub initiator: Field,
    pub action: Action,
}

impl RemoteCommand {
    pub fn kind(&self) -> CommandKind {
        match self.action {
            Action::Unlock { .. } => CommandKind::Unlock,
            Action::Lock => CommandKind::Lock,
        }
    }

    pub fn duration_ms(&self) -> Option<u32> {
        match self.action {
            Action::Unlock { duration_ms } => Some(duration_ms),
            Action::Lock => None,
        }
    }
}

/// Outcome of parsing text that names a known command kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Valid(RemoteCommand),
    Invalid(CommandKind),
}

/// Parse with the stock duration limits.
pub fn parse(text: &str) -> Option<ParsedCommand> {
    parse_with(text, &RemoteConfig::default())
}

/// Parse `text` as a remote command.  Returns `None` when the text does
/// not start with a known command prefix.
pub fn parse_with(text: &str, cfg: &RemoteConfig) -> Option<ParsedCommand> {
    let parsed = if text.starts_with(UNLOCK_PREFIX) {
        parse_unlock_with(text, cfg)
    } else if text.starts_with(LOCK_PREFIX) {
        parse_lock(text)
    } else {
        return None;
    };
    Some(match parsed {
        Ok(cmd) => ParsedCommand::Valid(cmd),
        Err(CommandError::InvalidFormat(kind)) => ParsedCommand::Invalid(kind),
        Err(CommandError::UnknownKind) => return None,
    })
}

/// Parse an unlock command with the stock duration limits.
pub fn parse_unlock(text: &str) -> Result<RemoteCommand, CommandError> {
    parse_unlock_with(text, &RemoteConfig::default())
}

pub fn parse_unlock_with(text: &str, cfg: &RemoteConfig) -> Result<RemoteCommand, CommandError> {
    let invalid = CommandError::InvalidFormat(CommandKind::Unlock);
    let rest = text.strip_prefix(UNLOCK_PREFIX).ok_or(CommandError::UnknownKind)?;

    let mut parts = rest.split(':');
    let (Some(id), Some(initiator), Some(duration), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid);
    };

    let requested = duration.trim().parse::<u64>().ok();
    Ok(RemoteCommand {
        command_id: field(id).ok_or(invalid)?,
        initiator: field(initiator).ok_or(invalid)?,
        action: Action::Unlock {
            duration_ms: cfg.resolve_duration(requested),
        },
    })
}

pub fn parse_lock(text: &str) -> Result<RemoteCommand, CommandError> {
    let invalid = CommandError::InvalidFormat(CommandKind::Lock);
    let rest = text.strip_prefix(LOCK_PREFIX).ok_or(CommandError::UnknownKind)?;

    let mut parts = rest.split(':');
    let (Some(id), Some(initiator), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid);
    };

    Ok(RemoteCommand {
        command_id: field(id).ok_or(invalid)?,
        initiator: field(initiator).ok_or(invalid)?,
        action: Action::Lock,
    })
}

/// Non-empty and within [`MAX_FIELD_LEN`].
fn field(s: &str) -> Option<Field> {
    if s.is_empty() {
        return None;
    }
    let mut out = Field::new();
    out.push_str(s).ok()?;
    Some(out)
}

// ---------------------------------------------------------------------------
// Acknowledgments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Unlocked,
    Locked,
    InvalidFormat,
    RemoteUnlockDisabled,
    ConfigUpdated,
    InvalidConfig,
}

impl AckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unlocked => "unlocked",
            Self::Locked => "locked",
            Self::InvalidFormat => "invalid_format",
            Self::RemoteUnlockDisabled => "remote_unlock_disabled",
            Self::ConfigUpdated => "config_updated",
            Self::InvalidConfig => "invalid_config",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub command_id: Field,
    pub success: bool,
    pub status: AckStatus,
}

impl Ack {
    pub fn new(command_id: &str, success: bool, status: AckStatus) -> Self {
        // Ids are bounded at parse time; anything longer here is cut.
        let mut id = Field::new();
        for c in command_id.chars() {
            if id.push(c).is_err() {
                break;
            }
        }
        Self {
            command_id: id,
            success,
            status,
        }
    }

    /// The failure ack sent when an unlock command cannot be parsed.
    pub fn invalid_format() -> Self {
        Self::new(UNPARSABLE_COMMAND_ID, false, AckStatus::InvalidFormat)
    }

    /// `ACK:<command_id>:<0|1>:<status>`
    pub fn to_text(&self) -> AckText {
        let mut out = AckText::new();
        let _ = write!(
            out,
            "{}{}:{}:{}",
            ACK_PREFIX,
            self.command_id,
            u8::from(self.success),
            self.status.as_str()
        );
        out
    }
}

/// A received acknowledgment, as the gateway sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckView<'a> {
    pub command_id: &'a str,
    pub success: bool,
    pub status: &'a str,
}

impl<'a> AckView<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        let rest = text.strip_prefix(ACK_PREFIX)?;
        let mut parts = rest.splitn(3, ':');
        let command_id = parts.next()?;
        let success = match parts.next()? {
            "1" => true,
            "0" => false,
            _ => return None,
        };
        let status = parts.next()?;
        Some(Self {
            command_id,
            success,
            status,
        })
    }
}
