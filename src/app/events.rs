//! Outbound application events.
//!
//! The [`GateService`](super::service::GateService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::error::{Error, FrameError};
use crate::fsm::StateId;
use crate::fsm::context::ExchangeOutcome;
use crate::protocol::command::{AckStatus, CommandKind};
use crate::protocol::tokens::GateStatus;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started and announced itself.
    Started,

    /// A SCAN left the device.
    ScanSent { sequence: Option<u16>, id_len: usize },

    /// An exchange reached its terminal outcome.
    ExchangeResolved(ExchangeOutcome),

    /// The exchange FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// An inbound packet failed validation and was dropped.
    FrameDiscarded(FrameError),

    /// A remote command ran to completion.
    RemoteCommandExecuted { kind: CommandKind, duration_ms: Option<u32> },

    /// A remote command was refused; the ack carried `status`.
    RemoteCommandRejected { kind: Option<CommandKind>, status: AckStatus },

    /// Remote-access limits changed at runtime.
    ConfigUpdated,

    /// A gate status report was sent.
    StatusSent(GateStatus),

    /// Periodic liveness report went out.
    Heartbeat,

    /// A transmission failed; `what` names the message.
    SendFailed { what: &'static str, error: Error },
}
