//! Remote command dispatcher.
//!
//! Executes administrator-issued unlock/lock commands independently of the
//! scan exchange.  Each command runs to completion once started; a hold in
//! progress is never pre-empted.
//!
//! ```text
//!  Unlock:  relay on ─▶ open ─▶ settle ─▶ hold(duration) ─▶ close ─▶ relay off
//!           ─▶ settle ─▶ ACK unlocked ─▶ STATUS AUTO_CLOS
//!  Lock:    close ─▶ relay off ─▶ ACK locked ─▶ STATUS REMOTE_CLOS
//!  Invalid unlock:  ACK error:0:invalid_format
//!  Invalid lock:    ignored
//! ```
//!
//! A command that executes produces exactly one status report.

use log::{info, warn};

use super::channel::Channel;
use super::events::AppEvent;
use super::ports::{EventSink, GateActuator, TimePort};
use super::wire::WireCodec;
use crate::config::{ConfigUpdate, DeviceConfig, RemoteConfig};
use crate::protocol::command::{Ack, AckStatus, Action, CommandKind, ParsedCommand, RemoteCommand};
use crate::protocol::tokens::GateStatus;
use crate::transport::Link;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Executed(CommandKind),
    ConfigApplied,
    Rejected(AckStatus),
    Ignored,
}

/// Actuation parameters for remote commands.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    open_angle: u8,
    closed_angle: u8,
    settle_ms: u32,
}

impl Dispatcher {
    pub fn new(cfg: &DeviceConfig) -> Self {
        Self {
            open_angle: cfg.open_angle,
            closed_angle: cfg.closed_angle,
            settle_ms: cfg.settle_ms,
        }
    }

    /// Execute one parsed command.
    pub fn dispatch<W: WireCodec, L: Link>(
        &self,
        command: &ParsedCommand,
        remote: &RemoteConfig,
        channel: &mut Channel<W, L>,
        hw: &mut impl GateActuator,
        clock: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> DispatchOutcome {
        match command {
            ParsedCommand::Invalid(CommandKind::Unlock) => {
                warn!("REMOTE | malformed unlock command");
                self.reject(channel, clock.now_ms(), sink, &Ack::invalid_format(), Some(CommandKind::Unlock))
            }
            ParsedCommand::Invalid(CommandKind::Lock) => {
                warn!("REMOTE | malformed lock command ignored");
                DispatchOutcome::Ignored
            }
            ParsedCommand::Valid(cmd) => match cmd.action {
                Action::Unlock { .. } if !remote.enabled => {
                    warn!("REMOTE | unlock '{}' refused: remote unlock disabled", cmd.command_id);
                    let ack = Ack::new(&cmd.command_id, false, AckStatus::RemoteUnlockDisabled);
                    self.reject(channel, clock.now_ms(), sink, &ack, Some(CommandKind::Unlock))
                }
                Action::Unlock { duration_ms } => {
                    self.unlock(cmd, duration_ms, channel, hw, clock, sink)
                }
                Action::Lock => self.lock(cmd, channel, hw, clock, sink),
            },
        }
    }

    /// Apply an `update_config` command and acknowledge it.
    pub fn apply_config<W: WireCodec, L: Link>(
        &self,
        update: &ConfigUpdate,
        remote: &mut RemoteConfig,
        channel: &mut Channel<W, L>,
        clock: &impl TimePort,
        sink: &mut impl EventSink,
    ) -> DispatchOutcome {
        match remote.apply(update) {
            Ok(()) => {
                info!(
                    "CONFIG | remote enabled={} default={}ms max={}ms",
                    remote.enabled, remote.default_duration_ms, remote.max_duration_ms
                );
                let ack = Ack::new(&update.command_id, true, AckStatus::ConfigUpdated);
                send_ack(channel, clock.now_ms(), sink, &ack);
                sink.emit(&AppEvent::ConfigUpdated);
                DispatchOutcome::ConfigApplied
            }
            Err(e) => {
                warn!("CONFIG | update '{}' rejected: {}", update.command_id, e);
                let ack = Ack::new(&update.command_id, false, AckStatus::InvalidConfig);
                self.reject(channel, clock.now_ms(), sink, &ack, None)
            }
        }
    }

    // ── Commands ──────────────────────────────────────────────

    fn unlock<W: WireCodec, L: Link>(
        &self,
        cmd: &RemoteCommand,
        duration_ms: u32,
        channel: &mut Channel<W, L>,
        hw: &mut impl GateActuator,
        clock: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> DispatchOutcome {
        info!(
            "REMOTE | unlock '{}' by {} for {}ms",
            cmd.command_id, cmd.initiator, duration_ms
        );

        hw.set_relay(true);
        hw.set_position(self.open_angle);
        clock.delay_ms(self.settle_ms);
        clock.delay_ms(duration_ms);
        hw.set_position(self.closed_angle);
        hw.set_relay(false);
        clock.delay_ms(self.settle_ms);

        send_ack(channel, clock.now_ms(), sink, &Ack::new(&cmd.command_id, true, AckStatus::Unlocked));
        send_status(channel, clock.now_ms(), sink, GateStatus::RemoteAutoClosed);

        sink.emit(&AppEvent::RemoteCommandExecuted {
            kind: CommandKind::Unlock,
            duration_ms: Some(duration_ms),
        });
        DispatchOutcome::Executed(CommandKind::Unlock)
    }

    fn lock<W: WireCodec, L: Link>(
        &self,
        cmd: &RemoteCommand,
        channel: &mut Channel<W, L>,
        hw: &mut impl GateActuator,
        clock: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> DispatchOutcome {
        info!("REMOTE | lock '{}' by {}", cmd.command_id, cmd.initiator);

        hw.set_position(self.closed_angle);
        hw.set_relay(false);

        send_ack(channel, clock.now_ms(), sink, &Ack::new(&cmd.command_id, true, AckStatus::Locked));
        send_status(channel, clock.now_ms(), sink, GateStatus::RemoteClosed);

        sink.emit(&AppEvent::RemoteCommandExecuted {
            kind: CommandKind::Lock,
            duration_ms: None,
        });
        DispatchOutcome::Executed(CommandKind::Lock)
    }

    fn reject<W: WireCodec, L: Link>(
        &self,
        channel: &mut Channel<W, L>,
        now_ms: u64,
        sink: &mut impl EventSink,
        ack: &Ack,
        kind: Option<CommandKind>,
    ) -> DispatchOutcome {
        send_ack(channel, now_ms, sink, ack);
        sink.emit(&AppEvent::RemoteCommandRejected {
            kind,
            status: ack.status,
        });
        DispatchOutcome::Rejected(ack.status)
    }
}

// ── Sending helpers ───────────────────────────────────────────
// A failed send is reported but never undoes the actuation.

fn send_ack<W: WireCodec, L: Link>(
    channel: &mut Channel<W, L>,
    now_ms: u64,
    sink: &mut impl EventSink,
    ack: &Ack,
) {
    if let Err(error) = channel.send_ack(ack, now_ms) {
        warn!("ack '{}' not sent: {}", ack.command_id, error);
        sink.emit(&AppEvent::SendFailed { what: "ack", error });
    }
}

pub(crate) fn send_status<W: WireCodec, L: Link>(
    channel: &mut Channel<W, L>,
    now_ms: u64,
    sink: &mut impl EventSink,
    status: GateStatus,
) {
    match channel.send_status(status, now_ms) {
        Ok(()) => sink.emit(&AppEvent::StatusSent(status)),
        Err(error) => {
            warn!("status {} not sent: {}", status.token(), error);
            sink.emit(&AppEvent::SendFailed {
                what: "status",
                error,
            });
        }
    }
}
