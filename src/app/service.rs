//! Application service, the hexagonal core.
//!
//! [`GateService`] owns the exchange FSM, the channel (wire codec + link),
//! the remote command dispatcher and the heartbeat timer.  All hardware
//! access flows through port traits injected at call sites, so the whole
//! service runs under test with mock adapters and a simulated clock.
//!
//! ```text
//!   TagReader ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          GateService         │
//! GateActuator ◀──│  FSM · Dispatcher · Heartbeat│◀──▶ Channel ◀──▶ Link
//!                 └──────────────────────────────┘
//! ```
//!
//! The service is single-threaded and cooperative.  [`handle_scan`] blocks
//! until the exchange resolves (bounded by the response window) and an
//! unlock blocks for its hold time; everything else returns promptly.
//!
//! [`handle_scan`]: GateService::handle_scan

use heapless::Deque;
use log::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::fsm::context::{ExchangeContext, ExchangeOutcome};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::protocol::Inbound;
use crate::protocol::frame::MAX_IDENTIFIER_LEN;
use crate::protocol::tokens::GateStatus;
use crate::scheduler::Heartbeat;
use crate::transport::Link;

use super::channel::Channel;
use super::dispatcher::{self, Dispatcher};
use super::events::AppEvent;
use super::ports::{EventSink, GateActuator, TagReader, TimePort};
use super::wire::WireCodec;

/// Remote commands that can wait for an exchange to finish.
pub const DEFERRED_CAPACITY: usize = 4;

// ───────────────────────────────────────────────────────────────
// GateService
// ───────────────────────────────────────────────────────────────

pub struct GateService<W: WireCodec, L: Link> {
    config: DeviceConfig,
    fsm: Fsm,
    ctx: ExchangeContext,
    channel: Channel<W, L>,
    dispatcher: Dispatcher,
    heartbeat: Heartbeat,
    /// Commands and config updates that arrived mid-exchange.
    deferred: Deque<Inbound, DEFERRED_CAPACITY>,
}

impl<W: WireCodec, L: Link> GateService<W, L> {
    /// Build the service.  The FSM is started in `Idle`; call [`start`]
    /// to announce the device.
    ///
    /// [`start`]: Self::start
    pub fn new(config: DeviceConfig, wire: W, link: L) -> Self {
        let mut ctx = ExchangeContext::new(config.response_window_ms);
        let mut fsm = Fsm::new(build_state_table(), StateId::Idle);
        fsm.start(&mut ctx);

        Self {
            dispatcher: Dispatcher::new(&config),
            heartbeat: Heartbeat::new(config.heartbeat_interval_ms, 0),
            channel: Channel::new(wire, link),
            deferred: Deque::new(),
            fsm,
            ctx,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the device with an `ONLINE` status and arm the heartbeat.
    pub fn start(&mut self, clock: &impl TimePort, sink: &mut impl EventSink) {
        let now = clock.now_ms();
        self.heartbeat.reset(now);
        dispatcher::send_status(&mut self.channel, now, sink, GateStatus::Online);
        sink.emit(&AppEvent::Started);
        info!(
            "GateService started: device '{}' ({:?})",
            self.config.device_id, self.config.device_type
        );
    }

    // ── Cooperative loop ──────────────────────────────────────

    /// One loop iteration without a scan: heartbeat, deferred commands,
    /// then at most one inbound packet.
    pub fn poll_once(
        &mut self,
        hw: &mut impl GateActuator,
        clock: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) {
        let now = clock.now_ms();
        if self.heartbeat.due(now) {
            dispatcher::send_status(&mut self.channel, now, sink, GateStatus::Heartbeat);
            sink.emit(&AppEvent::Heartbeat);
        }

        while let Some(inbound) = self.deferred.pop_front() {
            self.handle_inbound(inbound, hw, clock, sink);
        }

        match self.channel.poll(&self.config.remote, clock.now_ms()) {
            Some(Ok(inbound)) => self.handle_inbound(inbound, hw, clock, sink),
            Some(Err(e)) => sink.emit(&AppEvent::FrameDiscarded(e)),
            None => {}
        }
    }

    /// [`poll_once`](Self::poll_once), then run an exchange if the reader
    /// has an identifier.
    pub fn step(
        &mut self,
        reader: &mut impl TagReader,
        hw: &mut impl GateActuator,
        clock: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> Option<Result<ExchangeOutcome>> {
        self.poll_once(hw, clock, sink);
        let identifier = reader.poll_tag()?;
        Some(self.handle_scan(&identifier, hw, clock, sink))
    }

    // ── Exchange ──────────────────────────────────────────────

    /// Send a SCAN for `identifier` and block until the gateway decides or
    /// the response window closes.
    ///
    /// A grant opens the gate, holds it, and closes it again before this
    /// returns.  Remote commands that arrive meanwhile are deferred to the
    /// next [`poll_once`](Self::poll_once).
    pub fn handle_scan(
        &mut self,
        identifier: &[u8],
        hw: &mut impl GateActuator,
        clock: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> Result<ExchangeOutcome> {
        if identifier.is_empty() || identifier.len() > MAX_IDENTIFIER_LEN {
            warn!("SCAN | identifier of {} bytes refused", identifier.len());
            return Err(Error::InvalidIdentifier {
                len: identifier.len(),
            });
        }

        // Idle -> ScanSent
        self.ctx.now_ms = clock.now_ms();
        self.ctx.scan_requested = true;
        self.tick_fsm(sink);

        if core::mem::take(&mut self.ctx.commands.transmit_scan) {
            match self.channel.send_scan(identifier, self.ctx.now_ms) {
                Ok(sequence) => {
                    if let Some(ex) = self.ctx.exchange.as_mut() {
                        ex.sequence = sequence;
                    }
                    info!("SCAN | {} byte identifier, seq={:?}", identifier.len(), sequence);
                    sink.emit(&AppEvent::ScanSent {
                        sequence,
                        id_len: identifier.len(),
                    });
                }
                Err(error) => {
                    warn!("SCAN | not sent: {}", error);
                    sink.emit(&AppEvent::SendFailed { what: "scan", error });
                    self.transition(StateId::Idle, sink);
                    return Err(error);
                }
            }
        }

        // ScanSent -> AwaitingDecision
        self.tick_fsm(sink);

        loop {
            self.ctx.now_ms = clock.now_ms();
            self.receive_during_exchange(sink);
            self.tick_fsm(sink);
            if self.fsm.current_state().is_resolved() {
                break;
            }
            clock.delay_ms(self.config.poll_interval_ms);
        }

        let outcome = self.ctx.last_outcome.unwrap_or(ExchangeOutcome::TimedOut);
        info!("DECISION | {:?}", outcome);

        if core::mem::take(&mut self.ctx.commands.actuate_grant) {
            self.actuate_grant(hw, clock, sink);
        }
        sink.emit(&AppEvent::ExchangeResolved(outcome));

        // Resolved -> Idle
        self.ctx.now_ms = clock.now_ms();
        self.tick_fsm(sink);
        Ok(outcome)
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn current_state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn channel(&self) -> &Channel<W, L> {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Channel<W, L> {
        &mut self.channel
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Drain the link while a decision is pending.  Decisions go to the
    /// FSM; commands wait for the exchange to finish.
    fn receive_during_exchange(&mut self, sink: &mut impl EventSink) {
        let now = self.ctx.now_ms;
        while let Some(result) = self.channel.poll(&self.config.remote, now) {
            match result {
                Ok(Inbound::Decision(decision)) if self.ctx.inbound.is_none() => {
                    debug!("DECISION | received {:?}", decision);
                    self.ctx.inbound = Some(decision);
                }
                Ok(Inbound::Decision(decision)) => {
                    debug!("DECISION | extra {:?} ignored", decision);
                }
                Ok(Inbound::Unrecognized) => {
                    debug!("DECISION | unrecognized payload ignored");
                }
                Ok(deferred) => self.defer(deferred),
                Err(e) => sink.emit(&AppEvent::FrameDiscarded(e)),
            }
        }
    }

    fn defer(&mut self, inbound: Inbound) {
        match self.deferred.push_back(inbound) {
            Ok(()) => debug!("REMOTE | deferred until exchange resolves"),
            Err(dropped) => warn!("REMOTE | deferred queue full, dropping {:?}", dropped),
        }
    }

    fn handle_inbound(
        &mut self,
        inbound: Inbound,
        hw: &mut impl GateActuator,
        clock: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) {
        match inbound {
            Inbound::Decision(decision) => {
                debug!("DECISION | {:?} with no open exchange, ignored", decision);
            }
            Inbound::Command(command) => {
                self.dispatcher.dispatch(
                    &command,
                    &self.config.remote,
                    &mut self.channel,
                    hw,
                    clock,
                    sink,
                );
            }
            Inbound::ConfigUpdate(update) => {
                self.dispatcher.apply_config(
                    &update,
                    &mut self.config.remote,
                    &mut self.channel,
                    &*clock,
                    sink,
                );
            }
            Inbound::Unrecognized => debug!("inbound payload not recognized, ignored"),
        }
    }

    /// Open, report, hold, close, report.
    fn actuate_grant(
        &mut self,
        hw: &mut impl GateActuator,
        clock: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) {
        hw.set_relay(true);
        hw.set_position(self.config.open_angle);
        dispatcher::send_status(&mut self.channel, clock.now_ms(), sink, GateStatus::Opened);

        clock.delay_ms(self.config.grant_hold_ms);

        hw.set_position(self.config.closed_angle);
        hw.set_relay(false);
        dispatcher::send_status(&mut self.channel, clock.now_ms(), sink, GateStatus::Closed);
    }

    fn tick_fsm(&mut self, sink: &mut impl EventSink) {
        let from = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        let to = self.fsm.current_state();
        if from != to {
            sink.emit(&AppEvent::StateChanged { from, to });
        }
    }

    fn transition(&mut self, to: StateId, sink: &mut impl EventSink) {
        let from = self.fsm.current_state();
        self.fsm.force_transition(to, &mut self.ctx);
        if from != to {
            sink.emit(&AppEvent::StateChanged { from, to });
        }
    }
}
