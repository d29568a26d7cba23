//! Shared mutable context threaded through every FSM handler.
//!
//! `ExchangeContext` is the blackboard the exchange handlers read from and
//! write to: the clock reading for this tick, the open exchange, the
//! decision delivered by the receiver, and the commands the handlers
//! raise for the control loop to carry out.

use crate::protocol::tokens::Decision;

// ---------------------------------------------------------------------------
// Exchange record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Granted,
    Denied,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Pending,
    Resolved(ExchangeOutcome),
}

/// One scan and the decision it is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// Sequence number of the SCAN frame, if the wire format has one.
    /// Diagnostic only; decisions are matched by content.
    pub sequence: Option<u16>,
    /// Monotonic time at which the exchange is abandoned.
    pub deadline_ms: u64,
    pub outcome: Resolution,
}

// ---------------------------------------------------------------------------
// Commands (written by state handlers; consumed by the control loop)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeCommands {
    /// Encode and transmit the SCAN frame now.
    pub transmit_scan: bool,
    /// Run the grant side effect (open, hold, close).
    pub actuate_grant: bool,
}

// ---------------------------------------------------------------------------
// ExchangeContext
// ---------------------------------------------------------------------------

pub struct ExchangeContext {
    // -- Timing --
    /// Clock reading for the current tick (milliseconds since boot).
    pub now_ms: u64,
    pub ticks_in_state: u64,
    pub total_ticks: u64,
    /// Window granted to the gateway to answer a scan.
    pub response_window_ms: u32,

    // -- Inputs --
    /// A sensor reported an identifier; start an exchange.
    pub scan_requested: bool,
    /// Decision delivered by the receiver since the last tick.
    pub inbound: Option<Decision>,

    // -- State --
    pub exchange: Option<Exchange>,
    pub last_outcome: Option<ExchangeOutcome>,

    // -- Outputs --
    pub commands: ExchangeCommands,
}

impl ExchangeContext {
    pub fn new(response_window_ms: u32) -> Self {
        Self {
            now_ms: 0,
            ticks_in_state: 0,
            total_ticks: 0,
            response_window_ms,
            scan_requested: false,
            inbound: None,
            exchange: None,
            last_outcome: None,
            commands: ExchangeCommands::default(),
        }
    }

    /// Whether the open exchange has passed its deadline.
    pub fn deadline_passed(&self) -> bool {
        self.exchange
            .is_some_and(|ex| self.now_ms >= ex.deadline_ms)
    }

    /// Record `outcome` on the open exchange.
    pub fn resolve(&mut self, outcome: ExchangeOutcome) {
        if let Some(ex) = self.exchange.as_mut() {
            ex.outcome = Resolution::Resolved(outcome);
        }
        self.last_outcome = Some(outcome);
    }
}
