//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GateService (domain)
//! ```
//!
//! Driven adapters (clock, gate actuator, tag reader, event sinks)
//! implement these traits.  The [`GateService`](super::service::GateService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.  The transport boundary lives in [`crate::transport::Link`].

use heapless::Vec as HVec;

use crate::protocol::frame::MAX_IDENTIFIER_LEN;

/// An identifier read by the access sensor (card UID, passcode digits).
pub type Identifier = HVec<u8, MAX_IDENTIFIER_LEN>;

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic clock plus the one blocking primitive the control loop uses.
pub trait TimePort {
    /// Milliseconds since boot.  Never goes backwards.
    fn now_ms(&self) -> u64;

    /// Block the control loop for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

pub trait GateActuator {
    /// Move the gate servo to `angle` degrees (0–180).
    fn set_position(&mut self, angle: u8);

    /// Energise or release the lock relay.
    fn set_relay(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

pub trait TagReader {
    /// Return a newly presented identifier, if any.  Never blocks.
    fn poll_tag(&mut self) -> Option<Identifier>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
