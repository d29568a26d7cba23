//! Application core: pure domain logic, zero I/O.
//!
//! The exchange control loop, the remote command dispatcher and the wire
//! codecs live here.  All interaction with hardware and transports happens
//! through **port traits** defined in [`ports`] and the
//! [`Link`](crate::transport::Link) trait, keeping this layer fully
//! testable without real peripherals.

pub mod channel;
pub mod dispatcher;
pub mod events;
pub mod ports;
pub mod service;
pub mod wire;
