//! Gatelink gate controller firmware library.
//!
//! Exposes the protocol, the exchange state machine and the application
//! core for integration testing and host tooling.  All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod protocol;
pub mod scheduler;
pub mod transport;

pub use error::{Error, Result};
