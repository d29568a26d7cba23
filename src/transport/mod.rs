//! Transport abstraction: any packet-oriented channel to the gateway.
//!
//! Concrete implementations:
//! - [`radio::RadioLink`]: point-to-point radio module behind a serial port
//! - [`bus::BusLink`]: publish/subscribe message bus (MQTT)
//!
//! The protocol layer and the control loop are generic over [`Link`], so
//! both device variants share one implementation of the protocol.

pub mod bus;
pub mod radio;

use heapless::Vec as HVec;

use crate::error::LinkError;

/// Largest packet either transport carries.
pub const MAX_PACKET_LEN: usize = 512;

pub type Packet = HVec<u8, MAX_PACKET_LEN>;

/// Logical destination of an outbound packet.  The radio has one
/// destination; the bus maps each route to a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Binary frames toward the gateway.
    Uplink,
    /// Signed access requests.
    Request,
    /// Acknowledgments and state reports.
    Status,
}

/// Packet channel to the gateway.
pub trait Link {
    /// Hand one packet to the transport.  An `Ok` means the transport
    /// accepted it, not that the gateway received it.
    fn send(&mut self, route: Route, bytes: &[u8]) -> Result<(), LinkError>;

    /// Return the next received packet, if any.  Never blocks.
    fn poll(&mut self) -> Option<Packet>;
}

/// Copy `bytes` into a [`Packet`].
pub fn packet(bytes: &[u8]) -> Result<Packet, LinkError> {
    Packet::from_slice(bytes).map_err(|_| LinkError::PacketTooLarge {
        len: bytes.len(),
        max: MAX_PACKET_LEN,
    })
}
