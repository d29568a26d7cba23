//! Message-bus link: the same packets carried over publish/subscribe topics.
//!
//! ```text
//!  radio-mimic gate   lora/device/<id>/uplink    ──▶  (binary frames)
//!                     lora/device/<id>/downlink  ◀──
//!  keypad lock        home/devices/<id>/request  ──▶  (signed JSON)
//!                     home/devices/<id>/status   ──▶  (acks, state)
//!                     home/devices/<id>/command  ◀──  (JSON commands)
//! ```
//!
//! Connection management (association, TLS, broker reconnects) belongs
//! to the [`BusClient`] implementation.

use log::debug;

use super::{Link, Packet, Route};
use crate::error::LinkError;

/// Minimal publish/subscribe client.
pub trait BusClient {
    /// Publish `payload` on `topic`.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError>;

    /// Next received `(topic, payload)`, if any.  Never blocks.
    fn try_next(&mut self) -> Option<(String, Packet)>;
}

/// Topic set for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// The only topic inbound packets are accepted from.
    pub inbound: String,
    pub uplink: String,
    pub request: String,
    pub status: String,
}

impl Topics {
    /// Binary frames mirrored onto the bus.
    pub fn radio_mimic(device_id: &str) -> Self {
        let uplink = format!("lora/device/{device_id}/uplink");
        Self {
            inbound: format!("lora/device/{device_id}/downlink"),
            request: uplink.clone(),
            status: uplink.clone(),
            uplink,
        }
    }

    /// Structured JSON keypad topics.
    pub fn keypad(device_id: &str) -> Self {
        let request = format!("home/devices/{device_id}/request");
        Self {
            inbound: format!("home/devices/{device_id}/command"),
            uplink: request.clone(),
            request,
            status: format!("home/devices/{device_id}/status"),
        }
    }

    pub fn for_route(&self, route: Route) -> &str {
        match route {
            Route::Uplink => &self.uplink,
            Route::Request => &self.request,
            Route::Status => &self.status,
        }
    }
}

pub struct BusLink<C: BusClient> {
    client: C,
    topics: Topics,
}

impl<C: BusClient> BusLink<C> {
    pub fn new(client: C, topics: Topics) -> Self {
        Self { client, topics }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }
}

impl<C: BusClient> Link for BusLink<C> {
    fn send(&mut self, route: Route, bytes: &[u8]) -> Result<(), LinkError> {
        let topic = self.topics.for_route(route);
        self.client.publish(topic, bytes)
    }

    fn poll(&mut self) -> Option<Packet> {
        while let Some((topic, payload)) = self.client.try_next() {
            if topic == self.topics.inbound {
                return Some(payload);
            }
            debug!("bus: ignoring message on {}", topic);
        }
        None
    }
}
