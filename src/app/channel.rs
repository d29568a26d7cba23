//! Uplink sender and downlink receiver: a wire codec bound to a link.

use log::{debug, warn};

use super::wire::{DecodeContext, Outbound, WireCodec};
use crate::config::RemoteConfig;
use crate::error::{Error, FrameError};
use crate::protocol::Inbound;
use crate::protocol::command::Ack;
use crate::protocol::tokens::GateStatus;
use crate::transport::Link;

pub struct Channel<W: WireCodec, L: Link> {
    wire: W,
    link: L,
}

impl<W: WireCodec, L: Link> Channel<W, L> {
    pub fn new(wire: W, link: L) -> Self {
        Self { wire, link }
    }

    /// Encode and transmit a SCAN.  Returns the frame sequence, if any.
    pub fn send_scan(&mut self, identifier: &[u8], now_ms: u64) -> Result<Option<u16>, Error> {
        let out = self.wire.encode_scan(identifier, now_ms)?;
        self.transmit(&out, "scan")?;
        Ok(out.sequence)
    }

    pub fn send_status(&mut self, status: GateStatus, now_ms: u64) -> Result<(), Error> {
        let out = self.wire.encode_status(status, now_ms)?;
        self.transmit(&out, status.token())
    }

    pub fn send_ack(&mut self, ack: &Ack, now_ms: u64) -> Result<(), Error> {
        let out = self.wire.encode_ack(ack, now_ms)?;
        self.transmit(&out, ack.status.as_str())
    }

    /// Take one packet off the link and decode it.
    ///
    /// `None` when nothing arrived; `Some(Err)` for a packet that failed
    /// validation.
    pub fn poll(&mut self, remote: &RemoteConfig, now_ms: u64) -> Option<Result<Inbound, FrameError>> {
        let packet = self.link.poll()?;
        let ctx = DecodeContext { remote, now_ms };
        let decoded = self.wire.decode(&packet, &ctx);
        if let Err(e) = &decoded {
            warn!("discarding inbound packet ({} bytes): {}", packet.len(), e);
        }
        Some(decoded)
    }

    pub fn wire(&self) -> &W {
        &self.wire
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    fn transmit(&mut self, out: &Outbound, what: &str) -> Result<(), Error> {
        self.link.send(out.route, &out.bytes)?;
        debug!(
            "tx {} ({} bytes, seq={:?}, route={:?})",
            what,
            out.bytes.len(),
            out.sequence,
            out.route
        );
        Ok(())
    }
}
