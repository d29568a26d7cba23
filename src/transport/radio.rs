//! Radio link over a byte-oriented serial port.
//!
//! The radio module runs in transparent mode: every write goes on air as
//! one packet, but the receive side is a plain byte stream.  A downlink
//! frame can arrive split across several reads, or several frames can
//! arrive in one read, so [`RadioLink`] reassembles them:
//!
//! ```text
//!   read ──▶ rx buffer ──▶ resync on C0 00 00 (+ channel) ──▶ 7 + len (+ 4) bytes ──▶ Packet
//!                                     │
//!                                     └── idle for IDLE_GAP_POLLS polls ──▶ partial handed up as-is
//! ```
//!
//! A partial frame that stops growing is handed up after the idle gap so
//! the decoder reports it as discarded instead of it blocking the stream.

use heapless::Vec as HVec;
use log::{debug, warn};

use super::{Link, MAX_PACKET_LEN, Packet, Route};
use crate::error::LinkError;
use crate::protocol::downlink::{self, DownlinkOptions};

/// Polls without new bytes before a partial frame is given up on.
pub const IDLE_GAP_POLLS: u8 = 5;

const RX_CAPACITY: usize = MAX_PACKET_LEN;
const READ_CHUNK: usize = 64;
/// Offset of the channel byte in a downlink frame.
const CHANNEL_OFFSET: usize = 5;

/// Byte-oriented serial channel to the radio module.
pub trait SerialPort {
    /// Error type for this port.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data`, returning the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Check if data is available for reading.
    fn available(&self) -> bool;
}

pub struct RadioLink<S: SerialPort> {
    port: S,
    downlink: DownlinkOptions,
    rx: HVec<u8, RX_CAPACITY>,
    idle_polls: u8,
}

impl<S: SerialPort> RadioLink<S> {
    /// `downlink` decides whether inbound frames carry a checksum trailer.
    pub fn new(port: S, downlink: DownlinkOptions) -> Self {
        Self {
            port,
            downlink,
            rx: HVec::new(),
            idle_polls: 0,
        }
    }

    pub fn port(&self) -> &S {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    /// Bytes held for a frame that is not complete yet.
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Move whatever the port has into the rx buffer.  Returns the byte count.
    fn fill(&mut self) -> usize {
        let mut buf = [0u8; READ_CHUNK];
        let mut total = 0;
        while self.port.available() {
            let room = RX_CAPACITY - self.rx.len();
            if room == 0 {
                warn!("radio rx buffer full");
                break;
            }
            let want = room.min(READ_CHUNK);
            match self.port.read(&mut buf[..want]) {
                Ok(0) => break,
                Ok(n) => {
                    let _ = self.rx.extend_from_slice(&buf[..n]);
                    total += n;
                }
                Err(e) => {
                    warn!("radio read failed: {:?}", e);
                    break;
                }
            }
        }
        total
    }

    /// Drop bytes until the buffer starts with a plausible frame, keeping a
    /// tail that may be the start of the next prefix.
    fn resync(&mut self) {
        let prefix = &downlink::PREFIX[..];
        loop {
            let start = match self.rx.windows(prefix.len()).position(|w| w == prefix) {
                Some(0) => match self.rx.get(CHANNEL_OFFSET) {
                    Some(&ch) if ch != downlink::CHANNEL => 1,
                    _ => return,
                },
                Some(i) => i,
                None => self.rx.len() - self.prefix_tail(),
            };
            if start == 0 {
                return;
            }
            debug!("radio rx: skipped {} bytes before frame", start);
            self.consume(start);
        }
    }

    /// Length of the longest buffer suffix that is a proper prefix of the
    /// frame prefix.
    fn prefix_tail(&self) -> usize {
        let prefix = &downlink::PREFIX[..];
        (1..prefix.len())
            .rev()
            .find(|&k| self.rx.len() >= k && self.rx[self.rx.len() - k..] == prefix[..k])
            .unwrap_or(0)
    }

    /// Size of the frame at the head of the buffer, once all of it is here.
    fn complete_len(&self) -> Option<usize> {
        let declared = *self.rx.get(downlink::HEADER_LEN - 1)? as usize;
        let need = downlink::HEADER_LEN + declared + self.downlink.trailer_len();
        (self.rx.len() >= need).then_some(need)
    }

    fn take(&mut self, n: usize) -> Packet {
        let n = n.min(self.rx.len());
        let mut out = Packet::new();
        let _ = out.extend_from_slice(&self.rx[..n]);
        self.consume(n);
        out
    }

    fn consume(&mut self, n: usize) {
        let n = n.min(self.rx.len());
        self.rx.copy_within(n.., 0);
        self.rx.truncate(self.rx.len() - n);
    }
}

impl<S: SerialPort> Link for RadioLink<S> {
    fn send(&mut self, _route: Route, bytes: &[u8]) -> Result<(), LinkError> {
        let written = self.port.write(bytes).map_err(|e| {
            warn!("radio write failed: {:?}", e);
            LinkError::SendFailed
        })?;
        if written != bytes.len() {
            warn!("radio short write: {} of {} bytes", written, bytes.len());
            return Err(LinkError::SendFailed);
        }
        self.port.flush().map_err(|e| {
            warn!("radio flush failed: {:?}", e);
            LinkError::SendFailed
        })
    }

    fn poll(&mut self) -> Option<Packet> {
        let received = self.fill();
        self.resync();

        if let Some(len) = self.complete_len() {
            self.idle_polls = 0;
            debug!("radio rx frame of {} bytes", len);
            return Some(self.take(len));
        }
        if received > 0 || self.rx.is_empty() {
            self.idle_polls = 0;
            return None;
        }

        self.idle_polls = self.idle_polls.saturating_add(1);
        if self.idle_polls < IDLE_GAP_POLLS {
            return None;
        }
        self.idle_polls = 0;
        warn!("radio rx: partial frame of {} bytes went idle", self.rx.len());
        Some(self.take(self.rx.len()))
    }
}
