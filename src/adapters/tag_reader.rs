//! Line-oriented identifier reader.
//!
//! The reader bridge (RFID module or keypad controller) prints one
//! identifier per line on a serial port:
//!
//! ```text
//!   04 A2 13 9B\n      hex card UID   (LineFormat::HexUid)
//!   123456\n           keypad passcode (LineFormat::Passcode)
//! ```
//!
//! Bytes are accumulated across polls until a newline arrives.

use heapless::{Deque, Vec as HVec};
use log::{debug, warn};

use crate::app::ports::{Identifier, TagReader};
use crate::transport::radio::SerialPort;

const LINE_CAPACITY: usize = 64;
const RX_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// Hex byte pairs; spaces and colons between pairs are ignored.
    HexUid,
    /// ASCII digits, carried verbatim.
    Passcode,
}

pub struct SerialTagReader<S: SerialPort> {
    port: S,
    format: LineFormat,
    rx: Deque<u8, RX_CAPACITY>,
    line: HVec<u8, LINE_CAPACITY>,
    overflowed: bool,
}

impl<S: SerialPort> SerialTagReader<S> {
    pub fn new(port: S, format: LineFormat) -> Self {
        Self {
            port,
            format,
            rx: Deque::new(),
            line: HVec::new(),
            overflowed: false,
        }
    }

    fn finish_line(&mut self) -> Option<Identifier> {
        let overflowed = core::mem::take(&mut self.overflowed);
        let line = core::mem::take(&mut self.line);
        if overflowed {
            warn!("reader: line too long, dropped");
            return None;
        }
        let parsed = parse_line(&line, self.format);
        if parsed.is_none() && !line.is_empty() {
            warn!("reader: unparsable line ({} bytes)", line.len());
        }
        parsed
    }
}

impl<S: SerialPort> TagReader for SerialTagReader<S> {
    fn poll_tag(&mut self) -> Option<Identifier> {
        self.fill();
        while let Some(b) = self.rx.pop_front() {
            if b != b'\n' {
                self.push(b);
                continue;
            }
            if let Some(id) = self.finish_line() {
                debug!("reader: identifier of {} bytes", id.len());
                return Some(id);
            }
        }
        None
    }
}

impl<S: SerialPort> SerialTagReader<S> {
    /// Move whatever the port has into the receive queue.
    fn fill(&mut self) {
        let mut buf = [0u8; LINE_CAPACITY];
        while self.port.available() {
            let n = match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("reader: read failed: {:?}", e);
                    break;
                }
            };
            for &b in &buf[..n] {
                if self.rx.push_back(b).is_err() {
                    warn!("reader: receive queue full, byte dropped");
                }
            }
        }
    }

    fn push(&mut self, b: u8) {
        if b == b'\r' {
            return;
        }
        if self.line.push(b).is_err() {
            self.overflowed = true;
        }
    }
}

/// Parse one line (without terminator).  `None` for empty, malformed, or
/// over-long identifiers.
pub fn parse_line(line: &[u8], format: LineFormat) -> Option<Identifier> {
    let mut id = Identifier::new();
    match format {
        LineFormat::HexUid => {
            let mut digits = HVec::<u8, LINE_CAPACITY>::new();
            for &b in line.iter().filter(|b| !matches!(b, b' ' | b':' | b'\t')) {
                digits.push(b).ok()?;
            }
            // Odd digit counts are refused by the decoder.
            id.resize_default(digits.len() / 2).ok()?;
            hex::decode_to_slice(&digits, &mut id).ok()?;
        }
        LineFormat::Passcode => {
            for &b in line.iter().filter(|b| !b.is_ascii_whitespace()) {
                if !b.is_ascii_digit() {
                    return None;
                }
                id.push(b).ok()?;
            }
        }
    }
    (!id.is_empty()).then_some(id)
}
