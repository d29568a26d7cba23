//! ESP-IDF UART adapter for the radio modem and the reader bridge.
//!
//! Implements [`SerialPort`] over `esp_idf_hal::uart::UartDriver`.  Reads
//! never block: only bytes already in the driver's RX ring are returned.

use esp_idf_hal::delay::{NON_BLOCK, TickType};
use esp_idf_hal::uart::UartDriver;
use esp_idf_svc::sys::EspError;

use crate::transport::radio::SerialPort;

/// Time allowed for a packet to drain from the TX FIFO.
const TX_DONE_TIMEOUT_MS: u64 = 200;

pub struct UartPort<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartPort<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }
}

impl SerialPort for UartPort<'_> {
    type Error = EspError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
        self.uart.read(buf, NON_BLOCK)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
        self.uart.write(data)
    }

    fn flush(&mut self) -> Result<(), EspError> {
        let ticks = TickType::new_millis(TX_DONE_TIMEOUT_MS).ticks();
        self.uart.wait_tx_done(ticks)
    }

    fn available(&self) -> bool {
        self.uart.remaining_read().is_ok_and(|n| n > 0)
    }
}
