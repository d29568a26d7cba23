//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::fsm::context::ExchangeOutcome;

/// Adapter that logs every [`AppEvent`] as one line.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | announced ONLINE"),
            AppEvent::ScanSent { sequence, id_len } => match sequence {
                Some(seq) => info!("SCAN | seq={} id_len={}", seq, id_len),
                None => info!("SCAN | signed request id_len={}", id_len),
            },
            AppEvent::ExchangeResolved(outcome) => {
                let verdict = match outcome {
                    ExchangeOutcome::Granted => "granted",
                    ExchangeOutcome::Denied => "denied",
                    ExchangeOutcome::TimedOut => "timed out",
                };
                info!("DECISION | {}", verdict);
            }
            AppEvent::StateChanged { from, to } => info!("STATE | {:?} -> {:?}", from, to),
            AppEvent::FrameDiscarded(e) => warn!("FRAME | discarded: {}", e),
            AppEvent::RemoteCommandExecuted { kind, duration_ms } => match duration_ms {
                Some(ms) => info!("REMOTE | {:?} done, held {}ms", kind, ms),
                None => info!("REMOTE | {:?} done", kind),
            },
            AppEvent::RemoteCommandRejected { kind, status } => {
                warn!("REMOTE | {:?} rejected: {}", kind, status.as_str());
            }
            AppEvent::ConfigUpdated => info!("CONFIG | remote limits updated"),
            AppEvent::StatusSent(status) => info!("STATUS | {}", status.token()),
            AppEvent::Heartbeat => info!("HEARTBEAT | alive"),
            AppEvent::SendFailed { what, error } => warn!("TX | {} failed: {}", what, error),
        }
    }
}
