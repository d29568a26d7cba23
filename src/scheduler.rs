//! Cooperative periodic housekeeping.
//!
//! The control loop asks each timer once per iteration whether it is due.
//! Nothing here blocks or owns a thread.
//!
//! ```text
//!   loop ──▶ heartbeat.due(now)? ──yes──▶ send ALIVE
//!     │
//!     └────▶ poll transport, dispatch, scan ...
//! ```

use log::debug;

/// Fires every `interval_ms`, measured from the last time it fired.
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    label: &'static str,
    interval_ms: u32,
    last_fired_ms: u64,
}

impl PeriodicTimer {
    /// A timer whose first period starts at `now_ms`.  Zero disables it.
    pub fn new(label: &'static str, interval_ms: u32, now_ms: u64) -> Self {
        Self {
            label,
            interval_ms,
            last_fired_ms: now_ms,
        }
    }

    /// True once per elapsed interval; re-arms itself when it fires.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if self.interval_ms == 0 {
            return false;
        }
        if now_ms.saturating_sub(self.last_fired_ms) < u64::from(self.interval_ms) {
            return false;
        }
        self.last_fired_ms = now_ms;
        debug!("timer '{}' fired at {}ms", self.label, now_ms);
        true
    }

    /// Restart the current period at `now_ms`.
    pub fn reset(&mut self, now_ms: u64) {
        self.last_fired_ms = now_ms;
    }
}

/// Liveness report timer.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    timer: PeriodicTimer,
}

impl Heartbeat {
    pub fn new(interval_ms: u32, now_ms: u64) -> Self {
        Self {
            timer: PeriodicTimer::new("heartbeat", interval_ms, now_ms),
        }
    }

    pub fn due(&mut self, now_ms: u64) -> bool {
        self.timer.due(now_ms)
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.timer.reset(now_ms);
    }
}
