//! Gate servo and lock relay driver.
//!
//! Drives a hobby servo through any `embedded-hal` PWM channel running at
//! 50 Hz, plus an optional relay on a digital output.
//!
//! ```text
//!   angle 0° ─────────── 90° ─────────── 180°
//!   pulse 500 µs ─────── 1500 µs ─────── 2500 µs   (of a 20 ms period)
//! ```
//!
//! This driver is a dumb actuator: timing (settle, hold) belongs to the
//! application core.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::GateActuator;

pub const MIN_PULSE_US: u32 = 500;
pub const MAX_PULSE_US: u32 = 2_500;
pub const PERIOD_US: u32 = 20_000;
pub const MAX_ANGLE: u8 = 180;

/// Duty-cycle value for `angle` on a channel whose full scale is `max_duty`.
pub fn angle_to_duty(angle: u8, max_duty: u16) -> u16 {
    let angle = u32::from(angle.min(MAX_ANGLE));
    let pulse_us = MIN_PULSE_US + (MAX_PULSE_US - MIN_PULSE_US) * angle / u32::from(MAX_ANGLE);
    (u32::from(max_duty) * pulse_us / PERIOD_US) as u16
}

/// Stand-in for boards without a lock relay.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRelay;

impl ErrorType for NoRelay {
    type Error = Infallible;
}

impl OutputPin for NoRelay {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

pub struct ServoGate<P: SetDutyCycle, R: OutputPin = NoRelay> {
    pwm: P,
    relay: R,
    angle: Option<u8>,
    relay_on: bool,
}

impl<P: SetDutyCycle> ServoGate<P, NoRelay> {
    pub fn new(pwm: P) -> Self {
        Self::with_relay(pwm, NoRelay)
    }
}

impl<P: SetDutyCycle, R: OutputPin> ServoGate<P, R> {
    pub fn with_relay(pwm: P, relay: R) -> Self {
        Self {
            pwm,
            relay,
            angle: None,
            relay_on: false,
        }
    }

    /// Last commanded angle; `None` before the first move.
    pub fn angle(&self) -> Option<u8> {
        self.angle
    }

    pub fn relay_on(&self) -> bool {
        self.relay_on
    }
}

impl<P: SetDutyCycle, R: OutputPin> GateActuator for ServoGate<P, R> {
    fn set_position(&mut self, angle: u8) {
        let duty = angle_to_duty(angle, self.pwm.max_duty_cycle());
        match self.pwm.set_duty_cycle(duty) {
            Ok(()) => self.angle = Some(angle.min(MAX_ANGLE)),
            Err(e) => warn!("servo: set {}° failed: {:?}", angle, e),
        }
    }

    fn set_relay(&mut self, on: bool) {
        let result = if on { self.relay.set_high() } else { self.relay.set_low() };
        match result {
            Ok(()) => self.relay_on = on,
            Err(e) => warn!("relay: switch {} failed: {:?}", if on { "on" } else { "off" }, e),
        }
    }
}
