//! GPIO / peripheral pin assignments for the gate controller board.
//!
//! Every adapter and driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Gate actuator
// ---------------------------------------------------------------------------

/// LEDC PWM output driving the gate servo.
pub const SERVO_PWM_GPIO: i32 = 4;
/// Digital output: lock relay (active HIGH).
pub const RELAY_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Radio modem (UART1)
// ---------------------------------------------------------------------------

pub const RADIO_TX_GPIO: i32 = 17;
pub const RADIO_RX_GPIO: i32 = 18;
pub const RADIO_BAUD: u32 = 9_600;

// ---------------------------------------------------------------------------
// Tag reader bridge (UART2)
// ---------------------------------------------------------------------------

/// The reader bridge prints one hex-encoded UID per line.
pub const READER_TX_GPIO: i32 = 8;
pub const READER_RX_GPIO: i32 = 9;
pub const READER_BAUD: u32 = 115_200;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// Hobby servo frame rate (20 ms period).
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// LEDC timer resolution (bits).
pub const PWM_RESOLUTION_BITS: u32 = 14;
