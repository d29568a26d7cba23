//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements   | Connects to                    |
//! |--------------|--------------|--------------------------------|
//! | `log_sink`   | EventSink    | Serial log output              |
//! | `tag_reader` | TagReader    | RFID / keypad bridge on a UART |
//! | `time`       | TimePort     | ESP32 system timer             |
//! | `uart_radio` | SerialPort   | ESP-IDF UART (radio modem)     |
//! | `mqtt_bus`   | BusClient    | ESP-IDF MQTT client            |

pub mod log_sink;
pub mod tag_reader;
pub mod time;

#[cfg(target_os = "espidf")]
pub mod mqtt_bus;
#[cfg(target_os = "espidf")]
pub mod uart_radio;
