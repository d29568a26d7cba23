//! Gatelink Firmware: Main Entry Point
//!
//! Hexagonal architecture around one cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ServoGate        SerialTagReader   LogEventSink  SystemClock  │
//! │  (GateActuator)   (TagReader)       (EventSink)   (TimePort)   │
//! │  RadioLink<UartPort>   or   BusLink<MqttBus>       (Link)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          GateService (pure logic)                      │    │
//! │  │  Exchange FSM · Dispatcher · Heartbeat · WireCodec     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The device variant is chosen at build time with `GATELINK_VARIANT`
//! (`radio`, `bus` or `keypad`; default `radio`).
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution, config::TimerConfig};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::mqtt::client::MqttClientConfiguration;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use gatelink::adapters::log_sink::LogEventSink;
use gatelink::adapters::mqtt_bus::MqttBus;
use gatelink::adapters::tag_reader::{LineFormat, SerialTagReader};
use gatelink::adapters::time::SystemClock;
use gatelink::adapters::uart_radio::UartPort;
use gatelink::app::ports::{EventSink, GateActuator, TagReader, TimePort};
use gatelink::app::service::GateService;
use gatelink::app::wire::{BinaryWire, JsonWire, WireCodec};
use gatelink::config::DeviceConfig;
use gatelink::drivers::servo::ServoGate;
use gatelink::pins;
use gatelink::protocol::json::KeypadCredentials;
use gatelink::transport::Link;
use gatelink::transport::bus::{BusLink, Topics};
use gatelink::transport::radio::RadioLink;

const VARIANT: &str = match option_env!("GATELINK_VARIANT") {
    Some(v) => v,
    None => "radio",
};
const WIFI_SSID: &str = match option_env!("GATELINK_WIFI_SSID") {
    Some(v) => v,
    None => "",
};
const WIFI_PASS: &str = match option_env!("GATELINK_WIFI_PASS") {
    Some(v) => v,
    None => "",
};
const BROKER_URL: &str = match option_env!("GATELINK_BROKER_URL") {
    Some(v) => v,
    None => "mqtt://192.168.1.10:1883",
};
const KEYPAD_SALT: &str = match option_env!("GATELINK_KEYPAD_SALT") {
    Some(v) => v,
    None => "",
};
const KEYPAD_HMAC_KEY: &str = match option_env!("GATELINK_KEYPAD_HMAC_KEY") {
    Some(v) => v,
    None => "",
};

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Gatelink v{} ({})", env!("CARGO_PKG_VERSION"), VARIANT);
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;

    // ── 2. Configuration ──────────────────────────────────────
    let config = match VARIANT {
        "bus" => DeviceConfig::bus_gate(),
        "keypad" => DeviceConfig::keypad(),
        _ => DeviceConfig::radio_gate(),
    };
    config.validate()?;
    info!("Device '{}' ({:?})", config.device_id, config.device_type);

    // ── 3. Gate actuator ──────────────────────────────────────
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(Hertz(pins::SERVO_PWM_FREQ_HZ))
            .resolution(Resolution::Bits14),
    )?;
    let pwm = LedcDriver::new(peripherals.ledc.channel0, timer, peripherals.pins.gpio4)?;
    let relay = PinDriver::output(peripherals.pins.gpio5)?;
    let mut gate = ServoGate::with_relay(pwm, relay);
    gate.set_relay(false);
    gate.set_position(config.closed_angle);
    info!(
        "Gate servo on GPIO{}, relay on GPIO{}",
        pins::SERVO_PWM_GPIO,
        pins::RELAY_GPIO
    );

    // ── 4. Identifier reader ──────────────────────────────────
    let reader_uart = UartDriver::new(
        peripherals.uart2,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(pins::READER_BAUD)),
    )?;
    let format = if VARIANT == "keypad" {
        LineFormat::Passcode
    } else {
        LineFormat::HexUid
    };
    let mut reader = SerialTagReader::new(UartPort::new(reader_uart), format);

    let mut clock = SystemClock::new();
    let mut sink = LogEventSink::new();

    // ── 5. Transport + wire, then run ─────────────────────────
    if VARIANT == "radio" {
        let radio_uart = UartDriver::new(
            peripherals.uart1,
            peripherals.pins.gpio17,
            peripherals.pins.gpio18,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &UartConfig::new().baudrate(Hertz(pins::RADIO_BAUD)),
        )?;
        let link = RadioLink::new(UartPort::new(radio_uart), config.downlink);
        let wire = BinaryWire::from_config(&config);
        run(GateService::new(config, wire, link), &mut reader, &mut gate, &mut clock, &mut sink);
    }

    // Bus variants need the network up before the client can connect.
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID.try_into().map_err(|_| anyhow!("SSID too long"))?,
        password: WIFI_PASS.try_into().map_err(|_| anyhow!("password too long"))?,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi up");

    let mqtt_conf = MqttClientConfiguration {
        client_id: Some(config.device_id.as_str()),
        ..Default::default()
    };

    if VARIANT == "keypad" {
        let topics = Topics::keypad(&config.device_id);
        let bus = MqttBus::connect(BROKER_URL, &mqtt_conf, &topics)?;
        let creds = KeypadCredentials {
            salt: KEYPAD_SALT.as_bytes().to_vec(),
            hmac_key: KEYPAD_HMAC_KEY.as_bytes().to_vec(),
        };
        if creds.hmac_key.is_empty() {
            warn!("Keypad HMAC key not set; requests will not verify");
        }
        let wire = JsonWire::new(&config.device_id, creds);
        let link = BusLink::new(bus, topics);
        run(GateService::new(config, wire, link), &mut reader, &mut gate, &mut clock, &mut sink);
    }

    let topics = Topics::radio_mimic(&config.device_id);
    let bus = MqttBus::connect(BROKER_URL, &mqtt_conf, &topics)?;
    let wire = BinaryWire::from_config(&config);
    let link = BusLink::new(bus, topics);
    run(GateService::new(config, wire, link), &mut reader, &mut gate, &mut clock, &mut sink)
}

// ── Control loop ──────────────────────────────────────────────

fn run<W: WireCodec, L: Link>(
    mut service: GateService<W, L>,
    reader: &mut impl TagReader,
    gate: &mut impl GateActuator,
    clock: &mut impl TimePort,
    sink: &mut impl EventSink,
) -> ! {
    service.start(clock, sink);
    info!("System ready. Entering control loop.");

    let idle_ms = service.config().poll_interval_ms;
    loop {
        if let Some(Err(e)) = service.step(reader, gate, clock, sink) {
            warn!("Scan not processed: {}", e);
        }
        clock.delay_ms(idle_ms);
    }
}
