//! Exchanges over the serial radio link, with downlink bytes arriving in
//! pieces the way the module's UART delivers them.

use gatelink::app::service::GateService;
use gatelink::app::wire::BinaryWire;
use gatelink::config::DeviceConfig;
use gatelink::fsm::context::ExchangeOutcome;
use gatelink::protocol::cipher::CipherStage;
use gatelink::protocol::frame;
use gatelink::transport::radio::RadioLink;

use crate::mock_hw::{MockGate, RecordingSink, SimClock, TrickleSerial, downlink};

const CARD: [u8; 4] = [0x04, 0xA2, 0x13, 0x9B];
const PLAIN: CipherStage = CipherStage::None;

struct RadioRig {
    service: GateService<BinaryWire, RadioLink<TrickleSerial>>,
    gate: MockGate,
    clock: SimClock,
    sink: RecordingSink,
}

impl RadioRig {
    fn new() -> Self {
        let config = DeviceConfig::default();
        let clock = SimClock::new();
        let link = RadioLink::new(TrickleSerial::new(&clock), config.downlink);
        let wire = BinaryWire::from_config(&config);
        Self {
            service: GateService::new(config, wire, link),
            gate: MockGate::new(&clock),
            clock,
            sink: RecordingSink::new(),
        }
    }

    fn port_mut(&mut self) -> &mut TrickleSerial {
        self.service.channel_mut().link_mut().port_mut()
    }

    fn scan(&mut self) -> ExchangeOutcome {
        self.service
            .handle_scan(&CARD, &mut self.gate, &mut self.clock, &mut self.sink)
            .unwrap()
    }
}

#[test]
fn decision_split_across_polls_is_granted() {
    let mut rig = RadioRig::new();
    // 12 bytes, one per ms, straddling a poll boundary.
    rig.port_mut().trickle(95, 1, &downlink(b"GRANT", &PLAIN));

    assert_eq!(rig.scan(), ExchangeOutcome::Granted);
    let opened = rig.gate.moves_to(90);
    assert_eq!(opened.len(), 1);
    assert!((106..=110).contains(&opened[0]), "opened at {}", opened[0]);
}

#[test]
fn scan_goes_out_as_one_write() {
    let mut rig = RadioRig::new();
    rig.port_mut().trickle(20, 0, &downlink(b"DENY5", &PLAIN));

    assert_eq!(rig.scan(), ExchangeOutcome::Denied);
    let tx = &rig.service.channel().link().port().tx;
    let scan = frame::decode(&tx[0], &PLAIN).unwrap();
    assert_eq!(&scan.payload[..], &CARD);
}

#[test]
fn command_and_decision_in_one_burst() {
    let mut rig = RadioRig::new();
    let mut burst = downlink(b"REMOTE_LOCK:c1:ops", &PLAIN);
    burst.extend_from_slice(&downlink(b"GRANT", &PLAIN));
    rig.port_mut().trickle(50, 0, &burst);

    assert_eq!(rig.scan(), ExchangeOutcome::Granted);
    assert_eq!(rig.service.deferred_len(), 1);
}

#[test]
fn line_noise_before_decision_is_skipped() {
    let mut rig = RadioRig::new();
    let mut bytes = vec![0xFF, 0x00, 0xC0, 0x7E];
    bytes.extend_from_slice(&downlink(b"DENY5", &PLAIN));
    rig.port_mut().trickle(30, 2, &bytes);

    assert_eq!(rig.scan(), ExchangeOutcome::Denied);
    assert!(rig.gate.calls.is_empty());
}
