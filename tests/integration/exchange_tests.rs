//! End-to-end scan/decision exchanges against the binary wire format.

use gatelink::app::events::AppEvent;
use gatelink::app::ports::TimePort;
use gatelink::config::DeviceConfig;
use gatelink::error::{Error, FrameError, LinkError};
use gatelink::fsm::StateId;
use gatelink::fsm::context::ExchangeOutcome;
use gatelink::protocol::cipher::{CipherStage, DEFAULT_XOR_KEY};
use gatelink::protocol::downlink::{self, DownlinkOptions};
use gatelink::protocol::frame::{DeviceType, MsgType, PROTOCOL_VERSION};
use gatelink::protocol::tokens::GateStatus;
use gatelink::transport::Route;
use proptest::prelude::*;

use crate::mock_hw::{GateCall, binary_rig, downlink, status_texts, uplink_frames};

const CARD: [u8; 4] = [0x04, 0xA2, 0x13, 0x9B];
const PLAIN: CipherStage = CipherStage::None;

// ── Scenario A: grant ─────────────────────────────────────────

#[test]
fn grant_opens_holds_and_closes() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut().deliver_at(200, &downlink(b"GRANT", &PLAIN));

    let outcome = rig.scan(&CARD).unwrap();
    assert_eq!(outcome, ExchangeOutcome::Granted);
    assert_eq!(rig.service.current_state(), StateId::Idle);

    assert_eq!(
        rig.gate.call_list(),
        vec![
            GateCall::Relay(true),
            GateCall::Position(90),
            GateCall::Position(0),
            GateCall::Relay(false),
        ]
    );
    // Held for the configured grant time.
    assert_eq!(rig.gate.moves_to(90), vec![200]);
    assert_eq!(rig.gate.moves_to(0), vec![5_200]);

    assert_eq!(status_texts(rig.link(), &PLAIN), vec!["open", "clos"]);
}

#[test]
fn scan_frame_layout() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.clock.set(3_500);
    rig.link_mut().deliver_at(3_500, &downlink(b"DENY5", &PLAIN));
    rig.scan(&CARD).unwrap();

    let sent = &rig.link().sent[0];
    assert_eq!(sent.route, Route::Uplink);
    assert_eq!(&sent.bytes[..3], &[0x00, 0x02, 0x17]);
    assert_eq!(sent.bytes[3], (1 << 4) | PROTOCOL_VERSION);
    assert_eq!(sent.bytes[11], 4);
    assert_eq!(sent.bytes.len(), 12 + 4 + 4);

    let frames = uplink_frames(rig.link(), &PLAIN);
    assert_eq!(frames[0].header.msg_type, MsgType::Scan);
    assert_eq!(frames[0].header.device_type, DeviceType::Gate);
    assert_eq!(frames[0].header.sequence, 0);
    assert_eq!(frames[0].header.timestamp, 3);
    assert_eq!(&frames[0].payload[..], &CARD);
}

#[test]
fn grant_event_trail() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut().deliver_at(0, &downlink(b"GRANT", &PLAIN));
    rig.scan(&CARD).unwrap();

    let expected = [
        AppEvent::StateChanged { from: StateId::Idle, to: StateId::ScanSent },
        AppEvent::ScanSent { sequence: Some(0), id_len: 4 },
        AppEvent::StateChanged { from: StateId::ScanSent, to: StateId::AwaitingDecision },
        AppEvent::StateChanged { from: StateId::AwaitingDecision, to: StateId::Granted },
        AppEvent::StatusSent(GateStatus::Opened),
        AppEvent::StatusSent(GateStatus::Closed),
        AppEvent::ExchangeResolved(ExchangeOutcome::Granted),
        AppEvent::StateChanged { from: StateId::Granted, to: StateId::Idle },
    ];
    assert_eq!(rig.sink.events, expected);
}

// ── Scenario B: deny ──────────────────────────────────────────

#[test]
fn deny_leaves_gate_untouched() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut().deliver_at(100, &downlink(b"DENY5", &PLAIN));

    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::Denied);
    assert!(rig.gate.calls.is_empty());
    assert_eq!(rig.link().sent.len(), 1, "only the SCAN goes out");
    assert_eq!(rig.clock.now_ms(), 100);
}

// ── Scenario C: timeout ───────────────────────────────────────

#[test]
fn silence_times_out_at_deadline() {
    let mut rig = binary_rig(DeviceConfig::default());

    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::TimedOut);
    assert_eq!(rig.clock.now_ms(), 12_000);
    assert!(rig.gate.calls.is_empty());
    assert!(rig.clock.delays.iter().all(|&d| d == 10));
    assert_eq!(rig.service.current_state(), StateId::Idle);
}

#[test]
fn late_grant_after_timeout_is_ignored() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut().deliver_at(12_500, &downlink(b"GRANT", &PLAIN));

    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::TimedOut);
    rig.clock.set(13_000);
    rig.poll();
    assert!(rig.gate.calls.is_empty());
    assert_eq!(rig.link().pending(), 0, "stray decision consumed");
    assert_eq!(rig.link().sent.len(), 1);
}

// ── Discarded input ───────────────────────────────────────────

#[test]
fn malformed_frames_are_discarded_and_waiting_continues() {
    let mut rig = binary_rig(DeviceConfig::default());
    let mut wrong_channel = downlink(b"GRANT", &PLAIN);
    wrong_channel[5] = 0x18;
    let mut short = downlink(b"GRANT", &PLAIN);
    short.truncate(9);

    rig.link_mut().deliver_at(10, &wrong_channel);
    rig.link_mut().deliver_at(20, &short);
    rig.link_mut().deliver_at(30, b"GARBAGE");
    rig.link_mut().deliver_at(40, &downlink(b"HELLO", &PLAIN));
    rig.link_mut().deliver_at(50, &downlink(b"GRANT", &PLAIN));

    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::Granted);

    let discarded: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::FrameDiscarded(err) => Some(*err),
            _ => None,
        })
        .collect();
    assert_eq!(
        discarded,
        vec![
            FrameError::BadChannel { found: 0x18 },
            FrameError::LengthMismatch { declared: 5, actual: 9 },
            FrameError::BadMagic,
        ]
    );
}

#[test]
fn checksum_trailer_verified_when_enabled() {
    let mut config = DeviceConfig::default();
    config.downlink.verify_checksum = true;
    let mut rig = binary_rig(config);

    let opts = DownlinkOptions { verify_checksum: true };
    let mut corrupted = downlink::encode(b"GRANT", opts, &PLAIN).unwrap().to_vec();
    corrupted[8] ^= 0x01;
    let good = downlink::encode(b"DENY5", opts, &PLAIN).unwrap();

    rig.link_mut().deliver_at(10, &corrupted);
    rig.link_mut().deliver_at(20, &good);

    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::Denied);
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::FrameDiscarded(FrameError::ChecksumMismatch { .. })
        )),
        1
    );
}

// ── Identifier and transport failures ─────────────────────────

#[test]
fn invalid_identifier_sends_nothing() {
    let mut rig = binary_rig(DeviceConfig::default());
    assert_eq!(rig.scan(&[0u8; 11]), Err(Error::InvalidIdentifier { len: 11 }));
    assert_eq!(rig.scan(&[]), Err(Error::InvalidIdentifier { len: 0 }));
    assert!(rig.link().sent.is_empty());
    assert_eq!(rig.service.current_state(), StateId::Idle);
}

#[test]
fn ten_byte_identifier_accepted() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut().deliver_at(0, &downlink(b"DENY5", &PLAIN));
    assert_eq!(rig.scan(&[0xAB; 10]).unwrap(), ExchangeOutcome::Denied);
    assert_eq!(rig.link().sent[0].bytes[11], 10);
}

#[test]
fn send_failure_is_reported_and_fsm_returns_idle() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut().fail_sends = true;

    assert_eq!(rig.scan(&CARD), Err(Error::Link(LinkError::SendFailed)));
    assert_eq!(rig.service.current_state(), StateId::Idle);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::SendFailed { what: "scan", .. })),
        1
    );

    // Next scan works once the link recovers.
    rig.link_mut().fail_sends = false;
    rig.link_mut().deliver_at(0, &downlink(b"DENY5", &PLAIN));
    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::Denied);
}

// ── Sequencing, announcement, heartbeat ───────────────────────

#[test]
fn sequence_numbers_increase_across_messages() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.start();
    rig.link_mut().deliver_at(0, &downlink(b"GRANT", &PLAIN));
    rig.scan(&CARD).unwrap();
    let now = rig.clock.now_ms();
    rig.link_mut().deliver_at(now, &downlink(b"DENY5", &PLAIN));
    rig.scan(&CARD).unwrap();

    let seqs: Vec<u16> = uplink_frames(rig.link(), &PLAIN)
        .iter()
        .map(|f| f.header.sequence)
        .collect();
    // ONLINE, SCAN, open, clos, SCAN
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
}

#[test]
fn boot_announcement_and_heartbeat() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.start();
    assert!(rig.sink.events.contains(&AppEvent::Started));

    rig.clock.set(59_999);
    rig.poll();
    rig.clock.set(60_000);
    rig.poll();
    rig.clock.set(60_500);
    rig.poll();
    rig.clock.set(120_000);
    rig.poll();

    assert_eq!(status_texts(rig.link(), &PLAIN), vec!["ONLINE", "ALIVE", "ALIVE"]);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::Heartbeat), 2);
}

#[test]
fn decision_with_no_open_exchange_is_consumed() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut().deliver_at(0, &downlink(b"GRANT", &PLAIN));
    rig.poll();
    assert_eq!(rig.link().pending(), 0);
    assert!(rig.gate.calls.is_empty());
    assert!(rig.link().sent.is_empty());
}

#[test]
fn step_runs_exchange_for_presented_tag() {
    let mut rig = binary_rig(DeviceConfig::default());
    let mut tags = crate::mock_hw::ScriptedTags::new(&[&CARD]);
    // After the idle poll that precedes the scan.
    rig.link_mut().deliver_at(1, &downlink(b"GRANT", &PLAIN));

    let result = rig
        .service
        .step(&mut tags, &mut rig.gate, &mut rig.clock, &mut rig.sink);
    assert_eq!(result, Some(Ok(ExchangeOutcome::Granted)));

    let idle = rig
        .service
        .step(&mut tags, &mut rig.gate, &mut rig.clock, &mut rig.sink);
    assert_eq!(idle, None);
}

// ── Bus mimic variant (obfuscated frames) ─────────────────────

#[test]
fn bus_mimic_obfuscates_payloads() {
    let xor = CipherStage::Xor(DEFAULT_XOR_KEY);
    let mut rig = binary_rig(DeviceConfig::bus_gate());
    rig.link_mut().deliver_at(0, &downlink(b"GRANT", &xor));

    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::Granted);

    let raw = &rig.link().sent[0].bytes;
    assert_ne!(&raw[12..16], &CARD, "payload is not sent in clear");
    assert_eq!(&uplink_frames(rig.link(), &xor)[0].payload[..], &CARD);
    assert_eq!(status_texts(rig.link(), &xor), vec!["open", "clos"]);
}

#[test]
fn bus_mimic_ignores_plaintext_grant() {
    let mut rig = binary_rig(DeviceConfig::bus_gate());
    rig.link_mut().deliver_at(0, &downlink(b"GRANT", &PLAIN));
    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::TimedOut);
}

// ── Timeout bound ─────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn timeout_resolves_within_one_poll_interval(
        window in 50u32..3_000,
        poll in 1u32..50,
        start in 0u64..1_000_000,
    ) {
        let mut config = DeviceConfig::default();
        config.response_window_ms = window;
        config.poll_interval_ms = poll;
        let mut rig = binary_rig(config);
        rig.clock.set(start);

        prop_assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::TimedOut);
        let elapsed = rig.clock.now_ms() - start;
        prop_assert!(elapsed >= u64::from(window));
        prop_assert!(elapsed < u64::from(window) + u64::from(poll));
    }
}
