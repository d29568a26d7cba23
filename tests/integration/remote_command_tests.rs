//! Remote unlock/lock commands over the binary downlink.

use gatelink::app::events::AppEvent;
use gatelink::app::ports::TimePort;
use gatelink::config::DeviceConfig;
use gatelink::fsm::context::ExchangeOutcome;
use gatelink::protocol::cipher::CipherStage;
use gatelink::protocol::command::{AckStatus, CommandKind};
use gatelink::protocol::tokens::GateStatus;

use crate::mock_hw::{GateCall, binary_rig, downlink, status_texts};

const PLAIN: CipherStage = CipherStage::None;
const CARD: [u8; 4] = [0x04, 0xA2, 0x13, 0x9B];

fn rig_with_command(text: &str) -> crate::mock_hw::Rig<gatelink::app::wire::BinaryWire> {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut().deliver_at(0, &downlink(text.as_bytes(), &PLAIN));
    rig
}

// ── Unlock ────────────────────────────────────────────────────

#[test]
fn unlock_holds_for_requested_duration() {
    let mut rig = rig_with_command("REMOTE_UNLOCK:cmd1:admin:2000");
    rig.poll();

    assert_eq!(
        rig.gate.call_list(),
        vec![
            GateCall::Relay(true),
            GateCall::Position(90),
            GateCall::Position(0),
            GateCall::Relay(false),
        ]
    );
    assert_eq!(rig.gate.moves_to(90), vec![0]);
    // settle + hold
    assert_eq!(rig.gate.moves_to(0), vec![2_500]);
    assert_eq!(rig.clock.delays, vec![500, 2_000, 500]);

    assert_eq!(
        status_texts(rig.link(), &PLAIN),
        vec!["ACK:cmd1:1:unlocked", "AUTO_CLOS"]
    );
    assert_eq!(rig.link().sent[0].at_ms, 3_000, "ack after the gate settled");
}

#[test]
fn unlock_emits_exactly_one_status() {
    let mut rig = rig_with_command("REMOTE_UNLOCK:cmd1:admin:1500");
    rig.poll();

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::StatusSent(_))), 1);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::StatusSent(GateStatus::RemoteAutoClosed))
    );
    assert!(rig.sink.events.contains(&AppEvent::RemoteCommandExecuted {
        kind: CommandKind::Unlock,
        duration_ms: Some(1_500),
    }));
}

#[test]
fn unlock_duration_policy() {
    // (requested, expected hold)
    let cases = [
        ("99999", 30_000),
        ("30000", 30_000),
        ("1000", 1_000),
        ("200", 5_000),
        ("abc", 5_000),
        ("-5", 5_000),
        ("", 5_000),
    ];
    for (requested, hold) in cases {
        let mut rig = rig_with_command(&format!("REMOTE_UNLOCK:c:ops:{requested}"));
        rig.poll();
        assert_eq!(
            rig.gate.moves_to(0),
            vec![500 + hold],
            "requested {requested:?}"
        );
    }
}

#[test]
fn malformed_unlock_gets_error_ack() {
    for text in [
        "REMOTE_UNLOCK:c1:admin",
        "REMOTE_UNLOCK:c1:admin:1000:extra",
        "REMOTE_UNLOCK::admin:1000",
        "REMOTE_UNLOCK:c1::1000",
    ] {
        let mut rig = rig_with_command(text);
        rig.poll();

        assert!(rig.gate.calls.is_empty(), "{text}");
        assert_eq!(
            status_texts(rig.link(), &PLAIN),
            vec!["ACK:error:0:invalid_format"],
            "{text}"
        );
        assert!(rig.sink.events.contains(&AppEvent::RemoteCommandRejected {
            kind: Some(CommandKind::Unlock),
            status: AckStatus::InvalidFormat,
        }));
    }
}

#[test]
fn overlong_command_id_is_malformed() {
    let id = "x".repeat(65);
    let mut rig = rig_with_command(&format!("REMOTE_UNLOCK:{id}:admin:1000"));
    rig.poll();
    assert_eq!(
        status_texts(rig.link(), &PLAIN),
        vec!["ACK:error:0:invalid_format"]
    );
}

#[test]
fn disabled_remote_unlock_is_refused() {
    let mut config = DeviceConfig::default();
    config.remote.enabled = false;
    let mut rig = binary_rig(config);
    rig.link_mut()
        .deliver_at(0, &downlink(b"REMOTE_UNLOCK:c3:admin:1000", &PLAIN));
    rig.link_mut().deliver_at(1, &downlink(b"REMOTE_LOCK:c4:admin", &PLAIN));

    rig.poll();
    assert!(rig.gate.calls.is_empty());
    rig.clock.set(1);
    rig.poll();

    assert_eq!(
        status_texts(rig.link(), &PLAIN),
        vec!["ACK:c3:0:remote_unlock_disabled", "ACK:c4:1:locked", "REMOTE_CLOS"]
    );
}

// ── Lock ──────────────────────────────────────────────────────

#[test]
fn lock_closes_immediately() {
    let mut rig = rig_with_command("REMOTE_LOCK:c2:ops");
    rig.poll();

    assert_eq!(
        rig.gate.call_list(),
        vec![GateCall::Position(0), GateCall::Relay(false)]
    );
    assert!(rig.clock.delays.is_empty());
    assert_eq!(
        status_texts(rig.link(), &PLAIN),
        vec!["ACK:c2:1:locked", "REMOTE_CLOS"]
    );
}

#[test]
fn malformed_lock_is_silently_ignored() {
    for text in ["REMOTE_LOCK:c2", "REMOTE_LOCK:c2:ops:extra", "REMOTE_LOCK::ops"] {
        let mut rig = rig_with_command(text);
        rig.poll();
        assert!(rig.gate.calls.is_empty(), "{text}");
        assert!(rig.link().sent.is_empty(), "{text}");
    }
}

#[test]
fn unknown_command_kind_gets_no_ack() {
    let mut rig = rig_with_command("REMOTE_REBOOT:c9:ops");
    rig.poll();
    assert!(rig.link().sent.is_empty());
    assert!(rig.gate.calls.is_empty());
}

// ── Failures never undo actuation ─────────────────────────────

#[test]
fn ack_send_failure_is_reported() {
    let mut rig = rig_with_command("REMOTE_LOCK:c2:ops");
    rig.link_mut().fail_sends = true;
    rig.poll();

    assert_eq!(rig.gate.call_list().len(), 2);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::SendFailed { .. })),
        2
    );
}

// ── Interleaving with an exchange ─────────────────────────────

#[test]
fn command_during_exchange_is_deferred_not_lost() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut()
        .deliver_at(50, &downlink(b"REMOTE_LOCK:c7:admin", &PLAIN));
    rig.link_mut().deliver_at(100, &downlink(b"GRANT", &PLAIN));

    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::Granted);
    assert_eq!(rig.service.deferred_len(), 1);
    assert_eq!(status_texts(rig.link(), &PLAIN), vec!["open", "clos"]);

    rig.poll();
    assert_eq!(rig.service.deferred_len(), 0);
    assert_eq!(
        status_texts(rig.link(), &PLAIN),
        vec!["open", "clos", "ACK:c7:1:locked", "REMOTE_CLOS"]
    );
}

#[test]
fn unlock_during_exchange_runs_after_it() {
    let mut rig = binary_rig(DeviceConfig::default());
    rig.link_mut()
        .deliver_at(20, &downlink(b"REMOTE_UNLOCK:u1:admin:1000", &PLAIN));
    rig.link_mut().deliver_at(40, &downlink(b"DENY5", &PLAIN));

    assert_eq!(rig.scan(&CARD).unwrap(), ExchangeOutcome::Denied);
    assert!(rig.gate.calls.is_empty(), "exchange not interrupted");

    rig.poll();
    let start = rig.gate.moves_to(90)[0];
    assert_eq!(start, 40);
    assert_eq!(rig.clock.now_ms(), 40 + 500 + 1_000 + 500);
}

#[test]
fn deferred_queue_is_bounded() {
    let mut rig = binary_rig(DeviceConfig::default());
    for i in 0..6u64 {
        let text = format!("REMOTE_LOCK:q{i}:ops");
        rig.link_mut().deliver_at(10 + i, &downlink(text.as_bytes(), &PLAIN));
    }
    rig.link_mut().deliver_at(30, &downlink(b"DENY5", &PLAIN));

    rig.scan(&CARD).unwrap();
    assert_eq!(rig.service.deferred_len(), 4);

    rig.poll();
    let acks: Vec<_> = status_texts(rig.link(), &PLAIN)
        .into_iter()
        .filter(|t| t.starts_with("ACK:"))
        .collect();
    assert_eq!(
        acks,
        vec!["ACK:q0:1:locked", "ACK:q1:1:locked", "ACK:q2:1:locked", "ACK:q3:1:locked"]
    );
}
