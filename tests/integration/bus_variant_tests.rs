//! Keypad lock on the structured bus protocol.

use gatelink::app::events::AppEvent;
use gatelink::error::FrameError;
use gatelink::fsm::context::ExchangeOutcome;
use gatelink::protocol::json::{self, SignedRequest};
use gatelink::transport::Route;
use serde_json::Value;

use crate::mock_hw::{GateCall, KEYPAD_KEY, KEYPAD_SALT, Rig, ScriptedLink, keypad_rig};

fn messages(link: &ScriptedLink, route: Route) -> Vec<Value> {
    link.sent
        .iter()
        .filter(|s| s.route == route)
        .map(|s| serde_json::from_slice(&s.bytes).expect("json message"))
        .collect()
}

fn statuses<W: gatelink::app::wire::WireCodec>(rig: &Rig<W>) -> Vec<(String, String)> {
    messages(rig.link(), Route::Status)
        .into_iter()
        .filter(|m| m.get("state").is_some())
        .map(|m| (m["state"].as_str().unwrap().to_string(), m["method"].as_str().unwrap().to_string()))
        .collect()
}

fn acks<W: gatelink::app::wire::WireCodec>(rig: &Rig<W>) -> Vec<Value> {
    messages(rig.link(), Route::Status)
        .into_iter()
        .filter(|m| m.get("command_id").is_some())
        .collect()
}

// ── Access requests ───────────────────────────────────────────

#[test]
fn passcode_goes_out_as_signed_request() {
    let mut rig = keypad_rig();
    rig.link_mut().deliver_at(10, br#"{"cmd":"LOCK","reason":"bad_password"}"#);

    assert_eq!(rig.scan(b"123456").unwrap(), ExchangeOutcome::Denied);

    let request = &rig.link().sent[0];
    assert_eq!(request.route, Route::Request);
    assert!(json::verify_access_request(&request.bytes, KEYPAD_KEY));
    assert!(!json::verify_access_request(&request.bytes, b"wrong-key"));

    let signed: SignedRequest = serde_json::from_slice(&request.bytes).unwrap();
    let body: Value = serde_json::from_str(&signed.body).unwrap();
    assert_eq!(body["cmd"], "unlock_request");
    assert_eq!(body["client_id"], "passkey_01");

    let mut salted = KEYPAD_SALT.to_vec();
    salted.extend_from_slice(b"123456");
    assert_eq!(body["pw"], hex::encode(hmac_sha256::Hash::hash(&salted)));
}

#[test]
fn nonces_differ_between_requests() {
    let mut rig = keypad_rig();
    rig.link_mut().deliver_at(10, br#"{"cmd":"LOCK"}"#);
    rig.link_mut().deliver_at(20, br#"{"cmd":"LOCK"}"#);
    rig.scan(b"111111").unwrap();
    rig.scan(b"111111").unwrap();

    let nonces: Vec<Value> = messages(rig.link(), Route::Request)
        .into_iter()
        .map(|m| {
            let body: Value = serde_json::from_str(m["body"].as_str().unwrap()).unwrap();
            body["nonce"].clone()
        })
        .collect();
    assert_eq!(nonces.len(), 2);
    assert_ne!(nonces[0], nonces[1]);
}

#[test]
fn open_unlocks_and_reports() {
    let mut rig = keypad_rig();
    rig.link_mut().deliver_at(10, br#"{"cmd":"OPEN"}"#);

    assert_eq!(rig.scan(b"123456").unwrap(), ExchangeOutcome::Granted);
    assert_eq!(rig.gate.moves_to(180), vec![10]);
    assert_eq!(rig.gate.moves_to(0), vec![5_010]);
    assert_eq!(
        statuses(&rig),
        vec![
            ("unlocked".to_string(), "keypad".to_string()),
            ("locked".to_string(), "auto_lock".to_string()),
        ]
    );
}

#[test]
fn boot_announces_online() {
    let mut rig = keypad_rig();
    rig.start();
    let msgs = messages(rig.link(), Route::Status);
    assert_eq!(msgs[0]["device_id"], "passkey_01");
    assert_eq!(msgs[0]["state"], "online");
    assert_eq!(msgs[0]["method"], "boot");
}

// ── Remote commands ───────────────────────────────────────────

#[test]
fn remote_unlock_over_json() {
    let mut rig = keypad_rig();
    rig.link_mut().deliver_at(
        0,
        br#"{"cmd":"remote_unlock","command_id":"k1","user":"admin","reason":"guest","duration_ms":8000}"#,
    );
    rig.poll();

    assert_eq!(rig.gate.moves_to(180), vec![0]);
    assert_eq!(rig.gate.moves_to(0), vec![8_500]);

    let acks = acks(&rig);
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0]["command_id"], "k1");
    assert_eq!(acks[0]["success"], true);
    assert_eq!(acks[0]["status"], "unlocked");
    assert_eq!(acks[0]["timestamp"], 9);
    assert_eq!(statuses(&rig), vec![("locked".to_string(), "auto_lock".to_string())]);
}

#[test]
fn remote_unlock_defaults_fill_in() {
    let mut rig = keypad_rig();
    rig.clock.set(42_000);
    rig.link_mut().deliver_at(42_000, br#"{"cmd":"remote_unlock"}"#);
    rig.poll();

    assert_eq!(rig.gate.moves_to(0), vec![42_000 + 500 + 5_000]);
    assert_eq!(acks(&rig)[0]["command_id"], "42000");
}

#[test]
fn remote_lock_over_json() {
    let mut rig = keypad_rig();
    rig.link_mut()
        .deliver_at(0, br#"{"cmd":"remote_lock","command_id":"k2","user":"bob"}"#);
    rig.poll();

    assert_eq!(
        rig.gate.call_list(),
        vec![GateCall::Position(0), GateCall::Relay(false)]
    );
    assert_eq!(acks(&rig)[0]["status"], "locked");
    assert_eq!(statuses(&rig), vec![("locked".to_string(), "remote_lock".to_string())]);
}

// ── Runtime configuration ─────────────────────────────────────

#[test]
fn update_config_disables_remote_unlock() {
    let mut rig = keypad_rig();
    rig.link_mut().deliver_at(
        0,
        br#"{"cmd":"update_config","command_id":"cfg1","remote_enabled":false}"#,
    );
    rig.link_mut()
        .deliver_at(1, br#"{"cmd":"remote_unlock","command_id":"k3"}"#);

    rig.poll();
    assert!(!rig.service.config().remote.enabled);
    assert!(rig.sink.events.contains(&AppEvent::ConfigUpdated));

    rig.clock.set(1);
    rig.poll();
    assert!(rig.gate.calls.is_empty());

    let acks = acks(&rig);
    assert_eq!(acks[0]["command_id"], "cfg1");
    assert_eq!(acks[0]["status"], "config_updated");
    assert_eq!(acks[0]["success"], true);
    assert_eq!(acks[1]["command_id"], "k3");
    assert_eq!(acks[1]["status"], "remote_unlock_disabled");
    assert_eq!(acks[1]["success"], false);
}

#[test]
fn update_config_changes_default_duration() {
    let mut rig = keypad_rig();
    rig.link_mut().deliver_at(
        0,
        br#"{"cmd":"update_config","command_id":"cfg2","default_duration_ms":2000}"#,
    );
    rig.link_mut().deliver_at(1, br#"{"cmd":"remote_unlock"}"#);
    rig.poll();
    rig.clock.set(1);
    rig.poll();

    assert_eq!(rig.service.config().remote.default_duration_ms, 2_000);
    assert_eq!(rig.gate.moves_to(0), vec![1 + 500 + 2_000]);
}

#[test]
fn invalid_update_config_leaves_limits_alone() {
    let mut rig = keypad_rig();
    let before = rig.service.config().remote;
    rig.link_mut().deliver_at(
        0,
        br#"{"cmd":"update_config","command_id":"cfg3","max_duration_ms":500}"#,
    );
    rig.poll();

    assert_eq!(rig.service.config().remote, before);
    let acks = acks(&rig);
    assert_eq!(acks[0]["status"], "invalid_config");
    assert_eq!(acks[0]["success"], false);
    assert!(!rig.sink.events.contains(&AppEvent::ConfigUpdated));
}

// ── Malformed input ───────────────────────────────────────────

#[test]
fn malformed_json_is_discarded() {
    let mut rig = keypad_rig();
    rig.link_mut().deliver_at(0, b"{\"cmd\":");
    rig.poll();

    assert!(
        rig.sink
            .events
            .contains(&AppEvent::FrameDiscarded(FrameError::InvalidJson))
    );
    assert!(rig.link().sent.is_empty());
}

#[test]
fn unknown_json_command_is_ignored() {
    let mut rig = keypad_rig();
    rig.link_mut().deliver_at(0, br#"{"cmd":"reboot"}"#);
    rig.poll();
    assert!(rig.link().sent.is_empty());
    assert!(rig.gate.calls.is_empty());
}
