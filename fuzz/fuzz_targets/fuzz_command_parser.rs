//! Fuzz target: remote command parsers
//!
//! Feeds arbitrary text to the colon-delimited parser and arbitrary bytes
//! to the JSON command parser.  Neither may panic, and any accepted
//! unlock must carry a hold time inside the configured limits.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use gatelink::config::RemoteConfig;
use gatelink::protocol::command::{self, ParsedCommand};
use gatelink::protocol::{Inbound, json};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let cfg = RemoteConfig::default();
    let in_bounds = |ms: Option<u32>| {
        ms.is_none_or(|ms| ms >= cfg.min_duration_ms && ms <= cfg.max_duration_ms)
    };

    if let Ok(text) = core::str::from_utf8(data) {
        if let Some(ParsedCommand::Valid(cmd)) = command::parse_with(text, &cfg) {
            assert!(in_bounds(cmd.duration_ms()));
        }
    }

    if let Ok(Inbound::Command(ParsedCommand::Valid(cmd))) = json::parse_command(data, &cfg, 0) {
        assert!(in_bounds(cmd.duration_ms()));
    }
});
