//! Fuzz target: uplink and downlink frame decoders
//!
//! Drives arbitrary byte sequences into both decoders and asserts that
//! they never panic and never return a payload larger than the frame
//! limit.  Whatever decodes must re-encode to the same bytes.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use gatelink::protocol::cipher::CipherStage;
use gatelink::protocol::downlink::{self, DownlinkOptions};
use gatelink::protocol::frame::{self, MAX_PAYLOAD_LEN, PayloadPolicy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(f) = frame::decode(data, &CipherStage::None) {
        assert!(f.payload.len() <= MAX_PAYLOAD_LEN);
        let again = frame::encode_with_policy(
            &f.header,
            &f.payload,
            PayloadPolicy::Reject(MAX_PAYLOAD_LEN),
            &CipherStage::None,
        )
        .expect("decoded frame re-encodes");
        assert_eq!(&again[..], data);
    }

    for verify_checksum in [false, true] {
        let opts = DownlinkOptions { verify_checksum };
        if let Ok(f) = downlink::decode(data, opts, &CipherStage::None) {
            assert!(f.payload.len() <= MAX_PAYLOAD_LEN);
            assert_eq!(data.len(), downlink::HEADER_LEN + f.payload.len() + if verify_checksum { 4 } else { 0 });
        }
    }
});
