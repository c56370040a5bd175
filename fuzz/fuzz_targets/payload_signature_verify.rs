#![no_main]

use guildpulse_sink::{sign_payload, verify_payload_signature};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let split = data.len() / 2;
    let (payload, header) = data.split_at(split);
    let header = String::from_utf8_lossy(header);

    if verify_payload_signature("fuzz-secret", payload, &header).is_ok() {
        assert!(header.trim().starts_with("sha256="));
    }

    let signature = sign_payload("fuzz-secret", payload).expect("hmac accepts any key length");
    assert!(verify_payload_signature("fuzz-secret", payload, &signature).is_ok());
    assert!(verify_payload_signature("other-secret", payload, &signature).is_err());
});
