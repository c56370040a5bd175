#![no_main]

use guildpulse_facts::Fact;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(fact) = serde_json::from_slice::<Fact>(data) else {
        return;
    };
    let encoded = serde_json::to_vec(&fact).expect("decoded fact re-encodes");
    let decoded: Fact = serde_json::from_slice(&encoded).expect("re-encoded fact decodes");
    assert_eq!(decoded.kind(), fact.kind());
    assert_eq!(decoded.guild_id(), fact.guild_id());
});
