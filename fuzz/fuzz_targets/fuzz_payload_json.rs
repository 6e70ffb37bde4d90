#![no_main]

use emissao::payload::NfePayload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = serde_json::from_slice::<NfePayload>(data) {
        let json = serde_json::to_vec(&payload).unwrap();
        let again: NfePayload = serde_json::from_slice(&json).unwrap();
        assert_eq!(again, payload);
    }
});
