#![no_main]

use emissao::gateway::GatewayResponse;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u16, &str)| {
    let (status, body) = input;
    // Must not panic; unreadable bodies are errors.
    if let Ok(GatewayResponse::Rejected(failure)) = GatewayResponse::parse(status, body) {
        assert!(failure.reason().chars().count() <= emissao::gateway::MAX_DIAGNOSTIC_CHARS);
    }
});
