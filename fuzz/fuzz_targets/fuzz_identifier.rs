#![no_main]

use emissao::core::identifiers::{digits_only, validate_identifier};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok((_, digits)) = validate_identifier(data) {
        assert_eq!(digits, digits_only(data));
        assert!(digits.len() == 11 || digits.len() == 14);
    }
});
