#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = fuzzcov::parsers::parse_scaled_count(data);
});
