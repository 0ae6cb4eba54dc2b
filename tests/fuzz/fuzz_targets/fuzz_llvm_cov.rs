#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parser must not panic on any input.
    if let Ok(profile) = fuzzcov::parsers::llvm_cov::parse(data) {
        for (name, _) in profile.functions() {
            let _ = profile.hit_summary(name);
        }
    }
});
