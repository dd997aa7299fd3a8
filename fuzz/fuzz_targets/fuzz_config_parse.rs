#![no_main]

use libfuzzer_sys::fuzz_target;

// Config parsing must reject arbitrary input without panicking.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = toml::from_str::<engram::config::schema::Config>(text);
    }
});
