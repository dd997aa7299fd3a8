#![no_main]

use engram::transcript::{extract_latest_exchange, MessageLog, Role, Turn};
use libfuzzer_sys::fuzz_target;

// Build an arbitrary tape of turns and check the extractor's guarantees: it
// never panics, and any exchange it produces is a non-tool user/assistant
// pair whose response is the last log entry.
fuzz_target!(|data: &[u8]| {
    let mut log = MessageLog::new();
    for chunk in data.chunks(4) {
        let text = String::from_utf8_lossy(&chunk[1..]).into_owned();
        match chunk[0] % 3 {
            0 => log.push(Turn::user(text)),
            1 => log.push(Turn::assistant(text)),
            _ => log.push(Turn::tool_result(text)),
        }
    }

    if let Some(exchange) = extract_latest_exchange(&log) {
        assert_eq!(exchange.request.role, Role::User);
        assert_eq!(exchange.response.role, Role::Assistant);
        assert!(!exchange.request.is_tool_result());
        assert!(!exchange.response.is_tool_result());
        assert_eq!(
            log.last().map(|t| t.text.clone()),
            Some(exchange.response.text)
        );
    }
});
