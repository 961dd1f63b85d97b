#![no_main]

use balanza::trace::{correlate, TraceEvent};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Convert arbitrary bytes to UTF-8 and try to parse a trace capture.
    // Correlation may reject the events but must never panic.
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(events) = serde_json::from_str::<Vec<TraceEvent>>(input) {
            let _ = correlate(&events, Some("mark_meaningful_paint"), "http://localhost/");
        }
    }
});
