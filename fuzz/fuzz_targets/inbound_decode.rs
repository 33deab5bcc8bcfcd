//! Fuzz target for InboundEvent::decode
//!
//! Feeds arbitrary text to the inbound frame decoder to find:
//! - Parser crashes or panics
//! - Deeply nested JSON that exhausts the stack
//! - Timestamps that overflow date arithmetic
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use chatline_proto::InboundEvent;
use chrono::DateTime;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = InboundEvent::decode(text, DateTime::UNIX_EPOCH);
});
