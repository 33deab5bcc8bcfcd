//! Fuzz target for the widget runtime
//!
//! Applies arbitrary operation sequences (user intents, transport callbacks,
//! inbound frames, time passing) to a simulated widget running the production
//! runtime.
//!
//! # Invariants
//!
//! - NEVER panic
//! - The standard invariants hold after every operation

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use chatline_client::ReconnectPolicy;
use chatline_harness::{Operation, Simulation};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    max_attempts: u8,
    ops: Vec<Operation>,
}

fuzz_target!(|input: Input| {
    let policy = ReconnectPolicy {
        max_attempts: u32::from(input.max_attempts % 8),
        delay: Duration::from_secs(5),
    };
    let Ok(mut sim) = Simulation::new(policy) else {
        return;
    };
    if sim.start_blocking().is_err() {
        return;
    }

    for (i, op) in input.ops.iter().take(256).enumerate() {
        if let Ok(true) | Err(_) = sim.apply_blocking(op) {
            return;
        }
        sim.assert_invariants(&format!("after op {i}: {op:?}"));
    }
});
