//
// mod.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

pub mod fake_debugger;
pub mod fake_mapping;
pub mod harness;

pub use fake_debugger::FakeDebugger;
pub use fake_mapping::FakeMapping;
pub use harness::Harness;

use std::sync::Once;

use crossbeam::channel::Receiver;

use crate::events::BreakpointEvent;

/// Wire logs up to the test runner. Idempotent across tests in a binary.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Collect everything a subscriber has queued up so far.
pub fn drain_events(rx: &Receiver<BreakpointEvent>) -> Vec<BreakpointEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
