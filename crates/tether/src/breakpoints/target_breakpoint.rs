//
// target_breakpoint.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use tether_model::TargetId;

use crate::binding::LiveLocation;
use crate::debugger::DebuggerBreakpointId;
use crate::debugger::RequestId;

/// Per-(breakpoint, target) binding state.
///
/// Unbound (`debugger_id: None`) until the target's debugger confirms a set
/// request; `pending_set` holds the token of the one in-flight set, if any.
/// Re-syncs always tear the old binding down before issuing a new set, so a
/// target breakpoint never has two overlapping in-flight sets.
#[derive(Debug)]
pub(crate) struct TargetBreakpoint {
    pub(crate) target: TargetId,
    pub(crate) debugger_id: Option<DebuggerBreakpointId>,
    pub(crate) pending_set: Option<RequestId>,

    /// One live binding per resolved raw location, holding the UI location
    /// it last mapped to. Drained wholesale when locations reset.
    pub(crate) live_locations: Vec<LiveLocation>,
}

impl TargetBreakpoint {
    pub(crate) fn new(target: TargetId) -> Self {
        Self {
            target,
            debugger_id: None,
            pending_set: None,
            live_locations: Vec::new(),
        }
    }
}
