//
// debugger.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::fmt;

use tether_model::ScriptLocation;
use tether_model::TargetId;

/// Token for one in-flight backend request. Tokens are monotonic per
/// manager; a response echoing a token that is no longer pending is stale
/// and gets dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Identity a target's debugger assigns to a breakpoint once it is actually
/// set there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DebuggerBreakpointId(String);

impl DebuggerBreakpointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DebuggerBreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One target's debugger, as seen from the frontend.
///
/// All breakpoint mutations are fire-and-forget requests; the backend
/// eventually answers with a `DebuggerEvent` echoing the request token.
/// The round trip may interleave with further requests, so consumers must
/// treat responses for superseded tokens as stale.
pub trait DebuggerBackend: Send {
    /// Set a breakpoint at a resolved raw location.
    fn set_breakpoint_by_location(
        &mut self,
        location: &ScriptLocation,
        condition: &str,
        request: RequestId,
    );

    /// Set a breakpoint by URL for a script the backend may not have loaded
    /// yet. Resolutions arrive later as `BreakpointResolved` events.
    fn set_breakpoint_by_url(
        &mut self,
        url: &str,
        line_number: u32,
        column_number: u32,
        condition: &str,
        request: RequestId,
    );

    /// Remove a previously set breakpoint. When `request` is `None` the
    /// caller does not want a completion event.
    fn remove_breakpoint(&mut self, debugger_id: &DebuggerBreakpointId, request: Option<RequestId>);

    /// Master switch: suppress or restore all breakpoints in this target,
    /// independently of their individual enabled state.
    fn set_breakpoints_active(&mut self, active: bool);

    /// Whether the debugger is currently enabled for this target.
    fn debugger_enabled(&self) -> bool;
}

#[derive(Debug, Clone)]
pub enum DebuggerEvent {
    /// Response to a set request. `debugger_id: None` means the backend
    /// refused the breakpoint.
    BreakpointSet {
        request: RequestId,
        debugger_id: Option<DebuggerBreakpointId>,
        locations: Vec<ScriptLocation>,
    },

    /// Response to a remove request that asked for completion.
    BreakpointRemoved { request: RequestId },

    /// A breakpoint previously set by URL resolved to a concrete location,
    /// e.g. because its script finished loading.
    BreakpointResolved {
        debugger_id: DebuggerBreakpointId,
        location: ScriptLocation,
    },

    DebuggerEnabled,
    DebuggerDisabled,
}

/// One observed debugging target and its backend connection.
pub struct Target {
    id: TargetId,
    name: String,
    backend: Box<dyn DebuggerBackend>,
}

impl Target {
    pub fn new(id: TargetId, name: impl Into<String>, backend: Box<dyn DebuggerBackend>) -> Self {
        Self {
            id,
            name: name.into(),
            backend,
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn backend(&self) -> &dyn DebuggerBackend {
        self.backend.as_ref()
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn DebuggerBackend {
        self.backend.as_mut()
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
