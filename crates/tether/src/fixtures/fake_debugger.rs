//
// fake_debugger.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use tether_model::ScriptLocation;

use crate::debugger::DebuggerBackend;
use crate::debugger::DebuggerBreakpointId;
use crate::debugger::DebuggerEvent;
use crate::debugger::RequestId;

#[derive(Debug, Clone)]
enum InstalledSpec {
    Location(ScriptLocation),
    Url {
        url: String,
        line_number: u32,
        column_number: u32,
    },
}

#[derive(Debug, Clone)]
struct Installed {
    spec: InstalledSpec,
    condition: String,
}

#[derive(Debug, Default)]
struct State {
    enabled: bool,
    refuse_sets: bool,
    next_id: u64,

    /// url -> script id, for scripts this target has "loaded".
    scripts: HashMap<String, String>,
    installed: HashMap<DebuggerBreakpointId, Installed>,

    /// Events waiting for the harness to pump them into the manager.
    queue: VecDeque<DebuggerEvent>,

    /// Every `set_breakpoints_active` call, in order.
    active_calls: Vec<bool>,
}

/// Scripted in-process debugger backend.
///
/// Requests are answered asynchronously: responses queue up and reach the
/// manager only when the harness pumps, so tests can interleave further
/// mutations in between and exercise stale-response handling. Cloning
/// shares the state, letting a test keep a handle to a backend it boxed
/// into a `Target`.
#[derive(Debug, Clone, Default)]
pub struct FakeDebugger {
    state: Arc<Mutex<State>>,
}

impl FakeDebugger {
    pub fn new() -> Self {
        let debugger = Self::default();
        debugger.state.lock().unwrap().enabled = true;
        debugger
    }

    /// A backend whose debugger agent has not been enabled yet.
    pub fn new_disabled() -> Self {
        Self::default()
    }

    /// Every set request from now on is refused (`debugger_id: None`).
    pub fn refuse_sets(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_sets = refuse;
    }

    pub fn enable(&self) {
        let mut state = self.state.lock().unwrap();
        state.enabled = true;
        state.queue.push_back(DebuggerEvent::DebuggerEnabled);
    }

    pub fn disable(&self) {
        let mut state = self.state.lock().unwrap();
        state.enabled = false;
        state.installed.clear();
        state.queue.push_back(DebuggerEvent::DebuggerDisabled);
    }

    /// A script arrives in the VM. URL breakpoints waiting on it resolve.
    pub fn load_script(&self, url: &str, script_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.scripts.insert(url.to_string(), script_id.to_string());

        let resolved: Vec<(DebuggerBreakpointId, ScriptLocation)> = state
            .installed
            .iter()
            .filter_map(|(id, installed)| match &installed.spec {
                InstalledSpec::Url {
                    url: spec_url,
                    line_number,
                    column_number,
                } if spec_url == url => Some((
                    id.clone(),
                    ScriptLocation::new(script_id, *line_number, *column_number),
                )),
                _ => None,
            })
            .collect();
        for (debugger_id, location) in resolved {
            state.queue.push_back(DebuggerEvent::BreakpointResolved {
                debugger_id,
                location,
            });
        }
    }

    /// Re-resolve an installed breakpoint to a new location, as a VM does
    /// after live-editing a script.
    pub fn resolve(&self, debugger_id: &DebuggerBreakpointId, location: ScriptLocation) {
        let mut state = self.state.lock().unwrap();
        state.queue.push_back(DebuggerEvent::BreakpointResolved {
            debugger_id: debugger_id.clone(),
            location,
        });
    }

    pub fn take_events(&self) -> Vec<DebuggerEvent> {
        self.state.lock().unwrap().queue.drain(..).collect()
    }

    pub fn installed_count(&self) -> usize {
        self.state.lock().unwrap().installed.len()
    }

    pub fn installed_ids(&self) -> Vec<DebuggerBreakpointId> {
        let mut ids: Vec<DebuggerBreakpointId> =
            self.state.lock().unwrap().installed.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn installed_condition(&self, debugger_id: &DebuggerBreakpointId) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .installed
            .get(debugger_id)
            .map(|installed| installed.condition.clone())
    }

    pub fn active_calls(&self) -> Vec<bool> {
        self.state.lock().unwrap().active_calls.clone()
    }

    fn install(
        state: &mut State,
        spec: InstalledSpec,
        condition: &str,
        request: RequestId,
        locations: Vec<ScriptLocation>,
    ) {
        if state.refuse_sets {
            state.queue.push_back(DebuggerEvent::BreakpointSet {
                request,
                debugger_id: None,
                locations: Vec::new(),
            });
            return;
        }
        state.next_id += 1;
        let debugger_id = DebuggerBreakpointId::new(format!("fake-{}", state.next_id));
        state.installed.insert(debugger_id.clone(), Installed {
            spec,
            condition: condition.to_string(),
        });
        state.queue.push_back(DebuggerEvent::BreakpointSet {
            request,
            debugger_id: Some(debugger_id),
            locations,
        });
    }
}

impl DebuggerBackend for FakeDebugger {
    fn set_breakpoint_by_location(
        &mut self,
        location: &ScriptLocation,
        condition: &str,
        request: RequestId,
    ) {
        let mut state = self.state.lock().unwrap();
        Self::install(
            &mut state,
            InstalledSpec::Location(location.clone()),
            condition,
            request,
            vec![location.clone()],
        );
    }

    fn set_breakpoint_by_url(
        &mut self,
        url: &str,
        line_number: u32,
        column_number: u32,
        condition: &str,
        request: RequestId,
    ) {
        let mut state = self.state.lock().unwrap();
        // Resolves immediately only if the script is already in the VM
        let locations = match state.scripts.get(url) {
            Some(script_id) => vec![ScriptLocation::new(
                script_id.clone(),
                line_number,
                column_number,
            )],
            None => Vec::new(),
        };
        Self::install(
            &mut state,
            InstalledSpec::Url {
                url: url.to_string(),
                line_number,
                column_number,
            },
            condition,
            request,
            locations,
        );
    }

    fn remove_breakpoint(
        &mut self,
        debugger_id: &DebuggerBreakpointId,
        request: Option<RequestId>,
    ) {
        let mut state = self.state.lock().unwrap();
        state.installed.remove(debugger_id);
        if let Some(request) = request {
            state
                .queue
                .push_back(DebuggerEvent::BreakpointRemoved { request });
        }
    }

    fn set_breakpoints_active(&mut self, active: bool) {
        self.state.lock().unwrap().active_calls.push(active);
    }

    fn debugger_enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }
}
