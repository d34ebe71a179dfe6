//
// harness.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use crossbeam::channel::Receiver;
use crossbeam::channel::TryRecvError;
use tether_model::ContentType;
use tether_model::TargetId;
use tether_model::UiSourceCode;
use tether_model::Workspace;
use tether_model::WorkspaceEvent;

use crate::breakpoints::manager::BreakpointManager;
use crate::breakpoints::manager::TargetObserver;
use crate::breakpoints::storage::MemorySetting;
use crate::breakpoints::storage::Setting;
use crate::debugger::Target;
use crate::events::BreakpointEvent;
use crate::fixtures::fake_debugger::FakeDebugger;
use crate::fixtures::fake_mapping::FakeMapping;
use crate::fixtures::init_logging;

/// A complete in-process session: workspace, manager, fake mapping, and any
/// number of fake targets. Tests mutate, then `pump()` to let queued
/// workspace and debugger events flow into the manager until quiescent.
pub struct Harness {
    pub workspace: Workspace,
    pub manager: BreakpointManager,
    pub mapping: FakeMapping,
    pub setting: MemorySetting,
    workspace_rx: Receiver<WorkspaceEvent>,
    debuggers: Vec<(TargetId, FakeDebugger)>,
    next_target: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_setting(MemorySetting::new())
    }

    /// Build around an existing setting, e.g. to model a restart restoring
    /// persisted breakpoints.
    pub fn with_setting(setting: MemorySetting) -> Self {
        init_logging();
        let workspace = Workspace::new();
        let workspace_rx = workspace.subscribe();
        let mapping = FakeMapping::new(workspace.clone());
        let manager = BreakpointManager::new(
            Box::new(setting.clone()) as Box<dyn Setting>,
            workspace.clone(),
            Box::new(mapping.clone()),
        );
        Self {
            workspace,
            manager,
            mapping,
            setting,
            workspace_rx,
            debuggers: Vec::new(),
            next_target: 1,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<BreakpointEvent> {
        self.manager.subscribe()
    }

    pub fn add_target(&mut self, name: &str) -> (TargetId, FakeDebugger) {
        self.add_target_with(name, FakeDebugger::new())
    }

    pub fn add_target_with(&mut self, name: &str, debugger: FakeDebugger) -> (TargetId, FakeDebugger) {
        let id = TargetId::new(self.next_target);
        self.next_target += 1;
        self.debuggers.push((id, debugger.clone()));
        self.manager
            .target_added(Target::new(id, name, Box::new(debugger.clone())));
        self.pump();
        (id, debugger)
    }

    pub fn remove_target(&mut self, target: TargetId) {
        self.manager.target_removed(target);
        self.debuggers.retain(|(id, _)| *id != target);
        self.pump();
    }

    pub fn add_source(&mut self, project_id: &str, path: &str, url: Option<&str>) -> UiSourceCode {
        let source = UiSourceCode::new(
            project_id,
            path,
            url.map(String::from),
            ContentType::Script,
        );
        self.workspace.add_source(source.clone());
        self.pump();
        source
    }

    pub fn remove_source(&mut self, source: &UiSourceCode) {
        self.workspace
            .remove_source(source.project_id(), source.path());
        self.pump();
    }

    /// Load a script into one target's VM and bind it to its URL with an
    /// identity line mapping.
    pub fn load_script(&mut self, target: TargetId, url: &str, script_id: &str) {
        self.load_script_shifted(target, url, script_id, 0);
    }

    pub fn load_script_shifted(
        &mut self,
        target: TargetId,
        url: &str,
        script_id: &str,
        line_shift: i64,
    ) {
        self.mapping.bind(target, script_id, url, line_shift);
        if let Some(debugger) = self.debugger(target) {
            debugger.load_script(url, script_id);
        }
        self.pump();
    }

    pub fn debugger(&self, target: TargetId) -> Option<FakeDebugger> {
        self.debuggers
            .iter()
            .find(|(id, _)| *id == target)
            .map(|(_, debugger)| debugger.clone())
    }

    /// Deliver queued events until nothing moves anymore. Handling one event
    /// may enqueue others (a set response triggers a re-sync, say), hence
    /// the outer loop.
    pub fn pump(&mut self) {
        loop {
            let mut progressed = false;

            loop {
                match self.workspace_rx.try_recv() {
                    Ok(event) => {
                        self.manager.handle_workspace_event(event);
                        progressed = true;
                    },
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }

            let debuggers = self.debuggers.clone();
            for (target, debugger) in debuggers {
                for event in debugger.take_events() {
                    self.manager.handle_debugger_event(target, event);
                    progressed = true;
                }
            }

            if !progressed {
                break;
            }
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
