//
// fake_mapping.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use tether_model::ScriptLocation;
use tether_model::TargetId;
use tether_model::UiLocation;
use tether_model::UiSourceCode;
use tether_model::Workspace;

use crate::binding::LocationMapping;

#[derive(Debug, Clone)]
struct Binding {
    script_id: String,
    url: String,
    /// `ui_line = raw_line + line_shift`; zero models an identity mapping.
    line_shift: i64,
}

#[derive(Debug, Default)]
struct State {
    bindings: Vec<(TargetId, Binding)>,
}

/// Table-driven source mapping. Unbound scripts translate to `None` in both
/// directions, which pushes the manager onto its URL fallback.
#[derive(Debug, Clone)]
pub struct FakeMapping {
    workspace: Workspace,
    state: Arc<Mutex<State>>,
}

impl FakeMapping {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn bind(&self, target: TargetId, script_id: &str, url: &str, line_shift: i64) {
        let mut state = self.state.lock().unwrap();
        state.bindings.retain(|(bound_target, binding)| {
            !(*bound_target == target && binding.script_id == script_id)
        });
        state.bindings.push((target, Binding {
            script_id: script_id.to_string(),
            url: url.to_string(),
            line_shift,
        }));
    }

    pub fn unbind(&self, target: TargetId, script_id: &str) {
        self.state.lock().unwrap().bindings.retain(|(bound_target, binding)| {
            !(*bound_target == target && binding.script_id == script_id)
        });
    }

    fn lookup(
        &self,
        target: TargetId,
        select: impl Fn(&Binding) -> bool,
    ) -> Option<Binding> {
        let state = self.state.lock().unwrap();
        state
            .bindings
            .iter()
            .find(|(bound_target, binding)| *bound_target == target && select(binding))
            .map(|(_, binding)| binding.clone())
    }
}

impl LocationMapping for FakeMapping {
    fn ui_to_raw(
        &self,
        target: TargetId,
        source: &UiSourceCode,
        line_number: u32,
        column_number: u32,
    ) -> Option<ScriptLocation> {
        let url = source.url()?;
        let binding = self.lookup(target, |binding| binding.url == url)?;
        let raw_line = u32::try_from(i64::from(line_number) - binding.line_shift).ok()?;
        Some(ScriptLocation::new(
            binding.script_id,
            raw_line,
            column_number,
        ))
    }

    fn raw_to_ui(&self, target: TargetId, location: &ScriptLocation) -> Option<UiLocation> {
        let binding = self.lookup(target, |binding| binding.script_id == location.script_id)?;
        let source = self.workspace.source_for_url(&binding.url)?;
        let ui_line = u32::try_from(i64::from(location.line_number) + binding.line_shift).ok()?;
        Some(source.ui_location(ui_line, location.column_number))
    }
}
