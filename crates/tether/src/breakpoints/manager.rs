//
// manager.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::collections::BTreeMap;

use crossbeam::channel::Receiver;
use rustc_hash::FxHashMap;
use tether_model::ContentType;
use tether_model::ScriptLocation;
use tether_model::SourceFileId;
use tether_model::TargetId;
use tether_model::UiLocation;
use tether_model::UiSourceCode;
use tether_model::Workspace;
use tether_model::WorkspaceEvent;

use crate::binding::LiveLocation;
use crate::binding::LocationMapping;
use crate::breakpoints::breakpoint::Breakpoint;
use crate::breakpoints::breakpoint::BreakpointId;
use crate::breakpoints::storage::Setting;
use crate::breakpoints::storage::Storage;
use crate::breakpoints::storage::StorageKey;
use crate::breakpoints::target_breakpoint::TargetBreakpoint;
use crate::debugger::DebuggerBreakpointId;
use crate::debugger::DebuggerEvent;
use crate::debugger::RequestId;
use crate::debugger::Target;
use crate::events::BreakpointEvent;
use crate::events::EventDispatcher;

/// Target lifecycle notifications, delivered by the embedder (or the
/// session pump) as targets appear and disappear.
pub trait TargetObserver {
    fn target_added(&mut self, target: Target);
    fn target_removed(&mut self, target: TargetId);
}

/// Identity of a source within the manager's indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SourceKey {
    project_id: String,
    path: String,
}

impl SourceKey {
    fn of(source: &UiSourceCode) -> Self {
        Self {
            project_id: source.project_id().to_string(),
            path: source.path().to_string(),
        }
    }

    fn from_parts(project_id: &str, path: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            path: path.to_string(),
        }
    }
}

/// Per-source slice of the location index: line -> column -> breakpoints.
/// Buckets are cleaned up at every level when they empty out.
#[derive(Debug)]
struct SourceLocations {
    source: UiSourceCode,
    lines: BTreeMap<u32, BTreeMap<u32, Vec<BreakpointId>>>,
}

/// Coordinates breakpoints across the workspace and every observed target.
///
/// One instance per workspace session. All collections are owned here;
/// collaborating state (per-breakpoint, per-target-breakpoint) lives inside
/// the breakpoints the manager owns, and every mutation funnels through
/// `&mut self` methods, so event handlers never interleave.
pub struct BreakpointManager {
    workspace: Workspace,
    mapping: Box<dyn LocationMapping>,
    storage: Storage,
    events: EventDispatcher,

    targets: BTreeMap<TargetId, Target>,
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,

    /// Resolved (and fake) UI locations: the sole source of truth for what
    /// breakpoints a file shows and where.
    location_index: FxHashMap<SourceKey, SourceLocations>,

    /// Breakpoints declared against each source's primary representation,
    /// used to preserve them as provisional across unload/reload.
    primary_index: FxHashMap<SourceKey, Vec<BreakpointId>>,

    /// Breakpoints whose declared source is currently not loaded, keyed by
    /// their persistence id so a reappearing source can reclaim them.
    provisional: FxHashMap<SourceFileId, Vec<BreakpointId>>,

    /// Global gate, independent of per-breakpoint enabled state.
    breakpoints_active: bool,

    /// In-flight set requests: responses for tokens not found here are
    /// stale and dropped.
    pending_sets: FxHashMap<(TargetId, RequestId), BreakpointId>,

    /// In-flight remove requests, with the debugger id being removed so a
    /// late completion can be matched against the current binding.
    pending_removes: FxHashMap<(TargetId, RequestId), (BreakpointId, DebuggerBreakpointId)>,

    /// Routes `BreakpointResolved` events to the owning breakpoint.
    resolved_routes: FxHashMap<(TargetId, DebuggerBreakpointId), BreakpointId>,

    next_breakpoint_id: u64,
    next_request_id: u64,
}

impl BreakpointManager {
    pub fn new(
        setting: Box<dyn Setting>,
        workspace: Workspace,
        mapping: Box<dyn LocationMapping>,
    ) -> Self {
        Self {
            workspace,
            mapping,
            storage: Storage::new(setting),
            events: EventDispatcher::new(),
            targets: BTreeMap::new(),
            breakpoints: BTreeMap::new(),
            location_index: FxHashMap::default(),
            primary_index: FxHashMap::default(),
            provisional: FxHashMap::default(),
            breakpoints_active: true,
            pending_sets: FxHashMap::default(),
            pending_removes: FxHashMap::default(),
            resolved_routes: FxHashMap::default(),
            next_breakpoint_id: 1,
            next_request_id: 1,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<BreakpointEvent> {
        self.events.subscribe()
    }

    // --- Public mutation surface ------------------------------------------

    /// Create a breakpoint, or update the condition/enabled state of the one
    /// already at this exact location. Creating a breakpoint is a user
    /// gesture, so it always re-activates the global gate.
    pub fn set_breakpoint(
        &mut self,
        source: &UiSourceCode,
        line_number: u32,
        column_number: u32,
        condition: &str,
        enabled: bool,
    ) -> BreakpointId {
        self.set_breakpoints_active(true);
        self.inner_set_breakpoint(source, line_number, column_number, condition, enabled)
    }

    pub fn set_breakpoint_enabled(&mut self, id: BreakpointId, enabled: bool) {
        let Some(breakpoint) = self.breakpoints.get(&id) else {
            return;
        };
        let condition = breakpoint.condition.clone();
        self.update_state(id, &condition, enabled);
    }

    pub fn set_breakpoint_condition(&mut self, id: BreakpointId, condition: &str) {
        let Some(breakpoint) = self.breakpoints.get(&id) else {
            return;
        };
        let enabled = breakpoint.enabled;
        self.update_state(id, condition, enabled);
    }

    /// Remove a breakpoint everywhere. `keep_in_storage` preserves the
    /// persisted record, e.g. when the source was merely unloaded or the
    /// backend refused a presumably transient set.
    pub fn remove_breakpoint(&mut self, id: BreakpointId, keep_in_storage: bool) {
        if !self.breakpoints.contains_key(&id) {
            return;
        }
        if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
            breakpoint.is_removed = true;
        }
        self.remove_fake_primary_location(id);

        let targets: Vec<TargetId> = self
            .breakpoints
            .get(&id)
            .map(|breakpoint| breakpoint.target_breakpoints.keys().copied().collect())
            .unwrap_or_default();
        for target in targets {
            self.remove_from_debugger(id, target, false);
        }

        let (source_key, file_id) = match self.breakpoints.get(&id) {
            Some(breakpoint) => (
                SourceKey::from_parts(breakpoint.project_id(), breakpoint.path()),
                breakpoint.source_file_id().cloned(),
            ),
            None => return,
        };
        if let Some(list) = self.primary_index.get_mut(&source_key) {
            list.retain(|other| *other != id);
            if list.is_empty() {
                self.primary_index.remove(&source_key);
            }
        }
        if let Some(file_id) = file_id {
            if let Some(list) = self.provisional.get_mut(&file_id) {
                list.retain(|other| *other != id);
                if list.is_empty() {
                    self.provisional.remove(&file_id);
                }
            }
        }

        if !keep_in_storage {
            if let Some(breakpoint) = self.breakpoints.get(&id) {
                self.storage.remove_breakpoint(breakpoint);
            }
        }

        // Late responses for this breakpoint become unroutable and get
        // dropped on arrival
        self.pending_sets.retain(|_, other| *other != id);
        self.pending_removes.retain(|_, (other, _)| *other != id);
        self.resolved_routes.retain(|_, other| *other != id);

        self.breakpoints.remove(&id);
    }

    /// Global master switch. Independent of individual breakpoints'
    /// enabled flags; when inactive, every target suppresses all
    /// breakpoints. Re-enabling a single breakpoint does not flip this
    /// back on.
    pub fn set_breakpoints_active(&mut self, active: bool) {
        if self.breakpoints_active == active {
            return;
        }
        self.breakpoints_active = active;
        for target in self.targets.values_mut() {
            target.backend_mut().set_breakpoints_active(active);
        }
        self.events
            .dispatch(BreakpointEvent::ActiveStateChanged(active));
    }

    pub fn breakpoints_active(&self) -> bool {
        self.breakpoints_active
    }

    /// Bulk enable/disable over a snapshot, so mutation during iteration is
    /// safe.
    pub fn toggle_all_breakpoints(&mut self, enabled: bool) {
        for id in self.all_breakpoints() {
            self.set_breakpoint_enabled(id, enabled);
        }
    }

    pub fn remove_all_breakpoints(&mut self) {
        for id in self.all_breakpoints() {
            self.remove_breakpoint(id, false);
        }
    }

    /// Drop every breakpoint currently waiting for its source to load.
    pub fn remove_provisional_breakpoints(&mut self) {
        let ids: Vec<BreakpointId> = self.provisional.values().flatten().copied().collect();
        for id in ids {
            self.remove_breakpoint(id, false);
        }
        self.provisional.clear();
    }

    // --- Event entry points -----------------------------------------------

    pub fn handle_workspace_event(&mut self, event: WorkspaceEvent) {
        match event {
            WorkspaceEvent::UiSourceCodeAdded(source) => self.restore_breakpoints(&source),
            WorkspaceEvent::UiSourceCodeRemoved(source) => self.remove_ui_source_code(&source),
            WorkspaceEvent::ProjectRemoved { sources, .. } => {
                for source in sources {
                    self.remove_ui_source_code(&source);
                }
            },
        }
    }

    pub fn handle_debugger_event(&mut self, target: TargetId, event: DebuggerEvent) {
        match event {
            DebuggerEvent::BreakpointSet {
                request,
                debugger_id,
                locations,
            } => self.did_set_breakpoint(target, request, debugger_id, locations),
            DebuggerEvent::BreakpointRemoved { request } => {
                self.did_remove_breakpoint(target, request)
            },
            DebuggerEvent::BreakpointResolved {
                debugger_id,
                location,
            } => {
                let Some(id) = self.resolved_routes.get(&(target, debugger_id.clone())).copied()
                else {
                    log::trace!(
                        "Breakpoints: Dropping resolution of unknown {debugger_id} in {target}"
                    );
                    return;
                };
                self.add_resolved_location(id, target, location);
            },
            DebuggerEvent::DebuggerEnabled => {
                for id in self.breakpoints_for_target(target) {
                    self.update_in_debugger(id, target);
                }
            },
            DebuggerEvent::DebuggerDisabled => {
                for id in self.breakpoints_for_target(target) {
                    self.clean_up_after_debugger_is_gone(id, target);
                }
            },
        }
    }

    /// A target's source mapping for `source` changed. Identity remaps are
    /// uninteresting; anything else re-resolves this one target without
    /// touching the others.
    pub fn source_mapping_changed(
        &mut self,
        source: &UiSourceCode,
        target: TargetId,
        is_identity: bool,
    ) {
        if is_identity {
            return;
        }
        if !matches!(
            source.content_type(),
            ContentType::Script | ContentType::Document
        ) {
            return;
        }
        let ids = self
            .primary_index
            .get(&SourceKey::of(source))
            .cloned()
            .unwrap_or_default();
        for id in ids {
            let has_target = self
                .breakpoints
                .get(&id)
                .map(|breakpoint| breakpoint.target_breakpoints.contains_key(&target))
                .unwrap_or(false);
            if has_target {
                self.update_in_debugger(id, target);
            }
        }
    }

    // --- Query surface ----------------------------------------------------

    pub fn breakpoint(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints.get(&id)
    }

    /// The breakpoint occupying this exact `(source, line, column)` slot.
    /// The clash rule keeps slots unique, so at most one can match.
    pub fn find_breakpoint(
        &self,
        source: &UiSourceCode,
        line_number: u32,
        column_number: u32,
    ) -> Option<BreakpointId> {
        let entry = self.location_index.get(&SourceKey::of(source))?;
        let columns = entry.lines.get(&line_number)?;
        columns.get(&column_number)?.first().copied()
    }

    /// The first breakpoint at any column on this line (lowest column
    /// first).
    pub fn find_breakpoint_on_line(
        &self,
        source: &UiSourceCode,
        line_number: u32,
    ) -> Option<BreakpointId> {
        let entry = self.location_index.get(&SourceKey::of(source))?;
        let columns = entry.lines.get(&line_number)?;
        columns.values().next()?.first().copied()
    }

    /// Every breakpoint with a resolved (or fake) location in this source.
    /// A breakpoint resolving to several locations appears once per slot.
    pub fn breakpoints_for_ui_source_code(&self, source: &UiSourceCode) -> Vec<BreakpointId> {
        let Some(entry) = self.location_index.get(&SourceKey::of(source)) else {
            return Vec::new();
        };
        entry
            .lines
            .values()
            .flat_map(|columns| columns.values())
            .flatten()
            .copied()
            .collect()
    }

    /// Every live breakpoint, including provisional ones with no resolved
    /// location.
    pub fn all_breakpoints(&self) -> Vec<BreakpointId> {
        self.breakpoints.keys().copied().collect()
    }

    pub fn is_provisional(&self, id: BreakpointId) -> bool {
        self.provisional.values().any(|list| list.contains(&id))
    }

    pub fn breakpoint_locations_for_ui_source_code(
        &self,
        source: &UiSourceCode,
    ) -> Vec<(BreakpointId, UiLocation)> {
        let Some(entry) = self.location_index.get(&SourceKey::of(source)) else {
            return Vec::new();
        };
        Self::entry_locations(entry)
    }

    pub fn all_breakpoint_locations(&self) -> Vec<(BreakpointId, UiLocation)> {
        self.location_index
            .values()
            .flat_map(Self::entry_locations)
            .collect()
    }

    fn entry_locations(entry: &SourceLocations) -> Vec<(BreakpointId, UiLocation)> {
        let mut result = Vec::new();
        for (line, columns) in &entry.lines {
            for (column, ids) in columns {
                for id in ids {
                    result.push((*id, entry.source.ui_location(*line, *column)));
                }
            }
        }
        result
    }

    // --- Workspace state machine ------------------------------------------

    /// A source (re)appeared: revive matching provisional breakpoints and
    /// construct the rest from storage. Muted end to end so restoring does
    /// not write the restored items straight back.
    fn restore_breakpoints(&mut self, source: &UiSourceCode) {
        let Some(file_id) = source.source_file_id() else {
            return;
        };

        self.storage.mute();

        let items = self.storage.breakpoint_items(source);

        let mut provisional_by_key: FxHashMap<StorageKey, BreakpointId> = FxHashMap::default();
        for id in self.provisional.get(&file_id).cloned().unwrap_or_default() {
            if let Some(key) = self
                .breakpoints
                .get(&id)
                .and_then(|breakpoint| breakpoint.storage_key())
            {
                provisional_by_key.insert(key, id);
            }
        }

        for item in items {
            let key = StorageKey {
                source_file_id: SourceFileId::new(item.source_file_id.clone()),
                line_number: item.line_number,
                column_number: item.column_number,
            };
            match provisional_by_key.get(&key).copied() {
                Some(id) => {
                    // Same logical breakpoint, detached when its file
                    // unloaded: reattach and force recomputation
                    self.primary_index
                        .entry(SourceKey::of(source))
                        .or_default()
                        .push(id);
                    self.update_breakpoint(id);
                },
                None => {
                    self.inner_set_breakpoint(
                        source,
                        item.line_number,
                        item.column_number,
                        &item.condition,
                        item.enabled,
                    );
                },
            }
        }
        self.provisional.remove(&file_id);

        self.storage.unmute();
    }

    /// A source went away: clear its breakpoints out of the location index
    /// and re-file the enabled ones as provisional for later reattachment.
    fn remove_ui_source_code(&mut self, source: &UiSourceCode) {
        let ids = self
            .primary_index
            .remove(&SourceKey::of(source))
            .unwrap_or_default();
        let file_id = source.source_file_id();
        for id in ids {
            self.reset_locations(id);
            let enabled = self
                .breakpoints
                .get(&id)
                .map(|breakpoint| breakpoint.enabled)
                .unwrap_or(false);
            match (&file_id, enabled) {
                (Some(file_id), true) => {
                    self.provisional.entry(file_id.clone()).or_default().push(id);
                },
                _ => {
                    // Unpersistable or disabled: nothing will reclaim it, so
                    // drop it while keeping any stored record
                    self.remove_breakpoint(id, true);
                },
            }
        }
    }

    // --- Breakpoint state -------------------------------------------------

    fn inner_set_breakpoint(
        &mut self,
        source: &UiSourceCode,
        line_number: u32,
        column_number: u32,
        condition: &str,
        enabled: bool,
    ) -> BreakpointId {
        if let Some(id) = self.find_breakpoint(source, line_number, column_number) {
            self.update_state(id, condition, enabled);
            return id;
        }

        let id = self.next_breakpoint_id();
        let breakpoint = Breakpoint::new(
            id,
            source.project_id(),
            source.path(),
            source.source_file_id(),
            line_number,
            column_number,
        );
        self.breakpoints.insert(id, breakpoint);

        let targets: Vec<TargetId> = self.targets.keys().copied().collect();
        if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
            for target in &targets {
                breakpoint
                    .target_breakpoints
                    .insert(*target, TargetBreakpoint::new(*target));
            }
        }

        self.primary_index
            .entry(SourceKey::of(source))
            .or_default()
            .push(id);

        self.initialize_state(id, condition, enabled);
        id
    }

    /// Unconditional first application of condition/enabled, run once at
    /// construction.
    fn initialize_state(&mut self, id: BreakpointId, condition: &str, enabled: bool) {
        if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
            breakpoint.condition = condition.to_string();
            breakpoint.enabled = enabled;
        }
        if let Some(breakpoint) = self.breakpoints.get(&id) {
            self.storage.update_breakpoint(breakpoint);
        }
        self.update_breakpoint(id);
    }

    /// Both `set_enabled` and `set_condition` funnel through here. No-op
    /// when neither value changes: no storage write, no re-sync.
    fn update_state(&mut self, id: BreakpointId, condition: &str, enabled: bool) {
        {
            let Some(breakpoint) = self.breakpoints.get_mut(&id) else {
                return;
            };
            if breakpoint.condition == condition && breakpoint.enabled == enabled {
                return;
            }
            breakpoint.condition = condition.to_string();
            breakpoint.enabled = enabled;
        }
        if let Some(breakpoint) = self.breakpoints.get(&id) {
            self.storage.update_breakpoint(breakpoint);
        }
        self.update_breakpoint(id);
    }

    /// Recompute UI presence and re-sync every target.
    fn update_breakpoint(&mut self, id: BreakpointId) {
        self.remove_fake_primary_location(id);
        self.fake_primary_location(id);
        let targets: Vec<TargetId> = match self.breakpoints.get(&id) {
            Some(breakpoint) => breakpoint.target_breakpoints.keys().copied().collect(),
            None => return,
        };
        for target in targets {
            self.update_in_debugger(id, target);
        }
    }

    fn reset_locations(&mut self, id: BreakpointId) {
        self.remove_fake_primary_location(id);
        let targets: Vec<TargetId> = match self.breakpoints.get(&id) {
            Some(breakpoint) => breakpoint.target_breakpoints.keys().copied().collect(),
            None => return,
        };
        for target in targets {
            self.reset_target_locations(id, target);
        }
    }

    // --- Location update protocol -----------------------------------------

    /// A debugger location resolved or moved. Ordering matters: drop the
    /// old reference and the fake before counting the new reference, so
    /// the new slot sees a clean index.
    fn replace_ui_location(&mut self, id: BreakpointId, old: Option<UiLocation>, new: UiLocation) {
        let removed = self
            .breakpoints
            .get(&id)
            .map(|breakpoint| breakpoint.is_removed)
            .unwrap_or(true);
        if removed {
            return;
        }

        if let Some(old) = old {
            self.remove_ui_location(id, &old, true);
        }
        self.remove_fake_primary_location(id);

        let first = {
            let Some(breakpoint) = self.breakpoints.get_mut(&id) else {
                return;
            };
            let count = breakpoint
                .debugger_locations_for_ui_location
                .entry(new.clone())
                .or_insert(0);
            *count += 1;
            *count == 1
        };
        if first {
            self.ui_location_added(id, new);
        }
    }

    /// Drop one reference; only at zero does the slot empty out and (unless
    /// muted) the fake come back.
    fn remove_ui_location(&mut self, id: BreakpointId, location: &UiLocation, mute_fake: bool) {
        {
            let Some(breakpoint) = self.breakpoints.get_mut(&id) else {
                return;
            };
            let Some(count) = breakpoint
                .debugger_locations_for_ui_location
                .get_mut(location)
            else {
                return;
            };
            *count -= 1;
            if *count != 0 {
                return;
            }
            breakpoint
                .debugger_locations_for_ui_location
                .remove(location);
        }
        self.ui_location_removed(id, location.clone());
        if !mute_fake {
            self.fake_primary_location(id);
        }
    }

    /// Show the declared location while nothing real has resolved. Requires
    /// a loaded source; a provisional breakpoint occupies no slot at all.
    fn fake_primary_location(&mut self, id: BreakpointId) {
        let (project_id, path, line_number, column_number) = {
            let Some(breakpoint) = self.breakpoints.get(&id) else {
                return;
            };
            if breakpoint.is_removed
                || breakpoint.has_resolved_locations()
                || breakpoint.fake_primary_location.is_some()
            {
                return;
            }
            (
                breakpoint.project_id().to_string(),
                breakpoint.path().to_string(),
                breakpoint.line_number(),
                breakpoint.column_number(),
            )
        };
        let Some(source) = self.workspace.ui_source_code(&project_id, &path) else {
            return;
        };
        let ui_location = source.ui_location(line_number, column_number);
        if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
            breakpoint.fake_primary_location = Some(ui_location.clone());
        }
        self.ui_location_added(id, ui_location);
    }

    fn remove_fake_primary_location(&mut self, id: BreakpointId) {
        let taken = match self.breakpoints.get_mut(&id) {
            Some(breakpoint) => breakpoint.fake_primary_location.take(),
            None => None,
        };
        if let Some(ui_location) = taken {
            self.ui_location_removed(id, ui_location);
        }
    }

    // --- Target sync ------------------------------------------------------

    /// The central per-target re-sync: always fully remove any existing
    /// binding first, then set anew if the breakpoint should be live there.
    fn update_in_debugger(&mut self, id: BreakpointId, target: TargetId) {
        self.remove_from_debugger(id, target, true);

        let (enabled, line_number, column_number, condition, project_id, path) = {
            let Some(breakpoint) = self.breakpoints.get(&id) else {
                return;
            };
            if breakpoint.is_removed {
                return;
            }
            (
                breakpoint.enabled,
                breakpoint.line_number(),
                breakpoint.column_number(),
                breakpoint.condition.clone(),
                breakpoint.project_id().to_string(),
                breakpoint.path().to_string(),
            )
        };
        if !enabled {
            return;
        }
        let Some(source) = self.workspace.ui_source_code(&project_id, &path) else {
            return;
        };
        if source.has_diverged_from_vm(target) {
            return;
        }
        let debugger_enabled = match self.targets.get(&target) {
            Some(target) => target.backend().debugger_enabled(),
            None => return,
        };
        if !debugger_enabled {
            return;
        }

        let raw = self
            .mapping
            .ui_to_raw(target, &source, line_number, column_number);
        if raw.is_none() && source.url().is_none() {
            // No mapping and no URL to fall back to: stay unbound
            return;
        }

        let request = self.next_request();
        self.pending_sets.insert((target, request), id);
        if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
            if let Some(target_breakpoint) = breakpoint.target_breakpoints.get_mut(&target) {
                target_breakpoint.pending_set = Some(request);
            }
        }

        let Some(target_state) = self.targets.get_mut(&target) else {
            // Not reachable while the debugger_enabled check above holds, but
            // keep both pending records in sync if it ever is
            self.pending_sets.remove(&(target, request));
            if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
                if let Some(target_breakpoint) = breakpoint.target_breakpoints.get_mut(&target) {
                    target_breakpoint.pending_set = None;
                }
            }
            return;
        };
        match raw {
            Some(location) => {
                target_state
                    .backend_mut()
                    .set_breakpoint_by_location(&location, &condition, request)
            },
            None => {
                let url = source.url().unwrap_or_default();
                target_state.backend_mut().set_breakpoint_by_url(
                    url,
                    line_number,
                    column_number,
                    &condition,
                    request,
                );
            },
        }
    }

    /// Tear down one (breakpoint, target) binding. `callback_immediately`
    /// completes the removal synchronously (used by re-syncs, so no set can
    /// overlap a pending remove); otherwise completion waits for the
    /// backend's response, guarded against late delivery.
    fn remove_from_debugger(&mut self, id: BreakpointId, target: TargetId, callback_immediately: bool) {
        self.reset_target_locations(id, target);

        // Cancel any in-flight set; its response is stale from here on
        let pending = match self.breakpoints.get_mut(&id) {
            Some(breakpoint) => breakpoint
                .target_breakpoints
                .get_mut(&target)
                .and_then(|target_breakpoint| target_breakpoint.pending_set.take()),
            None => return,
        };
        if let Some(request) = pending {
            self.pending_sets.remove(&(target, request));
        }

        let Some(debugger_id) = self
            .breakpoints
            .get(&id)
            .and_then(|breakpoint| breakpoint.target_breakpoints.get(&target))
            .and_then(|target_breakpoint| target_breakpoint.debugger_id.clone())
        else {
            return;
        };

        if callback_immediately {
            if let Some(target_state) = self.targets.get_mut(&target) {
                target_state.backend_mut().remove_breakpoint(&debugger_id, None);
            }
            self.did_remove_from_debugger(id, target, &debugger_id);
        } else {
            let request = self.next_request();
            self.pending_removes
                .insert((target, request), (id, debugger_id.clone()));
            if let Some(target_state) = self.targets.get_mut(&target) {
                target_state
                    .backend_mut()
                    .remove_breakpoint(&debugger_id, Some(request));
            }
        }
    }

    fn did_remove_from_debugger(
        &mut self,
        id: BreakpointId,
        target: TargetId,
        debugger_id: &DebuggerBreakpointId,
    ) {
        self.reset_target_locations(id, target);
        self.resolved_routes.remove(&(target, debugger_id.clone()));
        if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
            if let Some(target_breakpoint) = breakpoint.target_breakpoints.get_mut(&target) {
                if target_breakpoint.debugger_id.as_ref() == Some(debugger_id) {
                    target_breakpoint.debugger_id = None;
                }
            }
        }
    }

    fn reset_target_locations(&mut self, id: BreakpointId, target: TargetId) {
        let locations: Vec<UiLocation> = {
            let Some(breakpoint) = self.breakpoints.get_mut(&id) else {
                return;
            };
            let Some(target_breakpoint) = breakpoint.target_breakpoints.get_mut(&target) else {
                return;
            };
            target_breakpoint
                .live_locations
                .drain(..)
                .map(|live| live.ui)
                .collect()
        };
        for ui_location in locations {
            self.remove_ui_location(id, &ui_location, false);
        }
    }

    /// Debugger went away for this target: drop bindings, keep the logical
    /// breakpoint.
    fn clean_up_after_debugger_is_gone(&mut self, id: BreakpointId, target: TargetId) {
        self.reset_target_locations(id, target);
        let pending = match self.breakpoints.get_mut(&id) {
            Some(breakpoint) => breakpoint
                .target_breakpoints
                .get_mut(&target)
                .and_then(|target_breakpoint| target_breakpoint.pending_set.take()),
            None => return,
        };
        if let Some(request) = pending {
            self.pending_sets.remove(&(target, request));
        }
        let debugger_id = self
            .breakpoints
            .get(&id)
            .and_then(|breakpoint| breakpoint.target_breakpoints.get(&target))
            .and_then(|target_breakpoint| target_breakpoint.debugger_id.clone());
        if let Some(debugger_id) = debugger_id {
            self.did_remove_from_debugger(id, target, &debugger_id);
        }
    }

    // --- Backend responses ------------------------------------------------

    fn did_set_breakpoint(
        &mut self,
        target: TargetId,
        request: RequestId,
        debugger_id: Option<DebuggerBreakpointId>,
        locations: Vec<ScriptLocation>,
    ) {
        let Some(id) = self.pending_sets.remove(&(target, request)) else {
            // The request was superseded or its breakpoint removed while in
            // flight, but the backend already installed this breakpoint
            log::trace!("Breakpoints: Dropping stale set response {request} from {target}");
            self.discard_unclaimed_binding(target, debugger_id);
            return;
        };
        let claimed = match self
            .breakpoints
            .get_mut(&id)
            .and_then(|breakpoint| breakpoint.target_breakpoints.get_mut(&target))
        {
            Some(target_breakpoint) if target_breakpoint.pending_set == Some(request) => {
                target_breakpoint.pending_set = None;
                true
            },
            _ => false,
        };
        if !claimed {
            log::trace!("Breakpoints: Set response {request} from {target} superseded, dropping");
            self.discard_unclaimed_binding(target, debugger_id);
            return;
        }

        let Some(debugger_id) = debugger_id else {
            // Deliberate escalation: an unsettable breakpoint is deleted
            // outright, with the stored record kept for the next load
            log::trace!("Breakpoints: {target} refused {id}, removing it");
            self.remove_breakpoint(id, true);
            return;
        };

        // A newer set response replaces any binding still standing
        let had_binding = self
            .breakpoints
            .get(&id)
            .and_then(|breakpoint| breakpoint.target_breakpoints.get(&target))
            .map(|target_breakpoint| target_breakpoint.debugger_id.is_some())
            .unwrap_or(false);
        if had_binding {
            self.remove_from_debugger(id, target, true);
        }

        if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
            if let Some(target_breakpoint) = breakpoint.target_breakpoints.get_mut(&target) {
                target_breakpoint.debugger_id = Some(debugger_id.clone());
            }
        }
        self.resolved_routes.insert((target, debugger_id), id);

        for location in locations {
            if !self.add_resolved_location(id, target, location) {
                return;
            }
        }
    }

    /// A set response nobody claims still installed a breakpoint in the VM.
    /// Take it back out so it can't keep firing.
    fn discard_unclaimed_binding(
        &mut self,
        target: TargetId,
        debugger_id: Option<DebuggerBreakpointId>,
    ) {
        let Some(debugger_id) = debugger_id else {
            return;
        };
        if let Some(target_state) = self.targets.get_mut(&target) {
            target_state.backend_mut().remove_breakpoint(&debugger_id, None);
        }
    }

    fn did_remove_breakpoint(&mut self, target: TargetId, request: RequestId) {
        let Some((id, debugger_id)) = self.pending_removes.remove(&(target, request)) else {
            log::trace!("Breakpoints: Dropping stale remove response {request} from {target}");
            return;
        };
        // Guard against a newer set having superseded this binding while the
        // remove was in flight
        let still_current = self
            .breakpoints
            .get(&id)
            .and_then(|breakpoint| breakpoint.target_breakpoints.get(&target))
            .map(|target_breakpoint| target_breakpoint.debugger_id.as_ref() == Some(&debugger_id))
            .unwrap_or(false);
        if still_current {
            self.did_remove_from_debugger(id, target, &debugger_id);
        }
    }

    /// Resolve one raw location into the UI. Returns `false` when the
    /// resolution killed the breakpoint (location clash).
    fn add_resolved_location(
        &mut self,
        id: BreakpointId,
        target: TargetId,
        location: ScriptLocation,
    ) -> bool {
        let Some(ui_location) = self.mapping.raw_to_ui(target, &location) else {
            log::trace!("Breakpoints: Can't map {location} in {target} back to a source");
            return true;
        };

        if let Some(existing) = self.find_breakpoint(
            &ui_location.source,
            ui_location.line_number,
            ui_location.column_number,
        ) {
            if existing != id {
                // Location clash: the earlier claim wins, this breakpoint
                // goes away quietly
                log::trace!(
                    "Breakpoints: {id} clashes with {existing} at {ui_location}, removing {id}"
                );
                self.remove_breakpoint(id, false);
                return false;
            }
        }

        self.location_updated(id, target, location, ui_location);
        true
    }

    /// Record the (raw, ui) binding on the target breakpoint and reflect the
    /// transition in the UI. A raw location re-resolving to its current UI
    /// location is a no-op.
    fn location_updated(
        &mut self,
        id: BreakpointId,
        target: TargetId,
        raw: ScriptLocation,
        ui_location: UiLocation,
    ) {
        let old = {
            let Some(breakpoint) = self.breakpoints.get_mut(&id) else {
                return;
            };
            let Some(target_breakpoint) = breakpoint.target_breakpoints.get_mut(&target) else {
                return;
            };
            match target_breakpoint
                .live_locations
                .iter_mut()
                .find(|live| live.raw == raw)
            {
                Some(live) => Some(std::mem::replace(&mut live.ui, ui_location.clone())),
                None => {
                    target_breakpoint.live_locations.push(LiveLocation {
                        raw,
                        ui: ui_location.clone(),
                    });
                    None
                },
            }
        };
        if old.as_ref() == Some(&ui_location) {
            return;
        }
        self.replace_ui_location(id, old, ui_location);
    }

    // --- Location index ---------------------------------------------------

    fn ui_location_added(&mut self, breakpoint: BreakpointId, ui_location: UiLocation) {
        let entry = self
            .location_index
            .entry(SourceKey::of(&ui_location.source))
            .or_insert_with(|| SourceLocations {
                source: ui_location.source.clone(),
                lines: BTreeMap::new(),
            });
        entry
            .lines
            .entry(ui_location.line_number)
            .or_default()
            .entry(ui_location.column_number)
            .or_default()
            .push(breakpoint);
        self.events.dispatch(BreakpointEvent::Added {
            breakpoint,
            ui_location,
        });
    }

    fn ui_location_removed(&mut self, breakpoint: BreakpointId, ui_location: UiLocation) {
        let key = SourceKey::of(&ui_location.source);
        let Some(entry) = self.location_index.get_mut(&key) else {
            return;
        };
        let Some(columns) = entry.lines.get_mut(&ui_location.line_number) else {
            return;
        };
        let Some(ids) = columns.get_mut(&ui_location.column_number) else {
            return;
        };
        ids.retain(|other| *other != breakpoint);
        if ids.is_empty() {
            columns.remove(&ui_location.column_number);
        }
        if columns.is_empty() {
            entry.lines.remove(&ui_location.line_number);
        }
        if entry.lines.is_empty() {
            self.location_index.remove(&key);
        }
        self.events.dispatch(BreakpointEvent::Removed {
            breakpoint,
            ui_location,
        });
    }

    // --- Helpers ----------------------------------------------------------

    fn breakpoints_for_target(&self, target: TargetId) -> Vec<BreakpointId> {
        self.breakpoints
            .values()
            .filter(|breakpoint| breakpoint.target_breakpoints.contains_key(&target))
            .map(|breakpoint| breakpoint.id())
            .collect()
    }

    fn next_breakpoint_id(&mut self) -> BreakpointId {
        let id = BreakpointId(self.next_breakpoint_id);
        self.next_breakpoint_id += 1;
        id
    }

    fn next_request(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl TargetObserver for BreakpointManager {
    fn target_added(&mut self, mut target: Target) {
        let target_id = target.id();
        if !self.breakpoints_active {
            target.backend_mut().set_breakpoints_active(false);
        }
        let debugger_enabled = target.backend().debugger_enabled();
        log::trace!("Breakpoints: Observing {target_id} ({})", target.name());
        if self.targets.insert(target_id, target).is_some() {
            log::warn!("Breakpoints: Replacing already-observed {target_id}");
        }

        let ids: Vec<BreakpointId> = self.breakpoints.keys().copied().collect();
        for id in ids {
            if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
                breakpoint
                    .target_breakpoints
                    .insert(target_id, TargetBreakpoint::new(target_id));
            }
            if debugger_enabled {
                self.update_in_debugger(id, target_id);
            }
        }
    }

    fn target_removed(&mut self, target: TargetId) {
        for id in self.breakpoints_for_target(target) {
            self.clean_up_after_debugger_is_gone(id, target);
            if let Some(breakpoint) = self.breakpoints.get_mut(&id) {
                breakpoint.target_breakpoints.remove(&target);
            }
        }
        self.targets.remove(&target);
    }
}

impl std::fmt::Debug for BreakpointManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakpointManager")
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .field("breakpoints", &self.breakpoints.keys().collect::<Vec<_>>())
            .field("breakpoints_active", &self.breakpoints_active)
            .finish_non_exhaustive()
    }
}
