//
// breakpoint.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::fmt;

use rustc_hash::FxHashMap;
use tether_model::SourceFileId;
use tether_model::TargetId;
use tether_model::UiLocation;

use crate::breakpoints::storage::BreakpointStorageItem;
use crate::breakpoints::storage::StorageKey;
use crate::breakpoints::target_breakpoint::TargetBreakpoint;

/// Manager-scoped identity of one logical breakpoint. Stable for the
/// breakpoint's whole lifetime, including while it is provisional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(pub(crate) u64);

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "breakpoint-{}", self.0)
    }
}

/// One logical breakpoint, declared against a project-relative path at a
/// line/column. Fans out to one `TargetBreakpoint` per observed target.
///
/// UI presence is reference counted: several debugger locations (across
/// targets or sub-ranges) may collapse onto one UI location, which must
/// appear in the index exactly once. While no real location has resolved,
/// a synthetic "fake" location at the declared line/column keeps the
/// breakpoint visible; the fake and a positive real count are mutually
/// exclusive.
#[derive(Debug)]
pub struct Breakpoint {
    id: BreakpointId,
    project_id: String,
    path: String,
    source_file_id: Option<SourceFileId>,
    line_number: u32,
    column_number: u32,

    pub(crate) condition: String,
    pub(crate) enabled: bool,
    pub(crate) is_removed: bool,

    /// Count of live debugger locations resolving to each UI location.
    pub(crate) debugger_locations_for_ui_location: FxHashMap<UiLocation, u32>,
    pub(crate) fake_primary_location: Option<UiLocation>,
    pub(crate) target_breakpoints: FxHashMap<TargetId, TargetBreakpoint>,
}

impl Breakpoint {
    pub(crate) fn new(
        id: BreakpointId,
        project_id: impl Into<String>,
        path: impl Into<String>,
        source_file_id: Option<SourceFileId>,
        line_number: u32,
        column_number: u32,
    ) -> Self {
        Self {
            id,
            project_id: project_id.into(),
            path: path.into(),
            source_file_id,
            line_number,
            column_number,
            condition: String::new(),
            enabled: false,
            is_removed: false,
            debugger_locations_for_ui_location: FxHashMap::default(),
            fake_primary_location: None,
            target_breakpoints: FxHashMap::default(),
        }
    }

    pub fn id(&self) -> BreakpointId {
        self.id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    pub fn column_number(&self) -> u32 {
        self.column_number
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn source_file_id(&self) -> Option<&SourceFileId> {
        self.source_file_id.as_ref()
    }

    /// Whether any real debugger location currently resolves for this
    /// breakpoint.
    pub fn has_resolved_locations(&self) -> bool {
        !self.debugger_locations_for_ui_location.is_empty()
    }

    pub(crate) fn storage_key(&self) -> Option<StorageKey> {
        Some(StorageKey {
            source_file_id: self.source_file_id.clone()?,
            line_number: self.line_number,
            column_number: self.column_number,
        })
    }

    pub(crate) fn storage_item(&self) -> Option<BreakpointStorageItem> {
        Some(BreakpointStorageItem {
            source_file_id: self.source_file_id.clone()?.as_str().to_string(),
            line_number: self.line_number,
            column_number: self.column_number,
            condition: self.condition.clone(),
            enabled: self.enabled,
        })
    }
}
