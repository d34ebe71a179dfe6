//
// storage.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::Serialize;
use tether_model::SourceFileId;
use tether_model::UiSourceCode;

use crate::breakpoints::breakpoint::Breakpoint;

/// One persisted breakpoint record. The full list is saved on every
/// mutation; there is no incremental diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointStorageItem {
    pub source_file_id: String,
    pub line_number: u32,
    // Older records omitted the column
    #[serde(default)]
    pub column_number: u32,
    pub condition: String,
    pub enabled: bool,
}

/// Key under which a breakpoint is persisted. Breakpoints whose source has
/// no URL have no key and are skipped by storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct StorageKey {
    pub(crate) source_file_id: SourceFileId,
    pub(crate) line_number: u32,
    pub(crate) column_number: u32,
}

/// An opaque durable store for the breakpoint list.
pub trait Setting: Send {
    fn get(&self) -> Vec<BreakpointStorageItem>;
    fn set(&self, items: Vec<BreakpointStorageItem>);
}

/// In-memory setting. Cloneable so a test can hand the same store to a
/// fresh manager and exercise restore.
#[derive(Debug, Clone, Default)]
pub struct MemorySetting {
    items: Arc<Mutex<Vec<BreakpointStorageItem>>>,
}

impl MemorySetting {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Setting for MemorySetting {
    fn get(&self) -> Vec<BreakpointStorageItem> {
        self.items.lock().unwrap().clone()
    }

    fn set(&self, items: Vec<BreakpointStorageItem>) {
        *self.items.lock().unwrap() = items;
    }
}

/// JSON-file-backed setting. Saves are best effort; a missing or unreadable
/// file loads as an empty list.
#[derive(Debug, Clone)]
pub struct FileSetting {
    path: PathBuf,
}

impl FileSetting {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> anyhow::Result<Vec<BreakpointStorageItem>> {
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, items: &[BreakpointStorageItem]) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(items)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl Setting for FileSetting {
    fn get(&self) -> Vec<BreakpointStorageItem> {
        match self.load() {
            Ok(items) => items,
            Err(err) => {
                if self.path.exists() {
                    log::error!(
                        "Breakpoints: Can't load setting from {}: {err}",
                        self.path.display()
                    );
                }
                Vec::new()
            },
        }
    }

    fn set(&self, items: Vec<BreakpointStorageItem>) {
        if let Err(err) = self.save(&items) {
            log::error!(
                "Breakpoints: Can't save setting to {}: {err}",
                self.path.display()
            );
        }
    }
}

/// In-memory view of the persisted breakpoint list, keyed by
/// `(source_file_id, line, column)`.
///
/// `mute`/`unmute` bracket bulk restores so that re-deriving a breakpoint
/// from storage does not write it straight back as a duplicate save.
pub(crate) struct Storage {
    setting: Box<dyn Setting>,
    items: FxHashMap<StorageKey, BreakpointStorageItem>,
    muted: bool,
}

impl Storage {
    pub(crate) fn new(setting: Box<dyn Setting>) -> Self {
        let mut items = FxHashMap::default();
        for item in setting.get() {
            let key = StorageKey {
                source_file_id: SourceFileId::new(item.source_file_id.clone()),
                line_number: item.line_number,
                column_number: item.column_number,
            };
            items.insert(key, item);
        }
        Self {
            setting,
            items,
            muted: false,
        }
    }

    pub(crate) fn mute(&mut self) {
        self.muted = true;
    }

    pub(crate) fn unmute(&mut self) {
        self.muted = false;
    }

    /// All persisted items declared against `source`.
    pub(crate) fn breakpoint_items(&self, source: &UiSourceCode) -> Vec<BreakpointStorageItem> {
        let Some(file_id) = source.source_file_id() else {
            return Vec::new();
        };
        self.items
            .values()
            .filter(|item| item.source_file_id == file_id.as_str())
            .cloned()
            .collect()
    }

    pub(crate) fn update_breakpoint(&mut self, breakpoint: &Breakpoint) {
        let Some(key) = breakpoint.storage_key() else {
            return;
        };
        if self.muted {
            return;
        }
        // storage_key() and storage_item() are both derived from the same
        // source file id, so the item is always present here
        if let Some(item) = breakpoint.storage_item() {
            self.items.insert(key, item);
            self.save();
        }
    }

    pub(crate) fn remove_breakpoint(&mut self, breakpoint: &Breakpoint) {
        if self.muted {
            return;
        }
        let Some(key) = breakpoint.storage_key() else {
            return;
        };
        if self.items.remove(&key).is_some() {
            self.save();
        }
    }

    fn save(&self) {
        self.setting.set(self.items.values().cloned().collect());
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("items", &self.items)
            .field("muted", &self.muted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_item_column_defaults_to_zero() {
        let json = r#"{
            "source_file_id": "file:///a.js",
            "line_number": 3,
            "condition": "",
            "enabled": true
        }"#;
        let item: BreakpointStorageItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.column_number, 0);
    }

    #[test]
    fn test_memory_setting_round_trip() {
        let setting = MemorySetting::new();
        let items = vec![BreakpointStorageItem {
            source_file_id: String::from("file:///a.js"),
            line_number: 10,
            column_number: 4,
            condition: String::from("x > 1"),
            enabled: false,
        }];
        setting.set(items.clone());
        assert_eq!(setting.get(), items);
    }
}
