//
// source.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;
use std::sync::Mutex;

use crate::location::UiLocation;
use crate::target::TargetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Script,
    Document,
    Other,
}

/// Persistence key for a source file, derived from its URL. Sources without
/// a URL have no key and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceFileId(String);

impl SourceFileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct UiSourceCodeInner {
    project_id: String,
    path: String,
    url: Option<String>,
    content_type: ContentType,

    /// Targets whose live script has diverged from this source (live edit).
    /// Breakpoints are not synced to a target while its copy has diverged.
    diverged: Mutex<HashSet<TargetId>>,
}

/// A source file as shown in the frontend. Cheap to clone; identity is
/// `(project_id, path)`.
#[derive(Debug, Clone)]
pub struct UiSourceCode {
    inner: Arc<UiSourceCodeInner>,
}

impl UiSourceCode {
    pub fn new(
        project_id: impl Into<String>,
        path: impl Into<String>,
        url: Option<String>,
        content_type: ContentType,
    ) -> Self {
        Self {
            inner: Arc::new(UiSourceCodeInner {
                project_id: project_id.into(),
                path: path.into(),
                url,
                content_type,
                diverged: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn url(&self) -> Option<&str> {
        self.inner.url.as_deref()
    }

    pub fn content_type(&self) -> ContentType {
        self.inner.content_type
    }

    /// The persistence key for this source, or `None` when the source has no
    /// URL (e.g. an unsaved editor buffer).
    pub fn source_file_id(&self) -> Option<SourceFileId> {
        match &self.inner.url {
            Some(url) if !url.is_empty() => Some(SourceFileId::new(url.clone())),
            _ => None,
        }
    }

    pub fn ui_location(&self, line_number: u32, column_number: u32) -> UiLocation {
        UiLocation::new(self.clone(), line_number, column_number)
    }

    pub fn set_diverged_from_vm(&self, target: TargetId, diverged: bool) {
        let mut set = self.inner.diverged.lock().unwrap();
        if diverged {
            set.insert(target);
        } else {
            set.remove(&target);
        }
    }

    pub fn has_diverged_from_vm(&self, target: TargetId) -> bool {
        self.inner.diverged.lock().unwrap().contains(&target)
    }
}

impl PartialEq for UiSourceCode {
    fn eq(&self, other: &Self) -> bool {
        self.inner.project_id == other.inner.project_id && self.inner.path == other.inner.path
    }
}

impl Eq for UiSourceCode {}

impl Hash for UiSourceCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.project_id.hash(state);
        self.inner.path.hash(state);
    }
}

impl fmt::Display for UiSourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.inner.project_id, self.inner.path)
    }
}
