//
// workspace.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use crossbeam::channel::unbounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;

use crate::source::UiSourceCode;

#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    UiSourceCodeAdded(UiSourceCode),
    UiSourceCodeRemoved(UiSourceCode),
    ProjectRemoved {
        project_id: String,
        sources: Vec<UiSourceCode>,
    },
}

#[derive(Debug, Default)]
struct WorkspaceInner {
    sources: HashMap<(String, String), UiSourceCode>,
    subscribers: Vec<Sender<WorkspaceEvent>>,
}

/// The set of source files currently known to the frontend. Shared handle;
/// consumers subscribe for add/remove notifications.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    inner: Arc<Mutex<WorkspaceInner>>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<WorkspaceEvent> {
        let (tx, rx) = unbounded();
        self.inner.lock().unwrap().subscribers.push(tx);
        rx
    }

    pub fn add_source(&self, source: UiSourceCode) {
        let mut inner = self.inner.lock().unwrap();
        let key = (
            source.project_id().to_string(),
            source.path().to_string(),
        );
        if inner.sources.insert(key, source.clone()).is_some() {
            log::warn!("Workspace: Replacing already-known source `{source}`");
        }
        Self::dispatch(&mut inner, WorkspaceEvent::UiSourceCodeAdded(source));
    }

    pub fn remove_source(&self, project_id: &str, path: &str) -> Option<UiSourceCode> {
        let mut inner = self.inner.lock().unwrap();
        let key = (project_id.to_string(), path.to_string());
        let source = inner.sources.remove(&key)?;
        Self::dispatch(
            &mut inner,
            WorkspaceEvent::UiSourceCodeRemoved(source.clone()),
        );
        Some(source)
    }

    pub fn remove_project(&self, project_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let removed: Vec<UiSourceCode> = inner
            .sources
            .values()
            .filter(|source| source.project_id() == project_id)
            .cloned()
            .collect();
        inner
            .sources
            .retain(|(project, _), _| project != project_id);
        Self::dispatch(
            &mut inner,
            WorkspaceEvent::ProjectRemoved {
                project_id: project_id.to_string(),
                sources: removed,
            },
        );
    }

    pub fn ui_source_code(&self, project_id: &str, path: &str) -> Option<UiSourceCode> {
        let inner = self.inner.lock().unwrap();
        inner
            .sources
            .get(&(project_id.to_string(), path.to_string()))
            .cloned()
    }

    /// Look a source up by its URL. Used by location mappings to translate
    /// raw script locations back to sources.
    pub fn source_for_url(&self, url: &str) -> Option<UiSourceCode> {
        let inner = self.inner.lock().unwrap();
        inner
            .sources
            .values()
            .find(|source| source.url() == Some(url))
            .cloned()
    }

    pub fn sources(&self) -> Vec<UiSourceCode> {
        self.inner.lock().unwrap().sources.values().cloned().collect()
    }

    fn dispatch(inner: &mut WorkspaceInner, event: WorkspaceEvent) {
        inner
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
