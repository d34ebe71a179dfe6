//
// session.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use crossbeam::channel::unbounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;
use crossbeam::channel::TryRecvError;
use crossbeam::select;
use tether_model::TargetId;
use tether_model::UiSourceCode;
use tether_model::Workspace;
use tether_model::WorkspaceEvent;

use crate::breakpoints::manager::BreakpointManager;
use crate::breakpoints::manager::TargetObserver;
use crate::debugger::DebuggerEvent;
use crate::debugger::Target;

/// Everything the embedder can feed into the session from other threads.
#[derive(Debug)]
pub enum SessionEvent {
    TargetAdded(Target),
    TargetRemoved(TargetId),
    Debugger(TargetId, DebuggerEvent),
    MappingChanged {
        source: UiSourceCode,
        target: TargetId,
        is_identity: bool,
    },
    Shutdown,
}

/// Single-threaded event pump around a `BreakpointManager`.
///
/// The manager is not shared: every workspace, target, and debugger event
/// funnels through this pump, one at a time, on whichever thread runs it.
/// Embedders hold a `Sender<SessionEvent>` and push from their transport
/// threads.
pub struct Session {
    manager: BreakpointManager,
    workspace_rx: Receiver<WorkspaceEvent>,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
}

impl Session {
    pub fn new(manager: BreakpointManager, workspace: &Workspace) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            manager,
            workspace_rx: workspace.subscribe(),
            events_tx,
            events_rx,
        }
    }

    /// Handle to push events into the pump from other threads.
    pub fn sender(&self) -> Sender<SessionEvent> {
        self.events_tx.clone()
    }

    pub fn manager(&self) -> &BreakpointManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut BreakpointManager {
        &mut self.manager
    }

    /// Block on events until shutdown, then hand the manager back.
    pub fn run(mut self) -> BreakpointManager {
        log::trace!("Breakpoints: Session pump started");
        loop {
            select! {
                recv(self.workspace_rx) -> event => {
                    match event {
                        Ok(event) => self.manager.handle_workspace_event(event),
                        // Workspace dropped: treat as shutdown
                        Err(_) => break,
                    }
                },
                recv(self.events_rx) -> event => {
                    match event {
                        Ok(SessionEvent::Shutdown) | Err(_) => break,
                        Ok(event) => Self::dispatch(&mut self.manager, event),
                    }
                },
            }
        }
        log::trace!("Breakpoints: Session pump stopped");
        self.manager
    }

    /// Drain everything currently queued without blocking. Returns `false`
    /// once a shutdown was seen.
    pub fn drain(&mut self) -> bool {
        loop {
            match self.workspace_rx.try_recv() {
                Ok(event) => self.manager.handle_workspace_event(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        loop {
            match self.events_rx.try_recv() {
                Ok(SessionEvent::Shutdown) => return false,
                Ok(event) => Self::dispatch(&mut self.manager, event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        true
    }

    fn dispatch(manager: &mut BreakpointManager, event: SessionEvent) {
        match event {
            SessionEvent::TargetAdded(target) => manager.target_added(target),
            SessionEvent::TargetRemoved(target) => manager.target_removed(target),
            SessionEvent::Debugger(target, event) => manager.handle_debugger_event(target, event),
            SessionEvent::MappingChanged {
                source,
                target,
                is_identity,
            } => manager.source_mapping_changed(&source, target, is_identity),
            SessionEvent::Shutdown => {},
        }
    }
}
