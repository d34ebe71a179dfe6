//
// events.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use crossbeam::channel::unbounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;
use tether_model::UiLocation;

use crate::breakpoints::BreakpointId;

/// Notifications consumed by UI panels (breakpoint sidebars, editor
/// gutters). `Added`/`Removed` fire once per UI location transition, not
/// once per underlying debugger location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointEvent {
    Added {
        breakpoint: BreakpointId,
        ui_location: UiLocation,
    },
    Removed {
        breakpoint: BreakpointId,
        ui_location: UiLocation,
    },
    ActiveStateChanged(bool),
}

/// Subscription registry owned by the manager. Disconnected subscribers are
/// pruned on dispatch.
#[derive(Debug, Default)]
pub(crate) struct EventDispatcher {
    subscribers: Vec<Sender<BreakpointEvent>>,
}

impl EventDispatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&mut self) -> Receiver<BreakpointEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn dispatch(&mut self, event: BreakpointEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
