//
// lib.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

pub mod binding;
pub mod breakpoints;
pub mod debugger;
pub mod events;
pub mod session;

#[cfg(feature = "testing")]
pub mod fixtures;

pub use crate::binding::LocationMapping;
pub use crate::breakpoints::manager::BreakpointManager;
pub use crate::breakpoints::manager::TargetObserver;
pub use crate::breakpoints::storage::BreakpointStorageItem;
pub use crate::breakpoints::storage::FileSetting;
pub use crate::breakpoints::storage::MemorySetting;
pub use crate::breakpoints::storage::Setting;
pub use crate::breakpoints::BreakpointId;
pub use crate::debugger::DebuggerBackend;
pub use crate::debugger::DebuggerBreakpointId;
pub use crate::debugger::DebuggerEvent;
pub use crate::debugger::RequestId;
pub use crate::debugger::Target;
pub use crate::events::BreakpointEvent;
pub use crate::session::Session;
pub use crate::session::SessionEvent;
