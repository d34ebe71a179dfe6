//
// mod.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

pub mod breakpoint;
pub mod manager;
pub mod storage;

mod target_breakpoint;

pub use crate::breakpoints::breakpoint::Breakpoint;
pub use crate::breakpoints::breakpoint::BreakpointId;
