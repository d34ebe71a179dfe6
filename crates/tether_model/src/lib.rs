//
// lib.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

pub mod location;
pub mod source;
pub mod target;
pub mod workspace;

pub use crate::location::ScriptLocation;
pub use crate::location::UiLocation;
pub use crate::source::ContentType;
pub use crate::source::SourceFileId;
pub use crate::source::UiSourceCode;
pub use crate::target::TargetId;
pub use crate::workspace::Workspace;
pub use crate::workspace::WorkspaceEvent;
