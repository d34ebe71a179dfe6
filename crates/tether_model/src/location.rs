//
// location.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::fmt;

use crate::source::UiSourceCode;

/// A location in a running script as known to one target's debugger backend,
/// prior to any source-map translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptLocation {
    pub script_id: String,
    pub line_number: u32,
    pub column_number: u32,
}

impl ScriptLocation {
    pub fn new(script_id: impl Into<String>, line_number: u32, column_number: u32) -> Self {
        Self {
            script_id: script_id.into(),
            line_number,
            column_number,
        }
    }
}

impl fmt::Display for ScriptLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.script_id, self.line_number, self.column_number
        )
    }
}

/// A resolved editor-visible location. Equality and hashing follow the
/// source's identity, so a `UiLocation` can key reference-count maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UiLocation {
    pub source: UiSourceCode,
    pub line_number: u32,
    pub column_number: u32,
}

impl UiLocation {
    pub fn new(source: UiSourceCode, line_number: u32, column_number: u32) -> Self {
        Self {
            source,
            line_number,
            column_number,
        }
    }
}

impl fmt::Display for UiLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.source.path(),
            self.line_number,
            self.column_number
        )
    }
}
