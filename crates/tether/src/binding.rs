//
// binding.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use tether_model::ScriptLocation;
use tether_model::TargetId;
use tether_model::UiLocation;
use tether_model::UiSourceCode;

/// Source-map translation between editor locations and raw script locations,
/// per target.
///
/// `ui_to_raw` returns `None` when no mapping is available yet (the script
/// has not loaded, or no source map applies); callers then fall back to
/// URL-based breakpoints. `raw_to_ui` returns `None` when a raw location
/// cannot be attributed to any known source.
pub trait LocationMapping: Send {
    fn ui_to_raw(
        &self,
        target: TargetId,
        source: &UiSourceCode,
        line_number: u32,
        column_number: u32,
    ) -> Option<ScriptLocation>;

    fn raw_to_ui(&self, target: TargetId, location: &ScriptLocation) -> Option<UiLocation>;
}

/// A raw-to-UI binding held alive for one resolved debugger location.
/// Dropped when the owning target breakpoint resets its locations.
#[derive(Debug, Clone)]
pub(crate) struct LiveLocation {
    pub(crate) raw: ScriptLocation,
    pub(crate) ui: UiLocation,
}
