//
// breakpoints.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use assert_matches::assert_matches;
use tether::fixtures::drain_events;
use tether::fixtures::FakeDebugger;
use tether::fixtures::Harness;
use tether::BreakpointEvent;
use tether::Setting;
use tether_model::ScriptLocation;

const URL: &str = "file:///main.js";

#[test]
fn test_breakpoint_without_target_shows_declared_location() {
    let mut harness = Harness::new();
    let events = harness.subscribe();
    let source = harness.add_source("p1", "main.js", Some(URL));

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();

    // No debugger resolved anything, so the declared location stands in
    let breakpoint = harness.manager.breakpoint(id).unwrap();
    assert!(!breakpoint.has_resolved_locations());
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), Some(id));

    let events = drain_events(&events);
    assert_eq!(events.len(), 1);
    assert_matches!(&events[0], BreakpointEvent::Added { breakpoint, ui_location } => {
        assert_eq!(*breakpoint, id);
        assert_eq!(ui_location.line_number, 5);
    });
}

#[test]
fn test_breakpoint_resolves_when_script_loads() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target("page");

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();
    assert_eq!(debugger.installed_count(), 1);
    assert!(!harness.manager.breakpoint(id).unwrap().has_resolved_locations());

    harness.load_script(target, URL, "s1");

    let breakpoint = harness.manager.breakpoint(id).unwrap();
    assert!(breakpoint.has_resolved_locations());
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), Some(id));
    assert_eq!(
        harness.manager.breakpoints_for_ui_source_code(&source),
        vec![id]
    );
}

#[test]
fn test_setting_same_location_updates_existing_breakpoint() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();

    let other = harness.manager.set_breakpoint(&source, 5, 0, "x > 1", true);
    harness.pump();

    assert_eq!(other, id);
    assert_eq!(harness.manager.all_breakpoints(), vec![id]);
    assert_eq!(harness.manager.breakpoint(id).unwrap().condition(), "x > 1");

    // The target got a fresh breakpoint carrying the new condition
    assert_eq!(debugger.installed_count(), 1);
    let installed = debugger.installed_ids();
    assert_eq!(
        debugger.installed_condition(&installed[0]),
        Some(String::from("x > 1"))
    );
}

#[test]
fn test_disabled_breakpoint_leaves_debugger_but_stays_visible() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();
    assert_eq!(debugger.installed_count(), 1);

    harness.manager.set_breakpoint_enabled(id, false);
    harness.pump();

    assert_eq!(debugger.installed_count(), 0);
    let breakpoint = harness.manager.breakpoint(id).unwrap();
    assert!(!breakpoint.enabled());
    assert!(!breakpoint.has_resolved_locations());
    // Still occupies its declared slot while the source is loaded
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), Some(id));

    harness.manager.set_breakpoint_enabled(id, true);
    harness.pump();
    assert_eq!(debugger.installed_count(), 1);
    assert!(harness.manager.breakpoint(id).unwrap().has_resolved_locations());
}

#[test]
fn test_update_state_is_idempotent() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, _debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 5, 0, "cond", true);
    harness.pump();

    let events = harness.subscribe();
    harness.manager.set_breakpoint_enabled(id, true);
    harness.manager.set_breakpoint_condition(id, "cond");
    harness.pump();

    // Nothing changed, so no re-sync and no UI churn
    assert!(drain_events(&events).is_empty());
}

#[test]
fn test_remove_breakpoint_clears_everything() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();

    harness.manager.remove_breakpoint(id, false);
    harness.pump();

    assert!(harness.manager.all_breakpoints().is_empty());
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), None);
    assert_eq!(debugger.installed_count(), 0);
    assert!(harness.setting.get().is_empty());
}

#[test]
fn test_remove_while_set_response_in_flight_uninstalls_it() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    // Remove before the set response comes back: the backend has already
    // installed the breakpoint, and the late response must not strand it
    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.manager.remove_breakpoint(id, false);
    harness.pump();

    assert!(harness.manager.all_breakpoints().is_empty());
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), None);
    assert_eq!(debugger.installed_count(), 0);
}

#[test]
fn test_disable_while_set_response_in_flight_uninstalls_it() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.manager.set_breakpoint_enabled(id, false);
    harness.pump();

    assert_eq!(debugger.installed_count(), 0);
    let breakpoint = harness.manager.breakpoint(id).unwrap();
    assert!(!breakpoint.enabled());
    assert!(!breakpoint.has_resolved_locations());
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), Some(id));
}

#[test]
fn test_vm_can_move_breakpoint_to_additional_location() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();

    let debugger_id = debugger.installed_ids().remove(0);
    debugger.resolve(&debugger_id, ScriptLocation::new("s1", 9, 0));
    harness.pump();

    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), Some(id));
    assert_eq!(harness.manager.find_breakpoint(&source, 9, 0), Some(id));
    assert_eq!(
        harness.manager.breakpoints_for_ui_source_code(&source),
        vec![id, id]
    );
}

#[test]
fn test_duplicate_resolution_is_ignored() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();

    let events = harness.subscribe();
    let debugger_id = debugger.installed_ids().remove(0);
    debugger.resolve(&debugger_id, ScriptLocation::new("s1", 5, 0));
    harness.pump();

    assert!(drain_events(&events).is_empty());
    assert_eq!(
        harness.manager.breakpoints_for_ui_source_code(&source),
        vec![id]
    );
}

#[test]
fn test_refused_set_removes_breakpoint_but_keeps_stored_record() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (_target, debugger) = harness.add_target("page");
    debugger.refuse_sets(true);

    harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();

    assert!(harness.manager.all_breakpoints().is_empty());
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), None);
    // The stored record survives for a later, more successful load
    assert_eq!(harness.setting.get().len(), 1);
}

#[test]
fn test_debugger_disable_and_enable_cycle() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target_with("page", FakeDebugger::new_disabled());

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();

    // Nothing synced while the debugger agent is down
    assert_eq!(debugger.installed_count(), 0);

    debugger.enable();
    harness.load_script(target, URL, "s1");
    assert_eq!(debugger.installed_count(), 1);
    assert!(harness.manager.breakpoint(id).unwrap().has_resolved_locations());

    debugger.disable();
    harness.pump();
    assert!(!harness.manager.breakpoint(id).unwrap().has_resolved_locations());
    // Declared location takes over again
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), Some(id));
}

#[test]
fn test_mapping_loss_falls_back_to_url() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 5, 0, "", true);
    harness.pump();
    assert!(harness.manager.breakpoint(id).unwrap().has_resolved_locations());

    // The source map goes away; re-sync has to go back through the URL
    harness.mapping.unbind(target, "s1");
    harness.manager.source_mapping_changed(&source, target, false);
    harness.pump();

    assert_eq!(debugger.installed_count(), 1);
    // Installed, but the resolution cannot be attributed to a source
    assert!(!harness.manager.breakpoint(id).unwrap().has_resolved_locations());
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 0), Some(id));
}

#[test]
fn test_location_queries_list_every_slot() {
    let mut harness = Harness::new();
    let first = harness.add_source("p1", "main.js", Some(URL));
    let second = harness.add_source("p1", "other.js", Some("file:///other.js"));
    assert_eq!(harness.workspace.sources().len(), 2);

    let a = harness.manager.set_breakpoint(&first, 2, 0, "", true);
    let b = harness.manager.set_breakpoint(&first, 8, 4, "", true);
    let c = harness.manager.set_breakpoint(&second, 1, 0, "", true);
    harness.pump();

    let locations = harness
        .manager
        .breakpoint_locations_for_ui_source_code(&first);
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].0, a);
    assert_eq!((locations[0].1.line_number, locations[0].1.column_number), (2, 0));
    assert_eq!(locations[1].0, b);
    assert_eq!((locations[1].1.line_number, locations[1].1.column_number), (8, 4));

    let all = harness.manager.all_breakpoint_locations();
    assert_eq!(all.len(), 3);
    assert!(all.iter().any(|(id, location)| {
        *id == c && location.source == second && location.line_number == 1
    }));
}

#[test]
fn test_find_breakpoint_on_line_picks_lowest_column() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "main.js", Some(URL));

    let first = harness.manager.set_breakpoint(&source, 5, 4, "", true);
    let second = harness.manager.set_breakpoint(&source, 5, 12, "", true);
    harness.pump();

    assert_ne!(first, second);
    assert_eq!(harness.manager.find_breakpoint_on_line(&source, 5), Some(first));
    assert_eq!(harness.manager.find_breakpoint(&source, 5, 12), Some(second));
    assert_eq!(harness.manager.find_breakpoint_on_line(&source, 6), None);
}
