//
// breakpoints_active_state.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use assert_matches::assert_matches;
use tether::fixtures::drain_events;
use tether::fixtures::Harness;
use tether::BreakpointEvent;
use tether::Setting;

const URL: &str = "file:///gate.js";

#[test]
fn test_deactivation_fans_out_to_all_targets() {
    let mut harness = Harness::new();
    let (_, first_debugger) = harness.add_target("page");
    let (_, second_debugger) = harness.add_target("worker");
    let events = harness.subscribe();

    assert!(harness.manager.breakpoints_active());
    harness.manager.set_breakpoints_active(false);

    assert!(!harness.manager.breakpoints_active());
    assert_eq!(first_debugger.active_calls(), vec![false]);
    assert_eq!(second_debugger.active_calls(), vec![false]);

    let events = drain_events(&events);
    assert_eq!(events.len(), 1);
    assert_matches!(events[0], BreakpointEvent::ActiveStateChanged(false));
}

#[test]
fn test_setting_active_twice_is_a_no_op() {
    let mut harness = Harness::new();
    let (_, debugger) = harness.add_target("page");
    let events = harness.subscribe();

    harness.manager.set_breakpoints_active(false);
    harness.manager.set_breakpoints_active(false);

    assert_eq!(debugger.active_calls(), vec![false]);
    assert_eq!(drain_events(&events).len(), 1);
}

#[test]
fn test_enabling_a_breakpoint_does_not_reactivate() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "gate.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 2, 0, "", false);
    harness.pump();
    harness.manager.set_breakpoints_active(false);

    harness.manager.set_breakpoint_enabled(id, true);
    harness.pump();

    // The breakpoint syncs, but the global gate stays shut
    assert!(!harness.manager.breakpoints_active());
    assert_eq!(debugger.installed_count(), 1);
}

#[test]
fn test_creating_a_breakpoint_reactivates() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "gate.js", Some(URL));
    let (_, debugger) = harness.add_target("page");

    harness.manager.set_breakpoints_active(false);
    assert_eq!(debugger.active_calls(), vec![false]);

    harness.manager.set_breakpoint(&source, 2, 0, "", true);
    harness.pump();

    assert!(harness.manager.breakpoints_active());
    assert_eq!(debugger.active_calls(), vec![false, true]);
}

#[test]
fn test_target_added_while_inactive_is_told_so() {
    let mut harness = Harness::new();
    harness.manager.set_breakpoints_active(false);

    let (_, debugger) = harness.add_target("late page");

    assert_eq!(debugger.active_calls(), vec![false]);
}

#[test]
fn test_toggle_all_flips_enabled_without_touching_the_gate() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "gate.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let first = harness.manager.set_breakpoint(&source, 2, 0, "", true);
    let second = harness.manager.set_breakpoint(&source, 6, 0, "", true);
    harness.pump();
    assert_eq!(debugger.installed_count(), 2);

    harness.manager.toggle_all_breakpoints(false);
    harness.pump();

    assert!(harness.manager.breakpoints_active());
    assert!(!harness.manager.breakpoint(first).unwrap().enabled());
    assert!(!harness.manager.breakpoint(second).unwrap().enabled());
    assert_eq!(debugger.installed_count(), 0);

    harness.manager.toggle_all_breakpoints(true);
    harness.pump();
    assert_eq!(debugger.installed_count(), 2);
}

#[test]
fn test_remove_all_breakpoints() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "gate.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    harness.manager.set_breakpoint(&source, 2, 0, "", true);
    harness.manager.set_breakpoint(&source, 6, 0, "", true);
    harness.pump();

    harness.manager.remove_all_breakpoints();
    harness.pump();

    assert!(harness.manager.all_breakpoints().is_empty());
    assert!(harness.manager.breakpoints_for_ui_source_code(&source).is_empty());
    assert_eq!(debugger.installed_count(), 0);
    assert!(harness.setting.get().is_empty());
}
