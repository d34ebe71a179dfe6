//
// breakpoints_provisional.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use tether::fixtures::Harness;
use tether::Setting;

const URL: &str = "file:///app.js";

#[test]
fn test_enabled_breakpoint_survives_source_unload() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "app.js", Some(URL));
    let (target, _debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 3, 0, "", true);
    harness.pump();

    harness.remove_source(&source);

    // Still a live breakpoint, but with no presence in any source
    assert_eq!(harness.manager.all_breakpoints(), vec![id]);
    assert!(harness.manager.is_provisional(id));
    assert!(harness
        .manager
        .breakpoints_for_ui_source_code(&source)
        .is_empty());
    assert_eq!(harness.setting.get().len(), 1);
}

#[test]
fn test_disabled_breakpoint_is_dropped_on_source_unload() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "app.js", Some(URL));

    let id = harness.manager.set_breakpoint(&source, 3, 0, "", false);
    harness.pump();

    harness.remove_source(&source);

    assert!(harness.manager.all_breakpoints().is_empty());
    assert!(!harness.manager.is_provisional(id));
    // The stored record is kept so a reload can bring it back
    assert_eq!(harness.setting.get().len(), 1);
}

#[test]
fn test_provisional_breakpoint_reattaches_on_reload() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "app.js", Some(URL));
    let (target, debugger) = harness.add_target("page");
    harness.load_script(target, URL, "s1");

    let id = harness.manager.set_breakpoint(&source, 3, 0, "x > 0", true);
    harness.pump();

    harness.remove_source(&source);
    assert!(harness.manager.is_provisional(id));

    let reloaded = harness.add_source("p1", "app.js", Some(URL));

    // Same logical breakpoint, not a re-created one
    assert_eq!(harness.manager.all_breakpoints(), vec![id]);
    assert!(!harness.manager.is_provisional(id));
    assert_eq!(harness.manager.find_breakpoint(&reloaded, 3, 0), Some(id));
    assert!(harness.manager.breakpoint(id).unwrap().has_resolved_locations());
    assert_eq!(harness.manager.breakpoint(id).unwrap().condition(), "x > 0");
    assert_eq!(debugger.installed_count(), 1);
}

#[test]
fn test_disabled_breakpoint_restored_from_storage_on_reload() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "app.js", Some(URL));

    let id = harness.manager.set_breakpoint(&source, 3, 0, "", false);
    harness.pump();
    harness.remove_source(&source);
    assert!(harness.manager.all_breakpoints().is_empty());

    let reloaded = harness.add_source("p1", "app.js", Some(URL));

    let restored = harness.manager.all_breakpoints();
    assert_eq!(restored.len(), 1);
    assert_ne!(restored[0], id);
    let breakpoint = harness.manager.breakpoint(restored[0]).unwrap();
    assert!(!breakpoint.enabled());
    assert_eq!(breakpoint.line_number(), 3);
    assert_eq!(
        harness.manager.find_breakpoint(&reloaded, 3, 0),
        Some(restored[0])
    );
}

#[test]
fn test_remove_provisional_breakpoints() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "app.js", Some(URL));

    harness.manager.set_breakpoint(&source, 3, 0, "", true);
    harness.pump();
    harness.remove_source(&source);

    harness.manager.remove_provisional_breakpoints();
    harness.pump();

    assert!(harness.manager.all_breakpoints().is_empty());
    assert!(harness.setting.get().is_empty());

    // Reloading the source restores nothing
    harness.add_source("p1", "app.js", Some(URL));
    assert!(harness.manager.all_breakpoints().is_empty());
}

#[test]
fn test_source_without_url_cannot_go_provisional() {
    let mut harness = Harness::new();
    let source = harness.add_source("p1", "scratch.js", None);

    let id = harness.manager.set_breakpoint(&source, 1, 0, "", true);
    harness.pump();
    assert_eq!(harness.manager.find_breakpoint(&source, 1, 0), Some(id));
    // Nothing to persist without a URL
    assert!(harness.setting.get().is_empty());

    harness.remove_source(&source);
    assert!(harness.manager.all_breakpoints().is_empty());
}

#[test]
fn test_project_removal_unloads_all_its_sources() {
    let mut harness = Harness::new();
    let first = harness.add_source("p1", "a.js", Some("file:///a.js"));
    let second = harness.add_source("p1", "b.js", Some("file:///b.js"));
    let other = harness.add_source("p2", "c.js", Some("file:///c.js"));

    let id_a = harness.manager.set_breakpoint(&first, 1, 0, "", true);
    let id_b = harness.manager.set_breakpoint(&second, 2, 0, "", true);
    let id_c = harness.manager.set_breakpoint(&other, 3, 0, "", true);
    harness.pump();

    harness.workspace.remove_project("p1");
    harness.pump();

    assert!(harness.manager.is_provisional(id_a));
    assert!(harness.manager.is_provisional(id_b));
    assert!(!harness.manager.is_provisional(id_c));
    assert_eq!(harness.manager.find_breakpoint(&other, 3, 0), Some(id_c));
}
