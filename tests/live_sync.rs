use std::time::{Duration, Instant};

use hydra_tweak::analyzer::Position;
use hydra_tweak::config::TweakConfig;
use hydra_tweak::controls::ControlValue;
use hydra_tweak::headless::{HeadlessGui, MemoryEditor, RecordingSandbox};
use hydra_tweak::sync::{Coordinator, SyncState};

const DOCUMENT: &str = "\
// warm up
osc(10, 0.1).color(1, 0.5, 0.2).out(o0)

shape(4, 0.3).scrollX(0.1).scrollY(0.2).out(o1)
";

type Session = Coordinator<MemoryEditor, RecordingSandbox, HeadlessGui>;

fn session(config: &TweakConfig) -> (Session, MemoryEditor, RecordingSandbox, HeadlessGui) {
    let editor = MemoryEditor::new(DOCUMENT);
    let sandbox = RecordingSandbox::new();
    let gui = HeadlessGui::new();
    let coordinator = Coordinator::from_config(editor.clone(), sandbox.clone(), gui.clone(), config);
    (coordinator, editor, sandbox, gui)
}

fn controller(c: &Session, label: &str) -> hydra_tweak::sync::ControllerId {
    c.bindings()
        .iter()
        .find(|b| b.group.label == label)
        .map(|b| b.controller)
        .unwrap_or_else(|| panic!("no control labelled {label}"))
}

#[test]
fn line_session_writes_only_its_line() {
    let config = TweakConfig::from_json_str(r#"{ "debounce_ms": 200 }"#).unwrap();
    let (mut c, editor, sandbox, _) = session(&config);
    editor.set_cursor(Position::new(1, 3));
    assert_eq!(c.evaluate_line().unwrap(), 3);

    let t0 = Instant::now();
    let color = controller(&c, "color");
    c.control_changed(color, ControlValue::Color { r: 1.0, g: 0.5, b: 0.9 }, t0);
    assert_eq!(
        sandbox.last().as_deref(),
        Some("osc(10, 0.1).color(1, 0.5, 0.9).out(o0)")
    );

    assert!(!c.poll(t0 + Duration::from_millis(199)));
    assert!(c.poll(t0 + Duration::from_millis(200)));
    assert_eq!(
        editor.text(),
        DOCUMENT.replace("color(1, 0.5, 0.2)", "color(1, 0.5, 0.9)")
    );
    assert_eq!(c.state(), SyncState::Bound);
}

#[test]
fn whole_document_session_binds_both_chains() {
    let (mut c, editor, _, gui) = session(&TweakConfig::default());
    let range = editor.full_range();
    c.evaluate(range).unwrap();

    let labels: Vec<_> = c.bindings().iter().map(|b| b.group.label.as_str()).collect();
    assert_eq!(labels[0], "color");
    assert!(labels.contains(&"scroll"));
    assert!(labels.contains(&"sides"));
    assert_eq!(gui.folders(), vec!["hydra".to_string()]);

    let sides = controller(&c, "sides");
    c.control_changed(sides, ControlValue::Choice(6.0), Instant::now());
    c.flush();
    assert!(editor.text().contains("shape(6, 0.3)"));
    assert_eq!(editor.writes().len(), 1);
}

#[test]
fn point_pad_writes_both_axes() {
    let (mut c, editor, _, _) = session(&TweakConfig::default());
    let range = editor.full_range();
    c.evaluate(range).unwrap();

    let pad = controller(&c, "scroll");
    c.control_changed(pad, ControlValue::Point { x: 0.25, y: 0.75 }, Instant::now());
    c.flush();
    // Offsets default to 0.5, so the pad is centered: display d maps to (d + 0.5) / 2.
    assert!(editor.text().contains("scrollX(0.375).scrollY(0.625)"));
}

#[test]
fn custom_title_and_signatures_from_config() {
    let config = TweakConfig::from_json_str(
        r#"{ "panel_title": "set 1",
             "signatures": [ { "name": "shape", "params": [ { "name": "corners", "default": 3 } ] } ] }"#,
    )
    .unwrap();
    let (mut c, editor, _, gui) = session(&config);
    let range = editor.full_range();
    c.evaluate(range).unwrap();
    assert_eq!(gui.folders(), vec!["set 1".to_string()]);
    assert!(c.bindings().iter().any(|b| b.group.label == "corners"));
}
