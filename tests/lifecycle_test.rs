/// Lifecycle scenarios: load, start, stop and reload around live gestures

mod common;

use assembly_engine::physics::BodyState;
use assembly_engine::{Engine, EngineConfig, EventKind, LifecycleError};
use common::*;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_start_without_assembly_fails() {
    let mut engine = Engine::new(EngineConfig::default());
    assert_eq!(engine.start(), Err(LifecycleError::NotLoaded));
    assert!(!engine.is_running());
}

#[test]
fn test_load_while_running_fails() {
    let mut engine = engine();
    engine.start().unwrap();
    assert_eq!(
        engine.load(assembly("other_base", "other_peg")),
        Err(LifecycleError::LoadWhileRunning)
    );
    // The first assembly is untouched
    assert!(engine.assembly().unwrap().find("peg").is_some());

    engine.stop();
    engine.load(assembly("other_base", "other_peg")).unwrap();
    assert!(engine.assembly().unwrap().find("other_peg").is_some());
}

#[test]
fn test_reload_replaces_bodies_and_visuals() {
    let mut engine = engine();
    assert_eq!(engine.physics().body_count(), 3);
    assert_eq!(engine.physics().joint_count(), 1);
    assert_eq!(engine.scene().len(), 2);

    engine.load(assembly("other_base", "other_peg")).unwrap();
    assert_eq!(engine.physics().body_count(), 3);
    assert_eq!(engine.physics().joint_count(), 1);
    assert_eq!(engine.scene().len(), 2);
}

#[test]
fn test_loaded_components_start_asleep_and_linked() {
    let engine = engine();
    let peg = id(&engine, "peg");
    assert_eq!(engine.body_state(peg), Some(BodyState::Asleep));
    assert!(engine.is_linked(peg));
}

#[test]
fn test_tick_while_stopped_does_nothing() {
    let mut engine = engine();
    press(&mut engine, CENTER);
    ticks(&mut engine, 10);
    assert!(engine.event_log().is_empty());
    assert_eq!(engine.body_state(id(&engine, "peg")), Some(BodyState::Asleep));
}

#[test]
fn test_stop_start_does_not_duplicate_events() {
    let mut engine = engine();
    let starts = Rc::new(RefCell::new(0));
    let sink = starts.clone();
    engine.subscribe(move |event| {
        if event.kind == EventKind::DragStart {
            *sink.borrow_mut() += 1;
        }
    });

    engine.start().unwrap();
    drag_right(&mut engine, 10.0);
    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));

    engine.stop();
    engine.stop();
    engine.start().unwrap();
    engine.start().unwrap();

    drag_right(&mut engine, -10.0);
    assert!(tick_until(&mut engine, EventKind::DragEnd, 2));

    assert_eq!(*starts.borrow(), 2);
    assert_eq!(engine.event_log().count(EventKind::DragStart), 2);
    assert_eq!(engine.event_log().count(EventKind::DragEnd), 2);
}

#[test]
fn test_stop_releases_held_component() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.start().unwrap();
    press(&mut engine, CENTER);
    move_pointer(&mut engine, CENTER + glam::Vec2::new(10.0, 0.0), glam::Vec2::new(10.0, 0.0));
    ticks(&mut engine, 5);
    assert!(matches!(engine.body_state(peg), Some(BodyState::Dragging { .. })));

    engine.stop();
    assert!(matches!(engine.body_state(peg), Some(BodyState::Settling { .. })));

    // The gesture ends once ticking resumes and the body comes to rest
    engine.start().unwrap();
    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));
    assert_eq!(engine.body_state(peg), Some(BodyState::Asleep));
}

#[test]
fn test_reload_mid_drag_silences_old_components() {
    let mut engine = engine();
    let names = Rc::new(RefCell::new(Vec::new()));
    let sink = names.clone();
    engine.subscribe(move |event| sink.borrow_mut().push(event.name.clone()));

    engine.start().unwrap();
    press(&mut engine, CENTER);
    move_pointer(&mut engine, CENTER + glam::Vec2::new(10.0, 0.0), glam::Vec2::new(10.0, 0.0));
    ticks(&mut engine, 5);
    assert!(names.borrow().iter().any(|n| n == "peg"));

    engine.stop();
    engine.load(assembly("plate", "knob")).unwrap();
    names.borrow_mut().clear();

    engine.start().unwrap();
    // Input meant for the old drag goes nowhere
    move_pointer(&mut engine, CENTER + glam::Vec2::new(20.0, 0.0), glam::Vec2::new(10.0, 0.0));
    release(&mut engine, CENTER);
    ticks(&mut engine, 600);
    assert!(names.borrow().iter().all(|n| n != "peg" && n != "base"));

    // The new assembly is fully interactive
    drag_right(&mut engine, 10.0);
    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));
    assert!(names.borrow().iter().any(|n| n == "knob"));
}
