/// Input scenarios: pointer drag and rotate, tracked controllers, mode switching

mod common;

use assembly_engine::controls::{
    GamepadSource, GamepadState, Gesture, InputEvent, Modifiers, PointerButton, TrackedPose,
};
use assembly_engine::physics::BodyState;
use assembly_engine::{Engine, EventKind, Mode};
use common::*;
use glam::{Quat, Vec2, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

/// Gamepads whose state the test edits between ticks
#[derive(Clone, Default)]
struct ScriptedPads(Rc<RefCell<Vec<GamepadState>>>);

impl ScriptedPads {
    fn set(&self, pads: Vec<GamepadState>) {
        *self.0.borrow_mut() = pads;
    }
}

impl GamepadSource for ScriptedPads {
    fn gamepads(&mut self) -> Vec<GamepadState> {
        self.0.borrow().clone()
    }
}

fn ctrl_press(engine: &mut Engine, position: Vec2) {
    engine.input(InputEvent::PointerDown {
        position,
        button: PointerButton::Primary,
        modifiers: Modifiers {
            shift: false,
            ctrl: true,
        },
    });
}

fn touch(engine: &mut Engine, fingers: &[Vec2], start: bool) {
    let touches = fingers.to_vec();
    engine.input(if start {
        InputEvent::TouchStart { touches }
    } else {
        InputEvent::TouchMove { touches }
    });
}

/// Controller three units in front of the peg, pointing at it
fn pad(pose: Option<TrackedPose>, squeeze: f32) -> GamepadState {
    GamepadState {
        id: "OpenVR Gamepad".to_string(),
        pose,
        trigger: squeeze,
        grip: 0.0,
    }
}

fn facing_peg() -> Option<TrackedPose> {
    Some(TrackedPose::new(Vec3::new(0.0, 0.0, 3.0), Quat::IDENTITY))
}

#[test]
fn test_visuals_follow_bodies_exactly() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.start().unwrap();
    drag_right(&mut engine, 10.0);
    ticks(&mut engine, 30);

    let bridge = engine.bridge();
    let (position, rotation) = engine.body_pose(peg).unwrap();
    let transform = engine.visual_transform(peg).unwrap();
    assert_eq!(transform.position, bridge.to_visual(position));
    assert_eq!(transform.rotation, rotation);
}

#[test]
fn test_drag_moves_component_and_ends_after_settling() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.start().unwrap();

    press(&mut engine, CENTER);
    move_pointer(&mut engine, CENTER + Vec2::new(10.0, 0.0), Vec2::new(10.0, 0.0));
    ticks(&mut engine, 120);
    assert_eq!(engine.event_log().count(EventKind::DragStart), 1);
    assert!(engine.event_log().count(EventKind::Drag) >= 1);

    release(&mut engine, CENTER + Vec2::new(10.0, 0.0));
    engine.tick(FRAME_TIME);
    // Released but still moving: no end yet
    assert_eq!(engine.event_log().count(EventKind::DragEnd), 0);
    assert!(matches!(engine.body_state(peg), Some(BodyState::Settling { .. })));

    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));
    assert_eq!(engine.body_state(peg), Some(BodyState::Asleep));

    let (position, _) = engine.body_pose(peg).unwrap();
    assert!(position.x > 0.5, "peg should have moved right, at {position:?}");
    assert!(position.y.abs() < 0.5 && position.z.abs() < 0.5);

    // Pulled off its link
    assert!(!engine.is_linked(peg));
    assert_eq!(engine.event_log().count(EventKind::Unlinked), 1);

    let kinds: Vec<EventKind> = engine.event_log().entries().map(|e| e.event.kind).collect();
    assert_eq!(kinds.first(), Some(&EventKind::DragStart));
    let end = kinds.iter().position(|k| *k == EventKind::DragEnd).unwrap();
    assert!(kinds[end..].iter().all(|k| *k != EventKind::Drag));
}

#[test]
fn test_press_on_empty_space_selects_nothing() {
    let mut engine = engine();
    engine.start().unwrap();
    press(&mut engine, Vec2::new(20.0, 20.0));
    move_pointer(&mut engine, Vec2::new(40.0, 20.0), Vec2::new(20.0, 0.0));
    ticks(&mut engine, 10);
    assert!(engine.event_log().is_empty());
}

#[test]
fn test_ctrl_press_rotates() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.start().unwrap();

    engine.input(InputEvent::PointerDown {
        position: CENTER,
        button: PointerButton::Primary,
        modifiers: Modifiers {
            shift: false,
            ctrl: true,
        },
    });
    engine.input(InputEvent::PointerMove {
        position: CENTER + Vec2::new(20.0, 0.0),
        movement: Vec2::new(20.0, 0.0),
    });
    ticks(&mut engine, 120);
    engine.input(InputEvent::PointerUp { position: CENTER });

    assert_eq!(engine.event_log().count(EventKind::RotateStart), 1);
    assert_eq!(engine.event_log().count(EventKind::DragStart), 0);
    assert!(tick_until(&mut engine, EventKind::RotateEnd, 1));

    // 20 px of 800 at speed 16 is 0.4 rad about the up axis
    let (_, rotation) = engine.body_pose(peg).unwrap();
    assert!(rotation.angle_between(Quat::IDENTITY) > 0.2);
}

#[test]
fn test_second_controller_cannot_take_held_component() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    let pads = ScriptedPads::default();
    let first = engine.add_tracked_control(Box::new(pads.clone()), 0);
    let second = engine.add_tracked_control(Box::new(pads.clone()), 1);
    engine.set_mode(Mode::Vr);
    engine.start().unwrap();

    pads.set(vec![pad(facing_peg(), 0.0), pad(facing_peg(), 0.0)]);
    engine.tick(FRAME_TIME);
    pads.set(vec![pad(facing_peg(), 1.0), pad(facing_peg(), 1.0)]);
    engine.tick(FRAME_TIME);

    assert_eq!(engine.selection(first), Some(peg));
    assert_eq!(engine.selection(second), None);
    assert_eq!(engine.event_log().count(EventKind::DragStart), 1);

    // Once the first lets go and the peg settles, the second may grab it
    pads.set(vec![pad(facing_peg(), 0.0), pad(facing_peg(), 0.0)]);
    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));
    pads.set(vec![pad(facing_peg(), 0.0), pad(facing_peg(), 1.0)]);
    engine.tick(FRAME_TIME);
    assert_eq!(engine.selection(second), Some(peg));
}

#[test]
fn test_controller_follows_hand() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    let pads = ScriptedPads::default();
    let hand = engine.add_tracked_control(Box::new(pads.clone()), 0);
    engine.set_mode(Mode::Vr);
    engine.start().unwrap();

    pads.set(vec![pad(facing_peg(), 1.0)]);
    engine.tick(FRAME_TIME);
    assert_eq!(engine.selection(hand), Some(peg));

    let moved = Some(TrackedPose::new(Vec3::new(0.0, 0.2, 3.0), Quat::IDENTITY));
    pads.set(vec![pad(moved, 1.0)]);
    ticks(&mut engine, 180);
    assert!(engine.event_log().count(EventKind::Drag) >= 1);

    let (position, _) = engine.body_pose(peg).unwrap();
    assert!(position.y > 0.5, "peg should follow the hand up, at {position:?}");
}

#[test]
fn test_controller_without_pose_is_skipped() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    let pads = ScriptedPads::default();
    let hand = engine.add_tracked_control(Box::new(pads.clone()), 0);
    engine.set_mode(Mode::Vr);
    engine.start().unwrap();

    // No gamepad at all, then one that has not reported a pose
    engine.tick(FRAME_TIME);
    pads.set(vec![pad(None, 1.0)]);
    ticks(&mut engine, 5);
    assert_eq!(engine.selection(hand), None);
    assert!(engine.event_log().is_empty());

    // The squeeze registers once a pose arrives
    pads.set(vec![pad(facing_peg(), 1.0)]);
    engine.tick(FRAME_TIME);
    assert_eq!(engine.selection(hand), Some(peg));
}

#[test]
fn test_controller_out_of_reach() {
    let mut engine = engine();
    let pads = ScriptedPads::default();
    let hand = engine.add_tracked_control(Box::new(pads.clone()), 0);
    engine.set_mode(Mode::Vr);
    engine.start().unwrap();

    let far = Some(TrackedPose::new(Vec3::new(0.0, 0.0, 20.0), Quat::IDENTITY));
    pads.set(vec![pad(far, 0.0)]);
    engine.tick(FRAME_TIME);
    pads.set(vec![pad(far, 1.0)]);
    engine.tick(FRAME_TIME);
    assert_eq!(engine.selection(hand), None);
}

#[test]
fn test_mode_switch_swaps_controls() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    let pads = ScriptedPads::default();
    let hand = engine.add_tracked_control(Box::new(pads.clone()), 0);
    engine.start().unwrap();

    // Pancake: the hand is not polled
    pads.set(vec![pad(facing_peg(), 0.0)]);
    engine.tick(FRAME_TIME);
    pads.set(vec![pad(facing_peg(), 1.0)]);
    engine.tick(FRAME_TIME);
    assert_eq!(engine.selection(hand), None);

    press(&mut engine, CENTER);
    move_pointer(&mut engine, CENTER + Vec2::new(10.0, 0.0), Vec2::new(10.0, 0.0));
    engine.tick(FRAME_TIME);
    assert!(matches!(engine.body_state(peg), Some(BodyState::Dragging { .. })));

    // Switching lets go of the pointer's grab
    pads.set(vec![pad(facing_peg(), 0.0)]);
    engine.set_mode(Mode::Vr);
    assert_eq!(engine.mode(), Mode::Vr);
    assert!(matches!(engine.body_state(peg), Some(BodyState::Settling { .. })));

    // Pointer input is ignored in VR
    release(&mut engine, CENTER);
    press(&mut engine, CENTER);
    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));
    assert_eq!(engine.event_log().count(EventKind::DragStart), 1);
}

#[test]
fn test_single_touch_drags() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.start().unwrap();

    touch(&mut engine, &[CENTER], true);
    touch(&mut engine, &[CENTER + Vec2::new(10.0, 0.0)], false);
    ticks(&mut engine, 120);
    engine.input(InputEvent::TouchEnd);

    assert_eq!(engine.event_log().count(EventKind::DragStart), 1);
    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));
    let (position, _) = engine.body_pose(peg).unwrap();
    assert!(position.x > 0.5, "peg should follow the finger, at {position:?}");
}

#[test]
fn test_second_finger_ends_touch_drag() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    let drag = engine.rig(Mode::Pancake).control_ids().next().unwrap();
    engine.start().unwrap();

    touch(&mut engine, &[CENTER], true);
    touch(&mut engine, &[CENTER + Vec2::new(10.0, 0.0)], false);
    ticks(&mut engine, 10);
    assert_eq!(engine.selection(drag), Some(peg));

    touch(&mut engine, &[CENTER, CENTER + Vec2::new(50.0, 0.0)], true);
    engine.tick(FRAME_TIME);
    assert_eq!(engine.selection(drag), None);
    assert!(matches!(engine.body_state(peg), Some(BodyState::Settling { .. })));
    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));
}

#[test]
fn test_pointer_leave_lets_go() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.start().unwrap();

    press(&mut engine, CENTER);
    move_pointer(&mut engine, CENTER + Vec2::new(10.0, 0.0), Vec2::new(10.0, 0.0));
    ticks(&mut engine, 10);
    engine.input(InputEvent::PointerLeave);
    engine.tick(FRAME_TIME);

    assert!(matches!(engine.body_state(peg), Some(BodyState::Settling { .. })));
    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));

    // Moving back in without a press does not pick it up again
    move_pointer(&mut engine, CENTER, Vec2::new(-10.0, 0.0));
    ticks(&mut engine, 10);
    assert_eq!(engine.event_log().count(EventKind::DragStart), 1);
}

#[test]
fn test_shift_drag_moves_along_view_direction() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.start().unwrap();

    engine.input(InputEvent::PointerDown {
        position: CENTER,
        button: PointerButton::Primary,
        modifiers: Modifiers {
            shift: true,
            ctrl: false,
        },
    });
    move_pointer(&mut engine, CENTER - Vec2::new(0.0, 20.0), Vec2::new(0.0, -20.0));
    ticks(&mut engine, 120);
    release(&mut engine, CENTER);
    assert!(tick_until(&mut engine, EventKind::DragEnd, 1));

    // Pointer up pushes the peg away from the camera, not upward
    let (position, _) = engine.body_pose(peg).unwrap();
    assert!(position.z < -0.5, "peg should move away, at {position:?}");
    assert!(position.x.abs() < 0.5 && position.y.abs() < 0.5);
}

#[test]
fn test_hover_tracks_pointer_until_press() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.start().unwrap();
    assert_eq!(engine.hovered(), None);

    move_pointer(&mut engine, CENTER, Vec2::ZERO);
    engine.tick(FRAME_TIME);
    assert_eq!(engine.hovered(), Some(peg));

    move_pointer(&mut engine, Vec2::new(20.0, 20.0), Vec2::new(-380.0, -280.0));
    engine.tick(FRAME_TIME);
    assert_eq!(engine.hovered(), None);

    press(&mut engine, CENTER);
    move_pointer(&mut engine, CENTER + Vec2::new(5.0, 0.0), Vec2::new(5.0, 0.0));
    engine.tick(FRAME_TIME);
    assert_eq!(engine.hovered(), None);
    assert_eq!(engine.event_log().count(EventKind::DragStart), 1);
}

#[test]
fn test_rotate_from_overhead_skips_vertical_turn() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.camera_mut().set_position(Vec3::new(0.0, 10.0, 0.0));
    engine.camera_mut().look_at(Vec3::ZERO);
    engine.start().unwrap();

    ctrl_press(&mut engine, CENTER);
    move_pointer(&mut engine, CENTER + Vec2::new(0.0, 40.0), Vec2::new(0.0, 40.0));
    ticks(&mut engine, 60);
    release(&mut engine, CENTER);

    assert_eq!(engine.event_log().count(EventKind::RotateStart), 1);
    assert!(tick_until(&mut engine, EventKind::RotateEnd, 1));
    let (_, rotation) = engine.body_pose(peg).unwrap();
    assert!(rotation.angle_between(Quat::IDENTITY) < 1e-3);
}

#[test]
fn test_rotate_while_drag_settles_defers_both_ends() {
    let mut engine = engine();
    let peg = id(&engine, "peg");
    engine.start().unwrap();

    drag_right(&mut engine, 10.0);
    engine.tick(FRAME_TIME);
    assert!(matches!(engine.body_state(peg), Some(BodyState::Settling { .. })));

    ctrl_press(&mut engine, CENTER);
    move_pointer(&mut engine, CENTER + Vec2::new(20.0, 0.0), Vec2::new(20.0, 0.0));
    engine.tick(FRAME_TIME);

    // The drag's end waits for the body to come to rest
    assert_eq!(engine.event_log().count(EventKind::RotateStart), 1);
    assert_eq!(engine.event_log().count(EventKind::DragEnd), 0);
    assert!(matches!(
        engine.body_state(peg),
        Some(BodyState::Dragging {
            gesture: Gesture::Rotate,
            pending_end: Some(Gesture::Drag),
            ..
        })
    ));

    release(&mut engine, CENTER);
    assert!(tick_until(&mut engine, EventKind::RotateEnd, 1));
    assert_eq!(engine.event_log().count(EventKind::DragEnd), 1);
    assert_eq!(engine.body_state(peg), Some(BodyState::Asleep));

    let kinds: Vec<EventKind> = engine.event_log().entries().map(|e| e.event.kind).collect();
    let position = |kind| kinds.iter().position(|k| *k == kind).unwrap();
    assert!(position(EventKind::RotateStart) < position(EventKind::DragEnd));
    assert!(position(EventKind::DragEnd) < position(EventKind::RotateEnd));
}

#[test]
fn test_secondary_button_orbits_camera() {
    let mut engine = engine();
    engine.start().unwrap();

    engine.input(InputEvent::PointerDown {
        position: CENTER,
        button: PointerButton::Secondary,
        modifiers: Modifiers::default(),
    });
    move_pointer(&mut engine, CENTER + Vec2::new(100.0, 0.0), Vec2::new(100.0, 0.0));
    engine.input(InputEvent::PointerUp {
        position: CENTER + Vec2::new(100.0, 0.0),
    });
    engine.tick(FRAME_TIME);

    let position = engine.camera().position();
    assert!((position.length() - 10.0).abs() < 1e-3);
    assert!(position.x < -5.0, "camera should swing around, at {position:?}");
    assert!(engine.event_log().is_empty());

    engine.input(InputEvent::Wheel { delta: -1.0 });
    engine.tick(FRAME_TIME);
    assert!((engine.camera().position().length() - 9.5).abs() < 1e-3);

    // The peg is still under the screen center
    let peg = id(&engine, "peg");
    move_pointer(&mut engine, CENTER, Vec2::ZERO);
    engine.tick(FRAME_TIME);
    assert_eq!(engine.hovered(), Some(peg));
}
