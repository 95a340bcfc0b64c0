#![allow(dead_code)]

// Shared scenario setup for the integration tests

use assembly_engine::assembly::{Assembly, AssemblyBuilder};
use assembly_engine::camera::Viewport;
use assembly_engine::controls::{InputEvent, Modifiers, PointerButton};
use assembly_engine::mesh::Geometry;
use assembly_engine::{Engine, EngineConfig, EventKind, ObjectId, TransformBridge};
use glam::{Quat, Vec2, Vec3};

pub const FRAME_TIME: f32 = 1.0 / 60.0;
pub const VIEWPORT: Viewport = Viewport {
    width: 800.0,
    height: 600.0,
};

/// Screen center, where the peg sits
pub const CENTER: Vec2 = Vec2::new(400.0, 300.0);

pub fn cube(name: &str, center: Vec3) -> Geometry {
    Geometry::cuboid(name, Vec3::splat(0.5), center, Quat::IDENTITY)
}

/// A fixture well below a peg at the origin, linked
pub fn assembly(fixture: &str, component: &str) -> Assembly {
    let base = cube(fixture, Vec3::new(0.0, -3.0, 0.0));
    let peg = cube(component, Vec3::ZERO);
    AssemblyBuilder::new()
        .fixture(fixture, vec![base.clone()], vec![base])
        .component(component, vec![peg.clone()], vec![peg])
        .link(fixture, component)
        .build(&TransformBridge::default())
        .unwrap()
}

/// Loaded, not started; camera at (0, 0, 10) facing the origin
pub fn engine() -> Engine {
    let _ = tracing_subscriber::fmt::try_init();

    let mut config = EngineConfig::default();
    config.camera.position = Vec3::new(0.0, 0.0, 10.0);
    config.camera.target = Vec3::ZERO;

    let mut engine = Engine::new(config);
    engine.resize(VIEWPORT.width as u32, VIEWPORT.height as u32);
    engine.load(assembly("base", "peg")).unwrap();
    engine
}

pub fn id(engine: &Engine, name: &str) -> ObjectId {
    engine.assembly().unwrap().find(name).unwrap().id
}

pub fn press(engine: &mut Engine, position: Vec2) {
    engine.input(InputEvent::PointerDown {
        position,
        button: PointerButton::Primary,
        modifiers: Modifiers::default(),
    });
}

pub fn move_pointer(engine: &mut Engine, position: Vec2, movement: Vec2) {
    engine.input(InputEvent::PointerMove { position, movement });
}

pub fn release(engine: &mut Engine, position: Vec2) {
    engine.input(InputEvent::PointerUp { position });
}

pub fn ticks(engine: &mut Engine, count: usize) {
    for _ in 0..count {
        engine.tick(FRAME_TIME);
    }
}

/// Tick until `kind` has been logged `count` times; false on timeout
pub fn tick_until(engine: &mut Engine, kind: EventKind, count: usize) -> bool {
    for _ in 0..3000 {
        if engine.event_log().count(kind) >= count {
            return true;
        }
        engine.tick(FRAME_TIME);
    }
    engine.event_log().count(kind) >= count
}

/// Grab the peg at the screen center and pull it `pixels` to the right
pub fn drag_right(engine: &mut Engine, pixels: f32) {
    press(engine, CENTER);
    move_pointer(engine, CENTER + Vec2::new(pixels, 0.0), Vec2::new(pixels, 0.0));
    ticks(engine, 120);
    release(engine, CENTER + Vec2::new(pixels, 0.0));
}
