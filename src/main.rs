use assembly_engine::assembly::{loader, Assembly, AssemblyBuilder};
use assembly_engine::controls::{InputEvent, Modifiers, PointerButton};
use assembly_engine::mesh::Geometry;
use assembly_engine::{Engine, EngineConfig, TransformBridge};
use glam::{Quat, Vec2, Vec3};

const CONFIG_PATH: &str = "config/engine.json";
const FRAME_TIME: f32 = 1.0 / 60.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    tracing::info!("=== Assembly Engine Starting ===");
    let config = EngineConfig::load_or_default(CONFIG_PATH);
    let bridge = TransformBridge::new(config.physics.sim_scale);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let assembly = match args.as_slice() {
        [obj, description] => loader::load_files(obj, description, &bridge)?,
        _ => demo_assembly(&bridge)?,
    };

    let mut engine = Engine::new(config);
    engine.subscribe(|event| tracing::info!("{:?} {}", event.kind, event.name));
    engine.load(assembly)?;
    engine.start()?;

    // Scripted drag: grab whatever sits in the middle of the screen and pull it right
    let center = engine.viewport().size() * 0.5;
    engine.input(InputEvent::PointerDown {
        position: center,
        button: PointerButton::Primary,
        modifiers: Modifiers::default(),
    });
    for step in 1..=30 {
        let position = center + Vec2::new(step as f32 * 2.0, 0.0);
        engine.input(InputEvent::PointerMove {
            position,
            movement: Vec2::new(2.0, 0.0),
        });
        engine.tick(FRAME_TIME);
    }
    engine.input(InputEvent::PointerUp {
        position: center + Vec2::new(60.0, 0.0),
    });

    for _ in 0..600 {
        engine.tick(FRAME_TIME);
    }
    engine.stop();

    tracing::info!("{} events recorded", engine.event_log().len());
    if let Some(assembly) = engine.assembly() {
        for component in assembly.components() {
            let position = engine.visual_transform(component.id).map(|t| t.position);
            tracing::info!(
                "{}: {:?}, linked: {}",
                component.name,
                position,
                engine.is_linked(component.id)
            );
        }
    }
    tracing::info!("Engine shutdown complete.");
    Ok(())
}

/// A base plate with a peg resting on top of it
fn demo_assembly(bridge: &TransformBridge) -> anyhow::Result<Assembly> {
    let plate = Geometry::cuboid("base", Vec3::new(1.5, 0.2, 1.5), Vec3::new(0.0, -0.75, 0.0), Quat::IDENTITY);
    let peg = Geometry::cuboid("peg", Vec3::splat(0.5), Vec3::ZERO, Quat::IDENTITY);

    let assembly = AssemblyBuilder::new()
        .fixture("base", vec![plate.clone()], vec![plate])
        .component("peg", vec![peg.clone()], vec![peg])
        .link("base", "peg")
        .build(bridge)?;
    Ok(assembly)
}
