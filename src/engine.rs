/// Engine facade: lifecycle, mode machine and the per-tick pipeline
///
/// Owns the physics world and the visual scene. Structural changes (bodies,
/// constraints, visuals) only happen in `load`/unload; per-tick changes only
/// happen in `tick`.

use glam::{Quat, Vec3};

use crate::assembly::{Assembly, LinkTolerance, ObjectId};
use crate::camera::{Camera, Viewport};
use crate::config::EngineConfig;
use crate::controls::{
    Control, ControlContext, ControlId, GamepadSource, InputEvent, OrbitCameraControl, PointerDragControl,
    PointerRotateControl, TrackedControl,
};
use crate::error::LifecycleError;
use crate::events::{AssemblyEvent, EventBus, EventKind, EventLog, ListenerId};
use crate::links::LinkEvaluator;
use crate::physics::{unit_quat_to_quat, vector_to_vec3, BodyRegistry, BodyState, ConstraintManager, ConstraintSettings, PhysicsWorld};
use crate::scale::TransformBridge;
use crate::scene::{Renderer, Transform, VisualScene};
use crate::simulation::{self, SimulationLoop};

/// Interaction mode; each owns a rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Desktop/touch screen
    Pancake,
    Vr,
}

/// Camera plus the controls active in one mode
pub struct Rig {
    pub camera: Camera,
    controls: Vec<(ControlId, Box<dyn Control>)>,
    orbit: Option<OrbitCameraControl>,
}

impl Rig {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            controls: Vec::new(),
            orbit: None,
        }
    }

    /// Let the user steer this rig's camera around `orbit`'s target
    pub fn with_orbit(mut self, orbit: OrbitCameraControl) -> Self {
        self.orbit = Some(orbit);
        self
    }

    pub fn orbit(&self) -> Option<&OrbitCameraControl> {
        self.orbit.as_ref()
    }

    fn activate(&mut self) {
        for (_, control) in self.controls.iter_mut() {
            control.activate();
        }
        if let Some(orbit) = self.orbit.as_mut() {
            orbit.activate();
        }
    }

    pub fn control_ids(&self) -> impl Iterator<Item = ControlId> + '_ {
        self.controls.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// Everything tied to the currently loaded assembly
struct Loaded {
    assembly: Assembly,
    bodies: BodyRegistry,
    constraints: ConstraintManager,
    links: LinkEvaluator,
}

pub struct Engine {
    config: EngineConfig,
    bridge: TransformBridge,
    physics: PhysicsWorld,
    scene: VisualScene,
    loaded: Option<Loaded>,
    pancake: Rig,
    vr: Rig,
    mode: Mode,
    simulation: SimulationLoop,
    events: EventBus,
    log: EventLog,
    renderer: Option<Box<dyn Renderer>>,
    viewport: Viewport,
    next_control_id: usize,
}

impl Engine {
    /// Engine in pancake mode with the default pointer controls
    pub fn new(config: EngineConfig) -> Self {
        let camera = Camera::from(&config.camera);
        let orbit = OrbitCameraControl::new(config.camera.target, config.camera.orbit);
        let mut engine = Self {
            bridge: TransformBridge::new(config.physics.sim_scale),
            physics: PhysicsWorld::new(&config.physics),
            scene: VisualScene::new(),
            loaded: None,
            pancake: Rig::new(camera.clone()).with_orbit(orbit),
            vr: Rig::new(camera),
            mode: Mode::Pancake,
            simulation: SimulationLoop::new(),
            events: EventBus::new(),
            log: EventLog::default(),
            renderer: None,
            viewport: Viewport::default(),
            next_control_id: 0,
            config,
        };

        engine.add_control(Mode::Pancake, Box::new(PointerDragControl::new()));
        let rotate_speed = engine.config.controls.rotate_speed;
        engine.add_control(Mode::Pancake, Box::new(PointerRotateControl::new(rotate_speed)));
        engine
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = Some(renderer);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bridge(&self) -> TransformBridge {
        self.bridge
    }

    fn rig_mut(&mut self, mode: Mode) -> &mut Rig {
        match mode {
            Mode::Pancake => &mut self.pancake,
            Mode::Vr => &mut self.vr,
        }
    }

    pub fn rig(&self, mode: Mode) -> &Rig {
        match mode {
            Mode::Pancake => &self.pancake,
            Mode::Vr => &self.vr,
        }
    }

    /// Add a control to a mode's rig. It starts receiving input right away
    /// when that mode is live.
    pub fn add_control(&mut self, mode: Mode, mut control: Box<dyn Control>) -> ControlId {
        let id = ControlId(self.next_control_id);
        self.next_control_id += 1;

        if self.simulation.is_running() && self.mode == mode {
            control.activate();
        }
        self.rig_mut(mode).controls.push((id, control));
        id
    }

    /// Add a hand-tracked controller to the VR rig
    pub fn add_tracked_control(&mut self, source: Box<dyn GamepadSource>, hand: usize) -> ControlId {
        let control = TrackedControl::new(source, hand, &self.config.controls);
        self.add_control(Mode::Vr, Box::new(control))
    }

    /// Component held by a control, if any
    pub fn selection(&self, control: ControlId) -> Option<ObjectId> {
        self.pancake
            .controls
            .iter()
            .chain(self.vr.controls.iter())
            .find(|(id, _)| *id == control)
            .and_then(|(_, c)| c.selected())
    }

    /// Replace the loaded assembly.
    ///
    /// Fails while the simulation runs. Whatever was loaded before is torn
    /// down first: constraints, then bodies, then visuals.
    pub fn load(&mut self, assembly: Assembly) -> Result<(), LifecycleError> {
        if self.simulation.is_running() {
            return Err(LifecycleError::LoadWhileRunning);
        }
        self.unload();

        let mut bodies = BodyRegistry::new();
        bodies.create_bodies(&mut self.physics, assembly.objects(), &self.config.physics, &self.bridge);

        let mut constraints = ConstraintManager::new(ConstraintSettings::from(&self.config.physics));
        for object in assembly.components() {
            if let (Some(body), Some(drag_body)) = (bodies.body(object.id), bodies.drag_body(object.id)) {
                constraints.attach(&mut self.physics, object.id, body, drag_body);
            }
            bodies.put_to_sleep(&mut self.physics, object.id);
        }

        for object in assembly.objects() {
            self.scene.register(object, &self.config.render, &self.bridge);
        }

        let mut links = LinkEvaluator::new(&assembly, LinkTolerance::from(&self.config.links));
        for object in assembly.components() {
            for change in links.evaluate(object.id, &assembly, &bodies, &self.physics, &self.scene, &self.bridge) {
                self.scene.set_linked(change.component, change.linked);
            }
        }

        tracing::info!(
            "loaded assembly: {} fixtures, {} components, {} links",
            assembly.fixtures().count(),
            assembly.components().count(),
            assembly.links().len()
        );

        self.loaded = Some(Loaded {
            assembly,
            bodies,
            constraints,
            links,
        });
        Ok(())
    }

    fn unload(&mut self) {
        let Some(mut loaded) = self.loaded.take() else {
            return;
        };

        for (_, control) in self.pancake.controls.iter_mut().chain(self.vr.controls.iter_mut()) {
            control.cancel();
        }
        self.events.clear_pending();

        loaded.constraints.detach_all(&mut self.physics);
        loaded.bodies.clear(&mut self.physics);
        self.scene.clear();

        tracing::info!("unloaded assembly ({} objects)", loaded.assembly.len());
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn assembly(&self) -> Option<&Assembly> {
        self.loaded.as_ref().map(|l| &l.assembly)
    }

    /// Begin ticking and hand input to the active rig's controls
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if self.loaded.is_none() {
            return Err(LifecycleError::NotLoaded);
        }
        if !self.simulation.start() {
            return Ok(());
        }

        self.rig_mut(self.mode).activate();
        tracing::info!("simulation started in {:?} mode", self.mode);
        Ok(())
    }

    /// Suspend ticking and detach every control. Held components are let go;
    /// bodies and constraints stay as they are.
    pub fn stop(&mut self) {
        if !self.simulation.stop() {
            return;
        }
        self.deactivate_rig(self.mode);
        tracing::info!("simulation stopped after {} ticks", self.simulation.tick_count());
    }

    pub fn is_running(&self) -> bool {
        self.simulation.is_running()
    }

    fn deactivate_rig(&mut self, mode: Mode) {
        let rig = match mode {
            Mode::Pancake => &mut self.pancake,
            Mode::Vr => &mut self.vr,
        };
        if let Some(orbit) = rig.orbit.as_mut() {
            orbit.deactivate();
        }
        for (id, control) in rig.controls.iter_mut() {
            let Some(component) = control.deactivate() else {
                continue;
            };
            if let Some(loaded) = self.loaded.as_mut() {
                loaded.bodies.release(&mut self.physics, component, *id);
            }
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch rigs. While running, the old rig's gestures end and the new
    /// rig goes live within this call.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        let running = self.simulation.is_running();
        if running {
            self.deactivate_rig(self.mode);
        }
        self.mode = mode;
        if running {
            self.rig_mut(mode).activate();
        }
        tracing::info!("switched to {mode:?} mode");
    }

    pub fn camera(&self) -> &Camera {
        &self.rig(self.mode).camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.rig_mut(self.mode).camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// New drawable size in pixels
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width as f32, height as f32);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
    }

    /// Raw input from the host. Dropped while stopped.
    pub fn input(&mut self, event: InputEvent) {
        if !self.simulation.is_running() {
            return;
        }
        let rig = self.rig_mut(self.mode);
        if let Some(orbit) = rig.orbit.as_mut() {
            orbit.handle_input(&event);
        }
        for (_, control) in rig.controls.iter_mut() {
            control.handle_input(&event);
        }
    }

    /// Component under the pointer in the active rig, while nothing is held
    pub fn hovered(&self) -> Option<ObjectId> {
        self.rig(self.mode).controls.iter().find_map(|(_, c)| c.hovered())
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&AssemblyEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Tick with the wall-clock time since the previous tick
    pub fn tick_now(&mut self) {
        let delta_time = self.simulation.frame_time();
        self.tick(delta_time);
    }

    /// One frame: poll controls, step physics, sync visuals, report
    /// settled gestures and link changes, dispatch events, render.
    /// Does nothing while stopped.
    pub fn tick(&mut self, delta_time: f32) {
        if !self.simulation.is_running() {
            return;
        }
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        let Loaded {
            assembly,
            bodies,
            links,
            ..
        } = loaded;
        let assembly: &Assembly = assembly;

        let rig = match self.mode {
            Mode::Pancake => &mut self.pancake,
            Mode::Vr => &mut self.vr,
        };
        if let Some(orbit) = rig.orbit.as_mut() {
            orbit.update(&mut rig.camera, self.viewport);
        }
        let mut moved = Vec::new();
        for (id, control) in rig.controls.iter_mut() {
            let mut ctx = ControlContext {
                control: *id,
                assembly,
                scene: &self.scene,
                bodies: &mut *bodies,
                physics: &mut self.physics,
                events: &mut self.events,
                moved: &mut moved,
                camera: &rig.camera,
                viewport: self.viewport,
                bridge: self.bridge,
            };
            control.update(&mut ctx);
        }

        self.physics.advance(delta_time);
        let settled = bodies.collect_settled(&mut self.physics);
        simulation::sync_transforms(bodies, &self.physics, &mut self.scene, &self.bridge);

        for &(id, gesture) in &settled {
            self.events.push(event(assembly, EventKind::end(gesture), id));
        }

        let mut touched = moved;
        for (id, _) in settled {
            if !touched.contains(&id) {
                touched.push(id);
            }
        }
        for id in touched {
            for change in links.evaluate(id, assembly, bodies, &self.physics, &self.scene, &self.bridge) {
                self.scene.set_linked(change.component, change.linked);
                let kind = if change.linked {
                    EventKind::Linked
                } else {
                    EventKind::Unlinked
                };
                self.events.push(event(assembly, kind, change.component));
            }
        }

        let tick = self.simulation.advance();
        self.events.dispatch(tick, &mut self.log);
        self.render();
    }

    /// Draw one frame with the active camera; no-op without a renderer
    pub fn render(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let camera = match self.mode {
            Mode::Pancake => &self.pancake.camera,
            Mode::Vr => &self.vr.camera,
        };
        let batch = self.scene.extract_render_batch(camera);
        renderer.render(&batch, camera);
    }

    pub fn body_state(&self, id: ObjectId) -> Option<BodyState> {
        self.loaded.as_ref()?.bodies.state(id)
    }

    /// Physical body pose in simulation units
    pub fn body_pose(&self, id: ObjectId) -> Option<(Vec3, Quat)> {
        let pose = self.loaded.as_ref()?.bodies.pose(&self.physics, id)?;
        Some((vector_to_vec3(&pose.translation.vector), unit_quat_to_quat(&pose.rotation)))
    }

    pub fn visual_transform(&self, id: ObjectId) -> Option<Transform> {
        self.scene.transform(id)
    }

    pub fn is_linked(&self, id: ObjectId) -> bool {
        self.loaded.as_ref().is_some_and(|l| l.links.is_linked(id))
    }

    pub fn scene(&self) -> &VisualScene {
        &self.scene
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn event(assembly: &Assembly, kind: EventKind, id: ObjectId) -> AssemblyEvent {
    let name = assembly.object(id).map(|o| o.name.as_str()).unwrap_or_default();
    AssemblyEvent::new(kind, id, name)
}
