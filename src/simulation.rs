/// Simulation loop state and the per-tick transform sync
///
/// The loop itself is driven by the host (one `Engine::tick` per display
/// refresh, or fixed steps when headless). This module keeps the running
/// flag, the tick counter and the wall clock used by `tick_now`.

use std::time::Instant;

use crate::physics::{BodyRegistry, PhysicsWorld};
use crate::scale::TransformBridge;
use crate::scene::VisualScene;

#[derive(Debug, Default)]
pub struct SimulationLoop {
    running: bool,
    tick: u64,
    last_update_time: Option<Instant>,
}

impl SimulationLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks completed since the engine was created
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Returns false if already running
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.last_update_time = None;
        true
    }

    /// Returns false if already stopped
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.last_update_time = None;
        true
    }

    /// Wall-clock seconds since the previous call; zero on the first
    /// call after a start
    pub fn frame_time(&mut self) -> f32 {
        let now = Instant::now();
        let delta_time = self
            .last_update_time
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last_update_time = Some(now);
        delta_time
    }

    /// Count a finished tick and return its number
    pub fn advance(&mut self) -> u64 {
        let tick = self.tick;
        self.tick += 1;
        tick
    }
}

/// Copy every component's body pose into its visual transform
pub fn sync_transforms(
    bodies: &BodyRegistry,
    physics: &PhysicsWorld,
    scene: &mut VisualScene,
    bridge: &TransformBridge,
) {
    for id in bodies.components() {
        if let Some(pose) = bodies.pose(physics, id) {
            let (position, rotation) = bridge.to_visual_pose(pose);
            scene.set_transform(id, position, rotation);
        }
    }
}
