/// Physics integration with Rapier
///
/// Provides:
/// - The shared rigid-body world for fixtures, components and drag bodies
/// - Sub-stepped advancement with a clamped frame gap
/// - glam <-> nalgebra conversion helpers

pub mod bodies;
pub mod constraints;

pub use bodies::{BodyRegistry, BodyState, GestureStart};
pub use constraints::{ConstraintManager, ConstraintSettings};

use glam::{Quat, Vec3};
use nalgebra as na;
use rapier3d::prelude::*;

use crate::config::PhysicsConfigData;

/// Physics world wrapper
pub struct PhysicsWorld {
    /// Rapier rigid body set
    pub rigid_body_set: RigidBodySet,

    /// Rapier collider set
    pub collider_set: ColliderSet,

    pub gravity: Vector<Real>,

    /// Integration parameters; `dt` is rewritten for every sub-step
    pub integration_params: IntegrationParameters,

    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,

    /// Drag constraints live here
    pub impulse_joint_set: ImpulseJointSet,

    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,

    /// Longest single step in seconds
    max_step: f32,

    /// Frame gaps are clamped to this before sub-stepping
    max_frame_time: f32,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfigData) -> Self {
        let mut integration_params = IntegrationParameters::default();
        integration_params.dt = config.max_step;

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vec3_to_vector(config.gravity),
            integration_params,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            max_step: config.max_step,
            max_frame_time: config.max_frame_time,
        }
    }

    /// Advance by `elapsed` seconds, split into equal sub-steps no longer
    /// than the configured maximum. Returns the number of steps taken.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        let (count, dt) = substeps(elapsed, self.max_frame_time, self.max_step);
        if count == 0 {
            return 0;
        }
        if elapsed > self.max_frame_time {
            tracing::debug!("clamped frame gap of {elapsed:.3}s to {:.3}s", self.max_frame_time);
        }

        self.integration_params.dt = dt;
        for _ in 0..count {
            self.step();
        }
        count
    }

    /// Single step of `integration_params.dt`
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,  // No query pipeline, picking runs against visuals
            &(),   // No hooks
            &(),   // No events
        );
    }

    /// Remove a body together with its colliders and any joints attached to it
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(&PhysicsConfigData::default())
    }
}

/// Split a frame gap into `(count, dt)` sub-steps
pub fn substeps(elapsed: f32, max_frame_time: f32, max_step: f32) -> (u32, f32) {
    if !(elapsed > 0.0) || !(max_step > 0.0) {
        return (0, 0.0);
    }
    let clamped = elapsed.min(max_frame_time);
    let count = (clamped / max_step).ceil().max(1.0) as u32;
    (count, clamped / count as f32)
}

/// Convert Vec3 to Rapier Vector
pub fn vec3_to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

/// Convert Rapier Vector to Vec3
pub fn vector_to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Convert Quat to Rapier UnitQuaternion
pub fn quat_to_unit_quat(q: Quat) -> na::UnitQuaternion<Real> {
    na::UnitQuaternion::from_quaternion(na::Quaternion::new(q.w, q.x, q.y, q.z))
}

/// Convert Rapier UnitQuaternion to Quat
pub fn unit_quat_to_quat(q: &na::UnitQuaternion<Real>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}
