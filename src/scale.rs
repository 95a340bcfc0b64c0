/// Unit conversion between render space and physics space
///
/// The physics world runs at a uniform multiple of the visual scene so that
/// small assemblies stay inside the solver's comfortable numeric range.

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::physics::{quat_to_unit_quat, unit_quat_to_quat, vec3_to_vector, vector_to_vec3};

/// Physics units per visual unit
pub const DEFAULT_SIM_SCALE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformBridge {
    scale: f32,
}

impl TransformBridge {
    pub fn new(scale: f32) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Visual vector to simulation units
    pub fn to_sim(&self, v: Vec3) -> Vec3 {
        v * self.scale
    }

    /// Simulation vector to visual units
    pub fn to_visual(&self, v: Vec3) -> Vec3 {
        v / self.scale
    }

    /// Visual position + orientation to a physics isometry
    pub fn to_sim_isometry(&self, position: Vec3, rotation: Quat) -> Isometry<Real> {
        Isometry::from_parts(
            Translation::from(vec3_to_vector(self.to_sim(position))),
            quat_to_unit_quat(rotation),
        )
    }

    /// Physics isometry to a visual position + orientation
    pub fn to_visual_pose(&self, iso: &Isometry<Real>) -> (Vec3, Quat) {
        (
            self.to_visual(vector_to_vec3(&iso.translation.vector)),
            unit_quat_to_quat(&iso.rotation),
        )
    }
}

impl Default for TransformBridge {
    fn default() -> Self {
        Self::new(DEFAULT_SIM_SCALE)
    }
}
