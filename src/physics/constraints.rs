/// Drag constraints binding each component to its drag body
///
/// No axis is locked. All six are driven by motors toward the drag body's
/// pose, and every motor is capped by `max_force`, so a large jump of the
/// target can neither fling nor spin the body.

use rapier3d::prelude::*;
use std::collections::HashMap;

use super::PhysicsWorld;
use crate::assembly::ObjectId;
use crate::config::PhysicsConfigData;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintSettings {
    /// Upper bound on the corrective force
    pub max_force: f32,
    pub stiffness: f32,
    pub damping: f32,
}

impl From<&PhysicsConfigData> for ConstraintSettings {
    fn from(config: &PhysicsConfigData) -> Self {
        Self {
            max_force: config.max_force,
            stiffness: config.stiffness,
            damping: config.damping,
        }
    }
}

impl Default for ConstraintSettings {
    fn default() -> Self {
        Self::from(&PhysicsConfigData::default())
    }
}

/// Owns one lock joint per loaded component
#[derive(Default)]
pub struct ConstraintManager {
    settings: ConstraintSettings,
    joints: HashMap<ObjectId, ImpulseJointHandle>,
}

impl ConstraintManager {
    pub fn new(settings: ConstraintSettings) -> Self {
        Self {
            settings,
            joints: HashMap::new(),
        }
    }

    pub fn settings(&self) -> ConstraintSettings {
        self.settings
    }

    fn lock_joint(&self) -> GenericJoint {
        let mut builder = GenericJointBuilder::new(JointAxesMask::empty());
        for axis in [
            JointAxis::LinX,
            JointAxis::LinY,
            JointAxis::LinZ,
            JointAxis::AngX,
            JointAxis::AngY,
            JointAxis::AngZ,
        ] {
            builder = builder
                .motor_position(axis, 0.0, self.settings.stiffness, self.settings.damping)
                .motor_max_force(axis, self.settings.max_force);
        }
        builder.build()
    }

    /// Bind `body` to `drag_body`. The body is left asleep.
    pub fn attach(
        &mut self,
        world: &mut PhysicsWorld,
        component: ObjectId,
        body: RigidBodyHandle,
        drag_body: RigidBodyHandle,
    ) -> ImpulseJointHandle {
        if let Some(previous) = self.joints.remove(&component) {
            world.impulse_joint_set.remove(previous, false);
        }

        let joint = self.lock_joint();
        let handle = world.impulse_joint_set.insert(drag_body, body, joint, false);

        if let Some(rb) = world.rigid_body_set.get_mut(body) {
            if !rb.is_sleeping() {
                rb.sleep();
            }
        }

        self.joints.insert(component, handle);
        handle
    }

    pub fn joint(&self, component: ObjectId) -> Option<ImpulseJointHandle> {
        self.joints.get(&component).copied()
    }

    /// Remove every joint without waking anything
    pub fn detach_all(&mut self, world: &mut PhysicsWorld) {
        for (_, handle) in self.joints.drain() {
            world.impulse_joint_set.remove(handle, false);
        }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}
