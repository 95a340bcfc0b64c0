use glam::{Quat, Vec3};

use super::{ObjectId, SceneObject};
use crate::config::LinkConfigData;
use crate::scale::TransformBridge;

pub type LinkId = usize;

/// Thresholds for calling a link satisfied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkTolerance {
    /// Simulation units
    pub position: f32,
    /// Radians
    pub angle: f32,
    pub test_orientation: bool,
}

impl From<&LinkConfigData> for LinkTolerance {
    fn from(config: &LinkConfigData) -> Self {
        Self {
            position: config.position_tolerance,
            angle: config.angular_tolerance,
            test_orientation: config.test_orientation,
        }
    }
}

impl Default for LinkTolerance {
    fn default() -> Self {
        Self::from(&LinkConfigData::default())
    }
}

/// Required pose of `b` relative to `a`, captured when the assembly was built
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub a: ObjectId,
    pub b: ObjectId,

    /// Position of `b` in `a`'s frame, visual units
    pub offset: Vec3,

    /// Orientation of `b` in `a`'s frame
    pub rotation: Quat,
}

impl Link {
    pub(super) fn between(id: LinkId, a: &SceneObject, b: &SceneObject) -> Self {
        let inverse = a.rotation.inverse();
        Self {
            id,
            a: a.id,
            b: b.id,
            offset: inverse * (b.position - a.position),
            rotation: inverse * b.rotation,
        }
    }

    pub fn objects(&self) -> [ObjectId; 2] {
        [self.a, self.b]
    }

    pub fn involves(&self, id: ObjectId) -> bool {
        self.a == id || self.b == id
    }

    /// Where `b` should be, in simulation units, given `a`'s visual pose
    pub fn anchor(&self, a_position: Vec3, a_rotation: Quat, bridge: &TransformBridge) -> Vec3 {
        bridge.to_sim(a_position + a_rotation * self.offset)
    }

    /// Distance from the anchor to `b`'s body, simulation units
    pub fn distance(&self, a_position: Vec3, a_rotation: Quat, b_body_position: Vec3, bridge: &TransformBridge) -> f32 {
        self.anchor(a_position, a_rotation, bridge).distance(b_body_position)
    }

    /// Angle between `b`'s current and required orientation relative to `a`
    pub fn angle(&self, a_rotation: Quat, b_body_rotation: Quat) -> f32 {
        let relative = (a_rotation.inverse() * b_body_rotation).normalize();
        relative.angle_between(self.rotation)
    }

    /// Whether `b`'s body sits at the recorded pose relative to `a`.
    ///
    /// `a` is given by its visual transform and `b` by its physical body
    /// pose in simulation units.
    pub fn test(
        &self,
        a_pose: (Vec3, Quat),
        b_body_pose: (Vec3, Quat),
        bridge: &TransformBridge,
        tolerance: &LinkTolerance,
    ) -> bool {
        let (a_position, a_rotation) = a_pose;
        let (b_position, b_rotation) = b_body_pose;

        if self.distance(a_position, a_rotation, b_position, bridge) >= tolerance.position {
            return false;
        }
        !tolerance.test_orientation || self.angle(a_rotation, b_rotation) < tolerance.angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::ObjectKind;

    fn object(id: ObjectId, kind: ObjectKind, position: Vec3) -> SceneObject {
        SceneObject {
            id,
            name: format!("object{id}"),
            kind,
            position,
            rotation: Quat::IDENTITY,
            meshes: Vec::new(),
            shapes: Vec::new(),
            links: Vec::new(),
        }
    }

    fn fixture_and_component() -> Link {
        let fixture = object(0, ObjectKind::Fixture, Vec3::ZERO);
        let component = object(1, ObjectKind::Component, Vec3::new(0.0, 0.0, 1.0));
        Link::between(0, &fixture, &component)
    }

    #[test]
    fn test_satisfied_at_recorded_offset() {
        let link = fixture_and_component();
        let bridge = TransformBridge::default();
        assert_eq!(link.offset, Vec3::new(0.0, 0.0, 1.0));

        let body = (bridge.to_sim(Vec3::new(0.0, 0.0, 1.0)), Quat::IDENTITY);
        assert_eq!(link.distance(Vec3::ZERO, Quat::IDENTITY, body.0, &bridge), 0.0);
        assert!(link.test((Vec3::ZERO, Quat::IDENTITY), body, &bridge, &LinkTolerance::default()));
    }

    #[test]
    fn test_unsatisfied_when_off_target() {
        let link = fixture_and_component();
        let bridge = TransformBridge::default();
        let body = (bridge.to_sim(Vec3::new(0.0, 0.0, 1.2)), Quat::IDENTITY);
        assert!(!link.test((Vec3::ZERO, Quat::IDENTITY), body, &bridge, &LinkTolerance::default()));
    }

    #[test]
    fn test_orientation_required() {
        let link = fixture_and_component();
        let bridge = TransformBridge::default();
        let body = (bridge.to_sim(Vec3::new(0.0, 0.0, 1.0)), Quat::from_rotation_z(0.3));
        let tolerance = LinkTolerance::default();
        assert!(!link.test((Vec3::ZERO, Quat::IDENTITY), body, &bridge, &tolerance));

        let position_only = LinkTolerance {
            test_orientation: false,
            ..tolerance
        };
        assert!(link.test((Vec3::ZERO, Quat::IDENTITY), body, &bridge, &position_only));
    }

    #[test]
    fn test_follows_rotated_anchor() {
        let link = fixture_and_component();
        let bridge = TransformBridge::default();
        // Turn the whole pair a quarter turn about Y
        let turn = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let b_position = bridge.to_sim(turn * Vec3::new(0.0, 0.0, 1.0));
        assert!(link.test((Vec3::ZERO, turn), (b_position, turn), &bridge, &LinkTolerance::default()));
        assert!(!link.test(
            (Vec3::ZERO, turn),
            (bridge.to_sim(Vec3::new(0.0, 0.0, 1.0)), turn),
            &bridge,
            &LinkTolerance::default()
        ));
    }

    #[test]
    fn test_independent_of_evaluation_order() {
        let link = fixture_and_component();
        let bridge = TransformBridge::default();
        let tolerance = LinkTolerance::default();
        let a = (Vec3::ZERO, Quat::IDENTITY);
        let b = (bridge.to_sim(Vec3::new(0.0, 0.001, 1.0)), Quat::IDENTITY);
        let first = link.test(a, b, &bridge, &tolerance);
        let _ = link.test(a, (Vec3::splat(100.0), Quat::IDENTITY), &bridge, &tolerance);
        assert_eq!(first, link.test(a, b, &bridge, &tolerance));
        assert!(first);
    }
}
