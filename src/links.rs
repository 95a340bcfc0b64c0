/// Link satisfaction tracking
///
/// Re-tests links on demand and remembers which links hold and which
/// components count as linked, so callers only hear about changes.

use std::collections::BTreeSet;

use crate::assembly::{Assembly, LinkId, LinkTolerance, ObjectId};
use crate::physics::{unit_quat_to_quat, vector_to_vec3, BodyRegistry, PhysicsWorld};
use crate::scale::TransformBridge;
use crate::scene::VisualScene;

/// A component whose linked state flipped during an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkChange {
    pub component: ObjectId,
    pub linked: bool,
}

pub struct LinkEvaluator {
    tolerance: LinkTolerance,
    satisfied: Vec<bool>,
    linked: Vec<bool>,
}

impl LinkEvaluator {
    pub fn new(assembly: &Assembly, tolerance: LinkTolerance) -> Self {
        Self {
            tolerance,
            satisfied: vec![false; assembly.links().len()],
            linked: vec![false; assembly.len()],
        }
    }

    pub fn tolerance(&self) -> LinkTolerance {
        self.tolerance
    }

    pub fn is_satisfied(&self, link: LinkId) -> bool {
        self.satisfied.get(link).copied().unwrap_or(false)
    }

    pub fn is_linked(&self, id: ObjectId) -> bool {
        self.linked.get(id).copied().unwrap_or(false)
    }

    /// Test one link: `a` by its visual transform, `b` by its body pose.
    /// A link whose participants are missing never holds.
    pub fn test_link(
        &self,
        assembly: &Assembly,
        link: LinkId,
        bodies: &BodyRegistry,
        physics: &PhysicsWorld,
        scene: &VisualScene,
        bridge: &TransformBridge,
    ) -> bool {
        let Some(link) = assembly.link(link) else {
            return false;
        };
        let Some(a) = scene.transform(link.a) else {
            return false;
        };
        let Some(b) = bodies.pose(physics, link.b) else {
            return false;
        };

        let b_pose = (vector_to_vec3(&b.translation.vector), unit_quat_to_quat(&b.rotation));
        link.test((a.position, a.rotation), b_pose, bridge, &self.tolerance)
    }

    /// Re-evaluate around `component`: every component sharing a link with
    /// it (itself included) is linked when any of its own links hold.
    pub fn evaluate(
        &mut self,
        component: ObjectId,
        assembly: &Assembly,
        bodies: &BodyRegistry,
        physics: &PhysicsWorld,
        scene: &VisualScene,
        bridge: &TransformBridge,
    ) -> Vec<LinkChange> {
        let Some(object) = assembly.object(component) else {
            return Vec::new();
        };

        let neighbours: BTreeSet<ObjectId> = object
            .links
            .iter()
            .filter_map(|&id| assembly.link(id))
            .flat_map(|link| link.objects())
            .collect();

        let mut changes = Vec::new();
        for id in neighbours {
            let Some(neighbour) = assembly.object(id) else {
                continue;
            };
            if !neighbour.kind.is_component() {
                continue;
            }

            let mut linked = false;
            for &link in &neighbour.links {
                let holds = self.test_link(assembly, link, bodies, physics, scene, bridge);
                if let Some(slot) = self.satisfied.get_mut(link) {
                    *slot = holds;
                }
                linked |= holds;
            }

            if let Some(slot) = self.linked.get_mut(id) {
                if *slot != linked {
                    *slot = linked;
                    tracing::debug!("component {} {}", neighbour.name, if linked { "linked" } else { "unlinked" });
                    changes.push(LinkChange { component: id, linked });
                }
            }
        }
        changes
    }
}
