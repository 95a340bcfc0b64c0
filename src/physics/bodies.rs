/// Rigid-body bookkeeping for assembly objects
///
/// Fixtures own one fixed body. Components own a dynamic body plus a
/// kinematic drag body that carries the user's intended pose. Entries are
/// indexed by `ObjectId`; every Rapier body stores its owner id in
/// `user_data`.

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use super::{quat_to_unit_quat, vec3_to_vector, PhysicsWorld};
use crate::assembly::{ObjectId, ObjectKind, SceneObject};
use crate::config::PhysicsConfigData;
use crate::controls::{ControlId, Gesture};
use crate::scale::TransformBridge;
use crate::shape::ShapeSpec;

/// Where a component sits in its drag lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// Body is fixed in place until the next gesture wakes it
    Asleep,
    /// Held by a control; the body may not sleep. `pending_end` is an
    /// earlier gesture whose end waits for the same rest.
    Dragging {
        gesture: Gesture,
        holder: ControlId,
        pending_end: Option<Gesture>,
    },
    /// Released and coming to rest; the gesture's end is still pending
    Settling {
        gesture: Gesture,
        pending_end: Option<Gesture>,
    },
}

impl BodyState {
    /// Gestures whose end will be reported when the body rests, current one last
    pub fn open_gestures(&self) -> Vec<Gesture> {
        match *self {
            BodyState::Asleep => Vec::new(),
            BodyState::Dragging { gesture, pending_end, .. } | BodyState::Settling { gesture, pending_end } => {
                pending_end.into_iter().chain(Some(gesture)).collect()
            }
        }
    }
}

/// Outcome of asking to begin a gesture on a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureStart {
    /// Fresh gesture on a sleeping body
    Started,
    /// A gesture that is still open picked up again before the body settled
    Resumed,
    /// New gesture on a body still settling from another one; that end
    /// stays pending until the body rests
    Overlapped,
    /// Another control already holds the component
    Busy(ControlId),
    /// Not a component of the loaded assembly
    Unavailable,
}

#[derive(Debug, Clone)]
enum BodyEntry {
    Fixture {
        body: RigidBodyHandle,
    },
    Component {
        body: RigidBodyHandle,
        drag_body: RigidBodyHandle,
        state: BodyState,
    },
}

impl BodyEntry {
    fn body(&self) -> RigidBodyHandle {
        match self {
            BodyEntry::Fixture { body } | BodyEntry::Component { body, .. } => *body,
        }
    }
}

/// Bodies registered for the loaded assembly
#[derive(Default)]
pub struct BodyRegistry {
    entries: Vec<Option<BodyEntry>>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the immovable body for a fixture
    pub fn create_fixture_body(
        &mut self,
        world: &mut PhysicsWorld,
        object: &SceneObject,
        bridge: &TransformBridge,
    ) -> RigidBodyHandle {
        let rigid_body = RigidBodyBuilder::fixed()
            .position(bridge.to_sim_isometry(object.position, object.rotation))
            .user_data(object.id as u128)
            .build();
        let body = world.rigid_body_set.insert(rigid_body);

        for shape in &object.shapes {
            let collider = box_collider(shape).build();
            world
                .collider_set
                .insert_with_parent(collider, body, &mut world.rigid_body_set);
        }

        self.insert(object.id, BodyEntry::Fixture { body });
        body
    }

    /// Create a component's dynamic body, asleep, and its kinematic drag body
    /// at the same pose. Returns `(body, drag_body)`.
    pub fn create_component_body(
        &mut self,
        world: &mut PhysicsWorld,
        object: &SceneObject,
        config: &PhysicsConfigData,
        bridge: &TransformBridge,
    ) -> (RigidBodyHandle, RigidBodyHandle) {
        let pose = bridge.to_sim_isometry(object.position, object.rotation);

        let rigid_body = RigidBodyBuilder::dynamic()
            .position(pose)
            .angular_damping(config.angular_damping)
            .sleeping(true)
            .user_data(object.id as u128)
            .build();
        let body = world.rigid_body_set.insert(rigid_body);

        // Mass is split evenly so the total matches regardless of shape count
        let shape_mass = config.component_mass / object.shapes.len().max(1) as f32;
        for shape in &object.shapes {
            let collider = box_collider(shape).mass(shape_mass).build();
            world
                .collider_set
                .insert_with_parent(collider, body, &mut world.rigid_body_set);
        }

        // Massless target; never sleeps so target writes always apply
        let drag = RigidBodyBuilder::kinematic_position_based()
            .position(pose)
            .can_sleep(false)
            .user_data(object.id as u128)
            .build();
        let drag_body = world.rigid_body_set.insert(drag);

        self.insert(
            object.id,
            BodyEntry::Component {
                body,
                drag_body,
                state: BodyState::Asleep,
            },
        );
        (body, drag_body)
    }

    /// Register every object of an assembly in order
    pub fn create_bodies<'a>(
        &mut self,
        world: &mut PhysicsWorld,
        objects: impl IntoIterator<Item = &'a SceneObject>,
        config: &PhysicsConfigData,
        bridge: &TransformBridge,
    ) {
        for object in objects {
            match object.kind {
                ObjectKind::Fixture => {
                    self.create_fixture_body(world, object, bridge);
                }
                ObjectKind::Component => {
                    self.create_component_body(world, object, config, bridge);
                }
            }
        }
    }

    fn insert(&mut self, id: ObjectId, entry: BodyEntry) {
        if self.entries.len() <= id {
            self.entries.resize(id + 1, None);
        }
        self.entries[id] = Some(entry);
    }

    fn entry(&self, id: ObjectId) -> Option<&BodyEntry> {
        self.entries.get(id)?.as_ref()
    }

    pub fn body(&self, id: ObjectId) -> Option<RigidBodyHandle> {
        self.entry(id).map(BodyEntry::body)
    }

    pub fn drag_body(&self, id: ObjectId) -> Option<RigidBodyHandle> {
        match self.entry(id)? {
            BodyEntry::Component { drag_body, .. } => Some(*drag_body),
            BodyEntry::Fixture { .. } => None,
        }
    }

    pub fn state(&self, id: ObjectId) -> Option<BodyState> {
        match self.entry(id)? {
            BodyEntry::Component { state, .. } => Some(*state),
            BodyEntry::Fixture { .. } => None,
        }
    }

    /// Control currently holding a component
    pub fn holder(&self, id: ObjectId) -> Option<ControlId> {
        match self.state(id)? {
            BodyState::Dragging { holder, .. } => Some(holder),
            _ => None,
        }
    }

    /// Component ids in registration order
    pub fn components(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.iter().enumerate().filter_map(|(id, entry)| match entry {
            Some(BodyEntry::Component { .. }) => Some(id),
            _ => None,
        })
    }

    /// Physical body pose in simulation units
    pub fn pose<'w>(&self, world: &'w PhysicsWorld, id: ObjectId) -> Option<&'w Isometry<Real>> {
        let handle = self.body(id)?;
        world.rigid_body_set.get(handle).map(|rb| rb.position())
    }

    /// Drag body pose in simulation units
    pub fn drag_pose<'w>(&self, world: &'w PhysicsWorld, id: ObjectId) -> Option<&'w Isometry<Real>> {
        let handle = self.drag_body(id)?;
        world.rigid_body_set.get(handle).map(|rb| rb.position())
    }

    /// Freeze a component: fixed body, no pending gesture
    pub fn put_to_sleep(&mut self, world: &mut PhysicsWorld, id: ObjectId) {
        let Some(Some(BodyEntry::Component { body, state, .. })) = self.entries.get_mut(id) else {
            return;
        };
        if let Some(rb) = world.rigid_body_set.get_mut(*body) {
            rb.set_body_type(RigidBodyType::Fixed, false);
        }
        *state = BodyState::Asleep;
    }

    /// Wake a component for `gesture` on behalf of `holder`.
    ///
    /// A sleeping body turns dynamic with sleeping disallowed and its drag
    /// body is snapped onto it so the constraint starts slack.
    pub fn begin_gesture(
        &mut self,
        world: &mut PhysicsWorld,
        id: ObjectId,
        gesture: Gesture,
        holder: ControlId,
    ) -> GestureStart {
        let Some(Some(BodyEntry::Component {
            body,
            drag_body,
            state,
        })) = self.entries.get_mut(id)
        else {
            return GestureStart::Unavailable;
        };

        let (outcome, pending_end) = match *state {
            BodyState::Dragging { holder: other, .. } => return GestureStart::Busy(other),
            BodyState::Settling {
                gesture: settling,
                pending_end,
            } => {
                let open = pending_end.into_iter().chain(Some(settling));
                let older = open.filter(|g| *g != gesture).last();
                if settling == gesture || pending_end == Some(gesture) {
                    (GestureStart::Resumed, older)
                } else {
                    (GestureStart::Overlapped, older)
                }
            }
            BodyState::Asleep => (GestureStart::Started, None),
        };

        if outcome == GestureStart::Started {
            let pose = match world.rigid_body_set.get(*body) {
                Some(rb) => *rb.position(),
                None => return GestureStart::Unavailable,
            };
            if let Some(drag) = world.rigid_body_set.get_mut(*drag_body) {
                drag.set_position(pose, true);
            }
        }

        if let Some(rb) = world.rigid_body_set.get_mut(*body) {
            rb.set_body_type(RigidBodyType::Dynamic, true);
            rb.wake_up(true);
            allow_sleep(rb, false);
        }

        *state = BodyState::Dragging {
            gesture,
            holder,
            pending_end,
        };
        outcome
    }

    /// Let go of a component held by `holder`; the body may sleep again.
    /// Returns the gesture that is now settling.
    pub fn release(&mut self, world: &mut PhysicsWorld, id: ObjectId, holder: ControlId) -> Option<Gesture> {
        let Some(Some(BodyEntry::Component { body, state, .. })) = self.entries.get_mut(id) else {
            return None;
        };
        let BodyState::Dragging {
            gesture,
            holder: current,
            pending_end,
        } = *state
        else {
            return None;
        };
        if current != holder {
            return None;
        }

        if let Some(rb) = world.rigid_body_set.get_mut(*body) {
            allow_sleep(rb, true);
        }
        *state = BodyState::Settling { gesture, pending_end };
        Some(gesture)
    }

    /// Move a held component's drag target, position in simulation units
    pub fn set_target_position(&self, world: &mut PhysicsWorld, id: ObjectId, position: Vec3) -> bool {
        if !matches!(self.state(id), Some(BodyState::Dragging { .. })) {
            return false;
        }
        let Some(rb) = self.drag_body(id).and_then(|h| world.rigid_body_set.get_mut(h)) else {
            return false;
        };
        rb.set_next_kinematic_translation(vec3_to_vector(position));
        true
    }

    /// Turn a held component's drag target
    pub fn set_target_orientation(&self, world: &mut PhysicsWorld, id: ObjectId, orientation: Quat) -> bool {
        if !matches!(self.state(id), Some(BodyState::Dragging { .. })) {
            return false;
        }
        let Some(rb) = self.drag_body(id).and_then(|h| world.rigid_body_set.get_mut(h)) else {
            return false;
        };
        rb.set_next_kinematic_rotation(quat_to_unit_quat(orientation.normalize()));
        true
    }

    /// Settling components whose bodies went to sleep during the last steps.
    /// Each one is frozen and reported once per gesture that just ended,
    /// in `open_gestures` order.
    pub fn collect_settled(&mut self, world: &mut PhysicsWorld) -> Vec<(ObjectId, Gesture)> {
        let resting: Vec<(ObjectId, BodyState)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(id, entry)| match entry {
                Some(BodyEntry::Component {
                    body,
                    state: state @ BodyState::Settling { .. },
                    ..
                }) if world
                    .rigid_body_set
                    .get(*body)
                    .is_some_and(|rb| rb.is_sleeping()) =>
                {
                    Some((id, *state))
                }
                _ => None,
            })
            .collect();

        let mut settled = Vec::new();
        for (id, state) in resting {
            let gestures = state.open_gestures();
            tracing::debug!("component {id} settled after {gestures:?}");
            self.put_to_sleep(world, id);
            settled.extend(gestures.into_iter().map(|gesture| (id, gesture)));
        }
        settled
    }

    /// Remove every registered body from the world.
    /// Joints must already be gone.
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for entry in self.entries.drain(..).flatten() {
            if let BodyEntry::Component { drag_body, .. } = &entry {
                world.remove_body(*drag_body);
            }
            world.remove_body(entry.body());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Negative thresholds keep a body awake regardless of its velocity
fn allow_sleep(rb: &mut RigidBody, allowed: bool) {
    let activation = rb.activation_mut();
    if allowed {
        activation.normalized_linear_threshold = RigidBodyActivation::default_normalized_linear_threshold();
        activation.angular_threshold = RigidBodyActivation::default_angular_threshold();
    } else {
        activation.normalized_linear_threshold = -1.0;
        activation.angular_threshold = -1.0;
    }
}

fn box_collider(shape: &ShapeSpec) -> ColliderBuilder {
    let half = shape.half_extents;
    ColliderBuilder::cuboid(half.x, half.y, half.z).position(Isometry::from_parts(
        Translation::from(vec3_to_vector(shape.offset)),
        quat_to_unit_quat(shape.orientation),
    ))
}
