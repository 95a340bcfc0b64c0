/// Input control adapters
///
/// Every device funnels into the same three calls on `ControlContext`:
/// `select_start`, `move_to` and `select_end`. Adapters never touch bodies
/// or the scene directly; the context writes drag-body targets and queues
/// events on their behalf.

pub mod drag;
pub mod orbit;
pub mod rotate;
pub mod tracked;

pub use drag::PointerDragControl;
pub use orbit::{OrbitCameraControl, OrbitMode};
pub use rotate::PointerRotateControl;
pub use tracked::{GamepadSource, GamepadState, TrackedControl, TrackedPose};

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::assembly::{Assembly, ObjectId};
use crate::camera::{Camera, Viewport};
use crate::events::{AssemblyEvent, EventBus, EventKind};
use crate::physics::{BodyRegistry, BodyState, GestureStart, PhysicsWorld};
use crate::ray::Ray;
use crate::scale::TransformBridge;
use crate::scene::VisualScene;

/// Kind of manipulation a control performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gesture {
    Drag,
    Rotate,
}

/// Identity of a control adapter within the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

/// Raw pointer and touch input, screen positions in pixels
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        position: Vec2,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        position: Vec2,
        movement: Vec2,
    },
    PointerUp {
        position: Vec2,
    },
    PointerLeave,
    TouchStart {
        touches: Vec<Vec2>,
    },
    TouchMove {
        touches: Vec<Vec2>,
    },
    TouchEnd,
    /// Scroll; negative is away from the user
    Wheel {
        delta: f32,
    },
}

/// New intended pose for a held component, visual units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Position(Vec3),
    Orientation(Quat),
    Pose(Vec3, Quat),
}

/// A component picked up by `select_start`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub component: ObjectId,
    /// Point where the ray met the component
    pub hit: Vec3,
    /// Drag target pose at the start of the gesture
    pub position: Vec3,
    pub rotation: Quat,
}

/// Device adapter polled once per tick while its rig is active
pub trait Control {
    fn gesture(&self) -> Gesture;

    fn activate(&mut self);

    /// Detach from input. Returns the component that was held, whose
    /// gesture the caller must end.
    fn deactivate(&mut self) -> Option<ObjectId>;

    fn is_active(&self) -> bool;

    /// Raw input from the host; ignored unless active
    fn handle_input(&mut self, _event: &InputEvent) {}

    fn update(&mut self, ctx: &mut ControlContext<'_>);

    fn selected(&self) -> Option<ObjectId>;

    /// Component under the pointer while nothing is held
    fn hovered(&self) -> Option<ObjectId> {
        None
    }

    /// Forget the selection without ending it (assembly went away)
    fn cancel(&mut self);
}

/// Everything a control may reach during its update
pub struct ControlContext<'a> {
    pub(crate) control: ControlId,
    pub(crate) assembly: &'a Assembly,
    pub(crate) scene: &'a VisualScene,
    pub(crate) bodies: &'a mut BodyRegistry,
    pub(crate) physics: &'a mut PhysicsWorld,
    pub(crate) events: &'a mut EventBus,
    pub(crate) moved: &'a mut Vec<ObjectId>,
    pub(crate) camera: &'a Camera,
    pub(crate) viewport: Viewport,
    pub(crate) bridge: TransformBridge,
}

impl<'a> ControlContext<'a> {
    pub fn control(&self) -> ControlId {
        self.control
    }

    pub fn camera(&self) -> &Camera {
        self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn screen_ray(&self, screen: Vec2) -> Ray {
        self.camera.screen_ray(screen, self.viewport)
    }

    /// Nearest component along `ray`, within `max_distance`
    pub fn pick(&self, ray: &Ray, max_distance: f32) -> Option<ObjectId> {
        self.scene.pick(ray, max_distance).map(|hit| hit.object)
    }

    fn event(&mut self, kind: EventKind, component: ObjectId) {
        let name = self
            .assembly
            .object(component)
            .map(|o| o.name.clone())
            .unwrap_or_default();
        self.events.push(AssemblyEvent::new(kind, component, name));
    }

    /// Pick a component and begin `gesture` on it.
    ///
    /// Returns `None` when nothing is hit or the component is already held
    /// by another control.
    pub fn select_start(&mut self, gesture: Gesture, ray: &Ray, max_distance: f32) -> Option<Selection> {
        let hit = self.scene.pick(ray, max_distance)?;
        let component = hit.object;

        match self
            .bodies
            .begin_gesture(self.physics, component, gesture, self.control)
        {
            GestureStart::Started => self.event(EventKind::start(gesture), component),
            GestureStart::Resumed => {
                tracing::debug!("{:?} resumed {gesture:?} on component {component}", self.control);
            }
            GestureStart::Overlapped => {
                tracing::debug!("{:?} started {gesture:?} on settling component {component}", self.control);
                self.event(EventKind::start(gesture), component);
            }
            GestureStart::Busy(holder) => {
                tracing::debug!(
                    "{:?} ignored component {component}, already held by {holder:?}",
                    self.control
                );
                return None;
            }
            GestureStart::Unavailable => return None,
        }

        let (position, rotation) = self
            .bodies
            .drag_pose(self.physics, component)
            .map(|iso| self.bridge.to_visual_pose(iso))?;

        Some(Selection {
            component,
            hit: ray.at(hit.distance),
            position,
            rotation,
        })
    }

    /// Point the held component's drag body at `target`
    pub fn move_to(&mut self, component: ObjectId, target: Target) -> bool {
        if self.bodies.holder(component) != Some(self.control) {
            return false;
        }
        let gesture = match self.bodies.state(component) {
            Some(BodyState::Dragging { gesture, .. }) => gesture,
            _ => return false,
        };

        let (position, orientation) = match target {
            Target::Position(p) => (Some(p), None),
            Target::Orientation(q) => (None, Some(q)),
            Target::Pose(p, q) => (Some(p), Some(q)),
        };
        if let Some(p) = position {
            let sim = self.bridge.to_sim(p);
            self.bodies.set_target_position(self.physics, component, sim);
        }
        if let Some(q) = orientation {
            self.bodies.set_target_orientation(self.physics, component, q);
        }

        self.event(EventKind::moved(gesture), component);
        if !self.moved.contains(&component) {
            self.moved.push(component);
        }
        true
    }

    /// Let go of the held component. Its end event follows once it settles.
    pub fn select_end(&mut self, component: ObjectId) {
        if let Some(gesture) = self.bodies.release(self.physics, component, self.control) {
            tracing::debug!("{:?} released component {component} ({gesture:?})", self.control);
        }
    }
}
