/// Pointer rotation: ctrl + primary button turns the component about the
/// world up axis (horizontal travel) and the camera's right axis (vertical
/// travel).

use glam::{Quat, Vec2};
use std::collections::VecDeque;

use super::{Control, ControlContext, Gesture, InputEvent, PointerButton, Target};
use crate::assembly::ObjectId;
use crate::camera::WORLD_UP;

#[derive(Debug, Clone, Copy)]
struct RotateState {
    component: ObjectId,
    orientation: Quat,
}

pub struct PointerRotateControl {
    active: bool,
    queue: VecDeque<InputEvent>,
    state: Option<RotateState>,
    /// Radians per full viewport width of travel
    speed: f32,
}

impl PointerRotateControl {
    pub fn new(speed: f32) -> Self {
        Self {
            active: false,
            queue: VecDeque::new(),
            state: None,
            speed,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    fn begin(&mut self, ctx: &mut ControlContext<'_>, screen: Vec2) {
        if self.state.is_some() {
            return;
        }
        let ray = ctx.screen_ray(screen);
        if let Some(selection) = ctx.select_start(Gesture::Rotate, &ray, f32::INFINITY) {
            self.state = Some(RotateState {
                component: selection.component,
                orientation: selection.rotation,
            });
        }
    }

    fn turn(&mut self, ctx: &mut ControlContext<'_>, movement: Vec2) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let viewport = ctx.viewport();
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return;
        }

        let yaw = Quat::from_axis_angle(WORLD_UP, movement.x / viewport.width * self.speed);

        let right = ctx.camera().forward().cross(WORLD_UP);
        let pitch = if right.length_squared() < 1e-6 {
            tracing::debug!("camera looks along the up axis, skipping vertical rotation");
            Quat::IDENTITY
        } else {
            Quat::from_axis_angle(right.normalize(), movement.y / viewport.height * self.speed)
        };

        state.orientation = (yaw * pitch * state.orientation).normalize();
        let (component, orientation) = (state.component, state.orientation);
        ctx.move_to(component, Target::Orientation(orientation));
    }

    fn end(&mut self, ctx: &mut ControlContext<'_>) {
        if let Some(state) = self.state.take() {
            ctx.select_end(state.component);
        }
    }
}

impl Default for PointerRotateControl {
    fn default() -> Self {
        Self::new(crate::config::ControlsConfigData::default().rotate_speed)
    }
}

impl Control for PointerRotateControl {
    fn gesture(&self) -> Gesture {
        Gesture::Rotate
    }

    fn activate(&mut self) {
        self.active = true;
    }

    fn deactivate(&mut self) -> Option<ObjectId> {
        self.active = false;
        self.queue.clear();
        self.state.take().map(|s| s.component)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn handle_input(&mut self, event: &InputEvent) {
        if self.active {
            self.queue.push_back(event.clone());
        }
    }

    fn update(&mut self, ctx: &mut ControlContext<'_>) {
        while let Some(event) = self.queue.pop_front() {
            match event {
                InputEvent::PointerDown {
                    position,
                    button: PointerButton::Primary,
                    modifiers,
                } if modifiers.ctrl => self.begin(ctx, position),
                InputEvent::PointerMove { movement, .. } => self.turn(ctx, movement),
                InputEvent::PointerUp { .. } | InputEvent::PointerLeave => self.end(ctx),
                _ => {}
            }
        }
    }

    fn selected(&self) -> Option<ObjectId> {
        self.state.map(|s| s.component)
    }

    fn cancel(&mut self) {
        self.queue.clear();
        self.state = None;
    }
}
