/// Pointer and single-touch dragging in the camera plane
///
/// Holding shift while pressing switches to "across" mode, where vertical
/// pointer travel moves the component toward or away from the camera.

use glam::{Quat, Vec2, Vec3};
use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_2;

use super::{Control, ControlContext, Gesture, InputEvent, PointerButton, Target};
use crate::assembly::ObjectId;

#[derive(Debug, Clone, Copy)]
struct DragState {
    component: ObjectId,
    /// Plane through the component facing the camera
    plane_point: Vec3,
    plane_normal: Vec3,
    start_hit: Vec3,
    start_position: Vec3,
    across: bool,
}

pub struct PointerDragControl {
    active: bool,
    queue: VecDeque<InputEvent>,
    state: Option<DragState>,
    hovered: Option<ObjectId>,
}

impl PointerDragControl {
    pub fn new() -> Self {
        Self {
            active: false,
            queue: VecDeque::new(),
            state: None,
            hovered: None,
        }
    }

    fn begin(&mut self, ctx: &mut ControlContext<'_>, screen: Vec2, across: bool) {
        if self.state.is_some() {
            return;
        }
        let ray = ctx.screen_ray(screen);
        let Some(selection) = ctx.select_start(Gesture::Drag, &ray, f32::INFINITY) else {
            return;
        };

        let normal = ctx.camera().forward();
        let start_hit = ray
            .project_onto_plane(selection.position, normal)
            .unwrap_or(selection.position);

        self.hovered = None;
        self.state = Some(DragState {
            component: selection.component,
            plane_point: selection.position,
            plane_normal: normal,
            start_hit,
            start_position: selection.position,
            across,
        });
    }

    fn drag(&mut self, ctx: &mut ControlContext<'_>, screen: Vec2) {
        let ray = ctx.screen_ray(screen);
        let Some(state) = self.state else {
            self.hovered = ctx.pick(&ray, f32::INFINITY);
            return;
        };

        let Some(hit) = ray.project_onto_plane(state.plane_point, state.plane_normal) else {
            return;
        };
        let mut delta = hit - state.start_hit;

        if state.across {
            let camera = ctx.camera();
            let axis = camera.forward().cross(camera.up());
            if axis.length_squared() > 1e-8 {
                delta = Quat::from_axis_angle(axis.normalize(), -FRAC_PI_2) * delta;
            }
        }

        ctx.move_to(state.component, Target::Position(state.start_position + delta));
    }

    fn end(&mut self, ctx: &mut ControlContext<'_>) {
        if let Some(state) = self.state.take() {
            ctx.select_end(state.component);
        }
    }
}

impl Default for PointerDragControl {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for PointerDragControl {
    fn gesture(&self) -> Gesture {
        Gesture::Drag
    }

    fn activate(&mut self) {
        self.active = true;
    }

    fn deactivate(&mut self) -> Option<ObjectId> {
        self.active = false;
        self.queue.clear();
        self.hovered = None;
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
                } if !modifiers.ctrl => self.begin(ctx, position, modifiers.shift),
                InputEvent::PointerMove { position, .. } => self.drag(ctx, position),
                InputEvent::PointerUp { .. } | InputEvent::PointerLeave | InputEvent::TouchEnd => self.end(ctx),
                InputEvent::TouchStart { touches } => match touches.as_slice() {
                    [touch] => self.begin(ctx, *touch, false),
                    // A second finger means the user is pinching, not dragging
                    _ => self.end(ctx),
                },
                InputEvent::TouchMove { touches } => {
                    if let [touch] = touches.as_slice() {
                        self.drag(ctx, *touch);
                    }
                }
                _ => {}
            }
        }
    }

    fn selected(&self) -> Option<ObjectId> {
        self.state.map(|s| s.component)
    }

    fn hovered(&self) -> Option<ObjectId> {
        self.hovered
    }

    fn cancel(&mut self) {
        self.queue.clear();
        self.state = None;
        self.hovered = None;
    }
}
