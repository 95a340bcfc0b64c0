/// Orbit camera for the pancake rig
///
/// Secondary button orbits around the target, secondary with shift pans,
/// the middle button or the wheel dollies. Two fingers orbit and three
/// fingers pan. Panning and dollying need a perspective or orthographic
/// projection; any other projection switches that one feature off.

use glam::{Vec2, Vec3};
use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

use super::{InputEvent, PointerButton};
use crate::camera::{Camera, Projection, Viewport};
use crate::config::OrbitConfigData;

const EPS: f32 = 1e-6;

/// Per-step dolly factor before `zoom_speed` is applied
const DOLLY_STEP: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitMode {
    Rotate,
    Dolly,
    Pan,
}

pub struct OrbitCameraControl {
    config: OrbitConfigData,
    target: Vec3,
    active: bool,
    queue: VecDeque<InputEvent>,
    mode: Option<OrbitMode>,
    last: Vec2,
    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_offset: Vec3,
}

impl OrbitCameraControl {
    pub fn new(target: Vec3, config: OrbitConfigData) -> Self {
        Self {
            config,
            target,
            active: false,
            queue: VecDeque::new(),
            mode: None,
            last: Vec2::ZERO,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }

    /// Point the camera orbits around
    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn mode(&self) -> Option<OrbitMode> {
        self.mode
    }

    pub fn is_pan_enabled(&self) -> bool {
        self.config.enable_pan
    }

    pub fn is_zoom_enabled(&self) -> bool {
        self.config.enable_zoom
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.queue.clear();
        self.mode = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn handle_input(&mut self, event: &InputEvent) {
        if self.active {
            self.queue.push_back(event.clone());
        }
    }

    /// Apply queued input to `camera`. Returns true when the camera moved.
    pub fn update(&mut self, camera: &mut Camera, viewport: Viewport) -> bool {
        let mut changed = false;
        while let Some(event) = self.queue.pop_front() {
            match event {
                InputEvent::PointerDown {
                    position,
                    button: PointerButton::Secondary,
                    modifiers,
                } => {
                    let mode = if modifiers.shift { OrbitMode::Pan } else { OrbitMode::Rotate };
                    self.begin(mode, position);
                }
                InputEvent::PointerDown {
                    position,
                    button: PointerButton::Middle,
                    ..
                } => self.begin(OrbitMode::Dolly, position),
                InputEvent::PointerMove { position, .. } => changed |= self.drag(camera, viewport, position),
                InputEvent::PointerUp { .. } | InputEvent::PointerLeave | InputEvent::TouchEnd => self.mode = None,
                InputEvent::Wheel { delta } => changed |= self.wheel(camera, delta),
                InputEvent::TouchStart { touches } => match touches.as_slice() {
                    [first, _] => self.begin(OrbitMode::Rotate, *first),
                    [first, _, _] => self.begin(OrbitMode::Pan, *first),
                    _ => self.mode = None,
                },
                InputEvent::TouchMove { touches } => match (touches.as_slice(), self.mode) {
                    ([first, _], Some(OrbitMode::Rotate)) | ([first, _, _], Some(OrbitMode::Pan)) => {
                        changed |= self.drag(camera, viewport, *first);
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        changed
    }

    fn begin(&mut self, mode: OrbitMode, position: Vec2) {
        let enabled = match mode {
            OrbitMode::Rotate => self.config.enable_rotate,
            OrbitMode::Dolly => self.config.enable_zoom,
            OrbitMode::Pan => self.config.enable_pan,
        };
        if enabled {
            self.mode = Some(mode);
            self.last = position;
        }
    }

    fn drag(&mut self, camera: &mut Camera, viewport: Viewport, position: Vec2) -> bool {
        let Some(mode) = self.mode else {
            return false;
        };
        let delta = position - self.last;
        self.last = position;
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return false;
        }

        match mode {
            OrbitMode::Rotate => {
                // A full viewport width is one turn
                self.theta_delta -= TAU * delta.x / viewport.width * self.config.rotate_speed;
                self.phi_delta -= TAU * delta.y / viewport.height * self.config.rotate_speed;
            }
            OrbitMode::Dolly => {
                if delta.y > 0.0 {
                    self.dolly(camera, 1.0 / self.zoom_scale());
                } else if delta.y < 0.0 {
                    self.dolly(camera, self.zoom_scale());
                }
            }
            OrbitMode::Pan => self.pan(camera, viewport, delta),
        }
        self.apply(camera)
    }

    fn wheel(&mut self, camera: &mut Camera, delta: f32) -> bool {
        if !self.config.enable_zoom || !matches!(self.mode, None | Some(OrbitMode::Rotate)) {
            return false;
        }
        if delta < 0.0 {
            self.dolly(camera, self.zoom_scale());
        } else if delta > 0.0 {
            self.dolly(camera, 1.0 / self.zoom_scale());
        }
        self.apply(camera)
    }

    fn zoom_scale(&self) -> f32 {
        DOLLY_STEP.powf(self.config.zoom_speed)
    }

    /// Scale the distance to the target; below 1 moves closer
    fn dolly(&mut self, camera: &mut Camera, factor: f32) {
        match camera.projection() {
            Projection::Perspective { .. } => self.scale *= factor,
            Projection::Orthographic { height } => {
                camera.set_projection(Projection::Orthographic {
                    height: (height * factor).max(EPS),
                });
            }
            Projection::Custom(_) => {
                tracing::debug!("dolly disabled: projection has no distance scale");
                self.config.enable_zoom = false;
                self.mode = None;
            }
        }
    }

    /// `delta` in pixels; right and down are positive
    fn pan(&mut self, camera: &Camera, viewport: Viewport, delta: Vec2) {
        let (left, up) = match camera.projection() {
            Projection::Perspective { fov } => {
                // Half the field of view spans center to top of the screen
                let distance = (camera.position() - self.target).length() * (fov * 0.5).tan();
                (
                    2.0 * delta.x * distance / viewport.height,
                    2.0 * delta.y * distance / viewport.height,
                )
            }
            Projection::Orthographic { height } => (
                delta.x * height * viewport.aspect_ratio() / viewport.width,
                delta.y * height / viewport.height,
            ),
            Projection::Custom(_) => {
                tracing::debug!("pan disabled: projection has no pan scale");
                self.config.enable_pan = false;
                self.mode = None;
                return;
            }
        };
        self.pan_offset += camera.right() * -left + camera.up() * up;
    }

    /// Fold the pending deltas into the camera pose
    fn apply(&mut self, camera: &mut Camera) -> bool {
        let before = camera.position();
        let offset = before - self.target;
        let radius = offset.length();
        let (theta, phi) = if radius > EPS {
            (offset.x.atan2(offset.z), (offset.y / radius).clamp(-1.0, 1.0).acos())
        } else {
            (0.0, PI * 0.5)
        };

        let theta = theta + self.theta_delta;
        let phi = (phi + self.phi_delta)
            .clamp(self.config.min_polar_angle, self.config.max_polar_angle)
            .clamp(EPS, PI - EPS);
        let radius = (radius * self.scale).clamp(self.config.min_distance, self.config.max_distance);
        self.target += self.pan_offset;

        let position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
        camera.set_position(position);
        camera.look_at(self.target);

        self.theta_delta = 0.0;
        self.phi_delta = 0.0;
        self.scale = 1.0;
        self.pan_offset = Vec3::ZERO;
        position.distance_squared(before) > EPS
    }
}
