/// Hand-tracked controller adapter
///
/// Polls a `GamepadSource` every tick. Squeezing past the threshold picks
/// the component in front of the controller; while held, the component
/// follows the controller with the offset captured at the grab.

use glam::{Mat4, Quat, Vec3};

use super::{Control, ControlContext, Gesture, Target};
use crate::assembly::ObjectId;
use crate::config::ControlsConfigData;
use crate::ray::Ray;

/// Device name prefixes accepted as tracked hands
pub const SUPPORTED_GAMEPADS: [&str; 3] = ["OpenVR Gamepad", "Oculus Touch", "Spatial Controller"];

/// Controller pose as reported by the device, either part may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackedPose {
    pub position: Option<Vec3>,
    pub orientation: Option<Quat>,
}

impl TrackedPose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position: Some(position),
            orientation: Some(orientation),
        }
    }
}

/// One gamepad snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadState {
    pub id: String,
    /// `None` until the device has reported a pose
    pub pose: Option<TrackedPose>,
    pub trigger: f32,
    pub grip: f32,
}

impl GamepadState {
    pub fn is_supported(&self) -> bool {
        SUPPORTED_GAMEPADS.iter().any(|prefix| self.id.starts_with(prefix))
    }

    pub fn squeeze(&self) -> f32 {
        self.trigger.max(self.grip)
    }
}

/// Host-provided device polling
pub trait GamepadSource {
    fn gamepads(&mut self) -> Vec<GamepadState>;
}

/// The `hand`-th supported gamepad; unsupported devices do not count
pub fn find_gamepad(gamepads: &[GamepadState], hand: usize) -> Option<&GamepadState> {
    gamepads.iter().filter(|g| g.is_supported()).nth(hand)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqueezeChange {
    Pressed,
    Released,
    None,
}

fn squeeze_change(previous: f32, current: f32, threshold: f32) -> SqueezeChange {
    if previous < threshold && current >= threshold {
        SqueezeChange::Pressed
    } else if previous > threshold && current <= threshold {
        SqueezeChange::Released
    } else {
        SqueezeChange::None
    }
}

#[derive(Debug, Clone, Copy)]
struct Grab {
    component: ObjectId,
    /// Component position in the controller frame
    offset_position: Vec3,
    offset_rotation: Quat,
}

pub struct TrackedControl {
    source: Box<dyn GamepadSource>,
    hand: usize,
    threshold: f32,
    reach: f32,
    standing: Option<Mat4>,
    active: bool,
    squeeze: f32,
    position: Vec3,
    orientation: Quat,
    grab: Option<Grab>,
}

impl TrackedControl {
    pub fn new(source: Box<dyn GamepadSource>, hand: usize, config: &ControlsConfigData) -> Self {
        Self {
            source,
            hand,
            threshold: config.squeeze_threshold,
            reach: config.vr_reach,
            standing: None,
            active: false,
            squeeze: 0.0,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            grab: None,
        }
    }

    /// Room-scale transform applied to every reported pose
    pub fn set_standing_transform(&mut self, standing: Mat4) {
        self.standing = Some(standing);
    }

    pub fn hand(&self) -> usize {
        self.hand
    }

    pub fn squeeze(&self) -> f32 {
        self.squeeze
    }

    /// Size of the grab indicator: 1 when open, 0 when fully squeezed
    pub fn indicator_scale(&self) -> f32 {
        1.0 - (self.squeeze / self.threshold).min(1.0)
    }

    /// Last known controller pose in world space
    pub fn pose(&self) -> (Vec3, Quat) {
        (self.position, self.orientation)
    }

    fn apply_standing(&self, position: Vec3, orientation: Quat) -> (Vec3, Quat) {
        match self.standing {
            Some(standing) => {
                let (_, rotation, translation) =
                    (standing * Mat4::from_rotation_translation(orientation, position)).to_scale_rotation_translation();
                (translation, rotation.normalize())
            }
            None => (position, orientation),
        }
    }

    fn try_grab(&mut self, ctx: &mut ControlContext<'_>) {
        if self.grab.is_some() {
            return;
        }
        let ray = Ray::from_pose(self.position, self.orientation);
        let Some(selection) = ctx.select_start(Gesture::Drag, &ray, self.reach) else {
            return;
        };

        let inverse = self.orientation.inverse();
        self.grab = Some(Grab {
            component: selection.component,
            offset_position: inverse * (selection.position - self.position),
            offset_rotation: inverse * selection.rotation,
        });
    }

    fn release(&mut self, ctx: &mut ControlContext<'_>) {
        if let Some(grab) = self.grab.take() {
            ctx.select_end(grab.component);
        }
    }
}

impl Control for TrackedControl {
    fn gesture(&self) -> Gesture {
        Gesture::Drag
    }

    fn activate(&mut self) {
        self.active = true;
    }

    fn deactivate(&mut self) -> Option<ObjectId> {
        self.active = false;
        self.squeeze = 0.0;
        self.grab.take().map(|g| g.component)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn update(&mut self, ctx: &mut ControlContext<'_>) {
        if !self.active {
            return;
        }

        let gamepads = self.source.gamepads();
        let Some(gamepad) = find_gamepad(&gamepads, self.hand) else {
            tracing::debug!("no gamepad for hand {}", self.hand);
            return;
        };
        let Some(pose) = gamepad.pose else {
            tracing::debug!("gamepad {} has not reported a pose yet", gamepad.id);
            return;
        };

        let position = pose.position.unwrap_or(self.position);
        let orientation = pose.orientation.unwrap_or(self.orientation);
        let (position, orientation) = self.apply_standing(position, orientation);
        let moved = pose.position.is_some() && position != self.position;
        let turned = pose.orientation.is_some() && orientation != self.orientation;
        self.position = position;
        self.orientation = orientation;

        let squeeze = gamepad.squeeze();
        let change = squeeze_change(self.squeeze, squeeze, self.threshold);
        self.squeeze = squeeze;

        match change {
            SqueezeChange::Pressed => {
                if pose.position.is_some() && pose.orientation.is_some() {
                    self.try_grab(ctx);
                } else {
                    tracing::debug!("incomplete pose on hand {}, grab skipped", self.hand);
                }
            }
            SqueezeChange::Released => self.release(ctx),
            SqueezeChange::None => {}
        }

        let Some(grab) = self.grab else {
            return;
        };
        let target_position = self.position + self.orientation * grab.offset_position;
        let target_rotation = (self.orientation * grab.offset_rotation).normalize();
        // Turning about the grip also swings the held offset, so it moves too
        let target = match (moved, turned) {
            (_, true) => Target::Pose(target_position, target_rotation),
            (true, false) => Target::Position(target_position),
            (false, false) => return,
        };
        ctx.move_to(grab.component, target);
    }

    fn selected(&self) -> Option<ObjectId> {
        self.grab.map(|g| g.component)
    }

    fn cancel(&mut self) {
        self.grab = None;
    }
}
