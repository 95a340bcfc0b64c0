use glam::{Mat4, Quat, Vec2, Vec3};

use crate::config::CameraConfigData;
use crate::ray::Ray;

/// World up axis shared by cameras and rotate controls
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Drawable area in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in radians
    Perspective { fov: f32 },
    /// Visible height in world units
    Orthographic { height: f32 },
    /// Host-supplied matrix, e.g. a headset eye projection
    Custom(Mat4),
}

/// Camera with yaw/pitch/roll orientation
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    position: Vec3,
    /// Camera rotation (pitch, yaw, roll in radians)
    pitch: f32,
    yaw: f32,
    roll: f32,
    projection: Projection,
    /// Near clipping plane distance
    near_plane: f32,
    /// Far clipping plane distance
    far_plane: f32,
}

impl Camera {
    /// Create a new camera at the given position with default projection settings
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            projection: Projection::Perspective {
                fov: 45.0_f32.to_radians(),
            },
            near_plane: 0.1,
            far_plane: 1000.0,
        }
    }

    pub fn with_projection(position: Vec3, projection: Projection, near_plane: f32, far_plane: f32) -> Self {
        Self {
            projection,
            near_plane,
            far_plane,
            ..Self::new(position)
        }
    }

    /// Get the camera's position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Get the camera's rotation as quaternion
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(glam::EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation() * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation() * Vec3::X
    }

    /// Turn to face `target`; roll is reset
    pub fn look_at(&mut self, target: Vec3) {
        let dir = target - self.position;
        if dir.length_squared() < 1e-12 {
            return;
        }
        let dir = dir.normalize();
        self.pitch = dir.y.clamp(-1.0, 1.0).asin();
        self.yaw = (-dir.x).atan2(-dir.z);
        self.roll = 0.0;
    }

    /// Get the view matrix for rendering
    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.rotation();
        let forward = rotation * Vec3::NEG_Z;
        let target = self.position + forward;
        let up = rotation * Vec3::Y;

        Mat4::look_at_rh(self.position, target, up)
    }

    /// Get the projection matrix for rendering
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov } => {
                Mat4::perspective_rh(fov, aspect_ratio, self.near_plane, self.far_plane)
            }
            Projection::Orthographic { height } => {
                let half_h = height * 0.5;
                let half_w = half_h * aspect_ratio;
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.near_plane, self.far_plane)
            }
            Projection::Custom(matrix) => matrix,
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    /// Get near clipping plane distance
    pub fn near_plane(&self) -> f32 {
        self.near_plane
    }

    /// Get far clipping plane distance
    pub fn far_plane(&self) -> f32 {
        self.far_plane
    }

    /// World-space ray through a pixel of the viewport
    pub fn screen_ray(&self, screen: Vec2, viewport: Viewport) -> Ray {
        Ray::from_screen(
            screen,
            viewport.size(),
            self.view_matrix(),
            self.projection_matrix(viewport.aspect_ratio()),
        )
    }
}

impl From<&CameraConfigData> for Camera {
    fn from(config: &CameraConfigData) -> Self {
        let mut camera = Camera::with_projection(
            config.position,
            Projection::Perspective {
                fov: config.fov.to_radians(),
            },
            config.near_plane,
            config.far_plane,
        );
        camera.look_at(config.target);
        camera
    }
}
