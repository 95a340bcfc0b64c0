use anyhow::Result;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::scale::DEFAULT_SIM_SCALE;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub physics: PhysicsConfigData,
    pub links: LinkConfigData,
    pub controls: ControlsConfigData,
    pub render: RenderConfig,
    pub camera: CameraConfigData,
}

impl EngineConfig {
    /// Load configuration from JSON file
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file with pretty formatting
    pub fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_default(path: &str) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            tracing::warn!("using default config ({path}): {err}");
            let config = Self::default();
            let _ = config.save(path);
            config
        })
    }
}

/// Rigid-body and stepping parameters (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfigData {
    /// Physics units per visual unit
    pub sim_scale: f32,

    #[serde(with = "vec3_serde")]
    pub gravity: Vec3,

    pub component_mass: f32,
    pub angular_damping: f32,

    /// Upper bound on the force the drag constraint may apply
    pub max_force: f32,
    pub stiffness: f32,
    pub damping: f32,

    /// Longest single physics step in seconds
    pub max_step: f32,

    /// Frame gaps longer than this are clamped before stepping
    pub max_frame_time: f32,
}

impl Default for PhysicsConfigData {
    fn default() -> Self {
        Self {
            sim_scale: DEFAULT_SIM_SCALE,
            gravity: Vec3::ZERO,
            component_mass: 5.0,
            angular_damping: 0.8,
            max_force: 10.0,
            stiffness: 40.0,
            damping: 12.0,
            max_step: 1.0 / 60.0,
            max_frame_time: 0.25,
        }
    }
}

/// Link satisfaction thresholds (serializable)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfigData {
    /// Distance threshold in simulation units
    pub position_tolerance: f32,
    /// Angle threshold in radians
    pub angular_tolerance: f32,
    pub test_orientation: bool,
}

impl Default for LinkConfigData {
    fn default() -> Self {
        Self {
            position_tolerance: 0.05,
            angular_tolerance: 0.05,
            test_orientation: true,
        }
    }
}

/// Input adapter tuning (serializable)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfigData {
    /// Radians of rotation per viewport width/height of pointer travel
    pub rotate_speed: f32,
    /// Trigger/grip value that counts as a grab
    pub squeeze_threshold: f32,
    /// Pick distance for tracked controllers, visual units
    pub vr_reach: f32,
}

impl Default for ControlsConfigData {
    fn default() -> Self {
        Self {
            rotate_speed: 16.0,
            squeeze_threshold: 0.8,
            vr_reach: 5.0,
        }
    }
}

/// Presentation switches threaded into the visual scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Draw collision boxes instead of meshes
    pub debug_shapes: bool,
}

/// Camera configuration (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfigData {
    #[serde(with = "vec3_serde")]
    pub position: Vec3,

    #[serde(with = "vec3_serde")]
    pub target: Vec3,

    /// Vertical field of view in degrees
    pub fov: f32,
    pub near_plane: f32,
    pub far_plane: f32,

    pub orbit: OrbitConfigData,
}

impl Default for CameraConfigData {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov: 45.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            orbit: OrbitConfigData::default(),
        }
    }
}

/// Orbit camera tuning for the pancake rig (serializable)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfigData {
    pub enable_rotate: bool,
    pub enable_zoom: bool,
    pub enable_pan: bool,

    /// Full turns per viewport width of travel
    pub rotate_speed: f32,
    /// Exponent on the per-step dolly factor of 0.95
    pub zoom_speed: f32,

    /// Dolly limits, perspective cameras only
    pub min_distance: f32,
    pub max_distance: f32,

    /// Polar angle limits in radians, measured from the up axis
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
}

impl Default for OrbitConfigData {
    fn default() -> Self {
        Self {
            enable_rotate: true,
            enable_zoom: true,
            enable_pan: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: 500.0,
            min_polar_angle: 0.0,
            max_polar_angle: std::f32::consts::PI,
        }
    }
}

/// Custom serialization for Vec3
mod vec3_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Vec3Data {
        x: f32,
        y: f32,
        z: f32,
    }

    pub fn serialize<S>(vec: &Vec3, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Vec3Data {
            x: vec.x,
            y: vec.y,
            z: vec.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = Vec3Data::deserialize(deserializer)?;
        Ok(Vec3::new(data.x, data.y, data.z))
    }
}
