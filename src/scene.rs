/// Visual scene: what the host renderer draws
///
/// One hecs entity per registered object. The scene holds visual-unit
/// transforms only; the simulation loop writes them from body poses every
/// tick. Rendering itself is the host's job through the `Renderer` trait.

use glam::{Mat4, Quat, Vec3};
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::assembly::{ObjectId, ObjectKind, SceneObject};
use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::mesh::{bounds_of, Geometry};
use crate::ray::Ray;
use crate::scale::TransformBridge;

/// Transform component for positioning objects in 3D space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn from_pose(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Get the model matrix for this transform
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Fixture,
    Component,
    /// Component with at least one satisfied link
    ComponentLinked,
    DebugFixture,
    DebugComponent,
    DebugComponentLinked,
}

impl Material {
    fn for_object(kind: ObjectKind, linked: bool, debug: bool) -> Self {
        match (kind, linked, debug) {
            (ObjectKind::Fixture, _, false) => Material::Fixture,
            (ObjectKind::Fixture, _, true) => Material::DebugFixture,
            (ObjectKind::Component, false, false) => Material::Component,
            (ObjectKind::Component, true, false) => Material::ComponentLinked,
            (ObjectKind::Component, false, true) => Material::DebugComponent,
            (ObjectKind::Component, true, true) => Material::DebugComponentLinked,
        }
    }

    pub fn is_debug(self) -> bool {
        matches!(
            self,
            Material::DebugFixture | Material::DebugComponent | Material::DebugComponentLinked
        )
    }
}

/// Visual representation component
#[derive(Debug, Clone)]
pub struct Visual {
    pub object: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    pub material: Material,
    /// Geometry drawn for the object, in its local frame
    pub meshes: Vec<Geometry>,
    /// Local bounds of `meshes`, used as the picking broadphase
    bounds: Option<(Vec3, Vec3)>,
}

/// Nearest object hit by a pick ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub object: ObjectId,
    pub distance: f32,
}

/// Render data extracted from the scene for a frame
#[derive(Debug, Default)]
pub struct RenderBatch {
    pub entities: Vec<RenderEntity>,
}

/// A single object to render
#[derive(Debug, Clone)]
pub struct RenderEntity {
    pub object: ObjectId,
    pub model_matrix: Mat4,
    pub material: Material,
    /// Distance from camera (for sorting)
    pub distance_from_camera: f32,
}

impl RenderBatch {
    /// Sort entities front to back
    pub fn sort(&mut self) {
        self.entities.sort_by(|a, b| {
            a.distance_from_camera
                .partial_cmp(&b.distance_from_camera)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Host-side drawing of a render batch
pub trait Renderer {
    fn render(&mut self, batch: &RenderBatch, camera: &Camera);

    fn resize(&mut self, width: u32, height: u32);
}

pub struct VisualScene {
    world: World,
    entities: HashMap<ObjectId, Entity>,
}

impl VisualScene {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            entities: HashMap::new(),
        }
    }

    /// Add an object at its initial pose. With `debug_shapes` set the
    /// collision boxes are drawn instead of the meshes.
    pub fn register(&mut self, object: &SceneObject, render: &RenderConfig, bridge: &TransformBridge) {
        let meshes = if render.debug_shapes {
            object
                .shapes
                .iter()
                .enumerate()
                .map(|(i, shape)| {
                    Geometry::cuboid(
                        format!("{}_box{i}", object.name),
                        bridge.to_visual(shape.half_extents),
                        bridge.to_visual(shape.offset),
                        shape.orientation,
                    )
                })
                .collect()
        } else {
            object.meshes.clone()
        };

        let visual = Visual {
            object: object.id,
            name: object.name.clone(),
            kind: object.kind,
            material: Material::for_object(object.kind, false, render.debug_shapes),
            bounds: bounds_of(&meshes),
            meshes,
        };
        let transform = Transform::from_pose(object.position, object.rotation);

        let entity = self.world.spawn((transform, visual));
        if let Some(previous) = self.entities.insert(object.id, entity) {
            let _ = self.world.despawn(previous);
        }
    }

    /// Despawn every registered object
    pub fn clear(&mut self) {
        self.world.clear();
        self.entities.clear();
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn transform(&self, id: ObjectId) -> Option<Transform> {
        let entity = *self.entities.get(&id)?;
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    pub fn set_transform(&mut self, id: ObjectId, position: Vec3, rotation: Quat) -> bool {
        let Some(&entity) = self.entities.get(&id) else {
            return false;
        };
        match self.world.get::<&mut Transform>(entity) {
            Ok(mut transform) => {
                transform.position = position;
                transform.rotation = rotation;
                true
            }
            Err(_) => false,
        }
    }

    pub fn material(&self, id: ObjectId) -> Option<Material> {
        let entity = *self.entities.get(&id)?;
        self.world.get::<&Visual>(entity).ok().map(|v| v.material)
    }

    /// Switch a component between its linked and unlinked look
    pub fn set_linked(&mut self, id: ObjectId, linked: bool) {
        let Some(&entity) = self.entities.get(&id) else {
            return;
        };
        if let Ok(mut visual) = self.world.get::<&mut Visual>(entity) {
            let debug = visual.material.is_debug();
            visual.material = Material::for_object(visual.kind, linked, debug);
        }
    }

    /// Nearest component whose geometry the ray crosses within `max_distance`
    pub fn pick(&self, ray: &Ray, max_distance: f32) -> Option<PickHit> {
        let mut best: Option<PickHit> = None;

        for (_entity, (transform, visual)) in self.world.query::<(&Transform, &Visual)>().iter() {
            if !visual.kind.is_component() {
                continue;
            }
            let Some((min, max)) = visual.bounds else {
                continue;
            };

            let local = ray.to_local(transform.position, transform.rotation);
            let limit = best.map_or(max_distance, |hit| hit.distance.min(max_distance));
            match local.intersects_aabb(min, max) {
                Some(t) if t <= limit => {}
                _ => continue,
            }

            let nearest = visual
                .meshes
                .iter()
                .flat_map(|geometry| (0..geometry.triangles.len()).map(move |i| geometry.triangle(i)))
                .filter_map(|triangle| local.intersects_triangle(triangle))
                .fold(None, |acc: Option<f32>, t| Some(acc.map_or(t, |a| a.min(t))));

            if let Some(distance) = nearest {
                if distance <= limit {
                    best = Some(PickHit {
                        object: visual.object,
                        distance,
                    });
                }
            }
        }

        best
    }

    /// Everything visible, sorted front to back
    pub fn extract_render_batch(&self, camera: &Camera) -> RenderBatch {
        let eye = camera.position();
        let mut batch = RenderBatch {
            entities: self
                .world
                .query::<(&Transform, &Visual)>()
                .iter()
                .map(|(_entity, (transform, visual))| RenderEntity {
                    object: visual.object,
                    model_matrix: transform.model_matrix(),
                    material: visual.material,
                    distance_from_camera: transform.position.distance(eye),
                })
                .collect(),
        };
        batch.sort();
        batch
    }
}

impl Default for VisualScene {
    fn default() -> Self {
        Self::new()
    }
}
