/// Assemblies: fixtures, components and the links between them
///
/// Objects live in one arena indexed by `ObjectId`; the kind tag decides
/// whether an object can move. Links refer to objects by id.

mod link;
pub mod loader;

pub use link::{Link, LinkId, LinkTolerance};
pub use loader::{AssemblyDescription, ObjectDescription};

use glam::{Quat, Vec3};
use std::collections::{HashMap, HashSet};

use crate::error::AssemblyError;
use crate::mesh::{bounds_of, Geometry};
use crate::scale::TransformBridge;
use crate::shape::{shape_from_geometry, ShapeSpec};

/// Index of an object inside its assembly
pub type ObjectId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Immovable
    Fixture,
    /// Movable by the user
    Component,
}

impl ObjectKind {
    pub fn is_component(self) -> bool {
        self == ObjectKind::Component
    }
}

/// A fixture or component as loaded
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,

    /// Initial world position, the center of the mesh bounds (visual units)
    pub position: Vec3,
    pub rotation: Quat,

    /// Render meshes, relative to `position`
    pub meshes: Vec<Geometry>,

    /// Collision boxes in simulation units
    pub shapes: Vec<ShapeSpec>,

    /// Links this object participates in, in creation order
    pub links: Vec<LinkId>,
}

/// Aggregate root handed to the engine on load
#[derive(Debug, Clone)]
pub struct Assembly {
    objects: Vec<SceneObject>,
    links: Vec<Link>,
    by_name: HashMap<String, ObjectId>,
}

impl Assembly {
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn find(&self, name: &str) -> Option<&SceneObject> {
        self.by_name.get(name).and_then(|id| self.objects.get(*id))
    }

    pub fn fixtures(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|o| o.kind == ObjectKind::Fixture)
    }

    pub fn components(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|o| o.kind == ObjectKind::Component)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

struct PendingObject {
    name: String,
    kind: ObjectKind,
    meshes: Vec<Geometry>,
    bodies: Vec<Geometry>,
}

/// Validating constructor for assemblies
#[derive(Default)]
pub struct AssemblyBuilder {
    objects: Vec<PendingObject>,
    links: Vec<(String, String)>,
}

impl AssemblyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixture(self, name: impl Into<String>, meshes: Vec<Geometry>, bodies: Vec<Geometry>) -> Self {
        self.object(name, ObjectKind::Fixture, meshes, bodies)
    }

    pub fn component(self, name: impl Into<String>, meshes: Vec<Geometry>, bodies: Vec<Geometry>) -> Self {
        self.object(name, ObjectKind::Component, meshes, bodies)
    }

    pub fn object(
        mut self,
        name: impl Into<String>,
        kind: ObjectKind,
        meshes: Vec<Geometry>,
        bodies: Vec<Geometry>,
    ) -> Self {
        self.objects.push(PendingObject {
            name: name.into(),
            kind,
            meshes,
            bodies,
        });
        self
    }

    pub fn link(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.links.push((a.into(), b.into()));
        self
    }

    /// Resolve names, center geometry, infer collision shapes and create links.
    pub fn build(self, bridge: &TransformBridge) -> Result<Assembly, AssemblyError> {
        let mut objects = Vec::with_capacity(self.objects.len());
        let mut by_name = HashMap::new();

        for (id, pending) in self.objects.into_iter().enumerate() {
            if by_name.insert(pending.name.clone(), id).is_some() {
                return Err(AssemblyError::DuplicateObject(pending.name));
            }
            objects.push(place_object(id, pending, bridge)?);
        }

        let mut links = Vec::with_capacity(self.links.len());
        let mut linked_pairs = HashSet::new();
        for (name_a, name_b) in self.links {
            let a = *by_name
                .get(&name_a)
                .ok_or_else(|| AssemblyError::UnknownObject(name_a.clone()))?;
            let b = *by_name
                .get(&name_b)
                .ok_or_else(|| AssemblyError::UnknownObject(name_b.clone()))?;

            if a == b {
                return Err(AssemblyError::SelfLink(name_a));
            }
            if !objects[a].kind.is_component() && !objects[b].kind.is_component() {
                return Err(AssemblyError::FixtureLink(name_a, name_b));
            }
            if !linked_pairs.insert((a.min(b), a.max(b))) {
                return Err(AssemblyError::AlreadyLinked(name_a, name_b));
            }

            let link_id = links.len();
            links.push(Link::between(link_id, &objects[a], &objects[b]));
            objects[a].links.push(link_id);
            objects[b].links.push(link_id);
        }

        tracing::debug!(
            "built assembly: {} objects, {} links",
            objects.len(),
            links.len()
        );

        Ok(Assembly {
            objects,
            links,
            by_name,
        })
    }
}

/// Center an object's geometry on its mesh bounds and infer its shapes
fn place_object(id: ObjectId, pending: PendingObject, bridge: &TransformBridge) -> Result<SceneObject, AssemblyError> {
    let PendingObject {
        name,
        kind,
        mut meshes,
        mut bodies,
    } = pending;

    let (min, max) = bounds_of(&meshes).ok_or_else(|| AssemblyError::MissingMeshes(name.clone()))?;
    if bodies.iter().all(|g| g.positions.is_empty()) {
        return Err(AssemblyError::MissingBodies(name));
    }

    let position = (min + max) * 0.5;
    for geometry in meshes.iter_mut().chain(bodies.iter_mut()) {
        geometry.translate(-position);
    }

    let shapes = bodies
        .iter()
        .filter_map(|geometry| shape_from_geometry(geometry, bridge))
        .collect();

    Ok(SceneObject {
        id,
        name,
        kind,
        position,
        rotation: Quat::IDENTITY,
        meshes,
        shapes,
        links: Vec::new(),
    })
}
