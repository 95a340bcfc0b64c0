/// Assembly files: an OBJ with named groups plus a JSON description that
/// sorts those groups into fixtures and components and lists linked pairs.
///
/// ```json
/// {
///   "fixtures":   { "base": { "meshes": ["base"], "bodies": ["base_box"] } },
///   "components": { "peg":  { "meshes": ["peg"],  "bodies": ["peg_box"] } },
///   "links": [["base", "peg"]]
/// }
/// ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{Assembly, AssemblyBuilder, ObjectKind};
use crate::error::AssemblyError;
use crate::mesh::{load_obj_geometries, Geometry};
use crate::scale::TransformBridge;

/// Name tobj gives to groups without an `o`/`g` line
const UNNAMED_GROUP: &str = "unnamed_object";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDescription {
    #[serde(default)]
    pub meshes: Vec<String>,
    #[serde(default)]
    pub bodies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyDescription {
    #[serde(default)]
    pub fixtures: BTreeMap<String, ObjectDescription>,
    #[serde(default)]
    pub components: BTreeMap<String, ObjectDescription>,
    #[serde(default)]
    pub links: Vec<Vec<String>>,
}

impl AssemblyDescription {
    pub fn from_json(json: &str) -> Result<Self, AssemblyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve against named geometries and build the assembly.
    ///
    /// Fixtures are registered before components, each in name order.
    pub fn build(&self, geometries: Vec<Geometry>, bridge: &TransformBridge) -> Result<Assembly, AssemblyError> {
        let library = index_geometries(geometries)?;
        let resolve = |names: &[String]| -> Result<Vec<Geometry>, AssemblyError> {
            names
                .iter()
                .map(|name| {
                    library
                        .get(name)
                        .cloned()
                        .ok_or_else(|| AssemblyError::UnknownGeometry(name.clone()))
                })
                .collect()
        };

        let mut builder = AssemblyBuilder::new();
        let groups = [
            (ObjectKind::Fixture, &self.fixtures),
            (ObjectKind::Component, &self.components),
        ];
        for (kind, objects) in groups {
            for (name, description) in objects {
                builder = builder.object(
                    name.clone(),
                    kind,
                    resolve(description.meshes.as_slice())?,
                    resolve(description.bodies.as_slice())?,
                );
            }
        }

        for pair in &self.links {
            match pair.as_slice() {
                [a, b] => builder = builder.link(a.clone(), b.clone()),
                other => return Err(AssemblyError::LinkArity(other.len())),
            }
        }

        builder.build(bridge)
    }
}

/// Key geometries by name, rejecting unnamed and duplicate groups
fn index_geometries(geometries: Vec<Geometry>) -> Result<HashMap<String, Geometry>, AssemblyError> {
    let mut library = HashMap::with_capacity(geometries.len());
    for geometry in geometries {
        if geometry.name.is_empty() || geometry.name == UNNAMED_GROUP {
            return Err(AssemblyError::UnnamedGeometry);
        }
        if library.contains_key(&geometry.name) {
            return Err(AssemblyError::DuplicateGeometry(geometry.name));
        }
        library.insert(geometry.name.clone(), geometry);
    }
    Ok(library)
}

/// Build an assembly from an OBJ stream and its JSON description
pub fn load<R: BufRead>(
    obj: &mut R,
    description: &AssemblyDescription,
    bridge: &TransformBridge,
) -> Result<Assembly, AssemblyError> {
    let geometries = load_obj_geometries(obj)?;
    description.build(geometries, bridge)
}

/// Build an assembly from an OBJ file and a JSON description file
pub fn load_files(
    obj_path: impl AsRef<Path>,
    description_path: impl AsRef<Path>,
    bridge: &TransformBridge,
) -> Result<Assembly, AssemblyError> {
    let (obj_path, description_path) = (obj_path.as_ref(), description_path.as_ref());
    let description = AssemblyDescription::from_json(&std::fs::read_to_string(description_path)?)?;
    let mut reader = BufReader::new(File::open(obj_path)?);
    let assembly = load(&mut reader, &description, bridge)?;
    tracing::info!(
        "read {} objects from {} and {}",
        assembly.len(),
        obj_path.display(),
        description_path.display()
    );
    Ok(assembly)
}
