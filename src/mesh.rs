use glam::{Quat, Vec3};
use std::io::BufRead;

/// Named triangle geometry in visual units
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl Geometry {
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            name: name.into(),
            positions,
            triangles,
        }
    }

    /// Box with 8 shared corners and 12 triangles
    pub fn cuboid(name: impl Into<String>, half_extents: Vec3, center: Vec3, rotation: Quat) -> Self {
        // Corner i has +x when bit 0 is set, +y for bit 1, +z for bit 2
        let positions = (0..8)
            .map(|i| {
                let sign = Vec3::new(
                    if i & 1 != 0 { 1.0 } else { -1.0 },
                    if i & 2 != 0 { 1.0 } else { -1.0 },
                    if i & 4 != 0 { 1.0 } else { -1.0 },
                );
                center + rotation * (sign * half_extents)
            })
            .collect();

        let triangles = vec![
            [0, 4, 6], [0, 6, 2], // -X
            [1, 3, 7], [1, 7, 5], // +X
            [0, 1, 5], [0, 5, 4], // -Y
            [2, 6, 7], [2, 7, 3], // +Y
            [0, 2, 3], [0, 3, 1], // -Z
            [4, 5, 7], [4, 7, 6], // +Z
        ];

        Self::new(name, positions, triangles)
    }

    /// Axis-aligned bounds as (min, max)
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
        )
    }

    pub fn translate(&mut self, offset: Vec3) {
        for p in &mut self.positions {
            *p += offset;
        }
    }

    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }
}

/// Combined bounds of several geometries
pub fn bounds_of<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Option<(Vec3, Vec3)> {
    geometries
        .into_iter()
        .filter_map(Geometry::bounding_box)
        .reduce(|(amin, amax), (bmin, bmax)| (amin.min(bmin), amax.max(bmax)))
}

/// Parse every group of an OBJ stream into a named geometry.
///
/// Material libraries are not followed.
pub fn load_obj_geometries<R: BufRead>(reader: &mut R) -> Result<Vec<Geometry>, tobj::LoadError> {
    let (models, _materials) = tobj::load_obj_buf(
        reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )?;

    Ok(models
        .into_iter()
        .map(|model| {
            let mesh = &model.mesh;
            let positions = mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect();
            let triangles = mesh
                .indices
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .collect();
            Geometry::new(model.name, positions, triangles)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_cuboid_bounds() {
        let cube = Geometry::cuboid("cube", Vec3::new(1.0, 0.5, 0.25), Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY);
        assert_eq!(cube.positions.len(), 8);
        assert_eq!(cube.triangles.len(), 12);
        let (min, max) = cube.bounding_box().unwrap();
        assert_eq!(min, Vec3::new(1.0, -0.5, -0.25));
        assert_eq!(max, Vec3::new(3.0, 0.5, 0.25));
    }

    #[test]
    fn test_bounds_of_many() {
        let a = Geometry::cuboid("a", Vec3::ONE, Vec3::ZERO, Quat::IDENTITY);
        let b = Geometry::cuboid("b", Vec3::ONE, Vec3::new(4.0, 0.0, 0.0), Quat::IDENTITY);
        let (min, max) = bounds_of([&a, &b]).unwrap();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(5.0, 1.0, 1.0));
        assert!(bounds_of(std::iter::empty()).is_none());
    }

    #[test]
    fn test_load_obj_groups() {
        let obj = "\
o plate
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
o peg
v 0 0 1
v 1 0 1
v 0 1 1
f 5 6 7
";
        let geometries = load_obj_geometries(&mut Cursor::new(obj)).unwrap();
        assert_eq!(geometries.len(), 2);
        assert_eq!(geometries[0].name, "plate");
        assert_eq!(geometries[0].triangles.len(), 2);
        assert_eq!(geometries[1].name, "peg");
        assert_eq!(geometries[1].positions.len(), 3);
    }
}
