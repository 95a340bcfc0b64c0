/// Collision shape inference from triangle geometry
///
/// Recognizes closed boxes at any orientation and falls back to the
/// axis-aligned bounding box for everything else.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, PI};

use crate::mesh::Geometry;
use crate::scale::TransformBridge;

/// Vertices closer than this are merged before analysis
const MERGE_PRECISION: f32 = 1e4;
const ANGLE_EPSILON: f32 = 0.01;

/// Oriented box collider in simulation units, relative to the owning body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeSpec {
    pub half_extents: Vec3,
    pub offset: Vec3,
    pub orientation: Quat,
}

impl ShapeSpec {
    /// Box corners in the owning body's frame
    pub fn corners(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sign = Vec3::new(
                if i & 1 != 0 { 1.0 } else { -1.0 },
                if i & 2 != 0 { 1.0 } else { -1.0 },
                if i & 4 != 0 { 1.0 } else { -1.0 },
            );
            *corner = self.offset + self.orientation * (sign * self.half_extents);
        }
        corners
    }
}

/// Infer a box collider for `geometry`, converted into simulation units.
///
/// Returns `None` for geometry without vertices.
pub fn shape_from_geometry(geometry: &Geometry, bridge: &TransformBridge) -> Option<ShapeSpec> {
    let (vertices, triangles) = merge_vertices(geometry);
    let first = *vertices.first()?;
    let (min, max) = vertices
        .iter()
        .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let center = (min + max) * 0.5;

    if let Some(edges) = detect_box(&vertices, &triangles) {
        let half_extents = Vec3::new(edges[0].length(), edges[1].length(), edges[2].length()) * 0.5;
        let x_axis = edges[0].normalize();
        let y_axis = edges[1].normalize();
        let align_x = Quat::from_rotation_arc(Vec3::X, x_axis);
        // Second edge is perpendicular to the first, so spin about it
        let rotated_y = align_x * Vec3::Y;
        let spin = rotated_y.cross(y_axis).dot(x_axis).atan2(rotated_y.dot(y_axis));
        let align_y = Quat::from_axis_angle(x_axis, spin);

        return Some(ShapeSpec {
            half_extents: bridge.to_sim(half_extents),
            offset: bridge.to_sim(center),
            orientation: (align_y * align_x).normalize(),
        });
    }

    Some(ShapeSpec {
        half_extents: bridge.to_sim((max - min) * 0.5),
        offset: bridge.to_sim(center),
        orientation: Quat::IDENTITY,
    })
}

/// Collapse coincident vertices and drop triangles that degenerate as a result
fn merge_vertices(geometry: &Geometry) -> (Vec<Vec3>, Vec<[usize; 3]>) {
    let mut lookup: HashMap<[i64; 3], usize> = HashMap::new();
    let mut vertices = Vec::new();
    let mut remap = Vec::with_capacity(geometry.positions.len());

    for p in &geometry.positions {
        let key = [
            (p.x * MERGE_PRECISION).round() as i64,
            (p.y * MERGE_PRECISION).round() as i64,
            (p.z * MERGE_PRECISION).round() as i64,
        ];
        let index = *lookup.entry(key).or_insert_with(|| {
            vertices.push(*p);
            vertices.len() - 1
        });
        remap.push(index);
    }

    let triangles = geometry
        .triangles
        .iter()
        .filter_map(|t| {
            let [a, b, c] = t.map(|i| remap.get(i as usize).copied());
            let (a, b, c) = (a?, b?, c?);
            (a != b && b != c && a != c).then_some([a, b, c])
        })
        .collect();

    (vertices, triangles)
}

/// Edge vectors of a box from its first corner, ordered to match X, Y, Z as
/// closely as possible and pointing along the positive axes.
fn detect_box(vertices: &[Vec3], triangles: &[[usize; 3]]) -> Option<[Vec3; 3]> {
    if vertices.len() != 8 {
        return None;
    }

    // Every corner of a box sees three right angles worth of faces
    let mut corner_sums = [0.0f32; 8];
    let mut touched = [false; 8];
    for tri in triangles {
        for k in 0..3 {
            let a = tri[k];
            let b = tri[(k + 1) % 3];
            let c = tri[(k + 2) % 3];
            corner_sums[a] += (vertices[b] - vertices[a]).angle_between(vertices[c] - vertices[a]);
            touched[a] = true;
        }
    }
    let is_box = touched.iter().all(|t| *t)
        && corner_sums
            .iter()
            .all(|sum| (sum - 3.0 * PI / 2.0).abs() < ANGLE_EPSILON);
    if !is_box {
        return None;
    }

    let origin = vertices[0];
    let diffs: Vec<Vec3> = vertices[1..].iter().map(|v| *v - origin).collect();
    let right_angle = |a: Vec3, b: Vec3| (a.angle_between(b) - FRAC_PI_2).abs() < ANGLE_EPSILON;

    // The three edges are the only mutually perpendicular triple among the
    // other corners' offsets (diagonals never are)
    let mut edges = None;
    'search: for i in 0..diffs.len() {
        for j in i + 1..diffs.len() {
            if !right_angle(diffs[i], diffs[j]) {
                continue;
            }
            for k in j + 1..diffs.len() {
                if right_angle(diffs[i], diffs[k]) && right_angle(diffs[j], diffs[k]) {
                    edges = Some([diffs[i], diffs[j], diffs[k]]);
                    break 'search;
                }
            }
        }
    }
    let mut remaining: Vec<Vec3> = edges?.to_vec();

    let mut ordered = [Vec3::ZERO; 3];
    for (slot, axis) in [Vec3::X, Vec3::Y, Vec3::Z].into_iter().enumerate() {
        let (best, _) = remaining
            .iter()
            .enumerate()
            .map(|(i, e)| (i, e.normalize().dot(axis).abs()))
            .fold((0, f32::MIN), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        let edge = remaining.swap_remove(best);
        ordered[slot] = if edge.dot(axis) < 0.0 { -edge } else { edge };
    }

    Some(ordered)
}
