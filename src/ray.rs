use glam::{Mat4, Quat, Vec2, Vec3};

/// Ray for picking and plane projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Ray through a screen position (pixels, origin top-left)
    pub fn from_screen(screen: Vec2, viewport: Vec2, view_matrix: Mat4, proj_matrix: Mat4) -> Self {
        // Normalize screen coordinates to NDC (-1 to 1), Y up
        let ndc_x = (2.0 * screen.x) / viewport.x - 1.0;
        let ndc_y = 1.0 - (2.0 * screen.y) / viewport.y;

        // Unproject onto the near and far planes
        let inv = (proj_matrix * view_matrix).inverse();
        let near = inv.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inv.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));

        Self::new(near, far - near)
    }

    /// Ray along a tracked pose's forward axis (-Z)
    pub fn from_pose(position: Vec3, orientation: Quat) -> Self {
        Self::new(position, orientation * Vec3::NEG_Z)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Same ray expressed in the frame of a rigid transform
    pub fn to_local(&self, position: Vec3, rotation: Quat) -> Self {
        let inverse = rotation.inverse();
        Self {
            origin: inverse * (self.origin - position),
            direction: inverse * self.direction,
        }
    }

    /// Entry distance into an axis-aligned bounding box
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut tmin = 0.0_f32;
        let mut tmax = f32::INFINITY;

        for axis in 0..3 {
            let (origin, direction) = (self.origin[axis], self.direction[axis]);
            if direction == 0.0 {
                // Parallel to this slab: either always inside it or never
                if origin < min[axis] || origin > max[axis] {
                    return None;
                }
                continue;
            }

            let inv = direction.recip();
            let t1 = (min[axis] - origin) * inv;
            let t2 = (max[axis] - origin) * inv;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
            if tmax < tmin {
                return None;
            }
        }

        Some(tmin)
    }

    /// Two-sided ray/triangle hit distance (Moller-Trumbore)
    pub fn intersects_triangle(&self, [a, b, c]: [Vec3; 3]) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < 1e-8 {
            return None; // Ray is parallel to triangle
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }

    /// Project ray onto a plane (returns intersection point)
    pub fn project_onto_plane(&self, plane_center: Vec3, plane_normal: Vec3) -> Option<Vec3> {
        let denom = plane_normal.dot(self.direction);
        if denom.abs() < 1e-6 {
            return None; // Ray is parallel to plane
        }

        let t = (plane_center - self.origin).dot(plane_normal) / denom;
        if t < 0.0 {
            return None; // Intersection is behind the ray
        }

        Some(self.at(t))
    }
}
