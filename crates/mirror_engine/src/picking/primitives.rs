//! Ray and triangle primitives for picking
//!
//! Provides the ray type and the Möller-Trumbore ray/triangle test used by
//! the narrow phase.

use crate::foundation::math::{Mat4, Point3, Vec3};

/// A ray for picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin
    pub origin: Vec3,
    /// Direction (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray, normalizing `direction`
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Transform the ray by an affine matrix
    ///
    /// The direction is renormalized, so distances along the result are in
    /// the target space's units.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let origin = matrix.transform_point(&Point3::from(self.origin)).coords;
        let direction = matrix.transform_vector(&self.direction);
        Self::new(origin, direction)
    }
}

/// A triangle in whichever space the ray lives in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Geometric normal (clockwise front faces in a left-handed system)
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2).normalize()
    }

    /// Möller-Trumbore ray-triangle intersection
    ///
    /// Two-sided. Returns `(t, u, v)` with `t` the distance along the ray and
    /// `u`, `v` the barycentric coordinates of the hit.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        const EPSILON: f32 = 0.000001;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Parallel to the plane
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        if t >= 0.0 {
            Some((t, u, v))
        } else {
            None
        }
    }
}

impl From<[Vec3; 3]> for Triangle {
    fn from(corners: [Vec3; 3]) -> Self {
        Self::new(corners[0], corners[1], corners[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;

    fn facing_triangle() -> Triangle {
        Triangle::new(
            Vec3::new(-1.0, -1.0, 5.0),
            Vec3::new(0.0, 1.0, 5.0),
            Vec3::new(1.0, -1.0, 5.0),
        )
    }

    #[test]
    fn test_ray_hits_triangle() {
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0));
        let (t, u, v) = facing_triangle().intersect_ray(&ray).expect("hit");
        assert_relative_eq!(t, 5.0, epsilon = 1e-5);
        assert!(u >= 0.0 && v >= 0.0 && u + v <= 1.0);
    }

    #[test]
    fn test_ray_hits_back_face() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let (t, _, _) = facing_triangle().intersect_ray(&ray).expect("two-sided hit");
        assert_relative_eq!(t, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ray_misses_outside_and_behind() {
        let beside = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(facing_triangle().intersect_ray(&beside).is_none());

        let away = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
        assert!(facing_triangle().intersect_ray(&away).is_none());
    }

    #[test]
    fn test_parallel_ray_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(facing_triangle().intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_transformed_ray_renormalizes() {
        let scale = Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 2.0, 2.0));
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)).transformed(&scale);
        assert_relative_eq!(ray.origin, Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(ray.direction.norm(), 1.0, epsilon = 1e-6);

        let moved = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0))
            .transformed(&Mat4::identity().with_translation(Vec3::new(0.0, 3.0, 0.0)));
        assert_relative_eq!(moved.origin, Vec3::new(0.0, 3.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(moved.direction, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }
}
