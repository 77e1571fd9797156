//! Bounding volumes

use crate::foundation::math::{Mat4, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create from corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create centered at a point with given half-size
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box containing every point, `None` for an empty set
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, point| aabb.expanded(point)))
    }

    /// Box grown to include `point`
    pub fn expanded(&self, point: Vec3) -> Self {
        Self {
            min: self.min.inf(&point),
            max: self.max.sup(&point),
        }
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-size
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Box enclosing this box after transformation by `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = self.corners();
        let moved = corners
            .iter()
            .map(|corner| matrix.transform_point(&(*corner).into()).coords);
        Self::from_points(moved).unwrap_or(*self)
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Slab test against a ray
    ///
    /// Returns the entry distance along `ray_dir` (0 when the origin is
    /// inside the box).
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray_dir.x != 0.0 { 1.0 / ray_dir.x } else { f32::INFINITY },
            if ray_dir.y != 0.0 { 1.0 / ray_dir.y } else { f32::INFINITY },
            if ray_dir.z != 0.0 { 1.0 / ray_dir.z } else { f32::INFINITY },
        );

        let t1 = (self.min.x - ray_origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray_origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray_origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray_origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray_origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray_origin.z) * inv_dir.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere circumscribing a box
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self {
            center: aabb.center(),
            radius: aabb.extents().magnitude(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_ray_hits_box_face() {
        let hit = unit_box().intersect_ray(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(hit.unwrap(), 4.0);
    }

    #[test]
    fn test_ray_misses_box() {
        let miss = unit_box().intersect_ray(Vec3::new(3.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(miss.is_none());
    }

    #[test]
    fn test_ray_pointing_away_misses() {
        let miss = unit_box().intersect_ray(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(miss.is_none());
    }

    #[test]
    fn test_origin_inside_box_hits_at_zero() {
        let hit = unit_box().intersect_ray(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(hit, Some(0.0));
    }

    #[test]
    fn test_transformed_box_encloses_rotated_corners() {
        let rotation = Mat4::rotation_axis(&Vec3::y(), std::f32::consts::FRAC_PI_4);
        let rotated = unit_box().transformed(&rotation);
        let half_diagonal = 2.0_f32.sqrt();
        assert_relative_eq!(rotated.max.x, half_diagonal, epsilon = 1e-5);
        assert_relative_eq!(rotated.max.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_from_box() {
        let sphere = BoundingSphere::from_aabb(&unit_box());
        assert_relative_eq!(sphere.radius, 3.0_f32.sqrt());
        assert_relative_eq!(sphere.center, Vec3::zeros());
    }
}
