//! Shadow map target and light-space transforms
//!
//! The shadow frustum is an orthographic box fit around the scene's
//! bounding sphere as seen from the light. The light sits at
//! `-2 * radius * direction`, looking at the sphere center.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::commands::{ScissorRect, Viewport};
use crate::scene::bounds::BoundingSphere;

/// Smallest sphere radius the light frustum is fit to
pub const MIN_SHADOW_RADIUS: f32 = 1.0;

/// Depth-only render target sampled by the main pass
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMap {
    size: u32,
    viewport: Viewport,
    scissor: ScissorRect,
}

impl ShadowMap {
    /// Square shadow map of `size` texels
    pub fn new(size: u32) -> Self {
        Self {
            size,
            viewport: Viewport::new(size, size),
            scissor: ScissorRect::new(size, size),
        }
    }

    /// Edge length in texels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Full-map viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Full-map scissor
    pub fn scissor(&self) -> ScissorRect {
        self.scissor
    }
}

/// Light-space matrices for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowTransforms {
    /// World to light view
    pub light_view: Mat4,
    /// Light view to light clip
    pub light_proj: Mat4,
    /// World to shadow map texture coordinates
    pub shadow_transform: Mat4,
    /// Light position in world space
    pub light_position: Vec3,
    /// Near plane in light space
    pub near_z: f32,
    /// Far plane in light space
    pub far_z: f32,
}

impl ShadowTransforms {
    /// Fit the light frustum to `bounds` for a light travelling along `light_direction`
    ///
    /// Radii below [`MIN_SHADOW_RADIUS`] (an empty scene has radius 0) are
    /// raised to it so the matrices stay finite.
    pub fn compute(light_direction: Vec3, bounds: &BoundingSphere) -> Self {
        let direction = light_direction.normalize();
        let radius = bounds.radius.max(MIN_SHADOW_RADIUS);
        let target = bounds.center;
        let mut light_position = -2.0 * radius * direction;
        if (target - light_position).norm_squared() < 1e-6 {
            light_position = target - 2.0 * radius * direction;
        }

        // a light pointing straight up or down cannot use +Y as up
        let up = if direction.cross(&Vec3::y()).norm_squared() < 1e-6 {
            Vec3::z()
        } else {
            Vec3::y()
        };
        let light_view = Mat4::view_look_at_lh(light_position, target, up);

        let center = light_view.transform_point(&target.into());
        let r = radius;
        let (left, right) = (center.x - r, center.x + r);
        let (bottom, top) = (center.y - r, center.y + r);
        let (near_z, far_z) = (center.z - r, center.z + r);

        let light_proj = Mat4::orthographic_off_center_lh(left, right, bottom, top, near_z, far_z);
        let shadow_transform = Mat4::ndc_to_texture() * light_proj * light_view;

        Self {
            light_view,
            light_proj,
            shadow_transform,
            light_position,
            near_z,
            far_z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    fn scene_sphere() -> BoundingSphere {
        BoundingSphere::new(Vec3::zeros(), (10.0_f32 * 10.0 + 15.0 * 15.0).sqrt())
    }

    #[test]
    fn test_light_sits_behind_the_scene() {
        let direction = Vec3::new(0.57735, -0.57735, 0.57735);
        let bounds = scene_sphere();
        let transforms = ShadowTransforms::compute(direction, &bounds);

        assert_relative_eq!(
            transforms.light_position,
            -2.0 * bounds.radius * direction.normalize(),
            epsilon = 1e-4
        );
        assert_relative_eq!(transforms.far_z - transforms.near_z, 2.0 * bounds.radius, epsilon = 1e-3);
    }

    #[test]
    fn test_sphere_center_maps_to_shadow_map_center() {
        let bounds = BoundingSphere::new(Vec3::new(3.0, 1.0, -2.0), 5.0);
        let transforms = ShadowTransforms::compute(Vec3::new(0.3, -1.0, 0.2), &bounds);

        let center = transforms.shadow_transform * Vec4::new(3.0, 1.0, -2.0, 1.0);
        assert_relative_eq!(center.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(center.y, 0.5, epsilon = 1e-5);
        assert_relative_eq!(center.z, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_fits_inside_texture_space() {
        let bounds = scene_sphere();
        let transforms = ShadowTransforms::compute(Vec3::new(-0.4, -0.8, 0.45), &bounds);

        let points = [
            Vec3::new(bounds.radius, 0.0, 0.0),
            Vec3::new(0.0, -bounds.radius, 0.0),
            Vec3::new(0.0, 0.0, bounds.radius),
        ];
        for point in points {
            let uv = transforms.shadow_transform * point.push(1.0);
            for value in [uv.x, uv.y, uv.z] {
                assert!((-1e-4..=1.0 + 1e-4).contains(&value), "{} outside [0,1]", value);
            }
        }
    }

    #[test]
    fn test_empty_bounds_give_finite_matrices() {
        let direction = Vec3::new(0.57735, -0.57735, 0.57735);
        let transforms = ShadowTransforms::compute(direction, &BoundingSphere::new(Vec3::zeros(), 0.0));

        assert!(transforms.light_view.iter().all(|v| v.is_finite()));
        assert!(transforms.light_proj.iter().all(|v| v.is_finite()));
        assert!(transforms.shadow_transform.iter().all(|v| v.is_finite()));
        assert_relative_eq!(transforms.far_z - transforms.near_z, 2.0 * MIN_SHADOW_RADIUS, epsilon = 1e-4);
    }

    #[test]
    fn test_light_never_sits_on_the_sphere_center() {
        let direction = Vec3::new(0.0, -1.0, 0.0);
        let bounds = BoundingSphere::new(Vec3::new(0.0, 2.0, 0.0), 1.0);
        let transforms = ShadowTransforms::compute(direction, &bounds);

        assert!(transforms.shadow_transform.iter().all(|v| v.is_finite()));
        assert_relative_eq!(transforms.light_position, Vec3::new(0.0, 4.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_vertical_light_is_not_degenerate() {
        let transforms = ShadowTransforms::compute(Vec3::new(0.0, -1.0, 0.0), &scene_sphere());
        assert!(transforms.shadow_transform.iter().all(|v| v.is_finite()));
    }
}
