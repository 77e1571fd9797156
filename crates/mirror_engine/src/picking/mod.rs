//! Screen-space picking
//!
//! Resolves a pixel to a render item by casting a ray from the eye through
//! that pixel. The ray is built in view space from the projection's
//! diagonal terms, carried into each candidate's object space, rejected
//! early against the submesh bounds, then tested triangle by triangle.
//!
//! # Hit resolution
//!
//! [`PickMode::FirstHit`] returns the first item that intersects, walking
//! layers in order and items in insertion order, and within that item the
//! first triangle in index order. It does not look for the closest item.
//! [`PickMode::Nearest`] scans everything and keeps the hit closest to the
//! eye.

pub mod manipulator;
pub mod primitives;

pub use manipulator::{DragMode, Manipulator, TransformSpace};
pub use primitives::{Ray, Triangle};

use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::render::camera::Camera;
use crate::scene::{RenderItemId, RenderLayer, Scene};

/// How competing hits are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickMode {
    /// First intersecting item in layer order
    #[default]
    FirstHit,
    /// Intersection closest to the eye
    Nearest,
}

/// A successful pick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Item under the cursor
    pub item: RenderItemId,
    /// Triangle of the item's submesh that was hit
    pub triangle: u32,
    /// World-space point of intersection
    pub point: Vec3,
    /// World-space distance from the eye to `point`
    pub distance: f32,
}

/// Resolves screen coordinates to render items
#[derive(Debug, Clone)]
pub struct PickingEngine {
    width: u32,
    height: u32,
    mode: PickMode,
    layers: Vec<RenderLayer>,
}

impl PickingEngine {
    /// Picking over a `width` x `height` client area, opaque then reflective items
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mode: PickMode::default(),
            layers: vec![RenderLayer::Opaque, RenderLayer::Reflective],
        }
    }

    /// Builder form of [`PickingEngine::set_mode`]
    pub fn with_mode(mut self, mode: PickMode) -> Self {
        self.mode = mode;
        self
    }

    /// Change hit resolution
    pub fn set_mode(&mut self, mode: PickMode) {
        self.mode = mode;
    }

    /// Current hit resolution
    pub fn mode(&self) -> PickMode {
        self.mode
    }

    /// Layers searched, in order
    pub fn set_layers(&mut self, layers: Vec<RenderLayer>) {
        self.layers = layers;
    }

    /// Layers searched, in order
    pub fn layers(&self) -> &[RenderLayer] {
        &self.layers
    }

    /// Track a new client area size
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// View-space ray through pixel `(x, y)`
    ///
    /// The origin is the eye; the direction has a z of one.
    pub fn view_ray(&self, camera: &Camera, x: f32, y: f32) -> Ray {
        let proj = camera.projection_matrix();
        let vx = (2.0 * x / self.width as f32 - 1.0) / proj[(0, 0)];
        let vy = (-2.0 * y / self.height as f32 + 1.0) / proj[(1, 1)];
        Ray::new(Vec3::zeros(), Vec3::new(vx, vy, 1.0))
    }

    /// World-space ray through pixel `(x, y)`
    pub fn world_ray(&self, camera: &Camera, x: f32, y: f32) -> Option<Ray> {
        let inv_view = camera.view_matrix().try_inverse()?;
        Some(self.view_ray(camera, x, y).transformed(&inv_view))
    }

    /// Item under pixel `(x, y)`, if any
    pub fn pick(&self, scene: &Scene, camera: &Camera, x: f32, y: f32) -> Option<PickHit> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let Some(inv_view) = camera.view_matrix().try_inverse() else {
            log::warn!("Camera view matrix is singular; nothing picked");
            return None;
        };
        let view_ray = self.view_ray(camera, x, y);
        let eye = camera.position();

        let mut nearest: Option<PickHit> = None;
        for &layer in &self.layers {
            for &id in scene.layer(layer) {
                let Some(hit) = self.pick_item(scene, id, &view_ray, &inv_view, eye) else {
                    continue;
                };
                match self.mode {
                    PickMode::FirstHit => {
                        log::debug!("Picked item {:?} at triangle {}", id, hit.triangle);
                        return Some(hit);
                    }
                    PickMode::Nearest => {
                        if nearest.map_or(true, |best| hit.distance < best.distance) {
                            nearest = Some(hit);
                        }
                    }
                }
            }
        }

        if let Some(hit) = &nearest {
            log::debug!("Picked nearest item {:?} at distance {}", hit.item, hit.distance);
        }
        nearest
    }

    fn pick_item(&self, scene: &Scene, id: RenderItemId, view_ray: &Ray, inv_view: &Mat4, eye: Vec3) -> Option<PickHit> {
        let item = scene.item(id)?;
        let mesh = scene.mesh(item.mesh)?;
        let world = *item.world();
        let inv_world = world.try_inverse()?;

        let ray = view_ray.transformed(&(inv_world * inv_view));
        item.submesh.bounds.intersect_ray(ray.origin, ray.direction)?;

        let mut best: Option<(u32, f32)> = None;
        for (index, corners) in mesh.triangles(&item.submesh).enumerate() {
            let Some((t, _, _)) = Triangle::from(corners).intersect_ray(&ray) else {
                continue;
            };
            let index = index as u32;
            match self.mode {
                PickMode::FirstHit => {
                    best = Some((index, t));
                    break;
                }
                PickMode::Nearest => {
                    if best.map_or(true, |(_, closest)| t < closest) {
                        best = Some((index, t));
                    }
                }
            }
        }

        let (triangle, t) = best?;
        let point = world.transform_point(&Point3::from(ray.point_at(t))).coords;
        Some(PickHit {
            item: id,
            triangle,
            point,
            distance: (point - eye).norm(),
        })
    }
}
