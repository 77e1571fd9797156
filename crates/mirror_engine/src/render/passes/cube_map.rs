//! Dynamic cube map target
//!
//! Six array slices of one color texture plus a shared depth buffer. The
//! scene is drawn once per face from the center of the reflective object.

use crate::foundation::math::Vec3;
use crate::render::camera::{cube_face_cameras, Camera};
use crate::render::commands::{ScissorRect, Viewport};

/// Number of faces in a cube map
pub const CUBE_FACE_COUNT: usize = 6;

/// Render target for the dynamic environment map
#[derive(Debug, Clone)]
pub struct CubeMapTarget {
    size: u32,
    viewport: Viewport,
    scissor: ScissorRect,
    center: Vec3,
    cameras: [Camera; CUBE_FACE_COUNT],
}

impl CubeMapTarget {
    /// Cube map with `size` x `size` faces rendered from `center`
    pub fn new(size: u32, center: Vec3) -> Self {
        Self {
            size,
            viewport: Viewport::new(size, size),
            scissor: ScissorRect::new(size, size),
            center,
            cameras: cube_face_cameras(center),
        }
    }

    /// Move the capture point; the face cameras follow
    pub fn set_center(&mut self, center: Vec3) {
        if center != self.center {
            self.center = center;
            self.cameras = cube_face_cameras(center);
        }
    }

    /// Capture point
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Face edge length in texels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Camera rendering face `face`
    pub fn camera(&self, face: usize) -> Option<&Camera> {
        self.cameras.get(face)
    }

    /// All six face cameras in slice order
    pub fn cameras(&self) -> &[Camera; CUBE_FACE_COUNT] {
        &self.cameras
    }

    /// Per-face viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Per-face scissor
    pub fn scissor(&self) -> ScissorRect {
        self.scissor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_moving_center_moves_cameras() {
        let mut cube = CubeMapTarget::new(512, Vec3::zeros());
        cube.set_center(Vec3::new(0.0, 2.0, 0.0));

        for camera in cube.cameras() {
            assert_relative_eq!(camera.position(), Vec3::new(0.0, 2.0, 0.0));
        }
        assert_eq!(cube.viewport().width, 512.0);
    }
}
