//! # First-person camera
//!
//! Left-handed camera described by a position and an orthonormal basis
//! (right, up, look). View matrices map the look vector onto +Z; projection
//! matrices map view depth onto `[0, 1]`.
//!
//! ## Controls
//! - `walk` / `strafe` / `fly` translate along look / right / world up
//! - `pitch` rotates about the camera's right vector
//! - `yaw` rotates about world +Y, which keeps the horizon level

use crate::foundation::math::{constants, Mat4, Mat4Ext, Vec3};

/// Perspective camera with an explicit basis
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    right: Vec3,
    up: Vec3,
    look: Vec3,

    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// Camera at the origin looking down +Z with a 45 degree lens
    pub fn new() -> Self {
        Self {
            position: Vec3::zeros(),
            right: Vec3::x(),
            up: Vec3::y(),
            look: Vec3::z(),
            fov_y: constants::QUARTER_PI,
            aspect: 1.0,
            near: 1.0,
            far: 1000.0,
        }
    }

    /// Set the projection parameters
    ///
    /// # Arguments
    /// * `fov_y` - vertical field of view in radians
    /// * `aspect` - width / height
    /// * `near` - near plane distance (> 0)
    /// * `far` - far plane distance (> near)
    pub fn set_lens(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
    }

    /// Update the aspect ratio after a resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Place the camera at `position` looking at `target`
    ///
    /// `world_up` does not need to be perpendicular to the view direction;
    /// the basis is rebuilt from it.
    pub fn look_at(&mut self, position: Vec3, target: Vec3, world_up: Vec3) {
        let look = (target - position).normalize();
        let right = world_up.cross(&look).normalize();
        let up = look.cross(&right);

        self.position = position;
        self.look = look;
        self.right = right;
        self.up = up;
        log::trace!("Camera at {:?} looking at {:?}", position, target);
    }

    /// Move the camera without changing its orientation
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Move along the look vector
    pub fn walk(&mut self, distance: f32) {
        self.position += self.look * distance;
    }

    /// Move along the right vector
    pub fn strafe(&mut self, distance: f32) {
        self.position += self.right * distance;
    }

    /// Move along world up
    pub fn fly(&mut self, distance: f32) {
        self.position += Vec3::y() * distance;
    }

    /// Rotate up and look about the right vector
    pub fn pitch(&mut self, angle: f32) {
        let rotation = Mat4::rotation_axis(&self.right, angle);
        self.up = rotation.transform_vector(&self.up);
        self.look = rotation.transform_vector(&self.look);
    }

    /// Rotate the whole basis about world +Y
    pub fn yaw(&mut self, angle: f32) {
        let rotation = Mat4::rotation_axis(&Vec3::y(), angle);
        self.right = rotation.transform_vector(&self.right);
        self.up = rotation.transform_vector(&self.up);
        self.look = rotation.transform_vector(&self.look);
    }

    /// World to view
    pub fn view_matrix(&self) -> Mat4 {
        // re-orthonormalize; repeated pitch/yaw accumulates drift
        let look = self.look.normalize();
        let up = look.cross(&self.right).normalize();
        let right = up.cross(&look);
        let p = self.position;

        Mat4::new(
            right.x, right.y, right.z, -p.dot(&right),
            up.x, up.y, up.z, -p.dot(&up),
            look.x, look.y, look.z, -p.dot(&look),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// View to clip
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_lh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// World position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Right vector
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Up vector
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Look vector
    pub fn look(&self) -> Vec3 {
        self.look
    }

    /// Vertical field of view in radians
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    /// Width / height
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near plane distance
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far plane distance
    pub fn far(&self) -> f32 {
        self.far
    }
}

/// The six cameras rendering a cube map centered at `center`
///
/// Faces follow the +X, -X, +Y, -Y, +Z, -Z array slice order. Each camera
/// has a 90 degree field of view and square aspect so the faces meet
/// without seams.
pub fn cube_face_cameras(center: Vec3) -> [Camera; 6] {
    let targets = [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, -1.0),
    ];
    // looking along +/-Y needs a different up vector
    let ups = [
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];

    let mut cameras: [Camera; 6] = Default::default();
    for ((camera, direction), up) in cameras.iter_mut().zip(targets).zip(ups) {
        camera.look_at(center, center + direction, up);
        camera.set_lens(constants::HALF_PI, 1.0, 0.1, 1000.0);
    }
    cameras
}
