//! Math utilities and types
//!
//! Provides the fundamental math types used by the renderer. All matrices are
//! column-vector matrices (`clip = proj * view * world * p`) using a
//! left-handed coordinate system: +X right, +Y up, +Z into the screen, with
//! clip-space depth in `[0, 1]`.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Pi / 4
    pub const QUARTER_PI: f32 = PI * 0.25;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Clamp a value between min and max
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        if value < min { min } else if value > max { max } else { value }
    }
}

/// Extension trait for Mat4 with the projection and view builders the passes need
pub trait Mat4Ext {
    /// Create a rotation matrix around an arbitrary axis through the origin
    fn rotation_axis(axis: &Vec3, angle: f32) -> Mat4;

    /// Left-handed perspective projection with `[0, 1]` depth
    fn perspective_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Left-handed off-center orthographic projection with `[0, 1]` depth
    fn orthographic_off_center_lh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Left-handed look-at view matrix
    fn view_look_at_lh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Maps NDC `[-1, 1]²` to texture space `[0, 1]²` (scale 0.5, flip Y, translate 0.5)
    fn ndc_to_texture() -> Mat4;

    /// Translation part of an affine matrix
    fn translation_part(&self) -> Vec3;

    /// Copy of this matrix with its translation column replaced
    fn with_translation(&self, translation: Vec3) -> Mat4;

    /// Flatten to 16 floats in row-major order
    fn to_row_major(&self) -> [f32; 16];

    /// Build from 16 floats in row-major order
    fn from_row_major(values: &[f32; 16]) -> Mat4;

    /// Column-major 4x4 array layout consumed by shaders
    fn to_gpu(&self) -> [[f32; 4]; 4];
}

impl Mat4Ext for Mat4 {
    fn rotation_axis(axis: &Vec3, angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Unit::new_normalize(*axis), angle)
    }

    fn perspective_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [xs  0   0          0          ]
        //     [0   ys  0          0          ]
        //     [0   0   f/(f-n)    -nf/(f-n)  ]
        //     [0   0   1          0          ]
        let y_scale = 1.0 / (fov_y * 0.5).tan();
        let x_scale = y_scale / aspect;
        let range = far / (far - near);

        let mut result = Mat4::zeros();
        result[(0, 0)] = x_scale;
        result[(1, 1)] = y_scale;
        result[(2, 2)] = range;
        result[(2, 3)] = -range * near;
        result[(3, 2)] = 1.0;
        result
    }

    fn orthographic_off_center_lh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let inv_width = 1.0 / (right - left);
        let inv_height = 1.0 / (top - bottom);
        let range = 1.0 / (far - near);

        Mat4::new(
            2.0 * inv_width, 0.0, 0.0, -(left + right) * inv_width,
            0.0, 2.0 * inv_height, 0.0, -(top + bottom) * inv_height,
            0.0, 0.0, range, -near * range,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn view_look_at_lh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = up.cross(&forward).normalize();
        let camera_up = forward.cross(&right);

        Mat4::new(
            right.x, right.y, right.z, -right.dot(&eye),
            camera_up.x, camera_up.y, camera_up.z, -camera_up.dot(&eye),
            forward.x, forward.y, forward.z, -forward.dot(&eye),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn ndc_to_texture() -> Mat4 {
        Mat4::new(
            0.5, 0.0, 0.0, 0.5,
            0.0, -0.5, 0.0, 0.5,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn translation_part(&self) -> Vec3 {
        Vec3::new(self[(0, 3)], self[(1, 3)], self[(2, 3)])
    }

    fn with_translation(&self, translation: Vec3) -> Mat4 {
        let mut result = *self;
        result[(0, 3)] = translation.x;
        result[(1, 3)] = translation.y;
        result[(2, 3)] = translation.z;
        result
    }

    fn to_row_major(&self) -> [f32; 16] {
        let mut values = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                values[row * 4 + col] = self[(row, col)];
            }
        }
        values
    }

    fn from_row_major(values: &[f32; 16]) -> Mat4 {
        Mat4::from_row_slice(values)
    }

    fn to_gpu(&self) -> [[f32; 4]; 4] {
        (*self).into()
    }
}
