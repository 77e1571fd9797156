//! Constant buffer layouts shared with the shaders
//!
//! Every struct here is `repr(C)` without implicit padding so it can be
//! copied into upload memory byte-for-byte. Matrices are stored as four
//! columns of four floats.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3, Vec4};
use crate::render::lighting::{Light, MAX_LIGHTS};

/// Pass slot used by the main camera
pub const MAIN_PASS_SLOT: usize = 0;
/// Pass slot used by the shadow depth pass
pub const SHADOW_PASS_SLOT: usize = 1;
/// First of the six cube face pass slots
pub const CUBE_FACE_SLOT_BASE: usize = 2;
/// Pass slots per frame bundle
pub const PASS_SLOT_COUNT: usize = CUBE_FACE_SLOT_BASE + 6;

/// Pass slot for cube face `face` (0..6)
pub fn cube_face_slot(face: usize) -> usize {
    CUBE_FACE_SLOT_BASE + face
}

/// Round `byte_size` up to the 256-byte constant buffer alignment
pub fn constant_buffer_byte_size(byte_size: usize) -> usize {
    (byte_size + 255) & !255
}

/// Per-pass constants
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassConstants {
    /// World to view
    pub view: [[f32; 4]; 4],
    /// View to clip
    pub proj: [[f32; 4]; 4],
    /// World to clip
    pub view_proj: [[f32; 4]; 4],
    /// World to shadow map texture space
    pub shadow_transform: [[f32; 4]; 4],
    /// Eye position in world space
    pub eye_position: [f32; 3],
    /// Padding to a 16-byte boundary
    pub _pad0: f32,
    /// Scene lights
    pub lights: [Light; MAX_LIGHTS],
}

unsafe impl bytemuck::Pod for PassConstants {}
unsafe impl bytemuck::Zeroable for PassConstants {}

impl Default for PassConstants {
    fn default() -> Self {
        let identity = Mat4::identity().to_gpu();
        Self {
            view: identity,
            proj: identity,
            view_proj: identity,
            shadow_transform: identity,
            eye_position: [0.0; 3],
            _pad0: 0.0,
            lights: [Light::default(); MAX_LIGHTS],
        }
    }
}

impl PassConstants {
    /// Fill camera matrices from a view and projection
    pub fn set_camera(&mut self, view: &Mat4, proj: &Mat4, eye: Vec3) {
        self.view = view.to_gpu();
        self.proj = proj.to_gpu();
        self.view_proj = (proj * view).to_gpu();
        self.eye_position = eye.into();
    }

    /// Copy up to `MAX_LIGHTS` lights; remaining entries are zeroed
    pub fn set_lights(&mut self, lights: &[Light]) {
        if lights.len() > MAX_LIGHTS {
            log::warn!("{} lights supplied, only {} are uploaded", lights.len(), MAX_LIGHTS);
        }
        self.lights = [bytemuck::Zeroable::zeroed(); MAX_LIGHTS];
        for (slot, light) in self.lights.iter_mut().zip(lights) {
            *slot = *light;
        }
    }

    /// View matrix as a nalgebra matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from(self.view)
    }

    /// Projection matrix as a nalgebra matrix
    pub fn proj_matrix(&self) -> Mat4 {
        Mat4::from(self.proj)
    }
}

/// Per-render-item constants
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectConstants {
    /// Object to world
    pub world: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for ObjectConstants {}
unsafe impl bytemuck::Zeroable for ObjectConstants {}

impl ObjectConstants {
    /// Constants for a world matrix
    pub fn new(world: &Mat4) -> Self {
        Self { world: world.to_gpu() }
    }
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self::new(&Mat4::identity())
    }
}

/// Per-material constants
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialConstants {
    /// Diffuse albedo (RGBA)
    pub diffuse_albedo: [f32; 4],
    /// Fresnel reflectance at normal incidence
    pub fresnel_r0: [f32; 3],
    /// Specular shininess
    pub shininess: f32,
    /// Texture coordinate tiling factor
    pub uv_tile: f32,
    /// Descriptor slot of the diffuse texture
    pub diffuse_tex_index: u32,
    /// Descriptor slot of the normal map
    pub normal_tex_index: u32,
    /// Padding to a 16-byte boundary
    pub _pad0: u32,
}

unsafe impl bytemuck::Pod for MaterialConstants {}
unsafe impl bytemuck::Zeroable for MaterialConstants {}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            diffuse_albedo: Vec4::new(1.0, 1.0, 1.0, 1.0).into(),
            fresnel_r0: [0.01, 0.01, 0.01],
            shininess: 0.75,
            uv_tile: 1.0,
            diffuse_tex_index: 0,
            normal_tex_index: 0,
            _pad0: 0,
        }
    }
}
