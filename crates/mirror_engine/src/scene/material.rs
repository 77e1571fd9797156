//! Materials and texture classification

use crate::foundation::math::{Vec3, Vec4};
use crate::render::constants::MaterialConstants;
use crate::render::descriptors::DescriptorSlot;

/// How an imported texture is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureClass {
    /// Color texture sampled as 2D
    Diffuse,
    /// Tangent-space normal map sampled as 2D
    Normal,
    /// Six-face cube texture
    Cube,
}

impl TextureClass {
    /// Classify a texture by file name
    ///
    /// Names containing "cube" are cube maps; names containing "normal",
    /// "_n" or "_nrm" are normal maps; everything else is diffuse.
    pub fn classify(file_name: &str) -> Self {
        let name = file_name.to_ascii_lowercase();
        let stem = name.rsplit_once('.').map_or(name.as_str(), |(stem, _)| stem);

        if stem.contains("cube") {
            TextureClass::Cube
        } else if stem.contains("normal") || stem.contains("_nrm") || stem.ends_with("_n") || stem.contains("_n_") {
            TextureClass::Normal
        } else {
            TextureClass::Diffuse
        }
    }
}

/// Parameters used to create a material
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    /// Unique name
    pub name: String,
    /// Diffuse texture slot
    pub diffuse_slot: DescriptorSlot,
    /// Normal map slot
    pub normal_slot: DescriptorSlot,
    /// Diffuse albedo
    pub diffuse_albedo: Vec4,
    /// Fresnel reflectance at normal incidence
    pub fresnel_r0: Vec3,
    /// Specular shininess in `[0, 1]`
    pub shininess: f32,
    /// Texture tiling factor
    pub uv_tile: f32,
}

impl MaterialDesc {
    /// White, slightly glossy material sampling `diffuse_slot`
    pub fn new(name: impl Into<String>, diffuse_slot: DescriptorSlot) -> Self {
        Self {
            name: name.into(),
            diffuse_slot,
            normal_slot: diffuse_slot,
            diffuse_albedo: Vec4::new(1.0, 1.0, 1.0, 1.0),
            fresnel_r0: Vec3::new(0.01, 0.01, 0.01),
            shininess: 0.75,
            uv_tile: 1.0,
        }
    }

    /// Set the normal map slot
    pub fn with_normal_slot(mut self, slot: DescriptorSlot) -> Self {
        self.normal_slot = slot;
        self
    }

    /// Set the albedo
    pub fn with_albedo(mut self, albedo: Vec4) -> Self {
        self.diffuse_albedo = albedo;
        self
    }

    /// Set reflectance parameters
    pub fn with_reflectance(mut self, fresnel_r0: Vec3, shininess: f32) -> Self {
        self.fresnel_r0 = fresnel_r0;
        self.shininess = shininess;
        self
    }

    /// Set the tiling factor
    pub fn with_uv_tile(mut self, uv_tile: f32) -> Self {
        self.uv_tile = uv_tile;
        self
    }
}

/// A material owned by the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Unique name
    pub name: String,
    /// Slot in the per-frame material constant buffer
    pub constant_index: usize,
    /// Diffuse texture slot
    pub diffuse_slot: DescriptorSlot,
    /// Normal map slot
    pub normal_slot: DescriptorSlot,
    /// Diffuse albedo
    pub diffuse_albedo: Vec4,
    /// Fresnel reflectance at normal incidence
    pub fresnel_r0: Vec3,
    /// Specular shininess
    pub shininess: f32,
    /// Texture tiling factor
    pub uv_tile: f32,
    /// Frame bundles that still hold stale constants
    pub frames_dirty: usize,
}

impl Material {
    pub(crate) fn from_desc(desc: MaterialDesc, constant_index: usize, frames_dirty: usize) -> Self {
        Self {
            name: desc.name,
            constant_index,
            diffuse_slot: desc.diffuse_slot,
            normal_slot: desc.normal_slot,
            diffuse_albedo: desc.diffuse_albedo,
            fresnel_r0: desc.fresnel_r0,
            shininess: desc.shininess,
            uv_tile: desc.uv_tile,
            frames_dirty,
        }
    }

    /// Constant buffer contents
    pub fn constants(&self) -> MaterialConstants {
        MaterialConstants {
            diffuse_albedo: self.diffuse_albedo.into(),
            fresnel_r0: self.fresnel_r0.into(),
            shininess: self.shininess,
            uv_tile: self.uv_tile,
            diffuse_tex_index: self.diffuse_slot.index(),
            normal_tex_index: self.normal_slot.index(),
            _pad0: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_file_name() {
        assert_eq!(TextureClass::classify("grasscube1024.dds"), TextureClass::Cube);
        assert_eq!(TextureClass::classify("SkyCube.DDS"), TextureClass::Cube);
        assert_eq!(TextureClass::classify("bricks_normal.dds"), TextureClass::Normal);
        assert_eq!(TextureClass::classify("smg_nrm.dds"), TextureClass::Normal);
        assert_eq!(TextureClass::classify("tile_n.dds"), TextureClass::Normal);
        assert_eq!(TextureClass::classify("tile.dds"), TextureClass::Diffuse);
        assert_eq!(TextureClass::classify("night_sky.dds"), TextureClass::Diffuse);
    }

    #[test]
    fn test_constants_carry_slots() {
        let desc = MaterialDesc::new("bricks", DescriptorSlot(3)).with_normal_slot(DescriptorSlot(4));
        let material = Material::from_desc(desc, 0, 3);
        let constants = material.constants();
        assert_eq!(constants.diffuse_tex_index, 3);
        assert_eq!(constants.normal_tex_index, 4);
    }
}
