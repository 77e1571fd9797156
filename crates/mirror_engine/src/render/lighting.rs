//! Light sources as laid out in pass constants

use crate::foundation::math::Vec3;

/// Maximum number of lights carried by one pass
pub const MAX_LIGHTS: usize = 16;

/// One light, matching the shader's 48-byte layout
///
/// Directional lights use `strength` and `direction`, point lights add
/// `position` and the falloff range, spot lights use everything.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Light color times intensity
    pub strength: [f32; 3],
    /// Distance where attenuation begins
    pub falloff_start: f32,
    /// Direction the light travels (directional/spot)
    pub direction: [f32; 3],
    /// Distance where the light reaches zero
    pub falloff_end: f32,
    /// World position (point/spot)
    pub position: [f32; 3],
    /// Spot cone exponent
    pub spot_power: f32,
}

unsafe impl bytemuck::Pod for Light {}
unsafe impl bytemuck::Zeroable for Light {}

impl Default for Light {
    fn default() -> Self {
        Self {
            strength: [0.5, 0.5, 0.5],
            falloff_start: 1.0,
            direction: [0.0, -1.0, 0.0],
            falloff_end: 10.0,
            position: [0.0, 0.0, 0.0],
            spot_power: 64.0,
        }
    }
}

impl Light {
    /// Create a directional light; `direction` is normalized
    pub fn directional(direction: Vec3, strength: Vec3) -> Self {
        let direction = direction.normalize();
        Self {
            strength: strength.into(),
            direction: direction.into(),
            ..Self::default()
        }
    }

    /// Create a point light
    pub fn point(position: Vec3, strength: Vec3, falloff_start: f32, falloff_end: f32) -> Self {
        Self {
            strength: strength.into(),
            position: position.into(),
            falloff_start,
            falloff_end,
            ..Self::default()
        }
    }

    /// Direction as a vector
    pub fn direction(&self) -> Vec3 {
        Vec3::from(self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_light_layout_is_48_bytes() {
        assert_eq!(std::mem::size_of::<Light>(), 48);
    }

    #[test]
    fn test_directional_light_normalizes_direction() {
        let light = Light::directional(Vec3::new(0.0, -2.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(light.direction(), Vec3::new(0.0, -1.0, 0.0));
    }
}
