//! # Renderer and Engine Configuration
//!
//! Configuration for the frame ring, fence timeouts, pass target sizes and
//! engine behavior. Everything here is serializable through [`Config`] so a
//! TOML or RON file can override the defaults.

use serde::{Serialize, Deserialize};
use std::time::Duration;

use crate::config::{Config, ConfigError};

/// # Renderer Configuration
///
/// Sizes of the per-frame ring and the offscreen pass targets, plus the
/// fence wait budget that turns a hung or lost device into an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Number of frame resource bundles in the ring
    pub frames_in_flight: usize,
    /// How long a fence wait may block before the device is considered hung
    pub fence_timeout_ms: u64,
    /// Number of swap chain back buffers
    pub back_buffer_count: u32,
    /// Back buffer width in pixels
    pub width: u32,
    /// Back buffer height in pixels
    pub height: u32,
    /// Shadow map edge length in texels
    pub shadow_map_size: u32,
    /// Dynamic cube map face edge length in texels
    pub cube_map_size: u32,
    /// Draw the shadow map on a debug quad after the opaque pass
    pub draw_shadow_debug: bool,
    /// Back buffer clear color
    pub clear_color: [f32; 4],
    /// Cube map face clear color
    pub cube_clear_color: [f32; 4],
    /// Capacity of the shader-visible descriptor table
    pub max_textures: u32,
}

impl RendererConfig {
    /// Create a renderer configuration with default values
    pub fn new() -> Self {
        Self {
            frames_in_flight: 3,
            fence_timeout_ms: 5_000,
            back_buffer_count: 2,
            width: 800,
            height: 600,
            shadow_map_size: 2048,
            cube_map_size: 512,
            draw_shadow_debug: false,
            clear_color: [0.871, 0.722, 0.529, 1.0],
            cube_clear_color: [0.0, 0.0, 0.0, 1.0],
            max_textures: 512,
        }
    }

    /// Set the ring size
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Set the fence wait budget
    pub fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the back buffer size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable the shadow map debug quad
    pub fn with_shadow_debug(mut self, enabled: bool) -> Self {
        self.draw_shadow_debug = enabled;
        self
    }

    /// Fence wait budget as a duration
    pub fn fence_timeout(&self) -> Duration {
        Duration::from_millis(self.fence_timeout_ms)
    }

    /// Back buffer aspect ratio
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames_in_flight == 0 {
            return Err(ConfigError::Invalid("frames_in_flight must be at least 1".to_string()));
        }
        if self.frames_in_flight > 8 {
            return Err(ConfigError::Invalid("frames_in_flight should not exceed 8".to_string()));
        }
        if self.back_buffer_count < 2 {
            return Err(ConfigError::Invalid("back_buffer_count must be at least 2".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!("invalid back buffer size {}x{}", self.width, self.height)));
        }
        if self.shadow_map_size == 0 || self.cube_map_size == 0 {
            return Err(ConfigError::Invalid("offscreen target sizes must be non-zero".to_string()));
        }
        if self.fence_timeout_ms == 0 {
            return Err(ConfigError::Invalid("fence_timeout_ms must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Engine Configuration
///
/// Core engine behavior: logging and frame pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
    /// Target FPS for frame rate limiting
    pub target_fps: Option<u32>,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
            target_fps: None,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set target FPS
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = Some(fps);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Rendering system configuration
    pub renderer: RendererConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate()
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ring_is_triple_buffered() {
        let config = RendererConfig::default();
        assert_eq!(config.frames_in_flight, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_ring() {
        let config = RendererConfig::default().with_frames_in_flight(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("mirror_engine_config_{}.toml", std::process::id()));
        let config = ApplicationConfig {
            engine: EngineConfig::new().with_log_level("debug"),
            renderer: RendererConfig::new().with_frames_in_flight(2).with_shadow_debug(true),
        };

        config.save_to_file(&path).unwrap();
        let loaded = ApplicationConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.engine.log_level, "debug");
        assert_eq!(loaded.renderer.frames_in_flight, 2);
        assert!(loaded.renderer.draw_shadow_debug);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: ApplicationConfig = ron::from_str("(renderer: (width: 1024))").unwrap();
        assert_eq!(config.renderer.width, 1024);
        assert_eq!(config.renderer.height, 600);
        assert_eq!(config.renderer.frames_in_flight, 3);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = ApplicationConfig::load_from_file("settings.ini");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
