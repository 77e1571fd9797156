//! # Mirror Engine
//!
//! Frame orchestration for a shadowed, reflective 3D scene.
//!
//! ## Features
//!
//! - **Frames in flight**: a ring of per-frame constant buffers and command
//!   storage, reused only once the GPU timeline has passed them
//! - **Fence synchronization**: one monotonically increasing timeline with
//!   bounded waits that surface hangs and device loss as errors
//! - **Multi-pass frames**: shadow map, six dynamic cube map faces, then the
//!   main pass sampling both, with every resource transition tracked
//! - **Picking**: screen-space rays against item bounds and triangles, plus
//!   translate/rotate manipulation of the picked item
//! - **Backends**: a headless simulation for tests and offline runs, and
//!   Vulkan timeline semaphore and barrier translation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mirror_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::load_or_default("mirror.toml")?;
//!     let (mut runner, _device) = SceneRunner::headless(config.renderer.clone())?;
//!     let mut engine = Engine::new(config.engine);
//!     engine.run(&mut runner, Some(3))?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod input;
pub mod picking;
pub mod render;
pub mod runner;
pub mod scene;
pub mod sync;

mod application;
mod engine;

pub use application::{AppError, AppEvent, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::config::{ApplicationConfig, EngineConfig, RendererConfig},
        foundation::{
            math::{Mat4, Mat4Ext, Vec3},
            time::Timer,
        },
        input::{KeyCode, MouseButton},
        picking::{PickHit, PickMode, PickingEngine},
        render::{Camera, RenderContext, RenderError, RenderResult},
        runner::SceneRunner,
        scene::{RenderItemId, RenderLayer, Scene},
        sync::{FenceSync, FenceValue, GpuTimeline},
        AppError, AppEvent, Application, Engine, EngineError,
    };
}
