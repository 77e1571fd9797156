//! Frame engine
//!
//! Multi-pass frame recording on top of the synchronization layer:
//! per-frame constant layouts, resource state tracking, the descriptor
//! table, the pass orchestrator and the backends that execute the result.

pub mod backend;
pub mod backends;
pub mod camera;
pub mod commands;
pub mod constants;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod lighting;
pub mod passes;
pub mod state_tracker;
pub mod upload_buffer;

#[cfg(test)]
mod tests;

pub use backend::{BackendResult, CommandQueue};
pub use camera::Camera;
pub use commands::{Command, CommandList, PipelineKind};
pub use constants::{MaterialConstants, ObjectConstants, PassConstants};
pub use context::RenderContext;
pub use descriptors::{DescriptorSlot, DescriptorTable};
pub use error::{RenderError, RenderResult};
pub use lighting::Light;
pub use passes::{PassOrchestrator, PassStage};
pub use state_tracker::{ResourceBarrier, ResourceState, ResourceStateTracker, TransientResource};
