//! Render error taxonomy
//!
//! Three kinds of failure surface from the renderer:
//! - fatal GPU failures (device lost, fence timeout, backend API errors)
//! - programmer invariant violations (state mismatch, slot out of range, pass order)
//! - lookup failures for named scene resources
//!
//! None of them are retried. A frame that fails is a fatal condition.

use std::time::Duration;
use thiserror::Error;

use crate::render::state_tracker::{ResourceState, TransientResource};
use crate::render::passes::PassStage;

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors produced by the frame engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The GPU device was removed or reset; every pending wait is abandoned
    #[error("GPU device lost")]
    DeviceLost,

    /// A fence wait exceeded its budget
    #[error("Timed out after {timeout:?} waiting for fence {value} (GPU completed {completed})")]
    FenceTimeout {
        /// Value that was waited on
        value: u64,
        /// Last value the GPU had reached when the wait gave up
        completed: u64,
        /// Wait budget
        timeout: Duration,
    },

    /// A backend API call failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Command submission failed
    #[error("Submission failed: {0}")]
    Submission(String),

    /// A transition was requested from a state the resource is not in
    #[error("Invalid state transition for {resource:?}: expected {expected:?}, tracked {actual:?}")]
    InvalidStateTransition {
        /// Resource being transitioned
        resource: TransientResource,
        /// State the caller claimed
        expected: ResourceState,
        /// State the tracker holds
        actual: ResourceState,
    },

    /// A resource was moved into a state its usage flags do not allow
    #[error("{resource:?} cannot be used as {state:?}")]
    IllegalUsage {
        /// Resource being transitioned
        resource: TransientResource,
        /// Requested state
        state: ResourceState,
    },

    /// A resource was used before it was registered with the state tracker
    #[error("Resource {0:?} is not tracked")]
    UnknownResource(TransientResource),

    /// A constant buffer element index is outside the buffer
    #[error("{buffer} slot {index} out of range (capacity {capacity})")]
    SlotOutOfRange {
        /// Buffer name
        buffer: &'static str,
        /// Requested element
        index: usize,
        /// Number of elements in the buffer
        capacity: usize,
    },

    /// The CPU asked to wait on a fence value it never issued
    #[error("Fence value {requested} was never issued (last issued {last_issued})")]
    UnissuedFenceValue {
        /// Value that was waited on
        requested: u64,
        /// Last value handed out by `signal`
        last_issued: u64,
    },

    /// Passes were recorded out of their fixed order
    #[error("Pass {next:?} cannot follow {previous:?}")]
    PassOrder {
        /// Last recorded pass
        previous: PassStage,
        /// Pass that was attempted
        next: PassStage,
    },

    /// A frame operation was attempted with no acquired frame bundle
    #[error("No frame resource bundle has been acquired")]
    NoFrameInFlight,

    /// The descriptor table has no free slots left
    #[error("Descriptor table is full ({capacity} slots)")]
    DescriptorTableFull {
        /// Table capacity
        capacity: u32,
    },

    /// Named material does not exist
    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    /// Named texture has no descriptor slot
    #[error("Texture not found: {0}")]
    TextureNotFound(String),

    /// Named mesh geometry does not exist
    #[error("Mesh not found: {0}")]
    MeshNotFound(String),

    /// Named render item does not exist
    #[error("Render item not found: {0}")]
    RenderItemNotFound(String),
}

impl RenderError {
    /// Whether the error means the GPU can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeviceLost | Self::FenceTimeout { .. } | Self::Backend(_) | Self::Submission(_)
        )
    }
}

impl From<ash::vk::Result> for RenderError {
    fn from(result: ash::vk::Result) -> Self {
        match result {
            ash::vk::Result::ERROR_DEVICE_LOST => Self::DeviceLost,
            other => Self::Backend(format!("{other:?}")),
        }
    }
}
