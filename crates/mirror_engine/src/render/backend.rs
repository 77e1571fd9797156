//! Backend abstraction for command submission
//!
//! A backend executes recorded [`CommandList`]s on its single graphics
//! queue and presents back buffers. The timeline it signals on is supplied
//! separately as a [`TimelinePrimitive`](crate::sync::TimelinePrimitive).

use crate::render::commands::CommandList;
use crate::render::RenderResult;

/// Result type for backend operations
pub type BackendResult<T> = RenderResult<T>;

/// The GPU command queue
pub trait CommandQueue {
    /// Submit a closed command list for execution
    fn execute(&mut self, commands: &CommandList) -> BackendResult<()>;

    /// Present back buffer `index`
    fn present(&mut self, index: u32) -> BackendResult<()>;

    /// Human-readable backend name for logs
    fn name(&self) -> &str;
}
