//! Vulkan backend pieces
//!
//! Device, queue and swapchain creation stay with the caller; this module
//! builds on an existing `ash::Device`:
//! - [`VulkanTimeline`]: the GPU timeline as a timeline semaphore
//! - [`barriers`]: translation of tracked state transitions into image
//!   memory barriers

pub mod barriers;
pub mod timeline;

pub use barriers::{record_barriers, ImageBarrierInfo, VulkanImage, VulkanImageTable};
pub use timeline::VulkanTimeline;
