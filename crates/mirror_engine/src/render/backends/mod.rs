//! Backend implementations
//!
//! - `headless`: simulated queue and timeline for tests and offline runs
//! - `vulkan`: timeline semaphore and barrier translation over `ash`

pub mod headless;
pub mod vulkan;
