//! CPU/GPU synchronization
//!
//! A single monotonically increasing fence value is the only primitive the
//! renderer synchronizes on. [`FenceSync`] hands out values and waits on them;
//! [`FrameResourceRing`] uses it to decide when a per-frame bundle may be
//! rewritten by the CPU.

pub mod fence;
pub mod frame_ring;

pub use fence::{FenceSync, FenceStats, FenceValue, GpuTimeline, TimelinePrimitive};
pub use frame_ring::{FrameLayout, FrameResourceBundle, FrameResourceRing};
