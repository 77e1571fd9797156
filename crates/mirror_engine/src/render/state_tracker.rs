//! Resource state tracking
//!
//! Every transient GPU resource has exactly one logical state at any point
//! of command recording. Moving a resource between states records a barrier
//! into the command list and updates the tracked state; asking for a
//! transition out of a state the resource is not in is rejected.

use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;

use crate::render::commands::{Command, CommandList};
use crate::render::{RenderError, RenderResult};

/// Transient resources whose state changes within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransientResource {
    /// Shadow depth target
    ShadowMap,
    /// Dynamic cube map color (six array slices)
    CubeMapColor,
    /// Depth buffer shared by the six cube faces
    CubeMapDepth,
    /// Swap chain back buffer
    BackBuffer(u32),
    /// Main depth buffer
    DepthBuffer,
}

impl fmt::Display for TransientResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientResource::ShadowMap => write!(f, "shadow map"),
            TransientResource::CubeMapColor => write!(f, "cube map color"),
            TransientResource::CubeMapDepth => write!(f, "cube map depth"),
            TransientResource::BackBuffer(index) => write!(f, "back buffer {}", index),
            TransientResource::DepthBuffer => write!(f, "depth buffer"),
        }
    }
}

/// Logical GPU usage state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// No particular usage; required for some cross-pass handoffs
    Common,
    /// Readable by any shader stage
    GenericRead,
    /// Writable as a color target
    RenderTarget,
    /// Writable as a depth target
    DepthWrite,
    /// Readable by pixel shaders
    PixelShaderResource,
    /// Owned by the presentation engine
    Present,
}

impl ResourceState {
    /// Usage a resource must support to enter this state
    pub fn required_usage(self) -> ResourceUsage {
        match self {
            ResourceState::Common => ResourceUsage::empty(),
            ResourceState::GenericRead | ResourceState::PixelShaderResource => ResourceUsage::SHADER_RESOURCE,
            ResourceState::RenderTarget => ResourceUsage::RENDER_TARGET,
            ResourceState::DepthWrite => ResourceUsage::DEPTH_STENCIL,
            ResourceState::Present => ResourceUsage::PRESENT,
        }
    }

    /// True for states a shader may sample from
    pub fn is_shader_readable(self) -> bool {
        matches!(self, ResourceState::GenericRead | ResourceState::PixelShaderResource)
    }
}

bitflags! {
    /// Ways a resource was created to be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceUsage: u32 {
        /// Bindable as a color target
        const RENDER_TARGET = 1 << 0;
        /// Bindable as a depth target
        const DEPTH_STENCIL = 1 << 1;
        /// Sampleable by shaders
        const SHADER_RESOURCE = 1 << 2;
        /// Presentable
        const PRESENT = 1 << 3;
    }
}

/// A recorded state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBarrier {
    /// Resource being transitioned
    pub resource: TransientResource,
    /// State before the barrier
    pub before: ResourceState,
    /// State after the barrier
    pub after: ResourceState,
}

#[derive(Debug, Clone, Copy)]
struct TrackedResource {
    state: ResourceState,
    usage: ResourceUsage,
}

/// Tracks the current state of every registered transient resource
#[derive(Debug, Default)]
pub struct ResourceStateTracker {
    resources: HashMap<TransientResource, TrackedResource>,
    barriers_recorded: u64,
}

impl ResourceStateTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `resource` in `initial` state
    ///
    /// Re-registering replaces the previous entry, which is how resize
    /// recreates the back buffers and depth buffer.
    pub fn register(
        &mut self,
        resource: TransientResource,
        initial: ResourceState,
        usage: ResourceUsage,
    ) -> RenderResult<()> {
        if !usage.contains(initial.required_usage()) {
            return Err(RenderError::IllegalUsage { resource, state: initial });
        }
        log::trace!("Tracking {} in {:?}", resource, initial);
        self.resources.insert(resource, TrackedResource { state: initial, usage });
        Ok(())
    }

    /// Stop tracking `resource`
    pub fn unregister(&mut self, resource: TransientResource) {
        self.resources.remove(&resource);
    }

    /// Current state of `resource`
    pub fn state(&self, resource: TransientResource) -> RenderResult<ResourceState> {
        self.resources
            .get(&resource)
            .map(|tracked| tracked.state)
            .ok_or(RenderError::UnknownResource(resource))
    }

    /// Fail unless `resource` is currently in `expected`
    pub fn expect_state(&self, resource: TransientResource, expected: ResourceState) -> RenderResult<()> {
        let actual = self.state(resource)?;
        if actual != expected {
            log::error!("{} expected in {:?} but is {:?}", resource, expected, actual);
            return Err(RenderError::InvalidStateTransition { resource, expected, actual });
        }
        Ok(())
    }

    /// Record one barrier moving `resource` from `from` to `to`
    ///
    /// `from` must match the tracked state. Every change of state records
    /// exactly one barrier. The exception is `from == to`, which is a no-op
    /// and records no barrier.
    pub fn transition(
        &mut self,
        commands: &mut CommandList,
        resource: TransientResource,
        from: ResourceState,
        to: ResourceState,
    ) -> RenderResult<()> {
        let tracked = self
            .resources
            .get_mut(&resource)
            .ok_or(RenderError::UnknownResource(resource))?;

        if tracked.state != from {
            log::error!(
                "Invalid transition of {}: requested from {:?} but tracked state is {:?}",
                resource,
                from,
                tracked.state
            );
            return Err(RenderError::InvalidStateTransition {
                resource,
                expected: from,
                actual: tracked.state,
            });
        }

        if !tracked.usage.contains(to.required_usage()) {
            log::error!("{} was not created for {:?}", resource, to);
            return Err(RenderError::IllegalUsage { resource, state: to });
        }

        if from == to {
            return Ok(());
        }

        commands.push(Command::Barrier(ResourceBarrier {
            resource,
            before: from,
            after: to,
        }));
        tracked.state = to;
        self.barriers_recorded += 1;
        log::trace!("Barrier {}: {:?} -> {:?}", resource, from, to);
        Ok(())
    }

    /// Move `resource` into `to` from whatever state it is in
    ///
    /// Returns whether a barrier was recorded.
    pub fn require(
        &mut self,
        commands: &mut CommandList,
        resource: TransientResource,
        to: ResourceState,
    ) -> RenderResult<bool> {
        let from = self.state(resource)?;
        if from == to {
            return Ok(false);
        }
        self.transition(commands, resource, from, to)?;
        Ok(true)
    }

    /// Total barriers recorded since creation
    pub fn barriers_recorded(&self) -> u64 {
        self.barriers_recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with_shadow_map() -> ResourceStateTracker {
        let mut tracker = ResourceStateTracker::new();
        tracker
            .register(
                TransientResource::ShadowMap,
                ResourceState::GenericRead,
                ResourceUsage::DEPTH_STENCIL | ResourceUsage::SHADER_RESOURCE,
            )
            .unwrap();
        tracker
    }

    #[test]
    fn test_matching_transition_records_one_barrier() {
        let mut tracker = tracker_with_shadow_map();
        let mut commands = CommandList::new();

        tracker
            .transition(
                &mut commands,
                TransientResource::ShadowMap,
                ResourceState::GenericRead,
                ResourceState::DepthWrite,
            )
            .unwrap();

        assert_eq!(commands.barriers().count(), 1);
        assert_eq!(tracker.state(TransientResource::ShadowMap).unwrap(), ResourceState::DepthWrite);
    }

    #[test]
    fn test_mismatched_transition_is_rejected() {
        let mut tracker = tracker_with_shadow_map();
        let mut commands = CommandList::new();

        let result = tracker.transition(
            &mut commands,
            TransientResource::ShadowMap,
            ResourceState::DepthWrite,
            ResourceState::GenericRead,
        );

        assert_eq!(
            result,
            Err(RenderError::InvalidStateTransition {
                resource: TransientResource::ShadowMap,
                expected: ResourceState::DepthWrite,
                actual: ResourceState::GenericRead,
            })
        );
        assert!(commands.is_empty());
        assert_eq!(tracker.state(TransientResource::ShadowMap).unwrap(), ResourceState::GenericRead);
    }

    #[test]
    fn test_same_state_transition_records_nothing() {
        let mut tracker = tracker_with_shadow_map();
        let mut commands = CommandList::new();

        tracker
            .transition(
                &mut commands,
                TransientResource::ShadowMap,
                ResourceState::GenericRead,
                ResourceState::GenericRead,
            )
            .unwrap();

        assert!(commands.is_empty());
        assert_eq!(tracker.state(TransientResource::ShadowMap).unwrap(), ResourceState::GenericRead);
    }

    #[test]
    fn test_require_skips_redundant_barrier() {
        let mut tracker = tracker_with_shadow_map();
        let mut commands = CommandList::new();

        let recorded = tracker
            .require(&mut commands, TransientResource::ShadowMap, ResourceState::GenericRead)
            .unwrap();

        assert!(!recorded);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_usage_outside_creation_flags_is_rejected() {
        let mut tracker = tracker_with_shadow_map();
        let mut commands = CommandList::new();

        let result = tracker.require(&mut commands, TransientResource::ShadowMap, ResourceState::RenderTarget);
        assert_eq!(
            result,
            Err(RenderError::IllegalUsage {
                resource: TransientResource::ShadowMap,
                state: ResourceState::RenderTarget,
            })
        );
    }

    #[test]
    fn test_unknown_resource() {
        let tracker = ResourceStateTracker::new();
        assert_eq!(
            tracker.state(TransientResource::DepthBuffer),
            Err(RenderError::UnknownResource(TransientResource::DepthBuffer))
        );
    }
}
