//! Translation of tracked resource transitions into Vulkan barriers
//!
//! Each logical [`ResourceState`] maps to an image layout, the access mask
//! that covers it, and the pipeline stages where that access happens.

use std::collections::HashMap;

use ash::{vk, Device};

use crate::render::state_tracker::{ResourceBarrier, ResourceState, TransientResource};
use crate::render::{RenderError, RenderResult};

/// Layout, access and stage of one logical state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrierInfo {
    /// Image layout
    pub layout: vk::ImageLayout,
    /// Access performed in this state
    pub access: vk::AccessFlags,
    /// Stages performing the access
    pub stages: vk::PipelineStageFlags,
}

/// Vulkan equivalent of a logical state
pub fn state_info(state: ResourceState, aspect: vk::ImageAspectFlags) -> ImageBarrierInfo {
    match state {
        ResourceState::Common => ImageBarrierInfo {
            layout: vk::ImageLayout::GENERAL,
            access: vk::AccessFlags::empty(),
            stages: vk::PipelineStageFlags::ALL_COMMANDS,
        },
        ResourceState::GenericRead | ResourceState::PixelShaderResource => ImageBarrierInfo {
            layout: if aspect.contains(vk::ImageAspectFlags::DEPTH) {
                vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
            } else {
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
            },
            access: vk::AccessFlags::SHADER_READ,
            stages: vk::PipelineStageFlags::FRAGMENT_SHADER,
        },
        ResourceState::RenderTarget => ImageBarrierInfo {
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            access: vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            stages: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        },
        ResourceState::DepthWrite => ImageBarrierInfo {
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            stages: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        },
        ResourceState::Present => ImageBarrierInfo {
            layout: vk::ImageLayout::PRESENT_SRC_KHR,
            access: vk::AccessFlags::empty(),
            stages: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        },
    }
}

/// An image the caller created for a transient resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VulkanImage {
    /// Image handle
    pub image: vk::Image,
    /// Color or depth aspect
    pub aspect: vk::ImageAspectFlags,
    /// Array layers (6 for the cube map)
    pub layer_count: u32,
}

/// Images backing the tracked transient resources
#[derive(Debug, Default)]
pub struct VulkanImageTable {
    images: HashMap<TransientResource, VulkanImage>,
}

impl VulkanImageTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `resource` to an image
    pub fn insert(&mut self, resource: TransientResource, image: VulkanImage) {
        self.images.insert(resource, image);
    }

    /// Image bound to `resource`
    pub fn get(&self, resource: TransientResource) -> RenderResult<&VulkanImage> {
        self.images.get(&resource).ok_or(RenderError::UnknownResource(resource))
    }
}

/// Build the image barrier for one transition, with its source and destination stages
pub fn image_barrier(
    barrier: &ResourceBarrier,
    image: &VulkanImage,
) -> (vk::ImageMemoryBarrier, vk::PipelineStageFlags, vk::PipelineStageFlags) {
    let before = state_info(barrier.before, image.aspect);
    let after = state_info(barrier.after, image.aspect);

    let memory_barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(before.layout)
        .new_layout(after.layout)
        .src_access_mask(before.access)
        .dst_access_mask(after.access)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image.image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: image.aspect,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: image.layer_count,
        })
        .build();

    (memory_barrier, before.stages, after.stages)
}

/// Record `barriers` into `command_buffer`, one pipeline barrier per transition
pub fn record_barriers<'a>(
    device: &Device,
    command_buffer: vk::CommandBuffer,
    barriers: impl IntoIterator<Item = &'a ResourceBarrier>,
    images: &VulkanImageTable,
) -> RenderResult<usize> {
    let mut recorded = 0;
    for barrier in barriers {
        let image = images.get(barrier.resource)?;
        let (memory_barrier, src_stage, dst_stage) = image_barrier(barrier, image);
        unsafe {
            device.cmd_pipeline_barrier(
                command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[memory_barrier],
            );
        }
        recorded += 1;
    }
    Ok(recorded)
}
