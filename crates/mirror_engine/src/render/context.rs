//! Render context
//!
//! Owns everything the frame loop touches: the command queue, the fence,
//! the frames-in-flight ring, resource state tracking, the descriptor
//! table and the pass orchestrator. One context drives one presentation
//! surface; nothing is global, so tests create as many as they like.
//!
//! A frame is `begin_frame` (wait for a free bundle), `update` (write
//! constants into it), then `draw` (record, submit, present, signal).

use crate::core::config::RendererConfig;
use crate::foundation::math::{Mat4Ext, Vec3};
use crate::render::backend::CommandQueue;
use crate::render::backends::headless::HeadlessDevice;
use crate::render::camera::Camera;
use crate::render::constants::PassConstants;
use crate::render::descriptors::{
    DescriptorKind, DescriptorSlot, DescriptorTable, DYNAMIC_CUBE_DESCRIPTOR, SHADOW_MAP_DESCRIPTOR,
};
use crate::render::passes::frame_constants;
use crate::render::passes::{PassOrchestrator, ShadowTransforms};
use crate::render::state_tracker::{ResourceState, ResourceStateTracker, ResourceUsage, TransientResource};
use crate::render::{RenderError, RenderResult};
use crate::scene::{RenderLayer, Scene, TextureClass};
use crate::sync::{FenceSync, FenceValue, FrameLayout, FrameResourceRing, GpuTimeline, TimelinePrimitive};

/// Explicit renderer state shared by every subsystem of a frame
pub struct RenderContext {
    config: RendererConfig,
    queue: Box<dyn CommandQueue>,
    fence: FenceSync,
    ring: FrameResourceRing,
    tracker: ResourceStateTracker,
    descriptors: DescriptorTable,
    orchestrator: PassOrchestrator,
    back_buffer: u32,
    frame_open: bool,
    frames_submitted: u64,
    shadow: Option<ShadowTransforms>,
    main_pass: Option<PassConstants>,
}

impl RenderContext {
    /// Create a context submitting to `queue` and synchronizing on `timeline`
    pub fn new(
        config: RendererConfig,
        queue: Box<dyn CommandQueue>,
        timeline: Box<dyn TimelinePrimitive>,
        layout: FrameLayout,
    ) -> RenderResult<Self> {
        let descriptors = DescriptorTable::new(config.max_textures);
        Self::with_descriptors(config, queue, timeline, layout, descriptors)
    }

    /// Create a context around a descriptor table the scene was built against
    ///
    /// Textures registered before the context existed keep their slots; the
    /// shadow map and dynamic cube map are appended after them.
    pub fn with_descriptors(
        config: RendererConfig,
        queue: Box<dyn CommandQueue>,
        timeline: Box<dyn TimelinePrimitive>,
        layout: FrameLayout,
        mut descriptors: DescriptorTable,
    ) -> RenderResult<Self> {
        log::info!(
            "Creating render context on {} backend: {}x{}, {} frames in flight",
            queue.name(),
            config.width,
            config.height,
            config.frames_in_flight
        );

        let fence = FenceSync::new(timeline, config.fence_timeout());
        let ring = FrameResourceRing::new(config.frames_in_flight, layout)?;

        let mut tracker = ResourceStateTracker::new();
        register_transient_resources(&mut tracker, &config)?;

        let shadow_slot = descriptors.register(SHADOW_MAP_DESCRIPTOR, DescriptorKind::ShadowMap)?;
        let cube_slot = descriptors.register(DYNAMIC_CUBE_DESCRIPTOR, DescriptorKind::DynamicCubeMap)?;
        let mut orchestrator = PassOrchestrator::new(&config, shadow_slot, cube_slot);
        orchestrator.set_sky_cube(descriptors.first_cube_texture());

        Ok(Self {
            config,
            queue,
            fence,
            ring,
            tracker,
            descriptors,
            orchestrator,
            back_buffer: 0,
            frame_open: false,
            frames_submitted: 0,
            shadow: None,
            main_pass: None,
        })
    }

    /// Create a context on a simulated GPU; returns the device handle with it
    pub fn headless(config: RendererConfig, layout: FrameLayout, auto_retire: bool) -> RenderResult<(Self, HeadlessDevice)> {
        let device = HeadlessDevice::new(auto_retire);
        let context = Self::new(config, Box::new(device.queue()), Box::new(device.timeline()), layout)?;
        Ok((context, device))
    }

    /// Assign a descriptor slot to an imported texture
    ///
    /// The first cube texture registered becomes the sky.
    pub fn register_texture(&mut self, name: &str, class: TextureClass) -> RenderResult<DescriptorSlot> {
        let slot = self.descriptors.register_texture(name, class)?;
        if class == TextureClass::Cube && self.descriptors.first_cube_texture() == Some(slot) {
            self.orchestrator.set_sky_cube(Some(slot));
        }
        Ok(slot)
    }

    /// Wait for the next frame bundle and open it for writing
    pub fn begin_frame(&mut self) -> RenderResult<usize> {
        if self.frame_open {
            log::warn!("begin_frame called twice; the open frame is reused");
            return self.ring.current_index().ok_or(RenderError::NoFrameInFlight);
        }
        let index = self.ring.acquire_next(&self.fence)?.index();
        self.frame_open = true;
        Ok(index)
    }

    /// Write this frame's constants into the open bundle
    pub fn update(&mut self, scene: &mut Scene, camera: &Camera) -> RenderResult<()> {
        if !self.frame_open {
            return Err(RenderError::NoFrameInFlight);
        }

        let shadow = ShadowTransforms::compute(scene.shadow_light_direction(), &scene.bounds());
        if let Some(center) = reflective_center(scene) {
            self.orchestrator.cube_map_mut().set_center(center);
        }

        let bundle = self.ring.current_mut()?;
        frame_constants::update_object_constants(bundle, scene)?;
        frame_constants::update_material_constants(bundle, scene)?;
        let main = frame_constants::update_pass_constants(
            bundle,
            camera,
            &shadow,
            self.orchestrator.cube_map(),
            scene.lights(),
        )?;

        self.shadow = Some(shadow);
        self.main_pass = Some(main);
        Ok(())
    }

    /// Record, submit and present the open frame; returns its fence value
    pub fn draw(&mut self, scene: &Scene) -> RenderResult<FenceValue> {
        if !self.frame_open {
            return Err(RenderError::NoFrameInFlight);
        }
        let index = self.ring.current_index().ok_or(RenderError::NoFrameInFlight)?;

        let bundle = self.ring.current_mut()?;
        self.orchestrator
            .record_frame(bundle, &mut self.tracker, &self.descriptors, scene, self.back_buffer)?;
        self.queue.execute(&bundle.commands)?;
        self.queue.present(self.back_buffer)?;

        let fence = self.fence.signal()?;
        self.ring.record_submission(index, fence)?;

        self.frame_open = false;
        self.frames_submitted += 1;
        self.back_buffer = (self.back_buffer + 1) % self.config.back_buffer_count;
        log::trace!("Frame {} submitted with fence {}", self.frames_submitted, fence);
        Ok(fence)
    }

    /// `begin_frame`, `update` and `draw` in one call
    pub fn render_frame(&mut self, scene: &mut Scene, camera: &Camera) -> RenderResult<FenceValue> {
        self.begin_frame()?;
        self.update(scene, camera)?;
        self.draw(scene)
    }

    /// Block until the GPU has finished everything submitted so far
    pub fn flush(&mut self) -> RenderResult<()> {
        let value = self.fence.flush()?;
        log::debug!("Flushed GPU through fence {}", value);
        Ok(())
    }

    /// Adapt to a new surface size
    ///
    /// Waits for the GPU, then recreates the back buffer and depth buffer
    /// state and restarts back buffer rotation.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        log::info!("Resizing render context to {}x{}", width, height);
        self.flush()?;

        self.config.width = width;
        self.config.height = height;
        self.orchestrator.resize(width, height);
        register_surface_resources(&mut self.tracker, &self.config)?;
        self.back_buffer = 0;
        Ok(())
    }

    /// Enable or disable the shadow debug pass
    pub fn set_shadow_debug(&mut self, enabled: bool) {
        self.config.draw_shadow_debug = enabled;
        self.orchestrator.set_shadow_debug(enabled);
    }

    /// Renderer settings in effect
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The GPU timeline
    pub fn fence(&self) -> &FenceSync {
        &self.fence
    }

    /// Frames-in-flight ring
    pub fn ring(&self) -> &FrameResourceRing {
        &self.ring
    }

    /// Resource state tracker
    pub fn tracker(&self) -> &ResourceStateTracker {
        &self.tracker
    }

    /// Descriptor table
    pub fn descriptors(&self) -> &DescriptorTable {
        &self.descriptors
    }

    /// Pass orchestrator
    pub fn orchestrator(&self) -> &PassOrchestrator {
        &self.orchestrator
    }

    /// Back buffer the next frame renders into
    pub fn back_buffer_index(&self) -> u32 {
        self.back_buffer
    }

    /// Frames submitted so far
    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Light-space transforms of the last update
    pub fn shadow_transforms(&self) -> Option<&ShadowTransforms> {
        self.shadow.as_ref()
    }

    /// Main pass constants of the last update
    pub fn main_pass_constants(&self) -> Option<&PassConstants> {
        self.main_pass.as_ref()
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        if self.fence.last_issued() == 0 {
            return;
        }
        if let Err(e) = self.flush() {
            log::warn!("GPU not drained at shutdown: {}", e);
        }
    }
}

fn register_transient_resources(tracker: &mut ResourceStateTracker, config: &RendererConfig) -> RenderResult<()> {
    tracker.register(
        TransientResource::ShadowMap,
        ResourceState::GenericRead,
        ResourceUsage::DEPTH_STENCIL | ResourceUsage::SHADER_RESOURCE,
    )?;
    tracker.register(
        TransientResource::CubeMapColor,
        ResourceState::GenericRead,
        ResourceUsage::RENDER_TARGET | ResourceUsage::SHADER_RESOURCE,
    )?;
    tracker.register(
        TransientResource::CubeMapDepth,
        ResourceState::Common,
        ResourceUsage::DEPTH_STENCIL,
    )?;
    register_surface_resources(tracker, config)
}

fn register_surface_resources(tracker: &mut ResourceStateTracker, config: &RendererConfig) -> RenderResult<()> {
    for index in 0..config.back_buffer_count {
        tracker.register(
            TransientResource::BackBuffer(index),
            ResourceState::Present,
            ResourceUsage::RENDER_TARGET | ResourceUsage::PRESENT,
        )?;
    }
    tracker.register(
        TransientResource::DepthBuffer,
        ResourceState::DepthWrite,
        ResourceUsage::DEPTH_STENCIL,
    )
}

fn reflective_center(scene: &Scene) -> Option<Vec3> {
    let id = *scene.layer(RenderLayer::Reflective).first()?;
    scene.item(id).map(|item| item.world().translation_part())
}
