//! Frame pass orchestration
//!
//! Every frame is recorded as the same fixed sequence of passes:
//!
//! ```text
//! Shadow -> CubeFace(0..5) -> MainOpaque -> [ShadowDebug] -> Skybox -> Reflection -> Present
//! ```
//!
//! The shadow and cube map passes write resources that later passes
//! sample, so each writer transitions its targets back to a shader-readable
//! state before the main pass begins. The orchestrator refuses to enter a
//! pass out of order and refuses to start the main pass while either
//! resource is still writable.

pub mod cube_map;
pub mod frame_constants;
pub mod shadow;

use std::fmt;

use crate::core::config::RendererConfig;
use crate::render::commands::{
    Command, CommandList, DrawCall, PipelineKind, ScissorRect, TargetView, Viewport,
};
use crate::render::constants::{
    cube_face_slot, MaterialConstants, ObjectConstants, PassConstants, MAIN_PASS_SLOT,
    SHADOW_PASS_SLOT,
};
use crate::render::descriptors::{DescriptorSlot, DescriptorTable};
use crate::render::state_tracker::{ResourceState, ResourceStateTracker, TransientResource};
use crate::render::upload_buffer::UploadBuffer;
use crate::render::{RenderError, RenderResult};
use crate::scene::{RenderLayer, Scene};
use crate::sync::FrameResourceBundle;

pub use cube_map::{CubeMapTarget, CUBE_FACE_COUNT};
pub use shadow::{ShadowMap, ShadowTransforms};

/// Passes of a frame, in recording order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassStage {
    /// Depth from the light's point of view
    Shadow,
    /// One face of the dynamic cube map
    CubeFace(u8),
    /// Opaque geometry into the back buffer
    MainOpaque,
    /// Shadow map visualization quad
    ShadowDebug,
    /// Sky box
    Skybox,
    /// Items sampling the dynamic cube map
    Reflection,
    /// Back buffer handed to presentation
    Present,
}

impl PassStage {
    /// Position in the fixed frame sequence
    pub fn ordinal(self) -> u32 {
        match self {
            PassStage::Shadow => 0,
            PassStage::CubeFace(face) => 1 + face as u32,
            PassStage::MainOpaque => 7,
            PassStage::ShadowDebug => 8,
            PassStage::Skybox => 9,
            PassStage::Reflection => 10,
            PassStage::Present => 11,
        }
    }
}

impl fmt::Display for PassStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassStage::CubeFace(face) => write!(f, "cube face {}", face),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Borrowed per-frame state the passes record against
struct FrameRecorder<'a> {
    commands: &'a mut CommandList,
    tracker: &'a mut ResourceStateTracker,
    scene: &'a Scene,
    pass_constants: &'a UploadBuffer<PassConstants>,
    object_constants: &'a UploadBuffer<ObjectConstants>,
    material_constants: &'a UploadBuffer<MaterialConstants>,
}

impl FrameRecorder<'_> {
    fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    fn transition(&mut self, resource: TransientResource, from: ResourceState, to: ResourceState) -> RenderResult<()> {
        self.tracker.transition(self.commands, resource, from, to)
    }

    fn bind_pass(&mut self, slot: usize) -> RenderResult<()> {
        let offset = self.pass_constants.offset(slot)?;
        self.push(Command::BindPassConstants { slot, offset });
        Ok(())
    }

    fn set_target_area(&mut self, viewport: Viewport, scissor: ScissorRect) {
        self.push(Command::SetViewport(viewport));
        self.push(Command::SetScissor(scissor));
    }

    /// Draw every item of `layer` in insertion order
    fn draw_layer(&mut self, layer: RenderLayer) -> RenderResult<usize> {
        let scene = self.scene;
        let mut drawn = 0;
        for &id in scene.layer(layer) {
            let item = scene
                .item(id)
                .ok_or_else(|| RenderError::RenderItemNotFound(format!("{:?}", id)))?;
            let material = scene
                .material(item.material)
                .ok_or_else(|| RenderError::MaterialNotFound(format!("material of '{}'", item.name)))?;

            let draw = DrawCall {
                item: id,
                mesh: item.mesh,
                object_offset: self.object_constants.offset(item.object_index)?,
                material_offset: self.material_constants.offset(material.constant_index)?,
                index_count: item.submesh.index_count,
                start_index: item.submesh.start_index,
                base_vertex: item.submesh.base_vertex,
            };
            self.push(Command::DrawIndexed(draw));
            drawn += 1;
        }
        Ok(drawn)
    }
}

/// Records the fixed pass sequence of a frame
pub struct PassOrchestrator {
    shadow_map: ShadowMap,
    cube_map: CubeMapTarget,
    viewport: Viewport,
    scissor: ScissorRect,
    clear_color: [f32; 4],
    cube_clear_color: [f32; 4],
    draw_shadow_debug: bool,
    shadow_slot: DescriptorSlot,
    dynamic_cube_slot: DescriptorSlot,
    sky_slot: Option<DescriptorSlot>,
    current: Option<PassStage>,
    recorded: Vec<PassStage>,
}

impl PassOrchestrator {
    /// Create an orchestrator sampling the shadow map and dynamic cube map from the given slots
    pub fn new(config: &RendererConfig, shadow_slot: DescriptorSlot, dynamic_cube_slot: DescriptorSlot) -> Self {
        log::debug!(
            "Creating PassOrchestrator: shadow map {}px, cube map {}px",
            config.shadow_map_size,
            config.cube_map_size
        );
        Self {
            shadow_map: ShadowMap::new(config.shadow_map_size),
            cube_map: CubeMapTarget::new(config.cube_map_size, Default::default()),
            viewport: Viewport::new(config.width, config.height),
            scissor: ScissorRect::new(config.width, config.height),
            clear_color: config.clear_color,
            cube_clear_color: config.cube_clear_color,
            draw_shadow_debug: config.draw_shadow_debug,
            shadow_slot,
            dynamic_cube_slot,
            sky_slot: None,
            current: None,
            recorded: Vec::with_capacity(12),
        }
    }

    /// Static cube texture sampled for environment lighting and the sky
    pub fn set_sky_cube(&mut self, slot: Option<DescriptorSlot>) {
        self.sky_slot = slot;
    }

    /// Enable or disable the shadow debug pass
    pub fn set_shadow_debug(&mut self, enabled: bool) {
        self.draw_shadow_debug = enabled;
    }

    /// Whether the shadow debug pass is recorded
    pub fn shadow_debug(&self) -> bool {
        self.draw_shadow_debug
    }

    /// Update the main viewport after a resize
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
        self.scissor = ScissorRect::new(width, height);
    }

    /// Shadow map target
    pub fn shadow_map(&self) -> &ShadowMap {
        &self.shadow_map
    }

    /// Dynamic cube map target
    pub fn cube_map(&self) -> &CubeMapTarget {
        &self.cube_map
    }

    /// Mutable dynamic cube map target
    pub fn cube_map_mut(&mut self) -> &mut CubeMapTarget {
        &mut self.cube_map
    }

    /// Passes recorded by the last frame, in order
    pub fn recorded_passes(&self) -> &[PassStage] {
        &self.recorded
    }

    /// Forget the pass history before recording a new frame
    pub fn begin_frame(&mut self) {
        self.current = None;
        self.recorded.clear();
    }

    /// Enter `stage`, which must come after the current pass
    pub fn begin_pass(&mut self, commands: &mut CommandList, stage: PassStage) -> RenderResult<()> {
        if let Some(previous) = self.current {
            if stage.ordinal() <= previous.ordinal() {
                log::error!("Pass {} recorded after {}", stage, previous);
                return Err(RenderError::PassOrder { previous, next: stage });
            }
        }
        log::trace!("Begin pass {}", stage);
        self.current = Some(stage);
        self.recorded.push(stage);
        commands.push(Command::BeginPass(stage));
        Ok(())
    }

    /// Record the whole frame into `bundle`'s command list
    pub fn record_frame(
        &mut self,
        bundle: &mut FrameResourceBundle,
        tracker: &mut ResourceStateTracker,
        descriptors: &DescriptorTable,
        scene: &Scene,
        back_buffer: u32,
    ) -> RenderResult<()> {
        self.begin_frame();

        let mut recorder = FrameRecorder {
            commands: &mut bundle.commands,
            tracker,
            scene,
            pass_constants: &bundle.pass_constants,
            object_constants: &bundle.object_constants,
            material_constants: &bundle.material_constants,
        };

        recorder.push(Command::BindDescriptorTable { len: descriptors.len() as u32 });
        self.record_shadow_pass(&mut recorder)?;
        self.record_cube_map_passes(&mut recorder)?;
        self.record_main_passes(&mut recorder, back_buffer)?;
        recorder.commands.close();

        log::trace!(
            "Recorded frame: {} commands, {} passes",
            recorder.commands.len(),
            self.recorded.len()
        );
        Ok(())
    }

    fn record_shadow_pass(&mut self, rec: &mut FrameRecorder<'_>) -> RenderResult<()> {
        self.begin_pass(rec.commands, PassStage::Shadow)?;
        let target = TargetView::whole(TransientResource::ShadowMap);

        rec.set_target_area(self.shadow_map.viewport(), self.shadow_map.scissor());
        rec.transition(TransientResource::ShadowMap, ResourceState::GenericRead, ResourceState::DepthWrite)?;
        rec.push(Command::ClearDepthStencil { target, depth: 1.0, stencil: 0 });
        rec.push(Command::SetRenderTargets { color: None, depth: Some(target) });
        rec.bind_pass(SHADOW_PASS_SLOT)?;
        rec.push(Command::SetPipeline(PipelineKind::ShadowCaster));
        rec.draw_layer(RenderLayer::Opaque)?;
        rec.transition(TransientResource::ShadowMap, ResourceState::DepthWrite, ResourceState::GenericRead)
    }

    fn record_cube_map_passes(&mut self, rec: &mut FrameRecorder<'_>) -> RenderResult<()> {
        let depth = TargetView::whole(TransientResource::CubeMapDepth);

        rec.set_target_area(self.cube_map.viewport(), self.cube_map.scissor());
        rec.transition(TransientResource::CubeMapColor, ResourceState::GenericRead, ResourceState::RenderTarget)?;
        rec.transition(TransientResource::CubeMapDepth, ResourceState::Common, ResourceState::DepthWrite)?;

        for face in 0..CUBE_FACE_COUNT {
            self.begin_pass(rec.commands, PassStage::CubeFace(face as u8))?;
            let color = TargetView::slice(TransientResource::CubeMapColor, face as u32);

            rec.push(Command::ClearRenderTarget { target: color, color: self.cube_clear_color });
            rec.push(Command::ClearDepthStencil { target: depth, depth: 1.0, stencil: 0 });
            rec.push(Command::SetRenderTargets { color: Some(color), depth: Some(depth) });
            rec.bind_pass(cube_face_slot(face))?;
            if let Some(sky) = self.sky_slot {
                rec.push(Command::BindCubeMap(sky));
            }
            rec.push(Command::SetPipeline(PipelineKind::Opaque));
            rec.draw_layer(RenderLayer::Opaque)?;
            rec.push(Command::SetPipeline(PipelineKind::Sky));
            rec.draw_layer(RenderLayer::Sky)?;
        }

        rec.transition(TransientResource::CubeMapColor, ResourceState::RenderTarget, ResourceState::GenericRead)?;
        rec.transition(TransientResource::CubeMapDepth, ResourceState::DepthWrite, ResourceState::Common)
    }

    fn record_main_passes(&mut self, rec: &mut FrameRecorder<'_>, back_buffer: u32) -> RenderResult<()> {
        self.begin_pass(rec.commands, PassStage::MainOpaque)?;
        rec.tracker.expect_state(TransientResource::ShadowMap, ResourceState::GenericRead)?;
        rec.tracker.expect_state(TransientResource::CubeMapColor, ResourceState::GenericRead)?;

        let color = TargetView::whole(TransientResource::BackBuffer(back_buffer));
        let depth = TargetView::whole(TransientResource::DepthBuffer);

        rec.set_target_area(self.viewport, self.scissor);
        rec.transition(color.resource, ResourceState::Present, ResourceState::RenderTarget)?;
        rec.push(Command::ClearRenderTarget { target: color, color: self.clear_color });
        rec.push(Command::ClearDepthStencil { target: depth, depth: 1.0, stencil: 0 });
        rec.push(Command::SetRenderTargets { color: Some(color), depth: Some(depth) });
        rec.bind_pass(MAIN_PASS_SLOT)?;
        rec.push(Command::BindShadowMap(self.shadow_slot));
        if let Some(sky) = self.sky_slot {
            rec.push(Command::BindCubeMap(sky));
        }
        rec.push(Command::SetPipeline(PipelineKind::Opaque));
        rec.draw_layer(RenderLayer::Opaque)?;

        if self.draw_shadow_debug {
            self.begin_pass(rec.commands, PassStage::ShadowDebug)?;
            rec.push(Command::SetPipeline(PipelineKind::ShadowDebug));
            rec.draw_layer(RenderLayer::ShadowDebug)?;
        }

        self.begin_pass(rec.commands, PassStage::Skybox)?;
        rec.push(Command::SetPipeline(PipelineKind::Sky));
        rec.draw_layer(RenderLayer::Sky)?;

        self.begin_pass(rec.commands, PassStage::Reflection)?;
        rec.push(Command::BindCubeMap(self.dynamic_cube_slot));
        rec.push(Command::SetPipeline(PipelineKind::Reflective));
        rec.draw_layer(RenderLayer::Reflective)?;

        self.begin_pass(rec.commands, PassStage::Present)?;
        rec.transition(color.resource, ResourceState::RenderTarget, ResourceState::Present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> PassOrchestrator {
        PassOrchestrator::new(&RendererConfig::default(), DescriptorSlot(0), DescriptorSlot(1))
    }

    #[test]
    fn test_stage_ordinals_follow_frame_order() {
        let order = [
            PassStage::Shadow,
            PassStage::CubeFace(0),
            PassStage::CubeFace(5),
            PassStage::MainOpaque,
            PassStage::ShadowDebug,
            PassStage::Skybox,
            PassStage::Reflection,
            PassStage::Present,
        ];
        assert!(order.windows(2).all(|pair| pair[0].ordinal() < pair[1].ordinal()));
    }

    #[test]
    fn test_out_of_order_pass_is_rejected() {
        let mut passes = orchestrator();
        let mut commands = CommandList::new();
        passes.begin_pass(&mut commands, PassStage::MainOpaque).unwrap();

        assert_eq!(
            passes.begin_pass(&mut commands, PassStage::Shadow),
            Err(RenderError::PassOrder {
                previous: PassStage::MainOpaque,
                next: PassStage::Shadow,
            })
        );
    }

    #[test]
    fn test_repeating_a_pass_is_rejected() {
        let mut passes = orchestrator();
        let mut commands = CommandList::new();
        passes.begin_pass(&mut commands, PassStage::CubeFace(2)).unwrap();
        assert!(passes.begin_pass(&mut commands, PassStage::CubeFace(2)).is_err());
    }

    #[test]
    fn test_begin_frame_resets_order() {
        let mut passes = orchestrator();
        let mut commands = CommandList::new();
        passes.begin_pass(&mut commands, PassStage::Present).unwrap();
        passes.begin_frame();
        passes.begin_pass(&mut commands, PassStage::Shadow).unwrap();
        assert_eq!(passes.recorded_passes(), &[PassStage::Shadow]);
    }
}
