//! Recorded GPU commands
//!
//! A frame is recorded into one [`CommandList`] and submitted as a whole.
//! The list is backend-neutral; a backend translates it when executing.

use crate::render::descriptors::DescriptorSlot;
use crate::render::passes::PassStage;
use crate::render::state_tracker::{ResourceBarrier, TransientResource};
use crate::scene::{MeshId, RenderItemId};

/// Pipeline state objects the frame switches between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Lit, shadowed opaque geometry
    Opaque,
    /// Depth-only shadow casting
    ShadowCaster,
    /// Sky box
    Sky,
    /// Screen-space quad showing the shadow map
    ShadowDebug,
    /// Opaque geometry sampling the dynamic cube map
    Reflective,
}

/// Viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
    /// Minimum depth
    pub min_depth: f32,
    /// Maximum depth
    pub max_depth: f32,
}

impl Viewport {
    /// Full-target viewport covering `width` x `height` with `[0,1]` depth
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    /// Left
    pub left: i32,
    /// Top
    pub top: i32,
    /// Right (exclusive)
    pub right: i32,
    /// Bottom (exclusive)
    pub bottom: i32,
}

impl ScissorRect {
    /// Scissor covering `width` x `height`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width as i32,
            bottom: height as i32,
        }
    }
}

/// A view of one array slice of a transient resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetView {
    /// Resource the view points at
    pub resource: TransientResource,
    /// Array slice (cube face for the cube map, 0 otherwise)
    pub slice: u32,
}

impl TargetView {
    /// View of slice 0
    pub fn whole(resource: TransientResource) -> Self {
        Self { resource, slice: 0 }
    }

    /// View of one array slice
    pub fn slice(resource: TransientResource, slice: u32) -> Self {
        Self { resource, slice }
    }
}

/// One indexed draw of a render item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Item being drawn
    pub item: RenderItemId,
    /// Geometry the indices refer to
    pub mesh: MeshId,
    /// Byte offset of the item's object constants
    pub object_offset: usize,
    /// Byte offset of the item's material constants
    pub material_offset: usize,
    /// Indices to draw
    pub index_count: u32,
    /// First index
    pub start_index: u32,
    /// Value added to each index
    pub base_vertex: i32,
}

/// A single recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Debug marker opening a pass
    BeginPass(PassStage),
    /// State transition
    Barrier(ResourceBarrier),
    /// Set the rasterizer viewport
    SetViewport(Viewport),
    /// Set the scissor rectangle
    SetScissor(ScissorRect),
    /// Clear a color target
    ClearRenderTarget {
        /// Target cleared
        target: TargetView,
        /// Clear color
        color: [f32; 4],
    },
    /// Clear a depth target
    ClearDepthStencil {
        /// Target cleared
        target: TargetView,
        /// Depth value
        depth: f32,
        /// Stencil value
        stencil: u8,
    },
    /// Bind output targets
    SetRenderTargets {
        /// Color target, absent for depth-only passes
        color: Option<TargetView>,
        /// Depth target
        depth: Option<TargetView>,
    },
    /// Switch pipeline state
    SetPipeline(PipelineKind),
    /// Bind the shader-visible descriptor table
    BindDescriptorTable {
        /// Slots in the table
        len: u32,
    },
    /// Bind a pass constant slot
    BindPassConstants {
        /// Pass slot index
        slot: usize,
        /// Byte offset in the pass constant buffer
        offset: usize,
    },
    /// Bind the shadow map for sampling
    BindShadowMap(DescriptorSlot),
    /// Bind the cube map sampled for environment lighting
    BindCubeMap(DescriptorSlot),
    /// Indexed draw
    DrawIndexed(DrawCall),
}

/// Commands recorded for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandList {
    commands: Vec<Command>,
    closed: bool,
}

impl CommandList {
    /// Create an empty open list
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard recorded commands and reopen the list
    pub fn reset(&mut self) {
        self.commands.clear();
        self.closed = false;
    }

    /// Append a command
    pub fn push(&mut self, command: Command) {
        if self.closed {
            log::warn!("Recording into a closed command list: {:?}", command);
        }
        self.commands.push(command);
    }

    /// Finish recording
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// True once recording has finished
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All commands in recording order
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Recorded barriers in order
    pub fn barriers(&self) -> impl Iterator<Item = &ResourceBarrier> {
        self.commands.iter().filter_map(|command| match command {
            Command::Barrier(barrier) => Some(barrier),
            _ => None,
        })
    }

    /// Recorded draws in order
    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|command| match command {
            Command::DrawIndexed(draw) => Some(draw),
            _ => None,
        })
    }

    /// Pass markers in order
    pub fn passes(&self) -> impl Iterator<Item = PassStage> + '_ {
        self.commands.iter().filter_map(|command| match command {
            Command::BeginPass(stage) => Some(*stage),
            _ => None,
        })
    }

    /// Position of the first command matching `predicate`
    pub fn position(&self, predicate: impl Fn(&Command) -> bool) -> Option<usize> {
        self.commands.iter().position(predicate)
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
