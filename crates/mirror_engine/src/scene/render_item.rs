//! Drawable scene entries

use crate::foundation::math::Mat4;
use crate::scene::geometry::Submesh;
use crate::scene::{MaterialId, MeshId};

/// Draw category; each layer is drawn by a fixed pass with its own pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderLayer {
    /// Lit, shadow-casting geometry
    Opaque,
    /// Sky box
    Sky,
    /// Shadow map visualization quad
    ShadowDebug,
    /// Geometry sampling the dynamic cube map
    Reflective,
}

impl RenderLayer {
    /// Number of layers
    pub const COUNT: usize = 4;

    /// All layers
    pub const ALL: [RenderLayer; RenderLayer::COUNT] = [
        RenderLayer::Opaque,
        RenderLayer::Sky,
        RenderLayer::ShadowDebug,
        RenderLayer::Reflective,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            RenderLayer::Opaque => 0,
            RenderLayer::Sky => 1,
            RenderLayer::ShadowDebug => 2,
            RenderLayer::Reflective => 3,
        }
    }
}

/// Parameters used to create a render item
#[derive(Debug, Clone)]
pub struct RenderItemDesc {
    /// Unique name
    pub name: String,
    /// Object to world
    pub world: Mat4,
    /// Geometry
    pub mesh: MeshId,
    /// Submesh of `mesh` to draw
    pub submesh: String,
    /// Material
    pub material: MaterialId,
    /// Layer the item is drawn in
    pub layer: RenderLayer,
}

impl RenderItemDesc {
    /// Opaque item with identity transform
    pub fn new(name: impl Into<String>, mesh: MeshId, submesh: impl Into<String>, material: MaterialId) -> Self {
        Self {
            name: name.into(),
            world: Mat4::identity(),
            mesh,
            submesh: submesh.into(),
            material,
            layer: RenderLayer::Opaque,
        }
    }

    /// Set the world transform
    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    /// Set the layer
    pub fn in_layer(mut self, layer: RenderLayer) -> Self {
        self.layer = layer;
        self
    }
}

/// A drawable instance of a submesh
#[derive(Debug, Clone)]
pub struct RenderItem {
    /// Unique name
    pub name: String,
    /// Layer the item is drawn in
    pub layer: RenderLayer,
    /// Slot in the per-frame object constant buffer
    pub object_index: usize,
    /// Geometry
    pub mesh: MeshId,
    /// Drawn index range and its object-space bounds
    pub submesh: Submesh,
    /// Material
    pub material: MaterialId,
    /// Frame bundles that still hold a stale world transform
    pub frames_dirty: usize,
    world: Mat4,
    frames_in_flight: usize,
}

impl RenderItem {
    pub(crate) fn new(
        desc: RenderItemDesc,
        submesh: Submesh,
        object_index: usize,
        frames_in_flight: usize,
    ) -> Self {
        Self {
            name: desc.name,
            layer: desc.layer,
            object_index,
            mesh: desc.mesh,
            submesh,
            material: desc.material,
            frames_dirty: frames_in_flight,
            world: desc.world,
            frames_in_flight,
        }
    }

    /// Object to world
    pub fn world(&self) -> &Mat4 {
        &self.world
    }

    /// Replace the world transform and mark every frame bundle stale
    pub fn set_world(&mut self, world: Mat4) {
        self.world = world;
        self.frames_dirty = self.frames_in_flight;
    }
}
