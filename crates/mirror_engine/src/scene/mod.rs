//! Scene data: geometry, materials, render items and their persistence

pub mod bounds;
pub mod geometry;
pub mod material;
pub mod persistence;
pub mod render_item;
pub mod scene_manager;

slotmap::new_key_type! {
    /// Handle to a mesh owned by the scene
    pub struct MeshId;
    /// Handle to a material owned by the scene
    pub struct MaterialId;
    /// Handle to a render item owned by the scene
    pub struct RenderItemId;
}

pub use bounds::{Aabb, BoundingSphere};
pub use geometry::{MeshData, MeshGeometry, Submesh, Vertex};
pub use material::{Material, MaterialDesc, TextureClass};
pub use persistence::PersistenceError;
pub use render_item::{RenderItem, RenderItemDesc, RenderLayer};
pub use scene_manager::Scene;
