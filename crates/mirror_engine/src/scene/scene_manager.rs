//! Scene ownership
//!
//! The scene owns every mesh, material and render item in slotmap arenas.
//! Render items refer to meshes and materials by key, and layer lists hold
//! item keys grouped by draw category. Object and material constant slots
//! are assigned in creation order and never change.

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::descriptors::DescriptorSlot;
use crate::render::lighting::Light;
use crate::render::{RenderError, RenderResult};
use crate::scene::bounds::{Aabb, BoundingSphere};
use crate::scene::geometry::MeshGeometry;
use crate::scene::material::{Material, MaterialDesc};
use crate::scene::render_item::{RenderItem, RenderItemDesc, RenderLayer};
use crate::scene::{MaterialId, MeshId, RenderItemId};

/// Owner of all scene data
pub struct Scene {
    meshes: SlotMap<MeshId, MeshGeometry>,
    mesh_names: HashMap<String, MeshId>,
    materials: SlotMap<MaterialId, Material>,
    material_names: HashMap<String, MaterialId>,
    material_order: Vec<MaterialId>,
    items: SlotMap<RenderItemId, RenderItem>,
    item_names: HashMap<String, RenderItemId>,
    item_order: Vec<RenderItemId>,
    layers: [Vec<RenderItemId>; RenderLayer::COUNT],
    lights: Vec<Light>,
    bounds_override: Option<BoundingSphere>,
    frames_in_flight: usize,
}

impl Scene {
    /// Create an empty scene whose dirty counters cover `frames_in_flight` bundles
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            meshes: SlotMap::with_key(),
            mesh_names: HashMap::new(),
            materials: SlotMap::with_key(),
            material_names: HashMap::new(),
            material_order: Vec::new(),
            items: SlotMap::with_key(),
            item_names: HashMap::new(),
            item_order: Vec::new(),
            layers: Default::default(),
            lights: Vec::new(),
            bounds_override: None,
            frames_in_flight,
        }
    }

    // Meshes

    /// Take ownership of a geometry; a geometry with the same name is replaced in the name map
    pub fn add_mesh(&mut self, geometry: MeshGeometry) -> MeshId {
        let name = geometry.name().to_string();
        let id = self.meshes.insert(geometry);
        if self.mesh_names.insert(name.clone(), id).is_some() {
            log::warn!("Mesh name '{}' registered twice", name);
        }
        id
    }

    /// Mesh by key
    pub fn mesh(&self, id: MeshId) -> Option<&MeshGeometry> {
        self.meshes.get(id)
    }

    /// Mesh key by name
    pub fn mesh_id(&self, name: &str) -> RenderResult<MeshId> {
        self.mesh_names
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::MeshNotFound(name.to_string()))
    }

    // Materials

    /// Create a material; its constant slot is the next free one
    pub fn add_material(&mut self, desc: MaterialDesc) -> MaterialId {
        let name = desc.name.clone();
        let material = Material::from_desc(desc, self.material_order.len(), self.frames_in_flight);
        let id = self.materials.insert(material);
        self.material_order.push(id);
        if self.material_names.insert(name.clone(), id).is_some() {
            log::warn!("Material name '{}' registered twice", name);
        }
        id
    }

    /// Material by key
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Material key by name
    pub fn material_id(&self, name: &str) -> RenderResult<MaterialId> {
        self.material_names
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::MaterialNotFound(name.to_string()))
    }

    /// Materials in constant slot order
    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.material_order
            .iter()
            .filter_map(move |&id| self.materials.get(id).map(|material| (id, material)))
    }

    /// Mutable materials in arbitrary order
    pub fn materials_mut(&mut self) -> impl Iterator<Item = &mut Material> {
        self.materials.values_mut()
    }

    /// Point a material at a normal map resolved after the material was built
    pub fn patch_normal_slot(&mut self, name: &str, slot: DescriptorSlot) -> RenderResult<()> {
        let id = self.material_id(name)?;
        let frames = self.frames_in_flight;
        let material = self
            .materials
            .get_mut(id)
            .ok_or_else(|| RenderError::MaterialNotFound(name.to_string()))?;
        log::debug!("Material '{}' normal map -> {}", name, slot);
        material.normal_slot = slot;
        material.frames_dirty = frames;
        Ok(())
    }

    /// Number of materials
    pub fn material_count(&self) -> usize {
        self.material_order.len()
    }

    // Render items

    /// Create a render item and append it to its layer
    pub fn add_render_item(&mut self, desc: RenderItemDesc) -> RenderResult<RenderItemId> {
        if !self.materials.contains_key(desc.material) {
            return Err(RenderError::MaterialNotFound(format!("material of '{}'", desc.name)));
        }
        let geometry = self
            .meshes
            .get(desc.mesh)
            .ok_or_else(|| RenderError::MeshNotFound(format!("mesh of '{}'", desc.name)))?;
        let submesh = geometry.submesh(&desc.submesh)?;

        let name = desc.name.clone();
        let layer = desc.layer;
        let item = RenderItem::new(desc, submesh, self.item_order.len(), self.frames_in_flight);
        let id = self.items.insert(item);

        self.item_order.push(id);
        self.layers[layer.index()].push(id);
        if self.item_names.insert(name.clone(), id).is_some() {
            log::warn!("Render item name '{}' registered twice", name);
        }
        Ok(id)
    }

    /// Render item by key
    pub fn item(&self, id: RenderItemId) -> Option<&RenderItem> {
        self.items.get(id)
    }

    /// Render item key by name
    pub fn item_id(&self, name: &str) -> RenderResult<RenderItemId> {
        self.item_names
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::RenderItemNotFound(name.to_string()))
    }

    /// Items in object constant slot order
    pub fn items(&self) -> impl Iterator<Item = (RenderItemId, &RenderItem)> {
        self.item_order
            .iter()
            .filter_map(move |&id| self.items.get(id).map(|item| (id, item)))
    }

    /// Mutable items in arbitrary order
    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut RenderItem> {
        self.items.values_mut()
    }

    /// Item keys drawn in `layer`, in insertion order
    pub fn layer(&self, layer: RenderLayer) -> &[RenderItemId] {
        &self.layers[layer.index()]
    }

    /// Number of render items
    pub fn item_count(&self) -> usize {
        self.item_order.len()
    }

    /// World transform of an item
    pub fn world(&self, id: RenderItemId) -> RenderResult<Mat4> {
        self.items
            .get(id)
            .map(|item| *item.world())
            .ok_or_else(|| RenderError::RenderItemNotFound(format!("{:?}", id)))
    }

    /// Replace an item's world transform
    pub fn set_world(&mut self, id: RenderItemId, world: Mat4) -> RenderResult<()> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| RenderError::RenderItemNotFound(format!("{:?}", id)))?;
        item.set_world(world);
        Ok(())
    }

    // Lighting and bounds

    /// Append a light; the first light drives the shadow pass
    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Scene lights
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Mutable scene lights
    pub fn lights_mut(&mut self) -> &mut Vec<Light> {
        &mut self.lights
    }

    /// Direction of the shadow-casting light
    pub fn shadow_light_direction(&self) -> Vec3 {
        self.lights
            .first()
            .map(Light::direction)
            .unwrap_or_else(|| Vec3::new(0.57735, -0.57735, 0.57735))
    }

    /// Fix the bounding sphere the shadow frustum is fit to
    pub fn set_bounds(&mut self, bounds: BoundingSphere) {
        self.bounds_override = Some(bounds);
    }

    /// Bounding sphere of the scene
    ///
    /// Either the fixed sphere, or the sphere around the world bounds of
    /// all opaque and reflective items.
    pub fn bounds(&self) -> BoundingSphere {
        if let Some(bounds) = self.bounds_override {
            return bounds;
        }

        let world_boxes = [RenderLayer::Opaque, RenderLayer::Reflective]
            .iter()
            .flat_map(|&layer| self.layer(layer))
            .filter_map(|&id| self.items.get(id))
            .map(|item| item.submesh.bounds.transformed(item.world()));

        let union = world_boxes.reduce(|a, b| a.union(&b));
        match union {
            Some(aabb) => BoundingSphere::from_aabb(&aabb),
            None => BoundingSphere::from_aabb(&Aabb::new(Vec3::zeros(), Vec3::zeros())),
        }
    }

    /// Ring size the dirty counters are reset to
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Mark every item and material stale in all frame bundles
    pub fn mark_all_dirty(&mut self) {
        let frames = self.frames_in_flight;
        for item in self.items.values_mut() {
            item.frames_dirty = frames;
        }
        for material in self.materials.values_mut() {
            material.frames_dirty = frames;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::geometry::create_box;
    use approx::assert_relative_eq;

    fn scene_with_box() -> (Scene, RenderItemId) {
        let mut scene = Scene::new(3);
        let mesh = scene.add_mesh(MeshGeometry::new("shapes").with_submesh("box", create_box(2.0, 2.0, 2.0)));
        let material = scene.add_material(MaterialDesc::new("stone", DescriptorSlot(0)));
        let item = scene
            .add_render_item(RenderItemDesc::new("box", mesh, "box", material))
            .unwrap();
        (scene, item)
    }

    #[test]
    fn test_items_get_sequential_constant_slots() {
        let (mut scene, first) = scene_with_box();
        let mesh = scene.mesh_id("shapes").unwrap();
        let material = scene.material_id("stone").unwrap();
        let second = scene
            .add_render_item(RenderItemDesc::new("box2", mesh, "box", material))
            .unwrap();

        assert_eq!(scene.item(first).unwrap().object_index, 0);
        assert_eq!(scene.item(second).unwrap().object_index, 1);
        assert_eq!(scene.layer(RenderLayer::Opaque), &[first, second]);
    }

    #[test]
    fn test_new_items_are_dirty_for_every_bundle() {
        let (scene, item) = scene_with_box();
        assert_eq!(scene.item(item).unwrap().frames_dirty, 3);
    }

    #[test]
    fn test_set_world_marks_item_dirty() {
        let (mut scene, item) = scene_with_box();
        scene.items_mut().for_each(|item| item.frames_dirty = 0);

        scene.set_world(item, Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0))).unwrap();
        assert_eq!(scene.item(item).unwrap().frames_dirty, 3);
    }

    #[test]
    fn test_lookup_failures_are_typed() {
        let (scene, _) = scene_with_box();
        assert_eq!(scene.material_id("gold"), Err(RenderError::MaterialNotFound("gold".into())));
        assert_eq!(scene.item_id("sphere"), Err(RenderError::RenderItemNotFound("sphere".into())));
        assert_eq!(scene.mesh_id("skull"), Err(RenderError::MeshNotFound("skull".into())));
    }

    #[test]
    fn test_unknown_submesh_is_rejected() {
        let (mut scene, _) = scene_with_box();
        let mesh = scene.mesh_id("shapes").unwrap();
        let material = scene.material_id("stone").unwrap();
        let result = scene.add_render_item(RenderItemDesc::new("cyl", mesh, "cylinder", material));
        assert!(matches!(result, Err(RenderError::MeshNotFound(_))));
    }

    #[test]
    fn test_bounds_follow_world_transforms() {
        let (mut scene, item) = scene_with_box();
        scene
            .set_world(item, Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0)))
            .unwrap();
        let bounds = scene.bounds();
        assert_relative_eq!(bounds.center, Vec3::new(10.0, 0.0, 0.0));
        assert_relative_eq!(bounds.radius, 3.0_f32.sqrt());
    }

    #[test]
    fn test_patch_normal_slot_dirties_material() {
        let (mut scene, _) = scene_with_box();
        scene.materials_mut().for_each(|material| material.frames_dirty = 0);
        scene.patch_normal_slot("stone", DescriptorSlot(7)).unwrap();

        let id = scene.material_id("stone").unwrap();
        let material = scene.material(id).unwrap();
        assert_eq!(material.normal_slot, DescriptorSlot(7));
        assert_eq!(material.frames_dirty, 3);
    }
}
