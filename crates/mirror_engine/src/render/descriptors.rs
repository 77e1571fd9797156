//! Shader-visible descriptor table
//!
//! A flat, append-only array of texture views. Once a name is assigned a
//! slot it keeps that slot for the lifetime of the table, so slot indices
//! can be baked into material constants.

use std::collections::HashMap;
use std::fmt;

use crate::render::{RenderError, RenderResult};
use crate::scene::material::TextureClass;

/// Name under which the shadow map is registered
pub const SHADOW_MAP_DESCRIPTOR: &str = "__shadow_map";
/// Name under which the dynamic cube map is registered
pub const DYNAMIC_CUBE_DESCRIPTOR: &str = "__dynamic_cube_map";

/// Stable index into the descriptor table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DescriptorSlot(pub u32);

impl DescriptorSlot {
    /// Slot index as uploaded to shaders
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DescriptorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// What a descriptor views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// 2D texture (diffuse or normal map)
    Texture2D,
    /// Static cube texture
    TextureCube,
    /// Shadow map depth as a 2D texture
    ShadowMap,
    /// Dynamic cube map color
    DynamicCubeMap,
}

impl From<TextureClass> for DescriptorKind {
    fn from(class: TextureClass) -> Self {
        match class {
            TextureClass::Diffuse | TextureClass::Normal => DescriptorKind::Texture2D,
            TextureClass::Cube => DescriptorKind::TextureCube,
        }
    }
}

/// One table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorEntry {
    /// Resource name
    pub name: String,
    /// View kind
    pub kind: DescriptorKind,
}

/// Append-only descriptor table
#[derive(Debug)]
pub struct DescriptorTable {
    entries: Vec<DescriptorEntry>,
    by_name: HashMap<String, DescriptorSlot>,
    capacity: u32,
}

impl DescriptorTable {
    /// Create a table with room for `capacity` descriptors
    pub fn new(capacity: u32) -> Self {
        log::debug!("Creating descriptor table with {} slots", capacity);
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            capacity,
        }
    }

    /// Assign a slot to `name`, or return the one it already has
    pub fn register(&mut self, name: &str, kind: DescriptorKind) -> RenderResult<DescriptorSlot> {
        if let Some(&slot) = self.by_name.get(name) {
            let existing = self.entries[slot.0 as usize].kind;
            if existing != kind {
                log::warn!(
                    "Descriptor '{}' already registered as {:?}, keeping {} (requested {:?})",
                    name,
                    existing,
                    slot,
                    kind
                );
            }
            return Ok(slot);
        }

        let next = self.entries.len() as u32;
        if next >= self.capacity {
            log::error!("Descriptor table full ({} slots), cannot add '{}'", self.capacity, name);
            return Err(RenderError::DescriptorTableFull { capacity: self.capacity });
        }

        let slot = DescriptorSlot(next);
        self.entries.push(DescriptorEntry {
            name: name.to_string(),
            kind,
        });
        self.by_name.insert(name.to_string(), slot);
        log::trace!("Descriptor '{}' ({:?}) -> {}", name, kind, slot);
        Ok(slot)
    }

    /// Register an imported texture according to its class
    pub fn register_texture(&mut self, name: &str, class: TextureClass) -> RenderResult<DescriptorSlot> {
        self.register(name, class.into())
    }

    /// Slot assigned to `name`
    pub fn slot_of(&self, name: &str) -> RenderResult<DescriptorSlot> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::TextureNotFound(name.to_string()))
    }

    /// Entry stored at `slot`
    pub fn entry(&self, slot: DescriptorSlot) -> Option<&DescriptorEntry> {
        self.entries.get(slot.0 as usize)
    }

    /// First slot holding a static cube texture
    pub fn first_cube_texture(&self) -> Option<DescriptorSlot> {
        self.entries
            .iter()
            .position(|entry| entry.kind == DescriptorKind::TextureCube)
            .map(|index| DescriptorSlot(index as u32))
    }

    /// Slots in use
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of slots
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = (DescriptorSlot, &DescriptorEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (DescriptorSlot(index as u32), entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_assigned_in_order() {
        let mut table = DescriptorTable::new(8);
        let a = table.register_texture("bricks.dds", TextureClass::Diffuse).unwrap();
        let b = table.register_texture("bricks_nmap.dds", TextureClass::Normal).unwrap();
        assert_eq!(a, DescriptorSlot(0));
        assert_eq!(b, DescriptorSlot(1));
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut table = DescriptorTable::new(8);
        let first = table.register_texture("tile.dds", TextureClass::Diffuse).unwrap();
        table.register_texture("grass.dds", TextureClass::Diffuse).unwrap();
        let again = table.register_texture("tile.dds", TextureClass::Diffuse).unwrap();
        assert_eq!(first, again);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_cube_textures_route_to_cube_views() {
        let mut table = DescriptorTable::new(8);
        table.register_texture("tile.dds", TextureClass::Diffuse).unwrap();
        let sky = table.register_texture("grasscube1024.dds", TextureClass::Cube).unwrap();
        assert_eq!(table.entry(sky).unwrap().kind, DescriptorKind::TextureCube);
        assert_eq!(table.first_cube_texture(), Some(sky));
    }

    #[test]
    fn test_full_table_is_rejected() {
        let mut table = DescriptorTable::new(1);
        table.register("a", DescriptorKind::Texture2D).unwrap();
        assert_eq!(
            table.register("b", DescriptorKind::Texture2D),
            Err(RenderError::DescriptorTableFull { capacity: 1 })
        );
    }

    #[test]
    fn test_missing_name_is_a_typed_error() {
        let table = DescriptorTable::new(4);
        assert_eq!(
            table.slot_of("missing.dds"),
            Err(RenderError::TextureNotFound("missing.dds".to_string()))
        );
    }
}
