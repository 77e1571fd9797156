//! Dragging picked items around
//!
//! Translation is applied along the item's own axes or along the world
//! axes. Rotation happens about the item's pivot: the translation is split
//! off, the remaining matrix is rotated about the origin, and the
//! translation is put back.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::render::camera::Camera;
use crate::render::RenderResult;
use crate::scene::{RenderItemId, Scene};

use super::{PickHit, PickingEngine};

/// Basis a translation is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformSpace {
    /// The item's own (normalized) axes
    Local,
    /// World axes
    #[default]
    World,
}

/// What a drag does to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragMode {
    /// Move the item
    #[default]
    Translate,
    /// Spin the item about its pivot
    Rotate,
}

/// Move an item by `offset`
pub fn translate_item(scene: &mut Scene, id: RenderItemId, offset: Vec3, space: TransformSpace) -> RenderResult<()> {
    let world = scene.world(id)?;
    let delta = match space {
        TransformSpace::World => offset,
        TransformSpace::Local => {
            basis_axis(&world, 0) * offset.x + basis_axis(&world, 1) * offset.y + basis_axis(&world, 2) * offset.z
        }
    };
    scene.set_world(id, world.with_translation(world.translation_part() + delta))
}

/// Rotate an item by `angle` radians about `axis` through its own pivot
pub fn rotate_item(scene: &mut Scene, id: RenderItemId, axis: &Vec3, angle: f32) -> RenderResult<()> {
    let world = scene.world(id)?;
    let translation = world.translation_part();
    let at_origin = world.with_translation(Vec3::zeros());

    let rotated = Mat4::new_translation(&translation) * Mat4::rotation_axis(axis, angle) * at_origin;
    scene.set_world(id, rotated)
}

fn basis_axis(world: &Mat4, column: usize) -> Vec3 {
    let axis = Vec3::new(world[(0, column)], world[(1, column)], world[(2, column)]);
    axis.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
}

/// Selection plus drag state driven by mouse events
#[derive(Debug, Clone)]
pub struct Manipulator {
    selected: Option<RenderItemId>,
    mode: DragMode,
    space: TransformSpace,
    dragging: bool,
    /// World units per pixel
    pub translate_speed: f32,
    /// Degrees per pixel
    pub rotate_speed: f32,
}

impl Manipulator {
    /// Nothing selected, translating in world space
    pub fn new() -> Self {
        Self {
            selected: None,
            mode: DragMode::default(),
            space: TransformSpace::default(),
            dragging: false,
            translate_speed: 0.02,
            rotate_speed: 0.25,
        }
    }

    /// Current selection
    pub fn selected(&self) -> Option<RenderItemId> {
        self.selected
    }

    /// Replace the selection
    pub fn select(&mut self, item: Option<RenderItemId>) {
        self.selected = item;
        if item.is_none() {
            self.dragging = false;
        }
    }

    /// Drag mode
    pub fn mode(&self) -> DragMode {
        self.mode
    }

    /// Set the drag mode
    pub fn set_mode(&mut self, mode: DragMode) {
        self.mode = mode;
    }

    /// Translation basis
    pub fn space(&self) -> TransformSpace {
        self.space
    }

    /// Set the translation basis
    pub fn set_space(&mut self, space: TransformSpace) {
        self.space = space;
    }

    /// Whether a drag is in progress
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Pick under the cursor and start dragging whatever was hit
    ///
    /// Clicking empty space clears the selection.
    pub fn begin_drag(&mut self, picking: &PickingEngine, scene: &Scene, camera: &Camera, x: f32, y: f32) -> Option<PickHit> {
        let hit = picking.pick(scene, camera, x, y);
        self.selected = hit.map(|hit| hit.item);
        self.dragging = hit.is_some();
        if let Some(item) = self.selected.and_then(|id| scene.item(id)) {
            log::debug!("Selected '{}'", item.name);
        }
        hit
    }

    /// Apply a cursor movement of `(dx, dy)` pixels to the selection
    ///
    /// Returns whether anything moved.
    pub fn drag(&mut self, scene: &mut Scene, camera: &Camera, dx: f32, dy: f32) -> RenderResult<bool> {
        let Some(id) = self.selected.filter(|_| self.dragging) else {
            return Ok(false);
        };
        if dx == 0.0 && dy == 0.0 {
            return Ok(false);
        }

        match self.mode {
            DragMode::Translate => {
                let (sx, sy) = (dx * self.translate_speed, -dy * self.translate_speed);
                let offset = match self.space {
                    TransformSpace::World => camera.right() * sx + camera.up() * sy,
                    TransformSpace::Local => Vec3::new(sx, sy, 0.0),
                };
                translate_item(scene, id, offset, self.space)?;
            }
            DragMode::Rotate => {
                let axis = match self.space {
                    TransformSpace::World => Vec3::y(),
                    TransformSpace::Local => basis_axis(&scene.world(id)?, 1),
                };
                rotate_item(scene, id, &axis, utils::deg_to_rad(dx * self.rotate_speed))?;
            }
        }
        Ok(true)
    }

    /// Stop dragging; the selection stays
    pub fn end_drag(&mut self) {
        self.dragging = false;
    }
}

impl Default for Manipulator {
    fn default() -> Self {
        Self::new()
    }
}
