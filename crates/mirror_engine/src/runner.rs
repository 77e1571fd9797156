//! Scene runner
//!
//! The one [`Application`] this crate ships: a shadowed scene with a
//! reflective globe, a sky, keyboard fly-through and mouse manipulation of
//! picked items.
//!
//! | Input            | Action                                   |
//! |------------------|------------------------------------------|
//! | W / S            | walk forward / back                      |
//! | A / D            | strafe left / right                      |
//! | Q / E            | fly down / up                            |
//! | right drag       | look around                              |
//! | left click/drag  | pick and move or rotate the picked item  |
//! | R                | toggle translate / rotate                |
//! | G                | toggle local / world space               |
//! | F                | toggle the shadow map debug quad         |
//! | Space            | toggle first-hit / nearest picking       |
//! | P / L            | save / load item transforms              |
//! | Escape           | clear the selection                      |

use std::path::{Path, PathBuf};

use crate::application::{AppError, Application};
use crate::core::config::RendererConfig;
use crate::foundation::math::{constants, utils, Mat4, Vec3, Vec4};
use crate::foundation::time::Timer;
use crate::input::{InputManager, KeyCode, MouseButton, MouseState};
use crate::picking::{DragMode, Manipulator, PickMode, PickingEngine, TransformSpace};
use crate::render::backends::headless::HeadlessDevice;
use crate::render::descriptors::DescriptorTable;
use crate::render::{Camera, CommandQueue, Light, RenderContext, RenderResult};
use crate::scene::geometry::{create_box, create_grid, create_quad, create_sphere};
use crate::scene::{
    persistence, BoundingSphere, MaterialDesc, MeshGeometry, RenderItemDesc, RenderLayer, Scene, TextureClass,
};
use crate::sync::{FenceValue, FrameLayout, TimelinePrimitive};

/// Textures the demo scene samples, in registration order
pub const DEMO_TEXTURES: [&str; 7] = [
    "bricks.dds",
    "bricks_normal.dds",
    "tile.dds",
    "tile_nrm.dds",
    "white1x1.dds",
    "default_normal.dds",
    "grasscube1024.dds",
];

/// Composed scene application
pub struct SceneRunner {
    context: RenderContext,
    scene: Scene,
    camera: Camera,
    picking: PickingEngine,
    manipulator: Manipulator,
    input: InputManager,
    mouse: MouseState,
    transforms_path: Option<PathBuf>,
    /// Camera speed in world units per second
    pub move_speed: f32,
    /// Mouse look speed in degrees per pixel
    pub look_speed: f32,
}

impl SceneRunner {
    /// Build the demo scene and a render context on `queue` and `timeline`
    pub fn new(
        config: RendererConfig,
        queue: Box<dyn CommandQueue>,
        timeline: Box<dyn TimelinePrimitive>,
    ) -> Result<Self, AppError> {
        config.validate()?;

        let mut descriptors = DescriptorTable::new(config.max_textures);
        let scene = build_demo_scene(config.frames_in_flight, &mut descriptors)?;
        let layout = FrameLayout::new(scene.item_count(), scene.material_count());

        let mut camera = Camera::new();
        camera.set_lens(constants::QUARTER_PI, config.aspect_ratio(), 1.0, 1000.0);
        camera.look_at(Vec3::new(0.0, 0.0, -15.0), Vec3::zeros(), Vec3::y());

        let picking = PickingEngine::new(config.width, config.height);
        let mouse = MouseState::new(config.width, config.height);
        let context = RenderContext::with_descriptors(config, queue, timeline, layout, descriptors)?;

        Ok(Self {
            context,
            scene,
            camera,
            picking,
            manipulator: Manipulator::new(),
            input: InputManager::new(),
            mouse,
            transforms_path: None,
            move_speed: 10.0,
            look_speed: 0.25,
        })
    }

    /// Build on a simulated GPU that retires work as soon as it is signaled
    pub fn headless(config: RendererConfig) -> Result<(Self, HeadlessDevice), AppError> {
        let device = HeadlessDevice::new(true);
        let runner = Self::new(config, Box::new(device.queue()), Box::new(device.timeline()))?;
        Ok((runner, device))
    }

    /// Load transforms from `path` on startup and save/load them there on P/L
    pub fn with_transforms_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.transforms_path = Some(path.into());
        self
    }

    /// Render context
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Viewing camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable viewing camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Picking settings
    pub fn picking(&self) -> &PickingEngine {
        &self.picking
    }

    /// Selection and drag state
    pub fn manipulator(&self) -> &Manipulator {
        &self.manipulator
    }

    fn process_keyboard(&mut self, delta_time: f32) {
        let step = self.move_speed * delta_time;
        let held = |key| self.input.is_held(key);
        let walk = f32::from(u8::from(held(KeyCode::W))) - f32::from(u8::from(held(KeyCode::S)));
        let strafe = f32::from(u8::from(held(KeyCode::D))) - f32::from(u8::from(held(KeyCode::A)));
        let fly = f32::from(u8::from(held(KeyCode::E))) - f32::from(u8::from(held(KeyCode::Q)));

        if walk != 0.0 {
            self.camera.walk(walk * step);
        }
        if strafe != 0.0 {
            self.camera.strafe(strafe * step);
        }
        if fly != 0.0 {
            self.camera.fly(fly * step);
        }
    }

    fn save_transforms(&self, path: &Path) -> Result<(), AppError> {
        let count = persistence::save_transforms(&self.scene, path)?;
        log::info!("Saved {} transforms to {}", count, path.display());
        Ok(())
    }

    fn load_transforms(&mut self, path: &Path) -> Result<(), AppError> {
        let count = persistence::load_transforms(&mut self.scene, path)?;
        log::info!("Loaded {} transforms from {}", count, path.display());
        Ok(())
    }
}

impl Application for SceneRunner {
    fn initialize(&mut self) -> Result<(), AppError> {
        if let Some(path) = self.transforms_path.clone() {
            if path.exists() {
                self.load_transforms(&path)?;
            }
        }
        log::info!(
            "Scene ready: {} items, {} materials, {} lights",
            self.scene.item_count(),
            self.scene.material_count(),
            self.scene.lights().len()
        );
        Ok(())
    }

    fn update(&mut self, timer: &Timer) -> Result<(), AppError> {
        self.process_keyboard(timer.delta_time());
        self.context.begin_frame()?;
        self.context.update(&mut self.scene, &self.camera)?;
        Ok(())
    }

    fn draw(&mut self) -> Result<FenceValue, AppError> {
        Ok(self.context.draw(&self.scene)?)
    }

    fn on_mouse_down(&mut self, button: MouseButton, x: f32, y: f32) -> Result<(), AppError> {
        self.mouse.press(button, x, y);
        if button == MouseButton::Left {
            self.manipulator.begin_drag(&self.picking, &self.scene, &self.camera, x, y);
        }
        Ok(())
    }

    fn on_mouse_up(&mut self, button: MouseButton, x: f32, y: f32) -> Result<(), AppError> {
        self.mouse.release(button, x, y);
        if button == MouseButton::Left {
            self.manipulator.end_drag();
        }
        Ok(())
    }

    fn on_mouse_move(&mut self, x: f32, y: f32) -> Result<(), AppError> {
        let (dx, dy) = self.mouse.move_to(x, y);
        if self.mouse.is_down(MouseButton::Right) {
            self.camera.pitch(utils::deg_to_rad(self.look_speed * dy));
            self.camera.yaw(utils::deg_to_rad(self.look_speed * dx));
        } else if self.mouse.is_down(MouseButton::Left) {
            self.manipulator.drag(&mut self.scene, &self.camera, dx, dy)?;
        }
        Ok(())
    }

    fn on_key(&mut self, key: KeyCode, pressed: bool) -> Result<(), AppError> {
        if !self.input.handle_key_input(key, pressed) {
            return Ok(());
        }

        match key {
            KeyCode::R => {
                let mode = match self.manipulator.mode() {
                    DragMode::Translate => DragMode::Rotate,
                    DragMode::Rotate => DragMode::Translate,
                };
                self.manipulator.set_mode(mode);
                log::info!("Drag mode: {:?}", mode);
            }
            KeyCode::G => {
                let space = match self.manipulator.space() {
                    TransformSpace::Local => TransformSpace::World,
                    TransformSpace::World => TransformSpace::Local,
                };
                self.manipulator.set_space(space);
                log::info!("Transform space: {:?}", space);
            }
            KeyCode::F => {
                let enabled = !self.context.orchestrator().shadow_debug();
                self.context.set_shadow_debug(enabled);
            }
            KeyCode::Space => {
                let mode = match self.picking.mode() {
                    PickMode::FirstHit => PickMode::Nearest,
                    PickMode::Nearest => PickMode::FirstHit,
                };
                self.picking.set_mode(mode);
                log::info!("Pick mode: {:?}", mode);
            }
            KeyCode::P => {
                if let Some(path) = self.transforms_path.clone() {
                    self.save_transforms(&path)?;
                }
            }
            KeyCode::L => {
                if let Some(path) = self.transforms_path.clone() {
                    self.load_transforms(&path)?;
                }
            }
            KeyCode::Escape => self.manipulator.select(None),
            _ => {}
        }
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) -> Result<(), AppError> {
        self.context.resize(width, height)?;
        self.camera.set_aspect_ratio(self.context.config().aspect_ratio());
        self.picking.resize(width, height);
        self.mouse.update_window_size(width, height);
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Err(e) = self.context.flush() {
            log::warn!("Failed to drain the GPU on shutdown: {}", e);
        }
    }
}

/// Build the demo scene, registering its textures in `descriptors`
pub fn build_demo_scene(frames_in_flight: usize, descriptors: &mut DescriptorTable) -> RenderResult<Scene> {
    for name in DEMO_TEXTURES {
        descriptors.register_texture(name, TextureClass::classify(name))?;
    }
    let slot = |name: &str| descriptors.slot_of(name);

    let mut scene = Scene::new(frames_in_flight);

    let mesh = scene.add_mesh(
        MeshGeometry::new("shapes")
            .with_submesh("box", create_box(1.0, 1.0, 1.0))
            .with_submesh("grid", create_grid(20.0, 30.0, 60, 40))
            .with_submesh("sphere", create_sphere(0.5, 20, 20))
            .with_submesh("quad", create_quad(0.0, 0.0, 1.0, 1.0, 0.0)),
    );

    let bricks = scene.add_material(
        MaterialDesc::new("bricks", slot("bricks.dds")?)
            .with_normal_slot(slot("bricks_normal.dds")?)
            .with_reflectance(Vec3::new(0.1, 0.1, 0.1), 0.7),
    );
    let tile = scene.add_material(
        MaterialDesc::new("tile", slot("tile.dds")?)
            .with_normal_slot(slot("tile_nrm.dds")?)
            .with_albedo(Vec4::new(0.9, 0.9, 0.9, 1.0))
            .with_reflectance(Vec3::new(0.2, 0.2, 0.2), 0.9)
            .with_uv_tile(8.0),
    );
    let mirror = scene.add_material(
        MaterialDesc::new("mirror", slot("white1x1.dds")?)
            .with_normal_slot(slot("default_normal.dds")?)
            .with_albedo(Vec4::new(0.0, 0.0, 0.1, 1.0))
            .with_reflectance(Vec3::new(0.98, 0.97, 0.95), 0.9),
    );
    let sky = scene.add_material(MaterialDesc::new("sky", slot("grasscube1024.dds")?));

    scene.add_render_item(
        RenderItemDesc::new("sky", mesh, "sphere", sky)
            .with_world(Mat4::new_scaling(5000.0))
            .in_layer(RenderLayer::Sky),
    )?;
    scene.add_render_item(
        RenderItemDesc::new("shadow_debug", mesh, "quad", bricks).in_layer(RenderLayer::ShadowDebug),
    )?;
    scene.add_render_item(RenderItemDesc::new("floor", mesh, "grid", tile))?;
    scene.add_render_item(
        RenderItemDesc::new("pedestal", mesh, "box", bricks)
            .with_world(Mat4::new_translation(&Vec3::new(0.0, 0.5, 0.0)) * Mat4::new_nonuniform_scaling(&Vec3::new(3.0, 1.0, 3.0))),
    )?;
    for row in 0..5 {
        let z = -10.0 + row as f32 * 5.0;
        for (side, x) in [("left", -5.0), ("right", 5.0)] {
            scene.add_render_item(
                RenderItemDesc::new(format!("{side}_ball_{row}"), mesh, "sphere", bricks)
                    .with_world(Mat4::new_translation(&Vec3::new(x, 3.5, z))),
            )?;
        }
    }
    scene.add_render_item(
        RenderItemDesc::new("globe", mesh, "sphere", mirror)
            .with_world(Mat4::new_translation(&Vec3::new(0.0, 2.0, 0.0)) * Mat4::new_scaling(2.0))
            .in_layer(RenderLayer::Reflective),
    )?;

    scene.add_light(Light::directional(Vec3::new(0.57735, -0.57735, 0.57735), Vec3::new(0.9, 0.8, 0.7)));
    scene.add_light(Light::directional(Vec3::new(-0.57735, -0.57735, 0.57735), Vec3::new(0.4, 0.4, 0.4)));
    scene.add_light(Light::directional(Vec3::new(0.0, -0.707, -0.707), Vec3::new(0.2, 0.2, 0.2)));
    scene.set_bounds(BoundingSphere::new(Vec3::zeros(), (10.0f32 * 10.0 + 15.0 * 15.0).sqrt()));

    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use crate::render::backends::headless::HeadlessDevice;
    use std::time::Duration;

    fn runner() -> (SceneRunner, HeadlessDevice) {
        let config = RendererConfig::new().with_fence_timeout(Duration::from_millis(200));
        SceneRunner::headless(config).unwrap()
    }

    #[test]
    fn test_demo_scene_layers() {
        let mut descriptors = DescriptorTable::new(64);
        let scene = build_demo_scene(3, &mut descriptors).unwrap();

        assert_eq!(scene.layer(RenderLayer::Sky).len(), 1);
        assert_eq!(scene.layer(RenderLayer::ShadowDebug).len(), 1);
        assert_eq!(scene.layer(RenderLayer::Reflective).len(), 1);
        assert_eq!(scene.layer(RenderLayer::Opaque).len(), 12);
        assert_eq!(descriptors.len(), DEMO_TEXTURES.len());
        assert!(descriptors.first_cube_texture().is_some());
    }

    #[test]
    fn test_frames_render_headless() {
        let (mut runner, device) = runner();
        runner.initialize().unwrap();
        let timer = Timer::new();

        for expected in 1..=4 {
            runner.update(&timer).unwrap();
            assert_eq!(runner.draw().unwrap(), expected);
        }
        assert_eq!(device.executed().len(), 4);
        assert_eq!(device.presented(), vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_cube_map_centers_on_globe() {
        let (mut runner, _device) = runner();
        runner.update(&Timer::new()).unwrap();
        let center = runner.context().orchestrator().cube_map().center();
        assert_eq!(center, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_walk_key_moves_camera() {
        let (mut runner, _device) = runner();
        let start = runner.camera().position();
        runner.on_key(KeyCode::W, true).unwrap();
        runner.process_keyboard(0.5);
        assert!(runner.camera().position().z > start.z);

        runner.on_key(KeyCode::W, false).unwrap();
        let stopped = runner.camera().position();
        runner.process_keyboard(0.5);
        assert_eq!(runner.camera().position(), stopped);
    }

    #[test]
    fn test_left_drag_moves_picked_item() {
        let (mut runner, _device) = runner();
        runner.camera_mut().look_at(Vec3::new(0.0, 2.0, -15.0), Vec3::new(0.0, 2.0, 0.0), Vec3::y());
        let globe = runner.scene().item_id("globe").unwrap();
        runner.picking.set_mode(PickMode::Nearest);

        runner.on_mouse_down(MouseButton::Left, 405.0, 297.0).unwrap();
        assert_eq!(runner.manipulator().selected(), Some(globe));

        runner.on_mouse_move(455.0, 297.0).unwrap();
        runner.on_mouse_up(MouseButton::Left, 455.0, 297.0).unwrap();
        let moved = runner.scene().world(globe).unwrap().translation_part();
        assert!(moved.x > 0.5);
    }

    #[test]
    fn test_resize_updates_camera_and_rotation() {
        let (mut runner, _device) = runner();
        runner.update(&Timer::new()).unwrap();
        runner.draw().unwrap();
        assert_eq!(runner.context().back_buffer_index(), 1);

        runner.on_resize(1600, 900).unwrap();
        assert_eq!(runner.context().back_buffer_index(), 0);
        assert!((runner.camera().aspect() - 1600.0 / 900.0).abs() < 1e-6);
    }

    #[test]
    fn test_transforms_survive_save_and_load() {
        let path = std::env::temp_dir().join(format!("mirror_engine_runner_{}.txt", std::process::id()));
        let (runner, _device) = runner();
        let mut runner = runner.with_transforms_file(&path);
        let pedestal = runner.scene().item_id("pedestal").unwrap();
        let original = runner.scene().world(pedestal).unwrap();

        runner.on_key(KeyCode::P, true).unwrap();
        runner.scene_mut().set_world(pedestal, Mat4::identity()).unwrap();
        runner.on_key(KeyCode::L, true).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(runner.scene().world(pedestal).unwrap(), original);
    }
}
