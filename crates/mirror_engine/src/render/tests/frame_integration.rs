//! Whole-frame scenarios: ring back-pressure, pass ordering and barriers,
//! per-pass constants, and the fatal error paths

use std::thread;
use std::time::Duration;

use crate::core::config::RendererConfig;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::backends::headless::HeadlessDevice;
use crate::render::camera::Camera;
use crate::render::commands::Command;
use crate::render::constants::{MAIN_PASS_SLOT, SHADOW_PASS_SLOT};
use crate::render::descriptors::DescriptorSlot;
use crate::render::passes::PassStage;
use crate::render::state_tracker::{ResourceState, TransientResource};
use crate::render::{Light, RenderContext, RenderError};
use crate::scene::geometry::{create_box, create_sphere};
use crate::scene::{MaterialDesc, MeshGeometry, RenderItemDesc, RenderLayer, Scene};
use crate::sync::{FrameLayout, GpuTimeline};

fn test_scene(frames_in_flight: usize) -> Scene {
    let mut scene = Scene::new(frames_in_flight);
    let mesh = scene.add_mesh(
        MeshGeometry::new("shapes")
            .with_submesh("box", create_box(2.0, 2.0, 2.0))
            .with_submesh("sphere", create_sphere(1.0, 12, 12)),
    );
    let stone = scene.add_material(MaterialDesc::new("stone", DescriptorSlot(0)));
    let chrome = scene.add_material(MaterialDesc::new("chrome", DescriptorSlot(0)));

    scene.add_render_item(RenderItemDesc::new("cube", mesh, "box", stone)).unwrap();
    scene
        .add_render_item(
            RenderItemDesc::new("ball", mesh, "sphere", chrome)
                .with_world(Mat4::new_translation(&Vec3::new(0.0, 3.0, 0.0)))
                .in_layer(RenderLayer::Reflective),
        )
        .unwrap();
    scene
        .add_render_item(
            RenderItemDesc::new("sky", mesh, "sphere", stone)
                .with_world(Mat4::new_scaling(500.0))
                .in_layer(RenderLayer::Sky),
        )
        .unwrap();
    scene.add_light(Light::directional(Vec3::new(0.57735, -0.57735, 0.57735), Vec3::new(1.0, 1.0, 1.0)));
    scene
}

fn camera() -> Camera {
    let mut camera = Camera::new();
    camera.look_at(Vec3::new(0.0, 0.0, -15.0), Vec3::zeros(), Vec3::y());
    camera
}

fn context(frames_in_flight: usize, auto_retire: bool) -> (RenderContext, HeadlessDevice, Scene) {
    let scene = test_scene(frames_in_flight);
    let config = RendererConfig::new()
        .with_frames_in_flight(frames_in_flight)
        .with_fence_timeout(Duration::from_millis(250));
    let layout = FrameLayout::new(scene.item_count(), scene.material_count());
    let (context, device) = RenderContext::headless(config, layout, auto_retire).unwrap();
    (context, device, scene)
}

#[test]
fn test_ring_waits_once_for_the_frame_after_a_full_ring() {
    let (mut ctx, device, mut scene) = context(3, false);
    let camera = camera();

    for _ in 0..3 {
        ctx.render_frame(&mut scene, &camera).unwrap();
    }
    assert_eq!(ctx.ring().stall_count(), 0);
    assert_eq!(device.pending(), vec![1, 2, 3]);

    let gpu = device.clone();
    let retire = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        gpu.retire_through(1);
    });

    ctx.begin_frame().unwrap();
    retire.join().unwrap();
    assert_eq!(ctx.ring().stall_count(), 1);
    assert_eq!(ctx.fence().stats().blocking_waits, 1);
    assert!(ctx.ring().current().unwrap().retire_fence() <= ctx.fence().completed_value().unwrap());

    ctx.update(&mut scene, &camera).unwrap();
    assert_eq!(ctx.draw(&scene).unwrap(), 4);

    device.retire_through(2);
    ctx.render_frame(&mut scene, &camera).unwrap();
    assert_eq!(ctx.ring().stall_count(), 1);

    device.set_auto_retire(true);
}

#[test]
fn test_acquired_bundle_is_never_ahead_of_the_gpu() {
    let (mut ctx, device, mut scene) = context(2, false);
    let camera = camera();
    let gpu = device.clone();
    let retirer = thread::spawn(move || {
        while gpu.completed() < 6 {
            thread::sleep(Duration::from_millis(2));
            gpu.retire_next();
        }
    });

    for _ in 0..8 {
        ctx.begin_frame().unwrap();
        let retire = ctx.ring().current().unwrap().retire_fence();
        assert!(retire <= ctx.fence().completed_value().unwrap());
        ctx.update(&mut scene, &camera).unwrap();
        ctx.draw(&scene).unwrap();
    }
    retirer.join().unwrap();
    device.set_auto_retire(true);
}

#[test]
fn test_passes_recorded_in_fixed_order() {
    let (mut ctx, device, mut scene) = context(3, true);
    ctx.render_frame(&mut scene, &camera()).unwrap();

    let list = device.last_executed().unwrap();
    let passes: Vec<_> = list.passes().collect();
    let mut expected = vec![PassStage::Shadow];
    expected.extend((0..6).map(PassStage::CubeFace));
    expected.extend([PassStage::MainOpaque, PassStage::Skybox, PassStage::Reflection, PassStage::Present]);
    assert_eq!(passes, expected);
    assert!(list.is_closed());
}

#[test]
fn test_shadow_debug_pass_is_optional() {
    let (mut ctx, device, mut scene) = context(3, true);
    ctx.set_shadow_debug(true);
    ctx.render_frame(&mut scene, &camera()).unwrap();

    let passes: Vec<_> = device.last_executed().unwrap().passes().collect();
    let debug = passes.iter().position(|p| *p == PassStage::ShadowDebug).unwrap();
    assert_eq!(passes[debug - 1], PassStage::MainOpaque);
    assert_eq!(passes[debug + 1], PassStage::Skybox);
}

#[test]
fn test_sampled_targets_are_readable_before_main_pass() {
    let (mut ctx, device, mut scene) = context(3, true);
    ctx.render_frame(&mut scene, &camera()).unwrap();
    let list = device.last_executed().unwrap();

    let main = list
        .position(|c| *c == Command::BeginPass(PassStage::MainOpaque))
        .unwrap();
    let shadow_readable = list
        .position(|c| matches!(c, Command::Barrier(b)
            if b.resource == TransientResource::ShadowMap && b.after == ResourceState::GenericRead))
        .unwrap();
    let cube_readable = list
        .position(|c| matches!(c, Command::Barrier(b)
            if b.resource == TransientResource::CubeMapColor && b.after == ResourceState::GenericRead))
        .unwrap();
    assert!(shadow_readable < main);
    assert!(cube_readable < main);

    // every transient resource ends the frame where it started
    let tracker = ctx.tracker();
    assert_eq!(tracker.state(TransientResource::ShadowMap).unwrap(), ResourceState::GenericRead);
    assert_eq!(tracker.state(TransientResource::CubeMapColor).unwrap(), ResourceState::GenericRead);
    assert_eq!(tracker.state(TransientResource::CubeMapDepth).unwrap(), ResourceState::Common);
    assert_eq!(tracker.state(TransientResource::BackBuffer(0)).unwrap(), ResourceState::Present);
}

#[test]
fn test_back_buffer_barriers_bracket_the_frame() {
    let (mut ctx, device, mut scene) = context(3, true);
    ctx.render_frame(&mut scene, &camera()).unwrap();
    ctx.render_frame(&mut scene, &camera()).unwrap();

    let executed = device.executed();
    for (frame, list) in executed.iter().enumerate() {
        let back_buffer = TransientResource::BackBuffer(frame as u32 % 2);
        let transitions: Vec<_> = list
            .barriers()
            .filter(|b| b.resource == back_buffer)
            .map(|b| (b.before, b.after))
            .collect();
        assert_eq!(
            transitions,
            vec![
                (ResourceState::Present, ResourceState::RenderTarget),
                (ResourceState::RenderTarget, ResourceState::Present),
            ]
        );
    }
    assert_eq!(device.presented(), vec![0, 1]);
}

#[test]
fn test_shadow_and_main_passes_use_different_matrices() {
    let (mut ctx, device, mut scene) = context(3, true);
    ctx.render_frame(&mut scene, &camera()).unwrap();

    let bundle = ctx.ring().current().unwrap();
    let main = bundle.pass_constants.read(MAIN_PASS_SLOT).unwrap();
    let shadow = bundle.pass_constants.read(SHADOW_PASS_SLOT).unwrap();
    assert_ne!(main.view_matrix(), shadow.view_matrix());
    assert_ne!(main.proj_matrix(), shadow.proj_matrix());

    // the cube is drawn in both passes, each bound to its own slot
    let list = device.last_executed().unwrap();
    let bound_slots: Vec<_> = list
        .iter()
        .filter_map(|c| match c {
            Command::BindPassConstants { slot, .. } => Some(*slot),
            _ => None,
        })
        .collect();
    assert_eq!(bound_slots.first(), Some(&SHADOW_PASS_SLOT));
    assert_eq!(bound_slots.last(), Some(&MAIN_PASS_SLOT));

    let cube = scene.item(scene.item_id("cube").unwrap()).unwrap().object_index;
    let cube_draws = list.draws().filter(|d| d.object_offset == bundle.object_constants.offset(cube).unwrap()).count();
    assert_eq!(cube_draws, 1 + 6 + 1);
}

#[test]
fn test_dirty_items_reach_every_bundle() {
    let (mut ctx, _device, mut scene) = context(3, true);
    let camera = camera();
    let cube = scene.item_id("cube").unwrap();
    let moved = Mat4::new_translation(&Vec3::new(2.0, 0.0, 0.0));

    ctx.render_frame(&mut scene, &camera).unwrap();
    scene.set_world(cube, moved).unwrap();
    for _ in 0..3 {
        ctx.render_frame(&mut scene, &camera).unwrap();
    }

    let index = scene.item(cube).unwrap().object_index;
    assert_eq!(scene.item(cube).unwrap().frames_dirty, 0);
    for bundle in ctx.ring().bundles() {
        let constants = bundle.object_constants.read(index).unwrap();
        assert_eq!(constants, crate::render::ObjectConstants::new(&moved));
    }
}

#[test]
fn test_device_lost_surfaces_as_fatal_error() {
    let (mut ctx, device, mut scene) = context(2, false);
    let camera = camera();
    ctx.render_frame(&mut scene, &camera).unwrap();
    ctx.render_frame(&mut scene, &camera).unwrap();

    let gpu = device.clone();
    let loser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        gpu.lose_device();
    });

    let err = ctx.begin_frame().unwrap_err();
    loser.join().unwrap();
    assert_eq!(err, RenderError::DeviceLost);
    assert!(err.is_fatal());
}

#[test]
fn test_hung_gpu_times_out() {
    let (mut ctx, device, mut scene) = context(1, false);
    let camera = camera();
    ctx.render_frame(&mut scene, &camera).unwrap();

    let err = ctx.begin_frame().unwrap_err();
    assert!(matches!(err, RenderError::FenceTimeout { value: 1, completed: 0, .. }));
    assert!(err.is_fatal());
    device.set_auto_retire(true);
}

#[test]
fn test_draw_without_begin_frame_is_rejected() {
    let (mut ctx, device, scene) = context(3, true);
    assert_eq!(ctx.draw(&scene), Err(RenderError::NoFrameInFlight));
    assert!(device.executed().is_empty());
}

#[test]
fn test_resize_flushes_and_restarts_rotation() {
    let (mut ctx, device, mut scene) = context(3, false);
    let camera = camera();
    ctx.render_frame(&mut scene, &camera).unwrap();
    assert_eq!(ctx.back_buffer_index(), 1);

    device.set_auto_retire(true);
    ctx.resize(1024, 768).unwrap();
    assert_eq!(ctx.back_buffer_index(), 0);
    assert_eq!(ctx.fence().completed_value().unwrap(), ctx.fence().last_issued());
    assert_eq!(ctx.config().width, 1024);

    ctx.render_frame(&mut scene, &camera).unwrap();
    let list = device.last_executed().unwrap();
    let viewport = list.iter().rev().find_map(|c| match c {
        Command::SetViewport(v) => Some(*v),
        _ => None,
    });
    assert_eq!(viewport.map(|v| (v.width, v.height)), Some((1024.0, 768.0)));
}

#[test]
fn test_cube_map_follows_reflective_item() {
    let (mut ctx, _device, mut scene) = context(3, true);
    ctx.render_frame(&mut scene, &camera()).unwrap();
    assert_eq!(ctx.orchestrator().cube_map().center(), Vec3::new(0.0, 3.0, 0.0));
}

#[test]
fn test_sky_only_scene_keeps_shadow_matrices_finite() {
    let mut scene = Scene::new(2);
    let mesh = scene.add_mesh(MeshGeometry::new("sky").with_submesh("sphere", create_sphere(1.0, 8, 8)));
    let sky = scene.add_material(MaterialDesc::new("sky", DescriptorSlot(0)));
    scene
        .add_render_item(
            RenderItemDesc::new("sky", mesh, "sphere", sky)
                .with_world(Mat4::new_scaling(500.0))
                .in_layer(RenderLayer::Sky),
        )
        .unwrap();
    scene.add_light(Light::directional(Vec3::new(0.57735, -0.57735, 0.57735), Vec3::new(1.0, 1.0, 1.0)));
    assert_eq!(scene.bounds().radius, 0.0);

    let config = RendererConfig::new().with_frames_in_flight(2);
    let layout = FrameLayout::new(scene.item_count(), scene.material_count());
    let (mut ctx, _device) = RenderContext::headless(config, layout, true).unwrap();
    ctx.render_frame(&mut scene, &camera()).unwrap();

    let shadow = ctx.shadow_transforms().unwrap();
    assert!(shadow.shadow_transform.iter().all(|v| v.is_finite()));
    let main = ctx.main_pass_constants().unwrap();
    assert!(main.shadow_transform.iter().flatten().all(|v| v.is_finite()));
}
