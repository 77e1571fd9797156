//! Per-frame constant uploads
//!
//! Object and material constants are only rewritten while their owner is
//! dirty for some bundle. Pass constants are rebuilt every frame: the main
//! pass from the camera, the shadow pass from the light, and each cube face
//! from the main pass with its own camera.

use crate::render::camera::Camera;
use crate::render::constants::{
    cube_face_slot, ObjectConstants, PassConstants, MAIN_PASS_SLOT, SHADOW_PASS_SLOT,
};
use crate::render::lighting::Light;
use crate::render::passes::cube_map::CubeMapTarget;
use crate::render::passes::shadow::ShadowTransforms;
use crate::render::RenderResult;
use crate::scene::Scene;
use crate::sync::FrameResourceBundle;

/// Upload world matrices of dirty items; returns the number uploaded
pub fn update_object_constants(bundle: &mut FrameResourceBundle, scene: &mut Scene) -> RenderResult<usize> {
    let mut uploaded = 0;
    for item in scene.items_mut() {
        if item.frames_dirty > 0 {
            bundle
                .object_constants
                .copy_data(item.object_index, &ObjectConstants::new(item.world()))?;
            item.frames_dirty -= 1;
            uploaded += 1;
        }
    }
    Ok(uploaded)
}

/// Upload dirty materials; returns the number uploaded
pub fn update_material_constants(bundle: &mut FrameResourceBundle, scene: &mut Scene) -> RenderResult<usize> {
    let mut uploaded = 0;
    for material in scene.materials_mut() {
        if material.frames_dirty > 0 {
            bundle
                .material_constants
                .copy_data(material.constant_index, &material.constants())?;
            material.frames_dirty -= 1;
            uploaded += 1;
        }
    }
    Ok(uploaded)
}

/// Write the main, shadow and cube face pass constants
///
/// Returns the main pass constants.
pub fn update_pass_constants(
    bundle: &mut FrameResourceBundle,
    camera: &Camera,
    shadow: &ShadowTransforms,
    cube_map: &CubeMapTarget,
    lights: &[Light],
) -> RenderResult<PassConstants> {
    let mut main = PassConstants::default();
    main.set_camera(&camera.view_matrix(), &camera.projection_matrix(), camera.position());
    main.shadow_transform = shadow.shadow_transform.into();
    main.set_lights(lights);
    bundle.pass_constants.copy_data(MAIN_PASS_SLOT, &main)?;

    let mut shadow_pass = main;
    shadow_pass.set_camera(&shadow.light_view, &shadow.light_proj, shadow.light_position);
    bundle.pass_constants.copy_data(SHADOW_PASS_SLOT, &shadow_pass)?;

    for (face, face_camera) in cube_map.cameras().iter().enumerate() {
        let mut face_pass = main;
        face_pass.set_camera(
            &face_camera.view_matrix(),
            &face_camera.projection_matrix(),
            face_camera.position(),
        );
        bundle.pass_constants.copy_data(cube_face_slot(face), &face_pass)?;
    }

    Ok(main)
}
