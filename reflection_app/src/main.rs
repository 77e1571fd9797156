//! Reflection demo
//!
//! Drives the mirror engine's demo scene on the headless backend: loads the
//! configuration, renders a fixed number of frames while replaying a short
//! script of input (pick and drag the globe, toggle the shadow debug quad,
//! resize), then reports what the simulated GPU saw.
//!
//! Usage: `reflection_demo [config.toml|config.ron] [frames] [transforms.txt]`

use mirror_engine::prelude::*;
use mirror_engine::foundation::logging;
use thiserror::Error;

const DEFAULT_CONFIG: &str = "mirror.toml";
const DEFAULT_FRAMES: u64 = 120;

#[derive(Error, Debug)]
enum DemoError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    App(#[from] AppError),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("Invalid frame count '{0}'")]
    FrameCount(String),
}

fn main() {
    if let Err(e) = run() {
        log::error!("{}", e);
        eprintln!("reflection_demo: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), DemoError> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let frames = match args.next() {
        Some(arg) => arg.parse::<u64>().map_err(|_| DemoError::FrameCount(arg))?,
        None => DEFAULT_FRAMES,
    };
    let transforms = args.next();

    let config = ApplicationConfig::load_or_default(&config_path)?;
    logging::init_with_level(&config.engine.log_level);
    config.validate()?;
    log::info!("Using configuration from {}", config_path);

    let (runner, device) = SceneRunner::headless(config.renderer.clone())?;
    let mut runner = match transforms {
        Some(path) => runner.with_transforms_file(path),
        None => runner,
    };

    frame_globe(&mut runner);

    let (width, height) = (config.renderer.width as f32, config.renderer.height as f32);
    let mut engine = Engine::new(config.engine.clone());
    for event in input_script(width, height) {
        engine.push_event(event);
    }

    let drawn = engine.run(&mut runner, Some(frames))?;

    let globe = runner.scene().item_id("globe").map_err(AppError::from)?;
    let world = runner.scene().world(globe).map_err(AppError::from)?;
    let stats = runner.context().fence().stats();
    log::info!("Rendered {} frames", drawn);
    log::info!(
        "GPU executed {} command lists, presented {} times",
        device.executed().len(),
        device.presented().len()
    );
    log::info!(
        "Fence: {} signals, {} blocking waits, {} ring stalls",
        stats.signals,
        stats.blocking_waits,
        runner.context().ring().stall_count()
    );
    log::info!("Globe now at {:?}", world.translation_part());
    Ok(())
}

/// Raise the camera to the globe's height so the globe sits at the screen center
fn frame_globe(runner: &mut SceneRunner) {
    runner
        .camera_mut()
        .look_at(Vec3::new(0.0, 2.0, -15.0), Vec3::new(0.0, 2.0, 0.0), Vec3::y());
}

/// Grab the globe, drag it right, drop it, show the shadow map, then resize
fn input_script(width: f32, height: f32) -> Vec<AppEvent> {
    // just off the center so the ray avoids the sphere's pole vertex
    let (cx, cy) = (width * 0.5 + 5.0, height * 0.5 - 3.0);
    vec![
        AppEvent::MouseButton { button: MouseButton::Left, pressed: true, x: cx, y: cy },
        AppEvent::MouseMoved { x: cx + 40.0, y: cy },
        AppEvent::MouseButton { button: MouseButton::Left, pressed: false, x: cx + 40.0, y: cy },
        AppEvent::KeyInput { key: KeyCode::F, pressed: true },
        AppEvent::KeyInput { key: KeyCode::F, pressed: false },
        AppEvent::WindowResized { width: width as u32 * 2, height: height as u32 * 2 },
    ]
}
