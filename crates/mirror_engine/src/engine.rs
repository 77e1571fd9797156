//! Frame loop
//!
//! The engine owns timing and the event queue and calls into an
//! [`Application`] once per frame. Window-system glue pushes events with
//! [`Engine::push_event`]; headless drivers can preload them.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::application::{AppError, AppEvent, Application};
use crate::core::config::EngineConfig;
use crate::foundation::time::Timer;

/// Main engine struct
pub struct Engine {
    config: EngineConfig,
    timer: Timer,
    events: VecDeque<AppEvent>,
    running: bool,
    frames: u64,
}

impl Engine {
    /// Create a new engine instance
    pub fn new(config: EngineConfig) -> Self {
        log::info!("Initializing engine (target fps: {:?})", config.target_fps);
        Self {
            config,
            timer: Timer::new(),
            events: VecDeque::new(),
            running: false,
            frames: 0,
        }
    }

    /// Queue an event for delivery at the start of the next frame
    pub fn push_event(&mut self, event: AppEvent) {
        self.events.push_back(event);
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Whether the loop is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames completed by the last `run`
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frame timing
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Run the main loop until the window closes or `frame_limit` frames were drawn
    ///
    /// `cleanup` runs on every exit path, including fatal errors.
    pub fn run<A: Application>(&mut self, app: &mut A, frame_limit: Option<u64>) -> Result<u64, EngineError> {
        app.initialize()?;

        self.running = true;
        self.frames = 0;
        self.timer.reset();
        log::info!("Starting main loop...");

        let result = self.frame_loop(app, frame_limit);
        self.running = false;
        app.cleanup();

        match &result {
            Ok(frames) => log::info!("Engine shutdown complete after {} frames", frames),
            Err(e) => log::error!("Engine stopped: {}", e),
        }
        result
    }

    fn frame_loop<A: Application>(&mut self, app: &mut A, frame_limit: Option<u64>) -> Result<u64, EngineError> {
        let frame_budget = self
            .config
            .target_fps
            .filter(|fps| *fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));

        while self.running && frame_limit.map_or(true, |limit| self.frames < limit) {
            let frame_start = Instant::now();
            self.timer.tick();

            while let Some(event) = self.events.pop_front() {
                if event == AppEvent::WindowCloseRequested {
                    self.running = false;
                }
                tolerate(app.handle_event(event))?;
            }
            if !self.running {
                break;
            }

            tolerate(app.update(&self.timer))?;
            app.draw()?;
            self.frames += 1;

            if let Some(budget) = frame_budget {
                if let Some(remaining) = budget.checked_sub(frame_start.elapsed()) {
                    std::thread::sleep(remaining);
                }
            }
        }
        Ok(self.frames)
    }
}

/// Log and continue on recoverable errors
fn tolerate(result: Result<(), AppError>) -> Result<(), AppError> {
    match result {
        Err(e) if !e.is_fatal() => {
            log::warn!("{}", e);
            Ok(())
        }
        other => other,
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// The application failed fatally
    #[error("Application error: {0}")]
    Application(#[from] AppError),
}
