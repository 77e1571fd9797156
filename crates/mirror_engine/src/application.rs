//! Application trait and lifecycle management

use thiserror::Error;

use crate::config::ConfigError;
use crate::foundation::time::Timer;
use crate::input::{KeyCode, MouseButton};
use crate::render::RenderError;
use crate::scene::PersistenceError;
use crate::sync::FenceValue;

/// Application lifecycle trait
///
/// Implement this trait to drive a scene with [`crate::Engine`]. The
/// implementor owns its render context; the engine only provides timing
/// and event delivery.
pub trait Application {
    /// Initialize the application
    ///
    /// Called once before the first frame.
    fn initialize(&mut self) -> Result<(), AppError>;

    /// Advance the simulation and write this frame's constants
    fn update(&mut self, timer: &Timer) -> Result<(), AppError>;

    /// Record and submit the frame; returns the fence value it will retire on
    fn draw(&mut self) -> Result<FenceValue, AppError>;

    /// Mouse button pressed at `(x, y)`
    fn on_mouse_down(&mut self, _button: MouseButton, _x: f32, _y: f32) -> Result<(), AppError> {
        Ok(())
    }

    /// Mouse button released at `(x, y)`
    fn on_mouse_up(&mut self, _button: MouseButton, _x: f32, _y: f32) -> Result<(), AppError> {
        Ok(())
    }

    /// Cursor moved to `(x, y)`
    fn on_mouse_move(&mut self, _x: f32, _y: f32) -> Result<(), AppError> {
        Ok(())
    }

    /// Key pressed or released
    fn on_key(&mut self, _key: KeyCode, _pressed: bool) -> Result<(), AppError> {
        Ok(())
    }

    /// Client area resized
    fn on_resize(&mut self, width: u32, height: u32) -> Result<(), AppError>;

    /// Handle application events
    ///
    /// The default implementation routes each event to its callback.
    fn handle_event(&mut self, event: AppEvent) -> Result<(), AppError> {
        match event {
            AppEvent::WindowResized { width, height } => self.on_resize(width, height),
            AppEvent::KeyInput { key, pressed } => self.on_key(key, pressed),
            AppEvent::MouseButton { button, pressed, x, y } => {
                if pressed {
                    self.on_mouse_down(button, x, y)
                } else {
                    self.on_mouse_up(button, x, y)
                }
            }
            AppEvent::MouseMoved { x, y } => self.on_mouse_move(x, y),
            AppEvent::WindowCloseRequested => Ok(()),
        }
    }

    /// Cleanup the application
    ///
    /// Called when the application is shutting down, after the last frame.
    fn cleanup(&mut self);
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Rendering failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Saving or loading transforms failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl AppError {
    /// Whether the application must stop
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::Render(e) => e.is_fatal(),
            AppError::Config(_) => true,
            AppError::Persistence(_) => false,
        }
    }
}

/// Application events
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Window was resized
    WindowResized {
        /// New window width
        width: u32,
        /// New window height
        height: u32,
    },

    /// Window close requested
    WindowCloseRequested,

    /// Key input event
    KeyInput {
        /// The key that was pressed/released
        key: KeyCode,
        /// Whether the key was pressed (true) or released (false)
        pressed: bool,
    },

    /// Mouse button event
    MouseButton {
        /// The mouse button that was pressed/released
        button: MouseButton,
        /// Whether the button was pressed (true) or released (false)
        pressed: bool,
        /// Cursor X coordinate
        x: f32,
        /// Cursor Y coordinate
        y: f32,
    },

    /// Mouse movement
    MouseMoved {
        /// New X coordinate
        x: f32,
        /// New Y coordinate
        y: f32,
    },
}
