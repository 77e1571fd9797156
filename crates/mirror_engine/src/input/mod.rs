//! Input state
//!
//! Window-system events are translated into [`KeyCode`] and [`MouseButton`]
//! by whoever owns the window; this module only keeps the resulting state.

pub mod mouse;

pub use mouse::MouseState;

use std::collections::HashSet;

/// Held keys
#[derive(Debug, Clone, Default)]
pub struct InputManager {
    held: HashSet<KeyCode>,
}

impl InputManager {
    /// Create a new input manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle key input; returns true when the key was not already held
    pub fn handle_key_input(&mut self, key: KeyCode, pressed: bool) -> bool {
        if pressed {
            self.held.insert(key)
        } else {
            self.held.remove(&key);
            false
        }
    }

    /// Whether `key` is held
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Release everything, e.g. when the window loses focus
    pub fn clear(&mut self) {
        self.held.clear();
    }
}

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A key
    A,
    /// D key
    D,
    /// E key
    E,
    /// F key
    F,
    /// G key
    G,
    /// L key
    L,
    /// P key
    P,
    /// Q key
    Q,
    /// R key
    R,
    /// S key
    S,
    /// T key
    T,
    /// W key
    W,
    /// Space key
    Space,
    /// Escape key
    Escape,
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}
