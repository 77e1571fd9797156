//! Mouse state for picking and dragging

use super::MouseButton;

/// Cursor position, button state and the last drag anchor
#[derive(Debug, Clone)]
pub struct MouseState {
    /// Current screen-space X position (pixels from the left)
    pub screen_x: f32,
    /// Current screen-space Y position (pixels from the top)
    pub screen_y: f32,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    last: (f32, f32),
    held: [bool; 3],
}

impl MouseState {
    /// Create a new mouse state with default values
    pub fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            screen_x: 0.0,
            screen_y: 0.0,
            window_width,
            window_height,
            last: (0.0, 0.0),
            held: [false; 3],
        }
    }

    /// Convert the cursor to normalized device coordinates
    ///
    /// X runs -1 (left) to +1 (right); Y runs +1 (top) to -1 (bottom).
    pub fn screen_to_ndc(&self) -> (f32, f32) {
        let ndc_x = self.screen_x / self.window_width as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - self.screen_y / self.window_height as f32 * 2.0;
        (ndc_x, ndc_y)
    }

    /// Update mouse position from window events
    pub fn update_position(&mut self, x: f32, y: f32) {
        self.screen_x = x;
        self.screen_y = y;
    }

    /// Update window size (for NDC conversion)
    pub fn update_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    /// Button went down at `(x, y)`; starts a drag from there
    pub fn press(&mut self, button: MouseButton, x: f32, y: f32) {
        self.update_position(x, y);
        self.held[button_index(button)] = true;
        self.last = (x, y);
    }

    /// Button went up
    pub fn release(&mut self, button: MouseButton, x: f32, y: f32) {
        self.update_position(x, y);
        self.held[button_index(button)] = false;
    }

    /// Whether `button` is held
    pub fn is_down(&self, button: MouseButton) -> bool {
        self.held[button_index(button)]
    }

    /// Move to `(x, y)` and return the movement since the previous anchor
    pub fn move_to(&mut self, x: f32, y: f32) -> (f32, f32) {
        self.update_position(x, y);
        let delta = (x - self.last.0, y - self.last.1);
        self.last = (x, y);
        delta
    }
}

impl Default for MouseState {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

fn button_index(button: MouseButton) -> usize {
    match button {
        MouseButton::Left => 0,
        MouseButton::Right => 1,
        MouseButton::Middle => 2,
    }
}
