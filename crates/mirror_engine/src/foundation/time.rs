//! Time management utilities

use std::time::Instant;

/// High-precision timer for frame timing
///
/// A paused timer reports a zero delta until it is resumed.
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
    paused: bool,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
            paused: false,
        }
    }

    /// Restart delta measurement from now without touching the totals
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.delta_time = 0.0;
    }

    /// Update the timer (should be called once per frame)
    pub fn tick(&mut self) {
        let now = Instant::now();
        if self.paused {
            self.delta_time = 0.0;
            self.last_frame = now;
            return;
        }

        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Stop accumulating time
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume accumulating time
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.last_frame = Instant::now();
        }
    }

    /// Whether the timer is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed (unpaused) time
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paused_timer_reports_zero_delta() {
        let mut timer = Timer::new();
        timer.pause();
        std::thread::sleep(std::time::Duration::from_millis(2));
        timer.tick();

        assert_eq!(timer.delta_time(), 0.0);
        assert_eq!(timer.frame_count(), 0);

        timer.resume();
        std::thread::sleep(std::time::Duration::from_millis(2));
        timer.tick();
        assert!(timer.delta_time() > 0.0);
        assert_eq!(timer.frame_count(), 1);
    }
}
