//! Headless GPU simulation
//!
//! Stands in for a real device: the queue records every submitted command
//! list and the timeline completes signaled values either immediately or
//! when told to through the shared [`HeadlessDevice`] handle, which may live
//! on another thread. The device can be lost at any time, after which every
//! queue and timeline operation fails with [`RenderError::DeviceLost`].

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::render::backend::{BackendResult, CommandQueue};
use crate::render::commands::CommandList;
use crate::render::{RenderError, RenderResult};
use crate::sync::{FenceValue, TimelinePrimitive};

#[derive(Debug, Default)]
struct GpuState {
    completed: FenceValue,
    pending: VecDeque<FenceValue>,
    auto_retire: bool,
    device_lost: bool,
    executed: Vec<CommandList>,
    presented: Vec<u32>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<GpuState>,
    retired: Condvar,
}

/// Handle to the simulated GPU, cheap to clone and share across threads
#[derive(Debug, Clone, Default)]
pub struct HeadlessDevice {
    shared: Arc<Shared>,
}

impl HeadlessDevice {
    /// Create a device; with `auto_retire` every signal completes immediately
    pub fn new(auto_retire: bool) -> Self {
        let device = Self::default();
        device.lock().auto_retire = auto_retire;
        device
    }

    fn lock(&self) -> MutexGuard<'_, GpuState> {
        // a panicking test thread must not wedge the others
        self.shared.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Command queue bound to this device
    pub fn queue(&self) -> HeadlessQueue {
        HeadlessQueue { device: self.clone() }
    }

    /// Timeline bound to this device
    pub fn timeline(&self) -> HeadlessTimeline {
        HeadlessTimeline { device: self.clone() }
    }

    /// Switch automatic retirement on or off
    pub fn set_auto_retire(&self, enabled: bool) {
        let mut state = self.lock();
        state.auto_retire = enabled;
        if enabled {
            Self::retire_where(&mut state, |_| true);
            self.shared.retired.notify_all();
        }
    }

    /// Finish the oldest pending signal; returns the value reached
    pub fn retire_next(&self) -> Option<FenceValue> {
        let mut state = self.lock();
        let value = state.pending.pop_front()?;
        state.completed = value;
        self.shared.retired.notify_all();
        Some(value)
    }

    /// Finish every pending signal up to and including `value`
    pub fn retire_through(&self, value: FenceValue) {
        let mut state = self.lock();
        Self::retire_where(&mut state, |pending| pending <= value);
        self.shared.retired.notify_all();
    }

    /// Finish all pending signals
    pub fn retire_all(&self) {
        let mut state = self.lock();
        Self::retire_where(&mut state, |_| true);
        self.shared.retired.notify_all();
    }

    fn retire_where(state: &mut GpuState, predicate: impl Fn(FenceValue) -> bool) {
        while let Some(&front) = state.pending.front() {
            if !predicate(front) {
                break;
            }
            state.pending.pop_front();
            state.completed = front;
        }
    }

    /// Simulate device removal; wakes every blocked waiter
    pub fn lose_device(&self) {
        log::warn!("Headless device lost");
        self.lock().device_lost = true;
        self.shared.retired.notify_all();
    }

    /// Last completed value
    pub fn completed(&self) -> FenceValue {
        self.lock().completed
    }

    /// Signals not yet completed
    pub fn pending(&self) -> Vec<FenceValue> {
        self.lock().pending.iter().copied().collect()
    }

    /// Copies of every command list executed so far
    pub fn executed(&self) -> Vec<CommandList> {
        self.lock().executed.clone()
    }

    /// Most recently executed command list
    pub fn last_executed(&self) -> Option<CommandList> {
        self.lock().executed.last().cloned()
    }

    /// Back buffer indices presented so far
    pub fn presented(&self) -> Vec<u32> {
        self.lock().presented.clone()
    }
}

/// Simulated command queue
#[derive(Debug, Clone)]
pub struct HeadlessQueue {
    device: HeadlessDevice,
}

impl CommandQueue for HeadlessQueue {
    fn execute(&mut self, commands: &CommandList) -> BackendResult<()> {
        let mut state = self.device.lock();
        if state.device_lost {
            return Err(RenderError::DeviceLost);
        }
        if !commands.is_closed() {
            return Err(RenderError::Submission("command list was not closed".to_string()));
        }
        state.executed.push(commands.clone());
        Ok(())
    }

    fn present(&mut self, index: u32) -> BackendResult<()> {
        let mut state = self.device.lock();
        if state.device_lost {
            return Err(RenderError::DeviceLost);
        }
        state.presented.push(index);
        Ok(())
    }

    fn name(&self) -> &str {
        "headless"
    }
}

/// Simulated timeline
#[derive(Debug, Clone)]
pub struct HeadlessTimeline {
    device: HeadlessDevice,
}

impl TimelinePrimitive for HeadlessTimeline {
    fn enqueue_signal(&mut self, value: FenceValue) -> RenderResult<()> {
        let mut state = self.device.lock();
        if state.device_lost {
            return Err(RenderError::DeviceLost);
        }
        if state.auto_retire {
            state.completed = value;
            self.device.shared.retired.notify_all();
        } else {
            state.pending.push_back(value);
        }
        Ok(())
    }

    fn completed_value(&self) -> RenderResult<FenceValue> {
        let state = self.device.lock();
        if state.device_lost {
            return Err(RenderError::DeviceLost);
        }
        Ok(state.completed)
    }

    fn block_until(&self, value: FenceValue, timeout: Duration) -> RenderResult<bool> {
        let deadline = Instant::now() + timeout;
        let mut state = self.device.lock();
        loop {
            if state.device_lost {
                return Err(RenderError::DeviceLost);
            }
            if state.completed >= value {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            state = match self.device.shared.retired.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}
