//! GPU timeline fence
//!
//! The GPU timeline is one strictly increasing integer shared by the CPU and
//! the command queue. `signal` asks the queue to raise the timeline to the
//! next value once all previously submitted work has finished; the CPU learns
//! about completion by reading the value back or by blocking on it.
//!
//! Backends provide the raw [`TimelinePrimitive`] (a Vulkan timeline
//! semaphore, or the headless simulation). [`FenceSync`] wraps it and enforces
//! the invariants the rest of the renderer relies on:
//! - issued values are strictly increasing and never reused
//! - the CPU never waits on a value it has not issued
//! - observed completion never regresses
//! - every wait is bounded, so a hung or lost device becomes an error

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::render::{RenderError, RenderResult};

/// A point on the GPU timeline. Zero means "never submitted".
pub type FenceValue = u64;

/// Backend timeline primitive
///
/// Implementations block with an OS wait registered against the value
/// (semaphore wait, condition variable) rather than by polling.
pub trait TimelinePrimitive {
    /// Enqueue a signal of `value` on the GPU queue behind all submitted work
    fn enqueue_signal(&mut self, value: FenceValue) -> RenderResult<()>;

    /// Last value the GPU has reached
    fn completed_value(&self) -> RenderResult<FenceValue>;

    /// Block until the GPU reaches `value`
    ///
    /// Returns `Ok(false)` when `timeout` elapses first.
    fn block_until(&self, value: FenceValue, timeout: Duration) -> RenderResult<bool>;
}

/// The GPU timeline as seen by the rest of the renderer
pub trait GpuTimeline {
    /// Issue the next fence value on the queue and return it
    fn signal(&mut self) -> RenderResult<FenceValue>;

    /// Last value the GPU has reached
    fn completed_value(&self) -> RenderResult<FenceValue>;

    /// Block the calling thread until the GPU reaches `value`
    fn wait_until(&self, value: FenceValue) -> RenderResult<()>;

    /// Last value handed out by [`GpuTimeline::signal`]
    fn last_issued(&self) -> FenceValue;
}

/// Counters describing how often the CPU had to block on the GPU
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FenceStats {
    /// Values issued so far
    pub signals: u64,
    /// Waits that actually blocked
    pub blocking_waits: u64,
}

/// Fence synchronization over a backend timeline primitive
pub struct FenceSync {
    primitive: Box<dyn TimelinePrimitive>,
    last_issued: FenceValue,
    highest_observed: AtomicU64,
    blocking_waits: AtomicU64,
    timeout: Duration,
}

impl FenceSync {
    /// Create a fence over `primitive` whose waits give up after `timeout`
    pub fn new(primitive: Box<dyn TimelinePrimitive>, timeout: Duration) -> Self {
        log::debug!("Creating FenceSync (timeout {:?})", timeout);
        Self {
            primitive,
            last_issued: 0,
            highest_observed: AtomicU64::new(0),
            blocking_waits: AtomicU64::new(0),
            timeout,
        }
    }

    /// Wait budget applied to every blocking wait
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Signal the next value and wait for it, draining all submitted GPU work
    pub fn flush(&mut self) -> RenderResult<FenceValue> {
        let value = self.signal()?;
        self.wait_until(value)?;
        Ok(value)
    }

    /// Snapshot of the wait counters
    pub fn stats(&self) -> FenceStats {
        FenceStats {
            signals: self.last_issued,
            blocking_waits: self.blocking_waits.load(Ordering::Relaxed),
        }
    }

    fn observe(&self, reported: FenceValue) -> FenceValue {
        let previous = self.highest_observed.fetch_max(reported, Ordering::AcqRel);
        if reported < previous {
            log::error!("GPU timeline regressed from {} to {}", previous, reported);
            previous
        } else {
            reported
        }
    }
}

impl GpuTimeline for FenceSync {
    fn signal(&mut self) -> RenderResult<FenceValue> {
        let value = self.last_issued + 1;
        self.primitive.enqueue_signal(value)?;
        self.last_issued = value;
        log::trace!("Signaled fence {}", value);
        Ok(value)
    }

    fn completed_value(&self) -> RenderResult<FenceValue> {
        let reported = self.primitive.completed_value()?;
        Ok(self.observe(reported))
    }

    fn wait_until(&self, value: FenceValue) -> RenderResult<()> {
        if value > self.last_issued {
            log::error!("Refusing to wait on fence {} (last issued {})", value, self.last_issued);
            return Err(RenderError::UnissuedFenceValue {
                requested: value,
                last_issued: self.last_issued,
            });
        }

        if self.completed_value()? >= value {
            return Ok(());
        }

        self.blocking_waits.fetch_add(1, Ordering::Relaxed);
        log::trace!("Blocking on fence {}", value);

        if self.primitive.block_until(value, self.timeout)? {
            self.observe(value);
            Ok(())
        } else {
            let completed = self.primitive.completed_value()?;
            log::error!("Fence {} timed out after {:?} (GPU at {})", value, self.timeout, completed);
            Err(RenderError::FenceTimeout {
                value,
                completed,
                timeout: self.timeout,
            })
        }
    }

    fn last_issued(&self) -> FenceValue {
        self.last_issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessDevice;

    fn manual_fence(timeout_ms: u64) -> (HeadlessDevice, FenceSync) {
        let device = HeadlessDevice::new(false);
        let fence = FenceSync::new(Box::new(device.timeline()), Duration::from_millis(timeout_ms));
        (device, fence)
    }

    #[test]
    fn test_signal_values_strictly_increase() {
        let (_device, mut fence) = manual_fence(50);
        let mut previous = 0;
        for _ in 0..100 {
            let value = fence.signal().unwrap();
            assert!(value > previous);
            previous = value;
        }
        assert_eq!(fence.last_issued(), 100);
        assert_eq!(fence.stats().signals, 100);
    }

    #[test]
    fn test_wait_on_unissued_value_is_rejected() {
        let (_device, fence) = manual_fence(50);
        assert_eq!(
            fence.wait_until(1),
            Err(RenderError::UnissuedFenceValue { requested: 1, last_issued: 0 })
        );
    }

    #[test]
    fn test_wait_on_completed_value_does_not_block() {
        let (device, mut fence) = manual_fence(50);
        let value = fence.signal().unwrap();
        device.retire_all();

        fence.wait_until(value).unwrap();
        assert_eq!(fence.stats().blocking_waits, 0);
    }

    #[test]
    fn test_wait_times_out_when_gpu_never_finishes() {
        let (_device, mut fence) = manual_fence(20);
        let value = fence.signal().unwrap();

        match fence.wait_until(value) {
            Err(RenderError::FenceTimeout { value: v, completed, .. }) => {
                assert_eq!(v, value);
                assert_eq!(completed, 0);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_device_lost_surfaces_instead_of_hanging() {
        let (device, mut fence) = manual_fence(5_000);
        let value = fence.signal().unwrap();

        let lost = device.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            lost.lose_device();
        });

        assert_eq!(fence.wait_until(value), Err(RenderError::DeviceLost));
        handle.join().unwrap();
    }

    /// Times out, then reports the device as lost
    #[derive(Default)]
    struct LostAfterTimeout {
        timed_out: std::sync::atomic::AtomicBool,
    }

    impl TimelinePrimitive for LostAfterTimeout {
        fn enqueue_signal(&mut self, _value: FenceValue) -> RenderResult<()> {
            Ok(())
        }

        fn completed_value(&self) -> RenderResult<FenceValue> {
            if self.timed_out.load(Ordering::SeqCst) {
                Err(RenderError::DeviceLost)
            } else {
                Ok(0)
            }
        }

        fn block_until(&self, _value: FenceValue, _timeout: Duration) -> RenderResult<bool> {
            self.timed_out.store(true, Ordering::SeqCst);
            Ok(false)
        }
    }

    #[test]
    fn test_device_lost_during_timeout_is_not_reported_as_timeout() {
        let mut fence = FenceSync::new(Box::new(LostAfterTimeout::default()), Duration::from_millis(5));
        let value = fence.signal().unwrap();
        assert_eq!(fence.wait_until(value), Err(RenderError::DeviceLost));
        assert_eq!(fence.stats().blocking_waits, 1);
    }

    #[test]
    fn test_wait_wakes_when_gpu_retires_from_another_thread() {
        let (device, mut fence) = manual_fence(5_000);
        let value = fence.signal().unwrap();

        let gpu = device.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            gpu.retire_next();
        });

        fence.wait_until(value).unwrap();
        handle.join().unwrap();
        assert_eq!(fence.completed_value().unwrap(), value);
        assert_eq!(fence.stats().blocking_waits, 1);
    }

    #[test]
    fn test_flush_drains_auto_retiring_queue() {
        let device = HeadlessDevice::new(true);
        let mut fence = FenceSync::new(Box::new(device.timeline()), Duration::from_millis(50));
        let value = fence.flush().unwrap();
        assert_eq!(fence.completed_value().unwrap(), value);
    }
}
