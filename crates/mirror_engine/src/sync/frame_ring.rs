//! Frames-in-flight ring
//!
//! The CPU records frame N+1 while the GPU is still executing frame N. Every
//! resource the CPU writes per frame (command storage, constant buffers) is
//! therefore kept once per ring slot, and a slot is only handed back to the
//! CPU after the fence value recorded at its last submission has retired.

use crate::render::commands::CommandList;
use crate::render::constants::{MaterialConstants, ObjectConstants, PassConstants, PASS_SLOT_COUNT};
use crate::render::upload_buffer::UploadBuffer;
use crate::render::{RenderError, RenderResult};
use crate::sync::fence::{FenceValue, GpuTimeline};

/// Constant buffer sizes allocated for every bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Pass constant slots (main, shadow, cube faces)
    pub pass_count: usize,
    /// One slot per render item
    pub object_count: usize,
    /// One slot per material
    pub material_count: usize,
}

impl FrameLayout {
    /// Layout with the standard pass slots and the given scene sizes
    pub fn new(object_count: usize, material_count: usize) -> Self {
        Self {
            pass_count: PASS_SLOT_COUNT,
            object_count,
            material_count,
        }
    }
}

/// Everything the CPU rewrites for one frame in flight
pub struct FrameResourceBundle {
    index: usize,
    /// Commands recorded for this frame
    pub commands: CommandList,
    /// Per-pass constants
    pub pass_constants: UploadBuffer<PassConstants>,
    /// Per-render-item constants
    pub object_constants: UploadBuffer<ObjectConstants>,
    /// Per-material constants
    pub material_constants: UploadBuffer<MaterialConstants>,
    retire_fence: FenceValue,
}

impl FrameResourceBundle {
    fn new(index: usize, layout: FrameLayout) -> Self {
        Self {
            index,
            commands: CommandList::new(),
            pass_constants: UploadBuffer::new("pass constants", layout.pass_count, true),
            object_constants: UploadBuffer::new("object constants", layout.object_count, true),
            material_constants: UploadBuffer::new("material constants", layout.material_count, true),
            retire_fence: 0,
        }
    }

    /// Position of this bundle in the ring
    pub fn index(&self) -> usize {
        self.index
    }

    /// Fence value recorded at this bundle's last submission, 0 if never submitted
    pub fn retire_fence(&self) -> FenceValue {
        self.retire_fence
    }
}

/// Fixed ring of per-frame resource bundles
pub struct FrameResourceRing {
    bundles: Vec<FrameResourceBundle>,
    current: Option<usize>,
    acquisitions: u64,
    stalls: u64,
}

impl FrameResourceRing {
    /// Allocate `frames_in_flight` bundles sized by `layout`
    pub fn new(frames_in_flight: usize, layout: FrameLayout) -> RenderResult<Self> {
        if frames_in_flight == 0 {
            log::error!("Frame ring needs at least one bundle");
            return Err(RenderError::SlotOutOfRange {
                buffer: "frame ring",
                index: 0,
                capacity: 0,
            });
        }

        log::info!(
            "Creating frame ring: {} bundles, {} objects, {} materials",
            frames_in_flight,
            layout.object_count,
            layout.material_count
        );

        let bundles = (0..frames_in_flight)
            .map(|index| FrameResourceBundle::new(index, layout))
            .collect();

        Ok(Self {
            bundles,
            current: None,
            acquisitions: 0,
            stalls: 0,
        })
    }

    /// Advance to the next bundle, blocking until the GPU has retired it
    ///
    /// The returned bundle's command storage is reset and ready to record.
    pub fn acquire_next(&mut self, timeline: &dyn GpuTimeline) -> RenderResult<&mut FrameResourceBundle> {
        let next = self.current.map_or(0, |index| (index + 1) % self.bundles.len());
        let retire = self.bundles[next].retire_fence;

        if retire != 0 && timeline.completed_value()? < retire {
            log::trace!("Frame bundle {} still in flight, waiting for fence {}", next, retire);
            self.stalls += 1;
            timeline.wait_until(retire)?;
        }

        self.current = Some(next);
        self.acquisitions += 1;

        let bundle = &mut self.bundles[next];
        bundle.commands.reset();
        Ok(bundle)
    }

    /// Record the fence value that retires the bundle at `index`
    pub fn record_submission(&mut self, index: usize, fence: FenceValue) -> RenderResult<()> {
        let capacity = self.bundles.len();
        let bundle = self.bundles.get_mut(index).ok_or(RenderError::SlotOutOfRange {
            buffer: "frame ring",
            index,
            capacity,
        })?;

        if fence <= bundle.retire_fence {
            log::warn!(
                "Bundle {} resubmitted with fence {} (previous {})",
                index,
                fence,
                bundle.retire_fence
            );
        }

        bundle.retire_fence = fence;
        Ok(())
    }

    /// Bundle currently being recorded
    pub fn current(&self) -> RenderResult<&FrameResourceBundle> {
        self.current
            .map(|index| &self.bundles[index])
            .ok_or(RenderError::NoFrameInFlight)
    }

    /// Mutable access to the bundle currently being recorded
    pub fn current_mut(&mut self) -> RenderResult<&mut FrameResourceBundle> {
        match self.current {
            Some(index) => Ok(&mut self.bundles[index]),
            None => Err(RenderError::NoFrameInFlight),
        }
    }

    /// Index of the bundle currently being recorded
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Number of bundles
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Always false; a ring has at least one bundle
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// All bundles in ring order
    pub fn bundles(&self) -> impl Iterator<Item = &FrameResourceBundle> {
        self.bundles.iter()
    }

    /// Times `acquire_next` had to block on the GPU
    pub fn stall_count(&self) -> u64 {
        self.stalls
    }

    /// Total successful acquisitions
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessDevice;
    use crate::sync::fence::FenceSync;
    use std::time::Duration;

    fn setup(auto_retire: bool) -> (HeadlessDevice, FenceSync, FrameResourceRing) {
        let device = HeadlessDevice::new(auto_retire);
        let fence = FenceSync::new(Box::new(device.timeline()), Duration::from_millis(100));
        let ring = FrameResourceRing::new(3, FrameLayout::new(4, 2)).unwrap();
        (device, fence, ring)
    }

    fn submit(ring: &mut FrameResourceRing, fence: &mut FenceSync) -> FenceValue {
        let index = ring.current_index().unwrap();
        let value = fence.signal().unwrap();
        ring.record_submission(index, value).unwrap();
        value
    }

    #[test]
    fn test_first_round_never_blocks() {
        let (_device, mut fence, mut ring) = setup(false);
        for expected in 0..3 {
            let index = ring.acquire_next(&fence).unwrap().index();
            assert_eq!(index, expected);
            submit(&mut ring, &mut fence);
        }
        assert_eq!(ring.stall_count(), 0);
        assert_eq!(fence.stats().blocking_waits, 0);
    }

    #[test]
    fn test_wrapping_onto_unretired_bundle_times_out() {
        let (_device, mut fence, mut ring) = setup(false);
        for _ in 0..3 {
            ring.acquire_next(&fence).unwrap();
            submit(&mut ring, &mut fence);
        }

        let result = ring.acquire_next(&fence).map(|bundle| bundle.index());
        assert!(matches!(result, Err(RenderError::FenceTimeout { value: 1, .. })));
        assert_eq!(ring.stall_count(), 1);
    }

    #[test]
    fn test_acquired_bundle_is_always_retired() {
        let (device, mut fence, mut ring) = setup(false);
        // retire lagging two frames behind submission
        for frame in 0..20u64 {
            if frame >= 2 {
                device.retire_through(frame - 1);
            }
            let retire = ring.acquire_next(&fence).unwrap().retire_fence();
            assert!(retire <= fence.completed_value().unwrap());
            submit(&mut ring, &mut fence);
        }
        assert_eq!(ring.stall_count(), 0);
    }

    #[test]
    fn test_acquire_resets_recorded_commands() {
        let (_device, mut fence, mut ring) = setup(true);
        let bundle = ring.acquire_next(&fence).unwrap();
        bundle.commands.push(crate::render::commands::Command::SetPipeline(
            crate::render::commands::PipelineKind::Opaque,
        ));
        bundle.commands.close();
        submit(&mut ring, &mut fence);

        for _ in 0..3 {
            ring.acquire_next(&fence).unwrap();
            submit(&mut ring, &mut fence);
        }
        assert_eq!(ring.current_index(), Some(0));
        assert!(ring.current().unwrap().commands.is_empty());
    }

    #[test]
    fn test_current_without_acquire_is_an_error() {
        let ring = FrameResourceRing::new(3, FrameLayout::new(1, 1)).unwrap();
        assert!(matches!(ring.current(), Err(RenderError::NoFrameInFlight)));
    }

    #[test]
    fn test_record_submission_out_of_range() {
        let mut ring = FrameResourceRing::new(2, FrameLayout::new(1, 1)).unwrap();
        assert!(matches!(
            ring.record_submission(5, 1),
            Err(RenderError::SlotOutOfRange { index: 5, capacity: 2, .. })
        ));
    }

    #[test]
    fn test_empty_ring_is_an_invariant_violation() {
        match FrameResourceRing::new(0, FrameLayout::new(1, 1)) {
            Err(error) => {
                assert!(matches!(error, RenderError::SlotOutOfRange { capacity: 0, .. }));
                assert!(!error.is_fatal());
            }
            Ok(_) => panic!("a ring without bundles was created"),
        }
    }
}
