//! Timeline semaphore backed GPU timeline (Vulkan 1.2)

use std::time::Duration;

use ash::{vk, Device};

use crate::render::RenderResult;
use crate::sync::{FenceValue, TimelinePrimitive};

/// Timeline semaphore with RAII cleanup
///
/// Signals are enqueued on `queue` as empty submissions, so each value is
/// reached only after all work submitted before it has finished. CPU waits
/// go through `vkWaitSemaphores`, which sleeps in the driver instead of
/// polling the counter.
pub struct VulkanTimeline {
    device: Device,
    queue: vk::Queue,
    semaphore: vk::Semaphore,
}

impl VulkanTimeline {
    /// Create a timeline semaphore starting at 0
    pub fn new(device: Device, queue: vk::Queue) -> RenderResult<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(0);
        let create_info = vk::SemaphoreCreateInfo::builder().push_next(&mut type_info);

        let semaphore = unsafe { device.create_semaphore(&create_info, None)? };
        log::debug!("Created timeline semaphore {:?}", semaphore);

        Ok(Self { device, queue, semaphore })
    }

    /// Semaphore handle, for submissions that wait on the timeline
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl TimelinePrimitive for VulkanTimeline {
    fn enqueue_signal(&mut self, value: FenceValue) -> RenderResult<()> {
        let values = [value];
        let semaphores = [self.semaphore];
        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::builder().signal_semaphore_values(&values);
        let submit = vk::SubmitInfo::builder()
            .signal_semaphores(&semaphores)
            .push_next(&mut timeline_info)
            .build();

        unsafe {
            self.device
                .queue_submit(self.queue, &[submit], vk::Fence::null())?;
        }
        Ok(())
    }

    fn completed_value(&self) -> RenderResult<FenceValue> {
        let value = unsafe { self.device.get_semaphore_counter_value(self.semaphore)? };
        Ok(value)
    }

    fn block_until(&self, value: FenceValue, timeout: Duration) -> RenderResult<bool> {
        let semaphores = [self.semaphore];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::builder()
            .semaphores(&semaphores)
            .values(&values);
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);

        match unsafe { self.device.wait_semaphores(&wait_info, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(error) => Err(error.into()),
        }
    }
}

impl Drop for VulkanTimeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
