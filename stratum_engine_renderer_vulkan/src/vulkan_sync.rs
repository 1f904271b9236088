/// SyncDevice for Vulkan: fences and binary semaphores

use std::time::Duration;

use ash::vk::{self, Handle};
use stratum_engine::stratum::device::{FenceHandle, FenceWait, SemaphoreHandle, SyncDevice};
use stratum_engine::stratum::Result;

use crate::vulkan::{check, VulkanGraphicsDevice};
use crate::vulkan_format::timeout_nanos;

impl SyncDevice for VulkanGraphicsDevice {
    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { self.device.create_fence(&info, None) }
            .map_err(|e| check("vkCreateFence", e))?;
        Ok(FenceHandle::from_raw(fence.as_raw()))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        unsafe { self.device.destroy_fence(vk::Fence::from_raw(fence.as_raw()), None) };
    }

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { self.device.create_semaphore(&info, None) }
            .map_err(|e| check("vkCreateSemaphore", e))?;
        Ok(SemaphoreHandle::from_raw(semaphore.as_raw()))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        unsafe {
            self.device
                .destroy_semaphore(vk::Semaphore::from_raw(semaphore.as_raw()), None)
        };
    }

    fn wait_for_fence(&self, fence: FenceHandle, timeout: Duration) -> Result<FenceWait> {
        let fences = [vk::Fence::from_raw(fence.as_raw())];
        match unsafe { self.device.wait_for_fences(&fences, true, timeout_nanos(timeout)) } {
            Ok(()) => Ok(FenceWait::Signaled),
            Err(vk::Result::TIMEOUT) => Ok(FenceWait::TimedOut),
            Err(e) => Err(check("vkWaitForFences", e)),
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        let fences = [vk::Fence::from_raw(fence.as_raw())];
        unsafe { self.device.reset_fences(&fences) }.map_err(|e| check("vkResetFences", e))
    }
}
