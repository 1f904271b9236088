/// FrameSynchronizer - fences and semaphores for frames in flight
///
/// Two independent pools:
/// - one slot per frame in flight: a fence ("the slot's last submission
///   finished") and an image-available semaphore signaled by acquire
/// - one render-finished semaphore per swapchain image, waited by present
///
/// Frame index and image index are different moduli and are never mixed.

use std::time::Duration;

use crate::engine_debug;
use crate::error::{Error, Result};
use crate::graphics_device::{FenceHandle, FenceWait, SemaphoreHandle, SyncDevice};

/// Synchronization pair of one frame-in-flight slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSync {
    pub fence: FenceHandle,
    pub image_available: SemaphoreHandle,
}

/// CPU-side view of a slot's fence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Fence signaled, nothing outstanding: may be reset
    Idle,
    /// Fence reset, waiting for the submission that will signal it
    Armed,
    /// Submitted; must be waited before reuse
    Submitted,
}

#[derive(Debug)]
struct FrameSlot {
    sync: FrameSync,
    state: SlotState,
}

#[derive(Debug)]
pub struct FrameSynchronizer {
    slots: Vec<FrameSlot>,
    image_semaphores: Vec<SemaphoreHandle>,
    fence_timeout: Duration,
}

impl FrameSynchronizer {
    /// Create `frames_in_flight` slots and `image_count` render-finished semaphores
    ///
    /// Fences are created signaled so the first wait of every slot returns
    /// immediately. Objects created before a failure are destroyed.
    pub fn new<D: SyncDevice + ?Sized>(
        device: &D,
        frames_in_flight: usize,
        image_count: usize,
        fence_timeout: Duration,
    ) -> Result<Self> {
        if frames_in_flight == 0 {
            return Err(Error::ConfigurationError(
                "FrameSynchronizer needs at least one frame in flight".to_string(),
            ));
        }

        let mut sync = Self {
            slots: Vec::with_capacity(frames_in_flight),
            image_semaphores: Vec::with_capacity(image_count),
            fence_timeout,
        };
        if let Err(e) = sync.populate(device, frames_in_flight, image_count) {
            sync.destroy(device);
            return Err(e);
        }

        engine_debug!(
            "stratum::FrameSynchronizer",
            "Created {} frame slots, {} image semaphores",
            frames_in_flight,
            image_count
        );
        Ok(sync)
    }

    fn populate<D: SyncDevice + ?Sized>(
        &mut self,
        device: &D,
        frames_in_flight: usize,
        image_count: usize,
    ) -> Result<()> {
        for _ in 0..frames_in_flight {
            let fence = device.create_fence(true)?;
            let image_available = match device.create_semaphore() {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    device.destroy_fence(fence);
                    return Err(e);
                }
            };
            self.slots.push(FrameSlot {
                sync: FrameSync { fence, image_available },
                state: SlotState::Idle,
            });
        }
        for _ in 0..image_count {
            self.image_semaphores.push(device.create_semaphore()?);
        }
        Ok(())
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    pub fn image_count(&self) -> usize {
        self.image_semaphores.len()
    }

    pub fn fence_timeout(&self) -> Duration {
        self.fence_timeout
    }

    /// Sync pair of slot `frame_index mod frames_in_flight`
    ///
    /// # Panics
    ///
    /// Panics after `destroy` (there are no slots left).
    pub fn frame_sync(&self, frame_index: usize) -> FrameSync {
        self.slots[frame_index % self.slots.len()].sync
    }

    /// State of slot `frame_index mod frames_in_flight`
    pub fn slot_state(&self, frame_index: usize) -> SlotState {
        self.slots[frame_index % self.slots.len()].state
    }

    /// Render-finished semaphore of a swapchain image
    pub fn image_sync(&self, image_index: u32) -> Result<SemaphoreHandle> {
        self.image_semaphores
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| {
                Error::InvalidResource(format!(
                    "No render-finished semaphore for image {} ({} images)",
                    image_index,
                    self.image_semaphores.len()
                ))
            })
    }

    /// Submissions whose fence has not been waited yet
    pub fn outstanding_submissions(&self) -> usize {
        self.slots.iter().filter(|slot| slot.state == SlotState::Submitted).count()
    }

    /// Block until a slot's fence is signaled
    ///
    /// A wait that outlives the configured timeout means the GPU stopped
    /// making progress and is reported as `DeviceLost`. Waiting on a fence
    /// that was reset but never submitted would block forever and is
    /// rejected.
    pub fn wait_for_fence<D: SyncDevice + ?Sized>(&mut self, device: &D, fence: FenceHandle) -> Result<()> {
        let timeout = self.fence_timeout;
        let slot = self.slot_mut(fence)?;
        if slot.state == SlotState::Armed {
            return Err(Error::InvalidResource(format!(
                "Wait on fence {} which was reset but never submitted",
                fence.as_raw()
            )));
        }

        match device.wait_for_fence(fence, timeout)? {
            FenceWait::Signaled => {
                slot.state = SlotState::Idle;
                Ok(())
            }
            FenceWait::TimedOut => Err(Error::DeviceLost(format!(
                "Fence {} not signaled after {:?}",
                fence.as_raw(),
                timeout
            ))),
        }
    }

    /// Return a waited fence to the unsignaled state
    pub fn reset_fence<D: SyncDevice + ?Sized>(&mut self, device: &D, fence: FenceHandle) -> Result<()> {
        let slot = self.slot_mut(fence)?;
        match slot.state {
            SlotState::Idle => {
                device.reset_fence(fence)?;
                slot.state = SlotState::Armed;
                Ok(())
            }
            SlotState::Armed => Ok(()),
            SlotState::Submitted => Err(Error::InvalidResource(format!(
                "Reset of fence {} before its submission was waited",
                fence.as_raw()
            ))),
        }
    }

    /// Record that a submission signaling `fence` was queued
    pub fn mark_submitted(&mut self, fence: FenceHandle) -> Result<()> {
        let slot = self.slot_mut(fence)?;
        if slot.state != SlotState::Armed {
            return Err(Error::InvalidResource(format!(
                "Fence {} submitted in state {:?} (expected Armed)",
                fence.as_raw(),
                slot.state
            )));
        }
        slot.state = SlotState::Submitted;
        Ok(())
    }

    /// Rebuild the per-image semaphores for a new swapchain image count
    ///
    /// The device must be idle: no present may still wait on the old ones.
    pub fn resize_image_pool<D: SyncDevice + ?Sized>(&mut self, device: &D, image_count: usize) -> Result<()> {
        if image_count == self.image_semaphores.len() {
            return Ok(());
        }
        for semaphore in self.image_semaphores.drain(..) {
            device.destroy_semaphore(semaphore);
        }
        for _ in 0..image_count {
            self.image_semaphores.push(device.create_semaphore()?);
        }
        engine_debug!(
            "stratum::FrameSynchronizer",
            "Image semaphore pool resized to {}",
            image_count
        );
        Ok(())
    }

    /// Destroy every fence and semaphore (device must be idle)
    pub fn destroy<D: SyncDevice + ?Sized>(&mut self, device: &D) {
        for slot in self.slots.drain(..) {
            device.destroy_fence(slot.sync.fence);
            device.destroy_semaphore(slot.sync.image_available);
        }
        for semaphore in self.image_semaphores.drain(..) {
            device.destroy_semaphore(semaphore);
        }
    }

    fn slot_mut(&mut self, fence: FenceHandle) -> Result<&mut FrameSlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.sync.fence == fence)
            .ok_or_else(|| {
                Error::InvalidResource(format!("Fence {} is not a frame fence", fence.as_raw()))
            })
    }
}

#[cfg(test)]
#[path = "frame_synchronizer_tests.rs"]
mod tests;
