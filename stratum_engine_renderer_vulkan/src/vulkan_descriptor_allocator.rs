/// Growable descriptor set allocator
///
/// Sets come from the newest pool. When it runs out, a fresh pool is created
/// and the allocation retried once; older pools stay alive until `reset` or
/// shutdown, since their sets may still be referenced by in-flight work.

use ash::vk::{self, Handle};
use stratum_engine::stratum::device::DescriptorSetHandle;
use stratum_engine::stratum::{retry_with_fresh_pool, Error, Result};
use stratum_engine::{engine_debug, engine_warn};

use crate::vulkan::{check, LOG_SOURCE};
use crate::vulkan_format::vk_error;

/// Sets per pool
const SETS_PER_POOL: u32 = 1024;

const POOL_SIZES: [vk::DescriptorPoolSize; 3] = [
    vk::DescriptorPoolSize {
        ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        descriptor_count: 2 * SETS_PER_POOL,
    },
    vk::DescriptorPoolSize {
        ty: vk::DescriptorType::UNIFORM_BUFFER,
        descriptor_count: SETS_PER_POOL,
    },
    vk::DescriptorPoolSize {
        ty: vk::DescriptorType::STORAGE_BUFFER,
        descriptor_count: SETS_PER_POOL,
    },
];

pub(crate) struct DescriptorAllocator {
    device: ash::Device,
    /// Newest last; allocation only uses the last one
    pools: Vec<vk::DescriptorPool>,
}

impl DescriptorAllocator {
    /// No pool is created until the first allocation
    pub fn new(device: ash::Device) -> Self {
        Self { device, pools: Vec::new() }
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn allocate(&mut self, layout: vk::DescriptorSetLayout) -> Result<DescriptorSetHandle> {
        if self.pools.is_empty() {
            self.grow()?;
        }
        retry_with_fresh_pool(self, |allocator| allocator.allocate_from_current(layout), Self::grow)
    }

    /// Return all sets to their pools, keeping the pools for reuse
    pub fn reset(&mut self) -> Result<()> {
        for &pool in &self.pools {
            unsafe {
                self.device
                    .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
            }
            .map_err(|e| check("vkResetDescriptorPool", e))?;
        }
        Ok(())
    }

    pub fn destroy(&mut self) {
        for pool in self.pools.drain(..) {
            unsafe { self.device.destroy_descriptor_pool(pool, None) };
        }
    }

    fn allocate_from_current(&mut self, layout: vk::DescriptorSetLayout) -> Result<DescriptorSetHandle> {
        let Some(&pool) = self.pools.last() else {
            return Err(Error::PoolExhausted("no descriptor pool".to_string()));
        };
        let layouts = [layout];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);

        match unsafe { self.device.allocate_descriptor_sets(&info) } {
            Ok(sets) => sets
                .first()
                .map(|set| DescriptorSetHandle::from_raw(set.as_raw()))
                .ok_or_else(|| Error::BackendError("vkAllocateDescriptorSets returned no set".to_string())),
            // Pool exhaustion is expected and recovered by the caller
            Err(e @ (vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL)) => {
                Err(vk_error("vkAllocateDescriptorSets", e))
            }
            Err(e) => Err(check("vkAllocateDescriptorSets", e)),
        }
    }

    fn grow(&mut self) -> Result<()> {
        let info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&POOL_SIZES)
            .max_sets(SETS_PER_POOL);
        let pool = unsafe { self.device.create_descriptor_pool(&info, None) }
            .map_err(|e| check("vkCreateDescriptorPool", e))?;
        self.pools.push(pool);
        if self.pools.len() > 1 {
            engine_debug!(LOG_SOURCE, "Descriptor pool {} created", self.pools.len());
        }
        Ok(())
    }
}

impl Drop for DescriptorAllocator {
    fn drop(&mut self) {
        if !self.pools.is_empty() {
            engine_warn!(LOG_SOURCE, "DescriptorAllocator dropped with {} live pool(s)", self.pools.len());
            self.destroy();
        }
    }
}
