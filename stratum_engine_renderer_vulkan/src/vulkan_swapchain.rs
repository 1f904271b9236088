/// PresentDevice for Vulkan
///
/// Surface queries, swapchain lifetime, swapchain image views, the shared
/// depth image, render passes, framebuffers, acquire and present. Swapchain
/// policy (format, extent, image count, recreation) lives in the core's
/// SwapchainPresenter; this layer only translates.

use std::time::Duration;

use ash::vk::{self, Handle};
use gpu_allocator::vulkan::Allocation;
use stratum_engine::stratum::device::{
    AcquireResult, DepthBuffer, DepthBufferHandle, Extent2D, FramebufferHandle, ImageHandle,
    ImageViewHandle, PresentDevice, RenderPassHandle, SemaphoreHandle, SurfaceSupport,
    SwapchainDesc, SwapchainHandle, SwapchainStatus, TextureFormat,
};
use stratum_engine::stratum::render::RenderPassDescriptor;
use stratum_engine::stratum::{Error, Result};
use stratum_engine::{engine_error, engine_trace, engine_warn};

use crate::vulkan::{check, lock, DepthImage, VulkanGraphicsDevice, LOG_SOURCE};
use crate::vulkan_format::{
    capabilities_from_vk, color_space_to_vk, depth_aspect, extent_to_vk, format_to_vk,
    present_mode_from_vk, present_mode_to_vk, sharing_mode_to_vk, surface_format_from_vk,
    timeout_nanos,
};
use crate::vulkan_render_pass;

fn subresource_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

impl VulkanGraphicsDevice {
    fn create_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<vk::ImageView> {
        let info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(subresource_range(aspect_mask));
        unsafe { self.device.create_image_view(&info, None) }.map_err(|e| check("vkCreateImageView", e))
    }
}

impl PresentDevice for VulkanGraphicsDevice {
    fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.map_err(|e| check("vkDeviceWaitIdle", e))
    }

    fn surface_support(&self) -> Result<SurfaceSupport> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| check("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?;
            let formats = self
                .surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
                .map_err(|e| check("vkGetPhysicalDeviceSurfaceFormatsKHR", e))?;
            let present_modes = self
                .surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)
                .map_err(|e| check("vkGetPhysicalDeviceSurfacePresentModesKHR", e))?;

            Ok(SurfaceSupport {
                capabilities: capabilities_from_vk(&capabilities),
                formats: formats.into_iter().map(surface_format_from_vk).collect(),
                present_modes: present_modes.into_iter().map(present_mode_from_vk).collect(),
            })
        }
    }

    fn graphics_queue_family(&self) -> u32 {
        self.queue_families.graphics
    }

    fn present_queue_family(&self) -> u32 {
        self.queue_families.present
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<SwapchainHandle> {
        // The transform is a property of the surface, not of the presenter's choices
        let current_transform = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
        }
        .map_err(|e| check("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?
        .current_transform;

        let (sharing_mode, family_indices) = sharing_mode_to_vk(desc.sharing_mode);
        let info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(desc.image_count)
            .image_format(format_to_vk(desc.surface_format.format))
            .image_color_space(color_space_to_vk(desc.surface_format.color_space))
            .image_extent(extent_to_vk(desc.extent))
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&family_indices)
            .pre_transform(current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(desc.present_mode))
            .clipped(true);

        let swapchain = unsafe { self.swapchain_loader.create_swapchain(&info, None) }
            .map_err(|e| check("vkCreateSwapchainKHR", e))?;
        engine_trace!(
            LOG_SOURCE,
            "Created swapchain {:#x} ({}x{}, {} images)",
            swapchain.as_raw(),
            desc.extent.width,
            desc.extent.height,
            desc.image_count
        );
        Ok(SwapchainHandle::from_raw(swapchain.as_raw()))
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        unsafe {
            self.swapchain_loader
                .destroy_swapchain(vk::SwapchainKHR::from_raw(swapchain.as_raw()), None)
        };
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        let images = unsafe {
            self.swapchain_loader
                .get_swapchain_images(vk::SwapchainKHR::from_raw(swapchain.as_raw()))
        }
        .map_err(|e| check("vkGetSwapchainImagesKHR", e))?;
        Ok(images.into_iter().map(|image| ImageHandle::from_raw(image.as_raw())).collect())
    }

    fn create_image_view(&self, image: ImageHandle, format: TextureFormat) -> Result<ImageViewHandle> {
        let view = self.create_view(
            vk::Image::from_raw(image.as_raw()),
            format_to_vk(format),
            vk::ImageAspectFlags::COLOR,
        )?;
        Ok(ImageViewHandle::from_raw(view.as_raw()))
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        unsafe {
            self.device
                .destroy_image_view(vk::ImageView::from_raw(view.as_raw()), None)
        };
    }

    fn create_depth_buffer(&self, format: TextureFormat, extent: Extent2D) -> Result<DepthBuffer> {
        if !format.is_depth() {
            return Err(Error::ConfigurationError(format!(
                "{:?} is not a depth format",
                format
            )));
        }
        let vk_format = format_to_vk(format);

        let info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk_format)
            .extent(vk::Extent3D { width: extent.width, height: extent.height, depth: 1 })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = self
                .device
                .create_image(&info, None)
                .map_err(|e| check("vkCreateImage", e))?;
            let requirements = self.device.get_image_memory_requirements(image);

            let allocation = lock(&*self.allocator).allocate(&gpu_allocator::vulkan::AllocationCreateDesc {
                name: "depth_buffer",
                requirements,
                location: gpu_allocator::MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: gpu_allocator::vulkan::AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(LOG_SOURCE, "Failed to allocate {:.2} MB for depth buffer: {:?}", size_mb, e);
                    self.device.destroy_image(image, None);
                    return Err(Error::OutOfMemory);
                }
            };

            let cleanup = |allocation: Allocation| {
                self.device.destroy_image(image, None);
                if let Err(e) = lock(&*self.allocator).free(allocation) {
                    engine_warn!(LOG_SOURCE, "Failed to free depth allocation: {:?}", e);
                }
            };

            if let Err(e) = self
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
            {
                cleanup(allocation);
                return Err(check("vkBindImageMemory", e));
            }

            let view = match self.create_view(image, vk_format, depth_aspect(format)) {
                Ok(view) => view,
                Err(e) => {
                    cleanup(allocation);
                    return Err(e);
                }
            };

            lock(&self.depth_images).insert(image.as_raw(), DepthImage { image, view, allocation });

            Ok(DepthBuffer {
                handle: DepthBufferHandle::from_raw(image.as_raw()),
                view: ImageViewHandle::from_raw(view.as_raw()),
                format,
                extent,
            })
        }
    }

    fn destroy_depth_buffer(&self, depth: DepthBuffer) {
        let Some(image) = lock(&self.depth_images).remove(&depth.handle.as_raw()) else {
            engine_warn!(LOG_SOURCE, "destroy_depth_buffer: unknown depth buffer {:#x}", depth.handle.as_raw());
            return;
        };
        unsafe {
            self.device.destroy_image_view(image.view, None);
            self.device.destroy_image(image.image, None);
        }
        if let Err(e) = lock(&*self.allocator).free(image.allocation) {
            engine_warn!(LOG_SOURCE, "Failed to free depth allocation: {:?}", e);
        }
    }

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
        color_format: TextureFormat,
    ) -> Result<RenderPassHandle> {
        let render_pass = vulkan_render_pass::create_render_pass(&self.device, descriptor, color_format)
            .map_err(|e| check(&format!("vkCreateRenderPass ({})", descriptor.name), e))?;
        Ok(RenderPassHandle::from_raw(render_pass.as_raw()))
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        unsafe {
            self.device
                .destroy_render_pass(vk::RenderPass::from_raw(render_pass.as_raw()), None)
        };
    }

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let views: Vec<vk::ImageView> = attachments
            .iter()
            .map(|view| vk::ImageView::from_raw(view.as_raw()))
            .collect();
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(vk::RenderPass::from_raw(render_pass.as_raw()))
            .attachments(&views)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = unsafe { self.device.create_framebuffer(&info, None) }
            .map_err(|e| check("vkCreateFramebuffer", e))?;
        Ok(FramebufferHandle::from_raw(framebuffer.as_raw()))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        unsafe {
            self.device
                .destroy_framebuffer(vk::Framebuffer::from_raw(framebuffer.as_raw()), None)
        };
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        semaphore: SemaphoreHandle,
        timeout: Duration,
    ) -> Result<AcquireResult> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                vk::SwapchainKHR::from_raw(swapchain.as_raw()),
                timeout_nanos(timeout),
                vk::Semaphore::from_raw(semaphore.as_raw()),
                vk::Fence::null(),
            )
        };
        match result {
            Ok((image_index, false)) => Ok(AcquireResult { image_index, status: SwapchainStatus::Optimal }),
            Ok((image_index, true)) => Ok(AcquireResult { image_index, status: SwapchainStatus::Suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                Ok(AcquireResult { image_index: 0, status: SwapchainStatus::OutOfDate })
            }
            Err(e) => Err(check("vkAcquireNextImageKHR", e)),
        }
    }

    fn queue_present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait_semaphore: SemaphoreHandle,
    ) -> Result<SwapchainStatus> {
        let wait_semaphores = [vk::Semaphore::from_raw(wait_semaphore.as_raw())];
        let swapchains = [vk::SwapchainKHR::from_raw(swapchain.as_raw())];
        let image_indices = [image_index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain_loader.queue_present(self.present_queue, &info) } {
            Ok(false) => Ok(SwapchainStatus::Optimal),
            Ok(true) => Ok(SwapchainStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SwapchainStatus::OutOfDate),
            Err(e) => Err(check("vkQueuePresentKHR", e)),
        }
    }
}
