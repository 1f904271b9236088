/// Graphics device traits
///
/// The rendering core never talks to a native API directly. Every native call
/// goes through one of these traits, split by concern: synchronization
/// primitives, presentation resources, and command recording/submission.
/// Backends implement all three; `GraphicsDevice` is blanket-implemented on top.
///
/// Methods take `&self`: backends keep interior state (allocators, handle
/// tables) behind their own locks, the way the native API itself is
/// externally synchronized per object rather than per device.

use std::time::Duration;

use crate::error::Result;
use crate::graphics_device::{
    AcquireResult, BufferHandle, CommandBufferHandle, CommandPoolHandle, DepthBuffer,
    DescriptorSetHandle, Extent2D, FenceHandle, FenceWait, FramebufferHandle, ImageHandle,
    ImageViewHandle, IndexType, PipelineHandle, PipelineLayoutHandle, Rect2D, RenderPassBegin,
    RenderPassHandle, SemaphoreHandle, ShaderStageFlags, SubmitDesc, SurfaceSupport,
    SwapchainDesc, SwapchainHandle, SwapchainStatus, TextureFormat, Viewport,
};
use crate::render_pass::RenderPassDescriptor;

/// Fences and semaphores
pub trait SyncDevice {
    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> Result<FenceHandle>;

    fn destroy_fence(&self, fence: FenceHandle);

    fn create_semaphore(&self) -> Result<SemaphoreHandle>;

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);

    /// Block until the fence is signaled or `timeout` elapses
    fn wait_for_fence(&self, fence: FenceHandle, timeout: Duration) -> Result<FenceWait>;

    /// Return the fence to the unsignaled state
    fn reset_fence(&self, fence: FenceHandle) -> Result<()>;
}

/// Surface queries, swapchain, attachments, render passes and presentation
pub trait PresentDevice {
    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> Result<()>;

    /// Current surface capabilities, formats and present modes
    fn surface_support(&self) -> Result<SurfaceSupport>;

    fn graphics_queue_family(&self) -> u32;

    fn present_queue_family(&self) -> u32;

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<SwapchainHandle>;

    fn destroy_swapchain(&self, swapchain: SwapchainHandle);

    /// Images owned by the swapchain, in presentation-index order
    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>>;

    /// 2D color view over a swapchain image
    fn create_image_view(&self, image: ImageHandle, format: TextureFormat) -> Result<ImageViewHandle>;

    fn destroy_image_view(&self, view: ImageViewHandle);

    /// Allocate a depth image with its memory and view
    fn create_depth_buffer(&self, format: TextureFormat, extent: Extent2D) -> Result<DepthBuffer>;

    fn destroy_depth_buffer(&self, depth: DepthBuffer);

    /// Create the native render pass for `descriptor` with the resolved color format
    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
        color_format: TextureFormat,
    ) -> Result<RenderPassHandle>;

    fn destroy_render_pass(&self, render_pass: RenderPassHandle);

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        extent: Extent2D,
    ) -> Result<FramebufferHandle>;

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle);

    /// Acquire the next presentable image, signaling `semaphore` when it is ready
    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        semaphore: SemaphoreHandle,
        timeout: Duration,
    ) -> Result<AcquireResult>;

    /// Queue `image_index` for presentation once `wait_semaphore` is signaled
    fn queue_present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait_semaphore: SemaphoreHandle,
    ) -> Result<SwapchainStatus>;
}

/// Command pools, recording and queue submission
pub trait CommandDevice {
    /// Graphics-family pool whose buffers can be reset individually
    fn create_command_pool(&self) -> Result<CommandPoolHandle>;

    /// Destroys the pool and frees every buffer allocated from it
    fn destroy_command_pool(&self, pool: CommandPoolHandle);

    fn allocate_command_buffers(
        &self,
        pool: CommandPoolHandle,
        count: u32,
    ) -> Result<Vec<CommandBufferHandle>>;

    /// Begin one-time-submit recording (implicitly resets the buffer)
    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, begin: &RenderPassBegin<'_>);

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle);

    fn cmd_set_viewport(&self, command_buffer: CommandBufferHandle, viewport: Viewport);

    fn cmd_set_scissor(&self, command_buffer: CommandBufferHandle, scissor: Rect2D);

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle);

    fn cmd_bind_descriptor_set(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        set_index: u32,
        set: DescriptorSetHandle,
    );

    fn cmd_push_constants(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    );

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle, offset: u64);

    fn cmd_bind_index_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    );

    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    fn cmd_draw_indexed(
        &self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    fn queue_submit(&self, submit: &SubmitDesc<'_>) -> Result<()>;
}

/// Everything the frame renderer needs from a backend
pub trait GraphicsDevice: SyncDevice + PresentDevice + CommandDevice {}

impl<T: SyncDevice + PresentDevice + CommandDevice> GraphicsDevice for T {}
