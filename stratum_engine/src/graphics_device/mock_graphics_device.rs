/// Mock graphics device for unit tests (no GPU required)
///
/// Records every native call, tracks which objects are alive, simulates
/// fence signaling (a submitted fence is signaled by the next wait), and lets
/// tests script surface capabilities, acquire/present results and failures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireResult, BufferHandle, ClearValue, CommandBufferHandle, CommandDevice,
    CommandPoolHandle, DepthBuffer, DepthBufferHandle, DescriptorSetHandle, Extent2D,
    FenceHandle, FenceWait, FramebufferHandle, ImageHandle, ImageViewHandle, IndexType,
    PipelineHandle, PipelineLayoutHandle, PresentDevice, PresentMode, Rect2D, RenderPassBegin,
    RenderPassHandle, SemaphoreHandle, ShaderStageFlags, SubmitDesc, SurfaceCapabilities,
    SurfaceFormat, SurfaceSupport, SwapchainDesc, SwapchainHandle, SwapchainStatus, SyncDevice,
    TextureFormat, Viewport,
};
use crate::render_pass::{PassOps, RenderPassDescriptor};
use crate::window::SurfaceWindow;

// ============================================================================
// Recorded calls
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    CreateFence { fence: FenceHandle, signaled: bool },
    DestroyFence(FenceHandle),
    CreateSemaphore(SemaphoreHandle),
    DestroySemaphore(SemaphoreHandle),
    WaitForFence(FenceHandle),
    ResetFence(FenceHandle),
    WaitIdle,
    QuerySurface,
    CreateSwapchain { swapchain: SwapchainHandle, desc: SwapchainDesc },
    DestroySwapchain(SwapchainHandle),
    CreateImageView(ImageViewHandle),
    DestroyImageView(ImageViewHandle),
    CreateDepthBuffer { depth: DepthBufferHandle, format: TextureFormat, extent: Extent2D },
    DestroyDepthBuffer(DepthBufferHandle),
    CreateRenderPass {
        render_pass: RenderPassHandle,
        name: String,
        color_format: TextureFormat,
        ops: PassOps,
    },
    DestroyRenderPass(RenderPassHandle),
    CreateFramebuffer {
        framebuffer: FramebufferHandle,
        render_pass: RenderPassHandle,
        attachments: Vec<ImageViewHandle>,
        extent: Extent2D,
    },
    DestroyFramebuffer(FramebufferHandle),
    AcquireNextImage { semaphore: SemaphoreHandle },
    QueuePresent { image_index: u32, wait: SemaphoreHandle },
    CreateCommandPool(CommandPoolHandle),
    DestroyCommandPool(CommandPoolHandle),
    AllocateCommandBuffers { count: u32 },
    BeginCommandBuffer(CommandBufferHandle),
    EndCommandBuffer(CommandBufferHandle),
    BeginRenderPass {
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        render_area: Rect2D,
        clear_values: Vec<ClearValue>,
    },
    EndRenderPass,
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindPipeline(PipelineHandle),
    BindDescriptorSet { set_index: u32, set: DescriptorSetHandle },
    PushConstants { stages: ShaderStageFlags, offset: u32, size: usize },
    BindVertexBuffer(BufferHandle),
    BindIndexBuffer(BufferHandle),
    Draw { vertex_count: u32, instance_count: u32 },
    DrawIndexed { index_count: u32, instance_count: u32 },
    QueueSubmit {
        command_buffers: Vec<CommandBufferHandle>,
        wait: Option<SemaphoreHandle>,
        signal: Option<SemaphoreHandle>,
        fence: Option<FenceHandle>,
    },
}

/// Kinds of native objects whose lifetime the mock tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockObject {
    Fence,
    Semaphore,
    Swapchain,
    ImageView,
    DepthBuffer,
    RenderPass,
    Framebuffer,
    CommandPool,
}

#[derive(Debug, Clone, Copy, Default)]
struct MockFence {
    signaled: bool,
    pending: bool,
}

struct MockState {
    next_handle: u64,
    calls: Vec<MockCall>,
    live: FxHashMap<MockObject, FxHashSet<u64>>,
    fences: FxHashMap<u64, MockFence>,
    swapchain_images: FxHashMap<u64, Vec<ImageHandle>>,
    next_image: u32,
    surface: SurfaceSupport,
    graphics_family: u32,
    present_family: u32,
    acquire_script: VecDeque<SwapchainStatus>,
    present_script: VecDeque<SwapchainStatus>,
    fence_wait_script: VecDeque<FenceWait>,
    fail_next: Option<&'static str>,
}

impl MockState {
    fn handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn create(&mut self, kind: MockObject) -> u64 {
        let handle = self.handle();
        self.live.entry(kind).or_default().insert(handle);
        handle
    }

    fn destroy(&mut self, kind: MockObject, handle: u64) {
        let removed = self.live.get_mut(&kind).map(|set| set.remove(&handle)).unwrap_or(false);
        assert!(removed, "destroying unknown {:?} {}", kind, handle);
    }

    fn is_live(&self, kind: MockObject, handle: u64) -> bool {
        self.live.get(&kind).map(|set| set.contains(&handle)).unwrap_or(false)
    }

    fn check_fail(&mut self, op: &'static str) -> Result<()> {
        if self.fail_next == Some(op) {
            self.fail_next = None;
            return Err(Error::BackendError(format!("{} failed (mock)", op)));
        }
        Ok(())
    }
}

// ============================================================================
// MockGraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    state: Mutex<MockState>,
}

impl MockGraphicsDevice {
    /// Device whose surface lets the window decide the extent
    ///
    /// Capabilities: 2..=8 images, extent 1x1..=4096x4096. Formats:
    /// B8G8R8A8_SRGB. Present modes: Fifo, Mailbox. One queue family.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_handle: 1,
                calls: Vec::new(),
                live: FxHashMap::default(),
                fences: FxHashMap::default(),
                swapchain_images: FxHashMap::default(),
                next_image: 0,
                surface: SurfaceSupport {
                    capabilities: SurfaceCapabilities {
                        min_image_count: 2,
                        max_image_count: 8,
                        current_extent: None,
                        min_image_extent: Extent2D::new(1, 1),
                        max_image_extent: Extent2D::new(4096, 4096),
                    },
                    formats: vec![SurfaceFormat::srgb(TextureFormat::B8G8R8A8_SRGB)],
                    present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
                },
                graphics_family: 0,
                present_family: 0,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                fence_wait_script: VecDeque::new(),
                fail_next: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: MockCall) {
        self.state().calls.push(call);
    }

    // ===== Inspection =====

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Number of live objects of a kind
    pub fn live_count(&self, kind: MockObject) -> usize {
        self.state().live.get(&kind).map(|set| set.len()).unwrap_or(0)
    }

    /// Live objects of every kind
    pub fn total_live(&self) -> usize {
        self.state().live.values().map(|set| set.len()).sum()
    }

    // ===== Scripting =====

    pub fn set_surface_extent(&self, extent: Option<Extent2D>) {
        self.state().surface.capabilities.current_extent = extent;
    }

    pub fn set_capabilities(&self, capabilities: SurfaceCapabilities) {
        self.state().surface.capabilities = capabilities;
    }

    pub fn set_surface_formats(&self, formats: Vec<SurfaceFormat>) {
        self.state().surface.formats = formats;
    }

    pub fn set_present_modes(&self, modes: Vec<PresentMode>) {
        self.state().surface.present_modes = modes;
    }

    pub fn set_queue_families(&self, graphics: u32, present: u32) {
        let mut state = self.state();
        state.graphics_family = graphics;
        state.present_family = present;
    }

    /// Status returned by the next acquire (Optimal once the script is empty)
    pub fn push_acquire_status(&self, status: SwapchainStatus) {
        self.state().acquire_script.push_back(status);
    }

    /// Status returned by the next present (Optimal once the script is empty)
    pub fn push_present_status(&self, status: SwapchainStatus) {
        self.state().present_script.push_back(status);
    }

    /// Outcome of the next fence wait, overriding the simulation
    pub fn push_fence_wait(&self, wait: FenceWait) {
        self.state().fence_wait_script.push_back(wait);
    }

    /// Make the next call of operation `op` fail with a backend error
    pub fn fail_next(&self, op: &'static str) {
        self.state().fail_next = Some(op);
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SyncDevice
// ============================================================================

impl SyncDevice for MockGraphicsDevice {
    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let mut state = self.state();
        state.check_fail("create_fence")?;
        let fence = FenceHandle::from_raw(state.create(MockObject::Fence));
        state.fences.insert(fence.as_raw(), MockFence { signaled, pending: false });
        state.calls.push(MockCall::CreateFence { fence, signaled });
        Ok(fence)
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        let mut state = self.state();
        state.destroy(MockObject::Fence, fence.as_raw());
        state.fences.remove(&fence.as_raw());
        state.calls.push(MockCall::DestroyFence(fence));
    }

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let mut state = self.state();
        state.check_fail("create_semaphore")?;
        let semaphore = SemaphoreHandle::from_raw(state.create(MockObject::Semaphore));
        state.calls.push(MockCall::CreateSemaphore(semaphore));
        Ok(semaphore)
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        let mut state = self.state();
        state.destroy(MockObject::Semaphore, semaphore.as_raw());
        state.calls.push(MockCall::DestroySemaphore(semaphore));
    }

    fn wait_for_fence(&self, fence: FenceHandle, _timeout: Duration) -> Result<FenceWait> {
        let mut state = self.state();
        state.calls.push(MockCall::WaitForFence(fence));
        state.check_fail("wait_for_fence")?;
        if let Some(scripted) = state.fence_wait_script.pop_front() {
            return Ok(scripted);
        }
        let entry = state
            .fences
            .get_mut(&fence.as_raw())
            .ok_or_else(|| Error::InvalidResource(format!("unknown fence {}", fence.as_raw())))?;
        if entry.pending {
            // The GPU finishes instantly
            entry.pending = false;
            entry.signaled = true;
        }
        Ok(if entry.signaled { FenceWait::Signaled } else { FenceWait::TimedOut })
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::ResetFence(fence));
        state.check_fail("reset_fence")?;
        let entry = state
            .fences
            .get_mut(&fence.as_raw())
            .ok_or_else(|| Error::InvalidResource(format!("unknown fence {}", fence.as_raw())))?;
        if entry.pending {
            return Err(Error::InvalidResource("reset of a fence still in flight".to_string()));
        }
        entry.signaled = false;
        Ok(())
    }
}

// ============================================================================
// PresentDevice
// ============================================================================

impl PresentDevice for MockGraphicsDevice {
    fn wait_idle(&self) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::WaitIdle);
        state.check_fail("wait_idle")?;
        for fence in state.fences.values_mut() {
            if fence.pending {
                fence.pending = false;
                fence.signaled = true;
            }
        }
        Ok(())
    }

    fn surface_support(&self) -> Result<SurfaceSupport> {
        let mut state = self.state();
        state.calls.push(MockCall::QuerySurface);
        state.check_fail("surface_support")?;
        Ok(state.surface.clone())
    }

    fn graphics_queue_family(&self) -> u32 {
        self.state().graphics_family
    }

    fn present_queue_family(&self) -> u32 {
        self.state().present_family
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<SwapchainHandle> {
        let mut state = self.state();
        state.check_fail("create_swapchain")?;
        let swapchain = SwapchainHandle::from_raw(state.create(MockObject::Swapchain));
        let images = (0..desc.image_count)
            .map(|_| ImageHandle::from_raw(state.handle()))
            .collect();
        state.swapchain_images.insert(swapchain.as_raw(), images);
        state.next_image = 0;
        state.calls.push(MockCall::CreateSwapchain { swapchain, desc: *desc });
        Ok(swapchain)
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        let mut state = self.state();
        state.destroy(MockObject::Swapchain, swapchain.as_raw());
        state.swapchain_images.remove(&swapchain.as_raw());
        state.calls.push(MockCall::DestroySwapchain(swapchain));
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        let state = self.state();
        state
            .swapchain_images
            .get(&swapchain.as_raw())
            .cloned()
            .ok_or_else(|| Error::InvalidResource("unknown swapchain".to_string()))
    }

    fn create_image_view(&self, _image: ImageHandle, _format: TextureFormat) -> Result<ImageViewHandle> {
        let mut state = self.state();
        state.check_fail("create_image_view")?;
        let view = ImageViewHandle::from_raw(state.create(MockObject::ImageView));
        state.calls.push(MockCall::CreateImageView(view));
        Ok(view)
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        let mut state = self.state();
        state.destroy(MockObject::ImageView, view.as_raw());
        state.calls.push(MockCall::DestroyImageView(view));
    }

    fn create_depth_buffer(&self, format: TextureFormat, extent: Extent2D) -> Result<DepthBuffer> {
        let mut state = self.state();
        state.check_fail("create_depth_buffer")?;
        let handle = DepthBufferHandle::from_raw(state.create(MockObject::DepthBuffer));
        let view = ImageViewHandle::from_raw(state.handle());
        state.calls.push(MockCall::CreateDepthBuffer { depth: handle, format, extent });
        Ok(DepthBuffer { handle, view, format, extent })
    }

    fn destroy_depth_buffer(&self, depth: DepthBuffer) {
        let mut state = self.state();
        state.destroy(MockObject::DepthBuffer, depth.handle.as_raw());
        state.calls.push(MockCall::DestroyDepthBuffer(depth.handle));
    }

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
        color_format: TextureFormat,
    ) -> Result<RenderPassHandle> {
        let mut state = self.state();
        state.check_fail("create_render_pass")?;
        let render_pass = RenderPassHandle::from_raw(state.create(MockObject::RenderPass));
        state.calls.push(MockCall::CreateRenderPass {
            render_pass,
            name: descriptor.name.clone(),
            color_format,
            ops: descriptor.ops(),
        });
        Ok(render_pass)
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        let mut state = self.state();
        state.destroy(MockObject::RenderPass, render_pass.as_raw());
        state.calls.push(MockCall::DestroyRenderPass(render_pass));
    }

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let mut state = self.state();
        state.check_fail("create_framebuffer")?;
        assert!(state.is_live(MockObject::RenderPass, render_pass.as_raw()));
        let framebuffer = FramebufferHandle::from_raw(state.create(MockObject::Framebuffer));
        state.calls.push(MockCall::CreateFramebuffer {
            framebuffer,
            render_pass,
            attachments: attachments.to_vec(),
            extent,
        });
        Ok(framebuffer)
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut state = self.state();
        state.destroy(MockObject::Framebuffer, framebuffer.as_raw());
        state.calls.push(MockCall::DestroyFramebuffer(framebuffer));
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        semaphore: SemaphoreHandle,
        _timeout: Duration,
    ) -> Result<AcquireResult> {
        let mut state = self.state();
        state.calls.push(MockCall::AcquireNextImage { semaphore });
        state.check_fail("acquire_next_image")?;
        let image_count = state
            .swapchain_images
            .get(&swapchain.as_raw())
            .map(|images| images.len() as u32)
            .ok_or_else(|| Error::InvalidResource("acquire on unknown swapchain".to_string()))?;
        let status = state.acquire_script.pop_front().unwrap_or(SwapchainStatus::Optimal);
        if status == SwapchainStatus::OutOfDate {
            return Ok(AcquireResult { image_index: 0, status });
        }
        let image_index = state.next_image % image_count;
        state.next_image = state.next_image.wrapping_add(1);
        Ok(AcquireResult { image_index, status })
    }

    fn queue_present(
        &self,
        _swapchain: SwapchainHandle,
        image_index: u32,
        wait_semaphore: SemaphoreHandle,
    ) -> Result<SwapchainStatus> {
        let mut state = self.state();
        state.calls.push(MockCall::QueuePresent { image_index, wait: wait_semaphore });
        state.check_fail("queue_present")?;
        Ok(state.present_script.pop_front().unwrap_or(SwapchainStatus::Optimal))
    }
}

// ============================================================================
// CommandDevice
// ============================================================================

impl CommandDevice for MockGraphicsDevice {
    fn create_command_pool(&self) -> Result<CommandPoolHandle> {
        let mut state = self.state();
        state.check_fail("create_command_pool")?;
        let pool = CommandPoolHandle::from_raw(state.create(MockObject::CommandPool));
        state.calls.push(MockCall::CreateCommandPool(pool));
        Ok(pool)
    }

    fn destroy_command_pool(&self, pool: CommandPoolHandle) {
        let mut state = self.state();
        state.destroy(MockObject::CommandPool, pool.as_raw());
        state.calls.push(MockCall::DestroyCommandPool(pool));
    }

    fn allocate_command_buffers(
        &self,
        pool: CommandPoolHandle,
        count: u32,
    ) -> Result<Vec<CommandBufferHandle>> {
        let mut state = self.state();
        state.check_fail("allocate_command_buffers")?;
        assert!(state.is_live(MockObject::CommandPool, pool.as_raw()));
        state.calls.push(MockCall::AllocateCommandBuffers { count });
        Ok((0..count).map(|_| CommandBufferHandle::from_raw(state.handle())).collect())
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut state = self.state();
        state.check_fail("begin_command_buffer")?;
        state.calls.push(MockCall::BeginCommandBuffer(command_buffer));
        Ok(())
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut state = self.state();
        state.check_fail("end_command_buffer")?;
        state.calls.push(MockCall::EndCommandBuffer(command_buffer));
        Ok(())
    }

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, begin: &RenderPassBegin<'_>) {
        self.record(MockCall::BeginRenderPass {
            command_buffer,
            render_pass: begin.render_pass,
            framebuffer: begin.framebuffer,
            render_area: begin.render_area,
            clear_values: begin.clear_values.to_vec(),
        });
    }

    fn cmd_end_render_pass(&self, _command_buffer: CommandBufferHandle) {
        self.record(MockCall::EndRenderPass);
    }

    fn cmd_set_viewport(&self, _command_buffer: CommandBufferHandle, viewport: Viewport) {
        self.record(MockCall::SetViewport(viewport));
    }

    fn cmd_set_scissor(&self, _command_buffer: CommandBufferHandle, scissor: Rect2D) {
        self.record(MockCall::SetScissor(scissor));
    }

    fn cmd_bind_pipeline(&self, _command_buffer: CommandBufferHandle, pipeline: PipelineHandle) {
        self.record(MockCall::BindPipeline(pipeline));
    }

    fn cmd_bind_descriptor_set(
        &self,
        _command_buffer: CommandBufferHandle,
        _layout: PipelineLayoutHandle,
        set_index: u32,
        set: DescriptorSetHandle,
    ) {
        self.record(MockCall::BindDescriptorSet { set_index, set });
    }

    fn cmd_push_constants(
        &self,
        _command_buffer: CommandBufferHandle,
        _layout: PipelineLayoutHandle,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) {
        self.record(MockCall::PushConstants { stages, offset, size: data.len() });
    }

    fn cmd_bind_vertex_buffer(&self, _command_buffer: CommandBufferHandle, buffer: BufferHandle, _offset: u64) {
        self.record(MockCall::BindVertexBuffer(buffer));
    }

    fn cmd_bind_index_buffer(
        &self,
        _command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        _offset: u64,
        _index_type: IndexType,
    ) {
        self.record(MockCall::BindIndexBuffer(buffer));
    }

    fn cmd_draw(
        &self,
        _command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.record(MockCall::Draw { vertex_count, instance_count });
    }

    fn cmd_draw_indexed(
        &self,
        _command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.record(MockCall::DrawIndexed { index_count, instance_count });
    }

    fn queue_submit(&self, submit: &SubmitDesc<'_>) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::QueueSubmit {
            command_buffers: submit.command_buffers.to_vec(),
            wait: submit.wait_semaphore,
            signal: submit.signal_semaphore,
            fence: submit.fence,
        });
        state.check_fail("queue_submit")?;
        if let Some(fence) = submit.fence {
            let entry = state
                .fences
                .get_mut(&fence.as_raw())
                .ok_or_else(|| Error::InvalidResource("submit with unknown fence".to_string()))?;
            if entry.signaled || entry.pending {
                return Err(Error::InvalidResource(
                    "submit with a fence that was not reset".to_string(),
                ));
            }
            entry.pending = true;
        }
        Ok(())
    }
}

// ============================================================================
// MockWindow
// ============================================================================

pub struct MockWindow {
    size: Mutex<(u32, u32)>,
    close_requested: AtomicBool,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: Mutex::new((width, height)), close_requested: AtomicBool::new(false) }
    }

    pub fn set_size(&self, width: u32, height: u32) {
        *self.size.lock().unwrap() = (width, height);
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::SeqCst)
    }
}

impl SurfaceWindow for MockWindow {
    fn framebuffer_size(&self) -> (u32, u32) {
        *self.size.lock().unwrap()
    }

    fn request_close(&self) {
        self.close_requested.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
