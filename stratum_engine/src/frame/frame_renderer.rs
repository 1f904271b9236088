/// FrameRenderer - per-frame orchestration
///
/// One `render_frame` call: wait the slot fence, acquire an image, collect
/// and record every camera's draw commands into its own command buffer,
/// submit them together, present, then advance the frame slot. Swapchain
/// recreation is triggered here and nowhere else.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use crate::camera::Camera;
use crate::config::RendererConfig;
use crate::draw::{CollectedCommands, DrawCommandCollector, PassCommands, RenderContext, RenderScene};
use crate::error::{Error, Result};
use crate::frame::{
    FrameOutcome, FrameStats, FrameSynchronizer, SkipReason, SwapchainPresenter,
};
use crate::graphics_device::{
    CommandBufferHandle, CommandDevice, CommandPoolHandle, DescriptorSetHandle, GraphicsDevice,
    PipelineHandle, PipelineLayoutHandle, PresentDevice, RenderPassBegin, SubmitDesc,
    SwapchainStatus,
};
use crate::render_pass::{AttachmentHistory, RenderPassCatalog};
use crate::window::SurfaceWindow;
use crate::{engine_debug, engine_error, engine_info};

pub struct FrameRenderer<D: GraphicsDevice> {
    device: Arc<D>,
    window: Arc<dyn SurfaceWindow>,
    config: RendererConfig,
    catalog: Arc<RenderPassCatalog>,
    presenter: SwapchainPresenter,
    sync: FrameSynchronizer,
    collector: DrawCommandCollector,
    command_pool: Option<CommandPoolHandle>,
    /// [frame slot][camera]
    command_buffers: Vec<Vec<CommandBufferHandle>>,
    current_frame: usize,
    frame_number: u64,
    needs_recreate: bool,
    /// Window size when the swapchain last came out with no area
    minimized_at: Option<(u32, u32)>,
    last_stats: FrameStats,
    destroyed: bool,
}

impl<D: GraphicsDevice> FrameRenderer<D> {
    /// Validate the configuration, build the presenter and the frame slots
    pub fn new(
        device: Arc<D>,
        window: Arc<dyn SurfaceWindow>,
        catalog: Arc<RenderPassCatalog>,
        config: RendererConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut presenter = SwapchainPresenter::new(Arc::clone(&catalog), &config);
        presenter.initialize(&*device, &*window)?;

        let sync = match FrameSynchronizer::new(
            &*device,
            config.frames_in_flight,
            presenter.image_count(),
            config.fence_timeout,
        ) {
            Ok(sync) => sync,
            Err(e) => {
                let _ = presenter.dispose(&*device);
                return Err(e);
            }
        };

        let minimized_at = presenter.is_minimized().then(|| window.framebuffer_size());

        engine_info!(
            "stratum::FrameRenderer",
            "Frame renderer ready: {} passes, {} frames in flight",
            catalog.len(),
            config.frames_in_flight
        );

        Ok(Self {
            device,
            window,
            command_buffers: vec![Vec::new(); config.frames_in_flight],
            config,
            collector: DrawCommandCollector::new(Arc::clone(&catalog)),
            catalog,
            presenter,
            sync,
            command_pool: None,
            current_frame: 0,
            frame_number: 0,
            needs_recreate: false,
            minimized_at,
            last_stats: FrameStats::default(),
            destroyed: false,
        })
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<RenderPassCatalog> {
        &self.catalog
    }

    pub fn presenter(&self) -> &SwapchainPresenter {
        &self.presenter
    }

    pub fn synchronizer(&self) -> &FrameSynchronizer {
        &self.sync
    }

    /// Frame-in-flight slot the next frame will use
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Number of frames presented so far
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn needs_recreate(&self) -> bool {
        self.needs_recreate
    }

    /// Counters of the last presented frame
    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Recreate the swapchain before the next acquire (e.g. on window resize)
    pub fn request_recreate(&mut self) {
        self.needs_recreate = true;
    }

    // ===== FRAME =====

    /// Render and present one frame of `scene`
    ///
    /// Errors are fatal to the window session: they are logged, the window
    /// is asked to close, and the error is returned.
    pub fn render_frame(&mut self, scene: &dyn RenderScene, delta_time: Duration) -> Result<FrameOutcome> {
        match self.try_render_frame(scene, delta_time) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                engine_error!(
                    "stratum::FrameRenderer",
                    "Frame {} failed, closing window: {}",
                    self.frame_number,
                    e
                );
                self.window.request_close();
                Err(e)
            }
        }
    }

    fn try_render_frame(&mut self, scene: &dyn RenderScene, delta_time: Duration) -> Result<FrameOutcome> {
        if self.destroyed {
            return Err(Error::InvalidResource("render_frame after destroy".to_string()));
        }
        let device = Arc::clone(&self.device);
        let device = &*device;

        // Not every platform reports out-of-date when a window is minimized.
        // A surface can also report no area while the window has some: retry
        // only once the window size moves.
        let window_size = self.window.framebuffer_size();
        let has_area = window_size.0 > 0 && window_size.1 > 0;
        let lost_area = !self.presenter.is_minimized() && !has_area;
        let regained_area = self.presenter.is_minimized()
            && has_area
            && self.minimized_at != Some(window_size);
        if self.needs_recreate || lost_area || regained_area {
            self.recreate_swapchain(device)?;
        }
        if self.presenter.is_minimized() {
            return Ok(FrameOutcome::Skipped(SkipReason::Minimized));
        }

        let cameras: Cow<'_, [Camera]> = if !scene.cameras().is_empty() {
            Cow::Borrowed(scene.cameras())
        } else if self.config.fallback_camera {
            Cow::Owned(vec![Camera::screen_space(self.presenter.extent())])
        } else {
            return Err(Error::ConfigurationError("No camera to render".to_string()));
        };

        // Prepare: the slot's previous submission must be finished
        let frame = self.sync.frame_sync(self.current_frame);
        self.sync.wait_for_fence(device, frame.fence)?;

        let acquired = self.presenter.acquire_next_image(device, frame.image_available)?;
        match acquired.status {
            SwapchainStatus::OutOfDate => {
                engine_debug!("stratum::FrameRenderer", "Swapchain out of date at acquire");
                self.recreate_swapchain(device)?;
                return Ok(FrameOutcome::Skipped(SkipReason::OutOfDate));
            }
            SwapchainStatus::Suboptimal => self.needs_recreate = true,
            SwapchainStatus::Optimal => {}
        }
        // Reset only once an image is certain to be submitted
        self.sync.reset_fence(device, frame.fence)?;
        let image_index = acquired.image_index;
        let render_finished = self.sync.image_sync(image_index)?;

        self.ensure_command_buffers(device, cameras.len())?;

        let mut stats = FrameStats {
            frame_number: self.frame_number,
            image_index,
            cameras: cameras.len(),
            ..FrameStats::default()
        };
        let mut history = AttachmentHistory::default();
        for (camera_index, camera) in cameras.iter().enumerate() {
            let command_buffer = self.command_buffers[self.current_frame][camera_index];
            let context = RenderContext::new(camera, &self.catalog, delta_time, self.frame_number);
            let collected = self.collector.collect_scene(&context, scene)?;
            history.next_camera();
            record_camera(
                device,
                command_buffer,
                camera,
                &self.catalog,
                &mut self.presenter,
                collected,
                image_index,
                &mut history,
                &mut stats,
            )?;
        }

        device.queue_submit(&SubmitDesc {
            command_buffers: &self.command_buffers[self.current_frame][..cameras.len()],
            wait_semaphore: Some(frame.image_available),
            signal_semaphore: Some(render_finished),
            fence: Some(frame.fence),
        })?;
        self.sync.mark_submitted(frame.fence)?;

        let present_status = self.presenter.present(device, image_index, render_finished)?;

        self.current_frame = (self.current_frame + 1) % self.sync.frames_in_flight();
        self.frame_number += 1;
        self.last_stats = stats;

        match present_status {
            SwapchainStatus::OutOfDate | SwapchainStatus::Suboptimal => {
                engine_debug!(
                    "stratum::FrameRenderer",
                    "Present reported {:?}, recreating before next acquire",
                    present_status
                );
                self.needs_recreate = true;
                Ok(FrameOutcome::PresentedNeedsRecreate)
            }
            SwapchainStatus::Optimal if self.needs_recreate => Ok(FrameOutcome::PresentedNeedsRecreate),
            SwapchainStatus::Optimal => Ok(FrameOutcome::Presented),
        }
    }

    fn recreate_swapchain(&mut self, device: &D) -> Result<()> {
        let window_size = self.window.framebuffer_size();
        self.presenter.recreate(device, &*self.window)?;
        if self.presenter.is_minimized() {
            self.minimized_at = Some(window_size);
        } else {
            self.minimized_at = None;
            self.sync.resize_image_pool(device, self.presenter.image_count())?;
        }
        self.needs_recreate = false;
        Ok(())
    }

    /// Lazily create the graphics pool and this slot's command buffers
    fn ensure_command_buffers(&mut self, device: &D, camera_count: usize) -> Result<()> {
        let pool = match self.command_pool {
            Some(pool) => pool,
            None => {
                let pool = device.create_command_pool()?;
                self.command_pool = Some(pool);
                pool
            }
        };

        let buffers = &mut self.command_buffers[self.current_frame];
        if buffers.len() < camera_count {
            let missing = (camera_count - buffers.len()) as u32;
            buffers.extend(device.allocate_command_buffers(pool, missing)?);
        }
        Ok(())
    }

    // ===== TEARDOWN =====

    /// Wait for the GPU and destroy every object this renderer created
    ///
    /// Called by `Drop`; calling it earlier makes errors observable.
    pub fn destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        let device = &*self.device;
        device.wait_idle()?;
        // Destroying the pool frees its command buffers
        if let Some(pool) = self.command_pool.take() {
            device.destroy_command_pool(pool);
        }
        self.command_buffers.clear();
        self.sync.destroy(device);
        self.presenter.dispose(device)?;
        engine_info!("stratum::FrameRenderer", "Frame renderer destroyed after {} frames", self.frame_number);
        Ok(())
    }
}

impl<D: GraphicsDevice> Drop for FrameRenderer<D> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            engine_error!("stratum::FrameRenderer", "Teardown failed: {}", e);
        }
    }
}

// ============================================================================
// Recording
// ============================================================================

/// Record one camera's passes into `command_buffer`
///
/// Passes run in catalog order. A pass is recorded when the collection made
/// it active and it is either in the camera's mask or always executes; an
/// empty pass is recorded only if it always executes. Always-execute passes
/// outside the camera's mask are begun and ended without draws. `history`
/// carries what earlier passes and cameras of the frame wrote, and picks the
/// render pass variant that keeps it.
#[allow(clippy::too_many_arguments)]
fn record_camera<D: CommandDevice + PresentDevice + ?Sized>(
    device: &D,
    command_buffer: CommandBufferHandle,
    camera: &Camera,
    catalog: &RenderPassCatalog,
    presenter: &mut SwapchainPresenter,
    collected: &CollectedCommands,
    image_index: u32,
    history: &mut AttachmentHistory,
    stats: &mut FrameStats,
) -> Result<()> {
    device.begin_command_buffer(command_buffer)?;

    let extent = presenter.extent();
    let render_area = camera.viewport_rect().clamp_to(extent);
    let scissor = camera.effective_scissor().clamp_to(extent);
    let must_execute = collected.must_execute();
    let candidates = collected.active_passes() & (camera.render_mask() | must_execute);

    for pass in catalog.active_passes(candidates) {
        let Some(pass_index) = catalog.index_of(pass) else {
            continue;
        };
        let descriptor = &catalog.configurations()[pass_index];
        let draws = camera.render_mask().contains(pass);
        let commands = collected.pass(pass_index);
        if (!draws || commands.is_empty()) && !descriptor.always_execute {
            continue;
        }

        let ops = descriptor.ops_after(history, camera.clear_color().is_some());
        let render_pass = presenter.render_pass_with(device, pass_index, ops)?;
        let framebuffer = presenter.framebuffer(pass_index, image_index).ok_or_else(|| {
            Error::InvalidResource(format!(
                "No framebuffer for pass '{}' image {}",
                descriptor.name, image_index
            ))
        })?;
        let clear_values = descriptor.clear_values_for(&ops, camera.clear_color());

        device.cmd_begin_render_pass(
            command_buffer,
            &RenderPassBegin {
                render_pass,
                framebuffer,
                render_area,
                clear_values: clear_values.as_slice(),
            },
        );
        device.cmd_set_viewport(command_buffer, *camera.viewport());
        device.cmd_set_scissor(command_buffer, scissor);
        if draws {
            record_pass(device, command_buffer, commands, stats);
            stats.batches += commands.batch_count(descriptor.batch_strategy.as_ref());
        }
        device.cmd_end_render_pass(command_buffer);
        history.record(&ops);
        stats.passes_recorded += 1;
    }

    device.end_command_buffer(command_buffer)
}

/// Last state bound inside one render pass instance
#[derive(Default)]
struct BoundState {
    pipeline: Option<PipelineHandle>,
    layout: Option<PipelineLayoutHandle>,
    /// Indexed by set number
    sets: Vec<Option<DescriptorSetHandle>>,
}

impl BoundState {
    fn set(&self, set_index: u32) -> Option<DescriptorSetHandle> {
        self.sets.get(set_index as usize).copied().flatten()
    }

    fn store_set(&mut self, set_index: u32, set: DescriptorSetHandle) {
        let index = set_index as usize;
        if self.sets.len() <= index {
            self.sets.resize(index + 1, None);
        }
        self.sets[index] = Some(set);
    }
}

/// Emit the draws of one pass, skipping redundant pipeline and set binds
fn record_pass<D: CommandDevice + ?Sized>(
    device: &D,
    command_buffer: CommandBufferHandle,
    commands: PassCommands<'_>,
    stats: &mut FrameStats,
) {
    let mut bound = BoundState::default();

    for command in commands.iter() {
        if bound.pipeline != Some(command.pipeline) {
            device.cmd_bind_pipeline(command_buffer, command.pipeline);
            bound.pipeline = Some(command.pipeline);
            stats.pipeline_binds += 1;
        }
        if bound.layout != Some(command.pipeline_layout) {
            // Sets bound through another layout are not reusable
            bound.layout = Some(command.pipeline_layout);
            bound.sets.clear();
        }

        for binding in &command.descriptor_sets {
            if bound.set(binding.set_index) != Some(binding.set) {
                device.cmd_bind_descriptor_set(
                    command_buffer,
                    command.pipeline_layout,
                    binding.set_index,
                    binding.set,
                );
                bound.store_set(binding.set_index, binding.set);
                stats.descriptor_binds += 1;
            }
        }

        if let Some(push_constants) = &command.push_constants {
            device.cmd_push_constants(
                command_buffer,
                command.pipeline_layout,
                push_constants.stages(),
                push_constants.offset(),
                &push_constants.bytes(),
            );
        }

        device.cmd_bind_vertex_buffer(command_buffer, command.vertex_buffer, command.vertex_offset);
        let params = &command.params;
        match command.index_buffer {
            Some(index) => {
                device.cmd_bind_index_buffer(command_buffer, index.buffer, index.offset, index.index_type);
                device.cmd_draw_indexed(
                    command_buffer,
                    params.index_count,
                    params.instance_count,
                    params.first_index,
                    params.vertex_offset,
                    params.first_instance,
                );
            }
            None => device.cmd_draw(
                command_buffer,
                params.vertex_count,
                params.instance_count,
                params.first_vertex,
                params.first_instance,
            ),
        }
        stats.draw_calls += 1;
    }
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
