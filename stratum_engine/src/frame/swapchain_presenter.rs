/// SwapchainPresenter - the presentation chain and everything sized to it
///
/// Owns the swapchain, its image views, the shared depth buffer, one native
/// render pass per catalog entry, and one framebuffer per (pass, image).
/// Passes recorded after other passes wrote the image use variant render
/// passes (same attachments, different load ops and initial layouts), made
/// on first use. Framebuffers of the declared pass serve every variant.
/// Render passes live from `initialize` to `dispose`; everything else is
/// rebuilt by `recreate` when the window size changes.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::frame::{
    choose_extent, choose_image_count, choose_present_mode, choose_sharing_mode,
    choose_surface_format,
};
use crate::graphics_device::{
    AcquireResult, DepthBuffer, Extent2D, FramebufferHandle, ImageHandle, ImageViewHandle,
    PresentDevice, PresentMode, RenderPassHandle, SemaphoreHandle, SurfaceCapabilities,
    SurfaceFormat, SwapchainDesc, SwapchainHandle, SwapchainStatus,
};
use crate::render_pass::{ColorFormat, PassOps, RenderPassCatalog};
use crate::window::SurfaceWindow;
use crate::{engine_debug, engine_info};

/// Acquire blocks until an image is available
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_nanos(u64::MAX);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterState {
    Uninitialized,
    /// Swapchain and framebuffers valid, extent non-zero
    Ready,
    /// Zero extent: no swapchain, images or framebuffers
    Minimized,
    /// Inside `recreate`
    Recreating,
    Disposed,
}

pub struct SwapchainPresenter {
    catalog: Arc<RenderPassCatalog>,
    preferred_surface_formats: Vec<SurfaceFormat>,
    preferred_present_modes: Vec<PresentMode>,
    min_image_count: u32,

    state: PresenterState,
    swapchain: Option<SwapchainHandle>,
    surface_format: Option<SurfaceFormat>,
    present_mode: PresentMode,
    extent: Extent2D,
    images: Vec<ImageHandle>,
    image_views: Vec<ImageViewHandle>,
    depth: Option<DepthBuffer>,
    render_passes: Vec<RenderPassHandle>,
    /// Keyed by pass index and the ops the variant records with
    pass_variants: FxHashMap<(usize, PassOps), RenderPassHandle>,
    /// [pass][image]
    framebuffers: Vec<Vec<FramebufferHandle>>,
}

impl SwapchainPresenter {
    pub fn new(catalog: Arc<RenderPassCatalog>, config: &RendererConfig) -> Self {
        Self {
            catalog,
            preferred_surface_formats: config.preferred_surface_formats.clone(),
            preferred_present_modes: config.preferred_present_modes.clone(),
            min_image_count: config.min_image_count,
            state: PresenterState::Uninitialized,
            swapchain: None,
            surface_format: None,
            present_mode: PresentMode::Fifo,
            extent: Extent2D::default(),
            images: Vec::new(),
            image_views: Vec::new(),
            depth: None,
            render_passes: Vec::new(),
            pass_variants: FxHashMap::default(),
            framebuffers: Vec::new(),
        }
    }

    // ===== LIFECYCLE =====

    /// Choose the surface format, create the render passes and the swapchain
    ///
    /// Ends in `Ready`, or `Minimized` when the window has no area (render
    /// passes are still created). On failure everything created so far is
    /// destroyed and the presenter stays `Uninitialized`.
    pub fn initialize<D: PresentDevice + ?Sized>(
        &mut self,
        device: &D,
        window: &dyn SurfaceWindow,
    ) -> Result<()> {
        if self.state != PresenterState::Uninitialized {
            return Err(Error::InvalidResource(format!(
                "initialize called in state {:?}",
                self.state
            )));
        }

        let result = self.try_initialize(device, window);
        if result.is_err() {
            self.destroy_swapchain_resources(device);
            self.destroy_render_passes(device);
            self.surface_format = None;
        }
        result
    }

    fn try_initialize<D: PresentDevice + ?Sized>(
        &mut self,
        device: &D,
        window: &dyn SurfaceWindow,
    ) -> Result<()> {
        let support = device.surface_support()?;
        let surface_format =
            choose_surface_format(&support.formats, &self.preferred_surface_formats)?;
        self.present_mode =
            choose_present_mode(&support.present_modes, &self.preferred_present_modes)?;
        self.surface_format = Some(surface_format);

        for descriptor in self.catalog.configurations() {
            if let ColorFormat::Explicit(format) = descriptor.color_format {
                if format != surface_format.format {
                    return Err(Error::ConfigurationError(format!(
                        "Render pass '{}' pins color format {:?} but the surface uses {:?}",
                        descriptor.name, format, surface_format.format
                    )));
                }
            }
        }

        for descriptor in self.catalog.configurations() {
            let color_format = descriptor.color_format.resolve(surface_format.format);
            let render_pass = device.create_render_pass(descriptor, color_format)?;
            self.render_passes.push(render_pass);
        }
        engine_debug!(
            "stratum::SwapchainPresenter",
            "Created {} render passes ({:?})",
            self.render_passes.len(),
            surface_format.format
        );

        self.build_swapchain(device, window, support.capabilities)
    }

    /// Rebuild the swapchain and its dependents for the current window size
    ///
    /// Waits for the device to go idle, destroys framebuffers, image views,
    /// the swapchain and the depth buffer, then rebuilds them. Render passes
    /// are kept. With a zero-sized window nothing is rebuilt and the
    /// presenter ends `Minimized`; repeating this allocates nothing.
    pub fn recreate<D: PresentDevice + ?Sized>(
        &mut self,
        device: &D,
        window: &dyn SurfaceWindow,
    ) -> Result<()> {
        match self.state {
            PresenterState::Ready | PresenterState::Minimized => {}
            state => {
                return Err(Error::InvalidResource(format!(
                    "recreate called in state {:?}",
                    state
                )));
            }
        }

        self.state = PresenterState::Recreating;
        engine_debug!("stratum::SwapchainPresenter", "Recreating swapchain");

        device.wait_idle()?;
        self.destroy_swapchain_resources(device);

        let support = device.surface_support()?;
        if let Err(e) = self.build_swapchain(device, window, support.capabilities) {
            self.destroy_swapchain_resources(device);
            self.state = PresenterState::Minimized;
            return Err(e);
        }
        Ok(())
    }

    /// Wait idle and destroy everything, render passes included
    pub fn dispose<D: PresentDevice + ?Sized>(&mut self, device: &D) -> Result<()> {
        if self.state == PresenterState::Disposed {
            return Ok(());
        }
        if self.state != PresenterState::Uninitialized {
            device.wait_idle()?;
        }
        self.destroy_swapchain_resources(device);
        self.destroy_render_passes(device);
        self.state = PresenterState::Disposed;
        engine_info!("stratum::SwapchainPresenter", "Presenter disposed");
        Ok(())
    }

    // ===== PER FRAME =====

    /// Request the next presentable image
    ///
    /// Out-of-date and suboptimal come back in the result's status; deciding
    /// when to recreate is up to the caller.
    pub fn acquire_next_image<D: PresentDevice + ?Sized>(
        &self,
        device: &D,
        image_available: SemaphoreHandle,
    ) -> Result<AcquireResult> {
        let swapchain = self.ready_swapchain("acquire_next_image")?;
        device.acquire_next_image(swapchain, image_available, ACQUIRE_TIMEOUT)
    }

    /// Queue `image_index` for presentation once `render_finished` is signaled
    pub fn present<D: PresentDevice + ?Sized>(
        &self,
        device: &D,
        image_index: u32,
        render_finished: SemaphoreHandle,
    ) -> Result<SwapchainStatus> {
        let swapchain = self.ready_swapchain("present")?;
        if image_index as usize >= self.images.len() {
            return Err(Error::InvalidResource(format!(
                "present of image {} ({} images)",
                image_index,
                self.images.len()
            )));
        }
        device.queue_present(swapchain, image_index, render_finished)
    }

    // ===== ACCESSORS =====

    pub fn state(&self) -> PresenterState {
        self.state
    }

    pub fn is_minimized(&self) -> bool {
        self.state == PresenterState::Minimized
    }

    pub fn catalog(&self) -> &Arc<RenderPassCatalog> {
        &self.catalog
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Surface format chosen at initialization (kept across recreation)
    pub fn surface_format(&self) -> Option<SurfaceFormat> {
        self.surface_format
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    pub fn swapchain(&self) -> Option<SwapchainHandle> {
        self.swapchain
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn images(&self) -> &[ImageHandle] {
        &self.images
    }

    pub fn image_views(&self) -> &[ImageViewHandle] {
        &self.image_views
    }

    pub fn depth_buffer(&self) -> Option<&DepthBuffer> {
        self.depth.as_ref()
    }

    /// Native render passes in catalog order
    pub fn render_passes(&self) -> &[RenderPassHandle] {
        &self.render_passes
    }

    pub fn render_pass(&self, pass_index: usize) -> Option<RenderPassHandle> {
        self.render_passes.get(pass_index).copied()
    }

    /// Native render pass recording `pass_index` with `ops`
    ///
    /// The declared pass when `ops` are the descriptor's own, otherwise a
    /// variant created on first request and kept until `dispose`.
    pub fn render_pass_with<D: PresentDevice + ?Sized>(
        &mut self,
        device: &D,
        pass_index: usize,
        ops: PassOps,
    ) -> Result<RenderPassHandle> {
        let descriptor = self.catalog.descriptor(pass_index).ok_or_else(|| {
            Error::InvalidResource(format!("No render pass at index {}", pass_index))
        })?;
        let declared = self.render_pass(pass_index).ok_or_else(|| {
            Error::InvalidResource(format!("No native render pass for '{}'", descriptor.name))
        })?;
        if ops == descriptor.ops() {
            return Ok(declared);
        }
        if let Some(&variant) = self.pass_variants.get(&(pass_index, ops)) {
            return Ok(variant);
        }

        let surface_format = self.surface_format.ok_or_else(|| {
            Error::InvalidResource("render pass variant requested before initialize".to_string())
        })?;
        let color_format = descriptor.color_format.resolve(surface_format.format);
        let variant = device.create_render_pass(&descriptor.with_ops(ops), color_format)?;
        engine_debug!(
            "stratum::SwapchainPresenter",
            "Created variant of '{}' (color {:?} from {:?})",
            descriptor.name,
            ops.color.load_op,
            ops.color.initial_layout
        );
        self.pass_variants.insert((pass_index, ops), variant);
        Ok(variant)
    }

    /// Variant render passes created so far
    pub fn pass_variant_count(&self) -> usize {
        self.pass_variants.len()
    }

    /// Framebuffers of one pass, indexed by image (empty while minimized)
    pub fn framebuffers(&self, pass_index: usize) -> &[FramebufferHandle] {
        self.framebuffers.get(pass_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn framebuffer(&self, pass_index: usize, image_index: u32) -> Option<FramebufferHandle> {
        self.framebuffers(pass_index).get(image_index as usize).copied()
    }

    // ===== INTERNALS =====

    fn ready_swapchain(&self, operation: &str) -> Result<SwapchainHandle> {
        match (self.state, self.swapchain) {
            (PresenterState::Ready, Some(swapchain)) => Ok(swapchain),
            (state, _) => Err(Error::InvalidResource(format!(
                "{} called in state {:?}",
                operation, state
            ))),
        }
    }

    /// Create swapchain, views, depth buffer and framebuffers for the window size
    fn build_swapchain<D: PresentDevice + ?Sized>(
        &mut self,
        device: &D,
        window: &dyn SurfaceWindow,
        capabilities: SurfaceCapabilities,
    ) -> Result<()> {
        let surface_format = self.surface_format.ok_or_else(|| {
            Error::InvalidResource("swapchain built before the surface format was chosen".to_string())
        })?;

        let extent = choose_extent(&capabilities, window.framebuffer_size());
        self.extent = extent;
        if extent.is_empty() {
            self.extent = Extent2D::new(0, 0);
            self.state = PresenterState::Minimized;
            engine_info!("stratum::SwapchainPresenter", "Window minimized, swapchain released");
            return Ok(());
        }

        let desc = SwapchainDesc {
            surface_format,
            present_mode: self.present_mode,
            extent,
            image_count: choose_image_count(&capabilities, self.min_image_count),
            sharing_mode: choose_sharing_mode(
                device.graphics_queue_family(),
                device.present_queue_family(),
            ),
        };
        let swapchain = device.create_swapchain(&desc)?;
        self.swapchain = Some(swapchain);

        self.images = device.swapchain_images(swapchain)?;
        for &image in &self.images {
            let view = device.create_image_view(image, surface_format.format)?;
            self.image_views.push(view);
        }

        if let Some(depth_format) = self.catalog.shared_depth_format() {
            self.depth = Some(device.create_depth_buffer(depth_format, extent)?);
        }

        let depth_view = self.depth.map(|depth| depth.view);
        for (pass_index, descriptor) in self.catalog.configurations().iter().enumerate() {
            let render_pass = self.render_passes[pass_index];
            self.framebuffers.push(Vec::with_capacity(self.image_views.len()));
            for &view in &self.image_views {
                let framebuffer = match (descriptor.has_depth(), depth_view) {
                    (true, Some(depth_view)) => {
                        device.create_framebuffer(render_pass, &[view, depth_view], extent)?
                    }
                    _ => device.create_framebuffer(render_pass, &[view], extent)?,
                };
                self.framebuffers[pass_index].push(framebuffer);
            }
        }

        self.state = PresenterState::Ready;
        engine_info!(
            "stratum::SwapchainPresenter",
            "Swapchain ready: {}x{}, {} images, {:?}, {:?}",
            extent.width,
            extent.height,
            self.images.len(),
            surface_format.format,
            self.present_mode
        );
        Ok(())
    }

    /// Framebuffers, then image views, then the swapchain, then depth
    fn destroy_swapchain_resources<D: PresentDevice + ?Sized>(&mut self, device: &D) {
        for pass_framebuffers in self.framebuffers.drain(..) {
            for framebuffer in pass_framebuffers {
                device.destroy_framebuffer(framebuffer);
            }
        }
        for view in self.image_views.drain(..) {
            device.destroy_image_view(view);
        }
        if let Some(swapchain) = self.swapchain.take() {
            device.destroy_swapchain(swapchain);
        }
        // Owned by the swapchain
        self.images.clear();
        if let Some(depth) = self.depth.take() {
            device.destroy_depth_buffer(depth);
        }
    }

    fn destroy_render_passes<D: PresentDevice + ?Sized>(&mut self, device: &D) {
        for (_, variant) in self.pass_variants.drain() {
            device.destroy_render_pass(variant);
        }
        for render_pass in self.render_passes.drain(..) {
            device.destroy_render_pass(render_pass);
        }
    }
}

#[cfg(test)]
#[path = "swapchain_presenter_tests.rs"]
mod tests;
