/// RenderContext, Drawable and RenderScene: the contract with content code
///
/// The renderer does not traverse scene hierarchies or cull. A RenderScene
/// hands it cameras and, per camera, an already-culled sequence of drawables;
/// each drawable appends its draw commands for the frame.

use std::time::Duration;

use crate::camera::Camera;
use crate::graphics_device::{DescriptorSetHandle, Viewport};
use crate::render_pass::{RenderPassCatalog, RenderPassMask};
use crate::draw::DrawCommand;

/// Read-only per-camera, per-frame context
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    camera: &'a Camera,
    catalog: &'a RenderPassCatalog,
    delta_time: Duration,
    frame_number: u64,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        camera: &'a Camera,
        catalog: &'a RenderPassCatalog,
        delta_time: Duration,
        frame_number: u64,
    ) -> Self {
        Self { camera, catalog, delta_time, frame_number }
    }

    pub fn camera(&self) -> &'a Camera {
        self.camera
    }

    pub fn viewport(&self) -> &'a Viewport {
        self.camera.viewport()
    }

    /// Mask of every pass that exists
    pub fn all_passes(&self) -> RenderPassMask {
        self.catalog.all_passes()
    }

    /// Pass names in execution order
    pub fn pass_names(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.catalog.names()
    }

    pub fn catalog(&self) -> &'a RenderPassCatalog {
        self.catalog
    }

    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// Monotonic count of presented frames
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// The camera's view/projection descriptor set (bound at set 0 by convention)
    pub fn view_descriptor(&self) -> DescriptorSetHandle {
        self.camera.view_descriptor()
    }
}

/// Anything that emits draw commands
pub trait Drawable {
    /// Append this frame's draw commands for the context's camera
    fn draw_commands(&self, context: &RenderContext<'_>, out: &mut Vec<DrawCommand>);
}

/// Source of cameras and visible drawables for one frame
pub trait RenderScene {
    /// Cameras in render order (may be empty)
    fn cameras(&self) -> &[Camera];

    /// Visit the drawables visible from `camera`, in a stable order
    fn for_each_visible(&self, camera: &Camera, visit: &mut dyn FnMut(&dyn Drawable));
}

/// Scene that is nothing but an ordered list of cameras and drawables
///
/// Every drawable is visible from every camera.
#[derive(Default)]
pub struct DrawableList<'a> {
    cameras: Vec<Camera>,
    drawables: Vec<&'a dyn Drawable>,
}

impl<'a> DrawableList<'a> {
    pub fn new() -> Self {
        Self { cameras: Vec::new(), drawables: Vec::new() }
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.cameras.push(camera);
        self
    }

    pub fn push(&mut self, drawable: &'a dyn Drawable) {
        self.drawables.push(drawable);
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}

impl RenderScene for DrawableList<'_> {
    fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    fn for_each_visible(&self, _camera: &Camera, visit: &mut dyn FnMut(&dyn Drawable)) {
        for drawable in &self.drawables {
            visit(*drawable);
        }
    }
}
