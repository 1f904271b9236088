/// Camera: passive per-view data consumed by the frame renderer.
///
/// The Camera computes nothing. The caller is responsible for computing and
/// setting the view/projection matrices and for uploading them into the
/// descriptor set referenced by `view_descriptor`.

use glam::{Mat4, Vec3};

use crate::graphics_device::{DescriptorSetHandle, Extent2D, Rect2D, Viewport};
use crate::render_pass::RenderPassMask;

/// One view of the scene.
///
/// Each camera records its own command buffer every frame, restricted to its
/// viewport and to the passes in its render mask (always-execute passes are
/// recorded regardless, since they carry the frame's layout transitions).
#[derive(Debug, Clone)]
pub struct Camera {
    view_matrix: Mat4,
    projection_matrix: Mat4,
    viewport: Viewport,
    scissor: Option<Rect2D>,
    render_mask: RenderPassMask,
    view_descriptor: DescriptorSetHandle,
    clear_color: Option<[f32; 4]>,
}

impl Camera {
    /// Create a camera rendering every pass through `viewport`.
    ///
    /// The render mask covers all 32 pass bits, so catalogs of any size draw
    /// every pass. Matrices default to identity; the scissor defaults to
    /// `None` (same as viewport).
    pub fn new(viewport: Viewport, view_descriptor: DescriptorSetHandle) -> Self {
        Self {
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            viewport,
            scissor: None,
            render_mask: RenderPassMask::first_n(32),
            view_descriptor,
            clear_color: None,
        }
    }

    /// Screen-space camera covering `extent`, with no view descriptor.
    ///
    /// Used as the fallback when the scene offers no camera, so UI-only
    /// frames still present.
    pub fn screen_space(extent: Extent2D) -> Self {
        Self::new(Viewport::full(extent), DescriptorSetHandle::NULL)
    }

    // ===== GETTERS =====

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection matrix (perspective or orthographic).
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// View-space depth of a world position (positive in front of the camera).
    pub fn view_depth(&self, world_position: Vec3) -> f32 {
        -self.view_matrix.transform_point3(world_position).z
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scissor(&self) -> Option<&Rect2D> {
        self.scissor.as_ref()
    }

    /// Effective scissor: explicit scissor or viewport bounds as Rect2D.
    pub fn effective_scissor(&self) -> Rect2D {
        self.scissor.unwrap_or(self.viewport_rect())
    }

    /// Viewport bounds as Rect2D.
    pub fn viewport_rect(&self) -> Rect2D {
        Rect2D {
            x: self.viewport.x as i32,
            y: self.viewport.y as i32,
            width: self.viewport.width as u32,
            height: self.viewport.height as u32,
        }
    }

    pub fn render_mask(&self) -> RenderPassMask {
        self.render_mask
    }

    /// Descriptor set holding this camera's view/projection data.
    pub fn view_descriptor(&self) -> DescriptorSetHandle {
        self.view_descriptor
    }

    /// Clear color overriding the pass descriptors' clear color.
    pub fn clear_color(&self) -> Option<[f32; 4]> {
        self.clear_color
    }

    // ===== SETTERS (store, compute nothing) =====

    pub fn set_view(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
    }

    pub fn set_projection(&mut self, matrix: Mat4) {
        self.projection_matrix = matrix;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Set the scissor rectangle. `None` means same as viewport.
    pub fn set_scissor(&mut self, scissor: Option<Rect2D>) {
        self.scissor = scissor;
    }

    pub fn set_render_mask(&mut self, mask: RenderPassMask) {
        self.render_mask = mask;
    }

    pub fn set_view_descriptor(&mut self, descriptor: DescriptorSetHandle) {
        self.view_descriptor = descriptor;
    }

    pub fn set_clear_color(&mut self, clear_color: Option<[f32; 4]>) {
        self.clear_color = clear_color;
    }

    // ===== BUILDERS =====

    pub fn with_render_mask(mut self, mask: RenderPassMask) -> Self {
        self.render_mask = mask;
        self
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = Some(clear_color);
        self
    }

    pub fn with_matrices(mut self, view: Mat4, projection: Mat4) -> Self {
        self.view_matrix = view;
        self.projection_matrix = projection;
        self
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
