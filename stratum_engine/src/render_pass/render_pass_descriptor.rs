/// Static description of one logical render pass

use std::sync::Arc;

use crate::draw::{BatchStrategy, DefaultBatchStrategy};
use crate::graphics_device::{ClearValue, ImageLayout, LoadOp, SampleCount, StoreOp, TextureFormat};

/// Where a pass takes its color attachment format from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    /// Use the surface format chosen at swapchain creation
    Swapchain,
    /// Pin an explicit format (must match the chosen surface format)
    Explicit(TextureFormat),
}

impl ColorFormat {
    /// Resolve against the chosen surface format
    pub fn resolve(self, surface_format: TextureFormat) -> TextureFormat {
        match self {
            ColorFormat::Swapchain => surface_format,
            ColorFormat::Explicit(format) => format,
        }
    }
}

/// Attachment operations for one attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentOps {
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

impl AttachmentOps {
    pub const fn new(
        load_op: LoadOp,
        store_op: StoreOp,
        initial_layout: ImageLayout,
        final_layout: ImageLayout,
    ) -> Self {
        Self { load_op, store_op, initial_layout, final_layout }
    }

    /// These ops for an attachment an earlier pass already wrote this frame
    ///
    /// The attachment starts from the layout that write left it in. It is
    /// loaded, unless `keep_clear` is set and these ops clear, in which case
    /// only the render area is cleared and the rest of the image is kept.
    pub fn continued(self, prior: PriorWrite, keep_clear: bool) -> Self {
        let load_op = if keep_clear && self.load_op == LoadOp::Clear {
            LoadOp::Clear
        } else {
            LoadOp::Load
        };
        Self { load_op, initial_layout: prior.layout, ..self }
    }
}

/// Last write to an attachment earlier in the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriorWrite {
    /// Layout the writing pass left the attachment in
    pub layout: ImageLayout,
    /// Written by the camera now recording
    pub same_camera: bool,
}

/// What earlier passes of the frame left in the color and depth attachments
///
/// `None` means nothing wrote the attachment yet this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttachmentHistory {
    pub color: Option<PriorWrite>,
    pub depth: Option<PriorWrite>,
}

impl AttachmentHistory {
    /// Record that a pass with `ops` was just recorded by the current camera
    ///
    /// A color attachment that started from don't-care holds nothing later
    /// passes may load.
    pub fn record(&mut self, ops: &PassOps) {
        self.color = match ops.color.load_op {
            LoadOp::DontCare => None,
            _ => Some(PriorWrite { layout: ops.color.final_layout, same_camera: true }),
        };
        if let Some(depth) = ops.depth {
            self.depth = Some(PriorWrite { layout: depth.final_layout, same_camera: true });
        }
    }

    /// A new camera starts recording: earlier writes belong to other cameras
    pub fn next_camera(&mut self) {
        for prior in [&mut self.color, &mut self.depth].into_iter().flatten() {
            prior.same_camera = false;
        }
    }
}

/// Attachment ops one recording of a pass uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassOps {
    pub color: AttachmentOps,
    pub depth: Option<AttachmentOps>,
}

/// Depth attachment of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthAttachment {
    pub format: TextureFormat,
    pub ops: AttachmentOps,
}

/// Clear values for one pass, densely packed to the attachment count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassClearValues {
    values: [ClearValue; 2],
    len: usize,
}

impl PassClearValues {
    pub fn as_slice(&self) -> &[ClearValue] {
        &self.values[..self.len]
    }
}

/// One entry of the render pass catalog
///
/// A pass has exactly one color attachment and an optional depth attachment.
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor {
    pub name: String,
    pub color_format: ColorFormat,
    pub color: AttachmentOps,
    pub depth: Option<DepthAttachment>,
    pub samples: SampleCount,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    /// Record this pass every frame even with no draw commands
    pub always_execute: bool,
    /// Ordering of the pass's draw commands
    pub batch_strategy: Arc<dyn BatchStrategy>,
}

impl RenderPassDescriptor {
    /// Color-only pass that loads and keeps the swapchain image in attachment layout
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color_format: ColorFormat::Swapchain,
            color: AttachmentOps::new(
                LoadOp::Load,
                StoreOp::Store,
                ImageLayout::ColorAttachment,
                ImageLayout::ColorAttachment,
            ),
            depth: None,
            samples: SampleCount::S1,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            always_execute: false,
            batch_strategy: Arc::new(DefaultBatchStrategy),
        }
    }

    pub fn with_color(mut self, ops: AttachmentOps) -> Self {
        self.color = ops;
        self
    }

    pub fn with_color_format(mut self, color_format: ColorFormat) -> Self {
        self.color_format = color_format;
        self
    }

    pub fn with_depth(mut self, format: TextureFormat, ops: AttachmentOps) -> Self {
        self.depth = Some(DepthAttachment { format, ops });
        self
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_clear_depth(mut self, clear_depth: f32) -> Self {
        self.clear_depth = clear_depth;
        self
    }

    pub fn always_execute(mut self) -> Self {
        self.always_execute = true;
        self
    }

    pub fn with_batch_strategy(mut self, strategy: Arc<dyn BatchStrategy>) -> Self {
        self.batch_strategy = strategy;
        self
    }

    pub fn depth_format(&self) -> Option<TextureFormat> {
        self.depth.map(|d| d.format)
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    /// Ops as declared, for a pass nothing was written before
    pub fn ops(&self) -> PassOps {
        PassOps { color: self.color, depth: self.depth.map(|d| d.ops) }
    }

    /// Ops for recording this pass after the writes in `history`
    ///
    /// Within one camera an attachment written earlier is always loaded, so
    /// a later pass never discards what an earlier one drew. Across cameras
    /// depth keeps its clear (each camera tests against its own depth) and
    /// color keeps its clear only when the camera sets its own clear color;
    /// either way the clear is limited to the camera's render area.
    pub fn ops_after(&self, history: &AttachmentHistory, camera_clears: bool) -> PassOps {
        let color = match history.color {
            Some(prior) => self.color.continued(prior, !prior.same_camera && camera_clears),
            None => self.color,
        };
        let depth = self.depth.map(|depth| match history.depth {
            Some(prior) => depth.ops.continued(prior, !prior.same_camera),
            None => depth.ops,
        });
        PassOps { color, depth }
    }

    /// Copy of this descriptor recording with `ops`
    pub fn with_ops(&self, ops: PassOps) -> Self {
        let mut descriptor = self.clone();
        descriptor.color = ops.color;
        if let (Some(depth), Some(depth_ops)) = (descriptor.depth.as_mut(), ops.depth) {
            depth.ops = depth_ops;
        }
        descriptor
    }

    /// Color plus optional depth
    pub fn attachment_count(&self) -> usize {
        if self.depth.is_some() { 2 } else { 1 }
    }

    /// Clear values for beginning this pass
    ///
    /// A real clear value is provided only for attachments that clear on load;
    /// other slots hold a zero placeholder so the array stays dense.
    /// `clear_color_override` (a camera's clear color) replaces the
    /// descriptor's clear color when set.
    pub fn clear_values(&self, clear_color_override: Option<[f32; 4]>) -> PassClearValues {
        self.clear_values_for(&self.ops(), clear_color_override)
    }

    /// Clear values for beginning this pass with `ops`
    pub fn clear_values_for(&self, ops: &PassOps, clear_color_override: Option<[f32; 4]>) -> PassClearValues {
        let color = if ops.color.load_op == LoadOp::Clear {
            ClearValue::Color(clear_color_override.unwrap_or(self.clear_color))
        } else {
            ClearValue::Color([0.0; 4])
        };
        let depth = match ops.depth {
            Some(depth) if depth.load_op == LoadOp::Clear => {
                ClearValue::DepthStencil { depth: self.clear_depth, stencil: 0 }
            }
            _ => ClearValue::DepthStencil { depth: 0.0, stencil: 0 },
        };
        PassClearValues { values: [color, depth], len: self.attachment_count() }
    }
}
