/// RenderPassCatalog - the ordered, immutable table of logical render passes
///
/// Position in the table is the pass's bit index in a RenderPassMask and its
/// execution order (lowest first). The catalog is built once, validated, and
/// shared by reference between the presenter, the collector and the renderer.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::draw::BackToFrontStrategy;
use crate::error::{Error, Result};
use crate::graphics_device::{ImageLayout, LoadOp, StoreOp, TextureFormat};
use crate::render_pass::{
    ActivePasses, AttachmentOps, ColorFormat, RenderPassDescriptor, RenderPassMask,
};

/// Maximum number of passes a mask can address
pub const MAX_RENDER_PASSES: usize = 32;

#[derive(Debug, Clone)]
pub struct RenderPassCatalog {
    descriptors: Vec<RenderPassDescriptor>,
    all_passes: RenderPassMask,
    always_execute: RenderPassMask,
    depth_format: Option<TextureFormat>,
}

impl RenderPassCatalog {
    /// Build a catalog from ordered descriptors
    ///
    /// Fails with a configuration error when the table is empty or longer than
    /// 32 entries, when names are empty or duplicated, when a depth attachment
    /// uses a non-depth format, or when passes request different depth formats
    /// (one depth buffer is shared by every pass that uses depth).
    pub fn new(descriptors: Vec<RenderPassDescriptor>) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(Error::ConfigurationError("Render pass catalog is empty".to_string()));
        }
        if descriptors.len() > MAX_RENDER_PASSES {
            return Err(Error::ConfigurationError(format!(
                "Render pass catalog has {} passes (max {})",
                descriptors.len(),
                MAX_RENDER_PASSES
            )));
        }

        let (depth_format, always_execute) = check_descriptors(&descriptors)?;

        Ok(Self {
            all_passes: RenderPassMask::first_n(descriptors.len()),
            descriptors,
            always_execute,
            depth_format,
        })
    }

    /// The eleven-pass catalog used by default
    ///
    /// Main clears color and depth from an undefined layout; UI leaves the image
    /// ready for presentation. These are the ops for the first write of a
    /// frame: once an earlier pass or camera wrote an attachment, the
    /// recorder switches to a variant that starts from that write. Both always execute. Transparent and Particles
    /// draw back to front. All depth passes share D32_FLOAT.
    pub fn standard() -> Self {
        let depth_format = TextureFormat::D32_FLOAT;
        let back_to_front = Arc::new(BackToFrontStrategy);

        let first_color = AttachmentOps::new(
            LoadOp::DontCare,
            StoreOp::Store,
            ImageLayout::Undefined,
            ImageLayout::ColorAttachment,
        );
        let clear_color = AttachmentOps::new(
            LoadOp::Clear,
            StoreOp::Store,
            ImageLayout::Undefined,
            ImageLayout::ColorAttachment,
        );
        let clear_depth = AttachmentOps::new(
            LoadOp::Clear,
            StoreOp::Store,
            ImageLayout::Undefined,
            ImageLayout::DepthStencilAttachment,
        );
        let load_depth = AttachmentOps::new(
            LoadOp::Load,
            StoreOp::Store,
            ImageLayout::DepthStencilAttachment,
            ImageLayout::DepthStencilAttachment,
        );
        let to_present = AttachmentOps::new(
            LoadOp::Load,
            StoreOp::Store,
            ImageLayout::ColorAttachment,
            ImageLayout::PresentSrc,
        );
        let after_present = AttachmentOps::new(
            LoadOp::Load,
            StoreOp::Store,
            ImageLayout::PresentSrc,
            ImageLayout::PresentSrc,
        );

        let descriptors = vec![
            RenderPassDescriptor::new("Shadow")
                .with_color(first_color)
                .with_depth(depth_format, clear_depth),
            RenderPassDescriptor::new("DepthPrepass")
                .with_color(first_color)
                .with_depth(depth_format, clear_depth),
            RenderPassDescriptor::new("Background").with_color(clear_color),
            RenderPassDescriptor::new("Main")
                .with_color(clear_color)
                .with_depth(depth_format, clear_depth)
                .always_execute(),
            RenderPassDescriptor::new("Lighting"),
            RenderPassDescriptor::new("Reflection").with_depth(depth_format, load_depth),
            RenderPassDescriptor::new("Transparent")
                .with_depth(depth_format, load_depth)
                .with_batch_strategy(back_to_front.clone()),
            RenderPassDescriptor::new("Particles")
                .with_depth(depth_format, load_depth)
                .with_batch_strategy(back_to_front),
            RenderPassDescriptor::new("Post"),
            RenderPassDescriptor::new("UI").with_color(to_present).always_execute(),
            RenderPassDescriptor::new("Debug").with_color(after_present),
        ];

        // Static table: validation cannot fail on it
        match Self::new(descriptors) {
            Ok(catalog) => catalog,
            Err(e) => unreachable!("standard render pass catalog is invalid: {}", e),
        }
    }

    /// Ordered descriptors (index = bit = execution order)
    pub fn configurations(&self) -> &[RenderPassDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, index: usize) -> Option<&RenderPassDescriptor> {
        self.descriptors.get(index)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Mask of every pass in the catalog
    pub fn all_passes(&self) -> RenderPassMask {
        self.all_passes
    }

    /// Passes recorded every frame even without draw commands
    pub fn always_execute_mask(&self) -> RenderPassMask {
        self.always_execute
    }

    /// Depth format shared by every pass with a depth attachment
    pub fn shared_depth_format(&self) -> Option<TextureFormat> {
        self.depth_format
    }

    /// Catalog index of a single-pass mask
    ///
    /// `None` for masks with zero or several bits, or a bit past the catalog.
    pub fn index_of(&self, mask: RenderPassMask) -> Option<usize> {
        mask.index_of().filter(|&index| index < self.descriptors.len())
    }

    /// Single-pass mask for a pass name
    pub fn mask_of(&self, name: &str) -> Option<RenderPassMask> {
        self.descriptors
            .iter()
            .position(|d| d.name == name)
            .map(RenderPassMask::single)
    }

    /// Human-readable union of pass names, e.g. `"Main | UI"`
    ///
    /// Unknown bits are listed as `#<bit>`; an empty mask reads `"None"`.
    pub fn names_of(&self, mask: RenderPassMask) -> String {
        if mask.is_empty() {
            return "None".to_string();
        }
        mask.passes()
            .filter_map(|pass| pass.index_of())
            .map(|index| match self.descriptors.get(index) {
                Some(descriptor) => descriptor.name.clone(),
                None => format!("#{}", index),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Names of all passes in execution order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    /// Single-pass masks present in `mask`, in execution order
    pub fn active_passes(&self, mask: RenderPassMask) -> ActivePasses {
        (mask & self.all_passes).passes()
    }

    /// Fail if `mask` has bits outside the catalog
    pub fn validate(&self, mask: RenderPassMask) -> Result<()> {
        let unknown = mask.difference(self.all_passes);
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigurationError(format!(
                "Render mask {:#x} has passes outside the catalog ({})",
                mask.bits(),
                self.names_of(unknown)
            )))
        }
    }
}

/// Validate descriptor names and formats, returning the shared depth format
/// and the always-execute mask
fn check_descriptors(
    descriptors: &[RenderPassDescriptor],
) -> Result<(Option<TextureFormat>, RenderPassMask)> {
    let mut names = FxHashSet::default();
    let mut depth_format: Option<TextureFormat> = None;
    let mut always_execute = RenderPassMask::empty();

    for (index, descriptor) in descriptors.iter().enumerate() {
        if descriptor.name.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "Render pass {} has an empty name",
                index
            )));
        }
        if !names.insert(descriptor.name.as_str()) {
            return Err(Error::ConfigurationError(format!(
                "Duplicate render pass name '{}'",
                descriptor.name
            )));
        }
        if let ColorFormat::Explicit(format) = descriptor.color_format {
            if format.is_depth() {
                return Err(Error::ConfigurationError(format!(
                    "Render pass '{}' uses depth format {:?} for its color attachment",
                    descriptor.name, format
                )));
            }
        }
        if let Some(format) = descriptor.depth_format() {
            if !format.is_depth() {
                return Err(Error::ConfigurationError(format!(
                    "Render pass '{}' uses non-depth format {:?} for its depth attachment",
                    descriptor.name, format
                )));
            }
            match depth_format {
                Some(shared) if shared != format => {
                    return Err(Error::ConfigurationError(format!(
                        "Render pass '{}' requests depth format {:?} but {:?} is already shared",
                        descriptor.name, format, shared
                    )));
                }
                _ => depth_format = Some(format),
            }
        }
        if descriptor.always_execute {
            always_execute |= RenderPassMask::single(index);
        }
    }

    Ok((depth_format, always_execute))
}

impl Default for RenderPassCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
#[path = "render_pass_catalog_tests.rs"]
mod tests;
