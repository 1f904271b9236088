/// Native render pass for one catalog entry
///
/// One subpass: the color attachment at index 0 and, when the pass has one,
/// the shared depth attachment at index 1. The external dependency waits on
/// earlier attachment writes so consecutive passes over the same swapchain
/// image are ordered.

use ash::vk;
use stratum_engine::stratum::device::TextureFormat;
use stratum_engine::stratum::render::RenderPassDescriptor;

use crate::vulkan_format::{
    format_to_vk, image_layout_to_vk, load_op_to_vk, sample_count_to_vk, store_op_to_vk,
};

/// Attachment descriptions in framebuffer order
pub(crate) fn attachment_descriptions(
    descriptor: &RenderPassDescriptor,
    color_format: TextureFormat,
) -> Vec<vk::AttachmentDescription> {
    let samples = sample_count_to_vk(descriptor.samples);
    let mut attachments = vec![vk::AttachmentDescription::default()
        .format(format_to_vk(color_format))
        .samples(samples)
        .load_op(load_op_to_vk(descriptor.color.load_op))
        .store_op(store_op_to_vk(descriptor.color.store_op))
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(image_layout_to_vk(descriptor.color.initial_layout))
        .final_layout(image_layout_to_vk(descriptor.color.final_layout))];

    if let Some(depth) = descriptor.depth {
        // Stencil follows the depth ops for combined formats
        let (stencil_load, stencil_store) = if depth.format.has_stencil() {
            (load_op_to_vk(depth.ops.load_op), store_op_to_vk(depth.ops.store_op))
        } else {
            (vk::AttachmentLoadOp::DONT_CARE, vk::AttachmentStoreOp::DONT_CARE)
        };
        attachments.push(
            vk::AttachmentDescription::default()
                .format(format_to_vk(depth.format))
                .samples(samples)
                .load_op(load_op_to_vk(depth.ops.load_op))
                .store_op(store_op_to_vk(depth.ops.store_op))
                .stencil_load_op(stencil_load)
                .stencil_store_op(stencil_store)
                .initial_layout(image_layout_to_vk(depth.ops.initial_layout))
                .final_layout(image_layout_to_vk(depth.ops.final_layout)),
        );
    }

    attachments
}

/// Masks of the external dependency on earlier passes' attachment writes
pub(crate) struct DependencyMasks {
    pub stages: vk::PipelineStageFlags,
    /// Writes earlier passes made
    pub src_access: vk::AccessFlags,
    /// This pass loads (reads) and writes the same attachments
    pub dst_access: vk::AccessFlags,
}

pub(crate) fn dependency_masks(has_depth: bool) -> DependencyMasks {
    let mut masks = DependencyMasks {
        stages: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        src_access: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        dst_access: vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
    };
    if has_depth {
        masks.stages |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        masks.src_access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        masks.dst_access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }
    masks
}

pub(crate) fn create_render_pass(
    device: &ash::Device,
    descriptor: &RenderPassDescriptor,
    color_format: TextureFormat,
) -> ash::prelude::VkResult<vk::RenderPass> {
    let attachments = attachment_descriptions(descriptor, color_format);

    let color_refs = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
    let depth_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if descriptor.has_depth() {
        subpass = subpass.depth_stencil_attachment(&depth_ref);
    }

    let masks = dependency_masks(descriptor.has_depth());
    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(masks.stages)
        .src_access_mask(masks.src_access)
        .dst_stage_mask(masks.stages)
        .dst_access_mask(masks.dst_access);

    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    unsafe { device.create_render_pass(&info, None) }
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
