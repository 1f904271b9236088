/// DrawCommand: one draw emitted by a drawable for one frame.
///
/// Commands are plain values: produced by `Drawable::draw_commands`,
/// bucketed and sorted by the collector, consumed during recording, and
/// discarded at the end of the frame.

use glam::{Mat4, Vec4};

use crate::draw::PushConstants;
use crate::graphics_device::{
    BufferHandle, DescriptorSetHandle, IndexType, PipelineHandle, PipelineLayoutHandle,
};
use crate::render_pass::RenderPassMask;

/// A descriptor set bound at a set index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorBinding {
    pub set_index: u32,
    pub set: DescriptorSetHandle,
}

impl DescriptorBinding {
    pub const fn new(set_index: u32, set: DescriptorSetHandle) -> Self {
        Self { set_index, set }
    }
}

/// Index buffer used by an indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexBufferBinding {
    pub buffer: BufferHandle,
    pub offset: u64,
    pub index_type: IndexType,
}

/// Vertex/index/instance counts
///
/// `index_count` and `first_index` are used when the command has an index
/// buffer, `vertex_count` and `first_vertex` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawParams {
    pub vertex_count: u32,
    pub first_vertex: u32,
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub instance_count: u32,
    pub first_instance: u32,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            vertex_count: 0,
            first_vertex: 0,
            index_count: 0,
            first_index: 0,
            vertex_offset: 0,
            instance_count: 1,
            first_instance: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Passes this command is drawn in
    pub render_mask: RenderPassMask,
    pub pipeline: PipelineHandle,
    pub pipeline_layout: PipelineLayoutHandle,
    /// Ordered (set index, descriptor set) bindings, set 0 first by convention
    pub descriptor_sets: Vec<DescriptorBinding>,
    pub vertex_buffer: BufferHandle,
    pub vertex_offset: u64,
    pub index_buffer: Option<IndexBufferBinding>,
    pub params: DrawParams,
    pub transform: Mat4,
    pub tint: Vec4,
    pub push_constants: Option<PushConstants>,
    /// View-space depth used by back-to-front ordering
    pub sort_depth: f32,
}

impl DrawCommand {
    /// Non-indexed draw of `vertex_count` vertices
    pub fn new(
        render_mask: RenderPassMask,
        pipeline: PipelineHandle,
        pipeline_layout: PipelineLayoutHandle,
        vertex_buffer: BufferHandle,
        vertex_count: u32,
    ) -> Self {
        Self {
            render_mask,
            pipeline,
            pipeline_layout,
            descriptor_sets: Vec::new(),
            vertex_buffer,
            vertex_offset: 0,
            index_buffer: None,
            params: DrawParams { vertex_count, ..DrawParams::default() },
            transform: Mat4::IDENTITY,
            tint: Vec4::ONE,
            push_constants: None,
            sort_depth: 0.0,
        }
    }

    /// Switch to an indexed draw of `index_count` indices
    pub fn with_index_buffer(mut self, buffer: BufferHandle, index_type: IndexType, index_count: u32) -> Self {
        self.index_buffer = Some(IndexBufferBinding { buffer, offset: 0, index_type });
        self.params.index_count = index_count;
        self
    }

    /// Append a descriptor set binding
    pub fn with_descriptor_set(mut self, set_index: u32, set: DescriptorSetHandle) -> Self {
        self.descriptor_sets.push(DescriptorBinding::new(set_index, set));
        self
    }

    pub fn with_push_constants(mut self, push_constants: PushConstants) -> Self {
        self.push_constants = Some(push_constants);
        self
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_tint(mut self, tint: Vec4) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_instances(mut self, instance_count: u32) -> Self {
        self.params.instance_count = instance_count;
        self
    }

    pub fn with_sort_depth(mut self, sort_depth: f32) -> Self {
        self.sort_depth = sort_depth;
        self
    }

    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }
}
