/// CommandDevice for Vulkan: command pools, recording and queue submission
///
/// Recording calls are thin wrappers over the `vkCmd*` entry points. All
/// buffers come from pools created with RESET_COMMAND_BUFFER, so beginning a
/// buffer resets it.

use ash::vk::{self, Handle};
use stratum_engine::stratum::device::{
    BufferHandle, CommandBufferHandle, CommandDevice, CommandPoolHandle, DescriptorSetHandle,
    IndexType, PipelineHandle, PipelineLayoutHandle, Rect2D, RenderPassBegin, ShaderStageFlags,
    SubmitDesc, Viewport,
};
use stratum_engine::stratum::Result;

use crate::vulkan::{check, VulkanGraphicsDevice};
use crate::vulkan_format::{
    clear_value_to_vk, index_type_to_vk, rect_to_vk, shader_stages_to_vk, viewport_to_vk,
};

fn raw_cmd(command_buffer: CommandBufferHandle) -> vk::CommandBuffer {
    vk::CommandBuffer::from_raw(command_buffer.as_raw())
}

impl CommandDevice for VulkanGraphicsDevice {
    fn create_command_pool(&self) -> Result<CommandPoolHandle> {
        let info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.queue_families.graphics)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { self.device.create_command_pool(&info, None) }
            .map_err(|e| check("vkCreateCommandPool", e))?;
        Ok(CommandPoolHandle::from_raw(pool.as_raw()))
    }

    fn destroy_command_pool(&self, pool: CommandPoolHandle) {
        unsafe {
            self.device
                .destroy_command_pool(vk::CommandPool::from_raw(pool.as_raw()), None)
        };
    }

    fn allocate_command_buffers(
        &self,
        pool: CommandPoolHandle,
        count: u32,
    ) -> Result<Vec<CommandBufferHandle>> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(vk::CommandPool::from_raw(pool.as_raw()))
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        let buffers = unsafe { self.device.allocate_command_buffers(&info) }
            .map_err(|e| check("vkAllocateCommandBuffers", e))?;
        Ok(buffers
            .into_iter()
            .map(|buffer| CommandBufferHandle::from_raw(buffer.as_raw()))
            .collect())
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(raw_cmd(command_buffer), &info) }
            .map_err(|e| check("vkBeginCommandBuffer", e))
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe { self.device.end_command_buffer(raw_cmd(command_buffer)) }
            .map_err(|e| check("vkEndCommandBuffer", e))
    }

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, begin: &RenderPassBegin<'_>) {
        let clear_values: Vec<vk::ClearValue> =
            begin.clear_values.iter().copied().map(clear_value_to_vk).collect();
        let info = vk::RenderPassBeginInfo::default()
            .render_pass(vk::RenderPass::from_raw(begin.render_pass.as_raw()))
            .framebuffer(vk::Framebuffer::from_raw(begin.framebuffer.as_raw()))
            .render_area(rect_to_vk(begin.render_area))
            .clear_values(&clear_values);
        unsafe {
            self.device
                .cmd_begin_render_pass(raw_cmd(command_buffer), &info, vk::SubpassContents::INLINE)
        };
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        unsafe { self.device.cmd_end_render_pass(raw_cmd(command_buffer)) };
    }

    fn cmd_set_viewport(&self, command_buffer: CommandBufferHandle, viewport: Viewport) {
        unsafe {
            self.device
                .cmd_set_viewport(raw_cmd(command_buffer), 0, &[viewport_to_vk(viewport)])
        };
    }

    fn cmd_set_scissor(&self, command_buffer: CommandBufferHandle, scissor: Rect2D) {
        unsafe {
            self.device
                .cmd_set_scissor(raw_cmd(command_buffer), 0, &[rect_to_vk(scissor)])
        };
    }

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle) {
        unsafe {
            self.device.cmd_bind_pipeline(
                raw_cmd(command_buffer),
                vk::PipelineBindPoint::GRAPHICS,
                vk::Pipeline::from_raw(pipeline.as_raw()),
            )
        };
    }

    fn cmd_bind_descriptor_set(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        set_index: u32,
        set: DescriptorSetHandle,
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                raw_cmd(command_buffer),
                vk::PipelineBindPoint::GRAPHICS,
                vk::PipelineLayout::from_raw(layout.as_raw()),
                set_index,
                &[vk::DescriptorSet::from_raw(set.as_raw())],
                &[],
            )
        };
    }

    fn cmd_push_constants(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) {
        unsafe {
            self.device.cmd_push_constants(
                raw_cmd(command_buffer),
                vk::PipelineLayout::from_raw(layout.as_raw()),
                shader_stages_to_vk(stages),
                offset,
                data,
            )
        };
    }

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle, offset: u64) {
        unsafe {
            self.device.cmd_bind_vertex_buffers(
                raw_cmd(command_buffer),
                0,
                &[vk::Buffer::from_raw(buffer.as_raw())],
                &[offset],
            )
        };
    }

    fn cmd_bind_index_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    ) {
        unsafe {
            self.device.cmd_bind_index_buffer(
                raw_cmd(command_buffer),
                vk::Buffer::from_raw(buffer.as_raw()),
                offset,
                index_type_to_vk(index_type),
            )
        };
    }

    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw(
                raw_cmd(command_buffer),
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            )
        };
    }

    fn cmd_draw_indexed(
        &self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed(
                raw_cmd(command_buffer),
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            )
        };
    }

    fn queue_submit(&self, submit: &SubmitDesc<'_>) -> Result<()> {
        let command_buffers: Vec<vk::CommandBuffer> =
            submit.command_buffers.iter().copied().map(raw_cmd).collect();
        let wait_semaphores: Vec<vk::Semaphore> = submit
            .wait_semaphore
            .map(|s| vk::Semaphore::from_raw(s.as_raw()))
            .into_iter()
            .collect();
        let wait_stages = vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; wait_semaphores.len()];
        let signal_semaphores: Vec<vk::Semaphore> = submit
            .signal_semaphore
            .map(|s| vk::Semaphore::from_raw(s.as_raw()))
            .into_iter()
            .collect();
        let fence = submit
            .fence
            .map_or_else(vk::Fence::null, |f| vk::Fence::from_raw(f.as_raw()));

        let info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe { self.device.queue_submit(self.graphics_queue, &[info], fence) }
            .map_err(|e| check("vkQueueSubmit", e))
    }
}
