/*!
# Stratum - Vulkan backend

`VulkanGraphicsDevice` implements the device traits of `stratum_engine`
(`SyncDevice`, `PresentDevice`, `CommandDevice`) on top of ash, with
gpu-allocator for the shared depth image.

```no_run
use std::sync::Arc;
use stratum_engine::stratum::{RenderWindow, RendererConfig};
use stratum_engine::stratum::render::{FrameRenderer, RenderPassCatalog};
use stratum_engine_renderer_vulkan::VulkanGraphicsDevice;

# fn run(window: Arc<winit::window::Window>) -> stratum_engine::stratum::Result<()> {
let config = RendererConfig::default();
let device = Arc::new(VulkanGraphicsDevice::new(window.as_ref(), &config)?);
let renderer = FrameRenderer::new(
    device,
    Arc::new(RenderWindow::new(window)),
    Arc::new(RenderPassCatalog::standard()),
    config,
)?;
# Ok(())
# }
```
*/

mod vulkan;
mod vulkan_format;
mod vulkan_sync;
mod vulkan_swapchain;
mod vulkan_render_pass;
mod vulkan_command_list;
mod vulkan_descriptor_allocator;
#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan::VulkanGraphicsDevice;

#[cfg(feature = "vulkan-validation")]
pub use debug::{print_validation_stats_report, reset_validation_stats, validation_stats, ValidationStats};
