#![allow(dead_code)]
//! GPU test utilities - one Vulkan device shared by every GPU test
//!
//! ash-window refuses to create a second surface for a window on some
//! platforms, and a winit EventLoop can only be created once per process.
//! Tests therefore share one hidden window and one device. Tests that submit
//! work or touch the swapchain run `#[serial]`.

use std::sync::{Arc, OnceLock};

use stratum_engine::stratum::RendererConfig;
use stratum_engine_renderer_vulkan::VulkanGraphicsDevice;
use winit::event_loop::EventLoop;
use winit::window::Window;

#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;

static GPU_DEVICE: OnceLock<Arc<VulkanGraphicsDevice>> = OnceLock::new();
static GPU_WINDOW: OnceLock<Arc<Window>> = OnceLock::new();

/// Configuration used by the shared device
pub fn test_config() -> RendererConfig {
    RendererConfig {
        app_name: "Stratum GPU Tests".to_string(),
        ..RendererConfig::default()
    }
}

/// The shared window (created on first use)
pub fn test_window() -> Arc<Window> {
    GPU_WINDOW
        .get_or_init(|| {
            let (window, event_loop) = create_test_window();
            // EventLoop is not Sync and cannot live in a static; leak it so the
            // window stays valid for the whole test run
            std::mem::forget(event_loop);
            Arc::new(window)
        })
        .clone()
}

/// The shared device (created on first use)
pub fn test_device() -> Arc<VulkanGraphicsDevice> {
    GPU_DEVICE
        .get_or_init(|| {
            let window = test_window();
            let device = VulkanGraphicsDevice::new(window.as_ref(), &test_config())
                .expect("Failed to create VulkanGraphicsDevice for tests");
            Arc::new(device)
        })
        .clone()
}

/// Hidden 800x600 window on an event loop usable off the main thread
#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = {
        #[cfg(target_os = "windows")]
        {
            EventLoop::builder().with_any_thread(true).build().unwrap()
        }
        #[cfg(not(target_os = "windows"))]
        {
            EventLoop::builder().build().unwrap()
        }
    };

    let attributes = Window::default_attributes()
        .with_title("Stratum GPU Test Window")
        .with_inner_size(winit::dpi::LogicalSize::new(800, 600))
        .with_visible(false);

    let window = event_loop.create_window(attributes).unwrap();
    (window, event_loop)
}
