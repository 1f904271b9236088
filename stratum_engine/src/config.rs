/// Renderer configuration
///
/// Plain data with defaults, validated once when the frame renderer is built.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::graphics_device::{PresentMode, SurfaceFormat, TextureFormat};

/// Configuration for the renderer and its Vulkan backend
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Surface formats in preference order (first supported wins)
    pub preferred_surface_formats: Vec<SurfaceFormat>,
    /// Present modes in preference order (Fifo is the fallback)
    pub preferred_present_modes: Vec<PresentMode>,
    /// Lower bound for the swapchain image count
    pub min_image_count: u32,
    /// Frames the CPU may record ahead of the GPU
    pub frames_in_flight: usize,
    /// Longest fence wait before the device is considered lost
    pub fence_timeout: Duration,
    /// Device extensions the backend must enable (swapchain is always added)
    pub required_device_extensions: Vec<String>,
    /// Device extensions enabled when available
    pub optional_device_extensions: Vec<String>,
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Render with an internal screen-space camera when the scene has none
    pub fallback_camera: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            preferred_surface_formats: vec![
                SurfaceFormat::srgb(TextureFormat::B8G8R8A8_SRGB),
                SurfaceFormat::srgb(TextureFormat::R8G8B8A8_SRGB),
            ],
            preferred_present_modes: vec![PresentMode::Mailbox, PresentMode::Fifo],
            min_image_count: 2,
            frames_in_flight: 2,
            fence_timeout: Duration::from_secs(5),
            required_device_extensions: Vec::new(),
            optional_device_extensions: Vec::new(),
            enable_validation: cfg!(debug_assertions),
            fallback_camera: true,
            app_name: "Stratum Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

impl RendererConfig {
    /// Reject values no renderer can run with
    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 {
            return Err(Error::ConfigurationError(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.preferred_surface_formats.is_empty() {
            return Err(Error::ConfigurationError(
                "preferred_surface_formats is empty".to_string(),
            ));
        }
        if self.preferred_present_modes.is_empty() {
            return Err(Error::ConfigurationError(
                "preferred_present_modes is empty".to_string(),
            ));
        }
        if self.fence_timeout.is_zero() {
            return Err(Error::ConfigurationError("fence_timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
