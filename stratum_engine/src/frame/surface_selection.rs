/// Swapchain parameter selection
///
/// Pure functions over the surface support the device reports. Preference
/// lists are matched in order: the first supported entry wins.

use crate::engine_warn;
use crate::error::{Error, Result};
use crate::graphics_device::{Extent2D, PresentMode, SharingMode, SurfaceCapabilities, SurfaceFormat};

/// First preferred format the surface supports, else the surface's first format
pub fn choose_surface_format(
    supported: &[SurfaceFormat],
    preferred: &[SurfaceFormat],
) -> Result<SurfaceFormat> {
    let Some(&first) = supported.first() else {
        return Err(Error::ConfigurationError("Surface reports no supported formats".to_string()));
    };

    match preferred.iter().find(|format| supported.contains(format)) {
        Some(&format) => Ok(format),
        None => {
            engine_warn!(
                "stratum::SwapchainPresenter",
                "No preferred surface format supported, falling back to {:?}",
                first
            );
            Ok(first)
        }
    }
}

/// First preferred present mode the surface supports, else FIFO
///
/// FIFO is the one mode every presentation engine must support.
pub fn choose_present_mode(supported: &[PresentMode], preferred: &[PresentMode]) -> Result<PresentMode> {
    if supported.is_empty() {
        return Err(Error::ConfigurationError("Surface reports no present modes".to_string()));
    }

    match preferred.iter().find(|mode| supported.contains(mode)) {
        Some(&mode) => Ok(mode),
        None => {
            engine_warn!(
                "stratum::SwapchainPresenter",
                "No preferred present mode supported, falling back to Fifo"
            );
            Ok(PresentMode::Fifo)
        }
    }
}

/// Swapchain extent for the current window size
///
/// A zero-sized window yields a zero extent (minimized) regardless of what
/// the surface reports. Otherwise the surface's current extent is used
/// verbatim, or, when the surface leaves the choice to the application, the
/// window size clamped to the surface's limits.
pub fn choose_extent(capabilities: &SurfaceCapabilities, window_size: (u32, u32)) -> Extent2D {
    let (width, height) = window_size;
    if width == 0 || height == 0 {
        return Extent2D::new(0, 0);
    }

    match capabilities.current_extent {
        Some(extent) => extent,
        None => Extent2D::new(
            width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
            height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
        ),
    }
}

/// One image more than the minimum, within the surface's bounds, at least `floor`
///
/// A `max_image_count` of 0 means unbounded. The floor cannot push the count
/// past a bounded maximum.
pub fn choose_image_count(capabilities: &SurfaceCapabilities, floor: u32) -> u32 {
    let max = match capabilities.max_image_count {
        0 => u32::MAX,
        max => max,
    };
    let count = capabilities
        .min_image_count
        .saturating_add(1)
        .clamp(capabilities.min_image_count, max.max(capabilities.min_image_count));
    count.max(floor).min(max)
}

/// Concurrent sharing when graphics and present use different families
pub fn choose_sharing_mode(graphics_family: u32, present_family: u32) -> SharingMode {
    if graphics_family == present_family {
        SharingMode::Exclusive
    } else {
        SharingMode::Concurrent { graphics_family, present_family }
    }
}

#[cfg(test)]
#[path = "surface_selection_tests.rs"]
mod tests;
