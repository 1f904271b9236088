/*!
# Stratum Engine

Backend-agnostic rendering core of the Stratum renderer.

The crate turns a frame's cameras and visible drawables into GPU work: draw
commands are bucketed per logical render pass, recorded pass by pass in a
fixed order, submitted once per frame and presented. Every native call goes
through the device traits in `graphics_device`; the Vulkan backend lives in
`stratum_engine_renderer_vulkan`.

## Architecture

- **RenderPassCatalog**: ordered table of logical passes (index = mask bit = execution order)
- **DrawCommandCollector**: per-pass, strategy-sorted draw command sets
- **FrameSynchronizer**: fences and semaphores for frames in flight
- **SwapchainPresenter**: swapchain, framebuffers, resize and minimize handling
- **FrameRenderer**: wait, acquire, record, submit, present
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod window;
pub mod graphics_device;
pub mod render_pass;
pub mod camera;
pub mod draw;
pub mod frame;

// Main stratum namespace module
pub mod stratum {
    // Error types
    pub use crate::error::{retry_with_fresh_pool, Error, Result};

    // Configuration and window collaborator
    pub use crate::config::RendererConfig;
    pub use crate::window::{RenderWindow, SurfaceWindow};

    // Logging sub-module (types and slot functions, NOT macros)
    pub mod log {
        pub use crate::log::{
            reset_logger, set_logger, set_min_severity, DefaultLogger, LogEntry, LogSeverity, Logger,
        };
    }

    // Device traits, handles and exchanged types
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Render sub-module: passes, cameras, draw commands and the frame loop
    pub mod render {
        pub use crate::camera::*;
        pub use crate::draw::*;
        pub use crate::frame::*;
        pub use crate::render_pass::*;
    }
}

// Re-export math library at crate root
pub use glam;
