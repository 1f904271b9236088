/// Window collaborator
///
/// The renderer only needs the current framebuffer size (for the swapchain
/// extent) and a way to close the window after a fatal error. The Vulkan
/// backend builds its surface from the same winit window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use winit::window::Window;

use crate::engine_warn;

/// What the renderer needs from a window
pub trait SurfaceWindow: Send + Sync {
    /// Framebuffer size in physical pixels, (0, 0) when minimized
    fn framebuffer_size(&self) -> (u32, u32);

    /// Ask the application to close the window (fatal render error)
    fn request_close(&self);
}

/// SurfaceWindow over a winit window
///
/// winit windows cannot be closed from outside the event loop; the close
/// request is recorded and polled by the application through `close_requested`.
pub struct RenderWindow {
    window: Arc<Window>,
    close_requested: AtomicBool,
}

impl RenderWindow {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window, close_requested: AtomicBool::new(false) }
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Whether a fatal render error asked for the window to close
    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }
}

impl SurfaceWindow for RenderWindow {
    fn framebuffer_size(&self) -> (u32, u32) {
        // Some platforms keep reporting the restored size while minimized
        if self.window.is_minimized() == Some(true) {
            return (0, 0);
        }
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn request_close(&self) {
        if !self.close_requested.swap(true, Ordering::AcqRel) {
            engine_warn!("stratum::Window", "Close requested after fatal render error");
        }
    }
}
