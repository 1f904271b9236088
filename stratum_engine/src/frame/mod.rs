/// Frame module - synchronization, presentation and per-frame orchestration

pub mod frame_stats;
pub mod frame_synchronizer;
pub mod surface_selection;
pub mod swapchain_presenter;
pub mod frame_renderer;

pub use frame_stats::*;
pub use frame_synchronizer::*;
pub use surface_selection::*;
pub use swapchain_presenter::*;
pub use frame_renderer::*;
