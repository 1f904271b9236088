//! Camera module: passive per-view data for the frame renderer.
//!
//! Cameras are owned and driven by the caller (through a RenderScene);
//! the renderer only owns a fallback screen-space camera.

mod camera;

pub use camera::Camera;
