/// Render pass module - pass masks, descriptors and the pass catalog

pub mod render_pass_mask;
pub mod render_pass_descriptor;
pub mod render_pass_catalog;

pub use render_pass_mask::*;
pub use render_pass_descriptor::*;
pub use render_pass_catalog::*;
