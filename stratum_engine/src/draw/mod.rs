/// Draw module - draw commands, batching strategies and per-pass collection

pub mod draw_command;
pub mod push_constants;
pub mod batch_strategy;
pub mod render_context;
pub mod draw_command_collector;

pub use draw_command::*;
pub use push_constants::*;
pub use batch_strategy::*;
pub use render_context::*;
pub use draw_command_collector::*;
