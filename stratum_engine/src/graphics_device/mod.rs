/// Graphics device module - native handles, device traits and exchanged types

pub mod handles;
pub mod types;
pub mod device;

pub use handles::*;
pub use types::*;
pub use device::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
