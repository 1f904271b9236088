/// Opaque native object handles
///
/// Every handle wraps the raw 64-bit value the backend uses for the object
/// (a `VkFence`, a `VkRenderPass`, ...). Handles are plain values: copying one
/// never duplicates the native object and dropping one never destroys it.
/// Ordering by raw value gives batch sorting a deterministic total order.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            /// The null handle
            pub const NULL: Self = Self(0);

            /// Wrap a raw backend value
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw backend value
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

define_handle! {
    /// CPU-waitable GPU completion signal
    FenceHandle
}
define_handle! {
    /// GPU-to-GPU ordering signal
    SemaphoreHandle
}
define_handle! {
    /// Presentation swapchain
    SwapchainHandle
}
define_handle! {
    /// Image owned by a swapchain
    ImageHandle
}
define_handle! {
    ImageViewHandle
}
define_handle! {
    RenderPassHandle
}
define_handle! {
    FramebufferHandle
}
define_handle! {
    CommandPoolHandle
}
define_handle! {
    /// Primary command buffer
    CommandBufferHandle
}
define_handle! {
    /// Graphics pipeline (owned by the consumer, never destroyed here)
    PipelineHandle
}
define_handle! {
    /// Pipeline layout (owned by the consumer)
    PipelineLayoutHandle
}
define_handle! {
    /// Descriptor set (owned by the consumer)
    DescriptorSetHandle
}
define_handle! {
    /// Vertex or index buffer (owned by the consumer)
    BufferHandle
}
define_handle! {
    /// Depth image together with its memory
    DepthBufferHandle
}
