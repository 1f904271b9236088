/// Per-frame counters and the outcome of `FrameRenderer::render_frame`

/// Counters for one presented frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number the counters belong to
    pub frame_number: u64,
    /// Swapchain image the frame rendered into
    pub image_index: u32,
    pub cameras: usize,
    /// Render pass instances begun, summed over cameras
    pub passes_recorded: usize,
    pub draw_calls: usize,
    pub pipeline_binds: usize,
    pub descriptor_binds: usize,
    /// Runs of equal batch hash, summed over recorded passes
    pub batches: usize,
}

/// Why a frame produced no GPU work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The window has a zero-sized framebuffer
    Minimized,
    /// Acquire reported the swapchain out of date; it was recreated
    OutOfDate,
}

/// Result of rendering one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameOutcome {
    Presented,
    /// Presented, but the swapchain will be recreated before the next acquire
    PresentedNeedsRecreate,
    Skipped(SkipReason),
}

impl FrameOutcome {
    pub fn is_presented(&self) -> bool {
        matches!(self, FrameOutcome::Presented | FrameOutcome::PresentedNeedsRecreate)
    }
}
