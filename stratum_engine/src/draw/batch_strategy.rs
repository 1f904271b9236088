/// Batch strategies: ordering and grouping of a pass's draw commands
///
/// A strategy defines the total order the collector sorts a pass into, and a
/// grouping hash: consecutive commands with the same hash form one batch
/// (no pipeline, descriptor or buffer change between them).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::draw::DrawCommand;

pub trait BatchStrategy: fmt::Debug + Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &str;

    /// Total order over draw commands
    fn compare(&self, a: &DrawCommand, b: &DrawCommand) -> Ordering;

    /// Grouping hash: equal for commands drawable without a state change
    fn batch_hash(&self, command: &DrawCommand) -> u64 {
        state_hash(command)
    }
}

/// Compare by state-change cost: pipeline, descriptor sets, vertex buffer,
/// index buffer, all ascending
pub fn compare_state_keys(a: &DrawCommand, b: &DrawCommand) -> Ordering {
    a.pipeline
        .cmp(&b.pipeline)
        .then_with(|| a.descriptor_sets.cmp(&b.descriptor_sets))
        .then_with(|| a.vertex_buffer.cmp(&b.vertex_buffer))
        .then_with(|| {
            let a_index = a.index_buffer.map(|i| i.buffer);
            let b_index = b.index_buffer.map(|i| i.buffer);
            a_index.cmp(&b_index)
        })
}

/// Hash of the state keys used by `compare_state_keys`
pub fn state_hash(command: &DrawCommand) -> u64 {
    let mut hasher = FxHasher::default();
    command.pipeline.hash(&mut hasher);
    command.descriptor_sets.hash(&mut hasher);
    command.vertex_buffer.hash(&mut hasher);
    command.index_buffer.map(|i| i.buffer).hash(&mut hasher);
    hasher.finish()
}

/// Sort by pipeline, then descriptor sets, then vertex buffer, then index buffer
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBatchStrategy;

impl BatchStrategy for DefaultBatchStrategy {
    fn name(&self) -> &str {
        "default"
    }

    fn compare(&self, a: &DrawCommand, b: &DrawCommand) -> Ordering {
        compare_state_keys(a, b)
    }
}

/// Farthest first (descending `sort_depth`), ties broken by the default keys
///
/// For blended passes, where draw order matters more than state changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackToFrontStrategy;

impl BatchStrategy for BackToFrontStrategy {
    fn name(&self) -> &str {
        "back-to-front"
    }

    fn compare(&self, a: &DrawCommand, b: &DrawCommand) -> Ordering {
        b.sort_depth
            .total_cmp(&a.sort_depth)
            .then_with(|| compare_state_keys(a, b))
    }
}

#[cfg(test)]
#[path = "batch_strategy_tests.rs"]
mod tests;
