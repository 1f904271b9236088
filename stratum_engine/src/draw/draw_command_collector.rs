/// DrawCommandCollector: buckets a frame's draw commands per render pass
///
/// Every command is stored once; each pass keeps the indices of the commands
/// whose mask includes it, sorted by the pass's batch strategy once
/// collection is done. Storage is reused from frame to frame.

use std::sync::Arc;

use crate::draw::{BatchStrategy, DrawCommand, Drawable, RenderContext, RenderScene};
use crate::error::Result;
use crate::render_pass::{RenderPassCatalog, RenderPassMask};

/// Output of one collection: per-pass sorted commands plus the active-pass mask
#[derive(Debug, Default)]
pub struct CollectedCommands {
    commands: Vec<DrawCommand>,
    passes: Vec<Vec<u32>>,
    active_passes: RenderPassMask,
    must_execute: RenderPassMask,
}

impl CollectedCommands {
    /// Passes with at least one command, plus the always-execute passes
    pub fn active_passes(&self) -> RenderPassMask {
        self.active_passes
    }

    /// Passes recorded even when empty
    pub fn must_execute(&self) -> RenderPassMask {
        self.must_execute
    }

    /// Total commands emitted by the drawables this frame
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Sorted commands of the pass at `index` (empty for unknown indices)
    pub fn pass(&self, index: usize) -> PassCommands<'_> {
        PassCommands {
            commands: &self.commands,
            indices: self.passes.get(index).map(Vec::as_slice).unwrap_or(&[]),
        }
    }
}

/// Sorted view over one pass's commands
#[derive(Debug, Clone, Copy)]
pub struct PassCommands<'a> {
    commands: &'a [DrawCommand],
    indices: &'a [u32],
}

impl<'a> PassCommands<'a> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Commands in execution order
    pub fn iter(&self) -> impl Iterator<Item = &'a DrawCommand> + 'a {
        let commands = self.commands;
        self.indices.iter().map(move |&i| &commands[i as usize])
    }

    /// Number of runs of equal batch hash (state changes + 1)
    pub fn batch_count(&self, strategy: &dyn BatchStrategy) -> usize {
        let mut count = 0;
        let mut previous = None;
        for command in self.iter() {
            let hash = strategy.batch_hash(command);
            if previous != Some(hash) {
                count += 1;
                previous = Some(hash);
            }
        }
        count
    }
}

pub struct DrawCommandCollector {
    catalog: Arc<RenderPassCatalog>,
    collected: CollectedCommands,
}

impl DrawCommandCollector {
    pub fn new(catalog: Arc<RenderPassCatalog>) -> Self {
        let passes = vec![Vec::new(); catalog.len()];
        let must_execute = catalog.always_execute_mask();
        Self {
            catalog,
            collected: CollectedCommands {
                commands: Vec::new(),
                passes,
                active_passes: must_execute,
                must_execute,
            },
        }
    }

    pub fn catalog(&self) -> &Arc<RenderPassCatalog> {
        &self.catalog
    }

    /// Result of the last collection
    pub fn collected(&self) -> &CollectedCommands {
        &self.collected
    }

    /// Collect commands from an ordered sequence of visible drawables
    ///
    /// Fails with a configuration error if a command's mask names a pass the
    /// catalog does not have.
    pub fn collect<'d, I>(&mut self, context: &RenderContext<'_>, drawables: I) -> Result<&CollectedCommands>
    where
        I: IntoIterator<Item = &'d dyn Drawable>,
    {
        self.begin();
        for drawable in drawables {
            self.add(drawable, context)?;
        }
        self.finish();
        Ok(&self.collected)
    }

    /// Collect commands from the drawables a scene reports visible for the context's camera
    pub fn collect_scene(
        &mut self,
        context: &RenderContext<'_>,
        scene: &dyn RenderScene,
    ) -> Result<&CollectedCommands> {
        self.begin();
        let mut outcome = Ok(());
        scene.for_each_visible(context.camera(), &mut |drawable: &dyn Drawable| {
            if outcome.is_ok() {
                outcome = self.add(drawable, context);
            }
        });
        outcome?;
        self.finish();
        Ok(&self.collected)
    }

    fn begin(&mut self) {
        let collected = &mut self.collected;
        collected.commands.clear();
        for pass in &mut collected.passes {
            pass.clear();
        }
        collected.active_passes = collected.must_execute;
    }

    fn add(&mut self, drawable: &dyn Drawable, context: &RenderContext<'_>) -> Result<()> {
        let collected = &mut self.collected;
        let start = collected.commands.len();
        drawable.draw_commands(context, &mut collected.commands);

        for index in start..collected.commands.len() {
            let mask = collected.commands[index].render_mask;
            self.catalog.validate(mask)?;
            collected.active_passes |= mask;
            for pass in mask.passes() {
                if let Some(pass_index) = pass.index_of() {
                    collected.passes[pass_index].push(index as u32);
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        let collected = &mut self.collected;
        let commands = &collected.commands;
        for (pass_index, indices) in collected.passes.iter_mut().enumerate() {
            if indices.len() < 2 {
                continue;
            }
            let strategy = &self.catalog.configurations()[pass_index].batch_strategy;
            indices.sort_unstable_by(|&a, &b| {
                strategy
                    .compare(&commands[a as usize], &commands[b as usize])
                    .then(a.cmp(&b))
            });
        }
    }
}

#[cfg(test)]
#[path = "draw_command_collector_tests.rs"]
mod tests;
