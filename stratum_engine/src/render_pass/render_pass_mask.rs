/// Render pass bitmask
///
/// Bit `i` selects the pass at index `i` of the catalog. The named constants
/// follow the standard catalog order; custom catalogs reuse the low bits.

use bitflags::bitflags;

bitflags! {
    /// Set of logical render passes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct RenderPassMask: u32 {
        const SHADOW = 1 << 0;
        const DEPTH_PREPASS = 1 << 1;
        const BACKGROUND = 1 << 2;
        const MAIN = 1 << 3;
        const LIGHTING = 1 << 4;
        const REFLECTION = 1 << 5;
        const TRANSPARENT = 1 << 6;
        const PARTICLES = 1 << 7;
        const POST = 1 << 8;
        const UI = 1 << 9;
        const DEBUG = 1 << 10;

        /// Opaque geometry: casts shadows, writes depth, lands in the main pass
        const OPAQUE = Self::SHADOW.bits() | Self::DEPTH_PREPASS.bits() | Self::MAIN.bits();
        const ALPHA_BLENDED = Self::TRANSPARENT.bits() | Self::PARTICLES.bits();
        /// Every world-space pass
        const SCENE = Self::SHADOW.bits()
            | Self::DEPTH_PREPASS.bits()
            | Self::BACKGROUND.bits()
            | Self::MAIN.bits()
            | Self::LIGHTING.bits()
            | Self::REFLECTION.bits()
            | Self::TRANSPARENT.bits()
            | Self::PARTICLES.bits();
        const ALL = Self::SCENE.bits() | Self::POST.bits() | Self::UI.bits() | Self::DEBUG.bits();
    }
}

impl RenderPassMask {
    /// Mask with only the bit for `index` set
    ///
    /// Returns an empty mask for indices past 31.
    pub fn single(index: usize) -> Self {
        if index < 32 {
            Self::from_bits_retain(1 << index)
        } else {
            Self::empty()
        }
    }

    /// Mask with the low `count` bits set
    pub fn first_n(count: usize) -> Self {
        match count {
            0 => Self::empty(),
            n if n >= 32 => Self::from_bits_retain(u32::MAX),
            n => Self::from_bits_retain((1u32 << n) - 1),
        }
    }

    /// Bit position of a single-bit mask, `None` for zero or several bits
    pub fn index_of(self) -> Option<usize> {
        let bits = self.bits();
        if bits.count_ones() == 1 {
            Some(bits.trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// Number of passes in the mask
    pub fn pass_count(self) -> u32 {
        self.bits().count_ones()
    }

    /// Single-bit masks in ascending bit order
    pub fn passes(self) -> ActivePasses {
        ActivePasses { remaining: self.bits() }
    }
}

/// Iterator over the single-bit masks of a RenderPassMask, lowest bit first
///
/// Restartable by cloning.
#[derive(Debug, Clone)]
pub struct ActivePasses {
    remaining: u32,
}

impl Iterator for ActivePasses {
    type Item = RenderPassMask;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let lowest = self.remaining & self.remaining.wrapping_neg();
        self.remaining &= !lowest;
        Some(RenderPassMask::from_bits_retain(lowest))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ActivePasses {}

#[cfg(test)]
#[path = "render_pass_mask_tests.rs"]
mod tests;
