//! Sequential placement
//!
//! Each block follows the previous one. No wrap-around: callers bound the
//! number of steps to the blocks in the region.

use super::{Placement, Region};

/// Next block directly after the previous one
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPlacement;

impl Placement for SequentialPlacement {
    #[inline]
    fn next_offset(&mut self, prev: u64, _region: &Region, block_size: u64) -> u64 {
        prev.wrapping_add(block_size)
    }
}
