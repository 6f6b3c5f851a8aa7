//! Offset placement strategies
//!
//! A placement decides where the next block goes, given where the previous one
//! went. Two strategies exist, matching the two access patterns:
//!
//! - **Sequential**: the block immediately after the previous one
//! - **Random**: a uniformly drawn block anywhere in the region
//!
//! Both work on a [`Region`], a byte range that is either the worker's whole
//! target (descriptor IO, where `base` is the raw-device offset) or one mapped
//! chunk (memory-mapped IO, where offsets are relative to the mapping).
//!
//! # Back-one seeding
//!
//! Callers start the cursor one block *before* the region and always advance
//! before each operation. The first sequential offset therefore equals the
//! region base; random placement ignores the cursor entirely.
//!
//! # Example
//!
//! ```
//! use iostorm::distribution::{Placement, Region, sequential::SequentialPlacement};
//!
//! let region = Region::new(8192, 4 * 4096);
//! let mut placement = SequentialPlacement;
//!
//! let mut offset = region.before_start(4096);
//! let mut offsets = Vec::new();
//! for _ in 0..3 {
//!     offset = placement.next_offset(offset, &region, 4096);
//!     offsets.push(offset);
//! }
//! assert_eq!(offsets, vec![8192, 12288, 16384]);
//! ```

pub mod random;
pub mod sequential;

use crate::config::workload::AccessPattern;

/// Largest span mapped at once by memory-mapped IO (1 GiB)
pub const MMAP_CHUNK_SIZE: u64 = 1 << 30;

/// Byte range a placement draws offsets from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First byte of the region
    pub base: u64,
    /// Length in bytes
    pub len: u64,
}

impl Region {
    pub fn new(base: u64, len: u64) -> Self {
        Self { base, len }
    }

    /// Whole blocks that fit in the region
    pub fn blocks(&self, block_size: u64) -> u64 {
        if block_size == 0 {
            0
        } else {
            self.len / block_size
        }
    }

    /// Cursor value that makes the first sequential step land on `base`
    pub fn before_start(&self, block_size: u64) -> u64 {
        self.base.wrapping_sub(block_size)
    }
}

/// Offset placement strategy
///
/// Implementations must be `Send`; each worker owns its own instance.
pub trait Placement: Send {
    /// Offset of the next block, given the previous offset
    fn next_offset(&mut self, prev: u64, region: &Region, block_size: u64) -> u64;
}

/// Placement for `access`, seeding random placement with `seed`
pub fn placement_for(access: AccessPattern, seed: u32) -> Box<dyn Placement> {
    match access {
        AccessPattern::Sequential => Box::new(sequential::SequentialPlacement),
        AccessPattern::Random => Box::new(random::RandomPlacement::new(seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_blocks() {
        let region = Region::new(0, 10 * 4096 + 100);
        assert_eq!(region.blocks(4096), 10);
        assert_eq!(region.blocks(0), 0);
    }

    #[test]
    fn test_before_start_wraps_at_zero() {
        let region = Region::new(0, 4096);
        assert_eq!(region.before_start(4096), u64::MAX - 4095);
        assert_eq!(region.before_start(4096).wrapping_add(4096), 0);
    }

    #[test]
    fn test_placement_for_access() {
        let region = Region::new(4096, 4096);
        let mut seq = placement_for(AccessPattern::Sequential, 1);
        assert_eq!(seq.next_offset(region.before_start(4096), &region, 4096), 4096);

        let mut rnd = placement_for(AccessPattern::Random, 1);
        assert_eq!(rnd.next_offset(0, &region, 4096), 4096);
    }
}
