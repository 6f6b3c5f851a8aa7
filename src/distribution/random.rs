//! Random placement
//!
//! Offsets are drawn uniformly from the blocks of the region using a
//! reentrant linear congruential generator that reproduces the classic
//! `rand_r` sequence bit for bit, so a given seed yields the same access
//! pattern as other tools built on that generator.
//!
//! A single draw only yields 31 bits. When that draw is already smaller than
//! the block count, a second draw is shifted into the upper bits so large
//! targets are still covered. The shift follows 32-bit signed integer
//! semantics: it wraps at 32 bits and the result is sign-extended.
//!
//! # Example
//!
//! ```
//! use iostorm::distribution::random::{uniform_block, RandR};
//!
//! let mut rng = RandR::new(1);
//! assert_eq!(uniform_block(&mut rng, 1000), 713);
//! assert_eq!(uniform_block(&mut rng, 1000), 907);
//! ```

use super::{Placement, Region};
use crate::util::time::wall_clock_us;
use rand::RngCore;

/// Seed used when the clock cannot be read
pub const FALLBACK_SEED: u32 = 0xDEAD_BEEF;

/// Reentrant `rand_r`-compatible generator
///
/// Each output combines three LCG steps and lies in `[0, 2^31)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandR {
    state: u32,
}

impl RandR {
    const MULTIPLIER: u32 = 1_103_515_245;
    const INCREMENT: u32 = 12_345;

    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    #[inline]
    fn step(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        self.state >> 16
    }

    /// Next value in `[0, 2^31)`
    #[inline]
    pub fn next(&mut self) -> u32 {
        let mut result = self.step() % 2048;
        result = (result << 10) ^ (self.step() % 1024);
        result = (result << 10) ^ (self.step() % 1024);
        result
    }
}

impl RngCore for RandR {
    fn next_u32(&mut self) -> u32 {
        self.next()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.next());
        let hi = u64::from(self.next());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Uniform block index in `[0, max)`; 0 when `max` is 0
pub fn uniform_block(rng: &mut RandR, max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let mut rr = u64::from(rng.next());
    if rr < max {
        let high = (rng.next() as i32).wrapping_shl(16) as i64 as u64;
        rr |= high;
    }
    rr % max
}

/// Per-phase seed from the microsecond part of the wall clock
pub fn seed_from_clock() -> u32 {
    match wall_clock_us() {
        Ok(us) => (us % 1_000_000) as u32,
        Err(_) => FALLBACK_SEED,
    }
}

/// Uniformly random block within the region
#[derive(Debug, Clone)]
pub struct RandomPlacement {
    rng: RandR,
}

impl RandomPlacement {
    pub fn new(seed: u32) -> Self {
        Self { rng: RandR::new(seed) }
    }
}

impl Placement for RandomPlacement {
    #[inline]
    fn next_offset(&mut self, _prev: u64, region: &Region, block_size: u64) -> u64 {
        let block = uniform_block(&mut self.rng, region.blocks(block_size));
        region.base + block * block_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rand_r_vectors() {
        let mut rng = RandR::new(1);
        assert_eq!(rng.next(), 476_707_713);
        assert_eq!(rng.next(), 1_186_278_907);
        assert_eq!(rng.next(), 505_671_508);

        let mut rng = RandR::new(12345);
        assert_eq!(rng.next(), 1_036_784_229);
        assert_eq!(rng.next(), 1_520_991_917);
        assert_eq!(rng.next(), 1_373_464_794);
    }

    #[test]
    fn test_rand_r_range() {
        let mut rng = RandR::new(0xDEAD_BEEF);
        for _ in 0..10_000 {
            assert!(rng.next() < (1 << 31));
        }
    }

    #[test]
    fn test_uniform_without_widening() {
        let mut rng = RandR::new(1);
        assert_eq!(uniform_block(&mut rng, 1000), 713);
        assert_eq!(uniform_block(&mut rng, 1000), 907);
        assert_eq!(uniform_block(&mut rng, 1000), 508);
    }

    #[test]
    fn test_uniform_widening_draw() {
        let mut rng = RandR::new(1);
        assert_eq!(uniform_block(&mut rng, 1 << 40), 1_039_924_097);

        let mut rng = RandR::new(7);
        assert_eq!(uniform_block(&mut rng, 1 << 40), 1_340_947_060);
    }

    #[test]
    fn test_uniform_bounds() {
        let mut rng = RandR::new(99);
        assert_eq!(uniform_block(&mut rng, 5000), 2036);
        for max in [1, 2, 3, 1000, 1 << 20, 1 << 33] {
            for _ in 0..1000 {
                assert!(uniform_block(&mut rng, max) < max);
            }
        }
        assert_eq!(uniform_block(&mut rng, 0), 0);
    }

    #[test]
    fn test_single_block_region_always_base() {
        let region = Region::new(65536, 4096);
        let mut placement = RandomPlacement::new(seed_from_clock());
        for _ in 0..100 {
            assert_eq!(placement.next_offset(0, &region, 4096), 65536);
        }
    }

    #[test]
    fn test_random_offsets_stay_in_region() {
        let block_size = 512;
        let region = Region::new(1 << 20, 100 * block_size + 17);
        let mut placement = RandomPlacement::new(42);
        for _ in 0..10_000 {
            let offset = placement.next_offset(0, &region, block_size);
            assert!(offset >= region.base);
            assert!(offset + block_size <= region.base + region.len);
            assert_eq!((offset - region.base) % block_size, 0);
        }
    }

    #[test]
    fn test_rng_core_u32_matches_next() {
        let mut a = RandR::new(5);
        let mut b = RandR::new(5);
        assert_eq!(a.next_u32(), b.next());
    }

    #[test]
    fn test_rng_core_u64_and_bytes() {
        let mut rng = RandR::new(1);
        let expected = (1_186_278_907u64 << 32) | 476_707_713;
        assert_eq!(rng.next_u64(), expected);

        let mut rng = RandR::new(1);
        let mut bytes = [0u8; 6];
        rng.fill_bytes(&mut bytes);
        assert_eq!(&bytes[..4], &476_707_713u32.to_le_bytes());
        assert_eq!(&bytes[4..], &1_186_278_907u32.to_le_bytes()[..2]);
    }

    #[test]
    fn test_clock_seed_is_microseconds() {
        assert!(seed_from_clock() < 1_000_000);
    }
}
