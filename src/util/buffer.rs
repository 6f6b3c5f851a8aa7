//! Aligned worker buffers
//!
//! Each worker owns one block-sized buffer, aligned to the page size so it can
//! be handed straight to `pread`/`pwrite` on raw devices. The buffer is filled
//! once with pseudo-random content derived from the worker index; writes send
//! that content to disk and verifying reads compare against its checksum.

use crate::error::BenchError;
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::alloc::{alloc_zeroed, dealloc, Layout};

/// Default buffer alignment
pub const BUFFER_ALIGNMENT: usize = 4096;

/// Memory-aligned buffer
pub struct AlignedBuffer {
    ptr: *mut u8,
    size: usize,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocate a zeroed buffer of `size` bytes aligned to `alignment`
    ///
    /// Fails with `BenchError::Alloc` when the layout is invalid or the
    /// allocator returns nothing.
    pub fn new(size: usize, alignment: usize) -> crate::Result<Self> {
        let alloc_error = || BenchError::Alloc {
            what: "worker buffer",
            bytes: size,
        };
        if size == 0 || !alignment.is_power_of_two() {
            return Err(alloc_error());
        }
        let layout = Layout::from_size_align(size, alignment).map_err(|_| alloc_error())?;

        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(alloc_error());
        }

        Ok(AlignedBuffer { ptr, size, layout })
    }

    /// Page-aligned buffer holding `seed`-derived pseudo-random bytes
    pub fn seeded(size: usize, seed: u64) -> crate::Result<Self> {
        let mut buffer = Self::new(size, BUFFER_ALIGNMENT)?;
        buffer.fill_random(seed);
        Ok(buffer)
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr owns `size` initialized bytes for the buffer's lifetime.
        unsafe { std::slice::from_raw_parts(self.ptr, self.size) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.size) }
    }

    /// Buffer length in bytes; never zero
    #[inline(always)]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Overwrite the buffer with a deterministic stream for `seed`
    pub fn fill_random(&mut self, seed: u64) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        rng.fill_bytes(self.as_mut_slice());
    }

    /// CRC32 of the current contents
    pub fn checksum(&self) -> u32 {
        crc32fast::hash(self.as_slice())
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by alloc_zeroed with this exact layout.
        unsafe {
            dealloc(self.ptr, self.layout);
        }
    }
}

// AlignedBuffer is Send because it owns its memory
unsafe impl Send for AlignedBuffer {}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("size", &self.size)
            .field("alignment", &self.layout.align())
            .finish()
    }
}
