//! Memory-mapped IO engine
//!
//! The worker's region is split into chunks of at most 1 GiB. Chunks form a
//! small arena indexed by chunk number; only one is mapped at a time, mapped
//! when its segment is entered and unmapped when it is left. Reads and writes
//! are plain copies between the mapping and the worker buffer.
//!
//! Offsets handed to `transfer` are relative to the start of the current chunk.
//! With synchronous mode on, the whole chunk is `msync`ed after every
//! operation.

use super::{BlockBuffer, IoEngine, OperationType, Segment};
use crate::config::workload::AccessPattern;
use crate::distribution::{Region, MMAP_CHUNK_SIZE};
use crate::error::BenchError;
use crate::target::OpenTarget;
use crate::Result;
use memmap2::{Advice, MmapMut, MmapOptions};
use tracing::{trace, warn};

/// One mappable slice of the worker's region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Absolute offset in the target
    pub offset: u64,
    /// Length in bytes, a whole number of blocks
    pub len: u64,
}

impl Chunk {
    pub fn blocks(&self, block_size: u64) -> u64 {
        self.len / block_size
    }
}

/// Split `region` into chunks no larger than `chunk_size`
pub fn chunk_region(region: Region, chunk_size: u64) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut done = 0;
    while done < region.len {
        let len = chunk_size.min(region.len - done);
        chunks.push(Chunk { offset: region.base + done, len });
        done += len;
    }
    chunks
}

/// Spread `ops` over `chunks` in proportion to their block counts
///
/// Sequential phases touch every block of every chunk. Random phases give each
/// chunk its proportional share, rounded down, and hand the remainder to the
/// last chunk.
pub fn plan_chunks(chunks: &[Chunk], block_size: u64, access: AccessPattern, ops: u64) -> Vec<Segment> {
    match access {
        AccessPattern::Sequential => chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| Segment { index, ops: chunk.blocks(block_size) })
            .collect(),
        AccessPattern::Random => {
            let total: u64 = chunks.iter().map(|c| c.blocks(block_size)).sum();
            let mut assigned = 0;
            let mut segments = Vec::with_capacity(chunks.len());
            for (index, chunk) in chunks.iter().enumerate() {
                let share = if index + 1 == chunks.len() {
                    ops - assigned
                } else if total == 0 {
                    0
                } else {
                    (ops as u128 * chunk.blocks(block_size) as u128 / total as u128) as u64
                };
                assigned += share;
                segments.push(Segment { index, ops: share });
            }
            segments
        }
    }
}

/// Chunked memory-mapped engine over an open target
pub struct MappedEngine {
    target: OpenTarget,
    block_size: u64,
    sync: bool,
    chunks: Vec<Chunk>,
    current: Option<MmapMut>,
}

impl MappedEngine {
    pub fn new(target: OpenTarget, block_size: u64, sync: bool) -> Self {
        Self::with_chunk_size(target, block_size, sync, MMAP_CHUNK_SIZE)
    }

    /// Engine with a custom chunk size; must be a multiple of the page size
    /// and of `block_size`
    pub fn with_chunk_size(target: OpenTarget, block_size: u64, sync: bool, chunk_size: u64) -> Self {
        let chunks = chunk_region(target.region(), chunk_size);
        Self {
            target,
            block_size,
            sync,
            chunks,
            current: None,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    fn unmapped(&self) -> BenchError {
        BenchError::io(
            "mmap",
            self.target.path(),
            std::io::Error::new(std::io::ErrorKind::Other, "no chunk is mapped"),
        )
    }
}

impl IoEngine for MappedEngine {
    fn plan(&self, access: AccessPattern, ops: u64) -> Vec<Segment> {
        plan_chunks(&self.chunks, self.block_size, access, ops)
    }

    fn prepare(&mut self, _access: AccessPattern) {}

    fn enter(&mut self, segment: &Segment, access: AccessPattern) -> Result<Region> {
        let chunk = self.chunks[segment.index];

        // SAFETY: the file stays open for the mapping's lifetime and the
        // mapped range belongs to this worker alone.
        let map = unsafe {
            MmapOptions::new()
                .offset(chunk.offset)
                .len(chunk.len as usize)
                .map_mut(self.target.file())
        }
        .map_err(|e| BenchError::io("mmap", self.target.path(), e))?;

        let advice = match access {
            AccessPattern::Sequential => Advice::Sequential,
            AccessPattern::Random => Advice::Random,
        };
        if let Err(e) = map.advise(advice) {
            warn!(path = %self.target.path().display(), error = %e, "madvise failed");
        }

        trace!(chunk = segment.index, offset = chunk.offset, len = chunk.len, "mapped chunk");
        self.current = Some(map);

        let bound = chunk.len.min(MMAP_CHUNK_SIZE).min(self.target.region().len);
        Ok(Region::new(0, bound))
    }

    #[inline]
    fn transfer(&mut self, op: OperationType, offset: u64, buffer: &mut BlockBuffer<'_>) -> Result<()> {
        let len = buffer.data.len();
        let map = match self.current.as_mut() {
            Some(map) => map,
            None => return Err(self.unmapped()),
        };

        let start = offset as usize;
        let available = map.len().saturating_sub(start);
        if available < len {
            return Err(BenchError::ShortTransfer {
                op,
                path: self.target.path().to_path_buf(),
                offset,
                expected: len,
                actual: available,
            });
        }
        let block = &mut map[start..start + len];

        match op {
            OperationType::Read => buffer.data.as_mut_slice().copy_from_slice(block),
            OperationType::Write => block.copy_from_slice(buffer.data.as_slice()),
        }

        if self.sync {
            map.flush()
                .map_err(|e| BenchError::io("msync", self.target.path(), e))?;
        }

        if op == OperationType::Read {
            buffer.verify(self.target.path(), offset)?;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        // Dropping the mapping unmaps it
        self.current = None;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.current = None;
        self.target.sync()
    }
}
