//! IO engine abstraction
//!
//! An IO engine moves one block between the worker buffer and the target at a
//! given offset. Two engines exist:
//!
//! - **Descriptor** ([`sync::DescriptorEngine`]): positioned `pread`/`pwrite`
//! - **Memory-mapped** ([`mmap::MappedEngine`]): copies in and out of a shared
//!   mapping, one chunk of at most [`MMAP_CHUNK_SIZE`] at a time
//!
//! # Segments
//!
//! A phase is split into segments by the engine. The descriptor engine covers
//! the whole target with a single segment; the mapped engine produces one
//! segment per chunk. The driver enters a segment (which maps it, if needed),
//! runs that segment's operations with offsets inside the returned
//! [`Region`], then leaves it before moving on.
//!
//! # Verification
//!
//! With consistency checking enabled, every read recomputes the CRC32 of the
//! buffer and compares it with the checksum of the content the worker writes.
//! Writes never compare anything.
//!
//! [`MMAP_CHUNK_SIZE`]: crate::distribution::MMAP_CHUNK_SIZE

pub mod mmap;
pub mod sync;

use crate::config::workload::AccessPattern;
use crate::distribution::Region;
use crate::error::BenchError;
use crate::util::buffer::AlignedBuffer;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Direction of a block transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Target to buffer
    Read,
    /// Buffer to target
    Write,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Read => write!(f, "read"),
            OperationType::Write => write!(f, "write"),
        }
    }
}

/// Worker buffer plus the checksum reads must reproduce
pub struct BlockBuffer<'a> {
    pub data: &'a mut AlignedBuffer,
    /// Present when consistency checking is enabled
    pub checksum: Option<u32>,
}

impl<'a> BlockBuffer<'a> {
    pub fn new(data: &'a mut AlignedBuffer, checksum: Option<u32>) -> Self {
        Self { data, checksum }
    }

    /// Compare the buffer against the expected checksum, if any
    pub fn verify(&self, path: &Path, offset: u64) -> Result<()> {
        let Some(expected) = self.checksum else {
            return Ok(());
        };
        let actual = self.data.checksum();
        if actual != expected {
            return Err(BenchError::Checksum {
                path: path.to_path_buf(),
                offset,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

/// A slice of the phase handled under one mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Position in the engine's segment list
    pub index: usize,
    /// Operations to run inside this segment
    pub ops: u64,
}

/// IO engine trait for both backends
///
/// Engines are owned by one worker for the duration of a phase.
pub trait IoEngine {
    /// Split `ops` operations of the given access pattern into segments
    fn plan(&self, access: AccessPattern, ops: u64) -> Vec<Segment>;

    /// Whole-target access hint, applied before the phase timer starts
    fn prepare(&mut self, access: AccessPattern);

    /// Make `segment` addressable and return the region offsets are drawn from
    fn enter(&mut self, segment: &Segment, access: AccessPattern) -> Result<Region>;

    /// Move exactly one block at `offset` (an offset within the entered region)
    fn transfer(&mut self, op: OperationType, offset: u64, buffer: &mut BlockBuffer<'_>) -> Result<()>;

    /// Release whatever `enter` set up
    fn leave(&mut self) -> Result<()>;

    /// Flush the target to stable storage and close it
    fn finish(self) -> Result<()>;
}
