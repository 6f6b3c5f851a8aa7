//! Worker state
//!
//! One `WorkerState` exists per worker thread for the whole run. It owns the
//! worker's target description, its block buffer and the four phase records.
//! The coordinator lends each state mutably to exactly one thread per phase,
//! so nothing in here is shared or locked.
//!
//! # Example
//!
//! ```no_run
//! use iostorm::config::Config;
//! use iostorm::config::workload::Phase;
//! use iostorm::target::TargetSpec;
//! use iostorm::worker::{driver, WorkerState};
//! use std::path::PathBuf;
//!
//! let config = Config::default();
//! let target = TargetSpec { path: PathBuf::from("/tmp/w0.dat"), base: 0, raw: false };
//! let mut worker = WorkerState::new(0, target, &config)?;
//!
//! driver::run_phase(&mut worker, Phase::Write, &config)?;
//! println!("wrote {} blocks", worker.record(Phase::Write).blocks);
//! # Ok::<(), iostorm::BenchError>(())
//! ```

pub mod driver;

use crate::config::workload::Phase;
use crate::config::Config;
use crate::stats::PhaseRecord;
use crate::target::TargetSpec;
use crate::util::buffer::AlignedBuffer;
use crate::Result;

/// Everything one worker carries between phases
#[derive(Debug)]
pub struct WorkerState {
    pub index: usize,
    pub target: TargetSpec,
    /// Block-sized buffer with fixed content derived from `index`
    pub buffer: AlignedBuffer,
    /// CRC32 of `buffer`, kept when consistency checking is enabled
    pub checksum: Option<u32>,
    /// Whether the scratch file has been created (and truncated) yet
    pub created: bool,
    records: [PhaseRecord; 4],
}

impl WorkerState {
    /// Allocate worker `index`'s buffer and empty phase records
    pub fn new(index: usize, target: TargetSpec, config: &Config) -> Result<Self> {
        let buffer = AlignedBuffer::seeded(config.block_size as usize, index as u64)?;
        let checksum = config.consistency_check.then(|| buffer.checksum());

        Ok(Self {
            index,
            target,
            buffer,
            checksum,
            created: false,
            records: Default::default(),
        })
    }

    pub fn record(&self, phase: Phase) -> &PhaseRecord {
        &self.records[phase.index()]
    }
}
