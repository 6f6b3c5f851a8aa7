//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! A `Config` is built once, validated, and then passed by reference to the
//! coordinator and every worker; nothing mutates it during a run.

pub mod cli;
pub mod toml;
pub mod validator;
pub mod workload;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use workload::*;

/// One mebibyte
pub const MIB: u64 = 1024 * 1024;

/// Default per-worker size in MiB
pub const DEFAULT_FILE_SIZE_MB: u64 = 10;
/// Default number of workers
pub const DEFAULT_THREADS: usize = 4;
/// Default random operations per worker
pub const DEFAULT_RANDOM_OPS: u64 = 1000;
/// Default block size in bytes
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;
/// Default barrier readiness timeout in seconds
pub const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 30;

/// Complete test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of concurrent workers
    pub threads: usize,
    /// Block size for every operation, in bytes
    pub block_size: u64,
    /// Per-worker target size in MiB
    pub file_size_mb: u64,
    /// Random operations per worker for the random phases
    pub random_ops: u64,
    /// Directories (or raw devices) assigned round-robin to workers
    pub paths: Vec<PathBuf>,
    /// Targets are raw block devices rather than directories
    pub raw_drives: bool,
    /// Open targets with O_SYNC and msync mapped writes
    pub sync_writes: bool,
    /// Use memory-mapped IO instead of pread/pwrite
    pub use_mmap: bool,
    /// Verify the CRC32 of every block read
    pub consistency_check: bool,
    /// Run the write phase one worker at a time
    pub sequential_writing: bool,
    /// Include the latency table in the report
    pub show_latency: bool,
    /// Emit the terse comma-separated report
    pub terse: bool,
    /// Offset in MiB between workers on a shared raw device
    pub thread_offset_mb: u64,
    /// Apply `thread_offset_mb` to the first worker too
    pub offset_first_thread: bool,
    /// Phases to run
    pub phases: PhaseSet,
    /// Seconds to wait for every worker to reach the start barrier
    pub readiness_timeout_secs: u64,
    /// Diagnostic verbosity (0-60)
    pub debug_level: u8,
    /// Optional JSON report destination
    pub json_output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            block_size: DEFAULT_BLOCK_SIZE,
            file_size_mb: DEFAULT_FILE_SIZE_MB,
            random_ops: DEFAULT_RANDOM_OPS,
            paths: vec![PathBuf::from(".")],
            raw_drives: false,
            sync_writes: false,
            use_mmap: false,
            consistency_check: false,
            sequential_writing: false,
            show_latency: true,
            terse: false,
            thread_offset_mb: 0,
            offset_first_thread: false,
            phases: PhaseSet::all(),
            readiness_timeout_secs: DEFAULT_READINESS_TIMEOUT_SECS,
            debug_level: 0,
            json_output: None,
        }
    }
}

impl Config {
    /// Per-worker target size in bytes
    pub fn file_size_bytes(&self) -> u64 {
        self.file_size_mb.saturating_mul(MIB)
    }

    /// Whole blocks per worker target
    pub fn blocks_per_worker(&self) -> u64 {
        if self.block_size == 0 {
            return 0;
        }
        self.file_size_bytes() / self.block_size
    }

    /// Bytes actually covered per worker (size truncated to whole blocks)
    pub fn usable_bytes(&self) -> u64 {
        self.blocks_per_worker() * self.block_size
    }

    /// Operations a worker performs in `phase`
    pub fn operations_for(&self, phase: Phase) -> u64 {
        match phase.access() {
            AccessPattern::Sequential => self.blocks_per_worker(),
            AccessPattern::Random => self.random_ops,
        }
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Workers:      {}", self.threads)?;
        writeln!(f, "Block size:   {} bytes", self.block_size)?;
        writeln!(f, "Size:         {} MiB per worker", self.file_size_mb)?;
        writeln!(f, "Random ops:   {} per worker", self.random_ops)?;
        let paths: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        writeln!(f, "Targets:      {}{}", paths.join(", "), if self.raw_drives { " (raw)" } else { "" })?;
        writeln!(f, "IO mode:      {}{}", if self.use_mmap { "mmap" } else { "pread/pwrite" },
                 if self.sync_writes { ", O_SYNC" } else { "" })?;
        let phases: Vec<String> = self.phases.iter().map(|p| p.to_string()).collect();
        write!(f, "Phases:       {}", phases.join(", "))
    }
}
