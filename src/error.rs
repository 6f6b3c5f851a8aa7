//! Run-time error taxonomy
//!
//! Every failure that can end a benchmark run is a `BenchError`. Each variant maps
//! to a distinct process exit status so scripts driving iostorm can tell an
//! allocation failure from a storage fault. Configuration problems are caught
//! before a run starts and exit with status 1.

use crate::engine::OperationType;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which clock query failed, and where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSite {
    /// Wall-clock read while starting a timer
    StartWallClock,
    /// Resource usage read while starting a timer
    StartResourceUsage,
    /// Wall-clock read while stopping a timer
    StopWallClock,
    /// Resource usage read while stopping a timer
    StopResourceUsage,
}

impl std::fmt::Display for ClockSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockSite::StartWallClock => write!(f, "wall clock at timer start"),
            ClockSite::StartResourceUsage => write!(f, "resource usage at timer start"),
            ClockSite::StopWallClock => write!(f, "wall clock at timer stop"),
            ClockSite::StopResourceUsage => write!(f, "resource usage at timer stop"),
        }
    }
}

/// Errors that abort a benchmark run
#[derive(Debug, Error)]
pub enum BenchError {
    /// Allocation of worker or coordination memory failed
    #[error("failed to allocate {what} ({bytes} bytes)")]
    Alloc { what: &'static str, bytes: usize },

    /// A worker thread could not be started
    #[error("failed to start worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },

    /// A clock or resource-usage query failed
    #[error("clock query failed ({site}): {source}")]
    Clock {
        site: ClockSite,
        #[source]
        source: io::Error,
    },

    /// A syscall on the target failed
    #[error("{action} failed on {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Fewer bytes were transferred than requested
    #[error(
        "tried to {op} {expected} bytes at offset {offset:#x} of {}, but only transferred {actual}",
        path.display()
    )]
    ShortTransfer {
        op: OperationType,
        path: PathBuf,
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// Data read back does not match the worker buffer
    #[error(
        "consistency check failed at offset {offset:#x} of {}: crc {actual:#010x}, expected {expected:#010x}",
        path.display()
    )]
    Checksum {
        path: PathBuf,
        offset: u64,
        expected: u32,
        actual: u32,
    },

    /// Writing a report artifact failed
    #[error("failed to write report to {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl BenchError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::Alloc { .. } => 2,
            BenchError::Spawn { .. } => 3,
            BenchError::Io { .. } | BenchError::ShortTransfer { .. } => 4,
            BenchError::Checksum { .. } => 5,
            BenchError::Report { .. } => 6,
            BenchError::Clock { site, .. } => match site {
                ClockSite::StartWallClock => 10,
                ClockSite::StartResourceUsage => 11,
                ClockSite::StopWallClock => 12,
                ClockSite::StopResourceUsage => 13,
            },
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        BenchError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
