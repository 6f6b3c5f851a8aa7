//! Configuration validation

use super::workload::AccessPattern;
use super::{Config, MIB};
use thiserror::Error;

/// Largest debug level accepted by `-D`
pub const MAX_DEBUG_LEVEL: u8 = 60;

/// Invalid configuration values, reported before any test runs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("number of threads must be at least 1")]
    NoThreads,

    #[error("block size must be at least 1 byte")]
    ZeroBlockSize,

    #[error("block size {block_size} does not fit in memory on this platform")]
    BlockSizeTooLarge { block_size: u64 },

    #[error("file size must be at least 1 MiB")]
    ZeroFileSize,

    #[error("file size of {size_mb} MiB is smaller than one {block_size}-byte block")]
    FileSmallerThanBlock { size_mb: u64, block_size: u64 },

    #[error("file size of {size_mb} MiB is too large")]
    FileTooLarge { size_mb: u64 },

    #[error("number of random operations must be at least 1")]
    NoRandomOps,

    #[error("at least one target path is required")]
    NoPaths,

    #[error("--skip takes a phase index between 0 and 3, got {index}")]
    BadPhaseIndex { index: usize },

    #[error("every phase is skipped, nothing to do")]
    NothingToRun,

    #[error("debug level must be between 0 and 60, got {level}")]
    BadDebugLevel { level: u8 },

    #[error("raw offset of {offset_mb} MiB is too large")]
    OffsetTooLarge { offset_mb: u64 },
}

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.threads == 0 {
        return Err(ConfigError::NoThreads);
    }

    validate_sizes(config)?;

    if config.random_ops == 0 && config.phases.iter().any(|p| p.access() == AccessPattern::Random) {
        return Err(ConfigError::NoRandomOps);
    }

    if config.paths.is_empty() {
        return Err(ConfigError::NoPaths);
    }

    if config.phases.is_empty() {
        return Err(ConfigError::NothingToRun);
    }

    if config.debug_level > MAX_DEBUG_LEVEL {
        return Err(ConfigError::BadDebugLevel { level: config.debug_level });
    }

    // Raw regions must be addressable for every worker on a shared device
    if config.raw_drives {
        let stride = config.thread_offset_mb.checked_add(config.file_size_mb);
        let span = stride
            .and_then(|s| s.checked_mul(config.threads as u64 + 1))
            .and_then(|mb| mb.checked_mul(MIB));
        if span.map_or(true, |bytes| bytes > i64::MAX as u64) {
            return Err(ConfigError::OffsetTooLarge { offset_mb: config.thread_offset_mb });
        }
    }

    Ok(())
}

/// Validate block and file sizes
fn validate_sizes(config: &Config) -> Result<(), ConfigError> {
    if config.block_size == 0 {
        return Err(ConfigError::ZeroBlockSize);
    }
    if usize::try_from(config.block_size).map_or(true, |b| b > isize::MAX as usize) {
        return Err(ConfigError::BlockSizeTooLarge { block_size: config.block_size });
    }

    if config.file_size_mb == 0 {
        return Err(ConfigError::ZeroFileSize);
    }

    // Offsets are handed to pread/pwrite as off_t
    let bytes = config
        .file_size_mb
        .checked_mul(MIB)
        .filter(|&b| b <= i64::MAX as u64)
        .ok_or(ConfigError::FileTooLarge { size_mb: config.file_size_mb })?;

    if bytes < config.block_size {
        return Err(ConfigError::FileSmallerThanBlock {
            size_mb: config.file_size_mb,
            block_size: config.block_size,
        });
    }

    Ok(())
}
