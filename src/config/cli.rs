//! CLI argument parsing using clap

use super::validator::{validate_config, ConfigError};
use super::workload::Phase;
use super::{toml, Config};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// iostorm - threaded file and block-device IO load generator
///
/// Runs sequential write, random write, sequential read and random read phases
/// across a set of worker threads and reports throughput, CPU usage and latency.
#[derive(Parser, Debug)]
#[command(name = "iostorm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Per-worker file size in MiB [default: 10]
    #[arg(short = 'f', long = "size", value_name = "MIB")]
    pub size: Option<u64>,

    /// Block size in bytes [default: 4096]
    #[arg(short = 'b', long, value_name = "BYTES")]
    pub block_size: Option<u64>,

    /// Target directory, or device with --raw (repeatable, assigned round-robin) [default: .]
    #[arg(short = 'd', long = "dir", value_name = "PATH")]
    pub dirs: Vec<PathBuf>,

    /// Number of worker threads [default: 4]
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Random operations per worker [default: 1000]
    #[arg(short = 'r', long)]
    pub random_ops: Option<u64>,

    /// Offset in MiB between workers sharing a raw device
    #[arg(short = 'o', long = "offset", value_name = "MIB")]
    pub offset: Option<u64>,

    /// Apply --offset to the first worker as well
    #[arg(short = 'O', long, overrides_with = "no_offset_first")]
    pub offset_first: bool,

    /// Do not apply --offset to the first worker
    #[arg(long, overrides_with = "offset_first")]
    pub no_offset_first: bool,

    /// Skip a phase: 0 write, 1 random write, 2 read, 3 random read (repeatable)
    #[arg(short = 'k', long = "skip", value_name = "PHASE")]
    pub skip: Vec<usize>,

    /// Hide the latency table
    #[arg(short = 'L', long, overrides_with = "show_latency")]
    pub hide_latency: bool,

    /// Show the latency table
    #[arg(long, overrides_with = "hide_latency")]
    pub show_latency: bool,

    /// Targets are raw block devices
    #[arg(short = 'R', long, overrides_with = "no_raw")]
    pub raw: bool,

    /// Targets are directories for scratch files
    #[arg(long, overrides_with = "raw")]
    pub no_raw: bool,

    /// Terse, machine-readable output
    #[arg(short = 'T', long, overrides_with = "no_terse")]
    pub terse: bool,

    /// Table output
    #[arg(long, overrides_with = "terse")]
    pub no_terse: bool,

    /// Use memory-mapped IO
    #[arg(short = 'M', long, overrides_with = "no_mmap")]
    pub mmap: bool,

    /// Use pread/pwrite
    #[arg(long, overrides_with = "mmap")]
    pub no_mmap: bool,

    /// Run the write phase one worker at a time
    #[arg(short = 'W', long, overrides_with = "no_sequential_write")]
    pub sequential_write: bool,

    /// Run the write phase on all workers at once
    #[arg(long, overrides_with = "sequential_write")]
    pub no_sequential_write: bool,

    /// Synchronous writes (O_SYNC, msync)
    #[arg(short = 'S', long, overrides_with = "no_sync")]
    pub sync: bool,

    /// Buffered writes
    #[arg(long, overrides_with = "sync")]
    pub no_sync: bool,

    /// Verify the checksum of every block read
    #[arg(short = 'c', long, overrides_with = "no_consistency_check")]
    pub consistency_check: bool,

    /// Skip checksum verification
    #[arg(long, overrides_with = "consistency_check")]
    pub no_consistency_check: bool,

    /// Debug level, 0-60
    #[arg(short = 'D', long, value_name = "LEVEL")]
    pub debug: Option<u8>,

    /// TOML configuration file; command-line flags override its values, and
    /// each on/off flag has a --no- form (--show-latency for -L) to switch a
    /// file setting off
    #[arg(long, value_name = "FILE", env = "IOSTORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write a JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Seconds to wait for all workers to reach the start barrier [default: 30]
    #[arg(long, value_name = "SECS")]
    pub readiness_timeout: Option<u64>,
}

impl Cli {
    /// Build the validated run configuration
    ///
    /// Starts from the TOML file when `--config` is given, otherwise from the
    /// defaults, then layers every flag given on the command line on top.
    pub fn build_config(&self) -> Result<Config> {
        let base = match &self.config {
            Some(path) => toml::parse_toml_file(path)?,
            None => Config::default(),
        };
        Ok(self.apply(base)?)
    }

    /// Layer command-line flags over `config` and validate the result
    pub fn apply(&self, mut config: Config) -> Result<Config, ConfigError> {
        if let Some(size) = self.size {
            config.file_size_mb = size;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if !self.dirs.is_empty() {
            config.paths = self.dirs.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(ops) = self.random_ops {
            config.random_ops = ops;
        }
        if let Some(offset) = self.offset {
            config.thread_offset_mb = offset;
        }
        if let Some(level) = self.debug {
            config.debug_level = level;
        }
        if let Some(secs) = self.readiness_timeout {
            config.readiness_timeout_secs = secs;
        }
        if let Some(json) = &self.json {
            config.json_output = Some(json.clone());
        }

        switch(&mut config.offset_first_thread, self.offset_first, self.no_offset_first);
        switch(&mut config.raw_drives, self.raw, self.no_raw);
        switch(&mut config.terse, self.terse, self.no_terse);
        switch(&mut config.use_mmap, self.mmap, self.no_mmap);
        switch(&mut config.sequential_writing, self.sequential_write, self.no_sequential_write);
        switch(&mut config.sync_writes, self.sync, self.no_sync);
        switch(&mut config.consistency_check, self.consistency_check, self.no_consistency_check);
        switch(&mut config.show_latency, self.show_latency, self.hide_latency);

        for &index in &self.skip {
            let phase = Phase::from_index(index).ok_or(ConfigError::BadPhaseIndex { index })?;
            config.phases.skip(phase);
        }

        validate_config(&config)?;
        Ok(config)
    }
}

/// Set `value` from an on/off flag pair, leaving it alone when neither is given
fn switch(value: &mut bool, on: bool, off: bool) {
    if on {
        *value = true;
    } else if off {
        *value = false;
    }
}
