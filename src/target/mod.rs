//! Target abstraction
//!
//! A target is where one worker's IO goes: either a scratch file inside one of
//! the configured directories, or a region of a raw block device.
//!
//! # Assignment
//!
//! Workers take the configured paths round-robin. In file mode worker `i`
//! gets `<dir>/.iostorm-<pid>.<i>.dat`. In raw mode workers sharing a device
//! get consecutive regions: each device keeps a cursor that advances by
//! `(offset + size)` MiB per worker, or by `size` MiB when no offset is set.
//!
//! # Lifecycle
//!
//! Targets are opened once per phase. Scratch files are created and truncated
//! the first time a worker touches them, sized to a whole number of blocks, and
//! removed by [`ScratchGuard`] when the run ends. Raw devices are never
//! created, truncated, resized or removed.

use crate::config::workload::AccessPattern;
use crate::config::{Config, MIB};
use crate::distribution::Region;
use crate::engine::sync::pwrite_exact;
use crate::error::BenchError;
use crate::util::buffer::AlignedBuffer;
use crate::Result;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of worker `index`'s scratch file for process `pid`
pub fn scratch_file_name(pid: u32, index: usize) -> String {
    format!(".iostorm-{}.{}.dat", pid, index)
}

/// Where one worker's IO goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub path: PathBuf,
    /// First byte of the worker's region (non-zero only on raw devices)
    pub base: u64,
    pub raw: bool,
}

/// Assign a target to every worker
pub fn assign_targets(config: &Config, pid: u32) -> Vec<TargetSpec> {
    if config.paths.is_empty() {
        return Vec::new();
    }

    if !config.raw_drives {
        return (0..config.threads)
            .map(|i| TargetSpec {
                path: config.paths[i % config.paths.len()].join(scratch_file_name(pid, i)),
                base: 0,
                raw: false,
            })
            .collect();
    }

    let stride_mb = if config.thread_offset_mb != 0 {
        config.thread_offset_mb + config.file_size_mb
    } else {
        config.file_size_mb
    };
    let first = if config.thread_offset_mb != 0 && config.offset_first_thread {
        config.thread_offset_mb * MIB
    } else {
        0
    };
    let mut cursors = vec![first; config.paths.len()];

    (0..config.threads)
        .map(|i| {
            let slot = i % config.paths.len();
            let base = cursors[slot];
            cursors[slot] += stride_mb * MIB;
            TargetSpec {
                path: config.paths[slot].clone(),
                base,
                raw: true,
            }
        })
        .collect()
}

/// Flags for opening a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Synchronous IO (O_SYNC)
    pub sync: bool,
    /// Create the target if it doesn't exist
    pub create: bool,
    /// Truncate the target to zero size on open
    pub truncate: bool,
}

impl OpenFlags {
    /// Flags for a target, given whether this is the worker's first touch
    pub fn for_target(target: &TargetSpec, sync: bool, first_touch: bool) -> Self {
        Self {
            sync,
            create: !target.raw,
            truncate: !target.raw && first_touch,
        }
    }
}

impl TargetSpec {
    /// Open the target read/write and size it to `len` bytes
    ///
    /// `len` must already be a whole number of blocks. Raw devices are not
    /// resized.
    pub fn open(&self, flags: OpenFlags, len: u64) -> Result<OpenTarget> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if flags.create {
            options.create(true).mode(0o600);
        }
        if flags.truncate {
            options.truncate(true);
        }
        if flags.sync {
            options.custom_flags(libc::O_SYNC);
        }

        let file = options
            .open(&self.path)
            .map_err(|e| BenchError::io("open", &self.path, e))?;

        if !self.raw {
            file.set_len(len)
                .map_err(|e| BenchError::io("resize", &self.path, e))?;
        }

        debug!(path = %self.path.display(), base = self.base, len, "opened target");
        Ok(OpenTarget {
            file,
            path: self.path.clone(),
            region: Region::new(self.base, len),
        })
    }
}

/// An open target and the region the worker owns within it
#[derive(Debug)]
pub struct OpenTarget {
    file: File,
    path: PathBuf,
    region: Region,
}

impl OpenTarget {
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte range of the target owned by this worker
    pub fn region(&self) -> Region {
        self.region
    }

    /// Advisory access-pattern hint for the whole region; failures are logged
    pub fn advise(&self, access: AccessPattern) {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            let advice = match access {
                AccessPattern::Sequential => libc::POSIX_FADV_SEQUENTIAL,
                AccessPattern::Random => libc::POSIX_FADV_RANDOM,
            };
            // SAFETY: posix_fadvise only reads its integer arguments.
            let rc = unsafe {
                libc::posix_fadvise(
                    self.fd(),
                    self.region.base as libc::off_t,
                    self.region.len as libc::off_t,
                    advice,
                )
            };
            if rc != 0 {
                warn!(
                    path = %self.path.display(),
                    error = %io::Error::from_raw_os_error(rc),
                    "posix_fadvise failed"
                );
            }
        }
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        debug!(?access, "no posix_fadvise on this platform");
    }

    /// Write `buffer` into every block of the region
    pub fn fill(&self, buffer: &AlignedBuffer) -> Result<()> {
        let block_size = buffer.len() as u64;
        for block in 0..self.region.blocks(block_size) {
            let offset = self.region.base + block * block_size;
            pwrite_exact(self.fd(), buffer.as_slice(), offset, &self.path)?;
        }
        Ok(())
    }

    /// fsync the target
    pub fn sync(&self) -> Result<()> {
        // SAFETY: fsync is a simple syscall that only requires a valid fd
        let rc = unsafe { libc::fsync(self.fd()) };
        if rc < 0 {
            return Err(BenchError::io("fsync", &self.path, io::Error::last_os_error()));
        }
        Ok(())
    }
}

/// Removes scratch files when dropped
#[derive(Debug, Default)]
pub struct ScratchGuard {
    paths: Vec<PathBuf>,
}

impl ScratchGuard {
    /// Guard the scratch files among `targets`; raw devices are left alone
    pub fn new(targets: &[TargetSpec]) -> Self {
        Self {
            paths: targets
                .iter()
                .filter(|t| !t.raw)
                .map(|t| t.path.clone())
                .collect(),
        }
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed scratch file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove scratch file"),
            }
        }
    }
}
