//! Descriptor IO engine
//!
//! Blocking `pread`/`pwrite` at explicit offsets. Each operation is a single
//! syscall: a transfer that moves fewer bytes than one block is reported as a
//! short transfer instead of being retried.

use super::{BlockBuffer, IoEngine, OperationType, Segment};
use crate::config::workload::AccessPattern;
use crate::distribution::Region;
use crate::error::BenchError;
use crate::target::OpenTarget;
use crate::Result;
use std::io;
use std::os::unix::io::RawFd;
use std::path::Path;

/// Read exactly `buf.len()` bytes at `offset` with one `pread`
pub(crate) fn pread_exact(fd: RawFd, buf: &mut [u8], offset: u64, path: &Path) -> Result<()> {
    // SAFETY: buf is a valid, exclusively borrowed slice of buf.len() bytes.
    let result = unsafe {
        libc::pread(
            fd,
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            offset as libc::off_t,
        )
    };
    check_transfer(result, OperationType::Read, buf.len(), offset, path)
}

/// Write exactly `buf.len()` bytes at `offset` with one `pwrite`
pub(crate) fn pwrite_exact(fd: RawFd, buf: &[u8], offset: u64, path: &Path) -> Result<()> {
    // SAFETY: buf is a valid slice of buf.len() bytes that pwrite only reads.
    let result = unsafe {
        libc::pwrite(
            fd,
            buf.as_ptr() as *const libc::c_void,
            buf.len(),
            offset as libc::off_t,
        )
    };
    check_transfer(result, OperationType::Write, buf.len(), offset, path)
}

fn check_transfer(result: isize, op: OperationType, expected: usize, offset: u64, path: &Path) -> Result<()> {
    if result < 0 {
        let action = match op {
            OperationType::Read => "pread",
            OperationType::Write => "pwrite",
        };
        return Err(BenchError::io(action, path, io::Error::last_os_error()));
    }
    let actual = result as usize;
    if actual != expected {
        return Err(BenchError::ShortTransfer {
            op,
            path: path.to_path_buf(),
            offset,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Positioned-IO engine over an open target
///
/// Offsets handed to `transfer` are absolute positions in the target.
pub struct DescriptorEngine {
    target: OpenTarget,
}

impl DescriptorEngine {
    pub fn new(target: OpenTarget) -> Self {
        Self { target }
    }
}

impl IoEngine for DescriptorEngine {
    fn plan(&self, _access: AccessPattern, ops: u64) -> Vec<Segment> {
        vec![Segment { index: 0, ops }]
    }

    fn prepare(&mut self, access: AccessPattern) {
        self.target.advise(access);
    }

    fn enter(&mut self, _segment: &Segment, _access: AccessPattern) -> Result<Region> {
        Ok(self.target.region())
    }

    #[inline]
    fn transfer(&mut self, op: OperationType, offset: u64, buffer: &mut BlockBuffer<'_>) -> Result<()> {
        let fd = self.target.fd();
        match op {
            OperationType::Read => {
                pread_exact(fd, buffer.data.as_mut_slice(), offset, self.target.path())?;
                buffer.verify(self.target.path(), offset)
            }
            OperationType::Write => {
                pwrite_exact(fd, buffer.data.as_slice(), offset, self.target.path())
            }
        }
    }

    fn leave(&mut self) -> Result<()> {
        Ok(())
    }

    fn finish(self) -> Result<()> {
        self.target.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{OpenFlags, TargetSpec};
    use crate::util::buffer::AlignedBuffer;
    use std::fs;
    use std::os::unix::io::AsRawFd;
    use tempfile::TempDir;

    fn open(dir: &TempDir, len: u64) -> (TargetSpec, OpenTarget) {
        let spec = TargetSpec { path: dir.path().join("d.dat"), base: 0, raw: false };
        let target = spec.open(OpenFlags::for_target(&spec, false, true), len).unwrap();
        (spec, target)
    }

    #[test]
    fn test_single_segment_plan() {
        let dir = TempDir::new().unwrap();
        let (_, target) = open(&dir, 16384);
        let engine = DescriptorEngine::new(target);
        assert_eq!(
            engine.plan(AccessPattern::Random, 100),
            vec![Segment { index: 0, ops: 100 }]
        );
    }

    #[test]
    fn test_write_then_verified_read() {
        let dir = TempDir::new().unwrap();
        let (spec, target) = open(&dir, 16384);
        let mut engine = DescriptorEngine::new(target);

        let mut data = AlignedBuffer::seeded(4096, 11).unwrap();
        let checksum = data.checksum();
        let expected = data.as_slice().to_vec();
        let mut buffer = BlockBuffer::new(&mut data, Some(checksum));

        engine.transfer(OperationType::Write, 8192, &mut buffer).unwrap();
        engine.transfer(OperationType::Read, 8192, &mut buffer).unwrap();
        engine.finish().unwrap();

        let contents = fs::read(&spec.path).unwrap();
        assert_eq!(&contents[8192..12288], expected.as_slice());
    }

    #[test]
    fn test_read_of_unwritten_block_fails_verification() {
        let dir = TempDir::new().unwrap();
        let (_, target) = open(&dir, 8192);
        let mut engine = DescriptorEngine::new(target);

        let mut data = AlignedBuffer::seeded(4096, 11).unwrap();
        let checksum = data.checksum();
        let mut buffer = BlockBuffer::new(&mut data, Some(checksum));

        let err = engine.transfer(OperationType::Read, 4096, &mut buffer).unwrap_err();
        assert!(matches!(err, BenchError::Checksum { offset: 4096, .. }));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_short_read_past_end() {
        let dir = TempDir::new().unwrap();
        let (_, target) = open(&dir, 4096);
        let path = target.path().to_path_buf();

        let mut buf = vec![0u8; 4096];
        let err = pread_exact(target.file().as_raw_fd(), &mut buf, 2048, &path).unwrap_err();
        match err {
            BenchError::ShortTransfer { op, expected, actual, .. } => {
                assert_eq!(op, OperationType::Read);
                assert_eq!(expected, 4096);
                assert_eq!(actual, 2048);
            }
            other => panic!("expected short transfer, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_descriptor() {
        let mut buf = vec![0u8; 512];
        let err = pread_exact(-1, &mut buf, 0, Path::new("/none")).unwrap_err();
        assert!(matches!(err, BenchError::Io { action: "pread", .. }));
    }
}
