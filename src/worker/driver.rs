//! Generic phase driver
//!
//! All four phases run through [`run_phase`]. The phase only decides the
//! operation (read or write), the placement (sequential or random) and the
//! operation count; the engine decides how blocks move.
//!
//! A phase on one worker goes through these steps:
//!
//! 1. Open the target. The first touch of a scratch file creates and truncates
//!    it; later phases reopen it and see what earlier phases wrote.
//! 2. Size scratch files to a whole number of blocks. When the file was just
//!    created for a phase other than the sequential write and consistency
//!    checking is on, fill every block first so reads of blocks no phase has
//!    written still verify. This happens outside the timed window.
//! 3. Apply the access-pattern hint and start the thread-scoped timer.
//! 4. For every segment the engine plans: enter it, then per operation advance
//!    the offset, time the transfer and record its latency, then leave it.
//! 5. Flush and close the target, then stop the timer and add the operation
//!    count to the phase record.

use super::WorkerState;
use crate::config::workload::{AccessPattern, Phase};
use crate::config::Config;
use crate::distribution::random::seed_from_clock;
use crate::distribution::{placement_for, Placement};
use crate::engine::mmap::MappedEngine;
use crate::engine::sync::DescriptorEngine;
use crate::engine::{BlockBuffer, IoEngine, OperationType};
use crate::stats::PhaseRecord;
use crate::target::OpenFlags;
use crate::Result;
use std::time::Instant;
use tracing::{debug, trace};

/// Run `phase` for one worker, updating its phase record
pub fn run_phase(worker: &mut WorkerState, phase: Phase, config: &Config) -> Result<()> {
    let ops = config.operations_for(phase);
    let first_touch = !worker.created;
    let flags = OpenFlags::for_target(&worker.target, config.sync_writes, first_touch);

    let target = worker.target.open(flags, config.usable_bytes())?;
    worker.created = true;

    if first_touch && !worker.target.raw && worker.checksum.is_some() && phase != Phase::Write {
        debug!(worker = worker.index, "pre-filling target for verification");
        target.fill(&worker.buffer)?;
    }

    let mut placement = placement_for(phase.access(), seed_from_clock());
    let mut buffer = BlockBuffer::new(&mut worker.buffer, worker.checksum);
    let record = &mut worker.records[phase.index()];
    *record = PhaseRecord::default();

    let job = Job {
        op: phase.operation(),
        access: phase.access(),
        ops,
        block_size: config.block_size,
    };

    debug!(worker = worker.index, %phase, ops, "phase starting");
    if config.use_mmap {
        let engine = MappedEngine::new(target, config.block_size, config.sync_writes);
        drive(engine, placement.as_mut(), &job, &mut buffer, record)?;
    } else {
        let engine = DescriptorEngine::new(target);
        drive(engine, placement.as_mut(), &job, &mut buffer, record)?;
    }
    debug!(
        worker = worker.index,
        %phase,
        blocks = record.blocks,
        real = record.timing.real(),
        "phase finished"
    );
    Ok(())
}

/// What one phase asks of the driver loop
#[derive(Debug, Clone, Copy)]
struct Job {
    op: OperationType,
    access: AccessPattern,
    ops: u64,
    block_size: u64,
}

/// Run one job; the engine is consumed so the target is closed inside the
/// timed window
fn drive<E: IoEngine>(
    mut engine: E,
    placement: &mut dyn Placement,
    job: &Job,
    buffer: &mut BlockBuffer<'_>,
    record: &mut PhaseRecord,
) -> Result<()> {
    engine.prepare(job.access);
    record.timing.start()?;

    let mut done = 0;
    for segment in engine.plan(job.access, job.ops) {
        let region = engine.enter(&segment, job.access)?;
        trace!(segment = segment.index, ops = segment.ops, ?region, "segment");

        let mut offset = region.before_start(job.block_size);
        for _ in 0..segment.ops {
            offset = placement.next_offset(offset, &region, job.block_size);

            let started = Instant::now();
            engine.transfer(job.op, offset, buffer)?;
            record.latency.record_duration(started.elapsed());
        }
        done += segment.ops;

        engine.leave()?;
    }

    engine.finish()?;
    record.timing.stop()?;
    record.blocks += done;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::workload::PhaseSet;
    use crate::distribution::Region;
    use crate::engine::Segment;
    use crate::error::BenchError;
    use crate::target::TargetSpec;
    use crate::util::buffer::AlignedBuffer;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    const CLOSE_DELAY: Duration = Duration::from_millis(50);

    /// Engine that moves nothing and takes a while to close
    struct SlowCloseEngine;

    impl IoEngine for SlowCloseEngine {
        fn plan(&self, _access: AccessPattern, ops: u64) -> Vec<Segment> {
            vec![Segment { index: 0, ops }]
        }

        fn prepare(&mut self, _access: AccessPattern) {}

        fn enter(&mut self, _segment: &Segment, _access: AccessPattern) -> Result<Region> {
            Ok(Region::new(0, 16 * 4096))
        }

        fn transfer(&mut self, _op: OperationType, _offset: u64, _buffer: &mut BlockBuffer<'_>) -> Result<()> {
            Ok(())
        }

        fn leave(&mut self) -> Result<()> {
            Ok(())
        }

        fn finish(self) -> Result<()> {
            Ok(())
        }
    }

    impl Drop for SlowCloseEngine {
        fn drop(&mut self) {
            thread::sleep(CLOSE_DELAY);
        }
    }

    fn worker(dir: &TempDir, config: &Config) -> WorkerState {
        let target = TargetSpec { path: dir.path().join("w.dat"), base: 0, raw: false };
        WorkerState::new(0, target, config).unwrap()
    }

    fn config(block_size: u64, size_mb: u64, mmap: bool) -> Config {
        Config {
            threads: 1,
            block_size,
            file_size_mb: size_mb,
            random_ops: 64,
            consistency_check: true,
            use_mmap: mmap,
            ..Default::default()
        }
    }

    #[test]
    fn test_sequential_round_trip_verifies() {
        for (block_size, mmap) in [(4096, false), (512, false), (65536, false), (4096, true), (3000, true)] {
            let dir = TempDir::new().unwrap();
            let config = config(block_size, 1, mmap);
            let mut worker = worker(&dir, &config);

            run_phase(&mut worker, Phase::Write, &config).unwrap();
            run_phase(&mut worker, Phase::Read, &config).unwrap();

            let blocks = config.blocks_per_worker();
            assert_eq!(worker.record(Phase::Write).blocks, blocks);
            assert_eq!(worker.record(Phase::Read).blocks, blocks);
            assert_eq!(worker.record(Phase::Read).latency.count(), blocks);
            assert_eq!(
                fs::metadata(&worker.target.path).unwrap().len(),
                blocks * block_size
            );
        }
    }

    #[test]
    fn test_random_phases_run_random_ops() {
        for mmap in [false, true] {
            let dir = TempDir::new().unwrap();
            let config = config(4096, 1, mmap);
            let mut worker = worker(&dir, &config);

            run_phase(&mut worker, Phase::RandomWrite, &config).unwrap();
            run_phase(&mut worker, Phase::RandomRead, &config).unwrap();

            assert_eq!(worker.record(Phase::RandomWrite).blocks, 64);
            assert_eq!(worker.record(Phase::RandomRead).blocks, 64);
            assert_eq!(worker.record(Phase::RandomRead).latency.count(), 64);
        }
    }

    #[test]
    fn test_read_first_is_prefilled() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            phases: PhaseSet::only(&[Phase::Read]),
            ..config(4096, 1, false)
        };
        let mut worker = worker(&dir, &config);

        run_phase(&mut worker, Phase::Read, &config).unwrap();
        assert_eq!(worker.record(Phase::Read).blocks, 256);
    }

    #[test]
    fn test_unwritten_file_fails_verification() {
        let dir = TempDir::new().unwrap();
        let config = config(4096, 1, false);
        let mut worker = worker(&dir, &config);

        // A truncated scratch file holds zeros, which never match the buffer
        run_phase(&mut worker, Phase::Write, &config).unwrap();
        fs::write(&worker.target.path, vec![0u8; 1 << 20]).unwrap();

        let err = run_phase(&mut worker, Phase::Read, &config).unwrap_err();
        assert!(matches!(err, BenchError::Checksum { offset: 0, .. }));
    }

    #[test]
    fn test_later_phases_keep_data() {
        let dir = TempDir::new().unwrap();
        let config = Config { consistency_check: false, ..config(4096, 1, false) };
        let mut worker = worker(&dir, &config);

        run_phase(&mut worker, Phase::Write, &config).unwrap();
        run_phase(&mut worker, Phase::Read, &config).unwrap();

        let contents = fs::read(&worker.target.path).unwrap();
        assert_eq!(&contents[..4096], worker.buffer.as_slice());
        assert_eq!(&contents[contents.len() - 4096..], worker.buffer.as_slice());
    }

    #[test]
    fn test_close_is_inside_timed_window() {
        let mut data = AlignedBuffer::seeded(4096, 0).unwrap();
        let mut buffer = BlockBuffer::new(&mut data, None);
        let mut placement = placement_for(AccessPattern::Sequential, 1);
        let mut record = PhaseRecord::default();
        let job = Job {
            op: OperationType::Write,
            access: AccessPattern::Sequential,
            ops: 16,
            block_size: 4096,
        };

        drive(SlowCloseEngine, placement.as_mut(), &job, &mut buffer, &mut record).unwrap();

        assert_eq!(record.blocks, 16);
        assert!(record.timing.real() >= 0.04, "real = {}", record.timing.real());
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let config = config(4096, 1, false);
        let target = TargetSpec {
            path: "/nonexistent-iostorm-dir/w.dat".into(),
            base: 0,
            raw: false,
        };
        let mut worker = WorkerState::new(0, target, &config).unwrap();
        let err = run_phase(&mut worker, Phase::Write, &config).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
