//! Start barrier with a readiness timeout
//!
//! Every worker thread marks its own readiness slot and then spins on a shared
//! start flag. The coordinator polls the slots until all workers are ready or
//! the timeout passes, then raises the start flag. If it gave up waiting it
//! raises the abort flag first, and workers that see it leave without running.
//!
//! No locks are involved: each slot has a single writer, and the start and
//! abort flags are written only by the coordinator.

use crossbeam::utils::Backoff;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Readiness slots plus the start and abort flags for one phase
#[derive(Debug)]
pub struct ReadinessBoard {
    ready: Vec<AtomicBool>,
    start: AtomicBool,
    aborted: AtomicBool,
}

impl ReadinessBoard {
    pub fn new(workers: usize) -> Self {
        Self {
            ready: (0..workers).map(|_| AtomicBool::new(false)).collect(),
            start: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
        }
    }

    /// Mark worker `index` ready and wait for the start flag
    ///
    /// Returns `true` when the phase should run, `false` when it was aborted.
    pub fn arrive_and_wait(&self, index: usize) -> bool {
        self.ready[index].store(true, Ordering::Release);

        let backoff = Backoff::new();
        while !self.start.load(Ordering::Acquire) {
            backoff.snooze();
        }
        !self.aborted.load(Ordering::Acquire)
    }

    /// Number of workers that have arrived
    pub fn ready_count(&self) -> usize {
        self.ready.iter().filter(|r| r.load(Ordering::Acquire)).count()
    }

    pub fn all_ready(&self) -> bool {
        self.ready_count() == self.ready.len()
    }

    /// Poll until every worker is ready or `timeout` elapses
    pub fn wait_ready(&self, timeout: Duration, poll: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.all_ready() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(poll.min(deadline - now));
        }
    }

    /// Let waiting workers run
    pub fn release(&self) {
        self.start.store(true, Ordering::Release);
    }

    /// Let waiting workers leave without running
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        self.start.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_ready_then_release() {
        let board = ReadinessBoard::new(3);
        let ran = thread::scope(|s| {
            let handles: Vec<_> = (0..3)
                .map(|i| {
                    let board = &board;
                    s.spawn(move || board.arrive_and_wait(i))
                })
                .collect();

            assert!(board.wait_ready(Duration::from_secs(10), Duration::from_millis(1)));
            board.release();
            handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });
        assert_eq!(ran, vec![true, true, true]);
    }

    #[test]
    fn test_timeout_then_abort() {
        let board = ReadinessBoard::new(2);
        let ran = thread::scope(|s| {
            let board = &board;
            let early = s.spawn(move || board.arrive_and_wait(0));

            // Worker 1 never arrives
            assert!(!board.wait_ready(Duration::from_millis(50), Duration::from_millis(5)));
            assert_eq!(board.ready_count(), 1);
            board.abort();
            early.join().unwrap()
        });
        assert!(!ran);

        // A late arrival after abort does not run either
        assert!(!board.arrive_and_wait(1));
    }

    #[test]
    fn test_zero_timeout_still_checks_once() {
        let board = ReadinessBoard::new(0);
        assert!(board.wait_ready(Duration::ZERO, Duration::from_millis(1)));
    }
}
