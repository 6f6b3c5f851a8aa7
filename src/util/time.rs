//! Phase timing
//!
//! A `Timing` captures wall-clock and CPU time at the start and the end of an
//! interval. Wall-clock time comes from the system clock, CPU time from
//! `getrusage` for the scope the timer was created with. All readings are kept
//! in microseconds and elapsed values never go negative.

use super::resource::{CpuScope, CpuSnapshot};
use crate::error::{BenchError, ClockSite};
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock and CPU readings bracketing one interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    scope: CpuScope,
    start_wall_us: u64,
    stop_wall_us: u64,
    start_user_us: u64,
    stop_user_us: u64,
    start_sys_us: u64,
    stop_sys_us: u64,
}

impl Timing {
    /// Timer charging CPU time to `scope`
    pub fn new(scope: CpuScope) -> Self {
        Self {
            scope,
            start_wall_us: 0,
            stop_wall_us: 0,
            start_user_us: 0,
            stop_user_us: 0,
            start_sys_us: 0,
            stop_sys_us: 0,
        }
    }

    /// Timer for coordinator-level intervals (whole process)
    pub fn process() -> Self {
        Self::new(CpuScope::Process)
    }

    /// Timer for worker-level intervals (calling thread)
    pub fn thread() -> Self {
        Self::new(CpuScope::Thread)
    }

    pub fn start(&mut self) -> crate::Result<()> {
        self.start_wall_us = wall_clock_us().map_err(|source| BenchError::Clock {
            site: ClockSite::StartWallClock,
            source,
        })?;
        let cpu = CpuSnapshot::take(self.scope).map_err(|source| BenchError::Clock {
            site: ClockSite::StartResourceUsage,
            source,
        })?;
        self.start_user_us = cpu.user_us;
        self.start_sys_us = cpu.system_us;
        Ok(())
    }

    pub fn stop(&mut self) -> crate::Result<()> {
        self.stop_wall_us = wall_clock_us().map_err(|source| BenchError::Clock {
            site: ClockSite::StopWallClock,
            source,
        })?;
        let cpu = CpuSnapshot::take(self.scope).map_err(|source| BenchError::Clock {
            site: ClockSite::StopResourceUsage,
            source,
        })?;
        self.stop_user_us = cpu.user_us;
        self.stop_sys_us = cpu.system_us;
        Ok(())
    }

    /// Elapsed wall-clock seconds
    pub fn real(&self) -> f64 {
        elapsed_secs(self.start_wall_us, self.stop_wall_us)
    }

    /// Elapsed user-mode CPU seconds
    pub fn user(&self) -> f64 {
        elapsed_secs(self.start_user_us, self.stop_user_us)
    }

    /// Elapsed kernel-mode CPU seconds
    pub fn sys(&self) -> f64 {
        elapsed_secs(self.start_sys_us, self.stop_sys_us)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::process()
    }
}

fn elapsed_secs(start_us: u64, stop_us: u64) -> f64 {
    stop_us.saturating_sub(start_us) as f64 / 1_000_000.0
}

/// Microseconds since the Unix epoch
pub fn wall_clock_us() -> io::Result<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(now.as_secs().saturating_mul(1_000_000) + u64::from(now.subsec_micros()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_unstarted_timer_reads_zero() {
        let timing = Timing::process();
        assert_eq!(timing.real(), 0.0);
        assert_eq!(timing.user(), 0.0);
        assert_eq!(timing.sys(), 0.0);
    }

    #[test]
    fn test_measures_sleep() {
        let mut timing = Timing::thread();
        timing.start().unwrap();
        thread::sleep(Duration::from_millis(20));
        timing.stop().unwrap();

        assert!(timing.real() >= 0.015);
        assert!(timing.real() < 5.0);
        assert!(timing.user() >= 0.0);
    }

    #[test]
    fn test_stop_before_start_saturates() {
        let mut timing = Timing::process();
        timing.stop().unwrap();
        timing.start_wall_us = timing.stop_wall_us + 1_000;
        assert_eq!(timing.real(), 0.0);
    }
}
