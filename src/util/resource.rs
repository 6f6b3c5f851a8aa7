//! Resource utilization tracking
//!
//! CPU time snapshots taken with `getrusage`, either for the whole process or
//! for the calling thread only.

use std::io;

/// Whose CPU time a snapshot covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuScope {
    /// Every thread in the process
    Process,
    /// The calling thread (falls back to the process where unsupported)
    Thread,
}

impl CpuScope {
    fn who(self) -> libc::c_int {
        match self {
            CpuScope::Process => libc::RUSAGE_SELF,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            CpuScope::Thread => libc::RUSAGE_THREAD,
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            CpuScope::Thread => libc::RUSAGE_SELF,
        }
    }
}

/// Cumulative CPU time at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuSnapshot {
    /// CPU time in user mode (microseconds)
    pub user_us: u64,
    /// CPU time in kernel mode (microseconds)
    pub system_us: u64,
}

impl CpuSnapshot {
    /// Take a snapshot of CPU usage for `scope`
    pub fn take(scope: CpuScope) -> io::Result<Self> {
        // SAFETY: rusage is plain-old-data; all-zero bytes are a valid value.
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        // SAFETY: getrusage only writes into the struct we own on the stack.
        let ret = unsafe { libc::getrusage(scope.who(), &mut usage) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            user_us: timeval_us(&usage.ru_utime),
            system_us: timeval_us(&usage.ru_stime),
        })
    }
}

fn timeval_us(tv: &libc::timeval) -> u64 {
    (tv.tv_sec.max(0) as u64)
        .saturating_mul(1_000_000)
        .saturating_add(tv.tv_usec.max(0) as u64)
}

/// Number of CPUs available to this process
pub fn cpu_count() -> usize {
    num_cpus::get()
}
