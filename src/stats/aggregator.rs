//! Statistics aggregation
//!
//! Folds per-worker phase records into per-phase totals and a run-wide latency
//! total, then turns them into the figures every report format prints.
//!
//! # Example
//!
//! ```
//! use iostorm::config::workload::Phase;
//! use iostorm::stats::{PhaseRecord, aggregator::{PhaseOutcome, RunTotals}};
//! use iostorm::util::time::Timing;
//!
//! let mut totals = RunTotals::new();
//!
//! let mut record = PhaseRecord::default();
//! record.blocks = 256;
//! record.latency.record(0.001);
//! totals.add_worker(Phase::Write, &record);
//! totals.add_worker(Phase::Write, &record);
//! totals.finish(Phase::Write, Timing::process(), PhaseOutcome::Completed);
//!
//! let report = totals.report(4096, 2);
//! assert_eq!(report.phase(Phase::Write).blocks, 512);
//! assert_eq!(report.phase(Phase::Write).megabytes, 2.0);
//! ```

use super::{Latency, LatencySummary, PhaseRecord};
use crate::config::workload::Phase;
use crate::config::MIB;
use crate::util::time::Timing;
use serde::{Deserialize, Serialize};

/// How a phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOutcome {
    /// Every worker ran to completion
    Completed,
    /// Workers failed to reach the start barrier in time; nothing ran
    Skipped,
    /// Disabled by configuration
    NotRun,
}

/// Aggregate of every worker for one phase
#[derive(Debug, Clone, Copy)]
pub struct PhaseTotals {
    /// Coordinator timer spanning barrier release to the last join
    pub timing: Timing,
    /// Sum of worker user-mode CPU seconds
    pub user_secs: f64,
    /// Sum of worker kernel-mode CPU seconds
    pub sys_secs: f64,
    pub blocks: u64,
    pub latency: Latency,
    pub outcome: PhaseOutcome,
}

impl Default for PhaseTotals {
    fn default() -> Self {
        Self {
            timing: Timing::process(),
            user_secs: 0.0,
            sys_secs: 0.0,
            blocks: 0,
            latency: Latency::default(),
            outcome: PhaseOutcome::NotRun,
        }
    }
}

/// Totals for a whole run
#[derive(Debug, Clone, Default)]
pub struct RunTotals {
    phases: [PhaseTotals; 4],
    total: Latency,
}

impl RunTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one worker's record for `phase` into the totals
    pub fn add_worker(&mut self, phase: Phase, record: &PhaseRecord) {
        let totals = &mut self.phases[phase.index()];
        totals.user_secs += record.timing.user();
        totals.sys_secs += record.timing.sys();
        totals.blocks += record.blocks;
        totals.latency.merge(&record.latency);
        self.total.merge(&record.latency);
    }

    /// Record the coordinator timer and outcome for `phase`
    pub fn finish(&mut self, phase: Phase, timing: Timing, outcome: PhaseOutcome) {
        let totals = &mut self.phases[phase.index()];
        totals.timing = timing;
        totals.outcome = outcome;
    }

    pub fn phase(&self, phase: Phase) -> &PhaseTotals {
        &self.phases[phase.index()]
    }

    /// Latency merged across all phases
    pub fn total_latency(&self) -> &Latency {
        &self.total
    }

    /// Final figures for reporting
    pub fn report(&self, block_size: u64, threads: usize) -> RunReport {
        let phases = Phase::ALL
            .iter()
            .map(|&phase| PhaseReport::new(phase, self.phase(phase), block_size))
            .collect();

        RunReport {
            block_size,
            threads,
            phases,
            total_latency: self.total.finalize(),
        }
    }
}

/// Reported figures for one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub outcome: PhaseOutcome,
    pub blocks: u64,
    /// Mebibytes transferred
    pub megabytes: f64,
    pub real_secs: f64,
    pub user_secs: f64,
    pub sys_secs: f64,
    /// MiB per wall-clock second
    pub rate_mb_per_sec: f64,
    /// Summed worker user CPU as a percentage of wall-clock time
    pub user_pct: f64,
    /// Summed worker system CPU as a percentage of wall-clock time
    pub sys_pct: f64,
    pub latency: LatencySummary,
}

impl PhaseReport {
    fn new(phase: Phase, totals: &PhaseTotals, block_size: u64) -> Self {
        let megabytes = (totals.blocks as f64 * block_size as f64) / MIB as f64;
        let real_secs = totals.timing.real();
        let per_sec = |value: f64| if real_secs > 0.0 { value / real_secs } else { 0.0 };

        Self {
            phase,
            outcome: totals.outcome,
            blocks: totals.blocks,
            megabytes,
            real_secs,
            user_secs: totals.user_secs,
            sys_secs: totals.sys_secs,
            rate_mb_per_sec: per_sec(megabytes),
            user_pct: per_sec(totals.user_secs) * 100.0,
            sys_pct: per_sec(totals.sys_secs) * 100.0,
            latency: totals.latency.finalize(),
        }
    }
}

/// Everything the reporters print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub block_size: u64,
    pub threads: usize,
    /// One entry per phase, in execution order
    pub phases: Vec<PhaseReport>,
    pub total_latency: LatencySummary,
}

impl RunReport {
    pub fn phase(&self, phase: Phase) -> &PhaseReport {
        &self.phases[phase.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(blocks: u64, samples: &[f64]) -> PhaseRecord {
        let mut record = PhaseRecord::default();
        record.blocks = blocks;
        for &s in samples {
            record.latency.record(s);
        }
        record
    }

    #[test]
    fn test_phase_totals_sum_workers() {
        let mut totals = RunTotals::new();
        totals.add_worker(Phase::Read, &record(100, &[0.001, 0.002]));
        totals.add_worker(Phase::Read, &record(50, &[3.0]));
        totals.add_worker(Phase::RandomRead, &record(10, &[11.0]));

        let read = totals.phase(Phase::Read);
        assert_eq!(read.blocks, 150);
        assert_eq!(read.latency.count(), 3);
        assert_eq!(read.latency.count_short(), 1);

        let total = totals.total_latency();
        assert_eq!(total.count(), 4);
        assert_eq!(total.count_long(), 1);
        assert_eq!(total.max(), 11.0);
    }

    #[test]
    fn test_unrun_phases_report_zero() {
        let report = RunTotals::new().report(4096, 4);
        assert_eq!(report.phases.len(), 4);
        for phase in &report.phases {
            assert_eq!(phase.outcome, PhaseOutcome::NotRun);
            assert_eq!(phase.blocks, 0);
            assert_eq!(phase.rate_mb_per_sec, 0.0);
            assert_eq!(phase.user_pct, 0.0);
            assert_eq!(phase.latency, LatencySummary::default());
        }
    }

    #[test]
    fn test_megabytes_from_blocks() {
        let mut totals = RunTotals::new();
        totals.add_worker(Phase::Write, &record(2560, &[]));
        totals.finish(Phase::Write, Timing::process(), PhaseOutcome::Completed);

        let report = totals.report(4096, 1);
        let write = report.phase(Phase::Write);
        assert_eq!(write.megabytes, 10.0);
        assert_eq!(write.outcome, PhaseOutcome::Completed);
        // An unstarted timer has zero elapsed time, so no rate is derived
        assert_eq!(write.rate_mb_per_sec, 0.0);
    }

    #[test]
    fn test_report_serializes() {
        let report = RunTotals::new().report(512, 2);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"random_write\""));
        assert!(json.contains("\"not_run\""));
    }
}
