//! Coordinator module
//!
//! Runs the enabled phases in order, one OS thread per worker per phase, and
//! aggregates the workers' records into run totals.
//!
//! # Concurrent phases
//!
//! All workers are spawned into a thread scope, each borrowing its own
//! `WorkerState`. They meet at a [`ReadinessBoard`]; once every worker has
//! arrived the coordinator starts the phase timer, releases them and joins
//! them all before stopping the timer. If not every worker arrives within the
//! readiness timeout the phase is aborted: waiting workers leave without doing
//! IO, the phase is reported as skipped, and the run moves on to the next
//! phase.
//!
//! # Sequential hand-off
//!
//! With sequential writing enabled the write phase runs one worker at a time
//! inside a single phase timer.
//!
//! # Errors
//!
//! Worker errors do not stop the other workers of the phase. Every worker is
//! joined and the first error (in worker order) ends the run.

pub mod barrier;

use crate::config::workload::Phase;
use crate::config::Config;
use crate::error::BenchError;
use crate::stats::aggregator::{PhaseOutcome, RunTotals};
use crate::target::{assign_targets, ScratchGuard};
use crate::util::time::Timing;
use crate::worker::{driver, WorkerState};
use crate::Result;
use barrier::ReadinessBoard;
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Start-barrier tuning
#[derive(Debug, Clone)]
pub struct BarrierSettings {
    /// How long to wait for every worker to become ready
    pub readiness_timeout: Duration,
    /// How often the coordinator checks readiness
    pub poll_interval: Duration,
    /// Delay before workers of the given phase reach the barrier
    #[cfg(test)]
    launch_delay: Option<(Phase, Duration)>,
}

impl BarrierSettings {
    pub fn new(readiness_timeout: Duration) -> Self {
        Self {
            readiness_timeout,
            poll_interval: Duration::from_millis(10),
            #[cfg(test)]
            launch_delay: None,
        }
    }

    #[cfg(test)]
    fn delay_for(&self, phase: Phase) -> Option<Duration> {
        match self.launch_delay {
            Some((delayed, delay)) if delayed == phase => Some(delay),
            _ => None,
        }
    }
}

/// Drives a whole benchmark run
pub struct Coordinator<'a> {
    config: &'a Config,
    barrier: BarrierSettings,
}

impl<'a> Coordinator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            barrier: BarrierSettings::new(config.readiness_timeout()),
        }
    }

    pub fn with_barrier(config: &'a Config, barrier: BarrierSettings) -> Self {
        Self { config, barrier }
    }

    /// Run every enabled phase and return the aggregated totals
    ///
    /// Scratch files are removed before returning, whether the run succeeded
    /// or not.
    pub fn run(&self) -> Result<RunTotals> {
        let config = self.config;
        let targets = assign_targets(config, std::process::id());
        let _scratch = ScratchGuard::new(&targets);

        let mut workers = targets
            .into_iter()
            .enumerate()
            .map(|(index, target)| WorkerState::new(index, target, config))
            .collect::<Result<Vec<_>>>()?;

        let mut totals = RunTotals::new();
        for phase in config.phases.iter() {
            info!(%phase, workers = workers.len(), "phase starting");

            let (timing, outcome) = if phase == Phase::Write && config.sequential_writing {
                self.run_handoff(phase, &mut workers)?
            } else {
                self.run_concurrent(phase, &mut workers)?
            };

            if outcome == PhaseOutcome::Completed {
                for worker in &workers {
                    totals.add_worker(phase, worker.record(phase));
                }
            }
            totals.finish(phase, timing, outcome);

            info!(%phase, ?outcome, real = timing.real(), "phase finished");
        }

        Ok(totals)
    }

    /// Run `phase` on every worker at once behind the start barrier
    fn run_concurrent(&self, phase: Phase, workers: &mut [WorkerState]) -> Result<(Timing, PhaseOutcome)> {
        let config = self.config;
        let board = ReadinessBoard::new(workers.len());
        #[cfg(test)]
        let delay = self.barrier.delay_for(phase);
        let mut timing = Timing::process();

        let outcome = thread::scope(|s| -> Result<PhaseOutcome> {
            let mut handles = Vec::with_capacity(workers.len());

            for worker in workers.iter_mut() {
                let index = worker.index;
                let board = &board;
                let spawned = thread::Builder::new()
                    .name(format!("iostorm-{}", index))
                    .spawn_scoped(s, move || -> Result<()> {
                        #[cfg(test)]
                        {
                            if let Some(delay) = delay {
                                thread::sleep(delay);
                            }
                        }
                        if !board.arrive_and_wait(index) {
                            debug!(worker = index, "phase aborted before start");
                            return Ok(());
                        }
                        driver::run_phase(worker, phase, config)
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        board.abort();
                        join_all(handles)?;
                        return Err(BenchError::Spawn { worker: index, source });
                    }
                }
            }

            if !board.wait_ready(self.barrier.readiness_timeout, self.barrier.poll_interval) {
                warn!(
                    %phase,
                    ready = board.ready_count(),
                    workers = handles.len(),
                    timeout_secs = self.barrier.readiness_timeout.as_secs_f64(),
                    "workers not ready in time, skipping phase"
                );
                board.abort();
                join_all(handles)?;
                return Ok(PhaseOutcome::Skipped);
            }

            if let Err(e) = timing.start() {
                board.abort();
                join_all(handles)?;
                return Err(e);
            }
            debug!(%phase, "releasing workers");
            board.release();
            join_all(handles)?;
            timing.stop()?;
            Ok(PhaseOutcome::Completed)
        })?;

        Ok((timing, outcome))
    }

    /// Run `phase` one worker after another inside a single timer
    fn run_handoff(&self, phase: Phase, workers: &mut [WorkerState]) -> Result<(Timing, PhaseOutcome)> {
        let config = self.config;
        let mut timing = Timing::process();
        timing.start()?;

        for worker in workers.iter_mut() {
            let index = worker.index;
            debug!(worker = index, %phase, "hand-off");
            thread::scope(|s| {
                let handle = thread::Builder::new()
                    .name(format!("iostorm-{}", index))
                    .spawn_scoped(s, move || driver::run_phase(worker, phase, config))
                    .map_err(|source| BenchError::Spawn { worker: index, source })?;
                join_all(vec![handle])
            })?;
        }

        timing.stop()?;
        Ok((timing, PhaseOutcome::Completed))
    }
}

/// Join every handle, then return the first worker error
fn join_all(handles: Vec<ScopedJoinHandle<'_, Result<()>>>) -> Result<()> {
    let mut first_error = None;
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
