//! Workload definition structures

use crate::engine::OperationType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access pattern type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccessPattern {
    Sequential,
    Random,
}

/// One of the four benchmark phases
///
/// Phases always run in index order: write, random write, read, random read.
/// The read phases rely on the data left behind by the write phases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Write,
    RandomWrite,
    Read,
    RandomRead,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 4] = [Phase::Write, Phase::RandomWrite, Phase::Read, Phase::RandomRead];

    /// Stable index (0-3), as used by `--skip`
    pub fn index(self) -> usize {
        match self {
            Phase::Write => 0,
            Phase::RandomWrite => 1,
            Phase::Read => 2,
            Phase::RandomRead => 3,
        }
    }

    /// Phase for a `--skip` index
    pub fn from_index(index: usize) -> Option<Phase> {
        Phase::ALL.get(index).copied()
    }

    /// Whether this phase reads or writes
    pub fn operation(self) -> OperationType {
        match self {
            Phase::Write | Phase::RandomWrite => OperationType::Write,
            Phase::Read | Phase::RandomRead => OperationType::Read,
        }
    }

    /// Whether offsets are sequential or random
    pub fn access(self) -> AccessPattern {
        match self {
            Phase::Write | Phase::Read => AccessPattern::Sequential,
            Phase::RandomWrite | Phase::RandomRead => AccessPattern::Random,
        }
    }

    /// Short key used by terse output
    pub fn key(self) -> &'static str {
        match self {
            Phase::Write => "write",
            Phase::RandomWrite => "rwrite",
            Phase::Read => "read",
            Phase::RandomRead => "rread",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Write => write!(f, "Write"),
            Phase::RandomWrite => write!(f, "Random Write"),
            Phase::Read => write!(f, "Read"),
            Phase::RandomRead => write!(f, "Random Read"),
        }
    }
}

/// Set of enabled phases
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseSet {
    enabled: [bool; 4],
}

impl PhaseSet {
    /// Every phase enabled
    pub fn all() -> Self {
        Self { enabled: [true; 4] }
    }

    /// No phase enabled
    pub fn none() -> Self {
        Self { enabled: [false; 4] }
    }

    /// Build a set from explicit phases
    pub fn only(phases: &[Phase]) -> Self {
        let mut set = Self::none();
        for &phase in phases {
            set.enable(phase);
        }
        set
    }

    pub fn enable(&mut self, phase: Phase) {
        self.enabled[phase.index()] = true;
    }

    pub fn skip(&mut self, phase: Phase) {
        self.enabled[phase.index()] = false;
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.enabled[phase.index()]
    }

    /// Enabled phases in execution order
    pub fn iter(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL.into_iter().filter(move |p| self.contains(*p))
    }

    /// First phase that will run, if any
    pub fn first(&self) -> Option<Phase> {
        self.iter().next()
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }
}

impl Default for PhaseSet {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_indices_round_trip() {
        for phase in Phase::ALL {
            assert_eq!(Phase::from_index(phase.index()), Some(phase));
        }
        assert_eq!(Phase::from_index(4), None);
    }

    #[test]
    fn test_phase_properties() {
        assert_eq!(Phase::Write.operation(), OperationType::Write);
        assert_eq!(Phase::RandomRead.operation(), OperationType::Read);
        assert_eq!(Phase::RandomWrite.access(), AccessPattern::Random);
        assert_eq!(Phase::Read.access(), AccessPattern::Sequential);
        assert_eq!(Phase::RandomWrite.key(), "rwrite");
        assert_eq!(Phase::RandomRead.to_string(), "Random Read");
    }

    #[test]
    fn test_phase_set_skip() {
        let mut set = PhaseSet::all();
        set.skip(Phase::Write);
        set.skip(Phase::Read);

        let phases: Vec<Phase> = set.iter().collect();
        assert_eq!(phases, vec![Phase::RandomWrite, Phase::RandomRead]);
        assert_eq!(set.first(), Some(Phase::RandomWrite));
        assert!(!set.is_empty());
    }

    #[test]
    fn test_phase_set_empty() {
        assert!(PhaseSet::none().is_empty());
        assert_eq!(PhaseSet::only(&[Phase::Read]).first(), Some(Phase::Read));
    }
}
