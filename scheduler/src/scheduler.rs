use std::error::Error;
use std::fmt::{self, Display};

use crate::{Process, ProcessState};

/// The PID of a process.
///
/// PIDs are assigned by the caller and must be unique within a workload.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Pid(usize);

impl Pid {
    pub fn new(pid: usize) -> Pid {
        Pid(pid)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl PartialEq<usize> for Pid {
    fn eq(&self, other: &usize) -> bool {
        self.0 == *other
    }
}

impl Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the CPU did during one simulated time unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimelineEntry {
    /// The process with PID `pid` held the CPU.
    Run(Pid),

    /// No process was ready to run.
    Idle,
}

impl TimelineEntry {
    pub fn pid(&self) -> Option<Pid> {
        match self {
            TimelineEntry::Run(pid) => Some(*pid),
            TimelineEntry::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TimelineEntry::Idle)
    }
}

impl Display for TimelineEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimelineEntry::Run(pid) => write!(f, "P{}", pid),
            TimelineEntry::Idle => write!(f, "Idle"),
        }
    }
}

/// The reasons a scheduler refuses to run, or aborts a run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The workload contains no processes.
    EmptyWorkload,

    /// Two processes in the workload share this PID.
    DuplicatePid(Pid),

    /// The process with this PID does not need any CPU time.
    ZeroBurst(Pid),

    /// A scheduler was configured with an unusable value.
    InvalidConfig(&'static str),

    /// The engine tried to move a process out of a state it cannot leave
    /// that way, e.g. selecting a finished process or queueing a process
    /// twice. This is an internal fault, never a property of the input.
    Inconsistent {
        pid: Pid,
        state: ProcessState,
    },
}

impl Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::EmptyWorkload => write!(f, "the workload has no processes"),
            SchedulerError::DuplicatePid(pid) => {
                write!(f, "PID {} appears more than once in the workload", pid)
            }
            SchedulerError::ZeroBurst(pid) => {
                write!(f, "process {} has a burst time of 0", pid)
            }
            SchedulerError::InvalidConfig(reason) => {
                write!(f, "invalid scheduler configuration: {}", reason)
            }
            SchedulerError::Inconsistent { pid, state } => {
                write!(f, "internal fault: process {} moved while {}", pid, state)
            }
        }
    }
}

impl Error for SchedulerError {}

/// The trait that any scheduling policy has to implement.
pub trait Scheduler: Send {
    /// Short name of the policy, used to label reports.
    fn name(&self) -> &'static str;

    /// Simulates the policy over `processes` and returns the timeline,
    /// one entry per time unit from 0 up to the makespan.
    ///
    /// The processes are updated in place: when this returns `Ok`, every
    /// process is [`ProcessState::Finished`] and has its metrics set. The
    /// order of the slice is not changed.
    fn run(&mut self, processes: &mut [Process]) -> Result<Vec<TimelineEntry>, SchedulerError>;

    /// The number of context switches counted during the last run.
    fn context_switches(&self) -> usize;
}
