use std::fmt::Display;

use crate::{Pid, SchedulerError};

/// The state of a process during a simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// The process has not arrived yet.
    Pending,

    /// The process waits in the queue with rank `queue`.
    Ready { queue: usize },

    /// The process holds the CPU, drawn from the queue with rank `queue`.
    Running { queue: usize },

    /// The process has used its whole burst.
    Finished,
}

impl Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::Pending => write!(f, "PENDING"),
            ProcessState::Ready { queue } => write!(f, "READY Q{}", queue),
            ProcessState::Running { queue } => write!(f, "RUNNING Q{}", queue),
            ProcessState::Finished => write!(f, "FINISHED"),
        }
    }
}

/// Timing metrics of a finished process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Metrics {
    /// `finish_time - arrival`
    pub turnaround: usize,

    /// `turnaround - burst`
    pub waiting: usize,

    /// `start_time - arrival`
    pub response: usize,
}

/// A simulated workload unit: a pure CPU burst.
#[derive(Clone, Debug, PartialEq)]
pub struct Process {
    pid: Pid,
    arrival: usize,
    burst: usize,
    priority: usize,
    remaining: usize,
    start_time: Option<usize>,
    finish_time: Option<usize>,
    metrics: Option<Metrics>,
    state: ProcessState,
}

impl Process {
    /// Creates a process that becomes eligible at `arrival` and needs
    /// `burst` units of CPU time. Lower `priority` values are more
    /// privileged.
    pub fn new(pid: usize, arrival: usize, burst: usize, priority: usize) -> Self {
        Process {
            pid: Pid::new(pid),
            arrival,
            burst,
            priority,
            remaining: burst,
            start_time: None,
            finish_time: None,
            metrics: None,
            state: ProcessState::Pending,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn arrival(&self) -> usize {
        self.arrival
    }

    pub fn burst(&self) -> usize {
        self.burst
    }

    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn start_time(&self) -> Option<usize> {
        self.start_time
    }

    pub fn finish_time(&self) -> Option<usize> {
        self.finish_time
    }

    /// Returns the metrics, available once the process has finished.
    pub fn metrics(&self) -> Option<Metrics> {
        self.metrics
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == ProcessState::Finished
    }

    /// Clears everything a previous run left behind.
    pub(crate) fn reset(&mut self) {
        self.remaining = self.burst;
        self.start_time = None;
        self.finish_time = None;
        self.metrics = None;
        self.state = ProcessState::Pending;
    }

    /// Places the process in the queue with rank `queue`.
    ///
    /// Only pending or running processes can be queued; a process that is
    /// already waiting somewhere would end up in two queues.
    pub(crate) fn enqueue(&mut self, queue: usize) -> Result<(), SchedulerError> {
        match self.state {
            ProcessState::Pending | ProcessState::Running { .. } => {
                self.state = ProcessState::Ready { queue };
                Ok(())
            }
            state => Err(self.inconsistent(state)),
        }
    }

    /// Moves a waiting process to another queue (aging).
    pub(crate) fn requeue(&mut self, queue: usize) -> Result<(), SchedulerError> {
        match self.state {
            ProcessState::Ready { .. } => {
                self.state = ProcessState::Ready { queue };
                Ok(())
            }
            state => Err(self.inconsistent(state)),
        }
    }

    /// Gives the CPU to the process at `time`. The start time is stamped
    /// the first time this happens.
    pub(crate) fn dispatch(&mut self, queue: usize, time: usize) -> Result<(), SchedulerError> {
        match self.state {
            ProcessState::Ready { .. } => {
                self.state = ProcessState::Running { queue };
                if self.start_time.is_none() {
                    self.start_time = Some(time);
                }
                Ok(())
            }
            state => Err(self.inconsistent(state)),
        }
    }

    /// Runs the process for the time unit starting at `time`.
    ///
    /// Returns `true` if that unit completed the burst.
    pub(crate) fn execute(&mut self, time: usize) -> Result<bool, SchedulerError> {
        if !matches!(self.state, ProcessState::Running { .. }) || self.remaining == 0 {
            return Err(self.inconsistent(self.state));
        }

        self.remaining -= 1;
        if self.remaining > 0 {
            return Ok(false);
        }

        let finish_time = time + 1;
        // dispatch always stamps the start time before the first execute
        let start_time = self.start_time.unwrap_or(time);
        let turnaround = finish_time - self.arrival;
        self.finish_time = Some(finish_time);
        self.metrics = Some(Metrics {
            turnaround,
            waiting: turnaround - self.burst,
            response: start_time - self.arrival,
        });
        self.state = ProcessState::Finished;
        Ok(true)
    }

    fn inconsistent(&self, state: ProcessState) -> SchedulerError {
        SchedulerError::Inconsistent {
            pid: self.pid,
            state,
        }
    }
}

impl Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.pid)
    }
}
