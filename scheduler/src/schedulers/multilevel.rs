//! State and operations shared by the multilevel queue policies.
//!
//! A [`MultilevelRun`] is created at the start of every
//! [`Scheduler::run`](crate::Scheduler::run) call and dropped at its end,
//! so no state leaks from one run into the next.

use std::collections::{HashSet, VecDeque};

use log::trace;

use crate::{Process, SchedulerError, TimelineEntry};

/// Checks that a workload can be simulated.
pub(crate) fn validate(processes: &[Process]) -> Result<(), SchedulerError> {
    if processes.is_empty() {
        return Err(SchedulerError::EmptyWorkload);
    }

    let mut pids = HashSet::with_capacity(processes.len());
    for process in processes {
        if !pids.insert(process.pid()) {
            return Err(SchedulerError::DuplicatePid(process.pid()));
        }
        if process.burst() == 0 {
            return Err(SchedulerError::ZeroBurst(process.pid()));
        }
    }
    Ok(())
}

/// Width of the priority band covered by each queue.
///
/// The range `0..=max_priority` is split into `num_queues` equal bands,
/// each at least one priority value wide.
pub(crate) fn priority_step(max_priority: usize, num_queues: usize) -> usize {
    (max_priority.saturating_add(1) / num_queues).max(1)
}

/// Rank of the queue that holds processes with `priority`.
///
/// Lower priority values land in more privileged queues. Everything past
/// the last band goes to the last queue.
pub(crate) fn assign_queue(priority: usize, priority_step: usize, num_queues: usize) -> usize {
    (0..num_queues.saturating_sub(1))
        .find(|&rank| priority < (rank + 1).saturating_mul(priority_step))
        .unwrap_or(num_queues - 1)
}

/// The outcome of a time unit in which a process held the CPU.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Tick {
    /// The process at this index finished its burst and left the CPU.
    Finished(usize),

    /// The process at this index still holds the CPU.
    Continued(usize),
}

/// The simulation state of one run over a set of processes.
///
/// Queues and the CPU slot hold indices into `processes`.
pub(crate) struct MultilevelRun<'a> {
    processes: &'a mut [Process],
    arrivals: Vec<usize>,
    cursor: usize,
    time: usize,
    queues: Vec<VecDeque<usize>>,
    current: Option<usize>,
    current_queue: usize,
    quantum_counter: usize,
    priority_step: usize,
    previous: Option<usize>,
    context_switches: usize,
    timeline: Vec<TimelineEntry>,
}

impl<'a> MultilevelRun<'a> {
    /// Validates the workload, clears any previous run from it and
    /// prepares `num_queues` empty queues.
    pub fn new(processes: &'a mut [Process], num_queues: usize) -> Result<Self, SchedulerError> {
        if num_queues == 0 {
            return Err(SchedulerError::InvalidConfig("at least one queue is required"));
        }
        validate(processes)?;

        for process in processes.iter_mut() {
            process.reset();
        }

        let max_priority = processes
            .iter()
            .map(|process| process.priority())
            .max()
            .unwrap_or(0);

        // sort_by_key is stable, processes arriving together keep their order
        let mut arrivals: Vec<usize> = (0..processes.len()).collect();
        arrivals.sort_by_key(|&index| processes[index].arrival());

        let total_burst = processes.iter().map(|process| process.burst()).sum();

        Ok(MultilevelRun {
            processes,
            arrivals,
            cursor: 0,
            time: 0,
            queues: vec![VecDeque::new(); num_queues],
            current: None,
            current_queue: 0,
            quantum_counter: 0,
            priority_step: priority_step(max_priority, num_queues),
            previous: None,
            context_switches: 0,
            timeline: Vec::with_capacity(total_burst),
        })
    }

    pub fn time(&self) -> usize {
        self.time
    }

    pub fn process(&self, index: usize) -> &Process {
        &self.processes[index]
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_queue(&self) -> usize {
        self.current_queue
    }

    pub fn quantum_counter(&self) -> usize {
        self.quantum_counter
    }

    pub fn context_switches(&self) -> usize {
        self.context_switches
    }

    #[cfg(test)]
    pub fn queue(&self, rank: usize) -> Vec<crate::Pid> {
        self.queues[rank]
            .iter()
            .map(|&index| self.processes[index].pid())
            .collect()
    }

    /// Rank of the queue the process at `index` is assigned to by its
    /// priority.
    pub fn assign_queue(&self, index: usize) -> usize {
        assign_queue(
            self.processes[index].priority(),
            self.priority_step,
            self.queues.len(),
        )
    }

    /// `true` while some process has not arrived, waits in a queue or
    /// holds the CPU.
    pub fn has_work(&self) -> bool {
        self.cursor < self.arrivals.len()
            || self.current.is_some()
            || self.queues.iter().any(|queue| !queue.is_empty())
    }

    /// Returns the next process whose arrival time has been reached.
    pub fn next_arrival(&mut self) -> Option<usize> {
        let index = *self.arrivals.get(self.cursor)?;
        if self.processes[index].arrival() > self.time {
            return None;
        }
        self.cursor += 1;
        Some(index)
    }

    /// Appends the process at `index` to the tail of queue `rank`.
    pub fn push_back(&mut self, index: usize, rank: usize) -> Result<(), SchedulerError> {
        self.processes[index].enqueue(rank)?;
        self.queues[rank].push_back(index);
        Ok(())
    }

    /// Takes the CPU away from the running process and puts it back at
    /// the front of the queue it came from.
    ///
    /// Returns the index of the preempted process.
    pub fn preempt(&mut self) -> Result<Option<usize>, SchedulerError> {
        let Some(index) = self.current.take() else {
            return Ok(None);
        };
        self.processes[index].enqueue(self.current_queue)?;
        self.queues[self.current_queue].push_front(index);
        Ok(Some(index))
    }

    /// Takes the CPU away from the running process and appends it to the
    /// tail of queue `rank`.
    pub fn expire(&mut self, rank: usize) -> Result<Option<usize>, SchedulerError> {
        let Some(index) = self.current.take() else {
            return Ok(None);
        };
        self.push_back(index, rank)?;
        Ok(Some(index))
    }

    /// Moves every process of queue `rank` that matches `promote` to the
    /// tail of queue `rank - 1`. The others stay in `rank`, in the same
    /// relative order.
    ///
    /// Returns the indices of the promoted processes.
    pub fn promote_where<F>(
        &mut self,
        rank: usize,
        mut promote: F,
    ) -> Result<Vec<usize>, SchedulerError>
    where
        F: FnMut(&Process) -> bool,
    {
        let mut promoted = Vec::new();
        if rank == 0 {
            return Ok(promoted);
        }

        for _ in 0..self.queues[rank].len() {
            let Some(index) = self.queues[rank].pop_front() else {
                break;
            };
            if promote(&self.processes[index]) {
                self.processes[index].requeue(rank - 1)?;
                self.queues[rank - 1].push_back(index);
                promoted.push(index);
            } else {
                self.queues[rank].push_back(index);
            }
        }
        Ok(promoted)
    }

    /// Gives the CPU to the head of the most privileged non-empty queue.
    ///
    /// Returns the index of the selected process, if any queue held one.
    pub fn select_next(&mut self) -> Result<Option<usize>, SchedulerError> {
        let Some(rank) = self.queues.iter().position(|queue| !queue.is_empty()) else {
            return Ok(None);
        };
        let Some(index) = self.queues[rank].pop_front() else {
            return Ok(None);
        };

        self.processes[index].dispatch(rank, self.time)?;
        self.current = Some(index);
        self.current_queue = rank;
        self.quantum_counter = 0;
        Ok(Some(index))
    }

    /// Simulates the current time unit: the running process executes for
    /// one unit, or the CPU idles if there is none.
    pub fn execute(&mut self) -> Result<Option<Tick>, SchedulerError> {
        let Some(index) = self.current else {
            trace!("t={} idle", self.time);
            self.timeline.push(TimelineEntry::Idle);
            self.previous = None;
            return Ok(None);
        };

        if self.previous.is_some_and(|previous| previous != index) {
            self.context_switches += 1;
        }
        self.previous = Some(index);

        let process = &mut self.processes[index];
        self.timeline.push(TimelineEntry::Run(process.pid()));
        self.quantum_counter += 1;
        let finished = process.execute(self.time)?;
        trace!(
            "t={} P{} from Q{} remaining={} quantum={}",
            self.time,
            process.pid(),
            self.current_queue,
            process.remaining(),
            self.quantum_counter
        );

        if finished {
            self.current = None;
            Ok(Some(Tick::Finished(index)))
        } else {
            Ok(Some(Tick::Continued(index)))
        }
    }

    /// Moves the clock to the next time unit.
    pub fn advance(&mut self) {
        self.time += 1;
    }

    pub fn into_timeline(self) -> Vec<TimelineEntry> {
        self.timeline
    }
}
