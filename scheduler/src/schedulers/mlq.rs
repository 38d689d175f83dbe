use log::{debug, info};

use super::multilevel::{MultilevelRun, Tick};
use crate::{Process, Scheduler, SchedulerError, TimelineEntry};

/// When an arriving process takes the CPU away from the running one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Preemption {
    /// The arriving process was assigned to a strictly more privileged
    /// queue than the one the running process was drawn from.
    #[default]
    QueueRank,

    /// The arriving process has a strictly lower priority value than the
    /// running process, even if both share a queue.
    PriorityValue,
}

/// How the time quantum grows with the queue rank.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum QuantumScaling {
    /// Every queue uses the base quantum.
    #[default]
    Fixed,

    /// Queue `r` uses `time_quantum * 2^r`, so the privileged queues get
    /// the shortest slices.
    Exponential,
}

/// The options of a [`Mlq`] scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MlqConfig {
    /// Base round robin quantum, must be positive.
    pub time_quantum: usize,

    /// Number of queues, at least one.
    pub num_queues: usize,

    pub preemption: Preemption,

    pub quantum_scaling: QuantumScaling,
}

impl Default for MlqConfig {
    fn default() -> Self {
        MlqConfig {
            time_quantum: 8,
            num_queues: 3,
            preemption: Preemption::default(),
            quantum_scaling: QuantumScaling::default(),
        }
    }
}

/// Static multilevel queue scheduler.
///
/// A process is bound to one queue for its whole life, chosen by its
/// priority. Queues are served in strict rank order and each queue is
/// round robin.
pub struct Mlq {
    config: MlqConfig,
    context_switches: usize,
}

impl Mlq {
    pub fn new(config: MlqConfig) -> Result<Self, SchedulerError> {
        if config.time_quantum == 0 {
            return Err(SchedulerError::InvalidConfig("time quantum must be positive"));
        }
        if config.num_queues == 0 {
            return Err(SchedulerError::InvalidConfig("at least one queue is required"));
        }
        Ok(Mlq::with_valid_config(config))
    }

    pub(crate) fn with_valid_config(config: MlqConfig) -> Self {
        Mlq {
            config,
            context_switches: 0,
        }
    }

    /// Time quantum of the queue with rank `rank`.
    pub fn quantum(&self, rank: usize) -> usize {
        match self.config.quantum_scaling {
            QuantumScaling::Fixed => self.config.time_quantum,
            QuantumScaling::Exponential => u32::try_from(rank)
                .ok()
                .and_then(|rank| 2usize.checked_pow(rank))
                .and_then(|factor| self.config.time_quantum.checked_mul(factor))
                .unwrap_or(usize::MAX),
        }
    }

    fn preempts(&self, run: &MultilevelRun, arriving: usize, rank: usize, current: usize) -> bool {
        match self.config.preemption {
            Preemption::QueueRank => rank < run.current_queue(),
            Preemption::PriorityValue => {
                run.process(arriving).priority() < run.process(current).priority()
            }
        }
    }

    /// Queues every process that has arrived by now, preempting the
    /// running process for a more privileged arrival.
    fn admit(&self, run: &mut MultilevelRun) -> Result<(), SchedulerError> {
        while let Some(index) = run.next_arrival() {
            let rank = run.assign_queue(index);
            run.push_back(index, rank)?;

            if let Some(current) = run.current() {
                if self.preempts(run, index, rank, current) {
                    run.preempt()?;
                    debug!(
                        "t={} {} preempted by {} in Q{}",
                        run.time(),
                        run.process(current),
                        run.process(index),
                        rank
                    );
                }
            }
        }
        Ok(())
    }
}

impl Scheduler for Mlq {
    fn name(&self) -> &'static str {
        "mlq"
    }

    fn run(&mut self, processes: &mut [Process]) -> Result<Vec<TimelineEntry>, SchedulerError> {
        let mut run = MultilevelRun::new(processes, self.config.num_queues)?;

        while run.has_work() {
            self.admit(&mut run)?;

            if run.current().is_none() {
                run.select_next()?;
            }

            match run.execute()? {
                Some(Tick::Finished(index)) => {
                    debug!("t={} {} finished", run.time() + 1, run.process(index));
                }
                Some(Tick::Continued(index)) => {
                    let rank = run.current_queue();
                    if run.quantum_counter() == self.quantum(rank) {
                        // no demotion, the queue is fixed by priority
                        run.expire(rank)?;
                        debug!(
                            "t={} {} used its quantum in Q{}",
                            run.time() + 1,
                            run.process(index),
                            rank
                        );
                    }
                }
                None => {}
            }

            run.advance();
        }

        self.context_switches = run.context_switches();
        info!(
            "mlq finished at t={} with {} context switches",
            run.time(),
            self.context_switches
        );
        Ok(run.into_timeline())
    }

    fn context_switches(&self) -> usize {
        self.context_switches
    }
}
