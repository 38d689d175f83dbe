use std::collections::HashMap;

use log::{debug, info};

use super::multilevel::{MultilevelRun, Tick};
use crate::{Pid, Process, Scheduler, SchedulerError, TimelineEntry};

/// The number of queues of a [`Mlfq`] scheduler.
pub const MLFQ_QUEUES: usize = 3;

/// The options of a [`Mlfq`] scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MlfqConfig {
    /// Round robin quantum of queue 0.
    pub time_quantum_q1: usize,

    /// Round robin quantum of queue 1.
    pub time_quantum_q2: usize,

    /// Time a process may wait in queue 1 or 2 before it is promoted.
    pub aging_threshold: usize,
}

impl Default for MlfqConfig {
    fn default() -> Self {
        MlfqConfig {
            time_quantum_q1: 8,
            time_quantum_q2: 16,
            aging_threshold: 100,
        }
    }
}

/// Multilevel feedback queue scheduler with aging.
///
/// Processes start in the queue matching their priority. Using a whole
/// quantum demotes a process one queue down, waiting for
/// `aging_threshold` time units promotes it one queue up. The last queue
/// is first come first served.
pub struct Mlfq {
    config: MlfqConfig,
    context_switches: usize,
}

impl Mlfq {
    pub fn new(config: MlfqConfig) -> Result<Self, SchedulerError> {
        if config.time_quantum_q1 == 0 || config.time_quantum_q2 == 0 {
            return Err(SchedulerError::InvalidConfig("time quanta must be positive"));
        }
        if config.aging_threshold == 0 {
            return Err(SchedulerError::InvalidConfig("aging threshold must be positive"));
        }
        Ok(Mlfq::with_valid_config(config))
    }

    pub(crate) fn with_valid_config(config: MlfqConfig) -> Self {
        Mlfq {
            config,
            context_switches: 0,
        }
    }

    /// Time quantum of the queue with rank `rank`, `None` for the
    /// last queue.
    pub fn quantum(&self, rank: usize) -> Option<usize> {
        match rank {
            0 => Some(self.config.time_quantum_q1),
            1 => Some(self.config.time_quantum_q2),
            _ => None,
        }
    }

    /// Queues every process that has arrived by now. An arrival in a
    /// strictly better queue than the running process preempts it.
    fn admit(
        &self,
        run: &mut MultilevelRun,
        waiting_since: &mut HashMap<Pid, usize>,
    ) -> Result<(), SchedulerError> {
        while let Some(index) = run.next_arrival() {
            let rank = run.assign_queue(index);
            run.push_back(index, rank)?;
            waiting_since.insert(run.process(index).pid(), run.time());

            if run.current().is_some() && rank < run.current_queue() {
                if let Some(preempted) = run.preempt()? {
                    waiting_since.insert(run.process(preempted).pid(), run.time());
                    debug!(
                        "t={} {} preempted by {} in Q{}",
                        run.time(),
                        run.process(preempted),
                        run.process(index),
                        rank
                    );
                }
            }
        }
        Ok(())
    }

    /// Promotes the processes of queues 1 and 2 that have waited for at
    /// least `aging_threshold` time units.
    ///
    /// Queue 1 is aged before queue 2, so a process moves up at most one
    /// queue per time unit.
    fn age(
        &self,
        run: &mut MultilevelRun,
        waiting_since: &mut HashMap<Pid, usize>,
    ) -> Result<(), SchedulerError> {
        let time = run.time();
        for rank in 1..MLFQ_QUEUES {
            let promoted = run.promote_where(rank, |process| {
                let since = waiting_since
                    .get(&process.pid())
                    .copied()
                    .unwrap_or(process.arrival());
                time.saturating_sub(since) >= self.config.aging_threshold
            })?;

            for index in promoted {
                let process = run.process(index);
                waiting_since.insert(process.pid(), time);
                debug!("t={} {} aged from Q{} to Q{}", time, process, rank, rank - 1);
            }
        }
        Ok(())
    }

    /// Simulates the time unit `run.time()`: arrivals, aging, selection,
    /// then one unit of execution with demotion on quantum exhaustion.
    fn step(
        &self,
        run: &mut MultilevelRun,
        waiting_since: &mut HashMap<Pid, usize>,
    ) -> Result<(), SchedulerError> {
        self.admit(run, waiting_since)?;
        self.age(run, waiting_since)?;

        if run.current().is_none() {
            if let Some(index) = run.select_next()? {
                waiting_since.remove(&run.process(index).pid());
            }
        }

        match run.execute()? {
            Some(Tick::Finished(index)) => {
                let process = run.process(index);
                waiting_since.remove(&process.pid());
                debug!("t={} {} finished", run.time() + 1, process);
            }
            Some(Tick::Continued(index)) => {
                let rank = run.current_queue();
                if Some(run.quantum_counter()) == self.quantum(rank) {
                    let next = (rank + 1).min(MLFQ_QUEUES - 1);
                    run.expire(next)?;
                    let process = run.process(index);
                    waiting_since.insert(process.pid(), run.time() + 1);
                    debug!(
                        "t={} {} demoted from Q{} to Q{}",
                        run.time() + 1,
                        process,
                        rank,
                        next
                    );
                }
            }
            None => {}
        }
        Ok(())
    }
}

impl Scheduler for Mlfq {
    fn name(&self) -> &'static str {
        "mlfq"
    }

    fn run(&mut self, processes: &mut [Process]) -> Result<Vec<TimelineEntry>, SchedulerError> {
        let mut run = MultilevelRun::new(processes, MLFQ_QUEUES)?;
        let mut waiting_since = HashMap::new();

        while run.has_work() {
            self.step(&mut run, &mut waiting_since)?;
            run.advance();
        }

        self.context_switches = run.context_switches();
        info!(
            "mlfq finished at t={} with {} context switches",
            run.time(),
            self.context_switches
        );
        Ok(run.into_timeline())
    }

    fn context_switches(&self) -> usize {
        self.context_switches
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ProcessState;

    fn mlfq(time_quantum_q1: usize, time_quantum_q2: usize, aging_threshold: usize) -> Mlfq {
        Mlfq::new(MlfqConfig {
            time_quantum_q1,
            time_quantum_q2,
            aging_threshold,
        })
        .unwrap()
    }

    fn pids(timeline: &[TimelineEntry]) -> Vec<Option<usize>> {
        timeline
            .iter()
            .map(|entry| entry.pid().map(Pid::get))
            .collect()
    }

    #[test]
    fn single_process_is_demoted_but_keeps_running() {
        let mut processes = vec![Process::new(1, 0, 7, 0)];
        let mut scheduler = mlfq(2, 3, 100);
        let timeline = scheduler.run(&mut processes).unwrap();

        assert_eq!(timeline, vec![TimelineEntry::Run(Pid::new(1)); 7]);
        assert_eq!(scheduler.context_switches(), 0);
        assert_eq!(processes[0].finish_time(), Some(7));
        assert_eq!(processes[0].metrics().unwrap().waiting, 0);
    }

    #[test]
    fn starved_process_is_aged_up() {
        // step = 3: priority 0 -> Q0, priority 8 -> Q2
        let mut processes = vec![Process::new(1, 0, 10, 0), Process::new(2, 0, 3, 8)];
        let mut scheduler = mlfq(2, 4, 3);
        let timeline = scheduler.run(&mut processes).unwrap();

        let mut expected = vec![Some(1); 6];
        expected.extend([Some(2); 3]);
        expected.extend([Some(1); 4]);
        assert_eq!(pids(&timeline), expected);

        let starved = &processes[1];
        assert_eq!(starved.start_time(), Some(6));
        assert_eq!(starved.finish_time(), Some(9));
        assert!(starved.finish_time() < processes[0].finish_time());
        assert_eq!(processes[0].metrics().unwrap().waiting, 3);
        assert_eq!(scheduler.context_switches(), 2);
    }

    #[test]
    fn aging_promotes_one_queue_per_check() {
        let mut processes = vec![
            Process::new(1, 0, 1, 0),
            Process::new(2, 0, 1, 4),
            Process::new(3, 0, 1, 8),
        ];
        let mut run = MultilevelRun::new(&mut processes, MLFQ_QUEUES).unwrap();
        let mut waiting_since = HashMap::new();
        let scheduler = mlfq(2, 4, 3);

        scheduler.admit(&mut run, &mut waiting_since).unwrap();
        assert_eq!(run.queue(1), vec![Pid::new(2)]);
        assert_eq!(run.queue(2), vec![Pid::new(3)]);

        for _ in 0..3 {
            run.advance();
        }
        scheduler.age(&mut run, &mut waiting_since).unwrap();

        assert_eq!(run.queue(0), vec![Pid::new(1), Pid::new(2)]);
        assert_eq!(run.queue(1), vec![Pid::new(3)]);
        assert!(run.queue(2).is_empty());
        assert_eq!(waiting_since[&Pid::new(3)], 3);
        assert_eq!(run.process(2).state(), ProcessState::Ready { queue: 1 });
    }

    #[test]
    fn aging_keeps_order_of_processes_left_behind() {
        let mut processes = vec![
            Process::new(1, 0, 1, 8),
            Process::new(2, 1, 1, 8),
            Process::new(3, 2, 1, 8),
            Process::new(4, 0, 1, 0),
        ];
        let mut run = MultilevelRun::new(&mut processes, MLFQ_QUEUES).unwrap();
        let mut waiting_since = HashMap::new();
        let scheduler = mlfq(2, 4, 2);

        for _ in 0..3 {
            scheduler.admit(&mut run, &mut waiting_since).unwrap();
            run.advance();
        }
        assert_eq!(run.queue(2), vec![Pid::new(1), Pid::new(2), Pid::new(3)]);

        // t=3: P1 waited 3, P2 waited 2, P3 waited 1
        scheduler.age(&mut run, &mut waiting_since).unwrap();
        assert_eq!(run.queue(1), vec![Pid::new(1), Pid::new(2)]);
        assert_eq!(run.queue(2), vec![Pid::new(3)]);
    }

    #[test]
    fn better_queue_arrival_preempts() {
        // step = 3: priority 0 -> Q0, priority 8 -> Q2
        let mut processes = vec![Process::new(1, 0, 4, 8), Process::new(2, 2, 2, 0)];
        let mut scheduler = mlfq(2, 4, 100);
        let timeline = scheduler.run(&mut processes).unwrap();

        assert_eq!(
            pids(&timeline),
            vec![Some(1), Some(1), Some(2), Some(2), Some(1), Some(1)]
        );
        assert_eq!(scheduler.context_switches(), 2);
        assert_eq!(processes[0].metrics().unwrap().response, 0);
        assert_eq!(processes[1].metrics().unwrap().waiting, 0);
    }

    #[test]
    fn preempted_process_waits_from_the_preemption_time() {
        // step = 1: priority 1 -> Q1, priority 0 -> Q0
        let mut processes = vec![Process::new(1, 0, 6, 1), Process::new(2, 2, 1, 0)];
        let mut run = MultilevelRun::new(&mut processes, MLFQ_QUEUES).unwrap();
        let mut waiting_since = HashMap::new();
        let scheduler = mlfq(2, 4, 3);

        for _ in 0..2 {
            scheduler.step(&mut run, &mut waiting_since).unwrap();
            run.advance();
        }
        assert!(!waiting_since.contains_key(&Pid::new(1)));

        scheduler.admit(&mut run, &mut waiting_since).unwrap();
        assert_eq!(run.queue(0), vec![Pid::new(2)]);
        assert_eq!(run.queue(1), vec![Pid::new(1)]);
        assert_eq!(run.process(0).state(), ProcessState::Ready { queue: 1 });
        assert_eq!(waiting_since[&Pid::new(1)], 2);

        // waited 2 units since the preemption, not 4 since arrival
        run.advance();
        run.advance();
        scheduler.age(&mut run, &mut waiting_since).unwrap();
        assert_eq!(run.queue(1), vec![Pid::new(1)]);

        run.advance();
        scheduler.age(&mut run, &mut waiting_since).unwrap();
        assert_eq!(run.queue(0), vec![Pid::new(2), Pid::new(1)]);
        assert_eq!(waiting_since[&Pid::new(1)], 5);
    }

    #[test]
    fn last_queue_runs_to_completion_in_fifo_order() {
        let mut processes = vec![Process::new(1, 0, 6, 0), Process::new(2, 0, 6, 0)];
        let mut scheduler = mlfq(1, 1, 100);
        let timeline = scheduler.run(&mut processes).unwrap();

        // both reach Q2 at t=4 with 4 units left, more than either quantum
        let mut expected = vec![Some(1), Some(2), Some(1), Some(2)];
        expected.extend([Some(1); 4]);
        expected.extend([Some(2); 4]);
        assert_eq!(pids(&timeline), expected);
        assert_eq!(processes[0].finish_time(), Some(8));
        assert_eq!(processes[1].finish_time(), Some(12));
        assert_eq!(scheduler.context_switches(), 5);
    }

    #[test]
    fn demotion_is_not_undone_by_the_next_aging_check() {
        let mut processes = vec![Process::new(1, 0, 3, 0), Process::new(2, 0, 3, 0)];
        let mut run = MultilevelRun::new(&mut processes, MLFQ_QUEUES).unwrap();
        let mut waiting_since = HashMap::new();
        let scheduler = mlfq(1, 2, 1);

        scheduler.step(&mut run, &mut waiting_since).unwrap();
        assert_eq!(run.process(0).state(), ProcessState::Ready { queue: 1 });
        assert_eq!(waiting_since[&Pid::new(1)], 1);

        run.advance();
        scheduler.step(&mut run, &mut waiting_since).unwrap();
        assert!(run.queue(0).is_empty());
        assert_eq!(run.queue(1), vec![Pid::new(1), Pid::new(2)]);
        assert_eq!(waiting_since[&Pid::new(2)], 2);
    }

    #[test]
    fn same_queue_arrival_does_not_preempt() {
        let mut processes = vec![Process::new(1, 0, 3, 0), Process::new(2, 1, 1, 0)];
        let timeline = mlfq(8, 16, 100).run(&mut processes).unwrap();

        assert_eq!(pids(&timeline), vec![Some(1), Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn demoted_processes_share_queue_one() {
        let mut processes = vec![Process::new(1, 0, 4, 0), Process::new(2, 0, 4, 0)];
        let mut scheduler = mlfq(1, 2, 100);
        let timeline = scheduler.run(&mut processes).unwrap();

        // Q0 slices of 1, then Q1 slices of 2, then Q2 to completion
        assert_eq!(
            pids(&timeline),
            vec![Some(1), Some(2), Some(1), Some(1), Some(2), Some(2), Some(1), Some(2)]
        );
        assert_eq!(scheduler.context_switches(), 5);
    }

    #[test]
    fn late_arrival_produces_leading_idle() {
        let mut processes = vec![Process::new(1, 10, 3, 0)];
        let timeline = mlfq(2, 4, 3).run(&mut processes).unwrap();

        assert_eq!(timeline.len(), 13);
        assert!(timeline[..10].iter().all(TimelineEntry::is_idle));
        assert_eq!(pids(&timeline[10..]), vec![Some(1); 3]);
    }

    #[test]
    fn every_process_finishes_with_consistent_metrics() {
        let mut processes: Vec<Process> = (0..12)
            .map(|pid| Process::new(pid, (pid * 3) % 7, 1 + (pid * 5) % 9, (pid * 7) % 6))
            .collect();
        let mut scheduler = mlfq(2, 4, 5);
        let timeline = scheduler.run(&mut processes).unwrap();

        let makespan = processes
            .iter()
            .filter_map(Process::finish_time)
            .max()
            .unwrap();
        assert_eq!(timeline.len(), makespan);
        for process in &processes {
            assert!(process.is_finished());
            assert_eq!(process.remaining(), 0);
            let metrics = process.metrics().unwrap();
            assert_eq!(metrics.turnaround, metrics.waiting + process.burst());
            assert_eq!(
                metrics.response,
                process.start_time().unwrap() - process.arrival()
            );
        }
        for (pid, process) in processes.iter().enumerate() {
            let units = timeline
                .iter()
                .filter(|entry| entry.pid() == Some(Pid::new(pid)))
                .count();
            assert_eq!(units, process.burst());
        }
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        assert!(Mlfq::new(MlfqConfig {
            time_quantum_q1: 0,
            ..MlfqConfig::default()
        })
        .is_err());
        assert!(Mlfq::new(MlfqConfig {
            time_quantum_q2: 0,
            ..MlfqConfig::default()
        })
        .is_err());
        assert_eq!(
            Mlfq::new(MlfqConfig {
                aging_threshold: 0,
                ..MlfqConfig::default()
            })
            .err(),
            Some(SchedulerError::InvalidConfig("aging threshold must be positive"))
        );
    }
}
