//! A CPU scheduling simulation library.
//!
//! This library simulates preemptive multilevel queue policies over a
//! workload of CPU-bound processes, one logical time unit at a time.
//! A policy implements the [`Scheduler`] trait: it consumes a set of
//! [`Process`] records, fills in their timings and returns the timeline
//! of what the CPU did in every time unit.
//!
//! ```rust
//! use scheduler::{mlq, Process, Scheduler};
//! use std::num::NonZeroUsize;
//!
//! let mut processes = vec![Process::new(1, 0, 4, 1), Process::new(2, 0, 4, 5)];
//! let mut scheduler = mlq(NonZeroUsize::new(2).unwrap(), NonZeroUsize::new(3).unwrap());
//! let timeline = scheduler.run(&mut processes).unwrap();
//!
//! assert_eq!(timeline.len(), 8);
//! assert_eq!(processes[1].start_time(), Some(4));
//! ```
//!

use std::num::NonZeroUsize;

mod process;
mod scheduler;

pub use crate::process::{Metrics, Process, ProcessState};
pub use crate::scheduler::{Pid, Scheduler, SchedulerError, TimelineEntry};

mod schedulers;

pub use schedulers::{
    Mlfq, MlfqConfig, Mlq, MlqConfig, Preemption, QuantumScaling, MLFQ_QUEUES,
};

/// Returns a structure that implements the `Scheduler` trait with a static multilevel
/// queue policy
///
/// * `time_quantum` - the time quanta that a process can run before it is sent back
///                    to the tail of its queue
/// * `num_queues` - the number of queues; the priority range of the workload is
///                  split into this many equal bands
///
/// Arrivals in a more privileged queue preempt the running process and
/// every queue uses the same quantum. Use [`Mlq::new`] for the other
/// variants.
pub fn mlq(time_quantum: NonZeroUsize, num_queues: NonZeroUsize) -> impl Scheduler {
    Mlq::with_valid_config(MlqConfig {
        time_quantum: time_quantum.get(),
        num_queues: num_queues.get(),
        preemption: Preemption::QueueRank,
        quantum_scaling: QuantumScaling::Fixed,
    })
}

/// Returns a structure that implements the `Scheduler` trait with a three level
/// feedback queue policy
///
/// * `time_quantum_q1` - the time quanta of the first queue; a process that uses
///                       all of it is demoted to the second queue
/// * `time_quantum_q2` - the time quanta of the second queue; a process that uses
///                       all of it is demoted to the last queue
/// * `aging_threshold` - the time a process can wait in the second or last queue
///                       before it is promoted one queue up
pub fn mlfq(
    time_quantum_q1: NonZeroUsize,
    time_quantum_q2: NonZeroUsize,
    aging_threshold: NonZeroUsize,
) -> impl Scheduler {
    Mlfq::with_valid_config(MlfqConfig {
        time_quantum_q1: time_quantum_q1.get(),
        time_quantum_q2: time_quantum_q2.get(),
        aging_threshold: aging_threshold.get(),
    })
}
