//! The scheduling policies.
//!
//! Both policies are built on the queue set and run state from
//! [`multilevel`], and differ in how processes move between queues.
//!
mod multilevel;

mod mlq;
pub use mlq::{Mlq, MlqConfig, Preemption, QuantumScaling};

mod mlfq;
pub use mlfq::{Mlfq, MlfqConfig, MLFQ_QUEUES};
