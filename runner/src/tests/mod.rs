#[cfg(feature = "mlfq")]
use scheduler::mlfq;
#[cfg(not(feature = "mlfq"))]
use scheduler::mlq;
use scheduler::{Process, Scheduler};

use std::env;
use std::fs;

use processor::Processor;
use std::num::NonZeroUsize;

mod aging;

fn write_logs(folder: &str, name: &str, logs: &str) {
    fs::create_dir_all(format!("../outputs/{SCHEDULER}/{folder}")).unwrap();
    fs::write(
        format!("../outputs/{SCHEDULER}/{folder}/{name}___{}.log", label()),
        logs,
    )
    .unwrap();
}

fn read_logs(folder: &str, name: &str) -> String {
    fs::read_to_string(format!(
        "../outputs/{SCHEDULER}/{folder}/{name}___{}.log",
        label()
    ))
    .unwrap()
}

fn run(folder: &str, name: &str, workload: &[Process]) {
    let report = Processor::new(scheduler()).run(workload).unwrap();
    let output = report.to_string();

    if env::var("WRITE_OUTPUT").is_ok() {
        write_logs(folder, name, &output);
    } else {
        let reference = read_logs(folder, name);

        println!("\nleft = Correct Output\nright = Your Output\n");
        use pretty_assertions::assert_eq;
        assert_eq!(reference, output);
    }
}

fn variable(name: &str, default: usize) -> usize {
    env::var(name)
        .unwrap_or(default.to_string())
        .parse::<usize>()
        .unwrap()
}

/// Returns (quantum, second quantum, aging threshold, queues).
fn arguments() -> (usize, usize, usize, usize) {
    (
        variable("QUANTUM", 2),
        variable("QUANTUM_Q2", 4),
        variable("AGING", 3),
        variable("QUEUES", 3),
    )
}

fn workload(processes: &[(usize, usize, usize, usize)]) -> Vec<Process> {
    processes
        .iter()
        .map(|&(pid, arrival, burst, priority)| Process::new(pid, arrival, burst, priority))
        .collect()
}

#[cfg(feature = "mlfq")]
static SCHEDULER: &str = "mlfq";
#[cfg(feature = "mlfq")]
fn label() -> String {
    let (quantum, quantum_q2, aging, _) = arguments();
    format!("{quantum}_{quantum_q2}_{aging}")
}
#[cfg(feature = "mlfq")]
fn scheduler() -> impl Scheduler {
    let (quantum, quantum_q2, aging, _) = arguments();

    println!("Quantum Q1 {quantum}\nQuantum Q2 {quantum_q2}\nAging threshold {aging}");
    mlfq(
        NonZeroUsize::new(quantum).unwrap(),
        NonZeroUsize::new(quantum_q2).unwrap(),
        NonZeroUsize::new(aging).unwrap(),
    )
}

#[cfg(not(feature = "mlfq"))]
static SCHEDULER: &str = "mlq";
#[cfg(not(feature = "mlfq"))]
fn label() -> String {
    let (quantum, _, _, queues) = arguments();
    format!("{quantum}_{queues}")
}
#[cfg(not(feature = "mlfq"))]
fn scheduler() -> impl Scheduler {
    let (quantum, _, _, queues) = arguments();

    println!("Quantum {quantum}\nQueues {queues}");
    mlq(
        NonZeroUsize::new(quantum).unwrap(),
        NonZeroUsize::new(queues).unwrap(),
    )
}
