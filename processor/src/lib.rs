//! A processor simulation library
//!
//! This is used for running the schedulers from the [`scheduler`] crate
//! over a workload and collecting what happened into a [`Report`].

use std::error;
use std::fmt::{Display, Write};
use std::io::{self, BufRead};

use log::{debug, info};
use scheduler::{Pid, Process, Scheduler, SchedulerError, TimelineEntry};

/// The reasons a workload cannot be loaded or simulated.
#[derive(Debug)]
pub enum Error {
    /// Line `line` (1-based) of the workload description is not a
    /// valid process.
    Workload { line: usize, reason: String },

    /// The workload could not be read.
    Io(io::Error),

    /// The scheduler refused the workload or failed during the run.
    Scheduler(SchedulerError),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Workload { line, reason } => write!(f, "line {}: {}", line, reason),
            Error::Io(err) => write!(f, "cannot read workload: {}", err),
            Error::Scheduler(err) => write!(f, "{}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Scheduler(err) => Some(err),
            Error::Workload { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<SchedulerError> for Error {
    fn from(err: SchedulerError) -> Self {
        Error::Scheduler(err)
    }
}

fn field(line: usize, name: &str, token: &str) -> Result<usize, Error> {
    let value = token.parse::<i64>().map_err(|_| Error::Workload {
        line,
        reason: format!("{} `{}` is not an integer", name, token),
    })?;
    usize::try_from(value).map_err(|_| Error::Workload {
        line,
        reason: format!("{} {} is negative", name, value),
    })
}

fn parse_line(number: usize, line: &str) -> Result<Process, Error> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [pid, arrival, burst, priority] = tokens.as_slice() else {
        return Err(Error::Workload {
            line: number,
            reason: format!(
                "expected `id arrival burst priority`, found {} fields",
                tokens.len()
            ),
        });
    };

    Ok(Process::new(
        field(number, "id", pid)?,
        field(number, "arrival", arrival)?,
        field(number, "burst", burst)?,
        field(number, "priority", priority)?,
    ))
}

/// Parses a workload description, one process per line as
/// `id arrival burst priority`.
///
/// Parsing stops at the first blank line.
///
/// ## Example
///
/// ```rust
/// let processes = processor::parse_workload("1 0 5 1\n2 3 2 0\n").unwrap();
/// assert_eq!(processes.len(), 2);
/// assert_eq!(processes[1].arrival(), 3);
/// ```
pub fn parse_workload(input: &str) -> Result<Vec<Process>, Error> {
    input
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_line(index + 1, line))
        .collect()
}

/// Same as [`parse_workload`], reading from `reader`.
pub fn read_workload<R: BufRead>(reader: R) -> Result<Vec<Process>, Error> {
    let mut processes = vec![];
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        processes.push(parse_line(index + 1, &line)?);
    }
    debug!("read {} processes", processes.len());
    Ok(processes)
}

/// Information about a finished process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub arrival: usize,
    pub burst: usize,
    pub priority: usize,
    pub start_time: usize,
    pub finish_time: usize,
    pub waiting_time: usize,
    pub turnaround_time: usize,
    pub response_time: usize,
}

impl ProcessInfo {
    /// Collects the timings of `process`, `None` if it has not finished.
    pub fn new(process: &Process) -> Option<ProcessInfo> {
        let metrics = process.metrics()?;
        Some(ProcessInfo {
            pid: process.pid(),
            arrival: process.arrival(),
            burst: process.burst(),
            priority: process.priority(),
            start_time: process.start_time()?,
            finish_time: process.finish_time()?,
            waiting_time: metrics.waiting,
            turnaround_time: metrics.turnaround,
            response_time: metrics.response,
        })
    }
}

impl Display for ProcessInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "P{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.pid,
            self.arrival,
            self.burst,
            self.priority,
            self.start_time,
            self.finish_time,
            self.waiting_time,
            self.turnaround_time,
            self.response_time
        )
    }
}

/// The outcome of running one scheduler over a workload.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// The name of the scheduling policy.
    pub scheduler: &'static str,

    /// What the CPU did in every time unit.
    pub timeline: Vec<TimelineEntry>,

    /// The processes, in workload order.
    pub processes: Vec<ProcessInfo>,

    pub context_switches: usize,
}

impl Report {
    /// Total simulated time until the last process finished.
    pub fn makespan(&self) -> usize {
        self.timeline.len()
    }

    pub fn idle_time(&self) -> usize {
        self.timeline.iter().filter(|entry| entry.is_idle()).count()
    }

    fn average(&self, metric: impl Fn(&ProcessInfo) -> usize) -> f64 {
        if self.processes.is_empty() {
            return 0.0;
        }
        let total: usize = self.processes.iter().map(metric).sum();
        total as f64 / self.processes.len() as f64
    }

    pub fn average_waiting_time(&self) -> f64 {
        self.average(|process| process.waiting_time)
    }

    pub fn average_turnaround_time(&self) -> f64 {
        self.average(|process| process.turnaround_time)
    }

    pub fn average_response_time(&self) -> f64 {
        self.average(|process| process.response_time)
    }

    /// Groups the timeline into runs of the same entry, as
    /// `(start, end, entry)` with `end` exclusive.
    pub fn segments(&self) -> Vec<(usize, usize, TimelineEntry)> {
        let mut segments: Vec<(usize, usize, TimelineEntry)> = vec![];
        for (time, entry) in self.timeline.iter().enumerate() {
            if let Some(last) = segments.last_mut() {
                if last.2 == *entry {
                    last.1 = time + 1;
                    continue;
                }
            }
            segments.push((time, time + 1, *entry));
        }
        segments
    }

    /// The timeline as CSV, one row per time unit.
    pub fn timeline_csv(&self) -> String {
        let mut s = String::from("Time,Process\n");
        for (time, entry) in self.timeline.iter().enumerate() {
            let _ = writeln!(s, "{},{}", time, entry);
        }
        s
    }

    /// The per-process metrics as CSV.
    pub fn metrics_csv(&self) -> String {
        let mut s = String::from(
            "Process ID,Arrival,Burst,Priority,Start Time,Finish Time,Waiting Time,Turnaround Time,Response Time\n",
        );
        for p in &self.processes {
            let _ = writeln!(
                s,
                "P{},{},{},{},{},{},{},{},{}",
                p.pid,
                p.arrival,
                p.burst,
                p.priority,
                p.start_time,
                p.finish_time,
                p.waiting_time,
                p.turnaround_time,
                p.response_time
            );
        }
        s
    }

    /// The aggregate metrics as CSV.
    pub fn summary_csv(&self) -> String {
        let mut s = String::from("Metric,Value\n");
        let _ = writeln!(s, "Total Context Switches,{}", self.context_switches);
        let _ = writeln!(s, "Makespan,{}", self.makespan());
        let _ = writeln!(s, "Average Waiting Time,{:.2}", self.average_waiting_time());
        let _ = writeln!(s, "Average Turnaround Time,{:.2}", self.average_turnaround_time());
        let _ = writeln!(s, "Average Response Time,{:.2}", self.average_response_time());
        s
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "===== {} =====", self.scheduler.to_uppercase())?;
        writeln!(f, "TIME\t\tCPU")?;
        for (start, end, entry) in self.segments() {
            writeln!(f, "{}-{}\t\t{}", start, end, entry)?;
        }
        writeln!(f)?;
        writeln!(f, "PID\tARRIVAL\tBURST\tPRI\tSTART\tFINISH\tWAIT\tTURN\tRESP")?;
        for process in &self.processes {
            writeln!(f, "{}", process)?;
        }
        writeln!(f)?;
        writeln!(f, "Context switches: {}", self.context_switches)?;
        writeln!(f, "Makespan: {}", self.makespan())?;
        writeln!(f, "Average waiting: {:.2}", self.average_waiting_time())?;
        writeln!(f, "Average turnaround: {:.2}", self.average_turnaround_time())?;
        writeln!(f, "Average response: {:.2}", self.average_response_time())
    }
}

/// The processor simulator.
pub struct Processor<S: Scheduler> {
    scheduler: S,
}

impl<S: Scheduler> Processor<S> {
    pub fn new(scheduler: S) -> Self {
        Processor { scheduler }
    }

    /// Runs the scheduler over a copy of `workload`, leaving the caller's
    /// processes untouched.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use processor::Processor;
    /// use scheduler::Process;
    /// use std::num::NonZeroUsize;
    ///
    /// let workload = vec![Process::new(1, 0, 5, 1)];
    /// let mut processor = Processor::new(scheduler::mlq(
    ///     NonZeroUsize::new(8).unwrap(),
    ///     NonZeroUsize::new(3).unwrap(),
    /// ));
    /// let report = processor.run(&workload).unwrap();
    ///
    /// assert_eq!(report.makespan(), 5);
    /// assert_eq!(report.processes[0].turnaround_time, 5);
    /// ```
    pub fn run(&mut self, workload: &[Process]) -> Result<Report, Error> {
        let mut processes = workload.to_vec();
        let timeline = self.scheduler.run(&mut processes)?;

        let processes = processes
            .iter()
            .map(|process| {
                ProcessInfo::new(process).ok_or(SchedulerError::Inconsistent {
                    pid: process.pid(),
                    state: process.state(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let report = Report {
            scheduler: self.scheduler.name(),
            timeline,
            processes,
            context_switches: self.scheduler.context_switches(),
        };
        info!(
            "{}: makespan {}, average waiting {:.2}",
            report.scheduler,
            report.makespan(),
            report.average_waiting_time()
        );
        Ok(report)
    }
}

/// Format [`Report`]s to a [`String`].
///
/// * `reports` - the reports returned by [`Processor::run`].
pub fn format_reports(reports: &[Report]) -> String {
    let mut s = String::new();
    for report in reports {
        let _ = writeln!(s, "{}", report);
    }
    s
}
