use std::env;
use std::error::Error;
use std::fmt::{self, Display};
use std::path::PathBuf;

use log::LevelFilter;
use scheduler::{MlfqConfig, MlqConfig, Preemption, QuantumScaling};

use crate::logger;

/// An environment variable holding a value the runner cannot use.
#[derive(Debug, PartialEq)]
pub struct ConfigError {
    variable: &'static str,
    value: String,
    expected: &'static str,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={:?} is invalid, expected {}",
            self.variable, self.value, self.expected
        )
    }
}

impl Error for ConfigError {}

/// The runner settings.
#[derive(Debug, PartialEq)]
pub struct Config {
    pub mlq: MlqConfig,
    pub mlfq: MlfqConfig,
    pub output_dir: PathBuf,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|variable| env::var(variable).ok())
    }

    /// Builds the settings from `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |variable: &'static str, default: usize| -> Result<usize, ConfigError> {
            match lookup(variable) {
                None => Ok(default),
                Some(value) => value.trim().parse().map_err(|_| ConfigError {
                    variable,
                    value,
                    expected: "a non-negative integer",
                }),
            }
        };

        let mlq_defaults = MlqConfig::default();
        let mlfq_defaults = MlfqConfig::default();

        let preemption = match lookup("MLQ_PREEMPTION").as_deref() {
            None | Some("rank") => Preemption::QueueRank,
            Some("priority") => Preemption::PriorityValue,
            Some(value) => {
                return Err(ConfigError {
                    variable: "MLQ_PREEMPTION",
                    value: value.to_string(),
                    expected: "`rank` or `priority`",
                })
            }
        };
        let quantum_scaling = match lookup("MLQ_SCALING").as_deref() {
            None | Some("fixed") => QuantumScaling::Fixed,
            Some("exponential") => QuantumScaling::Exponential,
            Some(value) => {
                return Err(ConfigError {
                    variable: "MLQ_SCALING",
                    value: value.to_string(),
                    expected: "`fixed` or `exponential`",
                })
            }
        };

        Ok(Config {
            mlq: MlqConfig {
                time_quantum: number("MLQ_QUANTUM", mlq_defaults.time_quantum)?,
                num_queues: number("MLQ_QUEUES", mlq_defaults.num_queues)?,
                preemption,
                quantum_scaling,
            },
            mlfq: MlfqConfig {
                time_quantum_q1: number("MLFQ_Q1", mlfq_defaults.time_quantum_q1)?,
                time_quantum_q2: number("MLFQ_Q2", mlfq_defaults.time_quantum_q2)?,
                aging_threshold: number("AGING_THRESHOLD", mlfq_defaults.aging_threshold)?,
            },
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            log_level: logger::level(lookup("LOG_LEVEL").as_deref()),
        })
    }
}
