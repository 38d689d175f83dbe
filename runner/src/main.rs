use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use std::{env, process};

use log::{debug, info};
use processor::{format_reports, read_workload, Processor, Report};
use scheduler::{Mlfq, Mlq};

mod config;
mod logger;

use config::Config;

fn write_report(dir: &Path, report: &Report) -> io::Result<()> {
    let files = [
        ("timeline", report.timeline_csv()),
        ("metrics", report.metrics_csv()),
        ("summary", report.summary_csv()),
    ];
    for (kind, contents) in files {
        let path = dir.join(format!("{}_{}.csv", report.scheduler, kind));
        fs::write(&path, contents)?;
        debug!("wrote {}", path.display());
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    logger::init(config.log_level)?;

    let workload = match env::args().nth(1) {
        Some(path) => read_workload(BufReader::new(File::open(path)?))?,
        None => read_workload(io::stdin().lock())?,
    };
    if workload.is_empty() {
        println!("No processes given");
        return Ok(());
    }
    info!("simulating {} processes", workload.len());

    let reports = vec![
        Processor::new(Mlq::new(config.mlq)?).run(&workload)?,
        Processor::new(Mlfq::new(config.mlfq)?).run(&workload)?,
    ];

    fs::create_dir_all(&config.output_dir)?;
    for report in &reports {
        write_report(&config.output_dir, report)?;
    }

    print!("{}", format_reports(&reports));
    println!(
        "All schedulers completed successfully. Results are in {}",
        config.output_dir.display()
    );
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests;
