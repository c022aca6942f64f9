//! Command line arguments and reporting shared by the runner binaries
use std::{
    error::Error,
    fs::OpenOptions,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, ValueEnum};
use csv::WriterBuilder;
use parsort::{Algorithm, Job, Outcome, Performance, RadixMode, RunReport};

/// Algorithm selection on the command line
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AlgorithmArg {
    /// Lowest index of `--target` in the dataset
    Search,
    /// Primes between `--lower` and `--upper`
    Primes,
    /// Bitonic sort, number of workers must be a power of two
    Bitonic,
    /// Radix sort of non-negative data
    Radix,
    /// Sample sort
    Sample,
}

/// Radix sort mode on the command line
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum RadixModeArg {
    /// Digit passes on local partitions, final sort at rank 0
    #[default]
    Local,
    /// Digit passes redistribute elements between workers
    Redistribute,
}

impl From<RadixModeArg> for RadixMode {
    fn from(mode: RadixModeArg) -> Self {
        match mode {
            RadixModeArg::Local => RadixMode::Local,
            RadixModeArg::Redistribute => RadixMode::Redistribute,
        }
    }
}

/// Arguments describing a single run
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Algorithm to run
    #[arg(long, value_enum)]
    pub algorithm: AlgorithmArg,

    /// Dataset of whitespace separated integers
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Search target
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub target: i64,

    /// Lower bound of the prime range
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub lower: i64,

    /// Upper bound of the prime range
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub upper: i64,

    /// Radix sort mode
    #[arg(long, value_enum, default_value_t = RadixModeArg::Local)]
    pub radix_mode: RadixModeArg,

    /// Directory for sorted output and primes
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Runtime of a reference run in seconds, enables speedup and efficiency
    #[arg(long)]
    pub baseline_secs: Option<f64>,

    /// Append the performance row to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

impl RunArgs {
    /// Job for the coordinator
    pub fn job(&self) -> Job {
        let algorithm = match self.algorithm {
            AlgorithmArg::Search => Algorithm::Search {
                target: self.target,
            },
            AlgorithmArg::Primes => Algorithm::PrimeRange {
                lower: self.lower,
                upper: self.upper,
            },
            AlgorithmArg::Bitonic => Algorithm::BitonicSort,
            AlgorithmArg::Radix => Algorithm::RadixSort {
                mode: self.radix_mode.into(),
            },
            AlgorithmArg::Sample => Algorithm::SampleSort,
        };

        let mut job = Job::new(algorithm).output_dir(&self.output_dir);
        if let Some(input) = &self.input {
            job = job.input(input);
        }
        if let Some(secs) = self.baseline_secs.filter(|s| s.is_finite() && *s >= 0.0) {
            job = job.baseline(Duration::from_secs_f64(secs));
        }
        job
    }
}

/// Append a performance row, with a header if the file is new.
pub fn append_csv(path: &Path, performance: &Performance) -> Result<(), Box<dyn Error>> {
    let is_new = std::fs::metadata(path).map_or(true, |m| m.len() == 0);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    if is_new {
        writer.write_record(Performance::HEADER)?;
    }
    writer.write_record(performance.record())?;
    writer.flush()?;
    Ok(())
}

/// Print the result of a run, and record its performance.
pub fn report(report: &RunReport, args: &RunArgs) -> Result<(), Box<dyn Error>> {
    println!("\n{} Selected", report.algorithm);

    match &report.outcome {
        Outcome::Found(Some(index)) => println!(
            "Result: Value {} found at global index {}",
            args.target, index
        ),
        Outcome::Found(None) => println!("Result: Value {} not found.", args.target),
        Outcome::Primes(primes) => println!(
            "Result: Found {} prime numbers between {} and {}.",
            primes.len(),
            args.lower,
            args.upper
        ),
        Outcome::Sorted(sorted) => println!("Result: Sorted {} elements.", sorted.len()),
        Outcome::Empty => println!("Result: No data, input is empty or could not be read."),
    }

    if let Some(output) = &report.output {
        println!("Results stored in {}", output.display());
    }

    if let Some(performance) = &report.performance {
        println!("\n{}", performance);
        if let Some(path) = &args.csv {
            append_csv(path, performance)?;
        }
    }

    Ok(())
}
