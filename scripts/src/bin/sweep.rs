//! Average run times over a grid of worker counts and dataset sizes
use std::{
    error::Error,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use csv::Writer;
use itertools::Itertools;
use log::{error, LevelFilter};
use parsort::{
    execute,
    helpers::{is_power_of_two, random_fixture},
    run_local, Algorithm, Communicator, Job, Performance, RadixMode,
};
use scripts::{AlgorithmArg, RadixModeArg};

/// Struct for parsing command-line arguments
#[derive(Parser)]
struct Args {
    /// Algorithms to sweep
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_value = "search,primes,bitonic,radix,sample"
    )]
    algorithms: Vec<AlgorithmArg>,

    /// Worker counts, bitonic sort skips those that are not a power of two
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4,5,6")]
    workers: Vec<usize>,

    /// Dataset sizes, rounded up to a power of two, or upper bounds of the prime range
    #[arg(long, value_delimiter = ',', default_value = "1000,10000,100000")]
    sizes: Vec<usize>,

    /// Runs averaged per configuration
    #[arg(long, default_value_t = 5)]
    trials: usize,

    /// Radix sort mode
    #[arg(long, value_enum, default_value_t = RadixModeArg::Local)]
    radix_mode: RadixModeArg,

    /// Directory for the generated datasets
    #[arg(long, default_value = "input")]
    input_dir: PathBuf,

    /// Results are written to `<filename>.csv`
    #[arg(long, default_value = "sweep")]
    filename: String,
}

/// Algorithm to run for a dataset or range of `n` items
fn algorithm(arg: AlgorithmArg, n: usize, mode: RadixMode, trial: usize) -> Algorithm {
    match arg {
        AlgorithmArg::Search => {
            let seed = Some((n + trial) as u64);
            let target = random_fixture(1, 0i64, n as i64 - 1, seed)[0];
            Algorithm::Search { target }
        }
        AlgorithmArg::Primes => Algorithm::PrimeRange {
            lower: 1,
            upper: n as i64,
        },
        AlgorithmArg::Bitonic => Algorithm::BitonicSort,
        AlgorithmArg::Radix => Algorithm::RadixSort { mode },
        AlgorithmArg::Sample => Algorithm::SampleSort,
    }
}

/// Write `n` random values in `0..n`, space separated.
fn write_dataset(path: &Path, n: usize) -> std::io::Result<()> {
    let data = random_fixture(n, 0i64, n as i64 - 1, Some(n as u64));
    let mut writer = BufWriter::new(File::create(path)?);
    write!(writer, "{}", data.iter().join(" "))?;
    writer.flush()
}

/// Time of a single run at the coordinator.
fn time_run(job: &Job, n_workers: usize) -> Option<Duration> {
    let results = run_local(n_workers, |comm| {
        let job = if comm.is_root() { Some(job) } else { None };
        execute(job, &comm)
    });

    match results.into_iter().next() {
        Some(Ok(Some(report))) => report.performance.map(|p| p.elapsed),
        Some(Err(e)) => {
            error!("{} on {} workers failed: {}", job.algorithm, n_workers, e);
            None
        }
        _ => None,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let trials = args.trials.max(1);
    let mode = RadixMode::from(args.radix_mode);
    fs::create_dir_all(&args.input_dir)?;

    let file = File::create(format!("{}.csv", args.filename))?;
    let mut writer = Writer::from_writer(file);
    let mut header = Performance::HEADER.to_vec();
    header.push("trials");
    writer.write_record(&header)?;

    for &arg in args.algorithms.iter() {
        let uses_dataset = !matches!(arg, AlgorithmArg::Primes);
        let power_of_two_only = matches!(arg, AlgorithmArg::Bitonic);

        for &size in args.sizes.iter() {
            let n = if uses_dataset {
                size.max(1).next_power_of_two()
            } else {
                size
            };

            let input = args.input_dir.join(format!("input_{}.txt", n));
            if uses_dataset && !input.exists() {
                write_dataset(&input, n)?;
            }

            // Single worker average of this size, when swept
            let mut baseline = None;

            for &n_workers in args.workers.iter() {
                if n_workers == 0 || (power_of_two_only && !is_power_of_two(n_workers)) {
                    continue;
                }

                let mut times = Vec::with_capacity(trials);
                for trial in 0..trials {
                    let mut job = Job::new(algorithm(arg, n, mode, trial));
                    if uses_dataset {
                        job = job.input(&input);
                    }
                    if let Some(elapsed) = time_run(&job, n_workers) {
                        times.push(elapsed);
                    }
                }

                if times.is_empty() {
                    continue;
                }

                let average = times.iter().sum::<Duration>() / times.len() as u32;
                if n_workers == 1 {
                    baseline = Some(average);
                }

                let performance = Performance {
                    algorithm: algorithm(arg, n, mode, 0).name(),
                    items: n,
                    workers: n_workers,
                    elapsed: average,
                    baseline,
                };

                println!(
                    "{}: size={}, p={}, avg over {} runs -> {:.6}s",
                    performance.algorithm,
                    n,
                    n_workers,
                    times.len(),
                    average.as_secs_f64()
                );

                let mut record = performance.record();
                record.push(times.len().to_string());
                writer.write_record(&record)?;
            }
        }
    }

    writer.flush()?;
    println!("Results written to {}.csv", args.filename);

    Ok(())
}
