//! Coordinated execution of a single algorithm over a worker group. The coordinator owns the
//! job description and the dataset, validates the job and broadcasts it before any data moves,
//! so that every rank either runs the same algorithm or stops together.
use std::{
    fmt,
    path::PathBuf,
    time::{Duration, Instant},
};

use log::{error, info, warn};

use crate::{
    distribute::scatter,
    helpers::is_power_of_two,
    io::{output_path, read_dataset, write_primes, write_sorted},
    primes::{parallel_prime_range, range_len},
    search::parallel_search,
    sorting::{parallel_sort, RadixMode, SortKind},
    traits::{
        communicator::Communicator,
        types::{Error, ReduceOp, Result, ROOT},
    },
};

/// Broadcast in place of a job the coordinator refused to run
const ABORT: i64 = -1;

/// Algorithms a run can execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    /// Lowest global index of a value in the dataset
    Search {
        /// Value to find
        target: i64,
    },

    /// Primes in an inclusive range, no dataset
    PrimeRange {
        /// Lower bound
        lower: i64,
        /// Upper bound
        upper: i64,
    },

    /// Sort the dataset with [`SortKind::Bitonic`]
    BitonicSort,

    /// Sort the dataset with [`SortKind::Radix`]
    RadixSort {
        /// Distribution of the digit passes
        mode: RadixMode,
    },

    /// Sort the dataset with [`SortKind::Samplesort`]
    SampleSort,
}

impl Algorithm {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Search { .. } => "Quick Search",
            Algorithm::PrimeRange { .. } => "Prime Number Finding",
            Algorithm::BitonicSort => "Bitonic Sort",
            Algorithm::RadixSort { .. } => "Radix Sort",
            Algorithm::SampleSort => "Sample Sort",
        }
    }

    /// Stem of the output file, if the algorithm writes one.
    pub fn output_stem(&self) -> Option<&'static str> {
        match self {
            Algorithm::Search { .. } => None,
            Algorithm::PrimeRange { .. } => Some("primes"),
            Algorithm::BitonicSort => Some("bitonic_sort"),
            Algorithm::RadixSort { .. } => Some("radix_sort"),
            Algorithm::SampleSort => Some("sample_sort"),
        }
    }

    /// Whether the algorithm runs over a dataset.
    pub fn uses_dataset(&self) -> bool {
        !matches!(self, Algorithm::PrimeRange { .. })
    }

    fn sort_kind(&self) -> Option<SortKind> {
        match *self {
            Algorithm::BitonicSort => Some(SortKind::Bitonic),
            Algorithm::RadixSort { mode } => Some(SortKind::Radix { mode }),
            Algorithm::SampleSort => Some(SortKind::Samplesort),
            _ => None,
        }
    }

    /// Check the algorithm can run on a group of `size` workers.
    pub fn validate(&self, size: usize) -> Result<()> {
        match *self {
            Algorithm::BitonicSort if !is_power_of_two(size) => Err(Error::NotPowerOfTwo(size)),
            Algorithm::PrimeRange { lower, upper } if upper < lower => {
                Err(Error::InvalidRange { lower, upper })
            }
            _ => Ok(()),
        }
    }

    fn encode(&self) -> Vec<i64> {
        match *self {
            Algorithm::Search { target } => vec![1, target, 0],
            Algorithm::PrimeRange { lower, upper } => vec![2, lower, upper],
            Algorithm::BitonicSort => vec![3, 0, 0],
            Algorithm::RadixSort { mode } => vec![4, (mode == RadixMode::Redistribute) as i64, 0],
            Algorithm::SampleSort => vec![5, 0, 0],
        }
    }

    fn decode(code: &[i64]) -> Option<Self> {
        match *code {
            [1, target, _] => Some(Algorithm::Search { target }),
            [2, lower, upper] => Some(Algorithm::PrimeRange { lower, upper }),
            [3, _, _] => Some(Algorithm::BitonicSort),
            [4, redistribute, _] => Some(Algorithm::RadixSort {
                mode: if redistribute == 1 {
                    RadixMode::Redistribute
                } else {
                    RadixMode::Local
                },
            }),
            [5, _, _] => Some(Algorithm::SampleSort),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A run as described to the coordinator.
#[derive(Clone, Debug)]
pub struct Job {
    /// Algorithm to run
    pub algorithm: Algorithm,

    /// Dataset of whitespace separated integers, read by the coordinator
    pub input: Option<PathBuf>,

    /// Directory receiving `<stem>.txt`, nothing is written if unset
    pub output_dir: Option<PathBuf>,

    /// Reference runtime for speedup and efficiency
    pub baseline: Option<Duration>,
}

impl Job {
    /// Job without input, output or baseline.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            input: None,
            output_dir: None,
            baseline: None,
        }
    }

    /// Read the dataset from `input`.
    pub fn input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Write results under `output_dir`.
    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    /// Compare the runtime against `baseline`.
    pub fn baseline(mut self, baseline: Duration) -> Self {
        self.baseline = Some(baseline);
        self
    }
}

/// Timing of a run, as seen by the coordinator.
#[derive(Clone, Debug, PartialEq)]
pub struct Performance {
    /// Algorithm name
    pub algorithm: &'static str,

    /// Dataset length, or number of values in a prime range
    pub items: usize,

    /// Size of the group
    pub workers: usize,

    /// Time between the pre-run barrier and the result at the coordinator
    pub elapsed: Duration,

    /// Reference runtime, typically of a single worker
    pub baseline: Option<Duration>,
}

impl Performance {
    /// Column names of [`Performance::record`].
    pub const HEADER: [&'static str; 6] = [
        "algorithm",
        "items",
        "workers",
        "elapsed_s",
        "speedup",
        "efficiency",
    ];

    /// Baseline over elapsed time.
    pub fn speedup(&self) -> Option<f64> {
        let elapsed = self.elapsed.as_secs_f64();
        self.baseline
            .filter(|_| elapsed > 0.0)
            .map(|baseline| baseline.as_secs_f64() / elapsed)
    }

    /// Speedup per worker.
    pub fn efficiency(&self) -> Option<f64> {
        self.speedup().map(|s| s / self.workers as f64)
    }

    /// Row of values in the order of [`Performance::HEADER`], unknown values are empty.
    pub fn record(&self) -> Vec<String> {
        let optional = |v: Option<f64>| v.map(|v| format!("{:.6}", v)).unwrap_or_default();
        vec![
            self.algorithm.to_string(),
            self.items.to_string(),
            self.workers.to_string(),
            format!("{:.6}", self.elapsed.as_secs_f64()),
            optional(self.speedup()),
            optional(self.efficiency()),
        ]
    }
}

impl fmt::Display for Performance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.elapsed.as_secs_f64();
        writeln!(f, "--- Performance Analysis for {} ---", self.algorithm)?;
        writeln!(f, "Data Size / Range: {} elements/items", self.items)?;
        writeln!(f, "Number of Processes: {}", self.workers)?;
        writeln!(
            f,
            "Time Taken: {:.6} seconds ({:.6} ms)",
            seconds,
            seconds * 1e3
        )?;
        if let (Some(speedup), Some(efficiency)) = (self.speedup(), self.efficiency()) {
            writeln!(f, "Speedup: {:.3}", speedup)?;
            writeln!(f, "Efficiency: {:.3}", efficiency)?;
        }
        write!(f, "--------------------------------------------------")
    }
}

/// Result of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Lowest global index of the search target
    Found(Option<usize>),

    /// Primes in the range, ascending
    Primes(Vec<i64>),

    /// The sorted dataset
    Sorted(Vec<i64>),

    /// The dataset was empty or could not be read, nothing ran
    Empty,
}

/// What the coordinator knows after a run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// The algorithm that ran
    pub algorithm: Algorithm,

    /// Its result
    pub outcome: Outcome,

    /// Timing, absent if nothing ran
    pub performance: Option<Performance>,

    /// File the result was written to
    pub output: Option<PathBuf>,
}

/// Broadcast the job from the coordinator, returning the algorithm every rank runs.
fn broadcast_job<C: Communicator>(job: Option<&Job>, comm: &C) -> Result<Algorithm> {
    let mut code = Vec::new();
    let mut refusal = None;

    if comm.is_root() {
        let validated = job
            .ok_or(Error::Aborted)
            .and_then(|job| job.algorithm.validate(comm.size()).map(|_| job));
        match validated {
            Ok(job) => code = job.algorithm.encode(),
            Err(e) => {
                error!("{}", e);
                code = vec![ABORT];
                refusal = Some(e);
            }
        }
    }

    comm.broadcast(ROOT, &mut code)?;

    match (refusal, Algorithm::decode(&code)) {
        (Some(e), _) => Err(e),
        (None, Some(algorithm)) => Ok(algorithm),
        (None, None) => Err(Error::Aborted),
    }
}

/// Run a job over the group. The coordinator passes the job, other ranks pass `None` and
/// receive it by broadcast. Returns the report at the coordinator and `None` elsewhere.
///
/// Configuration errors detected by the coordinator, such as bitonic sort on a group whose
/// size is not a power of two, stop the run on every rank before any data moves; the
/// coordinator returns the error and the other ranks return [`Error::Aborted`].
pub fn execute<C: Communicator>(job: Option<&Job>, comm: &C) -> Result<Option<RunReport>> {
    let algorithm = broadcast_job(job, comm)?;
    if comm.is_root() {
        info!("running {} on {} workers", algorithm, comm.size());
    }

    // Dataset, if any, is read at the coordinator and scattered
    let mut partition = Vec::new();
    let mut n_items = 0;
    if algorithm.uses_dataset() {
        let mut global = Vec::new();
        if comm.is_root() {
            match job.and_then(|job| job.input.as_ref()) {
                Some(path) => match read_dataset(path) {
                    Ok(data) => global = data,
                    Err(e) => error!("could not read {}: {}", path.display(), e),
                },
                None => warn!("{} has no input dataset", algorithm),
            }
        }

        partition = scatter(&global, comm)?;
        n_items = comm.all_reduce(&[partition.len() as u64], ReduceOp::Sum)?[0] as usize;

        if n_items == 0 {
            if comm.is_root() {
                warn!("input is empty or could not be read, {} skipped", algorithm);
                return Ok(Some(RunReport {
                    algorithm,
                    outcome: Outcome::Empty,
                    performance: None,
                    output: None,
                }));
            }
            return Ok(None);
        }
    }

    comm.barrier()?;
    let start = Instant::now();

    let outcome = match algorithm {
        Algorithm::Search { target } => {
            Outcome::Found(parallel_search(&partition, target, n_items, comm)?)
        }
        Algorithm::PrimeRange { lower, upper } => {
            n_items = range_len(lower, upper);
            Outcome::Primes(parallel_prime_range(lower, upper, comm)?)
        }
        _ => {
            let kind = algorithm.sort_kind().ok_or(Error::Aborted)?;
            Outcome::Sorted(parallel_sort(kind, partition, comm)?)
        }
    };

    let elapsed = start.elapsed();
    comm.barrier()?;

    if !comm.is_root() {
        return Ok(None);
    }

    let performance = Performance {
        algorithm: algorithm.name(),
        items: n_items,
        workers: comm.size(),
        elapsed,
        baseline: job.and_then(|job| job.baseline),
    };

    let output_dir = job.and_then(|job| job.output_dir.as_ref());
    let output = match (output_dir, algorithm.output_stem()) {
        (Some(dir), Some(stem)) => {
            let path = output_path(dir, stem);
            match &outcome {
                Outcome::Sorted(sorted) => write_sorted(&path, sorted)?,
                Outcome::Primes(primes) => write_primes(&path, primes)?,
                _ => {}
            }
            info!("{} results stored in {}", algorithm, path.display());
            Some(path)
        }
        _ => None,
    };

    Ok(Some(RunReport {
        algorithm,
        outcome,
        performance: Some(performance),
        output,
    }))
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::comm::run_local;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("parsort_driver_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn run(job: &Job, size: usize) -> Vec<Result<Option<RunReport>>> {
        run_local(size, |comm| {
            let job = if comm.is_root() { Some(job) } else { None };
            execute(job, &comm)
        })
    }

    #[test]
    fn test_encode_decode() {
        let algorithms = [
            Algorithm::Search { target: -4 },
            Algorithm::PrimeRange {
                lower: 3,
                upper: 99,
            },
            Algorithm::BitonicSort,
            Algorithm::RadixSort {
                mode: RadixMode::Local,
            },
            Algorithm::RadixSort {
                mode: RadixMode::Redistribute,
            },
            Algorithm::SampleSort,
        ];
        for algorithm in algorithms {
            assert_eq!(Algorithm::decode(&algorithm.encode()), Some(algorithm));
        }
        assert_eq!(Algorithm::decode(&[ABORT]), None);
    }

    #[test]
    fn test_sort_jobs() {
        let dir = scratch_dir("sort");
        let input = dir.join("data.txt");
        write_sorted(&input, &[5, 3, 8, 1, 9, 2, 7, 4]).unwrap();

        let algorithms = [
            Algorithm::BitonicSort,
            Algorithm::SampleSort,
            Algorithm::RadixSort {
                mode: RadixMode::Local,
            },
            Algorithm::RadixSort {
                mode: RadixMode::Redistribute,
            },
        ];

        for algorithm in algorithms {
            let job = Job::new(algorithm).input(&input).output_dir(&dir);
            let results = run(&job, 4);

            let report = results[ROOT].as_ref().unwrap().as_ref().unwrap();
            assert_eq!(
                report.outcome,
                Outcome::Sorted(vec![1, 2, 3, 4, 5, 7, 8, 9])
            );
            assert_eq!(report.performance.as_ref().unwrap().items, 8);

            let output = report.output.as_ref().unwrap();
            assert_eq!(fs::read_to_string(output).unwrap(), "1 2 3 4 5 7 8 9");
            assert!(results[1..].iter().all(|r| matches!(r, Ok(None))));
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_bitonic_aborts_on_all_ranks() {
        let job = Job::new(Algorithm::BitonicSort);
        let results = run(&job, 3);

        assert!(matches!(results[ROOT], Err(Error::NotPowerOfTwo(3))));
        assert!(results[1..]
            .iter()
            .all(|r| matches!(r, Err(Error::Aborted))));
    }

    #[test]
    fn test_invalid_prime_range_aborts() {
        let job = Job::new(Algorithm::PrimeRange {
            lower: 50,
            upper: 10,
        });
        let results = run(&job, 2);

        assert!(matches!(
            results[ROOT],
            Err(Error::InvalidRange {
                lower: 50,
                upper: 10
            })
        ));
        assert!(matches!(results[1], Err(Error::Aborted)));
    }

    #[test]
    fn test_prime_job() {
        let dir = scratch_dir("primes");
        let job = Job::new(Algorithm::PrimeRange {
            lower: 10,
            upper: 20,
        })
        .output_dir(&dir);
        let results = run(&job, 3);

        let report = results[ROOT].as_ref().unwrap().as_ref().unwrap();
        assert_eq!(report.outcome, Outcome::Primes(vec![11, 13, 17, 19]));
        assert_eq!(report.performance.as_ref().unwrap().items, 11);
        assert_eq!(
            fs::read_to_string(dir.join("primes.txt")).unwrap(),
            "11\n13\n17\n19\n"
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_search_job() {
        let dir = scratch_dir("search");
        let input = dir.join("data.txt");
        write_sorted(&input, &[4, 9, 2, 9, 7]).unwrap();

        let job = Job::new(Algorithm::Search { target: 9 })
            .input(&input)
            .output_dir(&dir);
        let results = run(&job, 2);
        let report = results[ROOT].as_ref().unwrap().as_ref().unwrap();
        assert_eq!(report.outcome, Outcome::Found(Some(1)));
        assert!(report.output.is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_input_is_empty() {
        let dir = scratch_dir("missing");
        let job = Job::new(Algorithm::SampleSort).input(dir.join("absent.txt"));
        let results = run(&job, 3);

        let report = results[ROOT].as_ref().unwrap().as_ref().unwrap();
        assert_eq!(report.outcome, Outcome::Empty);
        assert!(report.performance.is_none());
        assert!(results[1..].iter().all(|r| matches!(r, Ok(None))));
    }

    #[test]
    fn test_performance() {
        let performance = Performance {
            algorithm: "Sample Sort",
            items: 1000,
            workers: 4,
            elapsed: Duration::from_millis(250),
            baseline: Some(Duration::from_secs(1)),
        };

        assert!((performance.speedup().unwrap() - 4.0).abs() < 1e-9);
        assert!((performance.efficiency().unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(
            performance.record(),
            vec!["Sample Sort", "1000", "4", "0.250000", "4.000000", "1.000000"]
        );

        let without = Performance {
            baseline: None,
            ..performance
        };
        assert_eq!(without.speedup(), None);
        assert_eq!(without.record()[4], "");
        assert!(without.to_string().contains("Number of Processes: 4"));
    }
}
