//! Run a single algorithm over an in-process group of worker threads
use clap::Parser;
use log::{error, LevelFilter};
use parsort::{execute, run_local, Communicator};
use scripts::{report, RunArgs};

/// Struct for parsing command-line arguments
#[derive(Parser)]
struct Args {
    /// Number of worker threads
    #[arg(long, default_value_t = 4)]
    n_workers: usize,

    #[command(flatten)]
    run: RunArgs,
}

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let job = args.run.job();

    println!("Running on {} workers.", args.n_workers);

    let results = run_local(args.n_workers.max(1), |comm| {
        let job = if comm.is_root() { Some(&job) } else { None };
        execute(job, &comm)
    });

    match results.into_iter().next() {
        Some(Ok(Some(run))) => {
            if let Err(e) = report(&run, &args.run) {
                error!("failed to record results: {}", e);
                std::process::exit(1);
            }
        }
        Some(Err(e)) => {
            error!("{}", e);
            std::process::exit(1);
        }
        _ => {}
    }
}
