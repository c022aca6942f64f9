//! Run a single algorithm over the MPI world, launched with `mpirun`
use clap::Parser;
use log::{error, LevelFilter};
use mpi::traits::Communicator as _;
use parsort::{comm::MpiCommunicator, execute, Communicator, Error};
use scripts::{report, RunArgs};

/// Struct for parsing command-line arguments
#[derive(Parser)]
struct Args {
    #[command(flatten)]
    run: RunArgs,
}

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let universe = mpi::initialize().unwrap();
    let world = universe.world();
    let comm = MpiCommunicator::new(world.duplicate());

    // Every rank parses the arguments, only the coordinator's job is used
    let args = Args::parse();
    let job = args.run.job();

    if comm.is_root() {
        println!("Running on {} processes.", comm.size());
    }

    let job = if comm.is_root() { Some(&job) } else { None };
    match execute(job, &comm) {
        Ok(Some(run)) => {
            if let Err(e) = report(&run, &args.run) {
                error!("failed to record results: {}", e);
            }
        }
        Ok(None) => {}
        // The coordinator has already reported the cause
        Err(Error::Aborted) => std::process::exit(1),
        Err(e) => {
            error!("rank {}: {}", comm.rank(), e);
            std::process::exit(1);
        }
    }
}
