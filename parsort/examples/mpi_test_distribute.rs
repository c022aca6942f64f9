//? mpirun -n {{NPROCESSES}} --features "mpi"

#[cfg(feature = "mpi")]
mod mpi_test {

    use mpi::traits::Communicator as _;
    use parsort::{
        comm::MpiCommunicator,
        distribute::{gather, partition_counts, scatter},
        driver::{execute, Algorithm, Job, Outcome},
        primes::parallel_prime_range,
        search::parallel_search,
        traits::Communicator,
    };

    pub fn main() {
        // Setup MPI
        let universe = mpi::initialize().unwrap();
        let world = universe.world();
        let comm = MpiCommunicator::new(world.duplicate());
        let size = comm.size();
        let rank = comm.rank();

        // Test scatter and gather
        {
            let n = 10 * size + 3;
            let global = if comm.is_root() {
                (0..n as i64).collect::<Vec<_>>()
            } else {
                Vec::new()
            };

            let partition = scatter(&global, &comm).unwrap();
            assert_eq!(partition.len(), partition_counts(n, size)[rank]);

            let gathered = gather(&partition, &comm).unwrap();
            if comm.is_root() {
                assert_eq!(gathered, global);
                println!("...test_scatter_gather passed")
            }
        }

        // Test counts rejected at the root fail on every rank
        {
            let data = vec![1i64, 2, 3];
            let counts = vec![1; size + 1];
            let scattered = comm.scatter_varcount(0, &data, &counts);
            assert!(scattered.is_err());
            comm.barrier().unwrap();
            if comm.is_root() {
                println!("...test_scatter_rejected passed")
            }
        }

        // Test search, duplicates resolve to the lowest global index
        {
            let global = if comm.is_root() {
                vec![4i64, 9, 2, 9, 7, 9, 1]
            } else {
                Vec::new()
            };
            let partition = scatter(&global, &comm).unwrap();
            let found = parallel_search(&partition, 9, 7, &comm).unwrap();
            if comm.is_root() {
                assert_eq!(found, Some(1));
                println!("...test_search passed")
            }
        }

        // Test prime range
        {
            let primes = parallel_prime_range(10, 20, &comm).unwrap();
            if comm.is_root() {
                assert_eq!(primes, vec![11, 13, 17, 19]);
                println!("...test_prime_range passed")
            }
        }

        // Test driver, without input the run is reported as empty
        {
            let job = Job::new(Algorithm::SampleSort);
            let job = if comm.is_root() { Some(&job) } else { None };
            let report = execute(job, &comm).unwrap();
            if let Some(report) = report {
                assert_eq!(report.outcome, Outcome::Empty);
                println!("...test_driver_empty passed")
            }
        }
    }
}

#[cfg(feature = "mpi")]
use mpi_test::main;

#[cfg(not(feature = "mpi"))]
fn main() {}
