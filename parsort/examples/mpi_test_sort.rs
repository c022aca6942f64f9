//? mpirun -n {{NPROCESSES}} --features "mpi"

#[cfg(feature = "mpi")]
mod mpi_test {

    use mpi::traits::Communicator as _;
    use parsort::{
        comm::MpiCommunicator,
        distribute::{gather, partition_counts, scatter},
        helpers::{is_power_of_two, random_fixture},
        sorting::{bitonic_sort, radix_sort, samplesort, RadixMode},
        traits::Communicator,
    };

    /// Check that each partition is locally sorted, and that partitions are ordered by rank
    fn test_sort<C: Communicator>(sorted_arr: &[i64], comm: &C, label: &str) {
        for pair in sorted_arr.windows(2) {
            assert!(pair[0] <= pair[1]);
        }

        // Bounds of every partition, empty partitions report the identity of the ordering
        let min = sorted_arr.iter().min().copied().unwrap_or(i64::MAX);
        let max = sorted_arr.iter().max().copied().unwrap_or(i64::MIN);
        let bounds = comm.gather(0, &[min, max]).unwrap();

        if let Some(bounds) = bounds {
            let mut previous_max = i64::MIN;
            for rank_bounds in bounds.chunks(2) {
                if rank_bounds[0] <= rank_bounds[1] {
                    assert!(previous_max <= rank_bounds[0]);
                    previous_max = rank_bounds[1];
                }
            }
            println!("...test_{} passed", label)
        }
    }

    fn fixture<C: Communicator>(comm: &C, n: usize, min: i64, max: i64) -> Vec<i64> {
        let global = if comm.is_root() {
            random_fixture(n, min, max, Some(0))
        } else {
            Vec::new()
        };
        scatter(&global, comm).unwrap()
    }

    pub fn main() {
        // Setup MPI
        let universe = mpi::initialize().unwrap();
        let world = universe.world();
        let comm = MpiCommunicator::new(world.duplicate());

        // Test Bitonic Sort
        {
            // Only works if the communicator size is a power of two
            if is_power_of_two(comm.size()) {
                let mut arr = fixture(&comm, 1001, -10000, 10000);
                bitonic_sort(&mut arr, &comm).unwrap();
                assert_eq!(arr.len(), partition_counts(1001, comm.size())[comm.rank()]);
                test_sort(&arr, &comm, "bitonic_sort");
            }
        }

        // Test Sample Sort
        {
            let mut arr = fixture(&comm, 1000, 0, 10000);
            samplesort(&mut arr, &comm).unwrap();
            test_sort(&arr, &comm, "samplesort");
        }

        // Test Radix Sort, partitions are only globally ordered when redistributed
        {
            let mut arr = fixture(&comm, 1000, 0, 1000000);
            radix_sort(&mut arr, &comm, RadixMode::Redistribute).unwrap();
            test_sort(&arr, &comm, "radix_sort_redistribute");

            let mut arr = fixture(&comm, 1000, 0, 1000000);
            radix_sort(&mut arr, &comm, RadixMode::Local).unwrap();
            assert!(arr.windows(2).all(|pair| pair[0] <= pair[1]));
            let gathered = gather(&arr, &comm).unwrap();
            if comm.is_root() {
                assert_eq!(gathered.len(), 1000);
                println!("...test_radix_sort_local passed")
            }
        }
    }
}

#[cfg(feature = "mpi")]
use mpi_test::main;

#[cfg(not(feature = "mpi"))]
fn main() {}
