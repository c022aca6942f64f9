//! Implementation of a block bitonic sort over a hypercube of workers
use itertools::Itertools;
use log::{debug, trace};

use crate::{
    distribute::{partition_counts, partition_displacements, route_positions},
    helpers::is_power_of_two,
    traits::{
        communicator::Communicator,
        types::{Error, Key, ReduceOp, Result},
    },
};

/// Compare two elements of `arr` and swap them if they are out of order in the given
/// direction.
fn compare_exchange<T: Ord>(arr: &mut [T], i: usize, j: usize, ascending: bool) {
    if (ascending && arr[i] > arr[j]) || (!ascending && arr[i] < arr[j]) {
        arr.swap(i, j);
    }
}

/// Merge a bitonic sequence of power of two length into a monotonic one.
fn bitonic_merge<T: Ord>(arr: &mut [T], ascending: bool) {
    let len = arr.len();
    if len > 1 {
        let half = len / 2;
        for i in 0..half {
            compare_exchange(arr, i, i + half, ascending);
        }
        let (lower, upper) = arr.split_at_mut(half);
        bitonic_merge(lower, ascending);
        bitonic_merge(upper, ascending);
    }
}

fn bitonic_network<T: Ord>(arr: &mut [T], ascending: bool) {
    let len = arr.len();
    if len > 1 {
        let half = len / 2;
        let (lower, upper) = arr.split_at_mut(half);
        bitonic_network(lower, true);
        bitonic_network(upper, false);
        bitonic_merge(arr, ascending);
    }
}

/// Sort a local buffer ascending with a bitonic compare-exchange network. Buffers whose length
/// is not a power of two are padded with `T::max_value()`, which is removed afterwards.
pub fn bitonic_sort_local<T: Key>(arr: &mut Vec<T>) {
    let len = arr.len();
    if len < 2 {
        return;
    }

    arr.resize(len.next_power_of_two(), T::max_value());
    bitonic_network(arr, true);
    arr.truncate(len);
}

/// Merge two ascending runs of equal length and keep either the lower or the upper half.
fn merge_split<T: Key>(local: &[T], partner: &[T], keep_lower: bool) -> Vec<T> {
    let len = local.len();
    let merged = local.iter().merge(partner.iter()).copied();
    if keep_lower {
        merged.take(len).collect_vec()
    } else {
        merged.skip(len).collect_vec()
    }
}

/// Parallel bitonic sort. On return each rank holds an ascending partition, and every element
/// held by rank `r` is less than or equal to every element held by rank `r + 1`. The sorted
/// partitions follow the layout of [`scatter`](crate::distribute::scatter) for the total
/// number of elements in the group.
///
/// Partitions of unequal length are padded with `T::max_value()` to the longest partition in
/// the group so that every exchange is of equal size. The padding is dropped after the network
/// and the remaining elements are redistributed to the partition layout.
///
/// # Arguments
/// * `array`- Local part of distributed array to be sorted
/// * `comm`- The worker group, its size must be a power of two
pub fn bitonic_sort<T, C>(array: &mut Vec<T>, comm: &C) -> Result<()>
where
    T: Key,
    C: Communicator,
{
    let size = comm.size();
    let rank = comm.rank();

    // Every rank sees the same size, so all of them refuse together
    if !is_power_of_two(size) {
        return Err(Error::NotPowerOfTwo(size));
    }

    // Perform local sort
    array.sort();

    let n_local = array.len() as u64;
    let n_max = comm.all_reduce(&[n_local], ReduceOp::Max)?[0] as usize;
    let n_total = comm.all_reduce(&[n_local], ReduceOp::Sum)?[0] as usize;

    // Padding sorts to the tail of the global sequence
    array.resize(n_max, T::max_value());

    let mut k = 2;
    while k <= size {
        let mut j = k / 2;
        while j > 0 {
            let partner = rank ^ j;
            if partner < size {
                let received = comm.send_receive(partner, &array[..])?;
                let ascending = (rank / k) % 2 == 0;
                let keep_lower = (rank < partner) == ascending;
                trace!(
                    "rank {} stage {} step {} partner {} keep_lower {}",
                    rank,
                    k,
                    j,
                    partner,
                    keep_lower
                );
                *array = merge_split(&array[..], &received, keep_lower);
            }
            comm.barrier()?;
            j /= 2;
        }
        k *= 2;
    }

    bitonic_sort_local(array);

    // Drop padding, rank r owns global positions [r * n_max, (r + 1) * n_max)
    let n_keep = n_total.saturating_sub(rank * n_max).min(n_max);
    array.truncate(n_keep);

    // Return to the scatter layout, blocks arrive in rank order and stay sorted
    let layout = partition_displacements(&partition_counts(n_total, size));
    let mut counts = vec![0usize; size];
    route_positions(rank * n_max, array.len(), &layout, &mut counts);
    *array = comm.all_to_all_varcount(&array[..], &counts)?;

    debug!(
        "rank {} bitonic sort complete with {} elements",
        rank,
        array.len()
    );

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        comm::run_local,
        distribute::{gather, scatter},
        helpers::random_fixture,
        traits::types::ROOT,
    };

    fn sort_global(global: &[i64], size: usize) -> Vec<Result<Vec<i64>>> {
        run_local(size, |comm| {
            let data = if comm.is_root() {
                global.to_vec()
            } else {
                Vec::new()
            };
            let mut partition = scatter(&data, &comm)?;
            bitonic_sort(&mut partition, &comm)?;
            gather(&partition, &comm)
        })
    }

    #[test]
    fn test_local_network() {
        for n in [0usize, 1, 2, 3, 5, 8, 13, 64, 100] {
            let mut arr = random_fixture(n, -50i32, 50, Some(n as u64));
            let mut expected = arr.clone();
            expected.sort();
            bitonic_sort_local(&mut arr);
            assert_eq!(arr, expected);
        }
    }

    #[test]
    fn test_merge_split() {
        let a = [1i32, 4, 6, 9];
        let b = [2i32, 3, 7, 8];
        assert_eq!(merge_split(&a, &b, true), vec![1, 2, 3, 4]);
        assert_eq!(merge_split(&a, &b, false), vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_bitonic_example() {
        let results = sort_global(&[5, 3, 8, 1, 9, 2, 7, 4], 4);
        assert_eq!(
            results[ROOT].as_ref().unwrap(),
            &vec![1, 2, 3, 4, 5, 7, 8, 9]
        );
    }

    #[test]
    fn test_bitonic_sort() {
        for size in [1, 2, 4, 8] {
            for n in [1usize, 7, 64, 333] {
                let global = random_fixture(n, -100i64, 100, Some(n as u64));
                let mut expected = global.clone();
                expected.sort();

                let results = sort_global(&global, size);
                assert_eq!(results[ROOT].as_ref().unwrap(), &expected);
            }
        }
    }

    #[test]
    fn test_bitonic_partitions_ordered() {
        for (n, size) in [(250usize, 8usize), (5, 4), (3, 8), (17, 2)] {
            let global = random_fixture(n, 0i64, 20, Some(11));
            let results = run_local(size, |comm| {
                let data = if comm.is_root() {
                    global.clone()
                } else {
                    Vec::new()
                };
                let mut partition = scatter(&data, &comm).unwrap();
                bitonic_sort(&mut partition, &comm).unwrap();
                partition
            });

            // Partition lengths are those handed out by scatter
            let lengths = results.iter().map(|p| p.len()).collect_vec();
            assert_eq!(lengths, partition_counts(n, size));

            let flat = results.concat();
            assert_eq!(flat.len(), n);
            assert!(flat.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_bitonic_extreme_values() {
        let global = vec![i64::MAX, i64::MIN, 0, i64::MAX, -1, i64::MAX];
        let results = sort_global(&global, 4);
        assert_eq!(
            results[ROOT].as_ref().unwrap(),
            &vec![i64::MIN, -1, 0, i64::MAX, i64::MAX, i64::MAX]
        );
    }

    #[test]
    fn test_bitonic_sorted_and_empty() {
        let sorted = (0..40).collect_vec();
        let results = sort_global(&sorted, 4);
        assert_eq!(results[ROOT].as_ref().unwrap(), &sorted);

        let results = sort_global(&[], 4);
        assert!(results.iter().all(|r| r.as_ref().unwrap().is_empty()));
    }

    #[test]
    fn test_bitonic_rejects_group_size() {
        let results = sort_global(&[3, 1, 2], 3);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(Error::NotPowerOfTwo(3)))));
    }
}
