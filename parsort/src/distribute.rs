//! Distribution of a global sequence held by the coordinator into near equal contiguous
//! partitions, and the inverse gather.
use itertools::Itertools;
use log::debug;
use superslice::Ext;

use crate::{
    helpers::displacements,
    traits::{
        communicator::Communicator,
        types::{Key, Rank, Result, ROOT},
    },
};

/// Partition lengths for `n` elements over `size` ranks. Lengths differ by at most one,
/// the first `n % size` ranks hold the longer partitions.
pub fn partition_counts(n: usize, size: usize) -> Vec<usize> {
    if size == 0 {
        return Vec::new();
    }
    let chunk = n / size;
    let remainder = n % size;
    (0..size)
        .map(|rank| chunk + usize::from(rank < remainder))
        .collect_vec()
}

/// Global index of the first element of each partition.
pub fn partition_displacements(counts: &[usize]) -> Vec<usize> {
    displacements(counts)
}

/// Global index of the first element held by `rank` when `n` elements are partitioned
/// over `size` ranks.
pub fn partition_offset(n: usize, size: usize, rank: Rank) -> usize {
    let chunk = n / size;
    let remainder = n % size;
    rank * chunk + rank.min(remainder)
}

/// Count, per destination rank, the elements at global positions `first..first + len` under
/// the partition layout described by `displs`.
pub fn route_positions(first: usize, len: usize, displs: &[usize], counts: &mut [usize]) {
    for position in first..first + len {
        counts[displs.upper_bound(&position) - 1] += 1;
    }
}

/// Scatter a global sequence from the coordinator. `global` is only read at the coordinator,
/// other ranks may pass an empty slice.
///
/// # Arguments
/// * `global` - The global sequence, significant at the coordinator only.
/// * `comm` - The worker group.
pub fn scatter<T, C>(global: &[T], comm: &C) -> Result<Vec<T>>
where
    T: Key,
    C: Communicator,
{
    let mut n = if comm.is_root() {
        vec![global.len() as u64]
    } else {
        Vec::new()
    };
    comm.broadcast(ROOT, &mut n)?;
    let n = n.first().copied().unwrap_or_default() as usize;

    let counts = partition_counts(n, comm.size());
    if comm.is_root() {
        debug!("scatter {} elements as {:?}", n, counts);
    }

    Ok(comm.scatter_varcount(ROOT, global, &counts)?)
}

/// Gather partitions in ascending rank order at the coordinator. Other ranks receive an
/// empty vector.
pub fn gather<T, C>(partition: &[T], comm: &C) -> Result<Vec<T>>
where
    T: Key,
    C: Communicator,
{
    let global = comm.gather_varcount(ROOT, partition)?;
    Ok(global.unwrap_or_default())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{comm::run_local, helpers::random_fixture};

    #[test]
    fn test_partition_counts() {
        for n in [0usize, 1, 7, 8, 9, 100, 1001] {
            for size in 1..=9 {
                let counts = partition_counts(n, size);
                assert_eq!(counts.len(), size);
                assert_eq!(counts.iter().sum::<usize>(), n);

                let max = *counts.iter().max().unwrap();
                let min = *counts.iter().min().unwrap();
                assert!(max - min <= 1);

                // Longer partitions come first
                for (rank, &count) in counts.iter().enumerate() {
                    assert_eq!(count == max && max != min, rank < n % size);
                }

                let displs = partition_displacements(&counts);
                for rank in 0..size {
                    assert_eq!(displs[rank], partition_offset(n, size, rank));
                }
            }
        }
    }

    #[test]
    fn test_route_positions() {
        // 10 elements over 4 ranks are laid out as [3, 3, 2, 2]
        let displs = partition_displacements(&partition_counts(10, 4));

        let mut counts = vec![0; 4];
        route_positions(2, 5, &displs, &mut counts);
        assert_eq!(counts, vec![1, 3, 1, 0]);

        // Counts accumulate over successive runs
        route_positions(8, 2, &displs, &mut counts);
        assert_eq!(counts, vec![1, 3, 1, 2]);

        route_positions(4, 0, &displs, &mut counts);
        assert_eq!(counts, vec![1, 3, 1, 2]);
    }

    #[test]
    fn test_scatter_gather() {
        let global = random_fixture(103, -1000i64, 1000, Some(3));

        let results = run_local(4, |comm| {
            let data = if comm.is_root() {
                global.clone()
            } else {
                Vec::new()
            };
            let partition = scatter(&data, &comm).unwrap();
            let gathered = gather(&partition, &comm).unwrap();
            (partition, gathered)
        });

        let lengths = results.iter().map(|(p, _)| p.len()).collect_vec();
        assert_eq!(lengths, vec![26, 26, 26, 25]);
        assert_eq!(results[0].1, global);
        assert!(results[1..].iter().all(|(_, g)| g.is_empty()));

        let concatenated = results.iter().flat_map(|(p, _)| p.clone()).collect_vec();
        assert_eq!(concatenated, global);
    }

    #[test]
    fn test_scatter_empty() {
        let results = run_local(3, |comm| {
            let partition = scatter::<i32, _>(&[], &comm).unwrap();
            let gathered = gather(&partition, &comm).unwrap();
            partition.len() + gathered.len()
        });

        assert!(results.iter().all(|&n| n == 0));
    }

    #[test]
    fn test_scatter_fewer_elements_than_ranks() {
        let results = run_local(5, |comm| {
            let data = if comm.is_root() {
                vec![9u32, 8]
            } else {
                Vec::new()
            };
            scatter(&data, &comm).unwrap()
        });

        assert_eq!(results, vec![vec![9], vec![8], vec![], vec![], vec![]]);
    }
}
