//! Parallel linear search over a partitioned sequence.
use log::debug;

use crate::{
    distribute::partition_offset,
    traits::{
        communicator::Communicator,
        types::{Key, ReduceOp, Result, ROOT},
    },
};

/// Marks a partition without a match in the reduction
const NOT_FOUND: u64 = u64::MAX;

/// Find the lowest global index of `target` in a sequence scattered as by
/// [`scatter`](crate::distribute::scatter). The result is only significant at the
/// coordinator, other ranks receive `None`.
///
/// # Arguments
/// * `local` - This rank's partition.
/// * `target` - The value searched for.
/// * `global_len` - Length of the scattered sequence, used to locate the partition.
/// * `comm` - The worker group.
pub fn parallel_search<T, C>(
    local: &[T],
    target: T,
    global_len: usize,
    comm: &C,
) -> Result<Option<usize>>
where
    T: Key,
    C: Communicator,
{
    let offset = partition_offset(global_len, comm.size(), comm.rank());

    let candidate = local
        .iter()
        .position(|&value| value == target)
        .map_or(NOT_FOUND, |i| (offset + i) as u64);

    let found = comm.reduce(ROOT, &[candidate], ReduceOp::Min)?;

    Ok(found.and_then(|min| {
        let index = min.first().copied().unwrap_or(NOT_FOUND);
        debug!("search for {:?} reduced to {}", target, index);
        (index != NOT_FOUND).then_some(index as usize)
    }))
}
