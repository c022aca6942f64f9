//! Implementation of Sample Sort algorithm
use itertools::Itertools;
use log::debug;
use superslice::Ext;

use crate::traits::{
    communicator::Communicator,
    types::{Key, Result, ROOT},
};

/// Evenly spaced splitter candidates from a locally sorted array, `size - 1` of them for a
/// non-empty array and a group of more than one worker, none otherwise.
pub fn local_candidates<T: Key>(sorted: &[T], size: usize) -> Vec<T> {
    if sorted.is_empty() || size < 2 {
        return Vec::new();
    }

    let n_candidates = size - 1;
    (0..n_candidates)
        .map(|i| sorted[(i * sorted.len()) / n_candidates])
        .collect_vec()
}

/// Choose `size - 1` global splitters from the gathered candidates, sampled at even
/// percentiles of the sorted and deduplicated candidate set. Without any candidates every
/// splitter is `T::min_value()`, which routes all values above it to the last bucket.
pub fn select_splitters<T: Key>(mut candidates: Vec<T>, size: usize) -> Vec<T> {
    let n_splitters = size.saturating_sub(1);

    candidates.sort();
    candidates.dedup();

    let count = candidates.len();
    if count == 0 {
        return vec![T::min_value(); n_splitters];
    }

    (0..n_splitters)
        .map(|i| candidates[((i + 1) * count / size).min(count - 1)])
        .collect_vec()
}

/// Bucket index of `value`, the first splitter greater than or equal to it. Values above
/// every splitter go to the last bucket, `splitters.len()`.
pub fn bucket_index<T: Key>(splitters: &[T], value: &T) -> usize {
    splitters.lower_bound(value)
}

/// Number of elements of a locally sorted array falling in each of the `splitters.len() + 1`
/// buckets. Buckets are contiguous in the sorted array.
pub fn bucket_counts<T: Key>(sorted: &[T], splitters: &[T]) -> Vec<usize> {
    let mut counts = vec![0usize; splitters.len() + 1];
    for value in sorted.iter() {
        counts[bucket_index(splitters, value)] += 1;
    }
    counts
}

/// A sample sort, valid for any number of workers. Splitter candidates are sampled at
/// evenly spaced positions of each locally sorted partition, and resampled at the
/// coordinator into a global splitter set which defines a bucket per rank. On return rank
/// `r` holds bucket `r`, in ascending order.
///
/// # Arguments
/// * `array`- Local part of distributed array to be sorted
/// * `comm`- The worker group
pub fn samplesort<T, C>(array: &mut Vec<T>, comm: &C) -> Result<()>
where
    T: Key,
    C: Communicator,
{
    let size = comm.size();

    // Perform local sort
    array.sort();

    // 1. Gather local candidates at the coordinator
    let candidates = local_candidates(&array[..], size);
    let gathered = comm.gather_varcount(ROOT, &candidates)?;

    // 2. Coordinator selects global splitters, which define a bucket per rank
    let mut splitters = match gathered {
        Some(gathered) => {
            let splitters = select_splitters(gathered, size);
            debug!("sample sort splitters {:?}", splitters);
            splitters
        }
        None => Vec::new(),
    };
    comm.broadcast(ROOT, &mut splitters)?;

    // 3. Route local elements, buckets are contiguous as the array is sorted
    let counts = bucket_counts(&array[..], &splitters);

    // 4. Exchange buckets
    let mut received = comm.all_to_all_varcount(&array[..], &counts)?;
    received.sort();
    *array = received;

    debug!(
        "rank {} sample sort complete with {} elements",
        comm.rank(),
        array.len()
    );

    Ok(())
}
