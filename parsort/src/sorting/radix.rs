//! Least significant digit radix sort with decimal digits, for non-negative keys.
use itertools::Itertools;
use log::debug;

use crate::{
    distribute::{partition_counts, partition_displacements, route_positions},
    helpers::displacements,
    traits::{
        communicator::Communicator,
        types::{Error, Key, ReduceOp, Result, ROOT},
    },
};

/// Number of buckets per digit
pub const RADIX: usize = 10;

/// How the digit passes of [`radix_sort`] are distributed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RadixMode {
    /// Each pass sorts the local partition only. The partitions are locally sorted on return
    /// but not ordered across ranks; a global sort of the gathered sequence is required, see
    /// [`parallel_sort`](crate::sorting::parallel_sort).
    #[default]
    Local,

    /// Each pass moves every element to the rank owning its global position in the stable
    /// digit order, the partitions are globally sorted on return.
    Redistribute,
}

/// Decimal digit of `value` at position `exp`, i.e. `(value / exp) % 10`.
pub fn digit<T: Key>(value: T, exp: u128) -> usize {
    value
        .to_u128()
        .map_or(0, |v| ((v / exp) % RADIX as u128) as usize)
}

/// Stable counting sort keyed on the digit at `exp`, returns the number of elements with
/// each digit.
pub fn counting_sort_by_digit<T: Key>(arr: &mut Vec<T>, exp: u128) -> [usize; RADIX] {
    let mut histogram = [0usize; RADIX];
    for &value in arr.iter() {
        histogram[digit(value, exp)] += 1;
    }

    let mut next = displacements(&histogram);
    let mut output = vec![T::zero(); arr.len()];
    for &value in arr.iter() {
        let d = digit(value, exp);
        output[next[d]] = value;
        next[d] += 1;
    }

    *arr = output;
    histogram
}

/// Move every element to the rank owning its global position in the stable order of the
/// current digit, global positions are laid out as by [`scatter`](crate::distribute::scatter).
/// `array` must be sorted by the current digit and `histogram` must count its digits.
fn redistribute<T, C>(
    array: &mut Vec<T>,
    histogram: &[usize; RADIX],
    exp: u128,
    n_total: usize,
    comm: &C,
) -> Result<()>
where
    T: Key,
    C: Communicator,
{
    let size = comm.size();
    let rank = comm.rank();

    // histograms[r * RADIX + d] counts digit d at rank r
    let local = histogram.iter().map(|&c| c as u64).collect_vec();
    let mut histograms = comm.gather(ROOT, &local)?.unwrap_or_default();
    comm.broadcast(ROOT, &mut histograms)?;

    let totals = (0..RADIX)
        .map(|d| (0..size).map(|r| histograms[r * RADIX + d]).sum::<u64>())
        .collect_vec();
    let digit_starts = displacements(&totals);
    let layout = partition_displacements(&partition_counts(n_total, size));

    // Global positions increase along the local array, so destinations are contiguous
    let mut counts = vec![0usize; size];
    for d in 0..RADIX {
        let preceding = (0..rank).map(|r| histograms[r * RADIX + d]).sum::<u64>();
        let first = (digit_starts[d] + preceding) as usize;
        route_positions(first, histogram[d], &layout, &mut counts);
    }

    let mut received = comm.all_to_all_varcount(&array[..], &counts)?;

    // Sources arrive in rank order, a stable pass restores global position order
    counting_sort_by_digit(&mut received, exp);
    *array = received;

    Ok(())
}

/// Parallel radix sort of non-negative keys, one stable counting sort per decimal digit of
/// the largest key in the group, with a barrier after every pass.
///
/// # Arguments
/// * `array`- Local part of distributed array to be sorted
/// * `comm`- The worker group
/// * `mode`- Whether digit passes redistribute elements between ranks
pub fn radix_sort<T, C>(array: &mut Vec<T>, comm: &C, mode: RadixMode) -> Result<()>
where
    T: Key,
    C: Communicator,
{
    let local_min = array.iter().min().copied().unwrap_or_else(T::zero);
    let global_min = comm.all_reduce(&[local_min], ReduceOp::Min)?[0];
    if global_min < T::zero() {
        return Err(Error::NegativeKey(global_min.to_i64().unwrap_or(i64::MIN)));
    }

    let local_max = array.iter().max().copied().unwrap_or_else(T::zero);
    let global_max = comm.all_reduce(&[local_max], ReduceOp::Max)?[0]
        .to_u128()
        .unwrap_or_default();

    let n_total = match mode {
        RadixMode::Local => array.len(),
        RadixMode::Redistribute => {
            comm.all_reduce(&[array.len() as u64], ReduceOp::Sum)?[0] as usize
        }
    };

    let mut exp = 1u128;
    let mut n_passes = 0;
    while global_max / exp > 0 {
        let histogram = counting_sort_by_digit(array, exp);
        if mode == RadixMode::Redistribute {
            redistribute(array, &histogram, exp, n_total, comm)?;
        }
        comm.barrier()?;
        n_passes += 1;

        exp = match exp.checked_mul(RADIX as u128) {
            Some(exp) => exp,
            None => break,
        };
    }

    debug!(
        "rank {} radix sort complete after {} passes with {} elements",
        comm.rank(),
        n_passes,
        array.len()
    );

    Ok(())
}
