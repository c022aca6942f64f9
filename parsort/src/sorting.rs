//! Parallel sorting algorithms
pub mod bitonic;
pub mod radix;
pub mod samplesort;

pub use bitonic::{bitonic_sort, bitonic_sort_local};
pub use radix::{radix_sort, RadixMode};
pub use samplesort::samplesort;

use std::fmt;

use log::debug;

use crate::{
    distribute::gather,
    traits::{
        communicator::Communicator,
        types::{Key, Result},
    },
};

/// Choice of distributed sorting algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKind {
    /// Hypercube bitonic sort, requires a power of two number of workers
    Bitonic,

    /// Splitter based sample sort, any number of workers
    Samplesort,

    /// Decimal radix sort of non-negative keys
    Radix {
        /// Distribution of the digit passes
        mode: RadixMode,
    },
}

impl fmt::Display for SortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKind::Bitonic => write!(f, "Bitonic Sort"),
            SortKind::Samplesort => write!(f, "Sample Sort"),
            SortKind::Radix { .. } => write!(f, "Radix Sort"),
        }
    }
}

/// Sort a partitioned sequence and gather it, ordered, at the coordinator. Other ranks
/// receive an empty vector.
///
/// # Arguments
/// * `kind` - The sorting algorithm.
/// * `array`- Local part of distributed array to be sorted
/// * `comm`- The worker group
pub fn parallel_sort<T, C>(kind: SortKind, mut array: Vec<T>, comm: &C) -> Result<Vec<T>>
where
    T: Key,
    C: Communicator,
{
    match kind {
        SortKind::Bitonic => bitonic_sort(&mut array, comm)?,
        SortKind::Samplesort => samplesort(&mut array, comm)?,
        SortKind::Radix { mode } => radix_sort(&mut array, comm, mode)?,
    }

    let mut global = gather(&array, comm)?;

    // Local digit passes leave the partitions unordered with respect to each other
    let unordered = matches!(kind, SortKind::Radix { mode } if mode == RadixMode::Local);
    if unordered && comm.is_root() {
        debug!("final sort of {} gathered elements", global.len());
        global.sort();
    }

    Ok(global)
}
