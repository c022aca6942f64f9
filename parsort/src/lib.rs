//! # Parsort
//!
//! Distributed sorting and redistribution of integer sequences over a group of workers
//! that communicate by message passing.
//!
//! Notable features of this library are:
//! * A communicator trait with an in-process backend, for threads, and an MPI backend.
//! * Scatter and gather of a global sequence held by a coordinating worker.
//! * Bitonic, sample and radix sorts of the distributed sequence.
//! * A run driver with parallel search and prime finding, for experiments over a dataset.
//!
//! ## Example
//! ```
//! use parsort::{
//!     comm::run_local, distribute::scatter, sorting::{parallel_sort, SortKind}, Communicator,
//! };
//!
//! let results = run_local(4, |comm| {
//!     let global = if comm.rank() == 0 { vec![5i64, 3, 8, 1, 9, 2, 7, 4] } else { Vec::new() };
//!     let partition = scatter(&global, &comm).unwrap();
//!     parallel_sort(SortKind::Samplesort, partition, &comm).unwrap()
//! });
//!
//! assert_eq!(results[0], vec![1, 2, 3, 4, 5, 7, 8, 9]);
//! ```
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod comm;
pub mod distribute;
pub mod driver;
pub mod helpers;
pub mod io;
pub mod primes;
pub mod search;
pub mod sorting;
pub mod traits;

// Public API
#[doc(inline)]
pub use comm::{run_local, LocalCommunicator};
#[doc(inline)]
pub use driver::{execute, Algorithm, Job, Outcome, Performance, RunReport};
#[doc(inline)]
pub use sorting::{parallel_sort, RadixMode, SortKind};
#[doc(inline)]
pub use traits::{CommError, Communicator, Error, Key, Result};

#[cfg(feature = "mpi")]
#[doc(inline)]
pub use comm::MpiCommunicator;
