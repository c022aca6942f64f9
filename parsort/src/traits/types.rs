//! Utility types for trait definitions.
use std::fmt::Debug;

use num::PrimInt;

/// Rank of a worker within its group, always in `0..size`.
pub type Rank = usize;

/// Rank of the coordinating worker, which owns global input and output.
pub const ROOT: Rank = 0;

/// Types that can be copied byte-wise into exchange buffers.
#[cfg(not(feature = "mpi"))]
pub trait Datatype: bytemuck::Pod {}

#[cfg(not(feature = "mpi"))]
impl<T: bytemuck::Pod> Datatype for T {}

/// Types that can be copied byte-wise into exchange buffers, and that have
/// an MPI datatype equivalent.
#[cfg(feature = "mpi")]
pub trait Datatype: bytemuck::Pod + mpi::traits::Equivalence {}

#[cfg(feature = "mpi")]
impl<T: bytemuck::Pod + mpi::traits::Equivalence> Datatype for T {}

/// Fixed width integer keys that can be sorted and exchanged between workers.
pub trait Key: Datatype + PrimInt + Default + Debug + Send + Sync + 'static {}

impl<T> Key for T where T: Datatype + PrimInt + Default + Debug + Send + Sync + 'static {}

/// Element-wise reduction applied by `reduce` and `all_reduce`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    /// Element-wise maximum
    Max,
    /// Element-wise minimum
    Min,
    /// Element-wise sum
    Sum,
}

impl ReduceOp {
    /// Combine two values.
    pub fn apply<T: Key>(&self, a: T, b: T) -> T {
        match self {
            ReduceOp::Max => a.max(b),
            ReduceOp::Min => a.min(b),
            ReduceOp::Sum => a + b,
        }
    }
}

/// Failures of the message transport. Any of these invalidates the collective
/// state of the whole group.
#[derive(thiserror::Error, Debug)]
pub enum CommError {
    /// A peer has left the group, its end of the channel is closed
    #[error("rank {peer} disconnected")]
    Disconnected {
        /// Rank of the departed peer
        peer: Rank,
    },

    /// A message did not have the length announced for it
    #[error("expected {expected} elements from rank {peer}, received {received}")]
    SizeMismatch {
        /// Rank the message came from
        peer: Rank,
        /// Announced length
        expected: usize,
        /// Actual length
        received: usize,
    },

    /// Attempt to address a rank outside of the group
    #[error("rank {rank} is outside of a group of size {size}")]
    InvalidRank {
        /// Requested rank
        rank: Rank,
        /// Size of the group
        size: usize,
    },

    /// The root of a scatter rejected its arguments and sent nothing
    #[error("scatter rooted at rank {root} was rejected")]
    Rejected {
        /// Root of the collective
        root: Rank,
    },

    /// A message payload was not a whole number of elements
    #[error("malformed message of {bytes} bytes from rank {peer}")]
    Malformed {
        /// Rank the message came from
        peer: Rank,
        /// Payload length in bytes
        bytes: usize,
    },
}

/// Generic error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Communication failure, fatal for the whole group
    #[error("Communication error: {0}")]
    Comm(#[from] CommError),

    /// Bitonic sort requires a power of two number of workers
    #[error("Configuration error: group size {0} is not a power of two")]
    NotPowerOfTwo(usize),

    /// Inclusive range with upper bound below lower bound
    #[error("Configuration error: upper bound {upper} is less than lower bound {lower}")]
    InvalidRange {
        /// Lower bound of the range
        lower: i64,
        /// Upper bound of the range
        upper: i64,
    },

    /// Radix sort only handles non-negative keys
    #[error("Radix sort requires non-negative keys, found {0}")]
    NegativeKey(i64),

    /// The coordinator aborted the run before it started
    #[error("Run aborted by the coordinator")]
    Aborted,

    /// Failed to parse an input dataset
    #[error("Parse error on token {token:?}: {reason}")]
    Parse {
        /// Offending token
        token: String,
        /// Parser message
        reason: String,
    },

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result Type
pub type Result<T> = std::result::Result<T, Error>;
