//! # Trait Definitions
pub mod communicator;
pub mod types;

pub use communicator::Communicator;
pub use types::{CommError, Error, Key, Rank, ReduceOp, Result, ROOT};
