//! # Communicator Backends
//!
//! An in-process backend which runs each rank on its own thread, and an MPI backend
//! for real multi-process runs.
pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi_comm;

pub use local::{run_local, LocalCommunicator};
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiCommunicator;
