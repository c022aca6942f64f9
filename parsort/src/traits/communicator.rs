//! Message passing interface shared by all sorting algorithms.
use crate::traits::types::{CommError, Key, Rank, ReduceOp, ROOT};

/// A fixed group of workers that exchange data only through messages.
///
/// Every collective must be called by all ranks of the group, in the same order,
/// otherwise the group deadlocks. Buffers are always copied, ownership of a
/// sent slice stays with the sender.
///
/// Arguments documented as significant only at `root` are ignored on other ranks.
pub trait Communicator {
    /// Rank of this worker.
    fn rank(&self) -> Rank;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Whether this worker is the coordinator.
    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }

    /// Send a buffer to `dest`.
    fn send<T: Key>(&self, dest: Rank, data: &[T]) -> Result<(), CommError>;

    /// Receive the next buffer sent by `source`.
    fn receive<T: Key>(&self, source: Rank) -> Result<Vec<T>, CommError>;

    /// Exchange buffers with `partner`, which must call this method with this rank as its partner.
    fn send_receive<T: Key>(&self, partner: Rank, data: &[T]) -> Result<Vec<T>, CommError>;

    /// Replace `data` on every rank by the contents of `data` at `root`.
    fn broadcast<T: Key>(&self, root: Rank, data: &mut Vec<T>) -> Result<(), CommError>;

    /// Element-wise reduction of equal length buffers, the result is only returned at `root`.
    fn reduce<T: Key>(
        &self,
        root: Rank,
        data: &[T],
        op: ReduceOp,
    ) -> Result<Option<Vec<T>>, CommError>;

    /// Element-wise reduction of equal length buffers, returned on every rank.
    fn all_reduce<T: Key>(&self, data: &[T], op: ReduceOp) -> Result<Vec<T>, CommError>;

    /// Concatenate equal length buffers in rank order at `root`.
    fn gather<T: Key>(&self, root: Rank, data: &[T]) -> Result<Option<Vec<T>>, CommError>;

    /// Concatenate buffers of any length in rank order at `root`. Buffer lengths are
    /// exchanged before the payload.
    fn gather_varcount<T: Key>(&self, root: Rank, data: &[T]) -> Result<Option<Vec<T>>, CommError>;

    /// Split `data` at `root` into consecutive slices of `counts[r]` elements and deliver
    /// slice `r` to rank `r`. `data` and `counts` are significant only at `root`.
    ///
    /// If `counts` does not describe `data`, the root returns [`CommError::SizeMismatch`] and
    /// every other rank returns [`CommError::Rejected`].
    fn scatter_varcount<T: Key>(
        &self,
        root: Rank,
        data: &[T],
        counts: &[usize],
    ) -> Result<Vec<T>, CommError>;

    /// Send block `r` of `data` to rank `r`, where `data` holds `size` blocks of equal length.
    /// Received blocks are concatenated in source rank order.
    fn all_to_all<T: Key>(&self, data: &[T]) -> Result<Vec<T>, CommError>;

    /// Send the `counts[r]` elements of `data` starting at the sum of the preceding counts to
    /// rank `r`. Counts are exchanged before the payload, received slices are concatenated in
    /// source rank order.
    fn all_to_all_varcount<T: Key>(
        &self,
        data: &[T],
        counts: &[usize],
    ) -> Result<Vec<T>, CommError>;

    /// Block until every rank of the group has reached the barrier.
    fn barrier(&self) -> Result<(), CommError>;
}
