//! MPI backend, every rank is a separate process launched with `mpirun`.
//!
//! MPI aborts the job on transport failures, so apart from rank validation these
//! implementations do not produce communication errors.
use itertools::Itertools;
use log::trace;
use mpi::{
    collective::SystemOperation,
    datatype::{Partition, PartitionMut},
    point_to_point::send_receive_into,
    topology::SimpleCommunicator,
    traits::{
        Communicator as MpiCommunicatorTrait, CommunicatorCollectives, Destination, Root, Source,
    },
    Count,
};

use crate::{
    helpers::displacements,
    traits::{
        communicator::Communicator,
        types::{CommError, Key, Rank, ReduceOp},
    },
};

impl From<ReduceOp> for SystemOperation {
    fn from(op: ReduceOp) -> Self {
        match op {
            ReduceOp::Max => SystemOperation::max(),
            ReduceOp::Min => SystemOperation::min(),
            ReduceOp::Sum => SystemOperation::sum(),
        }
    }
}

/// A worker group backed by an MPI communicator.
pub struct MpiCommunicator<C: MpiCommunicatorTrait = SimpleCommunicator> {
    comm: C,
}

impl<C: MpiCommunicatorTrait> MpiCommunicator<C> {
    /// Wrap an MPI communicator, usually a duplicate of the world communicator.
    pub fn new(comm: C) -> Self {
        Self { comm }
    }

    /// Underlying MPI communicator
    pub fn raw(&self) -> &C {
        &self.comm
    }

    fn check_rank(&self, rank: Rank) -> Result<mpi::Rank, CommError> {
        if rank < self.size() {
            Ok(rank as mpi::Rank)
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.size(),
            })
        }
    }
}

fn to_counts(counts: &[usize]) -> Vec<Count> {
    counts.iter().map(|&c| c as Count).collect_vec()
}

impl<C: MpiCommunicatorTrait> Communicator for MpiCommunicator<C> {
    fn rank(&self) -> Rank {
        self.comm.rank() as Rank
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn send<T: Key>(&self, dest: Rank, data: &[T]) -> Result<(), CommError> {
        let dest = self.check_rank(dest)?;
        trace!(
            "rank {} send {} elements to {}",
            self.rank(),
            data.len(),
            dest
        );
        self.comm.process_at_rank(dest).send(data);
        Ok(())
    }

    fn receive<T: Key>(&self, source: Rank) -> Result<Vec<T>, CommError> {
        let source = self.check_rank(source)?;
        let (received, _status) = self.comm.process_at_rank(source).receive_vec::<T>();
        Ok(received)
    }

    fn send_receive<T: Key>(&self, partner: Rank, data: &[T]) -> Result<Vec<T>, CommError> {
        let partner = self.check_rank(partner)?;
        trace!(
            "rank {} exchange {} elements with {}",
            self.rank(),
            data.len(),
            partner
        );
        let partner_process = self.comm.process_at_rank(partner);

        let mut count = 0u64;
        send_receive_into(
            &(data.len() as u64),
            &partner_process,
            &mut count,
            &partner_process,
        );

        let mut received = vec![T::default(); count as usize];
        send_receive_into(data, &partner_process, &mut received[..], &partner_process);
        Ok(received)
    }

    fn broadcast<T: Key>(&self, root: Rank, data: &mut Vec<T>) -> Result<(), CommError> {
        let root = self.check_rank(root)?;
        let root_process = self.comm.process_at_rank(root);

        let mut len = data.len() as u64;
        root_process.broadcast_into(&mut len);
        if self.comm.rank() != root {
            *data = vec![T::default(); len as usize];
        }
        root_process.broadcast_into(&mut data[..]);
        Ok(())
    }

    fn reduce<T: Key>(
        &self,
        root: Rank,
        data: &[T],
        op: ReduceOp,
    ) -> Result<Option<Vec<T>>, CommError> {
        let root = self.check_rank(root)?;
        let root_process = self.comm.process_at_rank(root);

        if self.comm.rank() == root {
            let mut result = vec![T::default(); data.len()];
            root_process.reduce_into_root(data, &mut result[..], SystemOperation::from(op));
            Ok(Some(result))
        } else {
            root_process.reduce_into(data, SystemOperation::from(op));
            Ok(None)
        }
    }

    fn all_reduce<T: Key>(&self, data: &[T], op: ReduceOp) -> Result<Vec<T>, CommError> {
        let mut result = vec![T::default(); data.len()];
        self.comm
            .all_reduce_into(data, &mut result[..], SystemOperation::from(op));
        Ok(result)
    }

    fn gather<T: Key>(&self, root: Rank, data: &[T]) -> Result<Option<Vec<T>>, CommError> {
        let root = self.check_rank(root)?;
        let root_process = self.comm.process_at_rank(root);

        if self.comm.rank() == root {
            let mut result = vec![T::default(); data.len() * self.size()];
            root_process.gather_into_root(data, &mut result[..]);
            Ok(Some(result))
        } else {
            root_process.gather_into(data);
            Ok(None)
        }
    }

    fn gather_varcount<T: Key>(&self, root: Rank, data: &[T]) -> Result<Option<Vec<T>>, CommError> {
        let root = self.check_rank(root)?;
        let root_process = self.comm.process_at_rank(root);
        let count = data.len() as Count;

        if self.comm.rank() == root {
            let mut counts = vec![0 as Count; self.size()];
            root_process.gather_into_root(&count, &mut counts[..]);

            let displs = displacements(&counts);
            let total = counts.iter().sum::<Count>();
            let mut result = vec![T::default(); total as usize];
            {
                let mut partition = PartitionMut::new(&mut result[..], counts, &displs[..]);
                root_process.gather_varcount_into_root(data, &mut partition);
            }
            Ok(Some(result))
        } else {
            root_process.gather_into(&count);
            root_process.gather_varcount_into(data);
            Ok(None)
        }
    }

    fn scatter_varcount<T: Key>(
        &self,
        root: Rank,
        data: &[T],
        counts: &[usize],
    ) -> Result<Vec<T>, CommError> {
        let root = self.check_rank(root)?;
        let root_process = self.comm.process_at_rank(root);
        let mut count: Count = 0;

        if self.comm.rank() == root {
            let total = counts.iter().sum::<usize>();
            if counts.len() != self.size() || total != data.len() {
                // A negative count releases the other ranks before the payload
                let rejected = vec![-1 as Count; self.size()];
                root_process.scatter_into_root(&rejected[..], &mut count);
                return Err(CommError::SizeMismatch {
                    peer: root as Rank,
                    expected: total,
                    received: data.len(),
                });
            }

            let counts = to_counts(counts);
            root_process.scatter_into_root(&counts[..], &mut count);

            let displs = displacements(&counts);
            let mut local = vec![T::default(); count as usize];
            let partition = Partition::new(data, counts, &displs[..]);
            root_process.scatter_varcount_into_root(&partition, &mut local[..]);
            Ok(local)
        } else {
            root_process.scatter_into(&mut count);
            if count < 0 {
                let root = root as Rank;
                return Err(CommError::Rejected { root });
            }
            let mut local = vec![T::default(); count as usize];
            root_process.scatter_varcount_into(&mut local[..]);
            Ok(local)
        }
    }

    fn all_to_all<T: Key>(&self, data: &[T]) -> Result<Vec<T>, CommError> {
        if data.len() % self.size() != 0 {
            return Err(CommError::SizeMismatch {
                peer: self.rank(),
                expected: (data.len() / self.size() + 1) * self.size(),
                received: data.len(),
            });
        }

        let mut result = vec![T::default(); data.len()];
        self.comm.all_to_all_into(data, &mut result[..]);
        Ok(result)
    }

    fn all_to_all_varcount<T: Key>(
        &self,
        data: &[T],
        counts: &[usize],
    ) -> Result<Vec<T>, CommError> {
        let total = counts.iter().sum::<usize>();
        if counts.len() != self.size() || total != data.len() {
            return Err(CommError::SizeMismatch {
                peer: self.rank(),
                expected: total,
                received: data.len(),
            });
        }

        let counts_snd = to_counts(counts);
        let displs_snd = displacements(&counts_snd);

        let mut counts_recv = vec![0 as Count; self.size()];
        self.comm
            .all_to_all_into(&counts_snd[..], &mut counts_recv[..]);

        let displs_recv = displacements(&counts_recv);
        let total = counts_recv.iter().sum::<Count>();

        let mut received = vec![T::default(); total as usize];
        {
            let mut partition_received =
                PartitionMut::new(&mut received[..], counts_recv, &displs_recv[..]);
            let partition_snd = Partition::new(data, counts_snd, &displs_snd[..]);
            self.comm
                .all_to_all_varcount_into(&partition_snd, &mut partition_received);
        }
        Ok(received)
    }

    fn barrier(&self) -> Result<(), CommError> {
        self.comm.barrier();
        Ok(())
    }
}
