//! In-process communicator. Each rank runs on its own thread and owns one end of a
//! channel to every rank of the group, including itself. Channels are FIFO per ordered
//! pair of ranks, which is sufficient to match messages as every rank issues its
//! collectives in the same order.
use std::{
    mem::size_of,
    sync::mpsc::{channel, Receiver, Sender},
    thread,
};

use itertools::Itertools;
use log::trace;

use crate::{
    helpers::displacements,
    traits::{
        communicator::Communicator,
        types::{CommError, Key, Rank, ReduceOp, ROOT},
    },
};

/// Raw message, the byte image of a slice of keys
type Message = Vec<u8>;

/// Count announced by a scatter root that rejected its arguments
const REJECTED: u64 = u64::MAX;

/// One rank of an in-process group.
pub struct LocalCommunicator {
    rank: Rank,
    size: usize,
    /// `senders[r]` posts to rank `r`
    senders: Vec<Sender<Message>>,
    /// `receivers[r]` drains messages posted by rank `r`
    receivers: Vec<Receiver<Message>>,
}

impl LocalCommunicator {
    /// Create a fully connected group of `size` ranks, returned in rank order.
    pub fn group(size: usize) -> Vec<LocalCommunicator> {
        let mut senders = (0..size).map(|_| Vec::with_capacity(size)).collect_vec();
        let mut receivers = (0..size).map(|_| Vec::with_capacity(size)).collect_vec();

        for source in 0..size {
            for dest in 0..size {
                let (tx, rx) = channel();
                senders[source].push(tx);
                receivers[dest].push(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| LocalCommunicator {
                rank,
                size,
                senders,
                receivers,
            })
            .collect_vec()
    }

    fn check_rank(&self, rank: Rank) -> Result<(), CommError> {
        if rank < self.size {
            Ok(())
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.size,
            })
        }
    }

    fn post<T: Key>(&self, dest: Rank, data: &[T]) -> Result<(), CommError> {
        self.check_rank(dest)?;
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.senders[dest]
            .send(bytes.to_vec())
            .map_err(|_| CommError::Disconnected { peer: dest })
    }

    fn fetch<T: Key>(&self, source: Rank) -> Result<Vec<T>, CommError> {
        self.check_rank(source)?;
        let bytes = self.receivers[source]
            .recv()
            .map_err(|_| CommError::Disconnected { peer: source })?;

        let width = size_of::<T>();
        if bytes.len() % width != 0 {
            return Err(CommError::Malformed {
                peer: source,
                bytes: bytes.len(),
            });
        }

        Ok(bytes
            .chunks_exact(width)
            .map(bytemuck::pod_read_unaligned)
            .collect_vec())
    }

    /// Fetch a message that must contain exactly `expected` elements
    fn fetch_exact<T: Key>(&self, source: Rank, expected: usize) -> Result<Vec<T>, CommError> {
        let received = self.fetch(source)?;
        if received.len() != expected {
            return Err(CommError::SizeMismatch {
                peer: source,
                expected,
                received: received.len(),
            });
        }
        Ok(received)
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send<T: Key>(&self, dest: Rank, data: &[T]) -> Result<(), CommError> {
        trace!(
            "rank {} send {} elements to {}",
            self.rank,
            data.len(),
            dest
        );
        self.post(dest, data)
    }

    fn receive<T: Key>(&self, source: Rank) -> Result<Vec<T>, CommError> {
        self.fetch(source)
    }

    fn send_receive<T: Key>(&self, partner: Rank, data: &[T]) -> Result<Vec<T>, CommError> {
        trace!(
            "rank {} exchange {} elements with {}",
            self.rank,
            data.len(),
            partner
        );
        // Channels are unbounded, posting first cannot block
        self.post(partner, data)?;
        self.fetch(partner)
    }

    fn broadcast<T: Key>(&self, root: Rank, data: &mut Vec<T>) -> Result<(), CommError> {
        self.check_rank(root)?;
        if self.rank == root {
            for dest in (0..self.size).filter(|&r| r != root) {
                self.post(dest, data)?;
            }
        } else {
            *data = self.fetch(root)?;
        }
        Ok(())
    }

    fn reduce<T: Key>(
        &self,
        root: Rank,
        data: &[T],
        op: ReduceOp,
    ) -> Result<Option<Vec<T>>, CommError> {
        self.check_rank(root)?;
        if self.rank != root {
            self.post(root, data)?;
            return Ok(None);
        }

        let mut result = data.to_vec();
        for source in (0..self.size).filter(|&r| r != root) {
            let contribution = self.fetch_exact::<T>(source, data.len())?;
            for (acc, &x) in result.iter_mut().zip(contribution.iter()) {
                *acc = op.apply(*acc, x);
            }
        }
        Ok(Some(result))
    }

    fn all_reduce<T: Key>(&self, data: &[T], op: ReduceOp) -> Result<Vec<T>, CommError> {
        let mut result = self.reduce(ROOT, data, op)?.unwrap_or_default();
        self.broadcast(ROOT, &mut result)?;
        Ok(result)
    }

    fn gather<T: Key>(&self, root: Rank, data: &[T]) -> Result<Option<Vec<T>>, CommError> {
        self.check_rank(root)?;
        if self.rank != root {
            self.post(root, data)?;
            return Ok(None);
        }

        let mut result = Vec::with_capacity(data.len() * self.size);
        for source in 0..self.size {
            if source == root {
                result.extend_from_slice(data);
            } else {
                result.extend(self.fetch_exact::<T>(source, data.len())?);
            }
        }
        Ok(Some(result))
    }

    fn gather_varcount<T: Key>(&self, root: Rank, data: &[T]) -> Result<Option<Vec<T>>, CommError> {
        // Phase 1: sizes
        let counts = self.gather(root, &[data.len() as u64])?;

        // Phase 2: payload
        match counts {
            None => {
                self.post(root, data)?;
                Ok(None)
            }
            Some(counts) => {
                let total = counts.iter().sum::<u64>() as usize;
                let mut result = Vec::with_capacity(total);
                for (source, &count) in counts.iter().enumerate() {
                    if source == root {
                        result.extend_from_slice(data);
                    } else {
                        result.extend(self.fetch_exact::<T>(source, count as usize)?);
                    }
                }
                Ok(Some(result))
            }
        }
    }

    fn scatter_varcount<T: Key>(
        &self,
        root: Rank,
        data: &[T],
        counts: &[usize],
    ) -> Result<Vec<T>, CommError> {
        self.check_rank(root)?;
        if self.rank != root {
            let count = self.fetch_exact::<u64>(root, 1)?[0];
            if count == REJECTED {
                return Err(CommError::Rejected { root });
            }
            return self.fetch_exact(root, count as usize);
        }

        let total = counts.iter().sum::<usize>();
        if counts.len() != self.size || total != data.len() {
            for dest in (0..self.size).filter(|&r| r != root) {
                self.post(dest, &[REJECTED])?;
            }
            return Err(CommError::SizeMismatch {
                peer: root,
                expected: total,
                received: data.len(),
            });
        }

        let displs = displacements(counts);
        let mut local = Vec::new();
        for (dest, (&count, &displ)) in counts.iter().zip(displs.iter()).enumerate() {
            let block = &data[displ..displ + count];
            if dest == root {
                local = block.to_vec();
            } else {
                self.post(dest, &[count as u64])?;
                self.post(dest, block)?;
            }
        }
        Ok(local)
    }

    fn all_to_all<T: Key>(&self, data: &[T]) -> Result<Vec<T>, CommError> {
        if data.len() % self.size != 0 {
            return Err(CommError::SizeMismatch {
                peer: self.rank,
                expected: (data.len() / self.size + 1) * self.size,
                received: data.len(),
            });
        }

        let block = data.len() / self.size;
        for dest in 0..self.size {
            self.post(dest, &data[dest * block..(dest + 1) * block])?;
        }

        let mut result = Vec::with_capacity(data.len());
        for source in 0..self.size {
            result.extend(self.fetch_exact::<T>(source, block)?);
        }
        Ok(result)
    }

    fn all_to_all_varcount<T: Key>(
        &self,
        data: &[T],
        counts: &[usize],
    ) -> Result<Vec<T>, CommError> {
        let total = counts.iter().sum::<usize>();
        if counts.len() != self.size || total != data.len() {
            return Err(CommError::SizeMismatch {
                peer: self.rank,
                expected: total,
                received: data.len(),
            });
        }

        // Phase 1: sizes
        let counts_snd = counts.iter().map(|&c| c as u64).collect_vec();
        let counts_recv = self.all_to_all(&counts_snd)?;

        // Phase 2: payload
        let displs = displacements(counts);
        for (dest, (&count, &displ)) in counts.iter().zip(displs.iter()).enumerate() {
            self.post(dest, &data[displ..displ + count])?;
        }

        let mut result = Vec::with_capacity(counts_recv.iter().sum::<u64>() as usize);
        for (source, &count) in counts_recv.iter().enumerate() {
            result.extend(self.fetch_exact::<T>(source, count as usize)?);
        }
        Ok(result)
    }

    fn barrier(&self) -> Result<(), CommError> {
        // Message based, so that a departed rank surfaces as an error rather than a hang
        self.gather::<u8>(ROOT, &[])?;
        let mut token = Vec::<u8>::new();
        self.broadcast(ROOT, &mut token)
    }
}

/// Run `f` on every rank of a fresh in-process group of `size` workers, each on its own
/// thread, and return the results in rank order. A panic on any rank is resumed on the
/// calling thread.
pub fn run_local<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(LocalCommunicator) -> R + Sync,
    R: Send,
{
    thread::scope(|scope| {
        let handles = LocalCommunicator::group(size)
            .into_iter()
            .map(|comm| {
                let f = &f;
                scope.spawn(move || f(comm))
            })
            .collect_vec();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|err| std::panic::resume_unwind(err))
            })
            .collect_vec()
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_send_receive() {
        let results = run_local(4, |comm| {
            let partner = comm.rank() ^ 1;
            comm.send_receive(partner, &[comm.rank() as i64; 3])
                .unwrap()
        });

        assert_eq!(results[0], vec![1, 1, 1]);
        assert_eq!(results[1], vec![0, 0, 0]);
        assert_eq!(results[2], vec![3, 3, 3]);
        assert_eq!(results[3], vec![2, 2, 2]);
    }

    #[test]
    fn test_point_to_point_ring() {
        let results = run_local(3, |comm| {
            let next = (comm.rank() + 1) % comm.size();
            let previous = (comm.rank() + comm.size() - 1) % comm.size();
            comm.send(next, &[comm.rank() as u32 * 10]).unwrap();
            comm.receive::<u32>(previous).unwrap()
        });

        assert_eq!(results, vec![vec![20], vec![0], vec![10]]);
    }

    #[test]
    fn test_broadcast() {
        let results = run_local(3, |comm| {
            let mut data = if comm.rank() == 1 {
                vec![4i32, 5, 6]
            } else {
                Vec::new()
            };
            comm.broadcast(1, &mut data).unwrap();
            data
        });

        assert!(results.iter().all(|r| r == &vec![4, 5, 6]));
    }

    #[test]
    fn test_reductions() {
        let results = run_local(4, |comm| {
            let x = comm.rank() as i64;
            let reduced = comm.reduce(ROOT, &[x, -x], ReduceOp::Max).unwrap();
            let sum = comm.all_reduce(&[x], ReduceOp::Sum).unwrap();
            let min = comm.all_reduce(&[x + 2], ReduceOp::Min).unwrap();
            (reduced, sum, min)
        });

        assert_eq!(results[0].0, Some(vec![3, 0]));
        for (rank, (reduced, sum, min)) in results.into_iter().enumerate() {
            if rank != ROOT {
                assert_eq!(reduced, None);
            }
            assert_eq!(sum, vec![6]);
            assert_eq!(min, vec![2]);
        }
    }

    #[test]
    fn test_gathers() {
        let results = run_local(3, |comm| {
            let fixed = comm.gather(ROOT, &[comm.rank() as u8; 2]).unwrap();
            let data = vec![comm.rank() as i64; comm.rank()];
            let variable = comm.gather_varcount(ROOT, &data).unwrap();
            (fixed, variable)
        });

        assert_eq!(results[0].0, Some(vec![0, 0, 1, 1, 2, 2]));
        assert_eq!(results[0].1, Some(vec![1, 2, 2]));
        assert!(results[1..].iter().all(|(f, v)| f.is_none() && v.is_none()));
    }

    #[test]
    fn test_gather_mismatched_lengths() {
        let results = run_local(2, |comm| {
            let data = vec![0u32; comm.rank() + 1];
            comm.gather(ROOT, &data)
        });

        assert!(matches!(
            results[0],
            Err(CommError::SizeMismatch {
                peer: 1,
                expected: 1,
                received: 2
            })
        ));
    }

    #[test]
    fn test_scatter_varcount() {
        let results = run_local(3, |comm| {
            let data = if comm.is_root() {
                vec![1i64, 2, 3, 4, 5]
            } else {
                Vec::new()
            };
            comm.scatter_varcount(ROOT, &data, &[0, 3, 2]).unwrap()
        });

        assert_eq!(results, vec![vec![], vec![1, 2, 3], vec![4, 5]]);
    }

    #[test]
    fn test_scatter_varcount_rejected() {
        let results = run_local(3, |comm| {
            let data = vec![1i64, 2, 3];
            // Counts do not sum to the length of the data at the root
            let scattered = comm.scatter_varcount(ROOT, &data, &[1, 1, 2]);
            // The group is still usable afterwards
            let sum = comm.all_reduce(&[1u32], ReduceOp::Sum).unwrap();
            (scattered, sum)
        });

        assert!(matches!(
            results[0].0,
            Err(CommError::SizeMismatch {
                peer: 0,
                expected: 4,
                received: 3
            })
        ));
        for (scattered, _) in &results[1..] {
            assert!(matches!(scattered, Err(CommError::Rejected { root: 0 })));
        }
        assert!(results.iter().all(|(_, sum)| sum == &vec![3]));
    }

    #[test]
    fn test_all_to_all() {
        let results = run_local(3, |comm| {
            let data = (0..3)
                .map(|dest| (10 * comm.rank() + dest) as u64)
                .collect_vec();
            comm.all_to_all(&data).unwrap()
        });

        assert_eq!(results[0], vec![0, 10, 20]);
        assert_eq!(results[1], vec![1, 11, 21]);
        assert_eq!(results[2], vec![2, 12, 22]);
    }

    #[test]
    fn test_all_to_all_varcount() {
        let results = run_local(3, |comm| {
            // Rank r sends r+1 copies of itself to every rank
            let copies = comm.rank() + 1;
            let data = vec![comm.rank() as i32; copies * comm.size()];
            comm.all_to_all_varcount(&data, &vec![copies; comm.size()])
                .unwrap()
        });

        assert!(results.iter().all(|r| r == &vec![0, 1, 1, 2, 2, 2]));
    }

    #[test]
    fn test_empty_exchanges() {
        let results = run_local(4, |comm| {
            let all = comm.all_to_all::<i64>(&[]).unwrap();
            let var = comm.all_to_all_varcount::<i64>(&[], &[0; 4]).unwrap();
            comm.barrier().unwrap();
            all.len() + var.len()
        });

        assert!(results.iter().all(|&n| n == 0));
    }

    #[test]
    fn test_invalid_rank() {
        let results = run_local(2, |comm| comm.send(5, &[1i32]));
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(CommError::InvalidRank { rank: 5, size: 2 }))));
    }

    #[test]
    fn test_departed_peer() {
        let results = run_local(2, |comm| {
            if comm.rank() == 1 {
                // Leave the group without taking part
                drop(comm);
                return Ok(());
            }
            comm.barrier()
        });

        assert!(matches!(results[0], Err(CommError::Disconnected { peer: 1 })));
    }
}
