//! Primes in an inclusive range, by trial division over a partitioned range.
use itertools::Itertools;
use log::debug;

use crate::{
    distribute::partition_counts,
    traits::{
        communicator::Communicator,
        types::{Error, Result, ROOT},
    },
};

/// Trial division primality test.
pub fn is_prime(n: i64) -> bool {
    if n <= 1 {
        return false;
    }
    let mut i = 2i64;
    while i.saturating_mul(i) <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// Number of values in `lower..=upper`, saturating at `usize::MAX`. Zero if the range is
/// inverted.
pub fn range_len(lower: i64, upper: i64) -> usize {
    (upper as i128 - lower as i128 + 1).clamp(0, usize::MAX as i128) as usize
}

/// All primes in `lower..=upper` in ascending order, gathered at the coordinator. The range is
/// split over the group the way [`scatter`](crate::distribute::scatter) splits a sequence.
/// Other ranks receive an empty vector.
///
/// Every rank must pass the same bounds, an inverted range fails with
/// [`Error::InvalidRange`] on all of them.
pub fn parallel_prime_range<C: Communicator>(lower: i64, upper: i64, comm: &C) -> Result<Vec<i64>> {
    if upper < lower {
        return Err(Error::InvalidRange { lower, upper });
    }

    // Range lengths beyond usize are not addressable by a partition
    let n = range_len(lower, upper);
    let counts = partition_counts(n, comm.size());
    let start = counts[..comm.rank()].iter().sum::<usize>();

    let first = lower as i128 + start as i128;
    let local = (0..counts[comm.rank()])
        .map(|i| (first + i as i128) as i64)
        .filter(|&candidate| is_prime(candidate))
        .collect_vec();

    debug!("rank {} found {} primes", comm.rank(), local.len());

    Ok(comm.gather_varcount(ROOT, &local)?.unwrap_or_default())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::run_local;

    #[test]
    fn test_is_prime() {
        let primes = (-5..30).filter(|&n| is_prime(n)).collect_vec();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(is_prime(7919));
        assert!(!is_prime(7917));
    }

    #[test]
    fn test_range_len() {
        assert_eq!(range_len(10, 20), 11);
        assert_eq!(range_len(-3, -3), 1);
        assert_eq!(range_len(5, 4), 0);
        assert_eq!(range_len(i64::MIN, -1), 1usize << 63);
        assert_eq!(range_len(i64::MIN, i64::MAX), usize::MAX);
    }

    #[test]
    fn test_prime_range() {
        for size in 1..=6 {
            let results = run_local(size, |comm| parallel_prime_range(10, 20, &comm).unwrap());
            assert_eq!(results[ROOT], vec![11, 13, 17, 19]);
            assert!(results[1..].iter().all(|r| r.is_empty()));
        }
    }

    #[test]
    fn test_prime_range_matches_serial() {
        let expected = (-10..=1000).filter(|&n| is_prime(n)).collect_vec();
        let results = run_local(4, |comm| parallel_prime_range(-10, 1000, &comm).unwrap());
        assert_eq!(results[ROOT], expected);
    }

    #[test]
    fn test_prime_range_single_value() {
        let results = run_local(3, |comm| parallel_prime_range(13, 13, &comm).unwrap());
        assert_eq!(results[ROOT], vec![13]);

        let results = run_local(3, |comm| parallel_prime_range(14, 14, &comm).unwrap());
        assert!(results[ROOT].is_empty());
    }

    #[test]
    fn test_invalid_range() {
        let results = run_local(3, |comm| parallel_prime_range(20, 10, &comm));
        for result in results {
            assert!(matches!(
                result,
                Err(Error::InvalidRange {
                    lower: 20,
                    upper: 10
                })
            ));
        }
    }
}
