//! Helper functions shared by the communicator backends and sorting algorithms, as well as
//! dataset generators used in testing.
use std::ops::Add;

use itertools::Itertools;
use rand::{
    distributions::{uniform::SampleUniform, Distribution, Uniform},
    rngs::StdRng,
    SeedableRng,
};

/// Check if `n` is a power of two
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// Exclusive prefix sum of `counts`, i.e. the offset of each block in a concatenated buffer.
pub fn displacements<N>(counts: &[N]) -> Vec<N>
where
    N: Copy + Default + Add<Output = N>,
{
    counts
        .iter()
        .scan(N::default(), |acc, &x| {
            let tmp = *acc;
            *acc = *acc + x;
            Some(tmp)
        })
        .collect_vec()
}

/// Random dataset fixture for testing, uniformly samples integers in `min..=max`.
///
/// # Arguments
/// * `n` - The number of values to sample.
/// * `min` - The minimum value.
/// * `max` - The maximum value.
/// * `seed` - Random seed, defaults to 0.
pub fn random_fixture<T>(n: usize, min: T, max: T, seed: Option<u64>) -> Vec<T>
where
    T: SampleUniform + PartialOrd + Copy,
{
    let seed = seed.unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    let between = Uniform::new_inclusive(min, max);
    (0..n).map(|_| between.sample(&mut rng)).collect_vec()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_power_of_two() {
        let powers = (0..40).filter(|&n| is_power_of_two(n)).collect_vec();
        assert_eq!(powers, vec![1, 2, 4, 8, 16, 32]);
    }

    #[test]
    fn test_displacements() {
        assert_eq!(displacements(&[3usize, 0, 2, 5]), vec![0, 3, 3, 5]);
        assert!(displacements::<i32>(&[]).is_empty());
    }

    #[test]
    fn test_random_fixture() {
        let a = random_fixture(1000, -5i64, 5, Some(7));
        let b = random_fixture(1000, -5i64, 5, Some(7));
        assert_eq!(a, b);
        assert!(a.iter().all(|&x| (-5..=5).contains(&x)));
    }
}
