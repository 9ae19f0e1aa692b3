//! DeterministicRng - Seeded randomness
//!
//! TigerStyle: Same seed, same sequence. The seed is logged so any failing
//! run can be replayed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::constants::DST_SEED_ENV;

/// A seeded random number generator for simulation.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    seed: u64,
    rng: ChaCha8Rng,
}

impl DeterministicRng {
    /// Create a generator from an explicit seed.
    ///
    /// # Example
    /// ```
    /// use ipam_store::DeterministicRng;
    /// let mut a = DeterministicRng::new(42);
    /// let mut b = DeterministicRng::new(42);
    /// assert_eq!(a.below(1000), b.below(1000));
    /// ```
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed from `DST_SEED` if set and valid, otherwise from the OS.
    #[must_use]
    pub fn from_env() -> Self {
        let seed = std::env::var(DST_SEED_ENV)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or_else(rand::random);

        tracing::info!(seed, "DST seed (replay with {}={})", DST_SEED_ENV, seed);
        Self::new(seed)
    }

    /// The seed this generator started from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform value in `[0, upper)`.
    ///
    /// # Panics
    /// Panics if `upper` is zero.
    pub fn below(&mut self, upper: u64) -> u64 {
        assert!(upper > 0, "upper bound must be positive");
        self.rng.gen_range(0..upper)
    }

    /// Pick one element.
    ///
    /// # Panics
    /// Panics if `items` is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "cannot choose from empty slice");
        let index = self.rng.gen_range(0..items.len());
        &items[index]
    }
}
