use num_bigint::BigInt;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic generator driving base64 layer counts and byte shifts.
///
/// Fully determined by its 64-bit state: two generators built from the same
/// seed produce the same sequence of draws on every platform.
#[derive(Debug, Clone)]
pub struct LineRng {
    rng: ChaCha8Rng,
}

impl LineRng {
    /// Seeds from `|seed| mod 2^64`.
    pub fn from_seed(seed: &BigInt) -> Self {
        let low = seed.magnitude().iter_u64_digits().next().unwrap_or(0);
        Self::from_state(low)
    }

    pub fn from_state(state: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(state) }
    }

    /// Uniform draw from `[low, high)`. An empty range yields `low`.
    pub fn next(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    /// Independent child generator seeded from the next 64-bit output.
    pub fn split(&mut self) -> LineRng {
        LineRng::from_state(self.rng.next_u64())
    }
}
