//! Random test data
//!
//! An explicit, seedable source instead of a process-global generator, so a
//! failing test can be replayed with the same seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::account::Currency;
use crate::core_types::Amount;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Deterministic source
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Source seeded from the OS
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Integer in `[min, max]`
    pub fn int(&mut self, min: i64, max: i64) -> i64 {
        self.rng.gen_range(min..=max)
    }

    /// Lowercase ASCII string of length `n`
    pub fn string(&mut self, n: usize) -> String {
        (0..n)
            .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }

    pub fn owner(&mut self) -> String {
        self.string(6)
    }

    pub fn money(&mut self) -> Amount {
        self.int(0, 1000)
    }

    pub fn currency(&mut self) -> Currency {
        Currency::ALL[self.rng.gen_range(0..Currency::ALL.len())]
    }

    pub fn email(&mut self) -> String {
        format!("{}@example.com", self.string(5))
    }
}
