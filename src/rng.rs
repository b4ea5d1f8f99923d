//! Simple random number generator for reproducibility.
//!
//! A lightweight xorshift-based PRNG that doesn't require external
//! dependencies. Parameter initialization is deterministic for a given seed,
//! which keeps training runs and tests reproducible.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seedable xorshift RNG.
///
/// Used for weight initialization and dropout masks. Not suitable for
/// cryptographic purposes.
#[derive(Clone)]
pub struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    /// Create a new RNG with an explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state }
    }

    /// Reseed based on the current time.
    pub fn reseed_from_time(&mut self) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        self.state = if nanos == 0 {
            0x9e3779b97f4a7c15
        } else {
            nanos
        };
    }

    /// Basic xorshift step.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform sample in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        // 53 high bits give a uniform double in [0, 1).
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform sample symmetric about 0, in (-1, 1).
    ///
    /// The difference of two uniform draws matches the distribution the
    /// parameter tensors are initialized with; the exact shape is not
    /// load-bearing for correctness, only for training dynamics.
    pub fn next_symmetric(&mut self) -> f64 {
        self.next_f64() - self.next_f64()
    }
}
