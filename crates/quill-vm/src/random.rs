//! Pseudo-random number source.

/// An opaque 64-bit number source.
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;
    fn reseed(&mut self, seed: u64);

    /// Uniform float in `[0, 1)` built from the top 53 bits.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// `fastrand`-backed source.
pub struct FastRandom(fastrand::Rng);

impl FastRandom {
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => FastRandom(fastrand::Rng::with_seed(s)),
            None => FastRandom(fastrand::Rng::new()),
        }
    }
}

impl RandomSource for FastRandom {
    fn next_u64(&mut self) -> u64 {
        self.0.u64(..)
    }

    fn reseed(&mut self, seed: u64) {
        self.0.seed(seed);
    }
}
