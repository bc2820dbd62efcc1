use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::tcp::wrap32::Wrap32;

// RFC 6528 clock: the ISN advances about 250,000 per second
const ISN_BYTES_PER_SECOND: u64 = 250_000;
const ISN_RANDOM_INCREMENT: u32 = 4096;

/// Initial sequence numbers from a secret random offset, a tick-driven clock
/// and a little per-connection jitter.
#[derive(Debug, Clone)]
pub struct IsnGenerator {
    rng: StdRng,
    secret: u32,
    hz: u32,
}

impl IsnGenerator {
    pub fn new(hz: u32) -> Self {
        Self::from_rng(StdRng::from_entropy(), hz)
    }

    /// Deterministic generator for reproducible runs.
    pub fn with_seed(seed: u64, hz: u32) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), hz)
    }

    fn from_rng(mut rng: StdRng, hz: u32) -> Self {
        let secret = rng.gen();
        IsnGenerator { rng, secret, hz: hz.max(1) }
    }

    pub fn next_isn(&mut self, ticks: u32) -> Wrap32 {
        let clock = (ticks as u64 * ISN_BYTES_PER_SECOND / self.hz as u64) as u32;
        let jitter = self.rng.gen_range(0..ISN_RANDOM_INCREMENT);
        Wrap32::new(self.secret) + clock.wrapping_add(jitter)
    }
}

// -- Unit tests --
