//! Seeded randomness for luck procs.
//!
//! SplitMix64: eight bytes of state, reproducible on every platform, so a
//! session replayed from the same seed and frame deltas yields the same
//! production.

use crate::fixed::Fixed64;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// One Bernoulli trial. Probabilities outside (0, 1) short-circuit
    /// without consuming state.
    pub fn chance(&mut self, probability: Fixed64) -> bool {
        if probability <= Fixed64::ZERO {
            return false;
        }
        if probability >= Fixed64::ONE {
            return true;
        }
        // For p in (0, 1) the raw Q32.32 bits are p × 2^32.
        let threshold = probability.to_bits() as u64;
        (self.next_u64() >> 32) < threshold
    }

    /// Successes out of `trials` independent draws.
    pub fn successes(&mut self, probability: Fixed64, trials: u64) -> u64 {
        (0..trials).filter(|_| self.chance(probability)).count() as u64
    }

    pub fn state(&self) -> u64 {
        self.state
    }
}
