//! Deterministic random number generation for rule decisions.
//!
//! The only randomness inside the engine is the two-player territory draw.
//! It must be reproducible: a game created from a seed and a game reloaded
//! from disk have to distribute territories identically, so the draw uses a
//! stateless PCG stream keyed by the game seed rather than an ambient RNG.

/// RNG oracle for deterministic random number generation.
///
/// Implementations must be deterministic and produce the same values
/// given the same seed.
pub trait RngOracle {
    /// Generate a random u32 value from a seed.
    fn next_u32(&self, seed: u64) -> u32;

    /// Generate a random value in range [min, max] inclusive.
    fn range(&self, seed: u64, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        let range = max - min + 1;
        min + (self.next_u32(seed) % range)
    }
}

/// PCG random number generator (Permuted Congruential Generator).
///
/// PCG-XSH-RR: 32-bit output from 64-bit state. Deterministic, small, and
/// branch-free, which keeps replayed games bit-identical to live ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    /// PCG multiplier constant.
    const MULTIPLIER: u64 = 6364136223846793005;

    /// PCG increment constant.
    const INCREMENT: u64 = 1442695040888963407;

    /// Advance the PCG state by one step.
    #[inline]
    fn pcg_step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    /// PCG output function using XSH-RR (xorshift high, random rotate).
    #[inline]
    fn pcg_output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        let state = Self::pcg_step(seed);
        Self::pcg_output(state)
    }
}

/// Compute a deterministic seed for one draw within a seeded sequence.
///
/// Mixing the draw index into the game seed gives every draw its own
/// stream position without carrying mutable RNG state around.
pub fn compute_seed(game_seed: u64, draw: u64) -> u64 {
    game_seed
        .wrapping_mul(0x9E3779B97F4A7C15)
        .wrapping_add(draw.wrapping_mul(0xD1B54A32D192ED03))
}
