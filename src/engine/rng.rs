//! Deterministic random number generation.
//!
//! Implements PCG (Permuted Congruential Generator) with per-trajectory
//! stream seeds for reproducible parallel execution.
//!
//! # Reproducibility Guarantee
//!
//! Given the same master seed, the noise stream of trajectory `i` is
//! bitwise-identical across:
//! - Different runs
//! - Different platforms
//! - Different thread counts and completion orders (via stream seeds)

use rand::prelude::*;
use rand_pcg::Pcg64;

/// Multiplier spreading consecutive stream indices across the seed space.
const STREAM_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic, reproducible random number generator.
///
/// Based on PCG (Permuted Congruential Generator) which provides:
/// - Excellent statistical properties
/// - Fast generation
/// - Predictable sequences from seed
/// - Independent streams via [`stream_seed`](Self::stream_seed)
#[derive(Debug, Clone)]
pub struct SimRng {
    /// Internal PCG state.
    rng: Pcg64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    /// Seed of stream `stream` derived from `master_seed`.
    ///
    /// The ensemble runner hands `stream_seed(master, i)` to trajectory `i`,
    /// so a trajectory's noise does not depend on which worker runs it.
    #[must_use]
    pub const fn stream_seed(master_seed: u64, stream: u64) -> u64 {
        master_seed.wrapping_add(stream.wrapping_mul(STREAM_SPREAD))
    }

    /// Generate a random f64 in [0, 1).
    pub fn gen_f64(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Generate a standard normal sample using Box-Muller transform.
    pub fn gen_standard_normal(&mut self) -> f64 {
        let u1 = self.gen_f64();
        let u2 = self.gen_f64();

        // Avoid log(0)
        let u1 = if u1 < f64::EPSILON { f64::EPSILON } else { u1 };

        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Property: Same seed produces same sequence.
    #[test]
    fn test_reproducibility() {
        let mut rng1 = SimRng::new(42);
        let mut rng2 = SimRng::new(42);

        let seq1: Vec<f64> = (0..100).map(|_| rng1.gen_f64()).collect();
        let seq2: Vec<f64> = (0..100).map(|_| rng2.gen_f64()).collect();

        assert_eq!(seq1, seq2, "Same seed must produce identical sequences");
    }

    #[test]
    fn test_different_seeds() {
        let mut rng1 = SimRng::new(42);
        let mut rng2 = SimRng::new(43);

        let seq1: Vec<f64> = (0..100).map(|_| rng1.gen_f64()).collect();
        let seq2: Vec<f64> = (0..100).map(|_| rng2.gen_f64()).collect();

        assert_ne!(seq1, seq2);
    }

    #[test]
    fn test_streams_are_independent() {
        let seqs: Vec<Vec<f64>> = (0..4)
            .map(|i| {
                let mut rng = SimRng::new(SimRng::stream_seed(42, i));
                (0..10).map(|_| rng.gen_f64()).collect()
            })
            .collect();

        for i in 0..seqs.len() {
            for j in (i + 1)..seqs.len() {
                assert_ne!(seqs[i], seqs[j], "Streams must be independent");
            }
        }
    }

    #[test]
    fn test_stream_zero_is_master() {
        assert_eq!(SimRng::stream_seed(99, 0), 99);
        assert_ne!(SimRng::stream_seed(99, 1), SimRng::stream_seed(99, 2));
    }

    #[test]
    fn test_normal_distribution() {
        let mut rng = SimRng::new(42);
        let n = 10000;
        let samples: Vec<f64> = (0..n).map(|_| rng.gen_standard_normal()).collect();

        let mean: f64 = samples.iter().sum::<f64>() / n as f64;
        let variance: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        assert!(mean.abs() < 0.1, "Mean {mean} too far from 0");
        assert!(
            (variance - 1.0).abs() < 0.1,
            "Variance {variance} too far from 1"
        );
    }

    #[test]
    fn test_standard_normal_epsilon_guard() {
        let mut rng = SimRng::new(12345);
        for _ in 0..50000 {
            let v = rng.gen_standard_normal();
            assert!(v.is_finite(), "gen_standard_normal produced {v}");
        }
    }
}
