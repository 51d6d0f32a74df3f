//! Wiener increments with rejection memory.
//!
//! Each step consumes a pair of independent Gaussian increments over its
//! length `h`: `ΔW` (the Brownian increment) and `ΔZ` (the auxiliary variable
//! of the stochastic Runge-Kutta stage). When a step is rejected the increment
//! it drew is not thrown away: it is split at the new, shorter step length by
//! a Brownian bridge, and both pieces are stacked to be consumed first. The
//! sample path seen by the integrator is therefore independent of how often
//! it rejects.

use nalgebra::SVector;

use crate::engine::rng::SimRng;
use crate::engine::state::NOISE_DIM;

/// Remainders shorter than this fraction of an increment are not split off.
const MIN_SPLIT_FRACTION: f64 = 1e-9;

/// Vector of per-channel noise values.
pub type NoiseVector = SVector<f64, NOISE_DIM>;

/// Increments of both Wiener processes over an interval of length `dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseIncrement {
    /// Interval length.
    pub dt: f64,
    /// Brownian increment `ΔW`.
    pub dw: NoiseVector,
    /// Auxiliary increment `ΔZ`.
    pub dz: NoiseVector,
}

/// Noise source for one trajectory.
#[derive(Debug, Clone)]
pub struct NoiseProcess {
    rng: SimRng,
    pending: Vec<NoiseIncrement>,
}

impl NoiseProcess {
    /// Create a noise process seeded for one trajectory.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SimRng::new(seed),
            pending: Vec::new(),
        }
    }

    /// Number of stored increments awaiting reuse.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Total interval length covered by stored increments.
    #[must_use]
    pub fn pending_time(&self) -> f64 {
        self.pending.iter().map(|inc| inc.dt).sum()
    }

    /// Increment for the next step of requested length `dt`.
    ///
    /// Stored increments take priority. If the one on top is shorter than
    /// `dt`, it is returned whole and the caller must step by its `dt`;
    /// if longer, it is bridged and the remainder stays on the stack.
    pub fn next(&mut self, dt: f64) -> NoiseIncrement {
        match self.pending.pop() {
            Some(top) if covers(dt, top.dt) => top,
            Some(top) => {
                let (head, tail) = self.bridge(&top, dt);
                self.pending.push(tail);
                head
            }
            None => self.fresh(dt),
        }
    }

    /// Return the increment of a rejected step, to be retried over `dt`.
    ///
    /// The increment is split at `dt`; the head is consumed by the very next
    /// call to [`next`](Self::next) and the tail after it.
    pub fn reject(&mut self, increment: NoiseIncrement, dt: f64) {
        if covers(dt, increment.dt) || dt <= 0.0 {
            self.pending.push(increment);
            return;
        }
        let (head, tail) = self.bridge(&increment, dt);
        self.pending.push(tail);
        self.pending.push(head);
    }

    /// Draw independent increments over `dt`.
    fn fresh(&mut self, dt: f64) -> NoiseIncrement {
        let scale = dt.sqrt();
        let dw = NoiseVector::from_fn(|_, _| scale * self.rng.gen_standard_normal());
        let dz = NoiseVector::from_fn(|_, _| scale * self.rng.gen_standard_normal());
        NoiseIncrement { dt, dw, dz }
    }

    /// Split `increment` at `s` by the Brownian bridge.
    ///
    /// Conditional on the total `Δ` over `h`, the head over `s` is Gaussian
    /// with mean `(s/h)·Δ` and variance `s(h−s)/h`; the tail is `Δ − head`.
    fn bridge(&mut self, increment: &NoiseIncrement, s: f64) -> (NoiseIncrement, NoiseIncrement) {
        let h = increment.dt;
        let fraction = s / h;
        let spread = (s * (h - s) / h).max(0.0).sqrt();

        let dw_head = NoiseVector::from_fn(|i, _| {
            fraction * increment.dw[i] + spread * self.rng.gen_standard_normal()
        });
        let dz_head = NoiseVector::from_fn(|i, _| {
            fraction * increment.dz[i] + spread * self.rng.gen_standard_normal()
        });

        let head = NoiseIncrement {
            dt: s,
            dw: dw_head,
            dz: dz_head,
        };
        let tail = NoiseIncrement {
            dt: h - s,
            dw: increment.dw - dw_head,
            dz: increment.dz - dz_head,
        };
        (head, tail)
    }
}

/// Whether a request of `dt` consumes an increment of length `stored` whole.
fn covers(dt: f64, stored: f64) -> bool {
    dt >= stored * (1.0 - MIN_SPLIT_FRACTION)
}
