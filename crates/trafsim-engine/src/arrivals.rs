//! # trafsim-engine::arrivals
//!
//! Poisson arrival generation under a minimum-headway constraint.
//!
//! Clamping exponential gaps up to a minimum headway `h` would inflate the
//! mean inter-arrival time above the target `m`. The solver below finds the
//! adjusted rate `lambda` for which `E[max(Exp(lambda), h)] = m`, i.e. the
//! root of `h + e^(-lambda*h)/lambda = m`.

use crate::rng::SimRng;
use trafsim_types::time::SimTime;

const BISECT_TOLERANCE: f64 = 1e-4;
const BISECT_MAX_ITERS: u32 = 100;
const BISECT_LO: f64 = 0.0001;

/// Solves for the headway-adjusted arrival rate given a target mean
/// inter-arrival time `mean` and a minimum headway `headway`, in seconds.
///
/// `headway >= mean` is infeasible: the process degenerates to deterministic
/// headway spacing and the rate `1/headway` is returned without error.
pub fn headway_adjusted_rate(mean: f64, headway: f64) -> f64 {
    if headway <= 0.0 {
        return 1.0 / mean;
    }
    if headway >= mean {
        return 1.0 / headway;
    }

    // f(lambda) = h + e^(-lambda*h)/lambda - m is strictly decreasing in
    // lambda, so bisection on [BISECT_LO, 1/h] converges to the root.
    let mut lo = BISECT_LO;
    let mut hi = 1.0 / headway;
    let residual = |lambda: f64| headway + (-lambda * headway).exp() / lambda - mean;
    for _ in 0..BISECT_MAX_ITERS {
        let mid = 0.5 * (lo + hi);
        let f = residual(mid);
        if f.abs() <= BISECT_TOLERANCE {
            return mid;
        }
        if f > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// One arrival stream: exponential gaps at the headway-adjusted rate,
/// clamped to the minimum headway, with a count of how many draws the clamp
/// constrained.
#[derive(Debug)]
pub struct ArrivalProcess {
    adjusted_rate: f64,
    headway: f64,
    draws: u64,
    constrained: u64,
}

impl ArrivalProcess {
    /// Builds a stream targeting `rate_per_second` mean arrivals under
    /// minimum headway `min_headway`. A non-positive rate yields a stream
    /// that never fires.
    pub fn new(rate_per_second: f64, min_headway: SimTime) -> Self {
        let adjusted_rate = if rate_per_second <= 0.0 {
            0.0
        } else {
            headway_adjusted_rate(1.0 / rate_per_second, min_headway)
        };
        Self {
            adjusted_rate,
            headway: min_headway,
            draws: 0,
            constrained: 0,
        }
    }

    /// Draws the next inter-arrival gap: `max(Exp(lambda_adj), headway)`.
    pub fn next_gap(&mut self, rng: &mut SimRng) -> SimTime {
        if self.adjusted_rate <= 0.0 {
            return f64::INFINITY;
        }
        let draw = rng.exp(self.adjusted_rate);
        self.draws += 1;
        if draw < self.headway {
            self.constrained += 1;
            self.headway
        } else {
            draw
        }
    }

    /// Fraction of draws the headway clamp constrained.
    pub fn constrained_fraction(&self) -> f64 {
        if self.draws == 0 {
            0.0
        } else {
            self.constrained as f64 / self.draws as f64
        }
    }
}
