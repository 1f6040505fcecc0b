//! Departure scheduling
//!
//! The schedule keeps one absolute deadline and pushes it forward by a
//! sampled inter-departure gap — always from the previous deadline, never
//! from "now", so per-send jitter does not accumulate into drift over a long
//! run. Gaps are either a fixed period or exponentially distributed with the
//! period as mean (Poisson arrivals).

use crate::clock;
use nix::sys::time::TimeSpec;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Inter-departure distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arrival {
    /// One departure every period
    Fixed,
    /// Poisson arrivals: exponential gaps with the period as mean
    Exponential,
}

/// How to wait out the gap until the next deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStrategy {
    /// Busy-poll the clock; burns a core for the sharpest wake-up
    Spin,
    /// Absolute-deadline sleep; cheap, wakes at scheduler resolution
    Block,
}

#[derive(Debug)]
pub struct TrafficSchedule {
    next_deadline: TimeSpec,
    period_us: u64,
    arrival: Arrival,
    wait: WaitStrategy,
    rng: StdRng,
}

impl TrafficSchedule {
    pub fn new(start: TimeSpec, period_us: u64, arrival: Arrival, wait: WaitStrategy) -> Self {
        Self::with_rng(start, period_us, arrival, wait, StdRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn with_rng(
        start: TimeSpec,
        period_us: u64,
        arrival: Arrival,
        wait: WaitStrategy,
        rng: StdRng,
    ) -> Self {
        Self {
            next_deadline: start,
            period_us,
            arrival,
            wait,
            rng,
        }
    }

    pub fn next_deadline(&self) -> TimeSpec {
        self.next_deadline
    }

    /// Sample one gap and move the deadline forward from the previous
    /// deadline.
    pub fn advance(&mut self) {
        let gap_ns = self.sample_gap_ns();
        self.next_deadline = self.next_deadline + clock::duration_from_nanos(gap_ns);
    }

    /// Wait until the current deadline with the configured strategy.
    pub fn wait(&self) {
        match self.wait {
            WaitStrategy::Spin => clock::spin_until(self.next_deadline),
            WaitStrategy::Block => clock::sleep_until(self.next_deadline),
        }
    }

    fn sample_gap_ns(&mut self) -> u64 {
        match self.arrival {
            Arrival::Fixed => self.period_us * 1_000,
            Arrival::Exponential => {
                // Inverse transform: -mean * ln(1 - U), U uniform in [0, 1).
                let u: f64 = self.rng.gen();
                let mean_ns = self.period_us as f64 * 1_000.0;
                (-mean_ns * (1.0 - u).ln()).round() as u64
            }
        }
    }
}
