// src/rng.rs
//! Random number generation for Monte Carlo simulations.
//!
//! # Design
//!
//! Every simulated path owns its own generator, derived deterministically
//! from a base seed and the path index. The same seed therefore yields the
//! same price regardless of how Rayon schedules the paths, and no generator
//! is ever shared between workers.
//!
//! Normal draws for the path simulator come from a Box-Muller transform over
//! uniforms:
//!
//! ```text
//! Z1 = sqrt(-2 ln(U1)) * cos(2*pi*U2)
//! Z2 = sqrt(-2 ln(U1)) * sin(2*pi*U2)
//! ```
//!
//! with each uniform taken as `1 - U` so the logarithm never sees zero. The
//! transform produces draws in pairs; [`NormalSource`] keeps the spare for
//! the next call instead of discarding it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::PI;

/// Seed a standalone generator.
pub fn seed_rng_from_u64(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// One standard-normal draw from any generator (ziggurat, via `rand_distr`).
pub fn get_normal_draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

/// Factory handing out independent per-path generators.
#[derive(Debug, Clone)]
pub struct RngFactory {
    base_seed: u64,
}

impl RngFactory {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    /// Generator for a specific path. Distinct path ids give distinct,
    /// non-overlapping streams.
    pub fn rng_for_path(&self, path_id: u64) -> StdRng {
        StdRng::seed_from_u64(self.base_seed.wrapping_add(path_id))
    }

    /// Box-Muller normal source for a specific path.
    pub fn normal_source_for_path(&self, path_id: u64) -> NormalSource<StdRng> {
        NormalSource::new(self.rng_for_path(path_id))
    }
}

/// Box-Muller standard-normal source wrapping a uniform generator.
///
/// The spare draw lives in the instance, so cloned or per-path sources never
/// interleave their streams.
#[derive(Debug, Clone)]
pub struct NormalSource<R: Rng> {
    rng: R,
    spare: Option<f64>,
}

impl<R: Rng> NormalSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, spare: None }
    }

    pub fn next_normal(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        // 1 - U keeps the log argument strictly positive
        let u1 = 1.0 - self.rng.gen::<f64>();
        let u2 = 1.0 - self.rng.gen::<f64>();
        let mag = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        self.spare = Some(mag * theta.sin());
        mag * theta.cos()
    }

    /// Fill a slice with independent standard-normal draws.
    pub fn fill(&mut self, out: &mut [f64]) {
        for z in out.iter_mut() {
            *z = self.next_normal();
        }
    }
}
