// src/math_utils.rs
//! Shared numerics: normal CDF and the single time-unit conversion boundary.
//!
//! Simulation steps are one trading day. Every conversion between annual and
//! per-step quantities lives here so callers never scatter `sqrt(252)`
//! factors across the codebase.

use statrs::function::erf;
use std::f64::consts::SQRT_2;

/// Trading days per year; used for all vol/drift annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf::erf(x / SQRT_2))
}

/// Per-step volatility from an annualized one: `sigma / sqrt(252)`.
pub fn daily_vol(annual_vol: f64) -> f64 {
    annual_vol / TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized volatility from a per-step one: `sigma * sqrt(252)`.
pub fn annualized_vol(daily_vol: f64) -> f64 {
    daily_vol * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Per-step rate from an annual one.
pub fn daily_rate(annual_rate: f64) -> f64 {
    annual_rate / TRADING_DAYS_PER_YEAR
}

pub struct Timer {
    start_time: std::time::Instant,
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            start_time: std::time::Instant::now(),
        }
    }

    pub fn start(&mut self) {
        self.start_time = std::time::Instant::now();
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Timer::new()
    }
}
