// src/mc/simulator.rs
//! Correlated geometric Brownian path simulation.
//!
//! # Algorithm
//!
//! Per path and per daily step:
//!
//! 1. Draw independent standard normals `Z` (Box-Muller).
//! 2. Correlate: `Y = L * Z` with the lower-triangular Cholesky factor, so
//!    `Y[i]` depends only on `Z[0..=i]`.
//! 3. Update each asset: `S[i] *= exp(drift[i] + vol[i] * Y[i])`.
//!
//! Paths fan out over Rayon workers; each path seeds its own generator from
//! `(seed, path index)`, so results are reproducible for a fixed seed and
//! independent across paths regardless of scheduling.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::debug;

use crate::error::validation::{validate_paths, validate_positive, validate_steps};
use crate::error::{PricingError, PricingResult};
use crate::mc::CancellationToken;
use crate::rng::RngFactory;

/// Per-step (daily) GBM inputs for a joint simulation of `n` assets.
///
/// `drifts` must already carry any convexity correction: risk-neutral
/// callers pass `r_daily - vol^2 / 2`, historical callers pass the sample
/// mean log-return as-is. `cholesky` is the factor of the correlation
/// matrix; volatility is applied separately in the update.
#[derive(Debug, Clone)]
pub struct GbmParams {
    pub spots: Vec<f64>,
    pub drifts: Vec<f64>,
    pub vols: Vec<f64>,
    pub cholesky: DMatrix<f64>,
}

impl GbmParams {
    pub fn n_assets(&self) -> usize {
        self.spots.len()
    }

    pub fn validate(&self) -> PricingResult<()> {
        let n = self.spots.len();
        if n == 0 {
            return Err(PricingError::EmptyUnderlyings);
        }
        if self.drifts.len() != n
            || self.vols.len() != n
            || self.cholesky.nrows() != n
            || self.cholesky.ncols() != n
        {
            return Err(PricingError::InvalidParameters {
                parameter: "gbm dimensions".to_string(),
                value: n as f64,
                constraint: format!(
                    "spots/drifts/vols/cholesky must agree, got {}/{}/{}/{}x{}",
                    n,
                    self.drifts.len(),
                    self.vols.len(),
                    self.cholesky.nrows(),
                    self.cholesky.ncols()
                ),
            });
        }
        for (i, &s) in self.spots.iter().enumerate() {
            validate_positive(&format!("spots[{}]", i), s)?;
        }
        for (i, &v) in self.vols.iter().enumerate() {
            if !(v.is_finite() && v >= 0.0) {
                return Err(PricingError::InvalidParameters {
                    parameter: format!("vols[{}]", i),
                    value: v,
                    constraint: "must be finite and non-negative".to_string(),
                });
            }
        }
        for (i, &d) in self.drifts.iter().enumerate() {
            if !d.is_finite() {
                return Err(PricingError::InvalidParameters {
                    parameter: format!("drifts[{}]", i),
                    value: d,
                    constraint: "must be finite".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// What the simulator records per path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// Terminal prices only; the pricing hot path.
    TerminalOnly,
    /// Terminal prices plus the full day-by-day trajectory of every asset.
    FullPaths,
}

/// Simulated outcomes for one batch of paths.
///
/// Ephemeral: produced fresh per pricing call, never cached across calls.
/// Terminal prices are stored path-major; full trajectories, when recorded,
/// are one `(n_paths, steps + 1)` matrix per asset with day 0 holding the
/// spot.
#[derive(Debug, Clone)]
pub struct SimulationBatch {
    n_paths: usize,
    n_assets: usize,
    terminal: Vec<f64>,
    paths: Option<Vec<DMatrix<f64>>>,
}

impl SimulationBatch {
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    /// Terminal prices of one path, ordered like the input assets.
    pub fn terminal_row(&self, path: usize) -> &[f64] {
        let start = path * self.n_assets;
        &self.terminal[start..start + self.n_assets]
    }

    /// Full trajectories per asset, if [`RecordMode::FullPaths`] was used.
    pub fn full_paths(&self) -> Option<&[DMatrix<f64>]> {
        self.paths.as_deref()
    }
}

struct PathRecord {
    terminal: Vec<f64>,
    days: Vec<Vec<f64>>,
}

/// Simulate `num_paths` joint trajectories over `steps` daily steps.
///
/// Reproducible for a fixed `seed`; cancellation is observed once per path
/// and surfaced as [`PricingError::Cancelled`].
pub fn simulate_paths(
    params: &GbmParams,
    steps: usize,
    num_paths: usize,
    seed: u64,
    record: RecordMode,
    cancel: &CancellationToken,
) -> PricingResult<SimulationBatch> {
    params.validate()?;
    validate_steps(steps)?;
    validate_paths(num_paths)?;

    let n = params.n_assets();
    let factory = RngFactory::new(seed);

    let rows: Vec<PathRecord> = (0..num_paths)
        .into_par_iter()
        .map(|p| -> PricingResult<PathRecord> {
            if cancel.is_cancelled() {
                return Err(PricingError::Cancelled {
                    operation: "simulate_paths".to_string(),
                });
            }

            let mut normals = factory.normal_source_for_path(p as u64);
            let mut prices = params.spots.clone();
            let mut z = vec![0.0; n];
            let mut y = vec![0.0; n];

            let mut days = Vec::new();
            if record == RecordMode::FullPaths {
                days.reserve(steps + 1);
                days.push(prices.clone());
            }

            for _ in 0..steps {
                normals.fill(&mut z);
                for i in 0..n {
                    let mut acc = 0.0;
                    for j in 0..=i {
                        acc += params.cholesky[(i, j)] * z[j];
                    }
                    y[i] = acc;
                }
                for i in 0..n {
                    prices[i] *= (params.drifts[i] + params.vols[i] * y[i]).exp();
                }
                if record == RecordMode::FullPaths {
                    days.push(prices.clone());
                }
            }

            Ok(PathRecord {
                terminal: prices,
                days,
            })
        })
        .collect::<PricingResult<Vec<_>>>()?;

    let mut terminal = Vec::with_capacity(num_paths * n);
    for row in &rows {
        terminal.extend_from_slice(&row.terminal);
    }

    let paths = match record {
        RecordMode::TerminalOnly => None,
        RecordMode::FullPaths => Some(
            (0..n)
                .map(|a| DMatrix::from_fn(num_paths, steps + 1, |p, d| rows[p].days[d][a]))
                .collect(),
        ),
    };

    debug!(num_paths, steps, n_assets = n, "simulated correlated gbm paths");

    Ok(SimulationBatch {
        n_paths: num_paths,
        n_assets: n,
        terminal,
        paths,
    })
}
