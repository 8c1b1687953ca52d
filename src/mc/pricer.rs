// src/mc/pricer.rs
//! Option descriptor and Monte Carlo pricing.
//!
//! Pricing runs estimation and simulation over the option's remaining life:
//! resolve the simulation start date from the loaded histories, calibrate a
//! [`CovarianceModel`] on observations up to that date, simulate terminal
//! prices over `(maturity - start)` daily steps, then discount the average
//! payoff by `exp(-rate * T)` with `T = (maturity - pricing) / 365` years.

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::validation::{validate_finite, validate_paths, validate_positive};
use crate::error::{PricingError, PricingResult};
use crate::market::Asset;
use crate::math_utils::daily_rate;
use crate::mc::payoffs::{rainbow_payoff, OptionKind, SelectionRule};
use crate::mc::simulator::{simulate_paths, GbmParams, RecordMode};
use crate::mc::CancellationToken;
use crate::stats::{estimate_model, CovarianceModel};

/// Calendar days per year for time-to-maturity and discounting.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// An immutable rainbow option contract.
///
/// Underlying order is significant for indexing (Delta vectors, spot
/// overrides) but not for the payoff itself.
#[derive(Debug, Clone)]
pub struct RainbowOption {
    strike: f64,
    pricing_date: NaiveDate,
    maturity_date: NaiveDate,
    underlyings: Vec<Asset>,
    kind: OptionKind,
    selection: SelectionRule,
    rate: f64,
}

impl RainbowOption {
    /// Build a contract. Fails `EmptyUnderlyings` without assets and rejects
    /// a non-positive strike or non-finite rate; maturity ordering is only
    /// checked at pricing time (`InvalidMaturity`).
    pub fn new(
        underlyings: Vec<Asset>,
        strike: f64,
        pricing_date: NaiveDate,
        maturity_date: NaiveDate,
        kind: OptionKind,
        selection: SelectionRule,
        rate: f64,
    ) -> PricingResult<Self> {
        if underlyings.is_empty() {
            return Err(PricingError::EmptyUnderlyings);
        }
        validate_positive("strike", strike)?;
        validate_finite("rate", rate)?;
        Ok(Self {
            strike,
            pricing_date,
            maturity_date,
            underlyings,
            kind,
            selection,
            rate,
        })
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn pricing_date(&self) -> NaiveDate {
        self.pricing_date
    }

    pub fn maturity_date(&self) -> NaiveDate {
        self.maturity_date
    }

    pub fn underlyings(&self) -> &[Asset] {
        &self.underlyings
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    pub fn selection(&self) -> SelectionRule {
        self.selection
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Time to maturity in years, counted in calendar days.
    pub fn time_to_maturity(&self) -> f64 {
        (self.maturity_date - self.pricing_date).num_days() as f64 / DAYS_PER_YEAR
    }
}

/// Drift convention for the simulated log-price increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftMode {
    /// `r/252 - vol^2/2` per step. Required whenever the discount rate is
    /// used for pricing; the default.
    RiskNeutral,
    /// Sample mean daily log-return, used as-is (it is already a log-price
    /// drift). For descriptive and backtest scenarios only.
    Historical,
}

/// Monte Carlo run parameters.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub num_paths: usize,
    pub drift_mode: DriftMode,
    pub seed: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            num_paths: 10_000,
            drift_mode: DriftMode::RiskNeutral,
            seed: 12345,
        }
    }
}

/// Which branch picked the simulation start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDateBasis {
    /// Pricing date covered by every underlying's history; started from the
    /// latest observation at or before it.
    CommonHistory,
    /// Pricing date ahead of the last loaded snapshot; started from the most
    /// data-constrained asset's final observation.
    StaleHistory,
}

/// Price plus the run diagnostics a caller needs to trust it.
#[derive(Debug, Clone)]
pub struct PriceDetail {
    pub price: f64,
    /// Standard error of the Monte Carlo mean, discounted.
    pub std_error: f64,
    pub start_date: NaiveDate,
    pub start_basis: StartDateBasis,
    pub steps: usize,
    pub num_paths: usize,
}

/// Everything needed to simulate one option, spots already resolved.
pub(crate) struct SimulationSetup {
    pub start_date: NaiveDate,
    pub basis: StartDateBasis,
    pub steps: usize,
    pub params: GbmParams,
}

/// Monte Carlo price of the option. See [`price_detailed`] for diagnostics.
pub fn price(
    option: &RainbowOption,
    cfg: &PricingConfig,
    cancel: &CancellationToken,
) -> PricingResult<f64> {
    price_detailed(option, cfg, cancel).map(|d| d.price)
}

/// Monte Carlo price with standard error and start-date diagnostics.
pub fn price_detailed(
    option: &RainbowOption,
    cfg: &PricingConfig,
    cancel: &CancellationToken,
) -> PricingResult<PriceDetail> {
    price_internal(option, cfg, cancel, None)
}

/// Reprice with the resolved spot of each underlying replaced by the given
/// value, leaving histories and calibration untouched.
///
/// This is the pure bump-and-revalue entry point: Greeks perturb spots here
/// instead of editing any `Asset`.
pub fn price_with_spot_overrides(
    option: &RainbowOption,
    cfg: &PricingConfig,
    cancel: &CancellationToken,
    spots: &[f64],
) -> PricingResult<f64> {
    price_internal(option, cfg, cancel, Some(spots)).map(|d| d.price)
}

fn price_internal(
    option: &RainbowOption,
    cfg: &PricingConfig,
    cancel: &CancellationToken,
    spot_overrides: Option<&[f64]>,
) -> PricingResult<PriceDetail> {
    validate_paths(cfg.num_paths)?;
    if cancel.is_cancelled() {
        return Err(PricingError::Cancelled {
            operation: "price".to_string(),
        });
    }

    let setup = prepare(option, cfg.drift_mode, spot_overrides)?;
    let batch = simulate_paths(
        &setup.params,
        setup.steps,
        cfg.num_paths,
        cfg.seed,
        RecordMode::TerminalOnly,
        cancel,
    )?;

    let (sum_payoff, sum_payoff_sq) = (0..batch.n_paths())
        .into_par_iter()
        .map(|p| {
            let payoff = rainbow_payoff(
                batch.terminal_row(p),
                option.strike,
                option.kind,
                option.selection,
            );
            (payoff, payoff * payoff)
        })
        .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1));

    let n = cfg.num_paths as f64;
    let mean_payoff = sum_payoff / n;
    let discount = (-option.rate * option.time_to_maturity()).exp();
    let price = discount * mean_payoff;

    // Sample variance of one payoff; tiny negatives are floating-point noise
    // on degenerate batches.
    let mut var_payoff = (sum_payoff_sq / n - mean_payoff * mean_payoff) * n / (n - 1.0).max(1.0);
    if var_payoff < 0.0 {
        var_payoff = 0.0;
    }
    let std_error = discount * (var_payoff / n).sqrt();

    if !price.is_finite() {
        return Err(PricingError::NumericalInstability {
            method: "monte carlo pricing".to_string(),
            reason: format!("price estimate is not finite: {}", price),
        });
    }

    Ok(PriceDetail {
        price,
        std_error,
        start_date: setup.start_date,
        start_basis: setup.basis,
        steps: setup.steps,
        num_paths: cfg.num_paths,
    })
}

/// Resolve the start date, calibrate, and assemble simulator inputs.
pub(crate) fn prepare(
    option: &RainbowOption,
    drift_mode: DriftMode,
    spot_overrides: Option<&[f64]>,
) -> PricingResult<SimulationSetup> {
    if option.maturity_date <= option.pricing_date {
        return Err(PricingError::InvalidMaturity {
            start: option.pricing_date,
            maturity: option.maturity_date,
        });
    }

    let (start_date, basis) = resolve_start_date(option)?;
    let steps = (option.maturity_date - start_date).num_days();
    if steps < 1 {
        return Err(PricingError::InvalidMaturity {
            start: start_date,
            maturity: option.maturity_date,
        });
    }
    let steps = steps as usize;

    let model = estimate_model(&option.underlyings, start_date)?;
    let spots = resolve_spots(option, start_date, spot_overrides)?;
    let drifts = drift_vector(option.rate, drift_mode, &model);

    debug!(
        start_date = %start_date,
        basis = ?basis,
        steps,
        drift_mode = ?drift_mode,
        "resolved simulation start"
    );

    Ok(SimulationSetup {
        start_date,
        basis,
        steps,
        params: GbmParams {
            spots,
            drifts,
            vols: model.volatilities.iter().copied().collect(),
            cholesky: model.cholesky.clone(),
        },
    })
}

/// Pick the simulation start date from the loaded histories.
///
/// Pricing "today" against a snapshot that ends yesterday must still work,
/// so there are two branches; which one ran matters when debugging a
/// surprising price, hence [`StartDateBasis`] in the report.
fn resolve_start_date(option: &RainbowOption) -> PricingResult<(NaiveDate, StartDateBasis)> {
    let mut last_common: Option<NaiveDate> = None;
    let mut last_at_pricing: Option<NaiveDate> = None;

    for asset in &option.underlyings {
        let (last, _) = asset
            .last_observation()
            .ok_or_else(|| PricingError::InsufficientHistory {
                ticker: asset.ticker().to_string(),
                observations: 0,
            })?;
        last_common = Some(match last_common {
            Some(d) => d.min(last),
            None => last,
        });

        match asset.last_observation_on_or_before(option.pricing_date) {
            Some((d, _)) => {
                last_at_pricing = Some(match last_at_pricing {
                    Some(prev) => prev.min(d),
                    None => d,
                });
            }
            None => {
                // History starts after the pricing date: nothing to calibrate
                // or to use as a spot.
                return Err(PricingError::InsufficientHistory {
                    ticker: asset.ticker().to_string(),
                    observations: 0,
                });
            }
        }
    }

    let common = match last_common {
        Some(d) => d,
        None => return Err(PricingError::EmptyUnderlyings),
    };
    if option.pricing_date <= common {
        match last_at_pricing {
            Some(d) => Ok((d, StartDateBasis::CommonHistory)),
            None => Err(PricingError::EmptyUnderlyings),
        }
    } else {
        Ok((common, StartDateBasis::StaleHistory))
    }
}

fn resolve_spots(
    option: &RainbowOption,
    start_date: NaiveDate,
    spot_overrides: Option<&[f64]>,
) -> PricingResult<Vec<f64>> {
    let n = option.underlyings.len();
    if let Some(overrides) = spot_overrides {
        if overrides.len() != n {
            return Err(PricingError::InvalidParameters {
                parameter: "spot_overrides".to_string(),
                value: overrides.len() as f64,
                constraint: format!("must provide one spot per underlying ({})", n),
            });
        }
        for (i, &s) in overrides.iter().enumerate() {
            validate_positive(&format!("spot_overrides[{}]", i), s)?;
        }
        return Ok(overrides.to_vec());
    }

    option
        .underlyings
        .iter()
        .map(|asset| {
            asset
                .last_observation_on_or_before(start_date)
                .map(|(_, p)| p)
                .ok_or_else(|| PricingError::InsufficientHistory {
                    ticker: asset.ticker().to_string(),
                    observations: 0,
                })
        })
        .collect()
}

fn drift_vector(rate: f64, mode: DriftMode, model: &CovarianceModel) -> Vec<f64> {
    match mode {
        DriftMode::RiskNeutral => {
            let r_step = daily_rate(rate);
            model
                .volatilities
                .iter()
                .map(|v| r_step - 0.5 * v * v)
                .collect()
        }
        DriftMode::Historical => {
            if rate != 0.0 {
                warn!(
                    rate,
                    "historical drift with a nonzero discount rate; price is not risk-neutral"
                );
            }
            model.mean_returns.iter().copied().collect()
        }
    }
}
