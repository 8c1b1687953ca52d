// src/stats.rs
//! Historical estimation: log-returns, sample covariance, correlation and a
//! stabilized Cholesky factor.
//!
//! Calibration treats daily log-returns `ln(P_k / P_{k-1})` as the stationary
//! variable. Histories of unequal length are truncated to the shorter series
//! and aligned by index from the start; no date alignment is attempted.

use crate::error::{PricingError, PricingResult};
use crate::market::Asset;
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Floor applied to each Cholesky diagonal term before the square root.
///
/// Keeps the factorization real on noisy or near-singular correlation
/// estimates (two assets tracking each other, short histories). This is a
/// stability fallback, not a rigorous regularization; callers that want the
/// failure instead use [`cholesky_lower_strict`].
pub const CHOLESKY_DIAGONAL_FLOOR: f64 = 1e-10;

/// Calibrated multi-asset diffusion inputs, all in per-step (daily) units.
///
/// Ephemeral: built per pricing call and discarded with it.
#[derive(Debug, Clone)]
pub struct CovarianceModel {
    /// Mean daily log-return per asset.
    pub mean_returns: DVector<f64>,
    /// Sample covariance of daily log-returns.
    pub covariance: DMatrix<f64>,
    /// Correlation with entries clamped to [-1, 1] and unit diagonal.
    pub correlation: DMatrix<f64>,
    /// Daily volatilities (square roots of the covariance diagonal).
    pub volatilities: DVector<f64>,
    /// Lower-triangular factor of `correlation`, diagonal floored.
    pub cholesky: DMatrix<f64>,
}

impl CovarianceModel {
    pub fn n_assets(&self) -> usize {
        self.mean_returns.len()
    }
}

/// Daily log-returns of an ascending close series.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Calibrate a [`CovarianceModel`] from histories restricted to
/// observations at or before `cutoff`.
///
/// Fails with `InsufficientHistory` if any asset has fewer than 2
/// observations in range. The Cholesky factor is taken from the correlation
/// matrix; volatility is applied separately at simulation time.
pub fn estimate_model(assets: &[Asset], cutoff: NaiveDate) -> PricingResult<CovarianceModel> {
    if assets.is_empty() {
        return Err(PricingError::EmptyUnderlyings);
    }

    let mut returns: Vec<Vec<f64>> = Vec::with_capacity(assets.len());
    for asset in assets {
        let closes = asset.closes_up_to(cutoff);
        if closes.len() < 2 {
            return Err(PricingError::InsufficientHistory {
                ticker: asset.ticker().to_string(),
                observations: closes.len(),
            });
        }
        returns.push(log_returns(&closes));
    }

    let n = returns.len();
    let means: Vec<f64> = returns.iter().map(|r| mean(r)).collect();

    let mut covariance = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let cov = sample_covariance(&returns[i], &returns[j], means[i], means[j]);
            covariance[(i, j)] = cov;
            covariance[(j, i)] = cov;
        }
    }

    let volatilities = DVector::from_iterator(n, (0..n).map(|i| covariance[(i, i)].sqrt()));

    let mut correlation = DMatrix::identity(n, n);
    for i in 0..n {
        for j in 0..i {
            // Degenerate zero-variance series get a floored denominator
            // instead of poisoning the matrix with NaN.
            let denom = (volatilities[i] * volatilities[j]).max(1e-12);
            let rho = (covariance[(i, j)] / denom).clamp(-1.0, 1.0);
            correlation[(i, j)] = rho;
            correlation[(j, i)] = rho;
        }
    }

    let cholesky = cholesky_lower(&correlation);
    debug!(
        assets = n,
        cutoff = %cutoff,
        "calibrated covariance model from historical returns"
    );

    Ok(CovarianceModel {
        mean_returns: DVector::from_vec(means),
        covariance,
        correlation,
        volatilities,
        cholesky,
    })
}

/// Lower-triangular Cholesky factor with the stabilizing diagonal floor.
///
/// Never fails: diagonal terms are floored at [`CHOLESKY_DIAGONAL_FLOOR`]
/// before the square root, so near-singular and slightly indefinite inputs
/// still factor. `L * L^T` reconstructs the input up to the floor.
pub fn cholesky_lower(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let n = matrix.nrows();
    let mut l = DMatrix::zeros(n, n);

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[(i, k)] * l[(j, k)];
            }
            if i == j {
                let d = matrix[(i, i)] - sum;
                if d < CHOLESKY_DIAGONAL_FLOOR {
                    debug!(pivot = i, diagonal = d, "cholesky diagonal floored");
                }
                l[(i, j)] = d.max(CHOLESKY_DIAGONAL_FLOOR).sqrt();
            } else {
                l[(i, j)] = (matrix[(i, j)] - sum) / l[(j, j)];
            }
        }
    }
    l
}

/// Strict Cholesky factorization without the diagonal floor.
///
/// Surfaces `NonPositiveDefiniteCovariance` on the first non-positive pivot.
pub fn cholesky_lower_strict(matrix: &DMatrix<f64>) -> PricingResult<DMatrix<f64>> {
    let n = matrix.nrows();
    let mut l = DMatrix::zeros(n, n);

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[(i, k)] * l[(j, k)];
            }
            if i == j {
                let d = matrix[(i, i)] - sum;
                if d <= 0.0 {
                    return Err(PricingError::NonPositiveDefiniteCovariance {
                        index: i,
                        diagonal: d,
                    });
                }
                l[(i, j)] = d.sqrt();
            } else {
                l[(i, j)] = (matrix[(i, j)] - sum) / l[(j, j)];
            }
        }
    }
    Ok(l)
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Mean-centered cross-product over the overlapping prefix, divided by
/// `min_len - 1`. Means are each series' own full-sample mean.
fn sample_covariance(x: &[f64], y: &[f64], mean_x: f64, mean_y: f64) -> f64 {
    let len = x.len().min(y.len());
    let sum: f64 = x
        .iter()
        .zip(y.iter())
        .take(len)
        .map(|(a, b)| (a - mean_x) * (b - mean_y))
        .sum();
    sum / (len as f64 - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn asset_from_closes(ticker: &str, closes: &[f64]) -> Asset {
        Asset::with_history(
            ticker,
            closes
                .iter()
                .enumerate()
                .map(|(k, &p)| (date(1 + k as u32), p)),
        )
    }

    #[test]
    fn test_log_returns() {
        let rs = log_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(rs.len(), 2);
        assert_relative_eq!(rs[0], (110.0f64 / 100.0).ln(), epsilon = 1e-12);
        assert_relative_eq!(rs[1], (99.0f64 / 110.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_single_observation_is_insufficient() {
        let asset = asset_from_closes("ONE", &[100.0]);
        match estimate_model(&[asset], date(31)) {
            Err(PricingError::InsufficientHistory {
                ticker,
                observations,
            }) => {
                assert_eq!(ticker, "ONE");
                assert_eq!(observations, 1);
            }
            other => panic!("expected InsufficientHistory, got {:?}", other),
        }
    }

    #[test]
    fn test_cutoff_restricts_history() {
        // Plenty of data overall, but only one observation before the cutoff.
        let asset = asset_from_closes("AAA", &[100.0, 101.0, 102.0, 103.0]);
        assert!(estimate_model(&[asset], date(1)).is_err());
    }

    #[test]
    fn test_correlation_is_clamped_and_unit_diagonal() {
        let a = asset_from_closes("AAA", &[100.0, 101.0, 99.0, 102.0, 98.0, 103.0]);
        let b = asset_from_closes("BBB", &[50.0, 50.6, 49.4, 51.1, 48.9, 51.6]);
        let model = estimate_model(&[a, b], date(31)).unwrap();

        for i in 0..2 {
            assert_relative_eq!(model.correlation[(i, i)], 1.0, epsilon = 1e-12);
            for j in 0..2 {
                assert!(model.correlation[(i, j)].abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_unequal_histories_truncate_to_shorter() {
        let a = asset_from_closes("AAA", &[100.0, 101.0, 99.0, 102.0, 98.0]);
        let b = asset_from_closes("BBB", &[50.0, 50.5, 49.7]);
        let model = estimate_model(&[a, b], date(31)).unwrap();
        assert!(model.covariance[(0, 1)].is_finite());
        assert_eq!(model.covariance[(0, 1)], model.covariance[(1, 0)]);
    }

    #[test]
    fn test_cholesky_reconstructs_correlation() {
        let a = asset_from_closes("AAA", &[100.0, 101.0, 99.0, 102.0, 98.0, 103.0, 101.5]);
        let b = asset_from_closes("BBB", &[50.0, 50.2, 49.9, 50.8, 49.5, 50.9, 50.4]);
        let model = estimate_model(&[a, b], date(31)).unwrap();

        let reconstructed = &model.cholesky * model.cholesky.transpose();
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(
                    reconstructed[(i, j)],
                    model.correlation[(i, j)],
                    epsilon = 1e-6
                );
            }
        }
    }

    #[test]
    fn test_perfectly_correlated_pair_floors_not_fails() {
        // Identical histories: correlation exactly 1, second pivot hits the
        // floor instead of sqrt of a negative.
        let a = asset_from_closes("AAA", &[100.0, 101.0, 99.0, 102.0, 98.0]);
        let b = asset_from_closes("BBB", &[100.0, 101.0, 99.0, 102.0, 98.0]);
        let model = estimate_model(&[a, b], date(31)).unwrap();

        assert_relative_eq!(model.correlation[(0, 1)], 1.0, epsilon = 1e-12);
        let reconstructed = &model.cholesky * model.cholesky.transpose();
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(
                    reconstructed[(i, j)],
                    model.correlation[(i, j)],
                    epsilon = 1e-6
                );
            }
        }
    }

    #[test]
    fn test_strict_cholesky_rejects_indefinite_matrix() {
        // |rho| > 1 cannot come from a real correlation; the strict variant
        // must refuse it rather than floor it.
        let bad = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        match cholesky_lower_strict(&bad) {
            Err(PricingError::NonPositiveDefiniteCovariance { index, diagonal }) => {
                assert_eq!(index, 1);
                assert!(diagonal < 0.0);
            }
            other => panic!("expected NonPositiveDefiniteCovariance, got {:?}", other),
        }
        // The floored variant absorbs the same input.
        let l = cholesky_lower(&bad);
        assert!(l[(1, 1)] > 0.0);
    }
}
