// src/error.rs
use chrono::NaiveDate;
use std::fmt;

/// Custom error types for the rainbow-mc library
#[derive(Debug, Clone)]
pub enum PricingError {
    /// An asset lacks the observations needed to estimate returns
    InsufficientHistory { ticker: String, observations: usize },

    /// The simulated horizon is not at least one day
    InvalidMaturity { start: NaiveDate, maturity: NaiveDate },

    /// An option was constructed with no underlyings
    EmptyUnderlyings,

    /// The market-data collaborator knows nothing about a ticker
    NoDataForTicker { ticker: String },

    /// A covariance/correlation matrix failed strict Cholesky factorization.
    /// Only surfaced by the unfloored variant; the stabilized factorization
    /// absorbs this case by flooring the diagonal.
    NonPositiveDefiniteCovariance { index: usize, diagonal: f64 },

    /// Invalid parameter values
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Numerical instability in an estimator or reduction
    NumericalInstability { method: String, reason: String },

    /// The caller's cancellation token fired before completion
    Cancelled { operation: String },
}

impl fmt::Display for PricingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingError::InsufficientHistory {
                ticker,
                observations,
            } => {
                write!(
                    f,
                    "Insufficient history for '{}': {} observation(s), need at least 2",
                    ticker, observations
                )
            }
            PricingError::InvalidMaturity { start, maturity } => {
                write!(
                    f,
                    "Invalid maturity {}: must be at least one day after simulation start {}",
                    maturity, start
                )
            }
            PricingError::EmptyUnderlyings => {
                write!(f, "Option requires at least one underlying asset")
            }
            PricingError::NoDataForTicker { ticker } => {
                write!(f, "No historical data available for ticker '{}'", ticker)
            }
            PricingError::NonPositiveDefiniteCovariance { index, diagonal } => {
                write!(
                    f,
                    "Matrix is not positive definite: pivot {} has diagonal term {}",
                    index, diagonal
                )
            }
            PricingError::InvalidParameters {
                parameter,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid parameter '{}' = {}: {}",
                    parameter, value, constraint
                )
            }
            PricingError::NumericalInstability { method, reason } => {
                write!(f, "Numerical instability in {}: {}", method, reason)
            }
            PricingError::Cancelled { operation } => {
                write!(f, "Operation '{}' was cancelled", operation)
            }
        }
    }
}

impl std::error::Error for PricingError {}

/// Result type alias for rainbow-mc operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Validation utilities
pub mod validation {
    use super::{PricingError, PricingResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> PricingResult<()> {
        if value <= 0.0 || !value.is_finite() {
            Err(PricingError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> PricingResult<()> {
        if !value.is_finite() {
            Err(PricingError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate paths count
    pub fn validate_paths(paths: usize) -> PricingResult<()> {
        if paths == 0 {
            Err(PricingError::InvalidParameters {
                parameter: "num_paths".to_string(),
                value: 0.0,
                constraint: "must be greater than 0".to_string(),
            })
        } else if paths > 1_000_000_000 {
            Err(PricingError::InvalidParameters {
                parameter: "num_paths".to_string(),
                value: paths as f64,
                constraint: "exceeds maximum allowed (1 billion)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate steps count
    pub fn validate_steps(steps: usize) -> PricingResult<()> {
        if steps == 0 {
            Err(PricingError::InvalidParameters {
                parameter: "steps".to_string(),
                value: 0.0,
                constraint: "must be greater than 0".to_string(),
            })
        } else if steps > 100_000 {
            Err(PricingError::InvalidParameters {
                parameter: "steps".to_string(),
                value: steps as f64,
                constraint: "exceeds maximum allowed (100,000)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate a relative bump size for finite differences
    pub fn validate_bump(name: &str, bump: f64) -> PricingResult<()> {
        if !(bump > 0.0 && bump < 1.0) {
            Err(PricingError::InvalidParameters {
                parameter: name.to_string(),
                value: bump,
                constraint: "must be a relative size in (0, 1)".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
