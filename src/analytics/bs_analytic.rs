// src/analytics/bs_analytic.rs
//! Black-Scholes closed forms for European options.
//!
//! With a single underlying the Best-Of and Worst-Of selections coincide, so
//! these formulas are the exact limit the Monte Carlo engine must converge
//! to; the integration tests lean on them as an oracle.

use crate::math_utils::norm_cdf;

fn d1_d2(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> (f64, f64) {
    let sigma_sqrt_t = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / sigma_sqrt_t;
    (d1, d1 - sigma_sqrt_t)
}

/// European call price: `S*Phi(d1) - K*exp(-rT)*Phi(d2)`.
pub fn bs_call_price(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    let (d1, d2) = d1_d2(s, k, r, sigma, t);
    s * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2)
}

/// European put price via the mirrored tails: `K*exp(-rT)*Phi(-d2) - S*Phi(-d1)`.
pub fn bs_put_price(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    let (d1, d2) = d1_d2(s, k, r, sigma, t);
    k * (-r * t).exp() * norm_cdf(-d2) - s * norm_cdf(-d1)
}

/// European call Delta: `Phi(d1)`, in [0, 1].
pub fn bs_call_delta(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(s, k, r, sigma, t);
    norm_cdf(d1)
}
