//! Summary statistics and the deflated-confidence statistic.
//!
//! Implements from first principles:
//! - mean / median / worst over finite samples
//! - complementary error function (Chebyshev fit, fractional error < 1.2e-7)
//! - standard normal CDF
//! - deflated confidence: the probability that an observed Sharpe ratio beats
//!   the best Sharpe expected from `n` trials of pure noise
//!
//! Statistical caveat: the sample length is unknown to this layer, so the
//! Sharpe variance uses a fixed per-period proxy. The result ranks candidates
//! conservatively; it is not a calibrated p-value.

use serde::{Deserialize, Serialize};

// ─── Descriptive statistics ──────────────────────────────────────────

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Median; the average of the two middle values for even lengths.
pub fn median(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Minimum value.
pub fn worst(xs: &[f64]) -> Option<f64> {
    xs.iter().copied().min_by(f64::total_cmp)
}

/// Clamped linear map onto [0, 1]. A degenerate range (`hi == lo`) scores 0.
pub fn linear(x: f64, lo: f64, hi: f64) -> f64 {
    if hi == lo || !x.is_finite() {
        return 0.0;
    }
    ((x - lo) / (hi - lo)).clamp(0.0, 1.0)
}

// ─── Normal distribution ─────────────────────────────────────────────

/// Complementary error function.
fn erfc(x: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const COEFFICIENTS: [f64; 10] = [
        -1.26551223,
        1.00002368,
        0.37409196,
        0.09678418,
        -0.18628806,
        0.27886807,
        -1.13520398,
        1.48851587,
        -0.82215223,
        0.17087277,
    ];

    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = COEFFICIENTS
        .iter()
        .rev()
        .fold(0.0, |acc, &c| c + t * acc);
    let ans = t * (-z * z + poly).exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Standard normal CDF, P(Z <= z).
pub fn normal_cdf(z: f64) -> f64 {
    (0.5 * erfc(-z / std::f64::consts::SQRT_2)).clamp(0.0, 1.0)
}

// ─── Deflated confidence ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeflationConfig {
    /// Assumed return skewness.
    pub skew: f64,
    /// Assumed return kurtosis (3 = normal).
    pub kurtosis: f64,
    /// Stand-in for the number of return observations.
    pub periods_proxy: f64,
    /// Sharpe ratio the candidate must beat before the trial penalty.
    pub sharpe_ref: f64,
}

impl Default for DeflationConfig {
    fn default() -> Self {
        Self {
            skew: 0.0,
            kurtosis: 3.0,
            periods_proxy: 252.0,
            sharpe_ref: 0.0,
        }
    }
}

/// Floor on the Sharpe variance estimate.
const MIN_VARIANCE: f64 = 1e-12;

/// Confidence that `sharpe` is genuine after `n_trials` were tried.
///
/// Returns `None` when `n_trials < 2` or `sharpe` is not finite: with a single
/// trial there is nothing to deflate, and no number is reported in its place.
pub fn deflated_confidence(sharpe: f64, n_trials: usize, cfg: &DeflationConfig) -> Option<f64> {
    if n_trials < 2 || !sharpe.is_finite() {
        return None;
    }
    let e_max = (2.0 * (n_trials as f64).ln()).sqrt();
    let var = (1.0 - cfg.skew * sharpe + ((cfg.kurtosis - 1.0) / 4.0) * sharpe * sharpe)
        / (cfg.periods_proxy - 1.0).max(1.0);
    let sd = var.max(MIN_VARIANCE).sqrt();
    let z = (sharpe - (cfg.sharpe_ref + e_max * sd)) / sd;
    let conf = normal_cdf(z);
    conf.is_finite().then_some(conf)
}
