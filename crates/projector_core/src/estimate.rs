//! Drift and volatility estimation.
//!
//! The weighted portfolio daily-return series is built from the aligned
//! returns matrix and reduced to annualized drift (μ) and volatility (σ):
//!
//! - `HistoricalMean`: μ = mean × N, σ = std × √N (sample std, n − 1)
//! - `ExponentiallyWeighted`: the same annualization applied to the last
//!   value of an adjusted exponentially-weighted mean/std with span `S`
//!   (α = 2 / (S + 1)), i.e. weights (1 − α)^k for the k-th most recent
//!   observation and the unbiased weighted variance.
//!
//! Fewer than `min_observations` aligned rows is an `InsufficientData`
//! error; the estimator never substitutes default statistics.

use crate::config::EngineConfig;
use crate::error::{ProjectionError, Result};
use crate::model::params::validate_allocation;
use crate::model::returns::mean_and_sample_std;
use crate::model::{AlignedReturns, EstimationMethod, ReturnStatistics, ReturnsMatrix};

/// Annualized volatility below this is treated as exactly zero.
pub const MIN_VOLATILITY: f64 = 1e-12;

/// Estimate portfolio statistics for `weights` over `symbols`.
pub fn estimate_statistics(
    returns: &ReturnsMatrix,
    symbols: &[String],
    weights: &[f64],
    method: EstimationMethod,
    config: &EngineConfig,
) -> Result<ReturnStatistics> {
    validate_allocation(symbols, weights)?;
    let aligned = returns.select(symbols)?;
    estimate_aligned(&aligned, weights, method, config)
}

/// Estimate from rows that are already aligned to `weights`' column order.
pub fn estimate_aligned(
    aligned: &AlignedReturns,
    weights: &[f64],
    method: EstimationMethod,
    config: &EngineConfig,
) -> Result<ReturnStatistics> {
    aligned.require(config.min_observations)?;
    let series = aligned.portfolio_series(weights);
    estimate_from_series(&series, method, config)
}

/// Estimate from a daily portfolio return series.
pub fn estimate_from_series(
    daily_returns: &[f64],
    method: EstimationMethod,
    config: &EngineConfig,
) -> Result<ReturnStatistics> {
    if daily_returns.len() < config.min_observations {
        return Err(ProjectionError::InsufficientData {
            observations: daily_returns.len(),
            required: config.min_observations,
        });
    }

    let (daily_mean, daily_std) = match method {
        EstimationMethod::HistoricalMean => mean_and_sample_std(daily_returns.iter().copied()),
        EstimationMethod::ExponentiallyWeighted => ewm_mean_std(daily_returns, config.ewma_span),
    };

    let periods = config.trading_days_per_year as f64;
    let drift = daily_mean * periods;
    let volatility = match daily_std * periods.sqrt() {
        v if v < MIN_VOLATILITY => 0.0,
        v => v,
    };
    let sharpe = sharpe_ratio(drift, volatility, config.risk_free_rate);

    tracing::debug!(
        ?method,
        observations = daily_returns.len(),
        drift,
        volatility,
        sharpe,
        "estimated portfolio statistics"
    );
    if volatility == 0.0 {
        tracing::warn!("portfolio volatility is zero; projection will be deterministic");
    }

    Ok(ReturnStatistics {
        drift,
        volatility,
        sharpe,
        observations: daily_returns.len(),
        method,
    })
}

/// (μ − r_f) / σ, or 0 when σ is 0.
#[must_use]
pub fn sharpe_ratio(drift: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility > 0.0 {
        (drift - risk_free_rate) / volatility
    } else {
        0.0
    }
}

/// Adjusted exponentially-weighted mean and unbiased std at the last observation.
fn ewm_mean_std(values: &[f64], span: usize) -> (f64, f64) {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    // Most recent observation has weight 1
    let mut weight = 1.0;
    let mut sum_w = 0.0;
    let mut sum_w2 = 0.0;
    let mut sum_wx = 0.0;
    let mut weights = Vec::with_capacity(values.len());
    for x in values.iter().rev() {
        weights.push(weight);
        sum_w += weight;
        sum_w2 += weight * weight;
        sum_wx += weight * x;
        weight *= decay;
    }
    if sum_w == 0.0 {
        return (0.0, 0.0);
    }
    let mean = sum_wx / sum_w;

    let biased_var = values
        .iter()
        .rev()
        .zip(&weights)
        .map(|(x, w)| w * (x - mean).powi(2))
        .sum::<f64>()
        / sum_w;

    let denom = sum_w * sum_w - sum_w2;
    let variance = if denom > 0.0 {
        biased_var * sum_w * sum_w / denom
    } else {
        0.0
    };
    (mean, variance.max(0.0).sqrt())
}
