//! Tests for full projection runs through `estimate_and_simulate`
//!
//! These tests verify that:
//! - The path matrix, time axis and calendar have the documented shapes
//! - Risk metrics are ordered and bounded as expected
//! - Identically seeded runs are bit-identical
//! - Contributions raise the median outcome
//! - Constant historical returns give a deterministic, finite projection
//! - The rebalancing analysis is attached only when enabled

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::two_asset_returns;
use crate::config::{EngineConfig, ParametersBuilder};
use crate::error::ProjectionError;
use crate::model::SimulationParameters;
use crate::projection::estimate_and_simulate;

const INITIAL_VALUE: f64 = 100_000.0;

fn base_builder() -> ParametersBuilder {
    ParametersBuilder::new()
        .asset("A", 0.5)
        .asset("B", 0.5)
        .initial_value(INITIAL_VALUE)
        .years(1)
        .simulations(1_000)
}

fn run(params: &SimulationParameters, seed: u64) -> crate::model::SimulationResult {
    let returns = two_asset_returns(7);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    estimate_and_simulate(params, &returns, &EngineConfig::default(), &mut rng).unwrap()
}

/// One-year projection of a 50/50 portfolio: tail metrics sit below the
/// expected growth and CVaR does not exceed VaR
#[test]
fn test_two_asset_var_cvar() {
    let params = base_builder().build().unwrap();
    let result = run(&params, 42);
    let bound = INITIAL_VALUE * 1.08;

    assert!(
        result.risk.var_95 < bound,
        "VaR95 {:.2} should be below {bound:.2}",
        result.risk.var_95
    );
    assert!(result.risk.cvar_95 < bound);
    assert!(
        result.risk.cvar_95 <= result.risk.var_95,
        "CVaR95 {:.2} > VaR95 {:.2}",
        result.risk.cvar_95,
        result.risk.var_95
    );
    assert!(result.risk.probability_of_loss > 0.0 && result.risk.probability_of_loss < 1.0);
    assert!(result.risk.max_drawdown_median <= 0.0);
    assert!(result.risk.cagr_lower < result.risk.cagr_median);
    assert!(result.risk.cagr_median < result.risk.cagr_upper);
    assert_eq!(result.risk.historical_sharpe, result.statistics.sharpe);
}

/// Matrix, time points and dates all cover steps + 1 points
#[test]
fn test_result_shapes() {
    let params = base_builder().build().unwrap();
    let result = run(&params, 1);

    assert_eq!(result.paths.shape(), (1_000, 253));
    assert!(result.paths.column(0).iter().all(|v| *v == INITIAL_VALUE));
    assert_eq!(result.final_values.len(), 1_000);
    assert_eq!(result.final_values, result.paths.final_values());
    assert_eq!(result.time_points.len(), 253);
    assert_eq!(result.dates.len(), 253);
    assert_eq!(result.confidence_band, (5, 95));

    let returns = two_asset_returns(7);
    assert_eq!(result.dates[0], *returns.dates().last().unwrap());

    for (p, band) in result.percentiles.iter() {
        assert_eq!(band.len(), 253, "band {p} has wrong length");
    }
    assert!(result.rebalancing.is_none());
}

/// Percentile bands never cross
#[test]
fn test_percentile_monotonicity() {
    let params = base_builder().confidence_level(80).build().unwrap();
    let result = run(&params, 9);

    let band = |p| result.percentiles.get(p).unwrap();
    for t in 0..result.time_points.len() {
        assert!(band(5)[t] <= band(25)[t]);
        assert!(band(25)[t] <= band(50)[t]);
        assert!(band(50)[t] <= band(75)[t]);
        assert!(band(75)[t] <= band(95)[t]);
    }
    assert_eq!(result.confidence_band, (10, 90));
}

/// Same parameters and seed give bit-identical output
#[test]
fn test_reproducible_with_seed() {
    let params = base_builder().build().unwrap();
    let a = run(&params, 2024);
    let b = run(&params, 2024);

    assert_eq!(a.paths, b.paths);
    assert_eq!(a.percentiles, b.percentiles);
    assert_eq!(a.risk, b.risk);

    let c = run(&params, 2025);
    assert_ne!(a.paths, c.paths);
}

/// A positive contribution strictly increases the median final value
#[test]
fn test_contributions_raise_median() {
    let without = base_builder().build().unwrap();
    let with = base_builder().monthly_contribution(1_000.0).build().unwrap();

    let a = run(&without, 5);
    let b = run(&with, 5);

    let median_without = a.percentiles.final_value(50).unwrap();
    let median_with = b.percentiles.final_value(50).unwrap();
    assert!(
        median_with > median_without,
        "median with contributions {median_with:.2} <= without {median_without:.2}"
    );
    assert!(
        a.final_values
            .iter()
            .zip(&b.final_values)
            .all(|(x, y)| y > x),
        "every path should end higher with contributions"
    );
}

/// Rebalancing output is attached when enabled and its dates lie on the
/// projection calendar
#[test]
fn test_rebalancing_attached_when_enabled() {
    let params = base_builder()
        .years(3)
        .rebalancing(0.02, 0.001)
        .max_rebalances_per_year(2)
        .build()
        .unwrap();
    let result = run(&params, 11);

    let rec = result.rebalancing.expect("rebalancing analysis should be present");
    assert_eq!(rec.trigger_threshold, 0.02);
    assert!(rec.num_events() <= 6);
    assert_eq!(rec.rebalance_dates.len(), rec.drift_at_rebalance.len());
    assert!(rec.rebalance_dates.iter().all(|d| result.dates.contains(d)));
    assert!(rec.drift_at_rebalance.iter().all(|d| *d > 0.02));
}

/// Exponentially-weighted estimation runs end to end
#[test]
fn test_exponentially_weighted_projection() {
    let params = base_builder()
        .method(crate::model::EstimationMethod::ExponentiallyWeighted)
        .build()
        .unwrap();
    let result = run(&params, 3);
    assert_eq!(
        result.statistics.method,
        crate::model::EstimationMethod::ExponentiallyWeighted
    );
    assert!(result.paths.paths().flatten().all(|v| v.is_finite()));
}

/// Constant daily returns estimate zero volatility, so every path is the same
/// curve and the degenerate metrics stay finite
#[test]
fn test_constant_returns_projection() {
    let returns = super::synthetic_returns(
        &[super::asset("A", 0.08, 0.0), super::asset("B", 0.05, 0.0)],
        252,
        1,
    );
    let params = base_builder().build().unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let result =
        estimate_and_simulate(&params, &returns, &EngineConfig::default(), &mut rng).unwrap();

    assert_eq!(result.statistics.volatility, 0.0);
    assert_eq!(result.statistics.sharpe, 0.0);
    assert!((result.statistics.drift - 0.065).abs() < 1e-9);

    let median = result.percentiles.median().unwrap();
    for (p, band) in result.percentiles.iter() {
        assert_eq!(band, median, "band {p} differs from the median");
    }
    assert!(result.paths.paths().all(|path| path == median));

    let risk = &result.risk;
    assert!((risk.cvar_95 - risk.var_95).abs() < 1e-6);
    assert_eq!(risk.max_drawdown_median, 0.0);
    assert_eq!(risk.probability_of_loss, 0.0);
    assert_eq!(risk.cagr_lower, risk.cagr_upper);
    assert!(risk.var_95.is_finite() && risk.cvar_95.is_finite());
    assert!(risk.cagr_median.is_finite() && risk.final_value_std.is_finite());
}

/// Missing symbols and short histories are reported, not defaulted
#[test]
fn test_input_errors_propagate() {
    let returns = two_asset_returns(7);
    let config = EngineConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    let params = ParametersBuilder::new()
        .asset("A", 0.5)
        .asset("ZZZ", 0.5)
        .initial_value(INITIAL_VALUE)
        .build()
        .unwrap();
    let err = estimate_and_simulate(&params, &returns, &config, &mut rng).unwrap_err();
    assert_eq!(err, ProjectionError::UnknownSymbol("ZZZ".into()));

    let short = super::synthetic_returns(&[super::asset("A", 0.05, 0.1)], 10, 1);
    let params = ParametersBuilder::new()
        .asset("A", 1.0)
        .initial_value(INITIAL_VALUE)
        .build()
        .unwrap();
    let err = estimate_and_simulate(&params, &short, &config, &mut rng).unwrap_err();
    assert_eq!(
        err,
        ProjectionError::InsufficientData {
            observations: 10,
            required: 20
        }
    );
}
