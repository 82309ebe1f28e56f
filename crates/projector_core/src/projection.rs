//! Entry points.
//!
//! `estimate_and_simulate` runs estimation, the GBM ensemble and aggregation,
//! then the rebalancing analysis when it is enabled. `analyze_rebalancing` runs
//! the rebalancing analysis alone. Both read the returns matrix without taking
//! ownership and draw every random number from the `rng` they are handed.

use jiff::civil::Date;
use rand::Rng;

use crate::aggregate::{PercentileSet, summarize_paths};
use crate::calendar;
use crate::config::EngineConfig;
use crate::correlated::{CorrelatedAssetPathSimulator, CorrelationMatrix};
use crate::error::{ProjectionError, Result};
use crate::estimate::estimate_aligned;
use crate::gbm::{ContributionSchedule, GbmParameters, GeometricBrownianPathSimulator};
use crate::model::{
    AlignedReturns, RebalancingRecommendation, ReturnsMatrix, SimulationParameters,
    SimulationResult,
};
use crate::rebalance::{DriftRebalancingAnalyzer, RebalancingRequest};

/// Project the portfolio described by `params` from historical `returns`.
///
/// The simulated calendar starts at the last date on which every requested
/// symbol has a return.
pub fn estimate_and_simulate<R: Rng + ?Sized>(
    params: &SimulationParameters,
    returns: &ReturnsMatrix,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<SimulationResult> {
    config.validate()?;
    let _span = tracing::info_span!(
        "estimate_and_simulate",
        symbols = params.symbols().len(),
        years = params.years(),
        simulations = params.num_simulations()
    )
    .entered();

    let aligned = returns.select(params.symbols())?;
    let statistics = estimate_aligned(&aligned, params.weights(), params.method(), config)?;

    let steps_per_year = config.trading_days_per_year;
    let num_steps = params.num_steps(steps_per_year);
    let dates = calendar::trading_days(projection_start(&aligned)?, num_steps)?;
    let time_points = calendar::time_points(num_steps, steps_per_year);
    let set = PercentileSet::for_confidence(params.confidence_level())?;

    let simulator = GeometricBrownianPathSimulator::new(GbmParameters {
        num_simulations: params.num_simulations(),
        num_steps,
        drift: statistics.drift,
        volatility: statistics.volatility,
        initial_value: params.initial_value(),
        steps_per_year,
        contributions: ContributionSchedule::from_settings(params.contributions(), steps_per_year),
    })?;
    let paths = simulator.simulate(rng);

    let summary = summarize_paths(
        &paths,
        &set,
        params.initial_value(),
        params.years(),
        &statistics,
    )?;

    let rebalancing = if params.rebalancing().enabled {
        let settings = params.rebalancing();
        let request = RebalancingRequest {
            symbols: params.symbols().to_vec(),
            target_weights: params.weights().to_vec(),
            years: params.years(),
            drift_threshold: settings.drift_threshold,
            transaction_cost_pct: settings.transaction_cost_pct,
            expected_return: statistics.drift,
            volatility: statistics.volatility,
            max_rebalances_per_year: settings.max_rebalances_per_year,
        };
        Some(run_rebalancing(&request, &aligned, &dates, config, rng)?)
    } else {
        None
    };

    tracing::info!(
        drift = statistics.drift,
        volatility = statistics.volatility,
        median_final = summary.percentiles.final_value(50),
        var_95 = summary.risk.var_95,
        rebalance_events = rebalancing.as_ref().map(RebalancingRecommendation::num_events),
        "projection complete"
    );

    Ok(SimulationResult {
        paths,
        time_points,
        dates,
        percentiles: summary.percentiles,
        confidence_band: (set.lower(), set.upper()),
        final_values: summary.final_values,
        risk: summary.risk,
        statistics,
        rebalancing,
    })
}

/// Rebalancing analysis without a value projection.
///
/// `request.expected_return` and `request.volatility` feed only the
/// cost/benefit estimate; the simulated asset paths use per-asset statistics
/// and the sample correlation of `returns`.
pub fn analyze_rebalancing<R: Rng + ?Sized>(
    request: &RebalancingRequest,
    returns: &ReturnsMatrix,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<RebalancingRecommendation> {
    config.validate()?;
    request.validate()?;

    let aligned = returns.select(&request.symbols)?;
    aligned.require(config.min_observations)?;

    let num_steps = request.years as usize * config.trading_days_per_year;
    let dates = calendar::trading_days(projection_start(&aligned)?, num_steps)?;
    run_rebalancing(request, &aligned, &dates, config, rng)
}

fn projection_start(aligned: &AlignedReturns) -> Result<Date> {
    aligned
        .last_date()
        .ok_or(ProjectionError::InsufficientData {
            observations: 0,
            required: 1,
        })
}

fn run_rebalancing<R: Rng + ?Sized>(
    request: &RebalancingRequest,
    aligned: &AlignedReturns,
    dates: &[Date],
    config: &EngineConfig,
    rng: &mut R,
) -> Result<RebalancingRecommendation> {
    let assets = aligned.asset_statistics(config.trading_days_per_year);
    let correlation = CorrelationMatrix::new(aligned.correlation_matrix())?;
    let simulator =
        CorrelatedAssetPathSimulator::new(assets, &correlation, config.trading_days_per_year)?;

    let path = simulator.simulate(dates.len().saturating_sub(1), rng);
    DriftRebalancingAnalyzer::new(request.clone(), config.action_drift_floor)?.analyze(&path, dates)
}
