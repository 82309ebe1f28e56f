//! Projection and rebalancing results
//!
//! Both result types are plain values created fresh on every run. They hold
//! no reference to the returns matrix they were derived from.

use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::params::EstimationMethod;
use super::paths::PathMatrix;

/// Annualized statistics of the weighted portfolio return series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatistics {
    /// Annualized drift (μ)
    pub drift: f64,
    /// Annualized volatility (σ)
    pub volatility: f64,
    /// (μ − risk-free) / σ, or 0 when σ is 0
    pub sharpe: f64,
    /// Aligned observations the estimate is based on
    pub observations: usize,
    pub method: EstimationMethod,
}

/// Percentile → time series, ordered by percentile
///
/// Each series is the cross-sectional percentile at every time index, not a
/// realized simulation path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentileBands(BTreeMap<u8, Vec<f64>>);

impl PercentileBands {
    #[must_use]
    pub fn new(bands: BTreeMap<u8, Vec<f64>>) -> Self {
        Self(bands)
    }

    #[must_use]
    pub fn get(&self, percentile: u8) -> Option<&[f64]> {
        self.0.get(&percentile).map(Vec::as_slice)
    }

    #[must_use]
    pub fn median(&self) -> Option<&[f64]> {
        self.get(50)
    }

    /// Last value of the band for `percentile`.
    #[must_use]
    pub fn final_value(&self, percentile: u8) -> Option<f64> {
        self.get(percentile).and_then(|b| b.last().copied())
    }

    pub fn percentiles(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[f64])> {
        self.0.iter().map(|(p, v)| (*p, v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Point risk statistics of a simulated ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// 5th percentile of final values
    pub var_95: f64,
    /// Mean of final values at or below `var_95`
    pub cvar_95: f64,
    /// Most negative peak-to-trough decline of the median band, in percent
    pub max_drawdown_median: f64,
    /// CAGR of the median band's final value, in percent
    pub cagr_median: f64,
    /// CAGR of the lower confidence band, in percent
    pub cagr_lower: f64,
    /// CAGR of the upper confidence band, in percent
    pub cagr_upper: f64,
    pub expected_final_value: f64,
    pub final_value_std: f64,
    /// Share of paths ending below the initial value
    pub probability_of_loss: f64,
    pub historical_sharpe: f64,
    pub historical_volatility: f64,
}

/// Complete output of a projection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Simulated values, `num_simulations × (steps + 1)`
    pub paths: PathMatrix,
    /// Step offsets in years, length `steps + 1`
    pub time_points: Vec<f64>,
    /// Trading date of each step, length `steps + 1`
    pub dates: Vec<Date>,
    pub percentiles: PercentileBands,
    /// Lower and upper percentile of the requested confidence band
    pub confidence_band: (u8, u8),
    pub final_values: Vec<f64>,
    pub risk: RiskMetrics,
    pub statistics: ReturnStatistics,
    pub rebalancing: Option<RebalancingRecommendation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    /// Sell an overweight position, buy an underweight one.
    #[must_use]
    pub fn for_drift(signed_drift: f64) -> Self {
        if signed_drift > 0.0 {
            TradeAction::Sell
        } else {
            TradeAction::Buy
        }
    }
}

/// What to trade in one instrument at a rebalancing date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub date: Date,
    pub symbol: String,
    pub current_weight: f64,
    pub target_weight: f64,
    /// `current_weight − target_weight`; positive means overweight
    pub drift: f64,
    pub action: TradeAction,
}

/// One threshold crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceEvent {
    pub date: Date,
    /// Simulation step at which the crossing occurred
    pub step: usize,
    pub max_drift: f64,
    /// Instrument with the largest absolute drift
    pub trigger_symbol: String,
}

/// Output of the drift-triggered rebalancing analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingRecommendation {
    /// Chronological
    pub rebalance_dates: Vec<Date>,
    /// Max absolute drift at each date; parallel to `rebalance_dates`
    pub drift_at_rebalance: Vec<f64>,
    pub trigger_threshold: f64,
    pub avg_drift: f64,
    pub max_drift: f64,
    pub total_transaction_costs: f64,
    pub cost_benefit_ratio: f64,
    pub sharpe_improvement: f64,
    pub rebalances_per_year: f64,
    pub events: Vec<RebalanceEvent>,
    /// Per-instrument trades; every `date` is one of `rebalance_dates`
    pub actions: Vec<RebalanceAction>,
}

impl RebalancingRecommendation {
    /// The "no rebalancing needed" outcome: every scalar is 0.0.
    #[must_use]
    pub fn no_events(trigger_threshold: f64) -> Self {
        Self {
            rebalance_dates: Vec::new(),
            drift_at_rebalance: Vec::new(),
            trigger_threshold,
            avg_drift: 0.0,
            max_drift: 0.0,
            total_transaction_costs: 0.0,
            cost_benefit_ratio: 0.0,
            sharpe_improvement: 0.0,
            rebalances_per_year: 0.0,
            events: Vec::new(),
            actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn num_events(&self) -> usize {
        self.rebalance_dates.len()
    }

    /// Actions recorded for a given date.
    pub fn actions_on(&self, date: Date) -> impl Iterator<Item = &RebalanceAction> {
        self.actions.iter().filter(move |a| a.date == date)
    }
}
