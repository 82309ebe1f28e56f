//! Simulation input parameters
//!
//! `SimulationParameters` can only be obtained through validation (either the
//! builder or deserialization via `ParametersSpec`), so downstream stages can
//! rely on its invariants: one weight per symbol, weights summing to 1.0, and
//! bounded horizon and simulation count.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};

pub const MIN_YEARS: u32 = 1;
pub const MAX_YEARS: u32 = 50;
pub const MIN_SIMULATIONS: usize = 100;
pub const MAX_SIMULATIONS: usize = 50_000;
pub const MIN_CONFIDENCE_LEVEL: u8 = 50;
pub const MAX_CONFIDENCE_LEVEL: u8 = 98;
/// Accepted absolute deviation of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

/// How annualized drift and volatility are derived from daily returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    /// Sample mean and standard deviation over the whole window.
    #[default]
    HistoricalMean,
    /// Exponentially-weighted mean and standard deviation; only the most
    /// recent smoothed value is used.
    ExponentiallyWeighted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionFrequency {
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

impl ContributionFrequency {
    #[must_use]
    pub fn periods_per_year(self) -> usize {
        match self {
            ContributionFrequency::Monthly => 12,
            ContributionFrequency::Quarterly => 4,
            ContributionFrequency::Annually => 1,
        }
    }

    /// Simulation steps between two contributions (21 / 63 / 252 on a
    /// 252-day year).
    #[must_use]
    pub fn interval_steps(self, trading_days_per_year: usize) -> usize {
        (trading_days_per_year / self.periods_per_year()).max(1)
    }
}

/// Periodic contributions (positive) or withdrawals (negative)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContributionSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Yearly total, prorated evenly over the periods of `frequency`.
    #[serde(default, alias = "amount")]
    pub annual_amount: f64,
    #[serde(default)]
    pub frequency: ContributionFrequency,
}

impl ContributionSettings {
    /// Amount added at each contribution step.
    #[must_use]
    pub fn amount_per_period(&self) -> f64 {
        self.annual_amount / self.frequency.periods_per_year() as f64
    }
}

fn default_drift_threshold() -> f64 {
    0.05
}

fn default_transaction_cost_pct() -> f64 {
    0.001
}

/// Settings for the drift-triggered rebalancing analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RebalancingSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Absolute weight drift (fraction) that triggers a rebalance.
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
    /// Cost of one rebalance as a fraction of portfolio value.
    #[serde(default = "default_transaction_cost_pct")]
    pub transaction_cost_pct: f64,
    #[serde(default)]
    pub max_rebalances_per_year: Option<u32>,
}

impl Default for RebalancingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            drift_threshold: default_drift_threshold(),
            transaction_cost_pct: default_transaction_cost_pct(),
            max_rebalances_per_year: None,
        }
    }
}

impl RebalancingSettings {
    pub fn validate(&self) -> Result<()> {
        validate_rebalancing(
            self.drift_threshold,
            self.transaction_cost_pct,
            self.max_rebalances_per_year,
        )
    }
}

/// Confidence levels must be even so both band edges land on whole percentiles.
pub(crate) fn validate_confidence_level(level: u8) -> Result<()> {
    if !(MIN_CONFIDENCE_LEVEL..=MAX_CONFIDENCE_LEVEL).contains(&level) {
        return Err(ProjectionError::invalid(
            "confidence_level",
            format!("must be in {MIN_CONFIDENCE_LEVEL}..={MAX_CONFIDENCE_LEVEL} (got {level})"),
        ));
    }
    if level % 2 != 0 {
        return Err(ProjectionError::invalid(
            "confidence_level",
            format!("must be even so the band edges are whole percentiles (got {level})"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_rebalancing(
    drift_threshold: f64,
    transaction_cost_pct: f64,
    max_rebalances_per_year: Option<u32>,
) -> Result<()> {
    if !(drift_threshold > 0.0 && drift_threshold < 1.0) {
        return Err(ProjectionError::invalid(
            "drift_threshold",
            format!("must be in (0, 1) (got {drift_threshold})"),
        ));
    }
    if !(0.0..1.0).contains(&transaction_cost_pct) {
        return Err(ProjectionError::invalid(
            "transaction_cost_pct",
            format!("must be in [0, 1) (got {transaction_cost_pct})"),
        ));
    }
    if max_rebalances_per_year == Some(0) {
        return Err(ProjectionError::invalid(
            "max_rebalances_per_year",
            "must be at least 1 when set",
        ));
    }
    Ok(())
}

/// Check that `weights` pairs with `symbols` and forms a long-only allocation.
pub(crate) fn validate_allocation(symbols: &[String], weights: &[f64]) -> Result<()> {
    if symbols.is_empty() {
        return Err(ProjectionError::invalid("symbols", "at least one symbol is required"));
    }
    if weights.len() != symbols.len() {
        return Err(ProjectionError::invalid(
            "weights",
            format!(
                "expected {} weights (one per symbol), got {}",
                symbols.len(),
                weights.len()
            ),
        ));
    }
    let mut seen = HashSet::with_capacity(symbols.len());
    for symbol in symbols {
        if symbol.is_empty() {
            return Err(ProjectionError::invalid("symbols", "symbol must not be empty"));
        }
        if !seen.insert(symbol.as_str()) {
            return Err(ProjectionError::invalid(
                "symbols",
                format!("duplicate symbol `{symbol}`"),
            ));
        }
    }
    if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(ProjectionError::invalid(
            "weights",
            format!("weights must be finite and non-negative (got {w})"),
        ));
    }
    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ProjectionError::invalid(
            "weights",
            format!("must sum to 1.0 (got {total:.4})"),
        ));
    }
    Ok(())
}

/// Unvalidated, serializable form of [`SimulationParameters`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersSpec {
    pub symbols: Vec<String>,
    pub weights: Vec<f64>,
    pub years: u32,
    pub num_simulations: usize,
    pub initial_value: f64,
    pub confidence_level: u8,
    #[serde(default)]
    pub method: EstimationMethod,
    #[serde(default)]
    pub contributions: ContributionSettings,
    #[serde(default)]
    pub rebalancing: RebalancingSettings,
}

/// Validated simulation inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParametersSpec", into = "ParametersSpec")]
pub struct SimulationParameters {
    symbols: Vec<String>,
    weights: Vec<f64>,
    years: u32,
    num_simulations: usize,
    initial_value: f64,
    confidence_level: u8,
    method: EstimationMethod,
    contributions: ContributionSettings,
    rebalancing: RebalancingSettings,
}

impl TryFrom<ParametersSpec> for SimulationParameters {
    type Error = ProjectionError;

    fn try_from(spec: ParametersSpec) -> Result<Self> {
        validate_allocation(&spec.symbols, &spec.weights)?;

        if !(MIN_YEARS..=MAX_YEARS).contains(&spec.years) {
            return Err(ProjectionError::invalid(
                "years",
                format!("must be in {MIN_YEARS}..={MAX_YEARS} (got {})", spec.years),
            ));
        }
        if !(MIN_SIMULATIONS..=MAX_SIMULATIONS).contains(&spec.num_simulations) {
            return Err(ProjectionError::invalid(
                "num_simulations",
                format!(
                    "must be in {MIN_SIMULATIONS}..={MAX_SIMULATIONS} (got {})",
                    spec.num_simulations
                ),
            ));
        }
        if !(spec.initial_value.is_finite() && spec.initial_value > 0.0) {
            return Err(ProjectionError::invalid(
                "initial_value",
                format!("must be positive (got {})", spec.initial_value),
            ));
        }
        validate_confidence_level(spec.confidence_level)?;
        if spec.contributions.enabled && !spec.contributions.annual_amount.is_finite() {
            return Err(ProjectionError::invalid(
                "contributions.annual_amount",
                "must be finite",
            ));
        }
        if spec.rebalancing.enabled {
            spec.rebalancing.validate()?;
        }

        Ok(Self {
            symbols: spec.symbols,
            weights: spec.weights,
            years: spec.years,
            num_simulations: spec.num_simulations,
            initial_value: spec.initial_value,
            confidence_level: spec.confidence_level,
            method: spec.method,
            contributions: spec.contributions,
            rebalancing: spec.rebalancing,
        })
    }
}

impl From<SimulationParameters> for ParametersSpec {
    fn from(params: SimulationParameters) -> Self {
        Self {
            symbols: params.symbols,
            weights: params.weights,
            years: params.years,
            num_simulations: params.num_simulations,
            initial_value: params.initial_value,
            confidence_level: params.confidence_level,
            method: params.method,
            contributions: params.contributions,
            rebalancing: params.rebalancing,
        }
    }
}

impl SimulationParameters {
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn years(&self) -> u32 {
        self.years
    }

    #[must_use]
    pub fn num_simulations(&self) -> usize {
        self.num_simulations
    }

    #[must_use]
    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    #[must_use]
    pub fn confidence_level(&self) -> u8 {
        self.confidence_level
    }

    #[must_use]
    pub fn method(&self) -> EstimationMethod {
        self.method
    }

    #[must_use]
    pub fn contributions(&self) -> &ContributionSettings {
        &self.contributions
    }

    #[must_use]
    pub fn rebalancing(&self) -> &RebalancingSettings {
        &self.rebalancing
    }

    /// Number of simulated steps over the horizon.
    #[must_use]
    pub fn num_steps(&self, trading_days_per_year: usize) -> usize {
        self.years as usize * trading_days_per_year
    }
}
