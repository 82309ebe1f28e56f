//! Engine configuration
//!
//! `EngineConfig` carries the numeric conventions shared by every stage of a
//! run (trading calendar length, risk-free rate, estimator span, data
//! sufficiency floor). It is passed explicitly to each entry point; nothing is
//! read from process-wide state.
//!
//! Simulation inputs are built with [`ParametersBuilder`], which validates at
//! `build()`:
//!
//! ```ignore
//! use projector_core::config::ParametersBuilder;
//!
//! let params = ParametersBuilder::new()
//!     .asset("VTI", 0.7)
//!     .asset("BND", 0.3)
//!     .years(20)
//!     .simulations(10_000)
//!     .initial_value(250_000.0)
//!     .confidence_level(90)
//!     .rebalancing(0.05, 0.001)
//!     .max_rebalances_per_year(4)
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};

pub mod builder;

pub use builder::ParametersBuilder;

fn default_trading_days_per_year() -> usize {
    252
}

fn default_risk_free_rate() -> f64 {
    0.04
}

fn default_ewma_span() -> usize {
    60
}

fn default_min_observations() -> usize {
    20
}

fn default_action_drift_floor() -> f64 {
    0.01
}

/// Numeric conventions for a projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Simulation steps per year; also the annualization factor for daily returns.
    #[serde(default = "default_trading_days_per_year")]
    pub trading_days_per_year: usize,

    /// Annual risk-free rate used for the historical Sharpe ratio.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// Span (in observations) of the exponentially-weighted estimator.
    #[serde(default = "default_ewma_span")]
    pub ewma_span: usize,

    /// Minimum aligned observations before statistics are estimated.
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,

    /// Per-instrument actions are only reported above this absolute drift.
    #[serde(default = "default_action_drift_floor")]
    pub action_drift_floor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trading_days_per_year: default_trading_days_per_year(),
            risk_free_rate: default_risk_free_rate(),
            ewma_span: default_ewma_span(),
            min_observations: default_min_observations(),
            action_drift_floor: default_action_drift_floor(),
        }
    }
}

impl EngineConfig {
    /// Time step in years.
    #[must_use]
    pub fn dt(&self) -> f64 {
        1.0 / self.trading_days_per_year as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.trading_days_per_year < 12 {
            return Err(ProjectionError::invalid(
                "trading_days_per_year",
                format!("must be at least 12 (got {})", self.trading_days_per_year),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(ProjectionError::invalid(
                "risk_free_rate",
                "must be finite",
            ));
        }
        if self.ewma_span == 0 {
            return Err(ProjectionError::invalid("ewma_span", "must be positive"));
        }
        if self.min_observations < 2 {
            return Err(ProjectionError::invalid(
                "min_observations",
                format!("must be at least 2 (got {})", self.min_observations),
            ));
        }
        if !(0.0..1.0).contains(&self.action_drift_floor) {
            return Err(ProjectionError::invalid(
                "action_drift_floor",
                format!("must be in [0, 1) (got {})", self.action_drift_floor),
            ));
        }
        Ok(())
    }
}
