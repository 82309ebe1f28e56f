//! YAML scenario files
//!
//! A scenario bundles everything one run needs: engine conventions, the
//! simulation parameters, the historical returns matrix and optionally a seed.
//!
//! ```yaml
//! seed: 42
//! parameters:
//!   symbols: [VTI, BND]
//!   weights: [0.6, 0.4]
//!   years: 10
//!   num_simulations: 2000
//!   initial_value: 100000
//!   confidence_level: 90
//!   rebalancing:
//!     enabled: true
//!     drift_threshold: 0.05
//! returns:
//!   symbols: [VTI, BND]
//!   start: "2024-01-02"
//!   rows:
//!     - [0.004, -0.001]
//!     - [~, 0.002]
//! ```

use std::fs;
use std::path::Path;

use jiff::civil::Date;
use projector_core::calendar::{is_trading_day, next_trading_day, trading_days};
use projector_core::model::{ReturnsMatrix, SimulationParameters};
use projector_core::{EngineConfig, ProjectionError, RebalancingRequest};
use serde::{Deserialize, Serialize};

/// Error types for scenario loading
#[derive(Debug)]
pub enum ScenarioError {
    Io(String),
    Parse(String),
    Returns(ProjectionError),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::Io(msg) => write!(f, "IO error: {msg}"),
            ScenarioError::Parse(msg) => write!(f, "Parse error: {msg}"),
            ScenarioError::Returns(err) => write!(f, "Invalid returns matrix: {err}"),
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioError::Returns(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectionError> for ScenarioError {
    fn from(err: ProjectionError) -> Self {
        ScenarioError::Returns(err)
    }
}

/// Daily returns as written in a scenario file
///
/// Rows are dated either explicitly with `dates` or as consecutive weekdays
/// from `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsSpec {
    pub symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<Date>>,
    /// One entry per symbol; `~` marks a missing return
    pub rows: Vec<Vec<Option<f64>>>,
}

impl ReturnsSpec {
    pub fn to_matrix(&self) -> Result<ReturnsMatrix, ScenarioError> {
        if self.rows.is_empty() {
            return Err(ScenarioError::Parse("returns.rows is empty".into()));
        }
        let dates = match (&self.dates, self.start) {
            (Some(dates), _) => dates.clone(),
            (None, Some(start)) => {
                let first = if is_trading_day(start) {
                    start
                } else {
                    next_trading_day(start)?
                };
                trading_days(first, self.rows.len() - 1)?
            }
            (None, None) => {
                return Err(ScenarioError::Parse(
                    "returns needs either `dates` or `start`".into(),
                ));
            }
        };
        Ok(ReturnsMatrix::new(
            dates,
            self.symbols.clone(),
            self.rows.clone(),
        )?)
    }
}

/// A complete projection scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Used when no `--seed` is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub engine: EngineConfig,
    pub parameters: SimulationParameters,
    pub returns: ReturnsSpec,
}

impl Scenario {
    /// Load and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScenarioError::Io(format!("Failed to read {}: {e}", path.display()))
        })?;
        let scenario = Self::from_yaml(&content)?;
        tracing::debug!(
            path = %path.display(),
            symbols = scenario.parameters.symbols().len(),
            rows = scenario.returns.rows.len(),
            "loaded scenario"
        );
        Ok(scenario)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ScenarioError> {
        serde_saphyr::from_str(content)
            .map_err(|e| ScenarioError::Parse(format!("Failed to parse scenario: {e}")))
    }

    /// Rebalancing request for the scenario's allocation and settings.
    #[must_use]
    pub fn rebalancing_request(&self, expected_return: f64, volatility: f64) -> RebalancingRequest {
        let settings = self.parameters.rebalancing();
        RebalancingRequest {
            symbols: self.parameters.symbols().to_vec(),
            target_weights: self.parameters.weights().to_vec(),
            years: self.parameters.years(),
            drift_threshold: settings.drift_threshold,
            transaction_cost_pct: settings.transaction_cost_pct,
            expected_return,
            volatility,
            max_rebalances_per_year: settings.max_rebalances_per_year,
        }
    }
}
