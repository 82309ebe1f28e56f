//! Parameters Builder
//!
//! Fluent construction of [`SimulationParameters`]. Nothing is checked until
//! [`ParametersBuilder::build`], which runs the same validation as
//! deserialization.
//!
//! # Example
//!
//! ```ignore
//! use projector_core::config::ParametersBuilder;
//! use projector_core::model::EstimationMethod;
//!
//! let params = ParametersBuilder::new()
//!     .asset("VTI", 0.6)
//!     .asset("VXUS", 0.3)
//!     .asset("BND", 0.1)
//!     .years(25)
//!     .simulations(5_000)
//!     .initial_value(150_000.0)
//!     .method(EstimationMethod::ExponentiallyWeighted)
//!     .quarterly_contribution(3_000.0)
//!     .rebalancing(0.05, 0.001)
//!     .build()?;
//! ```

use crate::error::Result;
use crate::model::{
    ContributionFrequency, ContributionSettings, EstimationMethod, ParametersSpec,
    RebalancingSettings, SimulationParameters,
};

/// Builder for [`SimulationParameters`]
#[derive(Debug, Clone)]
pub struct ParametersBuilder {
    spec: ParametersSpec,
}

impl Default for ParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParametersBuilder {
    /// Ten years, 1 000 simulations, 90% band, no contributions, no
    /// rebalancing analysis. Assets and initial value must be supplied.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: ParametersSpec {
                symbols: Vec::new(),
                weights: Vec::new(),
                years: 10,
                num_simulations: 1_000,
                initial_value: 0.0,
                confidence_level: 90,
                method: EstimationMethod::default(),
                contributions: ContributionSettings::default(),
                rebalancing: RebalancingSettings::default(),
            },
        }
    }

    // =========================================================================
    // Portfolio
    // =========================================================================

    /// Add a holding with its target weight
    #[must_use]
    pub fn asset(mut self, symbol: impl Into<String>, weight: f64) -> Self {
        self.spec.symbols.push(symbol.into());
        self.spec.weights.push(weight);
        self
    }

    #[must_use]
    pub fn initial_value(mut self, value: f64) -> Self {
        self.spec.initial_value = value;
        self
    }

    // =========================================================================
    // Horizon & Sampling
    // =========================================================================

    #[must_use]
    pub fn years(mut self, years: u32) -> Self {
        self.spec.years = years;
        self
    }

    #[must_use]
    pub fn simulations(mut self, count: usize) -> Self {
        self.spec.num_simulations = count;
        self
    }

    /// Width of the reported band, in percent
    #[must_use]
    pub fn confidence_level(mut self, level: u8) -> Self {
        self.spec.confidence_level = level;
        self
    }

    #[must_use]
    pub fn method(mut self, method: EstimationMethod) -> Self {
        self.spec.method = method;
        self
    }

    // =========================================================================
    // Contributions
    // =========================================================================

    /// Enable contributions of `annual_amount` per year, paid at `frequency`.
    /// A negative amount models withdrawals.
    #[must_use]
    pub fn contributions(mut self, annual_amount: f64, frequency: ContributionFrequency) -> Self {
        self.spec.contributions = ContributionSettings {
            enabled: true,
            annual_amount,
            frequency,
        };
        self
    }

    /// Contribute `amount` every month.
    #[must_use]
    pub fn monthly_contribution(self, amount: f64) -> Self {
        self.contributions(amount * 12.0, ContributionFrequency::Monthly)
    }

    /// Contribute `amount` every quarter.
    #[must_use]
    pub fn quarterly_contribution(self, amount: f64) -> Self {
        self.contributions(amount * 4.0, ContributionFrequency::Quarterly)
    }

    /// Contribute `amount` once a year.
    #[must_use]
    pub fn annual_contribution(self, amount: f64) -> Self {
        self.contributions(amount, ContributionFrequency::Annually)
    }

    // =========================================================================
    // Rebalancing Analysis
    // =========================================================================

    /// Enable the rebalancing analysis
    #[must_use]
    pub fn rebalancing(mut self, drift_threshold: f64, transaction_cost_pct: f64) -> Self {
        self.spec.rebalancing.enabled = true;
        self.spec.rebalancing.drift_threshold = drift_threshold;
        self.spec.rebalancing.transaction_cost_pct = transaction_cost_pct;
        self
    }

    #[must_use]
    pub fn max_rebalances_per_year(mut self, max: u32) -> Self {
        self.spec.rebalancing.max_rebalances_per_year = Some(max);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Validate and produce the parameters.
    pub fn build(self) -> Result<SimulationParameters> {
        SimulationParameters::try_from(self.spec)
    }
}
