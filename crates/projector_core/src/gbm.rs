//! Geometric Brownian motion path ensemble.
//!
//! Each path evolves independently as
//!
//! ```text
//! V[t] = V[t-1] · exp((μ − σ²/2)·dt + σ·√dt·Z)
//! ```
//!
//! with one standard-normal draw `Z` per path per step. Optional periodic
//! contributions are added after the multiplicative update of their step.
//!
//! Reproducibility: one seed per path is drawn, in path order, from the
//! caller's generator; each path then runs on its own `ChaCha8Rng`. The matrix
//! is therefore identical whether rows are filled serially or in parallel.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{ProjectionError, Result};
use crate::model::{ContributionSettings, PathMatrix};

/// Fixed cash flow applied every `interval_steps` steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionSchedule {
    /// Added to every path; negative for withdrawals
    pub amount: f64,
    pub interval_steps: usize,
}

impl ContributionSchedule {
    /// `None` when contributions are disabled or zero.
    #[must_use]
    pub fn from_settings(
        settings: &ContributionSettings,
        trading_days_per_year: usize,
    ) -> Option<Self> {
        if !settings.enabled || settings.annual_amount == 0.0 {
            return None;
        }
        Some(Self {
            amount: settings.amount_per_period(),
            interval_steps: settings.frequency.interval_steps(trading_days_per_year),
        })
    }

    #[inline]
    fn applies_at(&self, step: usize) -> bool {
        step % self.interval_steps == 0
    }
}

/// Inputs of a GBM ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct GbmParameters {
    pub num_simulations: usize,
    pub num_steps: usize,
    /// Annualized drift μ
    pub drift: f64,
    /// Annualized volatility σ
    pub volatility: f64,
    pub initial_value: f64,
    /// dt = 1 / steps_per_year
    pub steps_per_year: usize,
    pub contributions: Option<ContributionSchedule>,
}

#[derive(Debug, Clone)]
pub struct GeometricBrownianPathSimulator {
    params: GbmParameters,
    drift_term: f64,
    diffusion_term: f64,
}

impl GeometricBrownianPathSimulator {
    pub fn new(params: GbmParameters) -> Result<Self> {
        if params.num_simulations == 0 {
            return Err(ProjectionError::invalid("num_simulations", "must be positive"));
        }
        if params.num_steps == 0 {
            return Err(ProjectionError::invalid("num_steps", "must be positive"));
        }
        if params.steps_per_year == 0 {
            return Err(ProjectionError::invalid("steps_per_year", "must be positive"));
        }
        if !params.drift.is_finite() {
            return Err(ProjectionError::invalid("drift", "must be finite"));
        }
        if !(params.volatility.is_finite() && params.volatility >= 0.0) {
            return Err(ProjectionError::invalid(
                "volatility",
                format!("must be finite and non-negative (got {})", params.volatility),
            ));
        }
        if !(params.initial_value.is_finite() && params.initial_value > 0.0) {
            return Err(ProjectionError::invalid(
                "initial_value",
                format!("must be positive (got {})", params.initial_value),
            ));
        }
        if let Some(c) = &params.contributions
            && (c.interval_steps == 0 || !c.amount.is_finite())
        {
            return Err(ProjectionError::invalid(
                "contributions",
                "interval must be positive and amount finite",
            ));
        }

        let dt = 1.0 / params.steps_per_year as f64;
        let drift_term = (params.drift - 0.5 * params.volatility * params.volatility) * dt;
        let diffusion_term = params.volatility * dt.sqrt();

        Ok(Self {
            params,
            drift_term,
            diffusion_term,
        })
    }

    /// Generate the `num_simulations × (num_steps + 1)` value matrix.
    pub fn simulate<R: Rng + ?Sized>(&self, rng: &mut R) -> PathMatrix {
        let _span = tracing::info_span!(
            "gbm_paths",
            simulations = self.params.num_simulations,
            steps = self.params.num_steps
        )
        .entered();

        let seeds: Vec<u64> = (0..self.params.num_simulations)
            .map(|_| rng.next_u64())
            .collect();

        let mut paths = PathMatrix::filled(
            self.params.num_simulations,
            self.params.num_steps + 1,
            self.params.initial_value,
        );

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            paths
                .par_rows_mut()
                .zip(seeds.par_iter())
                .for_each(|(row, seed)| self.fill_path(row, *seed));
        }

        #[cfg(not(feature = "parallel"))]
        for (row, seed) in paths.rows_mut().zip(&seeds) {
            self.fill_path(row, *seed);
        }

        tracing::debug!(
            drift = self.params.drift,
            volatility = self.params.volatility,
            "generated GBM ensemble"
        );
        paths
    }

    fn fill_path(&self, row: &mut [f64], seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        row[0] = self.params.initial_value;

        for t in 1..row.len() {
            let z: f64 = StandardNormal.sample(&mut rng);
            let mut value = row[t - 1] * (self.drift_term + self.diffusion_term * z).exp();

            if let Some(c) = &self.params.contributions
                && c.applies_at(t)
            {
                // A withdrawal can exhaust the portfolio but not overdraw it
                value = (value + c.amount).max(0.0);
            }
            row[t] = value;
        }
    }
}
