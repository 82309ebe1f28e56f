//! Portfolio projection library
//!
//! This crate provides the Monte Carlo engine behind the portfolio projection
//! and rebalancing reports. It supports:
//! - Drift/volatility estimation from a historical daily-returns matrix
//!   (historical mean or exponentially-weighted)
//! - Geometric Brownian motion path ensembles with periodic contributions
//! - Cross-sectional percentile bands and point risk statistics
//!   (VaR, CVaR, median-path drawdown, CAGR)
//! - Correlated multi-asset price paths via Cholesky factorization
//! - Drift-triggered rebalancing analysis with a per-year event cap
//!
//! All randomness comes from the `rand::Rng` handed to each entry point, so
//! two runs with identically seeded generators produce identical results.
//!
//! # Example
//!
//! ```ignore
//! use projector_core::{EngineConfig, ParametersBuilder, estimate_and_simulate};
//! use rand::SeedableRng;
//!
//! let params = ParametersBuilder::new()
//!     .asset("VTI", 0.6)
//!     .asset("BND", 0.4)
//!     .years(10)
//!     .simulations(5_000)
//!     .initial_value(100_000.0)
//!     .monthly_contribution(500.0)
//!     .build()?;
//!
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
//! let result = estimate_and_simulate(&params, &returns, &EngineConfig::default(), &mut rng)?;
//! println!("median CAGR: {:.2}%", result.risk.cagr_median);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod aggregate;
pub mod calendar;
pub mod correlated;
pub mod error;
pub mod estimate;
pub mod gbm;
pub mod projection;
pub mod rebalance;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{EngineConfig, ParametersBuilder};
pub use error::{ProjectionError, Result};
pub use projection::{analyze_rebalancing, estimate_and_simulate};
pub use rebalance::RebalancingRequest;
