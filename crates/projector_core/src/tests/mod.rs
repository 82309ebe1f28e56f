//! Integration tests for the projection engine
//!
//! Tests are organized by topic:
//! - `estimation` - Drift/volatility estimation from returns matrices
//! - `simulation` - GBM ensembles and their distribution
//! - `rebalancing` - Drift-triggered rebalancing through the public entry point
//! - `end_to_end` - Full projection runs
//! - `properties` - proptest invariants over random seeds and inputs

mod end_to_end;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::calendar;
use crate::model::ReturnsMatrix;

/// Annualized return and volatility of a synthetic asset
pub(crate) struct SyntheticAsset {
    pub symbol: &'static str,
    pub annual_return: f64,
    pub annual_volatility: f64,
}

pub(crate) const fn asset(
    symbol: &'static str,
    annual_return: f64,
    annual_volatility: f64,
) -> SyntheticAsset {
    SyntheticAsset {
        symbol,
        annual_return,
        annual_volatility,
    }
}

/// Independent normal daily returns on consecutive weekdays from 2020-01-02.
pub(crate) fn synthetic_returns(
    assets: &[SyntheticAsset],
    rows: usize,
    seed: u64,
) -> ReturnsMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let dists: Vec<Normal<f64>> = assets
        .iter()
        .map(|a| {
            Normal::new(a.annual_return / 252.0, a.annual_volatility / 252f64.sqrt()).unwrap()
        })
        .collect();

    let dates = calendar::trading_days(jiff::civil::date(2020, 1, 2), rows - 1).unwrap();
    let values = (0..rows)
        .map(|_| dists.iter().map(|d| d.sample(&mut rng)).collect())
        .collect();

    ReturnsMatrix::from_complete(
        dates,
        assets.iter().map(|a| a.symbol.to_string()).collect(),
        values,
    )
    .unwrap()
}

/// The two-asset universe used across topics
pub(crate) fn two_asset_returns(seed: u64) -> ReturnsMatrix {
    synthetic_returns(&[asset("A", 0.08, 0.15), asset("B", 0.05, 0.10)], 504, seed)
}
