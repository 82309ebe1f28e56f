//! Jointly simulated multi-asset unit-price paths.
//!
//! Every asset starts at 1.0. At each step an n-vector of independent
//! standard normals `Z` is drawn and correlated as `L·Z`, with `L` the lower
//! Cholesky factor of the asset correlation matrix; each asset then takes its
//! own GBM step with its correlated shock.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{ProjectionError, Result};
use crate::model::AssetStatistics;

/// Pivots within this distance of zero are treated as zero (semidefinite).
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Residual allowed below a zero pivot before the matrix is rejected.
const RESIDUAL_TOLERANCE: f64 = 1e-8;

const SYMMETRY_TOLERANCE: f64 = 1e-8;

/// Validated n × n correlation matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    dim: usize,
    values: Vec<f64>,
}

impl CorrelationMatrix {
    /// Square, finite, symmetric, unit diagonal, entries in [-1, 1].
    ///
    /// Positive-semidefiniteness is only checked by [`Self::cholesky`].
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let dim = rows.len();
        if dim == 0 {
            return Err(ProjectionError::invalid("correlation", "matrix is empty"));
        }
        if rows.iter().any(|r| r.len() != dim) {
            return Err(ProjectionError::invalid("correlation", "matrix is not square"));
        }
        let values: Vec<f64> = rows.into_iter().flatten().collect();

        for i in 0..dim {
            for j in 0..dim {
                let v = values[i * dim + j];
                if !v.is_finite() || !(-1.0..=1.0).contains(&v) {
                    return Err(ProjectionError::invalid(
                        "correlation",
                        format!("entry ({i}, {j}) = {v} is outside [-1, 1]"),
                    ));
                }
                if (v - values[j * dim + i]).abs() > SYMMETRY_TOLERANCE {
                    return Err(ProjectionError::invalid(
                        "correlation",
                        format!("matrix is not symmetric at ({i}, {j})"),
                    ));
                }
            }
            if (values[i * dim + i] - 1.0).abs() > SYMMETRY_TOLERANCE {
                return Err(ProjectionError::invalid(
                    "correlation",
                    format!("diagonal entry {i} must be 1"),
                ));
            }
        }

        Ok(Self { dim, values })
    }

    #[must_use]
    pub fn identity(dim: usize) -> Self {
        let mut values = vec![0.0; dim * dim];
        for i in 0..dim {
            values[i * dim + i] = 1.0;
        }
        Self { dim, values }
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.dim + j]
    }

    /// Lower Cholesky factor `L` with `L·Lᵀ = self`.
    ///
    /// Semidefinite matrices (e.g. perfectly correlated assets) factor with a
    /// zero column. A negative pivot, or a zero pivot with a non-zero residual
    /// below it, fails with `NonPositiveSemidefiniteCorrelation`.
    pub fn cholesky(&self) -> Result<CholeskyFactor> {
        let n = self.dim;
        let mut l = vec![0.0; n * n];

        for j in 0..n {
            let row_j = &l[j * n..j * n + j];
            let pivot = self.get(j, j) - row_j.iter().map(|x| x * x).sum::<f64>();

            if pivot < -PIVOT_TOLERANCE {
                return Err(ProjectionError::NonPositiveSemidefiniteCorrelation { index: j, pivot });
            }

            if pivot <= PIVOT_TOLERANCE {
                for i in (j + 1)..n {
                    let residual = self.get(i, j) - dot(&l[i * n..i * n + j], &l[j * n..j * n + j]);
                    if residual.abs() > RESIDUAL_TOLERANCE {
                        return Err(ProjectionError::NonPositiveSemidefiniteCorrelation {
                            index: j,
                            pivot,
                        });
                    }
                }
                continue;
            }

            let diag = pivot.sqrt();
            l[j * n + j] = diag;
            for i in (j + 1)..n {
                let residual = self.get(i, j) - dot(&l[i * n..i * n + j], &l[j * n..j * n + j]);
                l[i * n + j] = residual / diag;
            }
        }

        Ok(CholeskyFactor { dim: n, values: l })
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Lower-triangular Cholesky factor
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    dim: usize,
    values: Vec<f64>,
}

impl CholeskyFactor {
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.dim + j]
    }

    /// Write `L·z` into `out`.
    pub fn apply(&self, z: &[f64], out: &mut [f64]) {
        let n = self.dim;
        for (i, slot) in out.iter_mut().enumerate().take(n) {
            *slot = dot(&self.values[i * n..i * n + i + 1], &z[..=i]);
        }
    }
}

/// Unit prices of several assets over time, time-major
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPricePath {
    symbols: Vec<String>,
    num_points: usize,
    prices: Vec<f64>,
}

impl AssetPricePath {
    /// Build from one price vector per time point. `None` on ragged input.
    #[must_use]
    pub fn from_points(symbols: Vec<String>, points: Vec<Vec<f64>>) -> Option<Self> {
        let n = symbols.len();
        if points.iter().any(|p| p.len() != n) {
            return None;
        }
        Some(Self {
            symbols,
            num_points: points.len(),
            prices: points.into_iter().flatten().collect(),
        })
    }

    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Steps + 1
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Price of every asset at time index `t`.
    #[must_use]
    pub fn prices_at(&self, t: usize) -> &[f64] {
        let n = self.num_assets();
        &self.prices[t * n..(t + 1) * n]
    }

    /// Price series of one asset.
    #[must_use]
    pub fn asset_series(&self, asset: usize) -> Vec<f64> {
        (0..self.num_points).map(|t| self.prices_at(t)[asset]).collect()
    }
}

#[derive(Debug, Clone)]
pub struct CorrelatedAssetPathSimulator {
    symbols: Vec<String>,
    factor: CholeskyFactor,
    drift_terms: Vec<f64>,
    diffusion_terms: Vec<f64>,
}

impl CorrelatedAssetPathSimulator {
    /// Fails if the asset count does not match the matrix, an asset has a
    /// non-finite return or a negative volatility, or the matrix cannot be
    /// factored.
    pub fn new(
        assets: Vec<AssetStatistics>,
        correlation: &CorrelationMatrix,
        steps_per_year: usize,
    ) -> Result<Self> {
        if assets.is_empty() {
            return Err(ProjectionError::invalid("assets", "at least one asset is required"));
        }
        if assets.len() != correlation.dim() {
            return Err(ProjectionError::invalid(
                "correlation",
                format!(
                    "{}×{} matrix for {} assets",
                    correlation.dim(),
                    correlation.dim(),
                    assets.len()
                ),
            ));
        }
        if steps_per_year == 0 {
            return Err(ProjectionError::invalid("steps_per_year", "must be positive"));
        }
        for a in &assets {
            if !a.annual_return.is_finite()
                || !(a.annual_volatility.is_finite() && a.annual_volatility >= 0.0)
            {
                return Err(ProjectionError::invalid(
                    "assets",
                    format!(
                        "`{}` has invalid statistics (return {}, volatility {})",
                        a.symbol, a.annual_return, a.annual_volatility
                    ),
                ));
            }
        }

        let factor = correlation.cholesky()?;
        let dt = 1.0 / steps_per_year as f64;
        let drift_terms = assets
            .iter()
            .map(|a| (a.annual_return - 0.5 * a.annual_volatility.powi(2)) * dt)
            .collect();
        let diffusion_terms = assets
            .iter()
            .map(|a| a.annual_volatility * dt.sqrt())
            .collect();

        Ok(Self {
            symbols: assets.into_iter().map(|a| a.symbol).collect(),
            factor,
            drift_terms,
            diffusion_terms,
        })
    }

    /// One joint path of `num_steps` steps, drawing from `rng` in step order.
    pub fn simulate<R: Rng + ?Sized>(&self, num_steps: usize, rng: &mut R) -> AssetPricePath {
        let n = self.symbols.len();
        let mut prices = Vec::with_capacity((num_steps + 1) * n);
        prices.extend(std::iter::repeat_n(1.0, n));

        let mut z = vec![0.0; n];
        let mut shocks = vec![0.0; n];
        for t in 1..=num_steps {
            for zi in z.iter_mut() {
                *zi = StandardNormal.sample(&mut *rng);
            }
            self.factor.apply(&z, &mut shocks);

            let prev = (t - 1) * n;
            for i in 0..n {
                let growth = (self.drift_terms[i] + self.diffusion_terms[i] * shocks[i]).exp();
                prices.push(prices[prev + i] * growth);
            }
        }

        AssetPricePath {
            symbols: self.symbols.clone(),
            num_points: num_steps + 1,
            prices,
        }
    }
}
