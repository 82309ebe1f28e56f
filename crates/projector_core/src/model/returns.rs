//! Historical daily-returns matrix
//!
//! The storage layer hands the engine a dates × symbols matrix of simple daily
//! returns in which any cell may be missing. `ReturnsMatrix` validates the
//! shape; [`ReturnsMatrix::select`] projects the columns a run needs and drops
//! every row that is incomplete for those columns, producing `AlignedReturns`.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};

/// Annualized statistics of one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStatistics {
    pub symbol: String,
    pub annual_return: f64,
    pub annual_volatility: f64,
}

/// Dates × symbols matrix of daily simple returns, possibly with gaps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsMatrix {
    dates: Vec<Date>,
    symbols: Vec<String>,
    /// Row-major, `dates.len() * symbols.len()` cells
    values: Vec<Option<f64>>,
}

impl ReturnsMatrix {
    /// Build a matrix from one row per date. Non-finite cells are stored as
    /// missing.
    pub fn new(
        dates: Vec<Date>,
        symbols: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if symbols.is_empty() {
            return Err(ProjectionError::invalid(
                "returns.symbols",
                "at least one column is required",
            ));
        }
        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(ProjectionError::invalid(
                    "returns.symbols",
                    format!("duplicate column `{symbol}`"),
                ));
            }
        }
        if rows.len() != dates.len() {
            return Err(ProjectionError::invalid(
                "returns.rows",
                format!("{} rows for {} dates", rows.len(), dates.len()),
            ));
        }
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ProjectionError::invalid(
                "returns.dates",
                format!("dates must be strictly increasing ({} then {})", w[0], w[1]),
            ));
        }

        let mut values = Vec::with_capacity(rows.len() * symbols.len());
        for (row, date) in rows.into_iter().zip(&dates) {
            if row.len() != symbols.len() {
                return Err(ProjectionError::invalid(
                    "returns.rows",
                    format!(
                        "row {date} has {} values, expected {}",
                        row.len(),
                        symbols.len()
                    ),
                ));
            }
            values.extend(row.into_iter().map(|v| v.filter(|x| x.is_finite())));
        }

        Ok(Self {
            dates,
            symbols,
            values,
        })
    }

    /// Build a matrix with no missing cells.
    pub fn from_complete(
        dates: Vec<Date>,
        symbols: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Some).collect())
            .collect();
        Self::new(dates, symbols, rows)
    }

    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if col >= self.symbols.len() {
            return None;
        }
        self.values
            .get(row * self.symbols.len() + col)
            .copied()
            .flatten()
    }

    pub fn column_index(&self, symbol: &str) -> Result<usize> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .ok_or_else(|| ProjectionError::UnknownSymbol(symbol.to_string()))
    }

    /// All columns, restricted to rows with no missing cell.
    #[must_use]
    pub fn aligned(&self) -> AlignedReturns {
        let columns: Vec<usize> = (0..self.symbols.len()).collect();
        self.align_columns(&columns, self.symbols.clone())
    }

    /// Project onto `symbols` (in that order) and drop incomplete rows.
    pub fn select(&self, symbols: &[String]) -> Result<AlignedReturns> {
        let columns = symbols
            .iter()
            .map(|s| self.column_index(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.align_columns(&columns, symbols.to_vec()))
    }

    fn align_columns(&self, columns: &[usize], symbols: Vec<String>) -> AlignedReturns {
        let mut dates = Vec::new();
        let mut rows = Vec::new();
        for (r, date) in self.dates.iter().enumerate() {
            let row: Option<Vec<f64>> = columns.iter().map(|&c| self.get(r, c)).collect();
            if let Some(row) = row {
                dates.push(*date);
                rows.push(row);
            }
        }

        tracing::debug!(
            symbols = symbols.len(),
            raw_rows = self.dates.len(),
            aligned_rows = rows.len(),
            "aligned returns matrix"
        );

        AlignedReturns {
            dates,
            symbols,
            rows,
        }
    }
}

/// Complete rows of a returns matrix restricted to a set of symbols
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedReturns {
    dates: Vec<Date>,
    symbols: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl AlignedReturns {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    #[must_use]
    pub fn last_date(&self) -> Option<Date> {
        self.dates.last().copied()
    }

    /// Fail with `InsufficientData` unless at least `required` rows survived alignment.
    pub fn require(&self, required: usize) -> Result<()> {
        if self.rows.len() < required {
            return Err(ProjectionError::InsufficientData {
                observations: self.rows.len(),
                required,
            });
        }
        Ok(())
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row[col])
    }

    /// Weighted portfolio return for each row. `weights` is in column order.
    #[must_use]
    pub fn portfolio_series(&self, weights: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().zip(weights).map(|(r, w)| r * w).sum())
            .collect()
    }

    /// Per-column mean × N and sample standard deviation × √N.
    #[must_use]
    pub fn asset_statistics(&self, periods_per_year: usize) -> Vec<AssetStatistics> {
        let scale = periods_per_year as f64;
        self.symbols
            .iter()
            .enumerate()
            .map(|(c, symbol)| {
                let (mean, std_dev) = mean_and_sample_std(self.column(c));
                AssetStatistics {
                    symbol: symbol.clone(),
                    annual_return: mean * scale,
                    annual_volatility: std_dev * scale.sqrt(),
                }
            })
            .collect()
    }

    /// Pearson correlation between columns as row-major nested vectors.
    ///
    /// A column with zero variance is reported as uncorrelated with every
    /// other column (its correlation is otherwise undefined).
    #[must_use]
    pub fn correlation_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.symbols.len();
        let count = self.rows.len() as f64;
        let means: Vec<f64> = (0..n)
            .map(|c| self.column(c).sum::<f64>() / count.max(1.0))
            .collect();

        let mut cov = vec![vec![0.0; n]; n];
        for row in &self.rows {
            for i in 0..n {
                let di = row[i] - means[i];
                for j in i..n {
                    cov[i][j] += di * (row[j] - means[j]);
                }
            }
        }

        let mut corr = vec![vec![0.0; n]; n];
        for i in 0..n {
            corr[i][i] = 1.0;
            for j in (i + 1)..n {
                let denom = (cov[i][i] * cov[j][j]).sqrt();
                let rho = if denom > 0.0 {
                    (cov[i][j] / denom).clamp(-1.0, 1.0)
                } else {
                    0.0
                };
                corr[i][j] = rho;
                corr[j][i] = rho;
            }
        }
        corr
    }
}

/// Mean and sample (n − 1) standard deviation. Zero for fewer than two values.
pub(crate) fn mean_and_sample_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let values: Vec<f64> = values.collect();
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, variance.sqrt())
}
