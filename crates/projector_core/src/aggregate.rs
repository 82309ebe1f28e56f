//! Percentile bands and point risk statistics of a path ensemble.
//!
//! Bands are cross-sectional: at every time index the column of simulated
//! values is sorted and each requested percentile read off it. A band is
//! therefore not a realized path and may cross any individual simulation.

use std::collections::BTreeMap;

use crate::error::{ProjectionError, Result};
use crate::model::params::validate_confidence_level;
use crate::model::returns::mean_and_sample_std;
use crate::model::{PathMatrix, PercentileBands, ReturnStatistics, RiskMetrics};

/// Percentiles always reported, before the confidence band is merged in.
pub const BASE_PERCENTILES: [u8; 9] = [5, 10, 25, 40, 50, 60, 75, 90, 95];

/// Percentile of final values reported as VaR95
pub const VAR_PERCENTILE: u8 = 5;

/// The percentile levels of one run, resolved against its confidence level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PercentileSet {
    levels: Vec<u8>,
    lower: u8,
    upper: u8,
}

impl PercentileSet {
    /// `lower = (100 − C) / 2`, `upper = 100 − lower`, merged into
    /// [`BASE_PERCENTILES`] without duplicates.
    ///
    /// `C` must be even: an odd level would put the band edges on half
    /// percentiles, which integer-keyed bands cannot represent.
    pub fn for_confidence(confidence_level: u8) -> Result<Self> {
        validate_confidence_level(confidence_level)?;
        let lower = (100 - confidence_level) / 2;
        let upper = 100 - lower;

        let mut levels = BASE_PERCENTILES.to_vec();
        levels.extend([lower, upper]);
        levels.sort_unstable();
        levels.dedup();

        Ok(Self {
            levels,
            lower,
            upper,
        })
    }

    /// Ascending, unique
    #[must_use]
    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    #[must_use]
    pub fn lower(&self) -> u8 {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> u8 {
        self.upper
    }
}

/// Linear-interpolated percentile (`0..=100`) of an ascending slice.
///
/// Uses the rank `p / 100 · (n − 1)`, the same convention as NumPy's default.
/// Returns NaN for an empty slice.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Most negative `(v − running_max) / running_max` of a series, in percent.
///
/// Zero for a series that never falls below its previous peak.
#[must_use]
pub fn max_drawdown_pct(series: &[f64]) -> f64 {
    let Some(&first) = series.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut worst = 0.0f64;
    for &value in series {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.min((value - peak) / peak);
        }
    }
    worst * 100.0
}

/// Compound annual growth rate from `initial` to `final_value`, in percent.
#[must_use]
pub fn cagr_pct(final_value: f64, initial: f64, years: f64) -> f64 {
    if initial <= 0.0 || years <= 0.0 {
        return 0.0;
    }
    ((final_value.max(0.0) / initial).powf(1.0 / years) - 1.0) * 100.0
}

/// Mean of the ascending `sorted` values at or below `threshold`.
///
/// `None` when no value qualifies, which only happens for a NaN threshold.
fn tail_mean(sorted: &[f64], threshold: f64) -> Option<f64> {
    let tail = &sorted[..sorted.partition_point(|v| *v <= threshold)];
    (!tail.is_empty()).then(|| tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Bands, final values and risk metrics of one ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct PathSummary {
    pub percentiles: PercentileBands,
    pub final_values: Vec<f64>,
    pub risk: RiskMetrics,
}

/// Reduce a path ensemble to percentile bands and risk metrics.
///
/// `statistics` supplies the historical Sharpe ratio and volatility echoed
/// into the metrics.
pub fn summarize_paths(
    paths: &PathMatrix,
    set: &PercentileSet,
    initial_value: f64,
    years: u32,
    statistics: &ReturnStatistics,
) -> Result<PathSummary> {
    let (num_paths, num_points) = paths.shape();
    if num_paths == 0 || num_points == 0 {
        return Err(ProjectionError::invalid("paths", "path matrix is empty"));
    }
    if years == 0 {
        return Err(ProjectionError::invalid("years", "must be positive"));
    }

    let _span =
        tracing::info_span!("aggregate", paths = num_paths, points = num_points).entered();

    let mut bands: BTreeMap<u8, Vec<f64>> = set
        .levels()
        .iter()
        .map(|&p| (p, Vec::with_capacity(num_points)))
        .collect();

    let mut column = Vec::with_capacity(num_paths);
    for t in 0..num_points {
        column.clear();
        column.extend((0..num_paths).map(|p| paths.value(p, t)));
        column.sort_unstable_by(f64::total_cmp);
        for (&p, band) in bands.iter_mut() {
            band.push(percentile(&column, f64::from(p)));
        }
    }
    let percentiles = PercentileBands::new(bands);

    let final_values = paths.final_values();
    let mut sorted_finals = final_values.clone();
    sorted_finals.sort_unstable_by(f64::total_cmp);

    let var_95 = percentile(&sorted_finals, f64::from(VAR_PERCENTILE));
    let cvar_95 = tail_mean(&sorted_finals, var_95).unwrap_or_else(|| {
        tracing::warn!(var_95, "empty CVaR tail; reporting VaR95");
        var_95
    });

    let (expected_final_value, final_value_std) =
        mean_and_sample_std(final_values.iter().copied());
    let losses = final_values.iter().filter(|v| **v < initial_value).count();
    let probability_of_loss = losses as f64 / num_paths as f64;

    let years = f64::from(years);
    let band_cagr = |p: u8| {
        percentiles
            .final_value(p)
            .map_or(0.0, |v| cagr_pct(v, initial_value, years))
    };

    let risk = RiskMetrics {
        var_95,
        cvar_95,
        max_drawdown_median: percentiles.median().map_or(0.0, max_drawdown_pct),
        cagr_median: band_cagr(50),
        cagr_lower: band_cagr(set.lower()),
        cagr_upper: band_cagr(set.upper()),
        expected_final_value,
        final_value_std,
        probability_of_loss,
        historical_sharpe: statistics.sharpe,
        historical_volatility: statistics.volatility,
    };

    tracing::debug!(
        var_95,
        cvar_95,
        cagr_median = risk.cagr_median,
        max_drawdown_median = risk.max_drawdown_median,
        "aggregated ensemble"
    );

    Ok(PathSummary {
        percentiles,
        final_values,
        risk,
    })
}
