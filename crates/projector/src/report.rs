//! Run reports
//!
//! `ProjectionReport` is the serializable digest of a projection: everything
//! except the raw path matrix. Both it and [`RebalancingSummary`] render as
//! plain text for the terminal.

use std::collections::BTreeMap;
use std::fmt;

use jiff::civil::Date;
use projector_core::model::{
    RebalancingRecommendation, ReturnStatistics, RiskMetrics, SimulationResult,
};
use serde::Serialize;

/// Band values at the end of one simulated year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: usize,
    pub date: Date,
    pub lower: f64,
    pub median: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectionReport {
    pub seed: u64,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub statistics: ReturnStatistics,
    pub confidence_band: (u8, u8),
    /// Final value of every percentile band
    pub final_percentiles: BTreeMap<u8, f64>,
    pub yearly: Vec<YearPoint>,
    pub risk: RiskMetrics,
    pub rebalancing: Option<RebalancingRecommendation>,
}

impl ProjectionReport {
    #[must_use]
    pub fn from_result(result: &SimulationResult, seed: u64, steps_per_year: usize) -> Self {
        let (lower, upper) = result.confidence_band;
        let band = |p: u8, t: usize| {
            result
                .percentiles
                .get(p)
                .and_then(|b| b.get(t).copied())
                .unwrap_or(f64::NAN)
        };

        let yearly = result
            .dates
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(t, _)| t % steps_per_year.max(1) == 0)
            .map(|(t, date)| YearPoint {
                year: t / steps_per_year.max(1),
                date: *date,
                lower: band(lower, t),
                median: band(50, t),
                upper: band(upper, t),
            })
            .collect();

        let final_percentiles = result
            .percentiles
            .iter()
            .filter_map(|(p, b)| b.last().map(|v| (p, *v)))
            .collect();

        Self {
            seed,
            start_date: result.dates.first().copied(),
            end_date: result.dates.last().copied(),
            statistics: result.statistics.clone(),
            confidence_band: result.confidence_band,
            final_percentiles,
            yearly,
            risk: result.risk.clone(),
            rebalancing: result.rebalancing.clone(),
        }
    }
}

fn fmt_date(date: Option<Date>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

impl fmt::Display for ProjectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lower, upper) = self.confidence_band;
        let stats = &self.statistics;
        let risk = &self.risk;

        writeln!(
            f,
            "Projection {} -> {} (seed {})",
            fmt_date(self.start_date),
            fmt_date(self.end_date),
            self.seed
        )?;
        writeln!(
            f,
            "Estimated drift {:.2}%, volatility {:.2}%, Sharpe {:.2} ({} observations)",
            stats.drift * 100.0,
            stats.volatility * 100.0,
            stats.sharpe,
            stats.observations
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>5}  {:>10}  {:>14}  {:>14}  {:>14}",
            "Year",
            "Date",
            format!("P{lower}"),
            "Median",
            format!("P{upper}")
        )?;
        for point in &self.yearly {
            writeln!(
                f,
                "{:>5}  {:>10}  {:>14.2}  {:>14.2}  {:>14.2}",
                point.year, point.date, point.lower, point.median, point.upper
            )?;
        }
        writeln!(f)?;
        writeln!(f, "VaR 95%:              {:>14.2}", risk.var_95)?;
        writeln!(f, "CVaR 95%:             {:>14.2}", risk.cvar_95)?;
        writeln!(f, "Expected final value: {:>14.2}", risk.expected_final_value)?;
        writeln!(f, "Probability of loss:  {:>13.1}%", risk.probability_of_loss * 100.0)?;
        writeln!(f, "Median max drawdown:  {:>13.2}%", risk.max_drawdown_median)?;
        writeln!(
            f,
            "CAGR P{lower}/median/P{upper}: {:.2}% / {:.2}% / {:.2}%",
            risk.cagr_lower, risk.cagr_median, risk.cagr_upper
        )?;

        if let Some(rec) = &self.rebalancing {
            writeln!(f)?;
            write!(f, "{}", RebalancingSummary(rec))?;
        }
        Ok(())
    }
}

/// Text rendering of a rebalancing recommendation
pub struct RebalancingSummary<'a>(pub &'a RebalancingRecommendation);

impl fmt::Display for RebalancingSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rec = self.0;
        writeln!(
            f,
            "Rebalancing at {:.1}% drift: {} events ({:.2} per year)",
            rec.trigger_threshold * 100.0,
            rec.num_events(),
            rec.rebalances_per_year
        )?;
        if rec.num_events() == 0 {
            return writeln!(f, "No rebalancing needed over the horizon.");
        }
        writeln!(
            f,
            "Average drift {:.2}%, max drift {:.2}%",
            rec.avg_drift * 100.0,
            rec.max_drift * 100.0
        )?;
        writeln!(
            f,
            "Transaction costs {:.3}%, Sharpe improvement {:.4}, benefit/cost {:.2}",
            rec.total_transaction_costs * 100.0,
            rec.sharpe_improvement,
            rec.cost_benefit_ratio
        )?;
        for (date, drift) in rec.rebalance_dates.iter().zip(&rec.drift_at_rebalance) {
            writeln!(f, "  {date}  drift {:.2}%", drift * 100.0)?;
            for action in rec.actions_on(*date) {
                writeln!(
                    f,
                    "      {:?} {:<8} {:.1}% -> {:.1}%",
                    action.action,
                    action.symbol,
                    action.current_weight * 100.0,
                    action.target_weight * 100.0
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use projector_core::model::ReturnsMatrix;
    use projector_core::{EngineConfig, ParametersBuilder, estimate_and_simulate};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn result(rebalancing: bool) -> SimulationResult {
        let dates = projector_core::calendar::trading_days(date(2023, 1, 2), 59).unwrap();
        let rows = (0..60)
            .map(|i| {
                let a = if i % 3 == 0 { 0.012 } else { -0.003 };
                let b = if i % 2 == 0 { 0.004 } else { -0.002 };
                vec![a, b]
            })
            .collect();
        let returns =
            ReturnsMatrix::from_complete(dates, vec!["A".into(), "B".into()], rows).unwrap();

        let mut builder = ParametersBuilder::new()
            .asset("A", 0.5)
            .asset("B", 0.5)
            .years(2)
            .simulations(200)
            .initial_value(10_000.0);
        if rebalancing {
            builder = builder.rebalancing(0.01, 0.001);
        }
        let params = builder.build().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        estimate_and_simulate(&params, &returns, &EngineConfig::default(), &mut rng).unwrap()
    }

    #[test]
    fn test_report_has_one_point_per_year() {
        let report = ProjectionReport::from_result(&result(false), 3, 252);
        assert_eq!(report.yearly.len(), 2);
        assert_eq!(report.yearly[1].year, 2);
        assert_eq!(report.end_date, Some(report.yearly[1].date));
        assert!(report.yearly.iter().all(|p| p.lower <= p.median && p.median <= p.upper));
        assert_eq!(report.final_percentiles.len(), 9);
    }

    #[test]
    fn test_report_text_and_json() {
        let report = ProjectionReport::from_result(&result(true), 3, 252);
        let text = report.to_string();
        assert!(text.contains("seed 3"));
        assert!(text.contains("VaR 95%"));
        assert!(text.contains("Rebalancing at 1.0% drift"));

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("paths").is_none());
        assert_eq!(json["seed"], 3);
        assert!(json["rebalancing"].is_object());
    }

    #[test]
    fn test_empty_recommendation_text() {
        let rec = RebalancingRecommendation::no_events(0.3);
        let text = RebalancingSummary(&rec).to_string();
        assert!(text.contains("0 events"));
        assert!(text.contains("No rebalancing needed"));
    }
}
