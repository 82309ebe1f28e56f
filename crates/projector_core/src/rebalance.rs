//! Drift-triggered rebalancing analysis.
//!
//! A portfolio starts at its target weights and is carried along a simulated
//! multi-asset price path. Whenever the largest absolute deviation of a
//! realized weight from its target exceeds the trigger threshold, an event is
//! recorded and the holdings are reset to target. There is no forced
//! rebalance at the end of the horizon.
//!
//! With `max_rebalances_per_year` set, only the highest-drift events up to
//! `max × years` are kept. Selection is by drift; the result is always
//! chronological.

use std::collections::HashSet;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::correlated::AssetPricePath;
use crate::error::{ProjectionError, Result};
use crate::model::params::{MAX_YEARS, MIN_YEARS, validate_allocation, validate_rebalancing};
use crate::model::{RebalanceAction, RebalanceEvent, RebalancingRecommendation, TradeAction};

/// Inputs of a rebalancing analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingRequest {
    pub symbols: Vec<String>,
    pub target_weights: Vec<f64>,
    pub years: u32,
    /// Absolute weight drift (fraction) that triggers an event
    pub drift_threshold: f64,
    /// Cost of one rebalance as a fraction of portfolio value
    pub transaction_cost_pct: f64,
    /// Annualized portfolio drift used by the benefit estimate
    pub expected_return: f64,
    /// Annualized portfolio volatility used by the benefit estimate
    pub volatility: f64,
    #[serde(default)]
    pub max_rebalances_per_year: Option<u32>,
}

impl RebalancingRequest {
    pub fn validate(&self) -> Result<()> {
        validate_allocation(&self.symbols, &self.target_weights)?;
        validate_rebalancing(
            self.drift_threshold,
            self.transaction_cost_pct,
            self.max_rebalances_per_year,
        )?;
        if !(MIN_YEARS..=MAX_YEARS).contains(&self.years) {
            return Err(ProjectionError::invalid(
                "years",
                format!("must be in {MIN_YEARS}..={MAX_YEARS} (got {})", self.years),
            ));
        }
        if !self.expected_return.is_finite() {
            return Err(ProjectionError::invalid("expected_return", "must be finite"));
        }
        if !(self.volatility.is_finite() && self.volatility >= 0.0) {
            return Err(ProjectionError::invalid(
                "volatility",
                format!("must be finite and non-negative (got {})", self.volatility),
            ));
        }
        Ok(())
    }

    /// Event cap over the whole horizon, if any.
    #[must_use]
    pub fn event_cap(&self) -> Option<usize> {
        self.max_rebalances_per_year
            .map(|per_year| per_year as usize * self.years as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftState {
    /// Holdings equal the target weights
    AtTarget,
    /// Holdings have evolved with prices since the last reset
    Drifting,
}

/// Largest absolute drift after one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftObservation {
    pub max_drift: f64,
    /// Asset with the largest absolute drift (first on ties)
    pub asset: usize,
}

/// Per-asset holdings carried along a price path
#[derive(Debug, Clone)]
pub struct DriftTracker {
    target: Vec<f64>,
    holdings: Vec<f64>,
    weights: Vec<f64>,
    state: DriftState,
}

impl DriftTracker {
    #[must_use]
    pub fn new(target_weights: &[f64]) -> Self {
        Self {
            target: target_weights.to_vec(),
            holdings: target_weights.to_vec(),
            weights: target_weights.to_vec(),
            state: DriftState::AtTarget,
        }
    }

    #[must_use]
    pub fn state(&self) -> DriftState {
        self.state
    }

    #[must_use]
    pub fn current_weights(&self) -> &[f64] {
        &self.weights
    }

    /// `current − target` for asset `i`; positive means overweight.
    #[must_use]
    pub fn signed_drift(&self, i: usize) -> f64 {
        self.weights[i] - self.target[i]
    }

    /// Grow each holding by its price ratio and recompute weights.
    pub fn advance(&mut self, prev_prices: &[f64], prices: &[f64]) -> DriftObservation {
        for ((h, prev), next) in self.holdings.iter_mut().zip(prev_prices).zip(prices) {
            if *prev > 0.0 {
                *h *= next / prev;
            }
        }
        let total: f64 = self.holdings.iter().sum();
        if total > 0.0 {
            for (w, h) in self.weights.iter_mut().zip(&self.holdings) {
                *w = h / total;
            }
        }
        self.state = DriftState::Drifting;

        let mut observation = DriftObservation {
            max_drift: 0.0,
            asset: 0,
        };
        for i in 0..self.target.len() {
            let drift = self.signed_drift(i).abs();
            if drift > observation.max_drift {
                observation = DriftObservation {
                    max_drift: drift,
                    asset: i,
                };
            }
        }
        observation
    }

    /// Reset holdings to target.
    pub fn rebalance(&mut self) {
        self.holdings.copy_from_slice(&self.target);
        self.weights.copy_from_slice(&self.target);
        self.state = DriftState::AtTarget;
    }
}

#[derive(Debug, Clone)]
pub struct DriftRebalancingAnalyzer {
    request: RebalancingRequest,
    /// Only assets drifting by more than this get an action record
    action_drift_floor: f64,
}

impl DriftRebalancingAnalyzer {
    pub fn new(request: RebalancingRequest, action_drift_floor: f64) -> Result<Self> {
        request.validate()?;
        if !(0.0..1.0).contains(&action_drift_floor) {
            return Err(ProjectionError::invalid(
                "action_drift_floor",
                format!("must be in [0, 1) (got {action_drift_floor})"),
            ));
        }
        Ok(Self {
            request,
            action_drift_floor,
        })
    }

    #[must_use]
    pub fn request(&self) -> &RebalancingRequest {
        &self.request
    }

    /// Run the drift state machine over `path`. `dates[t]` labels step `t`.
    pub fn analyze(
        &self,
        path: &AssetPricePath,
        dates: &[Date],
    ) -> Result<RebalancingRecommendation> {
        let request = &self.request;
        if path.symbols() != request.symbols.as_slice() {
            return Err(ProjectionError::invalid(
                "path",
                format!(
                    "simulated assets {:?} do not match requested symbols {:?}",
                    path.symbols(),
                    request.symbols
                ),
            ));
        }
        if dates.len() != path.num_points() {
            return Err(ProjectionError::invalid(
                "dates",
                format!("{} dates for {} time points", dates.len(), path.num_points()),
            ));
        }

        let _span = tracing::info_span!(
            "rebalancing",
            threshold = request.drift_threshold,
            steps = path.num_points().saturating_sub(1)
        )
        .entered();

        let mut tracker = DriftTracker::new(&request.target_weights);
        let mut events = Vec::new();
        let mut actions = Vec::new();

        for t in 1..path.num_points() {
            let observation = tracker.advance(path.prices_at(t - 1), path.prices_at(t));
            if observation.max_drift <= request.drift_threshold {
                continue;
            }

            let date = dates[t];
            events.push(RebalanceEvent {
                date,
                step: t,
                max_drift: observation.max_drift,
                trigger_symbol: request.symbols[observation.asset].clone(),
            });
            for (i, symbol) in request.symbols.iter().enumerate() {
                let drift = tracker.signed_drift(i);
                if drift.abs() > self.action_drift_floor {
                    actions.push(RebalanceAction {
                        date,
                        symbol: symbol.clone(),
                        current_weight: tracker.current_weights()[i],
                        target_weight: request.target_weights[i],
                        drift,
                        action: TradeAction::for_drift(drift),
                    });
                }
            }
            tracker.rebalance();
        }

        let raw_events = events.len();
        if let Some(cap) = request.event_cap() {
            (events, actions) = cap_events(events, actions, cap);
        }
        tracing::debug!(raw_events, kept = events.len(), "drift events detected");

        if events.is_empty() {
            tracing::warn!(
                threshold = request.drift_threshold,
                "drift never exceeded threshold; no rebalancing needed"
            );
            return Ok(RebalancingRecommendation::no_events(request.drift_threshold));
        }

        let recommendation = self.summarize(events, actions);
        tracing::info!(
            events = recommendation.num_events(),
            avg_drift = recommendation.avg_drift,
            sharpe_improvement = recommendation.sharpe_improvement,
            "rebalancing analysis complete"
        );
        Ok(recommendation)
    }

    fn summarize(
        &self,
        events: Vec<RebalanceEvent>,
        actions: Vec<RebalanceAction>,
    ) -> RebalancingRecommendation {
        let request = &self.request;
        let n = events.len() as f64;
        let years = f64::from(request.years);

        let drift_at_rebalance: Vec<f64> = events.iter().map(|e| e.max_drift).collect();
        let avg_drift = drift_at_rebalance.iter().sum::<f64>() / n;
        let max_drift = drift_at_rebalance.iter().copied().fold(0.0, f64::max);

        let total_transaction_costs = n * request.transaction_cost_pct;
        let sharpe_benefit = if request.volatility > 0.0 {
            avg_drift * 0.5 * (request.expected_return / request.volatility)
        } else {
            0.0
        };
        let cost_drag = total_transaction_costs / years;
        let cost_benefit_ratio = if cost_drag > 0.0 {
            sharpe_benefit / cost_drag
        } else {
            0.0
        };

        RebalancingRecommendation {
            rebalance_dates: events.iter().map(|e| e.date).collect(),
            drift_at_rebalance,
            trigger_threshold: request.drift_threshold,
            avg_drift,
            max_drift,
            total_transaction_costs,
            cost_benefit_ratio,
            sharpe_improvement: sharpe_benefit - cost_drag,
            rebalances_per_year: n / years,
            events,
            actions,
        }
    }
}

/// Keep the `cap` highest-drift events in chronological order, and only the
/// actions on their dates.
fn cap_events(
    mut events: Vec<RebalanceEvent>,
    mut actions: Vec<RebalanceAction>,
    cap: usize,
) -> (Vec<RebalanceEvent>, Vec<RebalanceAction>) {
    if events.len() <= cap {
        return (events, actions);
    }
    // Stable: equal drifts keep their chronological order
    events.sort_by(|a, b| b.max_drift.total_cmp(&a.max_drift));
    events.truncate(cap);
    events.sort_by_key(|e| e.step);

    let kept: HashSet<Date> = events.iter().map(|e| e.date).collect();
    actions.retain(|a| kept.contains(&a.date));
    (events, actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar;
    use jiff::civil::date;

    fn request() -> RebalancingRequest {
        RebalancingRequest {
            symbols: vec!["A".into(), "B".into()],
            target_weights: vec![0.5, 0.5],
            years: 1,
            drift_threshold: 0.05,
            transaction_cost_pct: 0.001,
            expected_return: 0.08,
            volatility: 0.16,
            max_rebalances_per_year: None,
        }
    }

    /// A moves by `factors` (cumulative), B stays flat.
    fn path_from_factors(factors: &[f64]) -> (AssetPricePath, Vec<Date>) {
        let mut points = vec![vec![1.0, 1.0]];
        let mut a = 1.0;
        for f in factors {
            a *= f;
            points.push(vec![a, 1.0]);
        }
        let path = AssetPricePath::from_points(vec!["A".into(), "B".into()], points).unwrap();
        let dates = calendar::trading_days(date(2024, 1, 2), factors.len()).unwrap();
        (path, dates)
    }

    fn analyzer(request: RebalancingRequest) -> DriftRebalancingAnalyzer {
        DriftRebalancingAnalyzer::new(request, 0.01).unwrap()
    }

    #[test]
    fn test_tracker_starts_at_target() {
        let mut tracker = DriftTracker::new(&[0.6, 0.4]);
        assert_eq!(tracker.state(), DriftState::AtTarget);
        assert_eq!(tracker.current_weights(), &[0.6, 0.4]);

        let obs = tracker.advance(&[1.0, 1.0], &[1.0, 1.0]);
        assert_eq!(tracker.state(), DriftState::Drifting);
        assert_eq!(obs.max_drift, 0.0);

        tracker.advance(&[1.0, 1.0], &[2.0, 1.0]);
        // 1.2 / 1.6
        assert!((tracker.current_weights()[0] - 0.75).abs() < 1e-12);
        assert!((tracker.signed_drift(1) + 0.15).abs() < 1e-12);

        tracker.rebalance();
        assert_eq!(tracker.state(), DriftState::AtTarget);
        assert_eq!(tracker.current_weights(), &[0.6, 0.4]);
    }

    #[test]
    fn test_single_crossing() {
        // Weights of A: 0.524, 0.545, 0.565 (> 0.05 drift), then reset
        let (path, dates) = path_from_factors(&[1.1, 1.2 / 1.1, 1.3 / 1.2, 1.0]);
        let rec = analyzer(request()).analyze(&path, &dates).unwrap();

        assert_eq!(rec.num_events(), 1);
        assert_eq!(rec.rebalance_dates, vec![dates[3]]);
        assert_eq!(rec.events[0].step, 3);
        assert_eq!(rec.events[0].trigger_symbol, "A");
        assert!((rec.drift_at_rebalance[0] - (1.3 / 2.3 - 0.5)).abs() < 1e-12);

        assert_eq!(rec.actions.len(), 2);
        let a = &rec.actions[0];
        assert_eq!((a.symbol.as_str(), a.action), ("A", TradeAction::Sell));
        assert!(a.drift > 0.0);
        let b = &rec.actions[1];
        assert_eq!((b.symbol.as_str(), b.action), ("B", TradeAction::Buy));
        assert!(b.drift < 0.0);
    }

    #[test]
    fn test_drift_at_threshold_does_not_trigger() {
        // A triples: holdings 1.5 / 0.5, weights 0.75 / 0.25, drift exactly 0.25
        let (path, dates) = path_from_factors(&[3.0]);
        let mut tracker = DriftTracker::new(&[0.5, 0.5]);
        assert_eq!(tracker.advance(path.prices_at(0), path.prices_at(1)).max_drift, 0.25);

        let at = |drift_threshold| {
            analyzer(RebalancingRequest {
                drift_threshold,
                ..request()
            })
            .analyze(&path, &dates)
            .unwrap()
        };
        assert_eq!(at(0.25).num_events(), 0);
        assert_eq!(at(0.249).num_events(), 1);
    }

    #[test]
    fn test_no_events_all_scalars_zero() {
        let (path, dates) = path_from_factors(&[1.5, 2.0, 0.5]);
        let rec = analyzer(RebalancingRequest {
            drift_threshold: 0.5,
            ..request()
        })
        .analyze(&path, &dates)
        .unwrap();

        assert_eq!(rec, RebalancingRecommendation::no_events(0.5));
        assert_eq!(rec.cost_benefit_ratio, 0.0);
        assert_eq!(rec.sharpe_improvement, 0.0);
    }

    #[test]
    fn test_cost_benefit() {
        let factors = [1.3, 1.5, 1.25, 1.6];
        let (path, dates) = path_from_factors(&factors);
        let rec = analyzer(request()).analyze(&path, &dates).unwrap();

        let drifts: Vec<f64> = factors.iter().map(|f| f / (f + 1.0) - 0.5).collect();
        let avg = drifts.iter().sum::<f64>() / 4.0;
        assert_eq!(rec.num_events(), 4);
        assert!((rec.avg_drift - avg).abs() < 1e-12);
        assert!((rec.max_drift - drifts[3]).abs() < 1e-12);
        assert!((rec.total_transaction_costs - 0.004).abs() < 1e-15);

        let benefit = avg * 0.5 * (0.08 / 0.16);
        assert!((rec.sharpe_improvement - (benefit - 0.004)).abs() < 1e-12);
        assert!((rec.cost_benefit_ratio - benefit / 0.004).abs() < 1e-9);
        assert_eq!(rec.rebalances_per_year, 4.0);
    }

    #[test]
    fn test_zero_cost_and_zero_volatility_guards() {
        let (path, dates) = path_from_factors(&[1.3, 1.5]);

        let rec = analyzer(RebalancingRequest {
            transaction_cost_pct: 0.0,
            ..request()
        })
        .analyze(&path, &dates)
        .unwrap();
        assert_eq!(rec.cost_benefit_ratio, 0.0);
        assert!(rec.sharpe_improvement > 0.0);

        let rec = analyzer(RebalancingRequest {
            volatility: 0.0,
            ..request()
        })
        .analyze(&path, &dates)
        .unwrap();
        assert_eq!(rec.cost_benefit_ratio, 0.0);
        assert!(rec.sharpe_improvement < 0.0);
    }

    #[test]
    fn test_cap_keeps_largest_drifts_in_date_order() {
        let (path, dates) = path_from_factors(&[1.3, 1.5, 1.25, 1.6]);
        let rec = analyzer(RebalancingRequest {
            max_rebalances_per_year: Some(2),
            ..request()
        })
        .analyze(&path, &dates)
        .unwrap();

        assert_eq!(rec.rebalance_dates, vec![dates[2], dates[4]]);
        assert_eq!(rec.events.iter().map(|e| e.step).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(rec.actions.len(), 4);
        assert!(rec.actions.iter().all(|a| rec.rebalance_dates.contains(&a.date)));
        assert!((rec.total_transaction_costs - 0.002).abs() < 1e-15);
    }

    #[test]
    fn test_cap_not_applied_below_limit() {
        let (path, dates) = path_from_factors(&[1.3, 1.5]);
        let rec = analyzer(RebalancingRequest {
            max_rebalances_per_year: Some(5),
            ..request()
        })
        .analyze(&path, &dates)
        .unwrap();
        assert_eq!(rec.num_events(), 2);
    }

    #[test]
    fn test_small_drifts_get_no_action() {
        // Three assets; C barely moves relative to the portfolio
        let points = vec![vec![1.0, 1.0, 1.0], vec![1.5, 0.7, 1.0]];
        let symbols = vec!["A".into(), "B".into(), "C".into()];
        let path = AssetPricePath::from_points(symbols, points).unwrap();
        let dates = calendar::trading_days(date(2024, 1, 2), 1).unwrap();
        let rec = analyzer(RebalancingRequest {
            symbols: vec!["A".into(), "B".into(), "C".into()],
            target_weights: vec![0.4, 0.4, 0.2],
            ..request()
        })
        .analyze(&path, &dates)
        .unwrap();

        // Total 0.6 + 0.28 + 0.2 = 1.08; C weight 0.185, drift -0.015
        assert_eq!(rec.num_events(), 1);
        assert_eq!(rec.actions.len(), 3);

        let rec = DriftRebalancingAnalyzer::new(
            RebalancingRequest {
                symbols: vec!["A".into(), "B".into(), "C".into()],
                target_weights: vec![0.4, 0.4, 0.2],
                ..request()
            },
            0.02,
        )
        .unwrap()
        .analyze(&path, &dates)
        .unwrap();
        assert_eq!(rec.actions.len(), 2);
        assert!(rec.actions.iter().all(|a| a.symbol != "C"));
    }

    #[test]
    fn test_request_validation() {
        assert!(request().validate().is_ok());
        assert!(
            RebalancingRequest {
                target_weights: vec![0.5, 0.6],
                ..request()
            }
            .validate()
            .is_err()
        );
        assert!(
            RebalancingRequest {
                drift_threshold: 0.0,
                ..request()
            }
            .validate()
            .is_err()
        );
        assert!(
            RebalancingRequest {
                years: 0,
                ..request()
            }
            .validate()
            .is_err()
        );
        assert!(
            RebalancingRequest {
                max_rebalances_per_year: Some(0),
                ..request()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_mismatched_path_rejected() {
        let (path, dates) = path_from_factors(&[1.1, 1.1]);
        let err = analyzer(request()).analyze(&path, &dates[..2]);
        assert!(matches!(err, Err(ProjectionError::InvalidParameter { .. })));

        let swapped = analyzer(RebalancingRequest {
            symbols: vec!["B".into(), "A".into()],
            ..request()
        })
        .analyze(&path, &dates);
        assert!(matches!(
            swapped,
            Err(ProjectionError::InvalidParameter { field: "path", .. })
        ));
    }
}
