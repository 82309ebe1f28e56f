//! Command-line front end for the portfolio projection engine
//!
//! Loads a YAML scenario, runs `projector_core` and renders the result.

pub mod logging;
pub mod report;
pub mod scenario;

pub use logging::init_logging;
pub use report::{ProjectionReport, RebalancingSummary};
pub use scenario::{ReturnsSpec, Scenario, ScenarioError};
