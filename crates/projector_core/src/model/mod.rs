//! Data model for the projection engine
//!
//! This module contains all the data types used in projection runs:
//! - `params` - Validated simulation inputs and their settings
//! - `returns` - Historical daily-returns matrix and aligned views
//! - `paths` - Dense simulated value matrix
//! - `results` - Projection and rebalancing outputs

pub(crate) mod params;
mod paths;
mod results;
pub(crate) mod returns;

pub use params::*;
pub use paths::*;
pub use results::*;
pub use returns::*;
