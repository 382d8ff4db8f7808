//! Common functionality for heatplan.
//!
//! heatplan computes a least-cost operating schedule for a heat-pump-driven thermal storage tank
//! that serves space heating and hot water, given time-varying electricity prices, a weather
//! forecast and scheduled hot-water draw-off events. The schedule is found by solving a
//! mixed-integer linear program with the HiGHS solver.
#![warn(missing_docs)]
pub mod cli;
pub mod extract;
pub mod log;
pub mod optimisation;
pub mod parameters;
pub mod period;
pub mod plan;
pub mod pump;
pub mod time_grid;

#[cfg(test)]
mod fixture;

pub use optimisation::optimize;
