//! The result data model and reconstruction of a plan from solved variable values.
use crate::optimisation::SolutionValues;
use crate::parameters::OptimizationParameters;
use crate::period::Period;
use crate::pump::{PumpTier, tank_heat_capacity};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Above this activation fraction the target temperature hint looks two boundaries ahead
const FULL_POWER_FRACTION: f64 = 0.66;

/// How the solution was obtained, in decreasing order of quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SolveStatus {
    /// The integer solve proved optimality
    Optimal,
    /// The integer solve found a usable incumbent within the time budget
    Feasible,
    /// The LP relaxation solved after the integer solve failed; tier activations may be
    /// fractional across tiers
    Relaxed,
    /// Neither solve produced a usable solution
    Infeasible,
}

impl SolveStatus {
    /// Whether the plan is usable
    pub fn is_ok(self) -> bool {
        self != Self::Infeasible
    }
}

/// The heat pump's planned operation over one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpPlan {
    /// Fraction of the period the pump runs (sum over tiers)
    pub on_fraction: f64,
    /// Average electrical power consumed (W)
    pub consumed_power_watt: f64,
    /// Average heating power delivered to the tank (W)
    pub heating_power_watt: f64,
    /// Electricity cost over the period
    pub cost: f64,
    /// Storage temperature to steer towards over the period (°C)
    pub target_temp: f64,
}

/// The planned heat consumption over one period, restated in Watts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionPlan {
    /// Radiator circuit draw (W)
    pub radiator: f64,
    /// Background hot water draw (W)
    pub hot_water: f64,
    /// Scheduled draw-off events (W)
    pub draw_off: f64,
    /// Ambient loss from the tank (W)
    pub loss: f64,
    /// Sum of all components (W)
    pub total: f64,
}

/// One period of the final plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPeriod {
    /// Start of the period
    pub start: NaiveDateTime,
    /// End of the period
    pub end: NaiveDateTime,
    /// Period length in fractional hours
    pub duration: f64,
    /// Electricity price over the period (currency/kWh)
    pub price: f64,
    /// Outdoor temperature over the period (°C)
    pub outdoor_temp: f64,
    /// Required radiator flow temperature (°C)
    pub flow_temp: f64,
    /// Solved storage temperature at the period start (°C)
    pub tank_temp: f64,
    /// Planned pump operation
    pub pump: PumpPlan,
    /// Planned heat consumption
    pub consumption: ConsumptionPlan,
}

/// The outcome of one optimisation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// How the solution was obtained
    pub status: SolveStatus,
    /// The solver's own status string for the phase that produced the result
    pub solver_status: String,
    /// Whether the plan is usable (`status` is not infeasible)
    pub ok: bool,
    /// Total electricity cost of the plan
    pub objective: f64,
    /// The per-period plan
    pub plan: Vec<PlannedPeriod>,
    /// The parameters the plan was computed from
    pub parameters: OptimizationParameters,
}

/// Reconstruct the operational plan from solved variable values.
///
/// The objective is recomputed from the tier activations (consumed power x duration x price /
/// 1000 per period) rather than read from the solver, so the negligible tie-break weight on the
/// gate variables never shows up in the reported cost.
pub fn build_plan(
    parameters: &OptimizationParameters,
    periods: &[Period],
    tiers: &[PumpTier],
    values: &SolutionValues,
    status: SolveStatus,
    solver_status: String,
) -> OptimizationResult {
    let capacity = tank_heat_capacity(parameters.tank.volume_litres);

    let plan: Vec<_> = periods
        .iter()
        .enumerate()
        .map(|(i, period)| {
            build_planned_period(parameters, period, tiers, values, i, capacity)
        })
        .collect();
    let objective = plan.iter().map(|p| p.pump.cost).sum();

    OptimizationResult {
        status,
        solver_status,
        ok: status.is_ok(),
        objective,
        plan,
        parameters: parameters.clone(),
    }
}

/// Reconstruct one period of the plan
fn build_planned_period(
    parameters: &OptimizationParameters,
    period: &Period,
    tiers: &[PumpTier],
    values: &SolutionValues,
    i: usize,
    capacity: f64,
) -> PlannedPeriod {
    let fractions = &values.tier_fractions[i];

    let consumed_power_watt: f64 = fractions
        .iter()
        .zip(tiers)
        .map(|(fraction, tier)| fraction * tier.consumed_power_watt)
        .sum();
    let heating_power_watt: f64 = fractions
        .iter()
        .zip(tiers)
        .map(|(fraction, tier)| fraction * tier.heating_power_watt)
        .sum();
    let on_fraction: f64 = fractions.iter().sum();

    // The hint steers a controller that cannot follow fractional activation exactly: near-full
    // activation aims at the temperature two boundaries ahead, partial activation at the next
    // boundary, an idle pump at the tank's floor
    let next_temp = values.temps[i + 1];
    let two_ahead = values.temps.get(i + 2).copied().unwrap_or(next_temp);
    let target_temp = if on_fraction > 0.0 {
        if on_fraction > FULL_POWER_FRACTION {
            next_temp.max(two_ahead)
        } else {
            next_temp
        }
    } else {
        parameters.tank.min_temp
    };

    // Restate the temperature-equivalent consumption in Watts
    let radiator = period.consumption.radiator * capacity / period.duration;
    let hot_water = period.consumption.hot_water * capacity / period.duration;
    let draw_off = period.consumption.draw_off * capacity / period.duration;
    let loss = parameters.tank.loss_degrees_per_hour * values.diffs[i] * capacity;

    PlannedPeriod {
        start: period.start,
        end: period.end,
        duration: period.duration,
        price: period.price,
        outdoor_temp: period.outdoor_temp,
        flow_temp: period.flow_temp,
        tank_temp: values.temps[i],
        pump: PumpPlan {
            on_fraction,
            consumed_power_watt,
            heating_power_watt,
            cost: consumed_power_watt * period.duration * period.price / 1000.0,
            target_temp,
        },
        consumption: ConsumptionPlan {
            radiator,
            hot_water,
            draw_off,
            loss,
            total: radiator + hot_water + draw_off + loss,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_status() {
        assert!(SolveStatus::Optimal.is_ok());
        assert!(SolveStatus::Feasible.is_ok());
        assert!(SolveStatus::Relaxed.is_ok());
        assert!(!SolveStatus::Infeasible.is_ok());
        assert_eq!(SolveStatus::Relaxed.to_string(), "relaxed");
    }
}
