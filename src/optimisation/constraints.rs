//! Code for adding constraints to the scheduling optimisation problem.
use super::VariableMap;
use crate::parameters::OptimizationParameters;
use crate::period::Period;
use crate::pump::PumpTier;
use highs::RowProblem as Problem;

/// Add all model constraints.
///
/// Per period `i` these are:
///
/// 1. Ambient-difference equality: `temp[i] - diff[i] = ambient_reference`.
/// 2. Temperature balance, a tight equality: the temperature at the next boundary is the current
///    temperature minus ambient loss, plus heat added by the pump, minus heat consumed.
/// 3. Tier budget: the activation fractions of one period sum to at most 1.
/// 4. Threshold gating for every tier except the unbounded last one (see
///    [`add_tier_gate_constraints`]).
pub(crate) fn add_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    parameters: &OptimizationParameters,
    periods: &[Period],
    tiers: &[PumpTier],
) {
    add_ambient_diff_constraints(problem, variables, parameters, periods);
    add_balance_constraints(problem, variables, parameters, periods, tiers);
    add_tier_budget_constraints(problem, variables, periods, tiers);
    add_tier_gate_constraints(problem, variables, parameters, periods, tiers);
}

/// The temperature the tank loses heat towards: the current room temperature if known, else the
/// room target
pub(crate) fn ambient_reference(parameters: &OptimizationParameters) -> f64 {
    parameters
        .indoor
        .current_temp
        .unwrap_or(parameters.indoor.target_temp)
}

/// Tie each `diff` variable to its boundary temperature.
///
/// `temp[i] - diff[i] = ambient_reference` makes `diff[i]` a restatement of `temp[i]` shifted by
/// a constant, so the ambient-loss term can be written linearly in an explicit variable.
fn add_ambient_diff_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    parameters: &OptimizationParameters,
    periods: &[Period],
) {
    let ambient = ambient_reference(parameters);
    for i in 0..periods.len() {
        problem.add_row(
            ambient..=ambient,
            [(variables.temp(i), 1.0), (variables.diff(i), -1.0)],
        );
    }
}

/// Add the temperature-balance recurrence, one tight equality per period:
///
/// `temp[i] - temp[i+1] - loss_rate * duration * diff[i] + sum_k fraction[i][k] * rate_k *
/// duration = consumption_total[i]`
fn add_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    parameters: &OptimizationParameters,
    periods: &[Period],
    tiers: &[PumpTier],
) {
    let loss_rate = parameters.tank.loss_degrees_per_hour;
    for (i, period) in periods.iter().enumerate() {
        let coeffs = [
            (variables.temp(i), 1.0),
            (variables.temp(i + 1), -1.0),
            (variables.diff(i), -loss_rate * period.duration),
        ]
        .into_iter()
        .chain(
            tiers.iter().enumerate().map(|(k, tier)| {
                (variables.tier_fraction(i, k), tier.heating_rate * period.duration)
            }),
        );

        problem.add_row(period.consumption.total..=period.consumption.total, coeffs);
    }
}

/// Limit each period to at most one tier's worth of full-power-equivalent operation
fn add_tier_budget_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    periods: &[Period],
    tiers: &[PumpTier],
) {
    for i in 0..periods.len() {
        let coeffs = (0..tiers.len()).map(|k| (variables.tier_fraction(i, k), 1.0));
        problem.add_row(0.0..=1.0, coeffs);
    }
}

/// Gate each bounded tier behind its temperature threshold with a big-M disjunction.
///
/// For period `i` and bounded tier `k`, with gate `below[i][k]`:
///
/// * gate open (1): the temperature reached using tiers `0..=k` must stay at or below tier `k`'s
///   threshold — `temp[i] - loss + sum_{j<=k} fraction[i][j] * rate_j * duration + M <=
///   threshold_k + consumption_total[i] + M`, which binds exactly when the gate is 1;
/// * gate closed (0): `fraction[i][k] <= below[i][k]` forces the fraction to zero, and the
///   threshold row gains `M` of slack.
///
/// The fraction's upper bound of 1 is the big M of the second row. Together the rows implement a
/// merit-order selection: a tier may only run while the resulting temperature stays inside its
/// declared range, approximating the pump's piecewise (and not necessarily convex) cost curve
/// without a general disjunctive formulation. The nudge on the gate objective (see
/// [`super::GATE_NUDGE`]) opens gates whenever feasible.
fn add_tier_gate_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    parameters: &OptimizationParameters,
    periods: &[Period],
    tiers: &[PumpTier],
) {
    let bounded_tiers = &tiers[..tiers.len() - 1];
    if bounded_tiers.is_empty() {
        return;
    }

    let big_m = threshold_big_m(parameters, periods, tiers);
    let loss_rate = parameters.tank.loss_degrees_per_hour;
    for (i, period) in periods.iter().enumerate() {
        for (k, tier) in bounded_tiers.iter().enumerate() {
            let coeffs = [
                (variables.temp(i), 1.0),
                (variables.diff(i), -loss_rate * period.duration),
                (variables.below(i, k), big_m),
            ]
            .into_iter()
            .chain(tiers[..=k].iter().enumerate().map(|(j, lower_tier)| {
                (
                    variables.tier_fraction(i, j),
                    lower_tier.heating_rate * period.duration,
                )
            }));
            problem.add_row(
                ..=tier.max_temp + period.consumption.total + big_m,
                coeffs,
            );

            problem.add_row(
                ..=0.0,
                [
                    (variables.tier_fraction(i, k), 1.0),
                    (variables.below(i, k), -1.0),
                ],
            );
        }
    }
}

/// Derive a safe big-M constant for the threshold rows from the problem's actual ranges.
///
/// With the gate closed, the threshold row needs enough slack to be vacuous for any feasible
/// assignment. The left side is at most the highest reachable boundary temperature plus the
/// largest possible per-period heat gain plus the largest ambient-loss correction; the right
/// side is at least the lowest tier threshold plus the smallest period consumption. The constant
/// is the gap between those two, floored at 1 so the gate rows stay well-scaled even for
/// degenerate inputs. Deriving it here (rather than hardcoding a magic number) keeps the
/// linearisation valid if callers use an unusual temperature scale.
fn threshold_big_m(
    parameters: &OptimizationParameters,
    periods: &[Period],
    tiers: &[PumpTier],
) -> f64 {
    let tank = &parameters.tank;
    let temp_upper = tank
        .max_temp
        .min(parameters.heat_pump.max_temp)
        .max(tank.current_temp);
    let temp_lower = periods
        .iter()
        .map(|p| p.min_temp)
        .fold(tank.current_temp, f64::min);

    let max_duration = periods.iter().map(|p| p.duration).fold(0.0, f64::max);
    let max_gain: f64 =
        tiers.iter().map(|t| t.heating_rate).sum::<f64>() * max_duration;

    let ambient = ambient_reference(parameters);
    let max_diff = (temp_upper - ambient).abs().max((temp_lower - ambient).abs());
    let max_loss = tank.loss_degrees_per_hour * max_duration * max_diff;

    let lowest_threshold = tiers
        .iter()
        .filter(|t| !t.is_unbounded())
        .map(|t| t.max_temp)
        .fold(f64::INFINITY, f64::min);
    let min_consumption = periods
        .iter()
        .map(|p| p.consumption.total)
        .fold(f64::INFINITY, f64::min)
        .min(0.0);

    ((temp_upper + max_gain + max_loss) - (lowest_threshold + min_consumption)).max(1.0)
}
