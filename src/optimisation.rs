//! Code for building and solving the scheduling optimisation problem.
//!
//! The problem is a mixed-integer linear program over the planning periods: continuous storage
//! temperatures at each period boundary, continuous per-tier activation fractions per period, and
//! binary gate variables that keep each bounded pump tier from running once the storage
//! temperature would leave its operating range.
//!
//! Solving runs in two phases: a full integer solve with presolve and a bounded time budget,
//! then, if that fails, a single re-solve with the gates relaxed to continuous `[0, 1]`.
//! Persistent infeasibility is reported in-band, not retried.
use crate::parameters::OptimizationParameters;
use crate::period::{Period, build_periods};
use crate::plan::{OptimizationResult, SolveStatus, build_plan};
use crate::pump::{PumpTier, pump_tiers};
use anyhow::Result;
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use ::log::{debug, info};

mod constraints;
use constraints::add_constraints;

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
type Variable = highs::Col;

/// Wall-clock budget for the integer solve phase, in seconds
const MIP_TIME_LIMIT: f64 = 10.0;

/// Negligible negative objective weight on the tier gate variables.
///
/// Biases each gate towards 1 when both states are otherwise equivalent, so the threshold
/// constraint rather than the gate decides whether a tier may run.
const GATE_NUDGE: f64 = -1e-5;

/// The decision variables of one problem instance, in insertion order.
///
/// Keeps track of which column corresponds to which period/tier combination, both for defining
/// constraints and for reading the results of the optimisation.
pub(crate) struct VariableMap {
    /// Storage temperature at each period boundary; `N + 1` entries for `N` periods
    temp: Vec<Variable>,
    /// Storage-to-ambient-reference difference, one per period
    diff: Vec<Variable>,
    /// Activation fraction per period and tier
    tier_fraction: Vec<Vec<Variable>>,
    /// Gate per period and bounded tier (all tiers except the last)
    below: Vec<Vec<Variable>>,
}

impl VariableMap {
    /// The storage temperature variable at boundary `i`
    fn temp(&self, i: usize) -> Variable {
        self.temp[i]
    }

    /// The ambient-difference variable for period `i`
    fn diff(&self, i: usize) -> Variable {
        self.diff[i]
    }

    /// The activation fraction variable for period `i`, tier `k`
    fn tier_fraction(&self, i: usize, k: usize) -> Variable {
        self.tier_fraction[i][k]
    }

    /// The gate variable for period `i`, bounded tier `k`
    fn below(&self, i: usize, k: usize) -> Variable {
        self.below[i][k]
    }

    /// The total number of columns added to the problem
    fn num_columns(&self) -> usize {
        self.temp.len()
            + self.diff.len()
            + self.tier_fraction.iter().map(Vec::len).sum::<usize>()
            + self.below.iter().map(Vec::len).sum::<usize>()
    }

    /// Read the solved values back out of the solution columns.
    ///
    /// Columns are stored in insertion order, which matches the order of
    /// [`add_variables`].
    fn extract(&self, columns: &[f64]) -> SolutionValues {
        let temps = columns[..self.temp.len()].to_vec();
        let mut offset = self.temp.len();
        let diffs = columns[offset..offset + self.diff.len()].to_vec();
        offset += self.diff.len();

        let tier_fractions = self
            .tier_fraction
            .iter()
            .map(|fractions| {
                let values = columns[offset..offset + fractions.len()].to_vec();
                offset += fractions.len();
                values
            })
            .collect();

        SolutionValues {
            temps,
            diffs,
            tier_fractions,
        }
    }
}

/// The solved variable values needed to reconstruct a plan
pub struct SolutionValues {
    /// Storage temperature at each period boundary (°C)
    pub temps: Vec<f64>,
    /// Storage-to-ambient-reference difference per period (°C)
    pub diffs: Vec<f64>,
    /// Activation fraction per period and tier
    pub tier_fractions: Vec<Vec<f64>>,
}

impl SolutionValues {
    /// Whether the values look like a valid incumbent for the given problem.
    ///
    /// The `highs` crate does not expose HiGHS's primal-validity flag, so after a time-limited
    /// solve this shape/bounds check decides whether the returned columns are a usable plan.
    fn is_usable(&self, current_temp: f64) -> bool {
        let finite = self.temps.iter().all(|t| t.is_finite())
            && self.diffs.iter().all(|d| d.is_finite());
        let fractions_in_range = self
            .tier_fractions
            .iter()
            .flatten()
            .all(|f| (-1e-6..=1.0 + 1e-6).contains(f));

        finite && fractions_in_range && (self.temps[0] - current_temp).abs() < 1e-3
    }
}

/// Whether the gate variables are integer or relaxed to continuous
#[derive(Clone, Copy, PartialEq, Eq)]
enum SolvePhase {
    /// Binary gates; the real problem
    Integer,
    /// Gates relaxed to `[0, 1]`; the degraded fallback
    Relaxed,
}

/// Compute a least-cost operating schedule for the given parameters.
///
/// This is the core entry point: it derives the period features, builds the MILP, runs the
/// two-phase solve and reconstructs the plan. Validation failures abort the call with an error;
/// an unsolvable problem is a normal outcome, reported with `ok = false` in the result.
pub fn optimize(parameters: &OptimizationParameters) -> Result<OptimizationResult> {
    parameters.validate()?;

    let periods = build_periods(parameters);
    let tiers = pump_tiers(&parameters.heat_pump, parameters.tank.volume_litres);
    info!(
        "Optimising {} periods from {} with {} pump tiers",
        periods.len(),
        parameters.time,
        tiers.len()
    );

    let (status, solver_status, values) = solve_two_phase(parameters, &periods, &tiers);
    info!("Solve finished: {status} ({solver_status})");

    Ok(build_plan(
        parameters,
        &periods,
        &tiers,
        &values,
        status,
        solver_status,
    ))
}

/// Run the integer solve and, if it fails, the relaxed solve
fn solve_two_phase(
    parameters: &OptimizationParameters,
    periods: &[Period],
    tiers: &[PumpTier],
) -> (SolveStatus, String, SolutionValues) {
    let (mip_status, values) = solve_phase(parameters, periods, tiers, SolvePhase::Integer);
    match mip_status {
        HighsModelStatus::Optimal => {
            (SolveStatus::Optimal, format!("{mip_status:?}"), values)
        }
        HighsModelStatus::ReachedTimeLimit
            if values.is_usable(parameters.tank.current_temp) =>
        {
            (SolveStatus::Feasible, format!("{mip_status:?}"), values)
        }
        _ => {
            info!("Integer solve failed ({mip_status:?}); relaxing gate variables");
            let (lp_status, values) =
                solve_phase(parameters, periods, tiers, SolvePhase::Relaxed);
            let status = if lp_status == HighsModelStatus::Optimal {
                SolveStatus::Relaxed
            } else {
                SolveStatus::Infeasible
            };
            (status, format!("{lp_status:?}"), values)
        }
    }
}

/// Build and solve one problem instance.
///
/// Each call uses a fresh, exclusive model; nothing is shared between phases or invocations.
fn solve_phase(
    parameters: &OptimizationParameters,
    periods: &[Period],
    tiers: &[PumpTier],
    phase: SolvePhase,
) -> (HighsModelStatus, SolutionValues) {
    let mut problem = Problem::default();
    let variables = add_variables(&mut problem, parameters, periods, tiers, phase);
    add_constraints(&mut problem, &variables, parameters, periods, tiers);
    debug!(
        "Problem has {} columns and {} rows",
        variables.num_columns(),
        problem.num_rows()
    );

    let mut model = problem.optimise(Sense::Minimise);
    model.set_option("output_flag", false);
    model.set_option("presolve", "on");
    if phase == SolvePhase::Integer {
        model.set_option("time_limit", MIP_TIME_LIMIT);
    }

    let solved = model.solve();
    let status = solved.status();
    let values = variables.extract(solved.get_solution().columns());
    (status, values)
}

/// Add the decision variables to the problem.
///
/// # Variables
///
/// * `temp[0..=N]` - storage temperature at each period boundary. `temp[0]` is fixed to the
///   current tank temperature; later boundaries are bounded below by the period's minimum
///   allowable temperature and above by the lower of the tank and pump maxima.
/// * `diff[0..N]` - the storage-to-ambient-reference difference, free; tied to `temp` by an
///   equality constraint so the loss term stays linear in an explicit variable.
/// * `tier_fraction[i][k]` - fraction of period `i` during which tier `k` runs, in `[0, 1]`,
///   with the period's energy cost for that tier as objective coefficient.
/// * `below[i][k]` - gate for each bounded tier; binary in the integer phase, `[0, 1]` when
///   relaxed, with a negligible negative objective weight (see [`GATE_NUDGE`]).
fn add_variables(
    problem: &mut Problem,
    parameters: &OptimizationParameters,
    periods: &[Period],
    tiers: &[PumpTier],
    phase: SolvePhase,
) -> VariableMap {
    let temp_upper = parameters.tank.max_temp.min(parameters.heat_pump.max_temp);
    let current_temp = parameters.tank.current_temp;

    let temp = (0..=periods.len())
        .map(|i| {
            if i == 0 {
                problem.add_column(0.0, current_temp..=current_temp)
            } else {
                // Boundary i is the start of period i; the final boundary keeps the last
                // period's floor
                let min_temp = periods[i.min(periods.len() - 1)].min_temp;
                problem.add_column(0.0, min_temp..=temp_upper)
            }
        })
        .collect();

    let diff = periods
        .iter()
        .map(|_| problem.add_column(0.0, f64::NEG_INFINITY..=f64::INFINITY))
        .collect();

    let tier_fraction = periods
        .iter()
        .map(|period| {
            tiers
                .iter()
                .map(|tier| {
                    let cost =
                        period.price * tier.consumed_power_watt * period.duration / 1000.0;
                    problem.add_column(cost, 0.0..=1.0)
                })
                .collect()
        })
        .collect();

    let below = periods
        .iter()
        .map(|_| {
            tiers[..tiers.len() - 1]
                .iter()
                .map(|_| match phase {
                    SolvePhase::Integer => problem.add_integer_column(GATE_NUDGE, 0..=1),
                    SolvePhase::Relaxed => problem.add_column(GATE_NUDGE, 0.0..=1.0),
                })
                .collect()
        })
        .collect();

    VariableMap {
        temp,
        diff,
        tier_fraction,
        below,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::example_parameters;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_relaxed_solve_keeps_plan_shape(example_parameters: OptimizationParameters) {
        let periods = build_periods(&example_parameters);
        let tiers = pump_tiers(
            &example_parameters.heat_pump,
            example_parameters.tank.volume_litres,
        );

        let (status, values) =
            solve_phase(&example_parameters, &periods, &tiers, SolvePhase::Relaxed);

        assert_eq!(status, HighsModelStatus::Optimal);
        assert_eq!(values.temps.len(), periods.len() + 1);
        assert_eq!(values.diffs.len(), periods.len());
        assert_eq!(values.tier_fractions.len(), periods.len());
        assert_approx_eq!(
            f64,
            values.temps[0],
            example_parameters.tank.current_temp,
            epsilon = 1e-6
        );
        // Relaxation may split activation across tiers, but fractions stay within [0, 1]
        for fraction in values.tier_fractions.iter().flatten() {
            assert!((-1e-6..=1.0 + 1e-6).contains(fraction));
        }
    }

    #[rstest]
    fn test_integer_and_relaxed_phases_agree_on_shape(
        example_parameters: OptimizationParameters,
    ) {
        let periods = build_periods(&example_parameters);
        let tiers = pump_tiers(
            &example_parameters.heat_pump,
            example_parameters.tank.volume_litres,
        );

        let (_, integer) =
            solve_phase(&example_parameters, &periods, &tiers, SolvePhase::Integer);
        let (_, relaxed) =
            solve_phase(&example_parameters, &periods, &tiers, SolvePhase::Relaxed);

        assert_eq!(integer.temps.len(), relaxed.temps.len());
        assert_eq!(integer.tier_fractions.len(), relaxed.tier_fractions.len());
    }

    #[rstest]
    fn test_solution_values_usable(example_parameters: OptimizationParameters) {
        let periods = build_periods(&example_parameters);
        let tiers = pump_tiers(
            &example_parameters.heat_pump,
            example_parameters.tank.volume_litres,
        );

        let (status, values) =
            solve_phase(&example_parameters, &periods, &tiers, SolvePhase::Integer);
        assert_eq!(status, HighsModelStatus::Optimal);
        assert!(values.is_usable(example_parameters.tank.current_temp));
        assert!(!values.is_usable(example_parameters.tank.current_temp + 5.0));
    }
}
