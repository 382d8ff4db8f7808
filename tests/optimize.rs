//! End-to-end tests for the optimisation entry point.
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use float_cmp::assert_approx_eq;
use heatplan::cli::example_parameters;
use heatplan::optimize;
use heatplan::parameters::{
    ForecastPoint, HeatPumpSpec, HotWaterSpec, IndoorSpec, OptimizationParameters, PowerTier,
    PriceSpec, RadiatorSpec, TankSpec,
};
use heatplan::plan::SolveStatus;
use itertools::Itertools;

fn example_day() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 11, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[test]
fn test_plan_covers_horizon() {
    let parameters = example_parameters();
    let result = optimize(&parameters).unwrap();

    assert!(result.ok);
    assert_eq!(
        result.plan.len(),
        (parameters.horizon_hours * parameters.slots_per_hour) as usize
    );
    assert_eq!(result.plan[0].start, parameters.time);
    assert!(
        result
            .plan
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.end == b.start && a.start < b.start)
    );
    assert_eq!(result.parameters, parameters);
}

#[test]
fn test_boundary_temperatures_within_bounds() {
    let parameters = example_parameters();
    let result = optimize(&parameters).unwrap();
    assert!(result.ok);

    let upper = parameters.tank.max_temp.min(parameters.heat_pump.max_temp);
    assert_approx_eq!(
        f64,
        result.plan[0].tank_temp,
        parameters.tank.current_temp,
        epsilon = 1e-6
    );
    for period in &result.plan[1..] {
        // With no configured flow offset the flow temperature is itself the storage floor
        assert!(period.tank_temp >= period.flow_temp - 1e-5);
        assert!(period.tank_temp >= parameters.hot_water.min_temp - 1e-5);
        assert!(period.tank_temp <= upper + 1e-5);
    }

    // The evening shower raises the floor to its target temperature
    let shower = &parameters.draw_offs[0];
    for period in result
        .plan
        .iter()
        .filter(|p| p.start >= shower.start && p.start < shower.end)
    {
        assert!(period.tank_temp >= shower.temp - 1e-5);
    }
}

#[test]
fn test_objective_matches_cost_sum() {
    let result = optimize(&example_parameters()).unwrap();
    assert!(result.ok);

    let cost_sum: f64 = result
        .plan
        .iter()
        .map(|p| p.pump.consumed_power_watt * p.duration * p.price / 1000.0)
        .sum();
    assert_approx_eq!(f64, result.objective, cost_sum, epsilon = 1e-6);
    assert!(result.objective > 0.0);
}

#[test]
fn test_prices_follow_hour_of_slot() {
    let mut parameters = example_parameters();
    parameters.time = example_day() + TimeDelta::minutes(72);
    parameters.slots_per_hour = 3;
    parameters.horizon_hours = 10;
    parameters.prices = PriceSpec {
        today: (0..24).map(f64::from).collect(),
        tomorrow: Some((24..48).map(f64::from).collect()),
    };

    let result = optimize(&parameters).unwrap();

    let prices: Vec<f64> = result.plan[..9].iter().map(|p| p.price).collect();
    assert_eq!(prices, &[1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);

    let starts: Vec<NaiveDateTime> = result.plan[..4].iter().map(|p| p.start).collect();
    assert_eq!(
        starts,
        &[
            example_day() + TimeDelta::minutes(72),
            example_day() + TimeDelta::minutes(80),
            example_day() + TimeDelta::minutes(100),
            example_day() + TimeDelta::minutes(120),
        ]
    );
}

#[test]
fn test_outdoor_temperature_step_hold() {
    let mut parameters = example_parameters();
    parameters.time = example_day() + TimeDelta::minutes(132); // 2h12m into the day
    parameters.slots_per_hour = 3;
    parameters.horizon_hours = 3;
    parameters.outdoor = (0..5)
        .map(|hour| ForecastPoint {
            time: example_day() + TimeDelta::hours(hour),
            temp: hour as f64,
        })
        .collect();

    let result = optimize(&parameters).unwrap();

    let temps: Vec<f64> = result.plan.iter().map(|p| p.outdoor_temp).collect();
    assert_eq!(temps, &[2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 4.0]);
}

/// Regression scenario: a cold tank must reach shower temperature within a single hour and the
/// sole tier's full output is exactly enough, so the solver has to run it flat out.
#[test]
fn test_extreme_demand_selects_full_power() {
    let rise_per_hour = 10_000.0 / (500.0 * 1.16);
    let parameters = OptimizationParameters {
        time: NaiveDate::from_ymd_opt(2023, 11, 13)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        slots_per_hour: 1,
        horizon_hours: 1,
        heat_pump: HeatPumpSpec {
            max_temp: 60.0,
            tiers: vec![PowerTier {
                below_degrees: None,
                heating_power_watt: 10_000.0,
                consumed_power_watt: 10_000.0,
            }],
        },
        tank: TankSpec {
            volume_litres: 500.0,
            loss_degrees_per_hour: 0.0,
            current_temp: 20.0,
            min_temp: 20.0,
            max_temp: 60.0,
            radiator_flow_offset: None,
        },
        indoor: IndoorSpec {
            current_temp: Some(21.0),
            target_temp: 21.0,
            passive_heating_degrees: 0.0,
        },
        radiator: RadiatorSpec {
            flow_gain: 0.0,
            power_per_degree: 0.0,
        },
        hot_water: HotWaterSpec {
            min_temp: 20.0 + rise_per_hour,
            average_power_watt: 0.0,
        },
        prices: PriceSpec {
            today: vec![1.0; 24],
            tomorrow: None,
        },
        outdoor: vec![ForecastPoint {
            time: NaiveDate::from_ymd_opt(2023, 11, 13)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            temp: 21.0,
        }],
        draw_offs: Vec::new(),
    };

    let result = optimize(&parameters).unwrap();

    assert!(result.ok);
    assert_eq!(result.plan.len(), 1);
    let pump = &result.plan[0].pump;
    assert_approx_eq!(f64, pump.on_fraction, 1.0, epsilon = 1e-3);
    assert_approx_eq!(f64, pump.heating_power_watt, 10_000.0, epsilon = 10.0);
    assert_approx_eq!(f64, pump.consumed_power_watt, 10_000.0, epsilon = 10.0);
    // 10 kW for one hour at 1.0/kWh
    assert_approx_eq!(f64, result.objective, 10.0, epsilon = 0.1);
}

#[test]
fn test_unreachable_demand_is_reported_in_band() {
    let mut parameters = example_parameters();
    // Hotter than the pump can ever heat the tank
    parameters.hot_water.min_temp = 90.0;

    let result = optimize(&parameters).unwrap();

    assert!(!result.ok);
    assert_eq!(result.status, SolveStatus::Infeasible);
    assert!(!result.solver_status.is_empty());
    // The plan keeps its shape so callers can still inspect the per-period inputs
    assert_eq!(
        result.plan.len(),
        (parameters.horizon_hours * parameters.slots_per_hour) as usize
    );
}

#[test]
fn test_invalid_parameters_abort() {
    let mut parameters = example_parameters();
    parameters.heat_pump.tiers.clear();
    assert!(optimize(&parameters).is_err());

    let mut parameters = example_parameters();
    parameters.prices.today.truncate(12);
    assert!(optimize(&parameters).is_err());
}
