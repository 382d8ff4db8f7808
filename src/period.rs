//! The per-period thermal feature pass.
//!
//! Combines the time grid, the price/outdoor/draw-off lookups and the building specifications
//! into the physical quantities the optimisation works with: required radiator flow temperature,
//! minimum allowable storage temperature and heat consumption. Consumption is expressed in
//! storage-temperature-equivalent units, i.e. the number of degrees the tank drops over the
//! period if no heat is added.
use crate::extract::{DrawOffSchedule, OutdoorSeries, PriceTable};
use crate::parameters::OptimizationParameters;
use crate::pump::tank_heat_capacity;
use crate::time_grid::{TimeSlot, build_time_grid, start_of_day};
use chrono::NaiveDateTime;

/// Heat consumption over one period, in storage-temperature-equivalent degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consumption {
    /// Heat delivered to the radiator circuit
    pub radiator: f64,
    /// Background hot water draw
    pub hot_water: f64,
    /// Scheduled draw-off events
    pub draw_off: f64,
    /// Sum of all components
    pub total: f64,
}

/// One planning period with its derived physical quantities
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    /// Start of the period (the current time for period 0)
    pub start: NaiveDateTime,
    /// End of the period
    pub end: NaiveDateTime,
    /// Period length in fractional hours
    pub duration: f64,
    /// Outdoor temperature over the period (°C)
    pub outdoor_temp: f64,
    /// Radiator flow temperature required to hold the target room temperature (°C)
    pub flow_temp: f64,
    /// Minimum allowable storage temperature at the period start (°C)
    pub min_temp: f64,
    /// Electricity price over the period (currency/kWh)
    pub price: f64,
    /// Heat consumption over the period
    pub consumption: Consumption,
}

/// Derive the full period sequence for a parameter set.
///
/// Periods are contiguous, non-overlapping and cover exactly
/// `horizon_hours * slots_per_hour` slots, with the first truncated to start at
/// `parameters.time`.
pub fn build_periods(parameters: &OptimizationParameters) -> Vec<Period> {
    let prices = PriceTable::new(&parameters.prices, start_of_day(parameters.time));
    let outdoor = OutdoorSeries::new(parameters.outdoor.clone());
    let draw_offs = DrawOffSchedule::new(parameters.draw_offs.clone());
    let capacity = tank_heat_capacity(parameters.tank.volume_litres);

    build_time_grid(
        parameters.time,
        parameters.slots_per_hour,
        parameters.horizon_hours,
    )
    .iter()
    .map(|slot| build_period(parameters, slot, &prices, &outdoor, &draw_offs, capacity))
    .collect()
}

/// Derive one period's physical quantities
fn build_period(
    parameters: &OptimizationParameters,
    slot: &TimeSlot,
    prices: &PriceTable,
    outdoor: &OutdoorSeries,
    draw_offs: &DrawOffSchedule,
    capacity: f64,
) -> Period {
    let indoor = &parameters.indoor;
    let duration = slot.duration_hours();
    let outdoor_temp = outdoor.temp_at(slot.start);
    let draw_off = draw_offs.demand_for(slot);

    // The flow temperature compensates for any room temperature deficit and for heat lost to the
    // outdoors (less passive gains), but never drops below the room target
    let room_deficit = indoor.target_temp - indoor.current_temp.unwrap_or(indoor.target_temp);
    let flow_temp = (indoor.target_temp
        + room_deficit
        + (indoor.target_temp - outdoor_temp - indoor.passive_heating_degrees)
            * parameters.radiator.flow_gain)
        .max(indoor.target_temp);

    let flow_offset = parameters.tank.radiator_flow_offset.unwrap_or(0.0);
    let min_temp = (flow_temp - flow_offset)
        .max(parameters.hot_water.min_temp)
        .max(parameters.tank.min_temp)
        .max(draw_off.temp);

    let radiator = (flow_temp - indoor.target_temp) * parameters.radiator.power_per_degree
        / capacity
        * duration;
    let hot_water = parameters.hot_water.average_power_watt / capacity * duration;
    let draw_off_loss = draw_off.power_watt / capacity * duration;

    Period {
        start: slot.start,
        end: slot.end,
        duration,
        outdoor_temp,
        flow_temp,
        min_temp,
        price: prices.price_at(slot.start),
        consumption: Consumption {
            radiator,
            hot_water,
            draw_off: draw_off_loss,
            total: radiator + hot_water + draw_off_loss,
        },
    }
}
