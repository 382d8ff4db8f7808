//! The input data model for an optimisation request.
//!
//! All temperatures are in degrees Celsius, powers in Watts, prices in the caller's currency per
//! kWh and durations in hours unless stated otherwise.
use anyhow::{Context, Result, ensure};
use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The number of hourly prices expected per day
pub const PRICES_PER_DAY: usize = 24;

/// One discrete operating mode of the heat pump.
///
/// A tier is valid while the storage temperature stays below its threshold. Tiers must be given in
/// ascending threshold order; only the last tier may omit `below_degrees`, in which case it is
/// valid up to the pump's maximum temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerTier {
    /// Upper storage temperature threshold for this tier (°C); `None` means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below_degrees: Option<f64>,
    /// Heating power delivered to the tank while this tier is active (W)
    pub heating_power_watt: f64,
    /// Electrical power consumed while this tier is active (W)
    pub consumed_power_watt: f64,
}

/// The heat pump's tiered power curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPumpSpec {
    /// Maximum storage temperature the pump will heat to (°C)
    pub max_temp: f64,
    /// Power tiers in ascending threshold order
    pub tiers: Vec<PowerTier>,
}

/// The storage tank specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankSpec {
    /// Tank volume in litres
    pub volume_litres: f64,
    /// Heat loss to the surroundings, in degrees per hour per degree of temperature difference
    pub loss_degrees_per_hour: f64,
    /// Storage temperature at the start of the horizon (°C)
    pub current_temp: f64,
    /// Minimum allowed storage temperature (°C)
    pub min_temp: f64,
    /// Maximum allowed storage temperature (°C)
    pub max_temp: f64,
    /// How far the radiator flow temperature may exceed the average storage temperature (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radiator_flow_offset: Option<f64>,
}

/// Room temperature targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndoorSpec {
    /// Current room temperature, if known (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_temp: Option<f64>,
    /// Target room temperature (°C)
    pub target_temp: f64,
    /// Passive heating gain from occupants, appliances and sun (°C)
    pub passive_heating_degrees: f64,
}

/// The radiator circuit specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiatorSpec {
    /// Flow temperature gain per degree of indoor/outdoor difference
    pub flow_gain: f64,
    /// Radiator output per degree of flow temperature above room temperature (W/°C)
    pub power_per_degree: f64,
}

/// Background hot water demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotWaterSpec {
    /// Minimum storage temperature for usable hot water (°C)
    pub min_temp: f64,
    /// Average background draw power (W)
    pub average_power_watt: f64,
}

/// Hourly electricity prices for today and (optionally) tomorrow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSpec {
    /// Today's 24 hourly prices (currency/kWh)
    pub today: Vec<f64>,
    /// Tomorrow's 24 hourly prices, if published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tomorrow: Option<Vec<f64>>,
}

/// One point of the outdoor temperature forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Time the forecast applies from
    pub time: NaiveDateTime,
    /// Forecast outdoor temperature (°C)
    pub temp: f64,
}

/// A scheduled hot-water draw-off event, such as a shower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawOff {
    /// Start of the event
    pub start: NaiveDateTime,
    /// End of the event
    pub end: NaiveDateTime,
    /// Storage temperature the event requires (°C)
    pub temp: f64,
    /// Power drawn from the tank while the event is running (W)
    pub power_watt: f64,
}

/// The full parameter set for one optimisation request.
///
/// All derived entities (periods, the optimisation model, the plan) are created fresh from a
/// parameter set per [`crate::optimize`] invocation; nothing persists across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationParameters {
    /// The current time; the plan's first period starts here
    pub time: NaiveDateTime,
    /// Number of equal planning slots per hour
    pub slots_per_hour: u32,
    /// Length of the planning horizon in hours
    pub horizon_hours: u32,
    /// Heat pump power curve
    pub heat_pump: HeatPumpSpec,
    /// Storage tank specification
    pub tank: TankSpec,
    /// Room temperature targets
    pub indoor: IndoorSpec,
    /// Radiator circuit specification
    pub radiator: RadiatorSpec,
    /// Background hot water demand
    pub hot_water: HotWaterSpec,
    /// Electricity prices
    pub prices: PriceSpec,
    /// Outdoor temperature forecast, ordered by time
    pub outdoor: Vec<ForecastPoint>,
    /// Scheduled draw-off events
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub draw_offs: Vec<DrawOff>,
}

impl OptimizationParameters {
    /// The number of planning periods the horizon divides into
    pub fn number_of_periods(&self) -> usize {
        (self.horizon_hours * self.slots_per_hour) as usize
    }

    /// Check that the parameters describe a well-formed problem.
    ///
    /// Must pass before any model construction is attempted; a failure here is fatal for the
    /// whole request.
    pub fn validate(&self) -> Result<()> {
        check_grid_shape(self.slots_per_hour, self.horizon_hours)?;
        check_tiers(&self.heat_pump.tiers).context("Invalid heat pump power curve")?;
        check_prices(&self.prices).context("Invalid price table")?;
        ensure!(
            self.tank.volume_litres > 0.0,
            "Tank volume must be positive"
        );
        ensure!(
            self.tank.loss_degrees_per_hour >= 0.0,
            "Tank loss rate cannot be negative"
        );

        Ok(())
    }
}

/// Check that the horizon divides into at least one period of representable length
fn check_grid_shape(slots_per_hour: u32, horizon_hours: u32) -> Result<()> {
    ensure!(
        slots_per_hour > 0 && horizon_hours > 0,
        "Horizon must contain at least one period (slots_per_hour and horizon_hours must be \
         positive)"
    );
    ensure!(
        3600 % slots_per_hour == 0,
        "slots_per_hour must divide an hour into a whole number of seconds"
    );

    Ok(())
}

/// Check that the tier list is non-empty and ordered by ascending threshold.
///
/// Only the final tier may omit its threshold (it is unbounded).
fn check_tiers(tiers: &[PowerTier]) -> Result<()> {
    ensure!(!tiers.is_empty(), "At least one power tier is required");

    let bounded = &tiers[..tiers.len() - 1];
    ensure!(
        bounded.iter().all(|tier| tier.below_degrees.is_some()),
        "Only the last power tier may omit below_degrees"
    );
    ensure!(
        bounded
            .iter()
            .filter_map(|tier| tier.below_degrees)
            .chain(tiers.last().and_then(|tier| tier.below_degrees))
            .tuple_windows()
            .all(|(a, b)| a < b),
        "Power tier thresholds must be strictly ascending"
    );

    Ok(())
}

/// Check that each provided price table covers a whole day
fn check_prices(prices: &PriceSpec) -> Result<()> {
    ensure!(
        prices.today.len() == PRICES_PER_DAY,
        "Today's price table must have exactly {} entries (got {})",
        PRICES_PER_DAY,
        prices.today.len()
    );
    if let Some(tomorrow) = &prices.tomorrow {
        ensure!(
            tomorrow.len() == PRICES_PER_DAY,
            "Tomorrow's price table must have exactly {} entries (got {})",
            PRICES_PER_DAY,
            tomorrow.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, example_parameters};
    use rstest::rstest;

    #[rstest]
    fn test_validate_example(example_parameters: OptimizationParameters) {
        example_parameters.validate().unwrap();
    }

    #[rstest]
    fn test_validate_zero_periods(mut example_parameters: OptimizationParameters) {
        example_parameters.horizon_hours = 0;
        assert!(example_parameters.validate().is_err());

        example_parameters.horizon_hours = 24;
        example_parameters.slots_per_hour = 0;
        assert!(example_parameters.validate().is_err());
    }

    #[rstest]
    fn test_validate_uneven_slots(mut example_parameters: OptimizationParameters) {
        example_parameters.slots_per_hour = 7;
        assert_error!(
            example_parameters.validate(),
            "slots_per_hour must divide an hour into a whole number of seconds"
        );
    }

    #[rstest]
    fn test_validate_empty_tiers(mut example_parameters: OptimizationParameters) {
        example_parameters.heat_pump.tiers.clear();
        assert_error!(
            example_parameters.validate(),
            "Invalid heat pump power curve"
        );
    }

    #[rstest]
    fn test_validate_unordered_tiers(mut example_parameters: OptimizationParameters) {
        example_parameters.heat_pump.tiers[0].below_degrees = Some(50.0);
        assert!(example_parameters.validate().is_err());
    }

    #[rstest]
    fn test_validate_inner_unbounded_tier(mut example_parameters: OptimizationParameters) {
        example_parameters.heat_pump.tiers[1].below_degrees = None;
        assert!(example_parameters.validate().is_err());
    }

    #[rstest]
    fn test_validate_bad_price_table(mut example_parameters: OptimizationParameters) {
        example_parameters.prices.today.pop();
        assert_error!(example_parameters.validate(), "Invalid price table");

        example_parameters.prices.today.push(1.0);
        example_parameters.prices.tomorrow = Some(vec![1.0; 23]);
        assert_error!(example_parameters.validate(), "Invalid price table");
    }

    #[rstest]
    fn test_number_of_periods(example_parameters: OptimizationParameters) {
        assert_eq!(example_parameters.number_of_periods(), 24 * 3);
    }
}
