//! Code for converting the heat pump's rated power tiers into model quantities.
use crate::parameters::{HeatPumpSpec, PowerTier};

/// Specific heat of water, in Wh per litre per degree Celsius
pub const WATER_SPECIFIC_HEAT: f64 = 1.16;

/// The heat capacity of a storage tank in Wh per degree Celsius
pub fn tank_heat_capacity(volume_litres: f64) -> f64 {
    volume_litres * WATER_SPECIFIC_HEAT
}

/// One heat pump tier expressed in storage temperature terms
#[derive(Debug, Clone, PartialEq)]
pub struct PumpTier {
    /// Storage temperature gain per hour of full activation (°C/h)
    pub heating_rate: f64,
    /// Upper storage temperature threshold; `f64::INFINITY` for the unbounded final tier
    pub max_temp: f64,
    /// Heating power delivered to the tank (W)
    pub heating_power_watt: f64,
    /// Electrical power consumed (W)
    pub consumed_power_watt: f64,
}

impl PumpTier {
    /// Whether the tier applies regardless of storage temperature
    pub fn is_unbounded(&self) -> bool {
        self.max_temp.is_infinite()
    }
}

/// Convert the pump's rated tiers for a tank of the given volume.
///
/// The heating rate is the rated heating power divided by the tank's heat capacity. A missing
/// threshold (only valid on the final tier) becomes the infinity sentinel so that threshold
/// ordering stays total; gating constraints skip the final tier, so the sentinel never enters the
/// model itself.
pub fn pump_tiers(spec: &HeatPumpSpec, volume_litres: f64) -> Vec<PumpTier> {
    let capacity = tank_heat_capacity(volume_litres);
    spec.tiers
        .iter()
        .map(|tier: &PowerTier| PumpTier {
            heating_rate: tier.heating_power_watt / capacity,
            max_temp: tier.below_degrees.unwrap_or(f64::INFINITY),
            heating_power_watt: tier.heating_power_watt,
            consumed_power_watt: tier.consumed_power_watt,
        })
        .collect()
}
