//! Pure lookups that map a period to its price, outdoor temperature and draw-off demand.
//!
//! Each lookup is built once per request from immutable spec data and holds a precomputed table;
//! there is no hidden state or mutation.
use crate::parameters::{DrawOff, ForecastPoint, PriceSpec};
use crate::time_grid::TimeSlot;
use chrono::NaiveDateTime;

/// Cyclic lookup of the hourly electricity price.
///
/// The table is today's prices, then tomorrow's (if published), then today's again. Repeating
/// today's prices lets horizons that run past the end of the known data wrap back to today's
/// values. This is a documented approximation for horizons beyond 48 hours from the day boundary,
/// not a price forecast.
pub struct PriceTable {
    table: Vec<f64>,
    start_of_day: NaiveDateTime,
}

impl PriceTable {
    /// Build the concatenated price table, anchored at the start of the current day
    pub fn new(spec: &PriceSpec, start_of_day: NaiveDateTime) -> Self {
        let table = spec
            .today
            .iter()
            .chain(spec.tomorrow.iter().flatten())
            .chain(spec.today.iter())
            .copied()
            .collect();

        Self {
            table,
            start_of_day,
        }
    }

    /// The price applying at `time`, indexed by whole hours since the start of the current day
    pub fn price_at(&self, time: NaiveDateTime) -> f64 {
        let hours = time
            .signed_duration_since(self.start_of_day)
            .num_hours()
            .rem_euclid(self.table.len() as i64);

        self.table[hours as usize]
    }
}

/// Step-hold lookup of the outdoor temperature forecast.
///
/// Returns the temperature of the latest forecast point at or before the query time. Before the
/// first point it holds the first point's temperature; an empty forecast reads as 0 °C.
pub struct OutdoorSeries {
    points: Vec<ForecastPoint>,
}

impl OutdoorSeries {
    /// Create a lookup over the given forecast points (assumed ordered by time)
    pub fn new(points: Vec<ForecastPoint>) -> Self {
        Self { points }
    }

    /// The outdoor temperature applying at `time`
    pub fn temp_at(&self, time: NaiveDateTime) -> f64 {
        self.points
            .iter()
            .take_while(|point| point.time <= time)
            .last()
            .or_else(|| self.points.first())
            .map_or(0.0, |point| point.temp)
    }
}

/// The draw-off demand applying to one period
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrawOffDemand {
    /// Storage temperature the event requires (°C); 0 if no event applies
    pub temp: f64,
    /// Power drawn from the tank (W); 0 if no event applies
    pub power_watt: f64,
}

/// Lookup of scheduled draw-off events by period.
///
/// Only the first event overlapping a period is used. An event longer than a period is matched
/// independently by each period it overlaps; events are deliberately not treated as a
/// consumed-once resource, and simultaneous events are not summed.
pub struct DrawOffSchedule {
    events: Vec<DrawOff>,
}

impl DrawOffSchedule {
    /// Create a lookup over the given events
    pub fn new(events: Vec<DrawOff>) -> Self {
        Self { events }
    }

    /// The demand from the first event overlapping the half-open interval `[start, end)`
    pub fn demand_for(&self, slot: &TimeSlot) -> DrawOffDemand {
        self.events
            .iter()
            .find(|event| event.start < slot.end && event.end > slot.start)
            .map_or_else(DrawOffDemand::default, |event| DrawOffDemand {
                temp: event.temp,
                power_watt: event.power_watt,
            })
    }
}
