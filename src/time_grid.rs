//! Code for discretizing the planning horizon into fixed-length time slots.
//!
//! The horizon is split into `horizon_hours * slots_per_hour` slots. The first slot is truncated
//! to start at the current time; every later slot is a full `60 / slots_per_hour` minutes and
//! aligned to slot boundaries within the hour.
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

/// One planning slot, as a half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    /// Start of the slot
    pub start: NaiveDateTime,
    /// End of the slot
    pub end: NaiveDateTime,
}

impl TimeSlot {
    /// The length of the slot in fractional hours
    pub fn duration_hours(&self) -> f64 {
        hours_between(self.end, self.start)
    }
}

/// The signed difference between two times in fractional hours
pub fn hours_between(later: NaiveDateTime, earlier: NaiveDateTime) -> f64 {
    later.signed_duration_since(earlier).num_milliseconds() as f64 / 3_600_000.0
}

/// Midnight at the start of the day containing `time`
pub fn start_of_day(time: NaiveDateTime) -> NaiveDateTime {
    time.date().and_time(NaiveTime::MIN)
}

/// Build the sequence of planning slots for the horizon.
///
/// Slot boundaries are monotonically increasing and contiguous. The first slot starts at `time`
/// and ends at the next slot boundary, so it may be shorter than a full slot (but never empty,
/// since `time` always falls strictly before the boundary that follows it).
///
/// # Arguments
///
/// * `time` - The current time
/// * `slots_per_hour` - Number of equal slots per hour; must divide an hour evenly
/// * `horizon_hours` - Length of the horizon in hours
pub fn build_time_grid(time: NaiveDateTime, slots_per_hour: u32, horizon_hours: u32) -> Vec<TimeSlot> {
    let slot_seconds = i64::from(3600 / slots_per_hour);
    let seconds_into_day = time
        .signed_duration_since(start_of_day(time))
        .num_seconds();

    // Round down to the start of the slot containing `time`
    let slot_start = start_of_day(time)
        + TimeDelta::seconds(seconds_into_day / slot_seconds * slot_seconds);

    let number_of_slots = horizon_hours * slots_per_hour;
    (0..i64::from(number_of_slots))
        .map(|i| TimeSlot {
            start: if i == 0 {
                time
            } else {
                slot_start + TimeDelta::seconds(i * slot_seconds)
            },
            end: slot_start + TimeDelta::seconds((i + 1) * slot_seconds),
        })
        .collect()
}
