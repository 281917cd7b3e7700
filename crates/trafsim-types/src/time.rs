//! # trafsim-types::time
//!
//! Defines the representation of time within the simulation.
//! All internal time is continuous and measured in seconds; rates are
//! per-second. Callers supply per-hour rates and km/h speeds, which are
//! converted at the boundary with the helpers below.

/// The fundamental unit of time in the simulation, measured in seconds.
pub type SimTime = f64;

/// The start of simulation time.
pub const SIM_EPOCH: SimTime = 0.0;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Converts a duration in hours to simulation seconds.
pub fn hours_to_seconds(hours: f64) -> SimTime {
    hours * SECONDS_PER_HOUR
}

/// Converts an hourly rate to a per-second rate.
pub fn per_hour_to_per_second(rate_per_hour: f64) -> f64 {
    rate_per_hour / SECONDS_PER_HOUR
}

/// Converts a speed in km/h to metres per second.
pub fn kmh_to_mps(kmh: f64) -> f64 {
    kmh / 3.6
}

/// The zero-based index of the simulated hour containing `t`.
pub fn hour_of(t: SimTime) -> usize {
    (t / SECONDS_PER_HOUR).floor() as usize
}
