//! # trafsim-engine::stats
//!
//! Running accumulators shared by the engines: waiting-time sums, the
//! time-in-state clock, and per-hour maxima. Keys are held in `BTreeMap`s so
//! derived distributions iterate in sorted order.

use std::collections::BTreeMap;
use trafsim_types::time::{hour_of, SimTime, SECONDS_PER_HOUR};

/// Waits at or below this threshold count as "did not wait".
pub const WAIT_EPSILON: f64 = 1e-3;

/// Running sums of waiting time over all served customers and over the
/// subset that actually waited.
#[derive(Debug, Default)]
pub struct WaitStats {
    total_wait: f64,
    served: u64,
    delayed_wait: f64,
    delayed: u64,
}

impl WaitStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, wait: SimTime) {
        debug_assert!(wait >= 0.0, "negative wait");
        self.total_wait += wait;
        self.served += 1;
        if wait > WAIT_EPSILON {
            self.delayed_wait += wait;
            self.delayed += 1;
        }
    }

    pub fn served(&self) -> u64 {
        self.served
    }

    pub fn avg_per_arrival(&self) -> f64 {
        if self.served == 0 {
            0.0
        } else {
            self.total_wait / self.served as f64
        }
    }

    pub fn avg_per_waiter(&self) -> f64 {
        if self.delayed == 0 {
            0.0
        } else {
            self.delayed_wait / self.delayed as f64
        }
    }

    pub fn probability_of_waiting(&self) -> f64 {
        if self.served == 0 {
            0.0
        } else {
            self.delayed as f64 / self.served as f64
        }
    }
}

/// Tracks an integer system state over time: total seconds spent in each
/// state, and the maximum state observed within each simulated hour.
///
/// Every transition charges the elapsed interval to the outgoing state and
/// stamps the hour the interval started in. `finish` flushes the tail so the
/// accumulated total equals the simulated duration.
#[derive(Debug)]
pub struct StateClock {
    acc: BTreeMap<u32, f64>,
    hourly_max: Vec<u32>,
    last_transition: SimTime,
    state: u32,
}

impl StateClock {
    pub fn new(duration: SimTime) -> Self {
        let hours = (duration / SECONDS_PER_HOUR).ceil() as usize;
        Self {
            acc: BTreeMap::new(),
            hourly_max: vec![0; hours],
            last_transition: 0.0,
            state: 0,
        }
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    /// Records a transition to `new_state` at time `t`.
    pub fn set_state(&mut self, t: SimTime, new_state: u32) {
        self.flush_interval(t);
        self.state = new_state;
    }

    /// Closes out the final `[last_transition, deadline]` interval.
    pub fn finish(&mut self, deadline: SimTime) {
        self.flush_interval(deadline);
    }

    fn flush_interval(&mut self, until: SimTime) {
        debug_assert!(until >= self.last_transition, "time went backwards");
        *self.acc.entry(self.state).or_insert(0.0) += until - self.last_transition;
        let hour = hour_of(self.last_transition);
        if let Some(max) = self.hourly_max.get_mut(hour) {
            *max = (*max).max(self.state);
        }
        self.last_transition = until;
    }

    /// Total accumulated time across all states.
    pub fn total_time(&self) -> f64 {
        self.acc.values().sum()
    }

    /// Time-in-state as percentages of `duration`, keyed by state.
    pub fn percentages(&self, duration: SimTime) -> BTreeMap<u32, f64> {
        if duration <= 0.0 {
            return BTreeMap::from([(0, 100.0)]);
        }
        self.acc
            .iter()
            .map(|(&s, &t)| (s, t / duration * 100.0))
            .collect()
    }

    /// Histogram of the per-hour maxima, as percentages of simulated hours.
    pub fn hourly_histogram(&self) -> BTreeMap<u32, f64> {
        let hours = self.hourly_max.len();
        if hours == 0 {
            return BTreeMap::from([(0, 100.0)]);
        }
        let mut histogram: BTreeMap<u32, u64> = BTreeMap::new();
        for &max in &self.hourly_max {
            *histogram.entry(max).or_insert(0) += 1;
        }
        histogram
            .into_iter()
            .map(|(s, count)| (s, count as f64 / hours as f64 * 100.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_split_into_delayed_and_not() {
        let mut w = WaitStats::new();
        w.record(0.0);
        w.record(4.0);
        w.record(6.0);
        assert_eq!(w.served(), 3);
        assert!((w.avg_per_arrival() - 10.0 / 3.0).abs() < 1e-12);
        assert_eq!(w.avg_per_waiter(), 5.0);
        assert!((w.probability_of_waiting() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn sub_epsilon_waits_do_not_count_as_delay() {
        let mut w = WaitStats::new();
        w.record(1e-4);
        assert_eq!(w.probability_of_waiting(), 0.0);
    }

    #[test]
    fn state_time_sums_to_duration() {
        let duration = 2.5 * SECONDS_PER_HOUR;
        let mut clock = StateClock::new(duration);
        clock.set_state(10.0, 1);
        clock.set_state(500.0, 2);
        clock.set_state(4000.0, 0);
        clock.finish(duration);
        let total = clock.total_time();
        assert!((total - duration).abs() <= 1e-9 * duration);
    }

    #[test]
    fn percentages_reflect_occupancy() {
        let mut clock = StateClock::new(100.0);
        clock.set_state(25.0, 3);
        clock.finish(100.0);
        let p = clock.percentages(100.0);
        assert_eq!(p[&0], 25.0);
        assert_eq!(p[&3], 75.0);
    }

    #[test]
    fn zero_duration_percentages_are_all_idle() {
        let clock = StateClock::new(0.0);
        assert_eq!(clock.percentages(0.0), BTreeMap::from([(0, 100.0)]));
        assert_eq!(clock.hourly_histogram(), BTreeMap::from([(0, 100.0)]));
    }

    #[test]
    fn hourly_maxima_stamp_the_interval_start_hour() {
        let duration = 2.0 * SECONDS_PER_HOUR;
        let mut clock = StateClock::new(duration);
        // Peak of 4 inside hour 0, then back to idle well into hour 1.
        clock.set_state(100.0, 4);
        clock.set_state(200.0, 0);
        clock.set_state(5000.0, 1);
        clock.finish(duration);
        let h = clock.hourly_histogram();
        // hour 0 peaked at 4, hour 1 peaked at 1.
        assert_eq!(h[&4], 50.0);
        assert_eq!(h[&1], 50.0);
    }
}
