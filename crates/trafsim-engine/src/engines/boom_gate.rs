//! # trafsim-engine::engines::boom_gate
//!
//! The single-server boom-gate model: M/G/1 with headway-shaped Poisson
//! arrivals and a two-stage additive service, each stage deterministic or
//! exponential.
//!
//! Arrivals are generated on the fly from a cursor; no per-customer record
//! is kept. The only queue state is the min-heap of scheduled departure
//! times, drained as the cursor passes them.

use crate::arrivals::ArrivalProcess;
use crate::control::CancelToken;
use crate::events::DepartureHeap;
use crate::rng::SimRng;
use crate::stats::{StateClock, WaitStats};
use std::collections::BTreeMap;
use trafsim_types::errors::SimError;
use trafsim_types::params::BoomGateParams;
use trafsim_types::results::BoomGateStats;
use trafsim_types::time::{hours_to_seconds, per_hour_to_per_second, SimTime, SIM_EPOCH};

pub struct BoomGate {
    params: BoomGateParams,
}

impl BoomGate {
    pub fn new(params: BoomGateParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BoomGateParams {
        &self.params
    }

    fn service_stage(mean: f64, exponential: bool, rng: &mut SimRng) -> f64 {
        if mean <= 0.0 {
            0.0
        } else if exponential {
            rng.exp(1.0 / mean)
        } else {
            mean
        }
    }

    /// A zero-activity result: the system sat empty for the whole run.
    fn idle_result() -> BoomGateStats {
        BoomGateStats {
            total_customers: 0,
            avg_arrivals_per_hour: 0.0,
            server_utilization: 0.0,
            avg_wait_time_per_arrival: 0.0,
            avg_wait_time_per_waiter: 0.0,
            probability_of_waiting: 0.0,
            avg_service_time: 0.0,
            constrained_arrivals: 0.0,
            system_state_percentages: BTreeMap::from([(0, 100.0)]),
            hourly_max_distribution: BTreeMap::from([(0, 100.0)]),
        }
    }

    /// Runs one replication with its own random stream.
    pub fn run_seed(&self, seed: u64, cancel: &CancelToken) -> Result<BoomGateStats, SimError> {
        let p = &self.params;
        let duration = hours_to_seconds(p.simulation_hours);
        if p.arrival_rate_per_hour <= 0.0 || duration <= 0.0 {
            return Ok(Self::idle_result());
        }

        tracing::debug!(target: "engine", seed, duration, "boom gate replication start");

        let mut rng = SimRng::from_seed(seed);
        let mut arrivals = ArrivalProcess::new(
            per_hour_to_per_second(p.arrival_rate_per_hour),
            p.min_headway_seconds,
        );
        let mut departures = DepartureHeap::new();
        let mut clock = StateClock::new(duration);
        let mut waits = WaitStats::new();

        let mut in_system: u32 = 0;
        let mut server_free: SimTime = SIM_EPOCH;
        let mut busy = 0.0;
        let mut service_total = 0.0;
        let mut customers: u64 = 0;
        let mut t: SimTime = SIM_EPOCH;

        loop {
            if cancel.is_cancelled() {
                return Err(SimError::Cancelled {
                    seeds_completed: 0,
                    num_seeds: 1,
                });
            }
            t += arrivals.next_gap(&mut rng);
            if t >= duration {
                break;
            }

            // Everyone scheduled to leave before this arrival has left.
            while let Some(d) = departures.peek() {
                if d > t {
                    break;
                }
                departures.pop();
                in_system -= 1;
                clock.set_state(d, in_system);
            }

            let service = Self::service_stage(
                p.service_part1_mean_seconds,
                p.part1_is_exponential,
                &mut rng,
            ) + Self::service_stage(
                p.service_part2_mean_seconds,
                p.part2_is_exponential,
                &mut rng,
            );
            let start = t.max(server_free);
            waits.record(start - t);

            in_system += 1;
            if u64::from(in_system) > p.max_in_system {
                tracing::warn!(
                    target: "engine",
                    seed,
                    in_system,
                    cap = p.max_in_system,
                    "boom gate saturated"
                );
                return Err(SimError::Saturated {
                    cap: p.max_in_system,
                    in_system: u64::from(in_system),
                });
            }
            clock.set_state(t, in_system);

            let departure = start + service;
            departures.push(departure);
            server_free = departure;
            // Server-busy time is truncated at the deadline so utilisation
            // stays in [0, 1] even when service extends past it.
            busy += departure.min(duration) - start.min(duration);
            service_total += service;
            customers += 1;
        }

        // Cleanup pass: the tail of scheduled departures, clamped to the
        // deadline so time-in-state covers the whole run.
        while let Some(d) = departures.pop() {
            in_system -= 1;
            clock.set_state(d.min(duration), in_system);
        }
        clock.finish(duration);

        Ok(BoomGateStats {
            total_customers: customers,
            avg_arrivals_per_hour: customers as f64 / p.simulation_hours,
            server_utilization: busy / duration,
            avg_wait_time_per_arrival: waits.avg_per_arrival(),
            avg_wait_time_per_waiter: waits.avg_per_waiter(),
            probability_of_waiting: waits.probability_of_waiting(),
            avg_service_time: if customers == 0 {
                0.0
            } else {
                service_total / customers as f64
            },
            constrained_arrivals: arrivals.constrained_fraction(),
            system_state_percentages: clock.percentages(duration),
            hourly_max_distribution: clock.hourly_histogram(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> BoomGateParams {
        BoomGateParams {
            simulation_hours: 10.0,
            arrival_rate_per_hour: 60.0,
            min_headway_seconds: 2.0,
            service_part1_mean_seconds: 3.0,
            service_part2_mean_seconds: 0.0,
            part1_is_exponential: true,
            part2_is_exponential: false,
            max_in_system: 10_000_000,
        }
    }

    #[test]
    fn baseline_light_traffic() {
        let stats = BoomGate::new(baseline())
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert!(
            (540..=660).contains(&stats.total_customers),
            "total {}",
            stats.total_customers
        );
        assert!(
            (stats.server_utilization - 0.05).abs() < 0.02,
            "utilization {}",
            stats.server_utilization
        );
        assert!(stats.probability_of_waiting < 0.05);
        assert!(stats.system_state_percentages[&0] > 90.0);
    }

    #[test]
    fn saturated_traffic_pushes_utilisation_to_one() {
        let params = BoomGateParams {
            arrival_rate_per_hour: 1200.0,
            service_part1_mean_seconds: 3.0,
            part1_is_exponential: false,
            ..baseline()
        };
        let stats = BoomGate::new(params)
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert!(stats.server_utilization > 0.95);
        assert!(stats.probability_of_waiting > 0.8);
        assert!(stats.server_utilization <= 1.0);
    }

    #[test]
    fn state_time_percentages_cover_the_run() {
        let stats = BoomGate::new(baseline())
            .run_seed(3 * 12345, &CancelToken::new())
            .unwrap();
        let total: f64 = stats.system_state_percentages.values().sum();
        assert!((total - 100.0).abs() < 1e-7, "total {total}");
    }

    #[test]
    fn deterministic_service_utilisation_matches_offered_load() {
        // rho = lambda * E[S]; long run, no headway shaping.
        let params = BoomGateParams {
            simulation_hours: 200.0,
            arrival_rate_per_hour: 360.0,
            min_headway_seconds: 0.0,
            service_part1_mean_seconds: 3.0,
            part1_is_exponential: false,
            ..baseline()
        };
        let stats = BoomGate::new(params)
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert!(
            (stats.server_utilization - 0.3).abs() < 0.01,
            "utilization {}",
            stats.server_utilization
        );
    }

    #[test]
    fn same_seed_is_reproducible() {
        let gate = BoomGate::new(baseline());
        let a = gate.run_seed(12345, &CancelToken::new()).unwrap();
        let b = gate.run_seed(12345, &CancelToken::new()).unwrap();
        assert_eq!(a.total_customers, b.total_customers);
        assert_eq!(a.avg_wait_time_per_arrival, b.avg_wait_time_per_arrival);
        assert_eq!(a.system_state_percentages, b.system_state_percentages);
        assert_eq!(a.hourly_max_distribution, b.hourly_max_distribution);
    }

    #[test]
    fn zero_arrival_rate_short_circuits() {
        let params = BoomGateParams {
            arrival_rate_per_hour: 0.0,
            ..baseline()
        };
        let stats = BoomGate::new(params)
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert_eq!(stats.total_customers, 0);
        assert_eq!(
            stats.system_state_percentages,
            BTreeMap::from([(0, 100.0)])
        );
    }

    #[test]
    fn zero_duration_short_circuits() {
        let params = BoomGateParams {
            simulation_hours: 0.0,
            ..baseline()
        };
        let stats = BoomGate::new(params)
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert_eq!(stats.total_customers, 0);
        assert_eq!(
            stats.system_state_percentages,
            BTreeMap::from([(0, 100.0)])
        );
    }

    #[test]
    fn tiny_cap_reports_saturation() {
        let params = BoomGateParams {
            arrival_rate_per_hour: 1200.0,
            service_part1_mean_seconds: 30.0,
            part1_is_exponential: false,
            max_in_system: 3,
            ..baseline()
        };
        let err = BoomGate::new(params)
            .run_seed(0, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, SimError::Saturated { cap: 3, .. }));
    }

    #[test]
    fn cancellation_is_observed() {
        let token = CancelToken::new();
        token.cancel();
        let err = BoomGate::new(baseline()).run_seed(0, &token).unwrap_err();
        assert!(matches!(err, SimError::Cancelled { .. }));
    }
}
