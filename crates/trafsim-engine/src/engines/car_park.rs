//! # trafsim-engine::engines::car_park
//!
//! The car-park entry/exit model: two headway-shaped arrival streams, two
//! FIFO queues of arrival instants, and a single server whose queue choice
//! is configurable (first-come-first-served, entry priority, exit priority).

use crate::arrivals::ArrivalProcess;
use crate::control::CancelToken;
use crate::events::EventQueue;
use crate::rng::SimRng;
use crate::stats::{StateClock, WaitStats};
use std::collections::BTreeMap;
use std::collections::VecDeque;
use trafsim_types::errors::SimError;
use trafsim_types::params::{CarParkParams, Priority};
use trafsim_types::results::{CarParkQueueStats, CarParkStats};
use trafsim_types::time::{hours_to_seconds, per_hour_to_per_second, SimTime, SIM_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Entry,
    Exit,
}

impl Kind {
    fn idx(self) -> usize {
        match self {
            Kind::Entry => 0,
            Kind::Exit => 1,
        }
    }
}

#[derive(Debug)]
enum CarParkEvent {
    Arrival(Kind),
    Departure,
}

pub struct CarPark {
    params: CarParkParams,
}

impl CarPark {
    pub fn new(params: CarParkParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CarParkParams {
        &self.params
    }

    fn idle_queue_stats() -> CarParkQueueStats {
        CarParkQueueStats {
            served: 0,
            delay_fraction: 0.0,
            avg_wait_time_per_arrival: 0.0,
            avg_wait_time_per_queued: 0.0,
            constrained_arrivals: 0.0,
            queue_length_percentages: BTreeMap::from([(0, 100.0)]),
            hourly_max_distribution: BTreeMap::from([(0, 100.0)]),
        }
    }

    fn idle_result() -> CarParkStats {
        CarParkStats {
            utilisation: 0.0,
            entry: Self::idle_queue_stats(),
            exit: Self::idle_queue_stats(),
        }
    }

    fn service_time(&self, kind: Kind) -> f64 {
        match kind {
            Kind::Entry => self.params.entry_service_time,
            Kind::Exit => self.params.exit_service_time,
        }
    }

    /// Picks the queue the server takes its next customer from, or `None`
    /// when both queues are empty.
    fn choose_queue(&self, queues: &[VecDeque<SimTime>; 2]) -> Option<Kind> {
        let entry_head = queues[0].front().copied();
        let exit_head = queues[1].front().copied();
        match self.params.priority {
            Priority::Fcfs => match (entry_head, exit_head) {
                (Some(a), Some(b)) => Some(if b < a { Kind::Exit } else { Kind::Entry }),
                (Some(_), None) => Some(Kind::Entry),
                (None, Some(_)) => Some(Kind::Exit),
                (None, None) => None,
            },
            Priority::Entry => {
                if entry_head.is_some() {
                    Some(Kind::Entry)
                } else if exit_head.is_some() {
                    Some(Kind::Exit)
                } else {
                    None
                }
            }
            Priority::Exit => {
                if exit_head.is_some() {
                    Some(Kind::Exit)
                } else if entry_head.is_some() {
                    Some(Kind::Entry)
                } else {
                    None
                }
            }
        }
    }

    /// Runs one replication with its own random stream.
    pub fn run_seed(&self, seed: u64, cancel: &CancelToken) -> Result<CarParkStats, SimError> {
        let p = &self.params;
        let duration = hours_to_seconds(p.simulation_hours);
        if duration <= 0.0 || (p.entry_rate_per_hour <= 0.0 && p.exit_rate_per_hour <= 0.0) {
            return Ok(Self::idle_result());
        }

        tracing::debug!(target: "engine", seed, duration, "car park replication start");

        let mut rng = SimRng::from_seed(seed);
        let mut processes = [
            ArrivalProcess::new(
                per_hour_to_per_second(p.entry_rate_per_hour),
                p.entry_headway_seconds,
            ),
            ArrivalProcess::new(
                per_hour_to_per_second(p.exit_rate_per_hour),
                p.exit_headway_seconds,
            ),
        ];
        let mut queues: [VecDeque<SimTime>; 2] = [VecDeque::new(), VecDeque::new()];
        let mut clocks = [StateClock::new(duration), StateClock::new(duration)];
        let mut waits = [WaitStats::new(), WaitStats::new()];
        let mut busy = 0.0;
        let mut server_busy_until: SimTime = SIM_EPOCH;
        let mut events = EventQueue::new();

        let first_entry = processes[0].next_gap(&mut rng);
        events.push(first_entry, CarParkEvent::Arrival(Kind::Entry));
        let first_exit = processes[1].next_gap(&mut rng);
        events.push(first_exit, CarParkEvent::Arrival(Kind::Exit));

        let mut now: SimTime = SIM_EPOCH;
        while let Some(ev) = events.pop_min() {
            if ev.time > duration {
                break;
            }
            if cancel.is_cancelled() {
                return Err(SimError::Cancelled {
                    seeds_completed: 0,
                    num_seeds: 1,
                });
            }
            debug_assert!(ev.time >= now, "time went backwards");
            now = ev.time;

            if let CarParkEvent::Arrival(kind) = ev.payload {
                let side = kind.idx();
                queues[side].push_back(now);
                clocks[side].set_state(now, queues[side].len() as u32);
                let gap = processes[side].next_gap(&mut rng);
                events.push(now + gap, CarParkEvent::Arrival(kind));
            }

            // Server dispatch: free server plus a waiting customer, queue
            // chosen by the configured discipline.
            if now >= server_busy_until {
                if let Some(kind) = self.choose_queue(&queues) {
                    let side = kind.idx();
                    let arrived = queues[side]
                        .pop_front()
                        .expect("chosen queue is non-empty");
                    clocks[side].set_state(now, queues[side].len() as u32);
                    waits[side].record(now - arrived);
                    let service = self.service_time(kind);
                    busy += (now + service).min(duration) - now.min(duration);
                    server_busy_until = now + service;
                    events.push(server_busy_until, CarParkEvent::Departure);
                }
            }
        }

        for clock in &mut clocks {
            clock.finish(duration);
        }

        let queue_stats = |side: usize| CarParkQueueStats {
            served: waits[side].served(),
            delay_fraction: waits[side].probability_of_waiting(),
            avg_wait_time_per_arrival: waits[side].avg_per_arrival(),
            avg_wait_time_per_queued: waits[side].avg_per_waiter(),
            constrained_arrivals: processes[side].constrained_fraction(),
            queue_length_percentages: clocks[side].percentages(duration),
            hourly_max_distribution: clocks[side].hourly_histogram(),
        };

        Ok(CarParkStats {
            utilisation: busy / duration,
            entry: queue_stats(0),
            exit: queue_stats(1),
        })
    }
}
