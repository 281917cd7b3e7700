//! # trafsim-engine::engines::two_way
//!
//! The two-way-passing corridor: an ordered run of segments traversed
//! left-to-right by direction A and right-to-left by direction B. One-way
//! segments alternate a green direction with a switch-over dead time;
//! two-way segments have unlimited parallel capacity and never block, so a
//! vehicle reaching one starts traversing immediately.

use crate::control::CancelToken;
use crate::events::EventQueue;
use crate::rng::SimRng;
use crate::stats::WaitStats;
use std::collections::VecDeque;
use trafsim_types::errors::SimError;
use trafsim_types::params::{SegmentKind, TwoWayParams};
use trafsim_types::results::{DirectionStats, SegmentRecord, TwoWayStats};
use trafsim_types::time::{SimTime, SIM_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    A,
    B,
}

impl Direction {
    fn idx(self) -> usize {
        match self {
            Direction::A => 0,
            Direction::B => 1,
        }
    }
}

#[derive(Debug, Clone)]
struct Vehicle {
    id: u64,
    dir: Direction,
    /// Reset every time the vehicle joins a segment's entry queue.
    enqueue_time: SimTime,
}

#[derive(Debug)]
enum TwoWayEvent {
    Arrival(Direction),
    Release { seg: usize, dir: Direction },
    Clear { seg: usize, vehicle: Vehicle },
    GreenCheck { seg: usize },
}

/// Per-segment run state. Two-way segments use only `on_segment`; one-way
/// segments also own the green direction and the per-side entry queues.
#[derive(Debug)]
struct SegmentState {
    kind: SegmentKind,
    travel_time: SimTime,
    current_dir: Option<Direction>,
    on_segment: u32,
    queues: [VecDeque<Vehicle>; 2],
    max_queue: [u32; 2],
    samples: [Vec<(SimTime, u32)>; 2],
    switches: u64,
    last_green: Option<Direction>,
}

impl SegmentState {
    fn new(kind: SegmentKind, length_meters: f64, speed: f64) -> Self {
        Self {
            kind,
            travel_time: length_meters / speed,
            current_dir: None,
            on_segment: 0,
            queues: [VecDeque::new(), VecDeque::new()],
            max_queue: [0, 0],
            samples: [Vec::new(), Vec::new()],
            switches: 0,
            last_green: None,
        }
    }

    fn sample_queue(&mut self, t: SimTime, side: usize) {
        let len = self.queues[side].len() as u32;
        self.max_queue[side] = self.max_queue[side].max(len);
        self.samples[side].push((t, len));
    }

    /// The direction whose head vehicle has waited longest; ties go to A.
    fn older_head(&self) -> Option<Direction> {
        match (self.queues[0].front(), self.queues[1].front()) {
            (Some(a), Some(b)) => {
                if b.enqueue_time < a.enqueue_time {
                    Some(Direction::B)
                } else {
                    Some(Direction::A)
                }
            }
            (Some(_), None) => Some(Direction::A),
            (None, Some(_)) => Some(Direction::B),
            (None, None) => None,
        }
    }
}

/// Queue-length sample series for one replication, one entry per one-way
/// segment side change. Two-way segments have no entry queues and stay
/// empty.
#[derive(Debug)]
pub struct TwoWayTrace {
    pub segments: Vec<[Vec<(SimTime, u32)>; 2]>,
}

pub struct TwoWayPassing {
    params: TwoWayParams,
}

struct Run<'a> {
    params: &'a TwoWayParams,
    rng: SimRng,
    queue: EventQueue<TwoWayEvent>,
    segments: Vec<SegmentState>,
    waits: [WaitStats; 2],
    served: [u64; 2],
    completed: [u64; 2],
    next_vehicle_id: u64,
    deadline: SimTime,
}

impl TwoWayPassing {
    pub fn new(params: TwoWayParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TwoWayParams {
        &self.params
    }

    /// Runs one replication with its own random stream.
    pub fn run_seed(&self, seed: u64, cancel: &CancelToken) -> Result<TwoWayStats, SimError> {
        self.run_seed_traced(seed, cancel).map(|(stats, _)| stats)
    }

    /// As [`run_seed`](Self::run_seed), also returning the queue-length
    /// sample series recorded at every one-way queue change.
    pub fn run_seed_traced(
        &self,
        seed: u64,
        cancel: &CancelToken,
    ) -> Result<(TwoWayStats, TwoWayTrace), SimError> {
        let p = &self.params;
        let deadline = p.simulation_seconds;
        let mut run = Run {
            params: p,
            rng: SimRng::from_seed(seed),
            queue: EventQueue::new(),
            segments: p
                .segments
                .iter()
                .map(|s| SegmentState::new(s.kind, s.length_meters, p.speed_meters_per_second))
                .collect(),
            waits: [WaitStats::new(), WaitStats::new()],
            served: [0, 0],
            completed: [0, 0],
            next_vehicle_id: 0,
            deadline,
        };

        tracing::debug!(
            target: "engine",
            seed,
            deadline,
            segments = run.segments.len(),
            "two-way replication start"
        );

        if deadline > 0.0 {
            let first_a = run.rng.exp(p.lambda_a_per_second);
            run.queue.push(first_a, TwoWayEvent::Arrival(Direction::A));
            let first_b = run.rng.exp(p.lambda_b_per_second);
            run.queue.push(first_b, TwoWayEvent::Arrival(Direction::B));
        }

        let mut now: SimTime = SIM_EPOCH;
        while let Some(ev) = run.queue.pop_min() {
            if ev.time > deadline {
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
            match ev.payload {
                TwoWayEvent::Arrival(dir) => run.arrival(dir, now),
                TwoWayEvent::Release { seg, dir } => run.release(seg, dir, now),
                TwoWayEvent::Clear { seg, vehicle } => run.clear(seg, vehicle, now),
                TwoWayEvent::GreenCheck { seg } => run.green_check(seg, now),
            }
        }

        Ok(run.into_results())
    }
}

impl Run<'_> {
    fn entry_segment(&self, dir: Direction) -> usize {
        match dir {
            Direction::A => 0,
            Direction::B => self.segments.len() - 1,
        }
    }

    fn next_segment(&self, seg: usize, dir: Direction) -> Option<usize> {
        match dir {
            Direction::A => (seg + 1 < self.segments.len()).then_some(seg + 1),
            Direction::B => seg.checked_sub(1),
        }
    }

    fn lambda(&self, dir: Direction) -> f64 {
        match dir {
            Direction::A => self.params.lambda_a_per_second,
            Direction::B => self.params.lambda_b_per_second,
        }
    }

    fn arrival(&mut self, dir: Direction, t: SimTime) {
        let id = self.next_vehicle_id;
        self.next_vehicle_id += 1;
        let vehicle = Vehicle {
            id,
            dir,
            enqueue_time: t,
        };
        let entry = self.entry_segment(dir);
        self.admit(entry, vehicle, t);

        let lambda = self.lambda(dir);
        let gap = self.rng.exp(lambda);
        self.queue.push(t + gap, TwoWayEvent::Arrival(dir));

        // Idempotent: only segments that are idle with a non-empty queue
        // react.
        for seg in 0..self.segments.len() {
            self.try_start_green(seg, t);
        }
    }

    /// Puts a vehicle onto a segment: one-way segments queue it at the
    /// entry for its side; two-way segments have no capacity gating beyond
    /// travel time, so it starts traversing at once.
    fn admit(&mut self, seg: usize, vehicle: Vehicle, t: SimTime) {
        let dir = vehicle.dir;
        match self.segments[seg].kind {
            SegmentKind::OneWay => {
                let side = dir.idx();
                let s = &mut self.segments[seg];
                s.queues[side].push_back(vehicle);
                s.sample_queue(t, side);
            }
            SegmentKind::TwoWay => {
                if seg == self.entry_segment(dir) {
                    self.served[dir.idx()] += 1;
                }
                let s = &mut self.segments[seg];
                s.on_segment += 1;
                let clear_at = t + s.travel_time;
                self.queue.push(clear_at, TwoWayEvent::Clear { seg, vehicle });
            }
        }
    }

    fn try_start_green(&mut self, seg: usize, t: SimTime) {
        let s = &mut self.segments[seg];
        if s.kind != SegmentKind::OneWay || s.current_dir.is_some() || s.on_segment > 0 {
            return;
        }
        let Some(dir) = s.older_head() else {
            return;
        };
        s.current_dir = Some(dir);
        if s.last_green.is_some_and(|g| g != dir) {
            s.switches += 1;
        }
        s.last_green = Some(dir);
        self.queue.push(t, TwoWayEvent::Release { seg, dir });
    }

    fn release(&mut self, seg: usize, dir: Direction, t: SimTime) {
        let side = dir.idx();
        let s = &mut self.segments[seg];
        // Stale release from a green that has since moved on.
        if s.current_dir != Some(dir) {
            return;
        }
        let Some(vehicle) = s.queues[side].pop_front() else {
            return;
        };
        s.sample_queue(t, side);
        s.on_segment += 1;
        let clear_at = t + s.travel_time;
        let more_waiting = !s.queues[side].is_empty();

        if t >= self.params.warmup_seconds {
            self.waits[side].record(t - vehicle.enqueue_time);
        }
        if seg == self.entry_segment(dir) {
            self.served[side] += 1;
        }
        self.queue.push(clear_at, TwoWayEvent::Clear { seg, vehicle });

        let follow_on = t + self.params.min_gap_seconds;
        if more_waiting && follow_on <= self.deadline {
            self.queue.push(follow_on, TwoWayEvent::Release { seg, dir });
        }
    }

    fn clear(&mut self, seg: usize, vehicle: Vehicle, t: SimTime) {
        let dir = vehicle.dir;
        let s = &mut self.segments[seg];
        s.on_segment = s.on_segment.saturating_sub(1);
        if s.kind == SegmentKind::OneWay && s.on_segment == 0 {
            let check_at = t + self.params.switch_over_seconds;
            self.queue.push(check_at, TwoWayEvent::GreenCheck { seg });
        }

        match self.next_segment(seg, dir) {
            None => {
                tracing::trace!(target: "events", vehicle = vehicle.id, ?dir, "left the corridor");
                self.completed[dir.idx()] += 1;
            }
            Some(next) => {
                let mut vehicle = vehicle;
                vehicle.enqueue_time = t;
                self.admit(next, vehicle, t);
                self.try_start_green(next, t);
            }
        }
    }

    fn green_check(&mut self, seg: usize, t: SimTime) {
        let s = &mut self.segments[seg];
        if s.on_segment > 0 {
            return;
        }
        match s.older_head() {
            None => s.current_dir = None,
            Some(dir) => {
                if s.current_dir != Some(dir) {
                    if s.last_green.is_some_and(|g| g != dir) {
                        s.switches += 1;
                    }
                    s.last_green = Some(dir);
                    s.current_dir = Some(dir);
                }
                self.queue.push(t, TwoWayEvent::Release { seg, dir });
            }
        }
    }

    fn into_results(self) -> (TwoWayStats, TwoWayTrace) {
        let direction = |side: usize| DirectionStats {
            served: self.served[side],
            completed: self.completed[side],
            avg_wait: self.waits[side].avg_per_arrival(),
            max_queue: self
                .segments
                .iter()
                .map(|s| s.max_queue[side])
                .max()
                .unwrap_or(0),
        };
        let stats = TwoWayStats {
            direction_a: direction(0),
            direction_b: direction(1),
            segments: self
                .segments
                .iter()
                .map(|s| SegmentRecord {
                    max_queue_a: s.max_queue[0],
                    max_queue_b: s.max_queue[1],
                    direction_switches: s.switches,
                })
                .collect(),
        };
        let trace = TwoWayTrace {
            segments: self.segments.into_iter().map(|s| s.samples).collect(),
        };
        (stats, trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trafsim_types::params::Segment;

    fn one_segment(lambda_a: f64, lambda_b: f64) -> TwoWayParams {
        TwoWayParams {
            segments: vec![Segment {
                kind: SegmentKind::OneWay,
                length_meters: 30.0,
            }],
            speed_meters_per_second: 5.56,
            simulation_seconds: 36_000.0,
            min_gap_seconds: 0.0,
            switch_over_seconds: 0.0,
            lambda_a_per_second: lambda_a,
            lambda_b_per_second: lambda_b,
            warmup_seconds: 0.0,
        }
    }

    #[test]
    fn balanced_demand_serves_both_directions_evenly() {
        // 15 veh/h each way over 10 h.
        let lambda = 15.0 / 3600.0;
        let sim = TwoWayPassing::new(one_segment(lambda, lambda));
        let stats = sim.run_seed(0, &CancelToken::new()).unwrap();
        let a = stats.direction_a.served;
        let b = stats.direction_b.served;
        assert!((100..=200).contains(&a), "served A {a}");
        assert!((100..=200).contains(&b), "served B {b}");
        assert!(a.abs_diff(b) < 60, "served A {a} vs B {b}");
        assert!(stats.direction_a.max_queue < 5);
        assert!(stats.direction_b.max_queue < 5);
        // A handful of vehicles may still be in flight at the deadline.
        assert!(stats.direction_a.completed <= stats.direction_a.served);
        assert!(stats.direction_a.served - stats.direction_a.completed < 10);
        assert!(stats.direction_b.completed <= stats.direction_b.served);
        assert!(stats.direction_b.served - stats.direction_b.completed < 10);
    }

    #[test]
    fn asymmetric_demand_favours_the_light_direction() {
        let stats = TwoWayPassing::new(one_segment(60.0 / 3600.0, 5.0 / 3600.0))
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert!(stats.direction_a.served > stats.direction_b.served);
        assert!(stats.direction_a.max_queue >= stats.direction_b.max_queue);
    }

    #[test]
    fn heavy_direction_waits_behind_its_own_queue() {
        // Near-saturated direction A: release trains back up behind the
        // minimum gap, while rare B vehicles jump in at train boundaries via
        // the older-head rule.
        let mut params = one_segment(600.0 / 3600.0, 5.0 / 3600.0);
        params.min_gap_seconds = 2.0;
        let stats = TwoWayPassing::new(params)
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert!(
            stats.direction_a.avg_wait > stats.direction_b.avg_wait,
            "wait A {} vs B {}",
            stats.direction_a.avg_wait,
            stats.direction_b.avg_wait
        );
        assert!(stats.direction_a.max_queue > stats.direction_b.max_queue);
    }

    #[test]
    fn silent_direction_never_crosses() {
        let stats = TwoWayPassing::new(one_segment(0.0, 10.0 / 3600.0))
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert_eq!(stats.direction_a.served, 0);
        assert_eq!(stats.direction_a.completed, 0);
        assert_eq!(stats.direction_a.max_queue, 0);
        assert!(stats.direction_b.served > 0);
        // The single segment only ever held direction B, so its green never
        // switched.
        assert_eq!(stats.segments[0].direction_switches, 0);
    }

    #[test]
    fn vehicles_traverse_a_mixed_corridor() {
        let mut params = one_segment(30.0 / 3600.0, 30.0 / 3600.0);
        params.segments = vec![
            Segment {
                kind: SegmentKind::OneWay,
                length_meters: 40.0,
            },
            Segment {
                kind: SegmentKind::TwoWay,
                length_meters: 100.0,
            },
            Segment {
                kind: SegmentKind::OneWay,
                length_meters: 25.0,
            },
        ];
        let stats = TwoWayPassing::new(params)
            .run_seed(12345, &CancelToken::new())
            .unwrap();
        assert!(stats.direction_a.completed > 0);
        assert!(stats.direction_b.completed > 0);
        assert!(stats.direction_a.served >= stats.direction_a.completed);
        assert!(stats.direction_b.served >= stats.direction_b.completed);
        assert_eq!(stats.segments.len(), 3);
        // Two-way segments never queue anyone.
        assert_eq!(stats.segments[1].max_queue_a, 0);
        assert_eq!(stats.segments[1].max_queue_b, 0);
    }

    #[test]
    fn switch_over_delays_direction_changes() {
        let mut params = one_segment(20.0 / 3600.0, 20.0 / 3600.0);
        params.switch_over_seconds = 30.0;
        let stats = TwoWayPassing::new(params)
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert!(stats.segments[0].direction_switches > 0);
        // Both directions still get through.
        assert!(stats.direction_a.completed > 0);
        assert!(stats.direction_b.completed > 0);
    }

    #[test]
    fn same_seed_is_reproducible() {
        let sim = TwoWayPassing::new(one_segment(40.0 / 3600.0, 25.0 / 3600.0));
        let a = sim.run_seed(777, &CancelToken::new()).unwrap();
        let b = sim.run_seed(777, &CancelToken::new()).unwrap();
        assert_eq!(a.direction_a.served, b.direction_a.served);
        assert_eq!(a.direction_b.avg_wait, b.direction_b.avg_wait);
        assert_eq!(
            a.segments[0].direction_switches,
            b.segments[0].direction_switches
        );
    }

    #[test]
    fn zero_duration_produces_no_activity() {
        let mut params = one_segment(1.0, 1.0);
        params.simulation_seconds = 0.0;
        params.warmup_seconds = 0.0;
        let stats = TwoWayPassing::new(params)
            .run_seed(0, &CancelToken::new())
            .unwrap();
        assert_eq!(stats.direction_a.served + stats.direction_b.served, 0);
    }

    #[test]
    fn trace_records_queue_changes() {
        let sim = TwoWayPassing::new(one_segment(30.0 / 3600.0, 0.0));
        let (stats, trace) = sim.run_seed_traced(0, &CancelToken::new()).unwrap();
        assert!(stats.direction_a.served > 0);
        // Every enqueue and release left a sample on side A.
        assert!(trace.segments[0][0].len() >= (stats.direction_a.served * 2) as usize);
        assert!(trace.segments[0][1].is_empty());
    }
}
