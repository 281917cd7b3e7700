//! # trafsim-types::results
//!
//! Per-seed result records for the three engines and their aggregated
//! counterparts. Distributions are keyed by integer system state in a
//! `BTreeMap` so every serialisation walks the keys in sorted order and
//! fixed-seed reruns emit byte-identical output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A (mean, min, max) reduction of one metric across N replications.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl Triple {
    /// Reduces a non-empty slice of per-seed values.
    pub fn of(values: &[f64]) -> Self {
        debug_assert!(!values.is_empty());
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        Self {
            avg: sum / values.len() as f64,
            min,
            max,
        }
    }

    fn map<T, F: Fn(&T) -> f64>(runs: &[T], f: F) -> Self {
        let values: Vec<f64> = runs.iter().map(f).collect();
        Self::of(&values)
    }
}

/// Reduces per-seed distributions key-by-key. A key absent from a seed's
/// distribution counts as 0 for that seed, so `min` reflects seeds that
/// never visited the state.
pub fn aggregate_distribution<'a, I>(dists: I, num_seeds: usize) -> BTreeMap<u32, Triple>
where
    I: Iterator<Item = &'a BTreeMap<u32, f64>> + Clone,
{
    let mut keys: Vec<u32> = dists.clone().flat_map(|d| d.keys().copied()).collect();
    keys.sort_unstable();
    keys.dedup();

    let mut out = BTreeMap::new();
    for key in keys {
        let mut values = Vec::with_capacity(num_seeds);
        for dist in dists.clone() {
            values.push(dist.get(&key).copied().unwrap_or(0.0));
        }
        out.insert(key, Triple::of(&values));
    }
    out
}

// --- Boom gate ---

/// One replication's derived statistics for the boom-gate model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoomGateStats {
    pub total_customers: u64,
    pub avg_arrivals_per_hour: f64,
    pub server_utilization: f64,
    pub avg_wait_time_per_arrival: f64,
    pub avg_wait_time_per_waiter: f64,
    pub probability_of_waiting: f64,
    pub avg_service_time: f64,
    /// Fraction of inter-arrival draws clamped up to the minimum headway.
    pub constrained_arrivals: f64,
    /// Time-weighted distribution of customers in system, as percentages.
    pub system_state_percentages: BTreeMap<u32, f64>,
    /// Histogram of per-hour maxima, as percentages of simulated hours.
    pub hourly_max_distribution: BTreeMap<u32, f64>,
}

/// Boom-gate statistics reduced over N seeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoomGateAggregate {
    pub total_customers: Triple,
    pub avg_arrivals_per_hour: Triple,
    pub server_utilization: Triple,
    pub avg_wait_time_per_arrival: Triple,
    pub avg_wait_time_per_waiter: Triple,
    pub probability_of_waiting: Triple,
    pub avg_service_time: Triple,
    pub constrained_arrivals: Triple,
    pub system_state_percentages: BTreeMap<u32, Triple>,
    pub hourly_max_distribution: BTreeMap<u32, Triple>,
    pub num_seeds: usize,
    /// Documents the PRNG and seed-index map; part of the reproducibility
    /// contract.
    pub rng_algorithm: String,
}

impl BoomGateAggregate {
    pub fn from_runs(runs: &[BoomGateStats], rng_algorithm: &str) -> Self {
        let n = runs.len();
        Self {
            total_customers: Triple::map(runs, |r| r.total_customers as f64),
            avg_arrivals_per_hour: Triple::map(runs, |r| r.avg_arrivals_per_hour),
            server_utilization: Triple::map(runs, |r| r.server_utilization),
            avg_wait_time_per_arrival: Triple::map(runs, |r| r.avg_wait_time_per_arrival),
            avg_wait_time_per_waiter: Triple::map(runs, |r| r.avg_wait_time_per_waiter),
            probability_of_waiting: Triple::map(runs, |r| r.probability_of_waiting),
            avg_service_time: Triple::map(runs, |r| r.avg_service_time),
            constrained_arrivals: Triple::map(runs, |r| r.constrained_arrivals),
            system_state_percentages: aggregate_distribution(
                runs.iter().map(|r| &r.system_state_percentages),
                n,
            ),
            hourly_max_distribution: aggregate_distribution(
                runs.iter().map(|r| &r.hourly_max_distribution),
                n,
            ),
            num_seeds: n,
            rng_algorithm: rng_algorithm.to_string(),
        }
    }
}

// --- Two-way passing ---

/// Per-direction statistics for the two-way corridor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionStats {
    /// Vehicles that began traversing the corridor from this direction's
    /// entry segment.
    pub served: u64,
    /// Vehicles that traversed the whole corridor.
    pub completed: u64,
    pub avg_wait: f64,
    pub max_queue: u32,
}

/// Per-segment queue extremes and direction activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    pub max_queue_a: u32,
    pub max_queue_b: u32,
    /// Times a one-way segment's green changed direction. Always 0 for
    /// two-way segments.
    pub direction_switches: u64,
}

/// One replication's statistics for the two-way-passing model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoWayStats {
    pub direction_a: DirectionStats,
    pub direction_b: DirectionStats,
    pub segments: Vec<SegmentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionAggregate {
    pub served: Triple,
    pub completed: Triple,
    pub avg_wait: Triple,
    pub max_queue: Triple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentAggregate {
    pub max_queue_a: Triple,
    pub max_queue_b: Triple,
    pub direction_switches: Triple,
}

/// Two-way statistics reduced over N seeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoWayAggregate {
    pub direction_a: DirectionAggregate,
    pub direction_b: DirectionAggregate,
    pub segments: Vec<SegmentAggregate>,
    pub num_seeds: usize,
    pub rng_algorithm: String,
}

fn aggregate_direction<F>(runs: &[TwoWayStats], pick: F) -> DirectionAggregate
where
    F: Fn(&TwoWayStats) -> &DirectionStats,
{
    DirectionAggregate {
        served: Triple::map(runs, |r| pick(r).served as f64),
        completed: Triple::map(runs, |r| pick(r).completed as f64),
        avg_wait: Triple::map(runs, |r| pick(r).avg_wait),
        max_queue: Triple::map(runs, |r| pick(r).max_queue as f64),
    }
}

impl TwoWayAggregate {
    pub fn from_runs(runs: &[TwoWayStats], rng_algorithm: &str) -> Self {
        let num_segments = runs.first().map_or(0, |r| r.segments.len());
        let segments = (0..num_segments)
            .map(|i| SegmentAggregate {
                max_queue_a: Triple::map(runs, |r| r.segments[i].max_queue_a as f64),
                max_queue_b: Triple::map(runs, |r| r.segments[i].max_queue_b as f64),
                direction_switches: Triple::map(runs, |r| r.segments[i].direction_switches as f64),
            })
            .collect();
        Self {
            direction_a: aggregate_direction(runs, |r| &r.direction_a),
            direction_b: aggregate_direction(runs, |r| &r.direction_b),
            segments,
            num_seeds: runs.len(),
            rng_algorithm: rng_algorithm.to_string(),
        }
    }
}

// --- Car park ---

/// Per-queue (entry or exit) statistics for the car-park model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarParkQueueStats {
    pub served: u64,
    pub delay_fraction: f64,
    pub avg_wait_time_per_arrival: f64,
    pub avg_wait_time_per_queued: f64,
    pub constrained_arrivals: f64,
    /// Time-weighted queue-length distribution, as percentages.
    pub queue_length_percentages: BTreeMap<u32, f64>,
    pub hourly_max_distribution: BTreeMap<u32, f64>,
}

/// One replication's statistics for the car-park model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarParkStats {
    pub utilisation: f64,
    pub entry: CarParkQueueStats,
    pub exit: CarParkQueueStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarParkQueueAggregate {
    pub served: Triple,
    pub delay_fraction: Triple,
    pub avg_wait_time_per_arrival: Triple,
    pub avg_wait_time_per_queued: Triple,
    pub constrained_arrivals: Triple,
    pub queue_length_percentages: BTreeMap<u32, Triple>,
    pub hourly_max_distribution: BTreeMap<u32, Triple>,
}

/// Car-park statistics reduced over N seeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarParkAggregate {
    pub utilisation: Triple,
    pub entry: CarParkQueueAggregate,
    pub exit: CarParkQueueAggregate,
    pub num_seeds: usize,
    pub rng_algorithm: String,
}

fn aggregate_car_park_queue<F>(runs: &[CarParkStats], pick: F) -> CarParkQueueAggregate
where
    F: Fn(&CarParkStats) -> &CarParkQueueStats,
{
    let n = runs.len();
    CarParkQueueAggregate {
        served: Triple::map(runs, |r| pick(r).served as f64),
        delay_fraction: Triple::map(runs, |r| pick(r).delay_fraction),
        avg_wait_time_per_arrival: Triple::map(runs, |r| pick(r).avg_wait_time_per_arrival),
        avg_wait_time_per_queued: Triple::map(runs, |r| pick(r).avg_wait_time_per_queued),
        constrained_arrivals: Triple::map(runs, |r| pick(r).constrained_arrivals),
        queue_length_percentages: aggregate_distribution(
            runs.iter().map(|r| &pick(r).queue_length_percentages),
            n,
        ),
        hourly_max_distribution: aggregate_distribution(
            runs.iter().map(|r| &pick(r).hourly_max_distribution),
            n,
        ),
    }
}

impl CarParkAggregate {
    pub fn from_runs(runs: &[CarParkStats], rng_algorithm: &str) -> Self {
        Self {
            utilisation: Triple::map(runs, |r| r.utilisation),
            entry: aggregate_car_park_queue(runs, |r| &r.entry),
            exit: aggregate_car_park_queue(runs, |r| &r.exit),
            num_seeds: runs.len(),
            rng_algorithm: rng_algorithm.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_of_single_value_is_identity() {
        let t = Triple::of(&[0.25]);
        assert_eq!(t.avg, 0.25);
        assert_eq!(t.min, 0.25);
        assert_eq!(t.max, 0.25);
    }

    #[test]
    fn triple_of_spread() {
        let t = Triple::of(&[1.0, 2.0, 6.0]);
        assert_eq!(t.avg, 3.0);
        assert_eq!(t.min, 1.0);
        assert_eq!(t.max, 6.0);
    }

    #[test]
    fn missing_distribution_keys_count_as_zero() {
        let mut a = BTreeMap::new();
        a.insert(0u32, 80.0);
        a.insert(1u32, 20.0);
        let mut b = BTreeMap::new();
        b.insert(0u32, 100.0);
        let agg = aggregate_distribution([&a, &b].into_iter(), 2);
        assert_eq!(agg[&1].min, 0.0);
        assert_eq!(agg[&1].max, 20.0);
        assert_eq!(agg[&1].avg, 10.0);
    }

    #[test]
    fn distributions_serialise_in_numeric_key_order() {
        let mut dist = BTreeMap::new();
        dist.insert(10u32, 1.0);
        dist.insert(2u32, 2.0);
        dist.insert(0u32, 97.0);
        let json = serde_json::to_string(&dist).unwrap();
        assert_eq!(json, r#"{"0":97.0,"2":2.0,"10":1.0}"#);
    }

    #[test]
    fn aggregated_keys_are_sorted() {
        let mut a = BTreeMap::new();
        a.insert(3u32, 1.0);
        a.insert(0u32, 99.0);
        let agg = aggregate_distribution([&a].into_iter(), 1);
        let keys: Vec<u32> = agg.keys().copied().collect();
        assert_eq!(keys, vec![0, 3]);
    }
}
