//! # trafsim-types::params
//!
//! Strongly-typed parameter blocks for the three simulation engines, plus the
//! replication settings shared by all of them. These types are the
//! authoritative schema for request payloads; `serde` maps them directly from
//! the JSON/YAML/TOML the boundary accepts.
//!
//! Rates are accepted per hour and speeds in m/s at this level, matching the
//! external contract; engines convert to per-second internally. A zero or
//! negative arrival rate is a valid degenerate input (it produces a
//! zero-activity result), so `validate` deliberately does not reject it.

use crate::errors::{FieldCheck, InvalidParams};
use serde::{Deserialize, Serialize};

/// How replication indices map to RNG seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedMode {
    /// Deterministic map from replication index to seed; reruns are
    /// byte-identical.
    Fixed,
    /// Each seed drawn uniformly from a wide integer range.
    Random,
}

/// Replication settings shared by every engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationPlan {
    pub num_seeds: usize,
    pub seed_mode: SeedMode,
}

impl ReplicationPlan {
    pub fn validate(&self) -> Result<(), InvalidParams> {
        let mut check = FieldCheck::new();
        check.require(self.num_seeds >= 1, "numSeeds");
        check.finish()
    }
}

/// Parameters for the single-server boom-gate model (M/G/1 with a two-stage
/// additive service and minimum-headway arrivals).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoomGateParams {
    pub simulation_hours: f64,
    pub arrival_rate_per_hour: f64,
    pub min_headway_seconds: f64,
    pub service_part1_mean_seconds: f64,
    pub service_part2_mean_seconds: f64,
    pub part1_is_exponential: bool,
    pub part2_is_exponential: bool,
    /// Safety cap on customers simultaneously in the system; exceeded means
    /// the settings are saturated (`rho > 1`) and the run aborts.
    #[serde(default = "default_max_in_system")]
    pub max_in_system: u64,
}

fn default_max_in_system() -> u64 {
    10_000_000
}

impl BoomGateParams {
    pub fn validate(&self) -> Result<(), InvalidParams> {
        let mut check = FieldCheck::new();
        check.require(
            self.simulation_hours.is_finite() && self.simulation_hours >= 0.0,
            "simulationHours",
        );
        check.require(self.arrival_rate_per_hour.is_finite(), "arrivalRatePerHour");
        check.require(
            self.min_headway_seconds.is_finite() && self.min_headway_seconds >= 0.0,
            "minHeadwaySeconds",
        );
        // A non-positive mean is treated as a zero-length stage, but only if
        // the stream actually carries customers does the combination of a
        // positive rate with two non-positive means make no model.
        let service = self.service_part1_mean_seconds.max(0.0)
            + self.service_part2_mean_seconds.max(0.0);
        check.require(
            self.arrival_rate_per_hour <= 0.0 || service > 0.0,
            "servicePart1MeanSeconds",
        );
        check.require(
            self.service_part1_mean_seconds.is_finite(),
            "servicePart1MeanSeconds",
        );
        check.require(
            self.service_part2_mean_seconds.is_finite(),
            "servicePart2MeanSeconds",
        );
        check.require(self.max_in_system > 0, "maxInSystem");
        check.finish()
    }
}

/// The capacity discipline of one corridor segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentKind {
    /// Alternates direction; holds one green direction at a time.
    OneWay,
    /// Unlimited parallel capacity; never blocks.
    TwoWay,
}

/// A linear stretch of road treated as a single capacity unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub length_meters: f64,
}

/// Parameters for the two-way-passing corridor model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoWayParams {
    /// Corridor segments in order; direction A traverses left-to-right.
    pub segments: Vec<Segment>,
    pub speed_meters_per_second: f64,
    pub simulation_seconds: f64,
    pub min_gap_seconds: f64,
    pub switch_over_seconds: f64,
    pub lambda_a_per_second: f64,
    pub lambda_b_per_second: f64,
    pub warmup_seconds: f64,
}

impl TwoWayParams {
    pub fn validate(&self) -> Result<(), InvalidParams> {
        let mut check = FieldCheck::new();
        check.require(!self.segments.is_empty(), "segments");
        check.require(
            self.segments
                .iter()
                .all(|s| s.length_meters.is_finite() && s.length_meters > 0.0),
            "segments.lengthMeters",
        );
        check.require(
            self.speed_meters_per_second.is_finite() && self.speed_meters_per_second > 0.0,
            "speedMetersPerSecond",
        );
        check.require(
            self.simulation_seconds.is_finite() && self.simulation_seconds >= 0.0,
            "simulationSeconds",
        );
        check.require(
            self.min_gap_seconds.is_finite() && self.min_gap_seconds >= 0.0,
            "minGapSeconds",
        );
        check.require(
            self.switch_over_seconds.is_finite() && self.switch_over_seconds >= 0.0,
            "switchOverSeconds",
        );
        check.require(self.lambda_a_per_second.is_finite(), "lambdaAPerSecond");
        check.require(self.lambda_b_per_second.is_finite(), "lambdaBPerSecond");
        check.require(
            self.warmup_seconds.is_finite()
                && self.warmup_seconds >= 0.0
                && self.warmup_seconds <= self.simulation_seconds,
            "warmupSeconds",
        );
        check.finish()
    }
}

/// Which queue the car-park server prefers when both hold customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    /// First-come-first-served across both queues.
    #[serde(rename = "FCFS")]
    Fcfs,
    /// Entering cars first; exits served only when the entry queue is empty.
    #[serde(rename = "CARS")]
    Entry,
    /// Exiting cars first; entries served only when the exit queue is empty.
    #[serde(rename = "PEOPLE")]
    Exit,
}

/// Parameters for the car-park entry/exit model (two queues, one server).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarParkParams {
    pub simulation_hours: f64,
    pub entry_rate_per_hour: f64,
    pub exit_rate_per_hour: f64,
    pub entry_headway_seconds: f64,
    pub exit_headway_seconds: f64,
    pub entry_service_time: f64,
    pub exit_service_time: f64,
    pub priority: Priority,
}

impl CarParkParams {
    pub fn validate(&self) -> Result<(), InvalidParams> {
        let mut check = FieldCheck::new();
        check.require(
            self.simulation_hours.is_finite() && self.simulation_hours >= 0.0,
            "simulationHours",
        );
        check.require(self.entry_rate_per_hour.is_finite(), "entryRatePerHour");
        check.require(self.exit_rate_per_hour.is_finite(), "exitRatePerHour");
        check.require(
            self.entry_headway_seconds.is_finite() && self.entry_headway_seconds >= 0.0,
            "entryHeadwaySeconds",
        );
        check.require(
            self.exit_headway_seconds.is_finite() && self.exit_headway_seconds >= 0.0,
            "exitHeadwaySeconds",
        );
        check.require(
            self.entry_rate_per_hour <= 0.0
                || (self.entry_service_time.is_finite() && self.entry_service_time > 0.0),
            "entryServiceTime",
        );
        check.require(
            self.exit_rate_per_hour <= 0.0
                || (self.exit_service_time.is_finite() && self.exit_service_time > 0.0),
            "exitServiceTime",
        );
        check.finish()
    }
}
