//! # trafsim-engine::replicate
//!
//! The replication orchestrator. Seeds are embarrassingly parallel: each
//! replication owns its stream and no state crosses seeds, so the
//! single-shot and remaining-seeds protocols fan whole replications out
//! across the rayon pool. The batched protocol runs seed-by-seed in chunks
//! so its rolling window measures true per-seed cost and cancellation is
//! honoured at chunk boundaries.
//!
//! The orchestrator owns no engine state; it is a pure driver.

use crate::control::CancelToken;
use crate::engines::{boom_gate::BoomGate, car_park::CarPark, two_way::TwoWayPassing};
use crate::rng::{plan_seeds, RNG_ALGORITHM};
use crossbeam_channel::Sender;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::time::Instant;
use trafsim_types::errors::SimError;
use trafsim_types::params::ReplicationPlan;
use trafsim_types::results::{
    BoomGateAggregate, BoomGateStats, CarParkAggregate, CarParkStats, TwoWayAggregate, TwoWayStats,
};

/// Fixed budget added to the two-phase estimate for final averaging work.
pub const AVERAGING_BUDGET_MS: f64 = 500.0;

/// Seeds per chunk in the batched protocol; the unit at which progress is
/// reported and cancellation is honoured.
pub const BATCH_SIZE: usize = 5;

/// Chunks contributing to the rolling per-seed time estimate.
const ROLLING_WINDOW: usize = 5;

/// A simulation engine the orchestrator can replicate.
pub trait Model: Sync {
    type Output: Clone + Send;
    type Aggregate;

    fn run_seed(&self, seed: u64, cancel: &CancelToken) -> Result<Self::Output, SimError>;
    fn aggregate(runs: &[Self::Output]) -> Self::Aggregate;
}

impl Model for BoomGate {
    type Output = BoomGateStats;
    type Aggregate = BoomGateAggregate;

    fn run_seed(&self, seed: u64, cancel: &CancelToken) -> Result<Self::Output, SimError> {
        BoomGate::run_seed(self, seed, cancel)
    }

    fn aggregate(runs: &[Self::Output]) -> Self::Aggregate {
        BoomGateAggregate::from_runs(runs, RNG_ALGORITHM)
    }
}

impl Model for TwoWayPassing {
    type Output = TwoWayStats;
    type Aggregate = TwoWayAggregate;

    fn run_seed(&self, seed: u64, cancel: &CancelToken) -> Result<Self::Output, SimError> {
        TwoWayPassing::run_seed(self, seed, cancel)
    }

    fn aggregate(runs: &[Self::Output]) -> Self::Aggregate {
        TwoWayAggregate::from_runs(runs, RNG_ALGORITHM)
    }
}

impl Model for CarPark {
    type Output = CarParkStats;
    type Aggregate = CarParkAggregate;

    fn run_seed(&self, seed: u64, cancel: &CancelToken) -> Result<Self::Output, SimError> {
        CarPark::run_seed(self, seed, cancel)
    }

    fn aggregate(runs: &[Self::Output]) -> Self::Aggregate {
        CarParkAggregate::from_runs(runs, RNG_ALGORITHM)
    }
}

/// How a multi-seed run ended.
#[derive(Debug)]
pub enum RunStatus<A> {
    Complete(A),
    /// Cancelled cooperatively; carries whatever seeds completed.
    Cancelled {
        partial: Option<A>,
        seeds_completed: usize,
    },
}

/// A finished (or cancelled) run plus its wall-clock cost.
#[derive(Debug)]
pub struct RunReport<A> {
    pub status: RunStatus<A>,
    pub execution_time_ms: f64,
}

/// Results of the two-phase protocol's first call: seeds 0 and 1 plus the
/// timing extrapolation for the remaining seeds.
#[derive(Debug)]
pub struct FirstTwoTiming<O> {
    pub first: O,
    pub second: O,
    pub second_seed_ms: f64,
    pub estimated_total_ms: f64,
    pub execution_time_ms: f64,
    pub seeds_completed: usize,
}

/// A batched-mode progress update.
#[derive(Debug, Clone)]
pub struct Progress {
    pub seeds_completed: usize,
    pub num_seeds: usize,
    pub avg_seed_ms: f64,
    pub estimated_remaining_ms: f64,
}

fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Runs `seeds` across the rayon pool. Returns the completed outputs in
/// seed order and whether any replication observed cancellation.
fn collect_parallel<M: Model>(
    model: &M,
    seeds: &[u64],
    cancel: &CancelToken,
) -> Result<(Vec<M::Output>, bool), SimError> {
    let results: Vec<Result<M::Output, SimError>> = seeds
        .par_iter()
        .map(|&seed| model.run_seed(seed, cancel))
        .collect();

    let mut outputs = Vec::with_capacity(results.len());
    let mut cancelled = false;
    for result in results {
        match result {
            Ok(output) => outputs.push(output),
            Err(SimError::Cancelled { .. }) => cancelled = true,
            Err(other) => return Err(other),
        }
    }
    Ok((outputs, cancelled))
}

fn finish<M: Model>(outputs: Vec<M::Output>, cancelled: bool, num_seeds: usize) -> RunStatus<M::Aggregate> {
    if cancelled {
        let seeds_completed = outputs.len();
        let partial = (!outputs.is_empty()).then(|| M::aggregate(&outputs));
        RunStatus::Cancelled {
            partial,
            seeds_completed,
        }
    } else {
        debug_assert_eq!(outputs.len(), num_seeds);
        RunStatus::Complete(M::aggregate(&outputs))
    }
}

/// Protocol 1: run all N seeds and reduce.
pub fn run_single_shot<M: Model>(
    model: &M,
    plan: &ReplicationPlan,
    cancel: &CancelToken,
) -> Result<RunReport<M::Aggregate>, SimError> {
    let started = Instant::now();
    let seeds = plan_seeds(plan.seed_mode, plan.num_seeds);
    let (outputs, cancelled) = collect_parallel(model, &seeds, cancel)?;
    tracing::info!(
        target: "replicate",
        num_seeds = plan.num_seeds,
        completed = outputs.len(),
        "single-shot run finished"
    );
    Ok(RunReport {
        status: finish::<M>(outputs, cancelled || cancel.is_cancelled(), plan.num_seeds),
        execution_time_ms: ms_since(started),
    })
}

/// Protocol 2, first call: run seeds 0 and 1 sequentially and extrapolate
/// the total runtime. Seed 0 is treated as a warm-up; seed 1's time drives
/// the estimate. Requires `num_seeds >= 2`.
pub fn run_first_two<M: Model>(
    model: &M,
    plan: &ReplicationPlan,
    cancel: &CancelToken,
) -> Result<FirstTwoTiming<M::Output>, SimError> {
    let started = Instant::now();
    let seeds = plan_seeds(plan.seed_mode, plan.num_seeds);

    let first = model.run_seed(seeds[0], cancel).map_err(|e| match e {
        SimError::Cancelled { .. } => SimError::Cancelled {
            seeds_completed: 0,
            num_seeds: plan.num_seeds,
        },
        other => other,
    })?;
    let second_started = Instant::now();
    let second = model.run_seed(seeds[1], cancel).map_err(|e| match e {
        SimError::Cancelled { .. } => SimError::Cancelled {
            seeds_completed: 1,
            num_seeds: plan.num_seeds,
        },
        other => other,
    })?;
    let second_seed_ms = ms_since(second_started);
    let execution_time_ms = ms_since(started);
    let remaining = plan.num_seeds.saturating_sub(2) as f64;

    Ok(FirstTwoTiming {
        first,
        second,
        second_seed_ms,
        estimated_total_ms: execution_time_ms + remaining * second_seed_ms + AVERAGING_BUDGET_MS,
        execution_time_ms,
        seeds_completed: 2,
    })
}

/// Protocol 2, follow-up call: given the two prior outputs, run seeds
/// `prior.len()..N` and aggregate all N.
pub fn run_remaining<M: Model>(
    model: &M,
    plan: &ReplicationPlan,
    prior: Vec<M::Output>,
    cancel: &CancelToken,
) -> Result<RunReport<M::Aggregate>, SimError> {
    let started = Instant::now();
    let seeds = plan_seeds(plan.seed_mode, plan.num_seeds);
    let done = prior.len().min(seeds.len());
    let (rest, cancelled) = collect_parallel(model, &seeds[done..], cancel)?;

    let mut outputs = prior;
    outputs.extend(rest);
    Ok(RunReport {
        status: finish::<M>(outputs, cancelled || cancel.is_cancelled(), plan.num_seeds),
        execution_time_ms: ms_since(started),
    })
}

/// Protocol 3: run seeds in chunks of [`BATCH_SIZE`], re-projecting the
/// remaining wall time from a rolling window after each chunk.
pub fn run_batched<M: Model>(
    model: &M,
    plan: &ReplicationPlan,
    cancel: &CancelToken,
    progress: Option<&Sender<Progress>>,
) -> Result<RunReport<M::Aggregate>, SimError> {
    let started = Instant::now();
    let seeds = plan_seeds(plan.seed_mode, plan.num_seeds);
    let mut outputs: Vec<M::Output> = Vec::with_capacity(plan.num_seeds);
    let mut window: VecDeque<f64> = VecDeque::with_capacity(ROLLING_WINDOW);

    for chunk in seeds.chunks(BATCH_SIZE) {
        if cancel.is_cancelled() {
            return Ok(RunReport {
                status: finish::<M>(outputs, true, plan.num_seeds),
                execution_time_ms: ms_since(started),
            });
        }
        let chunk_started = Instant::now();
        for &seed in chunk {
            match model.run_seed(seed, cancel) {
                Ok(output) => outputs.push(output),
                Err(SimError::Cancelled { .. }) => {
                    return Ok(RunReport {
                        status: finish::<M>(outputs, true, plan.num_seeds),
                        execution_time_ms: ms_since(started),
                    });
                }
                Err(other) => return Err(other),
            }
        }

        let per_seed_ms = ms_since(chunk_started) / chunk.len() as f64;
        if window.len() == ROLLING_WINDOW {
            window.pop_front();
        }
        window.push_back(per_seed_ms);
        let avg_seed_ms = window.iter().sum::<f64>() / window.len() as f64;
        let estimated_remaining_ms = (plan.num_seeds - outputs.len()) as f64 * avg_seed_ms;
        tracing::debug!(
            target: "replicate",
            completed = outputs.len(),
            total = plan.num_seeds,
            avg_seed_ms,
            "chunk finished"
        );
        if let Some(tx) = progress {
            // Non-blocking: a slow consumer must not stall the run.
            let _ = tx.try_send(Progress {
                seeds_completed: outputs.len(),
                num_seeds: plan.num_seeds,
                avg_seed_ms,
                estimated_remaining_ms,
            });
        }
    }

    Ok(RunReport {
        status: finish::<M>(outputs, false, plan.num_seeds),
        execution_time_ms: ms_since(started),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trafsim_types::params::{BoomGateParams, SeedMode};

    fn quick_gate() -> BoomGate {
        BoomGate::new(BoomGateParams {
            simulation_hours: 1.0,
            arrival_rate_per_hour: 120.0,
            min_headway_seconds: 1.0,
            service_part1_mean_seconds: 3.0,
            service_part2_mean_seconds: 1.0,
            part1_is_exponential: true,
            part2_is_exponential: false,
            max_in_system: 10_000_000,
        })
    }

    fn plan(n: usize) -> ReplicationPlan {
        ReplicationPlan {
            num_seeds: n,
            seed_mode: SeedMode::Fixed,
        }
    }

    fn complete<A>(report: RunReport<A>) -> A {
        match report.status {
            RunStatus::Complete(agg) => agg,
            RunStatus::Cancelled { .. } => panic!("unexpected cancellation"),
        }
    }

    #[test]
    fn single_seed_aggregation_is_identity() {
        let agg = complete(
            run_single_shot(&quick_gate(), &plan(1), &CancelToken::new()).unwrap(),
        );
        assert_eq!(agg.num_seeds, 1);
        let t = agg.total_customers;
        assert_eq!(t.avg, t.min);
        assert_eq!(t.min, t.max);
        for triple in agg.system_state_percentages.values() {
            assert_eq!(triple.avg, triple.min);
            assert_eq!(triple.min, triple.max);
        }
    }

    #[test]
    fn fixed_mode_reruns_identically() {
        let gate = quick_gate();
        let a = complete(run_single_shot(&gate, &plan(4), &CancelToken::new()).unwrap());
        let b = complete(run_single_shot(&gate, &plan(4), &CancelToken::new()).unwrap());
        assert_eq!(a.total_customers, b.total_customers);
        assert_eq!(a.system_state_percentages, b.system_state_percentages);
        assert_eq!(a.hourly_max_distribution, b.hourly_max_distribution);
        assert_eq!(a.rng_algorithm, RNG_ALGORITHM);
    }

    #[test]
    fn two_phase_matches_single_shot() {
        let gate = quick_gate();
        let p = plan(6);
        let token = CancelToken::new();
        let timing = run_first_two(&gate, &p, &token).unwrap();
        assert_eq!(timing.seeds_completed, 2);
        assert!(timing.estimated_total_ms >= AVERAGING_BUDGET_MS);

        let resumed = complete(
            run_remaining(&gate, &p, vec![timing.first, timing.second], &token).unwrap(),
        );
        let direct = complete(run_single_shot(&gate, &p, &token).unwrap());
        assert_eq!(resumed.total_customers, direct.total_customers);
        assert_eq!(
            resumed.system_state_percentages,
            direct.system_state_percentages
        );
    }

    #[test]
    fn batched_matches_single_shot_and_reports_progress() {
        let gate = quick_gate();
        let p = plan(12);
        let token = CancelToken::new();
        let (tx, rx) = crossbeam_channel::unbounded();

        let batched = complete(run_batched(&gate, &p, &token, Some(&tx)).unwrap());
        let direct = complete(run_single_shot(&gate, &p, &token).unwrap());
        assert_eq!(batched.total_customers, direct.total_customers);

        let updates: Vec<Progress> = rx.try_iter().collect();
        assert_eq!(updates.len(), 3); // chunks of 5: 5, 10, 12
        assert_eq!(updates[0].seeds_completed, 5);
        assert_eq!(updates.last().unwrap().seeds_completed, 12);
        assert_eq!(updates.last().unwrap().estimated_remaining_ms, 0.0);
    }

    #[test]
    fn pre_cancelled_run_reports_no_seeds() {
        let token = CancelToken::new();
        token.cancel();
        let report = run_single_shot(&quick_gate(), &plan(3), &token).unwrap();
        match report.status {
            RunStatus::Cancelled {
                partial,
                seeds_completed,
            } => {
                assert!(partial.is_none());
                assert_eq!(seeds_completed, 0);
            }
            RunStatus::Complete(_) => panic!("expected cancellation"),
        }
    }

    #[test]
    fn random_mode_completes_with_requested_seed_count() {
        let p = ReplicationPlan {
            num_seeds: 3,
            seed_mode: SeedMode::Random,
        };
        let agg = complete(run_single_shot(&quick_gate(), &p, &CancelToken::new()).unwrap());
        assert_eq!(agg.num_seeds, 3);
    }

    #[test]
    fn saturation_aborts_the_whole_run() {
        let gate = BoomGate::new(BoomGateParams {
            max_in_system: 2,
            arrival_rate_per_hour: 3600.0,
            service_part1_mean_seconds: 60.0,
            part1_is_exponential: false,
            ..quick_gate().params().clone()
        });
        let err = run_single_shot(&gate, &plan(2), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, SimError::Saturated { cap: 2, .. }));
    }
}
