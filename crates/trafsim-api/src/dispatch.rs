//! # trafsim-api::dispatch
//!
//! Validates a request and drives the orchestrator. One public handler per
//! engine; the protocol logic is shared by a generic executor.

use crate::request::{Action, Request};
use crate::response::Response;
use crossbeam_channel::Sender;
use thiserror::Error;
use trafsim_engine::prelude::*;

/// A request that could not be served.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Client error: the parameters failed validation. Carries the field
    /// list.
    #[error(transparent)]
    InvalidParameters(#[from] InvalidParams),
    /// Server error: the simulation itself failed (e.g. a saturated
    /// system). The message is safe to surface.
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimError),
}

pub fn handle_boom_gate(
    request: &Request<BoomGateParams, BoomGateStats>,
    cancel: &CancelToken,
    progress: Option<&Sender<Progress>>,
) -> Result<Response<BoomGateAggregate, BoomGateStats>, ApiError> {
    request.parameters.engine.validate()?;
    let plan = request.parameters.plan()?;
    let model = BoomGate::new(request.parameters.engine.clone());
    execute(&model, request, plan, cancel, progress)
}

pub fn handle_two_way(
    request: &Request<TwoWayParams, TwoWayStats>,
    cancel: &CancelToken,
    progress: Option<&Sender<Progress>>,
) -> Result<Response<TwoWayAggregate, TwoWayStats>, ApiError> {
    request.parameters.engine.validate()?;
    let plan = request.parameters.plan()?;
    let model = TwoWayPassing::new(request.parameters.engine.clone());
    execute(&model, request, plan, cancel, progress)
}

pub fn handle_car_park(
    request: &Request<CarParkParams, CarParkStats>,
    cancel: &CancelToken,
    progress: Option<&Sender<Progress>>,
) -> Result<Response<CarParkAggregate, CarParkStats>, ApiError> {
    request.parameters.engine.validate()?;
    let plan = request.parameters.plan()?;
    let model = CarPark::new(request.parameters.engine.clone());
    execute(&model, request, plan, cancel, progress)
}

fn execute<M, P>(
    model: &M,
    request: &Request<P, M::Output>,
    plan: ReplicationPlan,
    cancel: &CancelToken,
    progress: Option<&Sender<Progress>>,
) -> Result<Response<M::Aggregate, M::Output>, ApiError>
where
    M: Model,
{
    tracing::info!(
        target: "api",
        action = ?request.action,
        num_seeds = plan.num_seeds,
        "dispatching request"
    );
    match request.action {
        Action::RunSimulation => {
            let report = run_single_shot(model, &plan, cancel)?;
            Ok(report_to_response(report))
        }
        Action::RunSimulationBatched => {
            let report = run_batched(model, &plan, cancel, progress)?;
            Ok(report_to_response(report))
        }
        Action::GetFirstTwoSeedsTiming => {
            if plan.num_seeds < 2 {
                return Err(InvalidParams::new(vec!["numSeeds".into()]).into());
            }
            let started = std::time::Instant::now();
            match run_first_two(model, &plan, cancel) {
                Ok(timing) => Ok(Response::timing(
                    timing.first,
                    timing.second,
                    timing.second_seed_ms,
                    timing.estimated_total_ms,
                    timing.execution_time_ms,
                )),
                Err(SimError::Cancelled {
                    seeds_completed, ..
                }) => Ok(Response::cancelled(
                    None,
                    seeds_completed,
                    started.elapsed().as_secs_f64() * 1000.0,
                )),
                Err(other) => Err(other.into()),
            }
        }
        Action::RunRemainingSeeds => {
            let params = &request.parameters;
            let prior = match (
                &params.first_seed_result,
                &params.second_seed_result,
                params.seeds_completed,
            ) {
                (Some(first), Some(second), Some(_)) => vec![first.clone(), second.clone()],
                (first, second, completed) => {
                    let mut missing = Vec::new();
                    if first.is_none() {
                        missing.push("firstSeedResult".to_string());
                    }
                    if second.is_none() {
                        missing.push("secondSeedResult".to_string());
                    }
                    if completed.is_none() {
                        missing.push("seedsCompleted".to_string());
                    }
                    return Err(InvalidParams::new(missing).into());
                }
            };
            let report = run_remaining(model, &plan, prior, cancel)?;
            Ok(report_to_response(report))
        }
    }
}

fn report_to_response<A, O>(report: RunReport<A>) -> Response<A, O> {
    match report.status {
        RunStatus::Complete(aggregate) => {
            Response::complete(aggregate, report.execution_time_ms)
        }
        RunStatus::Cancelled {
            partial,
            seeds_completed,
        } => Response::cancelled(partial, seeds_completed, report.execution_time_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestParameters;
    use trafsim_types::params::{Priority, SeedMode};

    fn gate_params() -> BoomGateParams {
        serde_json::from_str(
            r#"{
                "simulationHours": 1.0,
                "arrivalRatePerHour": 120.0,
                "minHeadwaySeconds": 1.0,
                "servicePart1MeanSeconds": 3.0,
                "servicePart2MeanSeconds": 0.0,
                "part1IsExponential": true,
                "part2IsExponential": false
            }"#,
        )
        .unwrap()
    }

    fn gate_request(action: Action, num_seeds: usize) -> Request<BoomGateParams, BoomGateStats> {
        Request {
            action,
            parameters: RequestParameters {
                engine: gate_params(),
                num_seeds,
                seed_mode: SeedMode::Fixed,
                first_seed_result: None,
                second_seed_result: None,
                seeds_completed: None,
            },
        }
    }

    #[test]
    fn run_simulation_returns_aggregated_results() {
        let req = gate_request(Action::RunSimulation, 3);
        let resp = handle_boom_gate(&req, &CancelToken::new(), None).unwrap();
        assert!(resp.success);
        let agg = resp.results.unwrap();
        assert_eq!(agg.num_seeds, 3);
        assert!(resp.execution_time_ms >= 0.0);
    }

    #[test]
    fn two_phase_protocol_round_trips() {
        let token = CancelToken::new();
        let first_call = gate_request(Action::GetFirstTwoSeedsTiming, 4);
        let timing = handle_boom_gate(&first_call, &token, None).unwrap();
        assert!(timing.second_seed_time.is_some());
        assert!(timing.estimated_total_time.is_some());
        assert_eq!(timing.seeds_completed, Some(2));

        let mut follow_up = gate_request(Action::RunRemainingSeeds, 4);
        follow_up.parameters.first_seed_result = timing.first_seed_result;
        follow_up.parameters.second_seed_result = timing.second_seed_result;
        follow_up.parameters.seeds_completed = timing.seeds_completed;
        let resumed = handle_boom_gate(&follow_up, &token, None).unwrap();

        let direct = handle_boom_gate(&gate_request(Action::RunSimulation, 4), &token, None)
            .unwrap();
        assert_eq!(
            resumed.results.unwrap().total_customers,
            direct.results.unwrap().total_customers
        );
    }

    #[test]
    fn remaining_seeds_without_prior_results_names_the_fields() {
        let req = gate_request(Action::RunRemainingSeeds, 4);
        let err = handle_boom_gate(&req, &CancelToken::new(), None).unwrap_err();
        match err {
            ApiError::InvalidParameters(inv) => {
                assert_eq!(
                    inv.fields,
                    vec!["firstSeedResult", "secondSeedResult", "seedsCompleted"]
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn timing_needs_at_least_two_seeds() {
        let req = gate_request(Action::GetFirstTwoSeedsTiming, 1);
        let err = handle_boom_gate(&req, &CancelToken::new(), None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameters(_)));
    }

    #[test]
    fn invalid_engine_parameters_are_a_client_error() {
        let mut req = gate_request(Action::RunSimulation, 2);
        req.parameters.engine.simulation_hours = -5.0;
        let err = handle_boom_gate(&req, &CancelToken::new(), None).unwrap_err();
        match err {
            ApiError::InvalidParameters(inv) => {
                assert_eq!(inv.fields, vec!["simulationHours"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn cancelled_request_is_marked_incomplete_not_failed() {
        let token = CancelToken::new();
        token.cancel();
        let resp =
            handle_boom_gate(&gate_request(Action::RunSimulation, 3), &token, None).unwrap();
        assert!(resp.success);
        assert_eq!(resp.incomplete, Some(true));
        assert_eq!(resp.seeds_completed, Some(0));
        assert!(resp.results.is_none());
    }

    #[test]
    fn car_park_dispatch_smoke() {
        let req: Request<CarParkParams, CarParkStats> = Request {
            action: Action::RunSimulation,
            parameters: RequestParameters {
                engine: CarParkParams {
                    simulation_hours: 1.0,
                    entry_rate_per_hour: 120.0,
                    exit_rate_per_hour: 120.0,
                    entry_headway_seconds: 0.0,
                    exit_headway_seconds: 0.0,
                    entry_service_time: 5.0,
                    exit_service_time: 5.0,
                    priority: Priority::Fcfs,
                },
                num_seeds: 2,
                seed_mode: SeedMode::Fixed,
                first_seed_result: None,
                second_seed_result: None,
                seeds_completed: None,
            },
        };
        let resp = handle_car_park(&req, &CancelToken::new(), None).unwrap();
        let agg = resp.results.unwrap();
        assert!(agg.utilisation.avg > 0.0);
        assert_eq!(agg.num_seeds, 2);
    }

    #[test]
    fn responses_serialise_with_camel_case_keys() {
        let resp = handle_boom_gate(
            &gate_request(Action::RunSimulation, 2),
            &CancelToken::new(),
            None,
        )
        .unwrap();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"executionTimeMs\""));
        assert!(json.contains("\"systemStatePercentages\""));
        assert!(json.contains("\"rngAlgorithm\""));
    }
}
