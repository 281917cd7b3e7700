//! # trafsim-cli::commands::run
//!
//! Implements the `run` subcommand: parse the request file, dispatch it to
//! the selected model, and print the JSON response to stdout. With
//! `--progress`, batched-mode updates stream to stderr while the run is in
//! flight.

use crate::args::{ModelKind, RunOpts};
use crate::wiring::parse_request;
use anyhow::Result;
use crossbeam_channel::Sender;
use serde::de::DeserializeOwned;
use serde::Serialize;
use trafsim_api::{ApiError, Request, Response};
use trafsim_engine::prelude::*;

pub fn exec(opts: RunOpts) -> Result<()> {
    tracing::info!(model = opts.model.name(), request = %opts.request.display(), "running request");
    match opts.model {
        ModelKind::BoomGate => run_model::<BoomGateParams, BoomGateStats, _, _>(
            &opts,
            |req, cancel, progress| trafsim_api::handle_boom_gate(req, cancel, progress),
        ),
        ModelKind::TwoWay => run_model::<TwoWayParams, TwoWayStats, _, _>(
            &opts,
            |req, cancel, progress| trafsim_api::handle_two_way(req, cancel, progress),
        ),
        ModelKind::CarPark => run_model::<CarParkParams, CarParkStats, _, _>(
            &opts,
            |req, cancel, progress| trafsim_api::handle_car_park(req, cancel, progress),
        ),
    }
}

fn run_model<P, O, A, F>(opts: &RunOpts, handler: F) -> Result<()>
where
    P: DeserializeOwned,
    O: DeserializeOwned + Serialize,
    A: Serialize,
    F: Fn(
        &Request<P, O>,
        &CancelToken,
        Option<&Sender<Progress>>,
    ) -> std::result::Result<Response<A, O>, ApiError>,
{
    let request: Request<P, O> = parse_request(&opts.request)?;
    let cancel = CancelToken::new();

    let response = if opts.progress {
        let (tx, rx) = crossbeam_channel::unbounded::<Progress>();
        std::thread::scope(|scope| {
            scope.spawn(move || {
                for update in rx.iter() {
                    eprintln!(
                        "seeds {}/{} ({:.0} ms/seed, ~{:.0} ms remaining)",
                        update.seeds_completed,
                        update.num_seeds,
                        update.avg_seed_ms,
                        update.estimated_remaining_ms
                    );
                }
            });
            let result = handler(&request, &cancel, Some(&tx));
            drop(tx);
            result
        })
    } else {
        handler(&request, &cancel, None)
    };

    match response {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(ApiError::InvalidParameters(inv)) => {
            Err(anyhow::anyhow!("invalid request: {inv}"))
        }
        Err(ApiError::Simulation(err)) => Err(anyhow::anyhow!("simulation error: {err}")),
    }
}
