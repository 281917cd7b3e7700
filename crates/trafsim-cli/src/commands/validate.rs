//! # trafsim-cli::commands::validate
//!
//! Implements the `validate` subcommand.

use crate::args::ModelKind;
use crate::wiring::parse_request;
use anyhow::Result;
use std::path::PathBuf;
use trafsim_api::Request;
use trafsim_types::params::{BoomGateParams, CarParkParams, TwoWayParams};
use trafsim_types::results::{BoomGateStats, CarParkStats, TwoWayStats};

pub fn exec(model: ModelKind, path: PathBuf) -> Result<()> {
    println!("Validating request: {}", path.display());
    match model {
        ModelKind::BoomGate => {
            let request: Request<BoomGateParams, BoomGateStats> = parse_request(&path)?;
            request.parameters.engine.validate()?;
            request.parameters.plan()?;
        }
        ModelKind::TwoWay => {
            let request: Request<TwoWayParams, TwoWayStats> = parse_request(&path)?;
            request.parameters.engine.validate()?;
            request.parameters.plan()?;
        }
        ModelKind::CarPark => {
            let request: Request<CarParkParams, CarParkStats> = parse_request(&path)?;
            request.parameters.engine.validate()?;
            request.parameters.plan()?;
        }
    }
    println!("Request is valid for model '{}'.", model.name());
    Ok(())
}
