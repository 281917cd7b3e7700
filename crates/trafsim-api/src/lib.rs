//! # trafsim-api
//!
//! The thin request/response boundary around the simulation core. A request
//! names an action and carries an engine-specific parameter block plus the
//! replication settings; the response carries the aggregated record and
//! timing fields. Transport (HTTP, CLI, tests) is the caller's concern —
//! this crate is pure dispatch and validation.

#![forbid(unsafe_code)]

pub mod dispatch;
pub mod request;
pub mod response;

pub use dispatch::{handle_boom_gate, handle_car_park, handle_two_way, ApiError};
pub use request::{Action, Request, RequestParameters};
pub use response::Response;
