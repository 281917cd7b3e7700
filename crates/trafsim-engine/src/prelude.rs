//! # trafsim-engine::prelude
//!
//! A convenience module that re-exports the most commonly used types from the
//! engine and its dependencies. This simplifies imports for other crates in
//! the workspace that depend on the engine.

pub use crate::{
    arrivals::{headway_adjusted_rate, ArrivalProcess},
    control::CancelToken,
    engines::{boom_gate::BoomGate, car_park::CarPark, two_way::TwoWayPassing},
    events::{DepartureHeap, EventQueue, Queued},
    replicate::{
        run_batched, run_first_two, run_remaining, run_single_shot, FirstTwoTiming, Model,
        Progress, RunReport, RunStatus,
    },
    rng::{plan_seeds, SimRng, RNG_ALGORITHM},
    stats::{StateClock, WaitStats, WAIT_EPSILON},
};

pub use trafsim_types::{errors::*, params::*, results::*, time::*};
