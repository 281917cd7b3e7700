//! # trafsim-api::request
//!
//! The request schema. `serde` maps request payloads directly onto these
//! types; an unknown action or a malformed parameter block is rejected at
//! parse time with the offending token, before dispatch ever runs.

use serde::{Deserialize, Serialize};
use trafsim_types::errors::InvalidParams;
use trafsim_types::params::{ReplicationPlan, SeedMode};

/// The four execution protocols a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Run all N seeds and return the aggregated record.
    RunSimulation,
    /// Run seeds 0 and 1 and return them with a total-runtime estimate.
    GetFirstTwoSeedsTiming,
    /// Supply the first two per-seed results back, run seeds 2..N, and
    /// aggregate all N.
    RunRemainingSeeds,
    /// Run seeds in chunks of five with rolling progress re-estimates.
    RunSimulationBatched,
}

/// The parameter block of a request: the engine-specific parameters
/// (flattened), the replication settings, and — for `RunRemainingSeeds` —
/// the two prior per-seed results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParameters<P, O> {
    #[serde(flatten)]
    pub engine: P,
    pub num_seeds: usize,
    pub seed_mode: SeedMode,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub first_seed_result: Option<O>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub second_seed_result: Option<O>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds_completed: Option<usize>,
}

impl<P, O> RequestParameters<P, O> {
    pub fn plan(&self) -> Result<ReplicationPlan, InvalidParams> {
        let plan = ReplicationPlan {
            num_seeds: self.num_seeds,
            seed_mode: self.seed_mode,
        };
        plan.validate()?;
        Ok(plan)
    }
}

/// A structured request for one engine. `P` is the engine's parameter
/// block, `O` its per-seed result record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<P, O> {
    pub action: Action,
    pub parameters: RequestParameters<P, O>,
}
