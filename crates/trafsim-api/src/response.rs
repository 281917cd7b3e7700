//! # trafsim-api::response
//!
//! The response schema. `A` is the engine's aggregated record, `O` its
//! per-seed result record (present only in the two-phase timing protocol).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<A, O> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<A>,
    pub execution_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when a cancelled run returns a partial aggregate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds_completed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_seed_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_total_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seed_result: Option<O>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_seed_result: Option<O>,
}

impl<A, O> Response<A, O> {
    fn base(execution_time_ms: f64) -> Self {
        Self {
            success: true,
            results: None,
            execution_time_ms,
            error: None,
            incomplete: None,
            seeds_completed: None,
            second_seed_time: None,
            estimated_total_time: None,
            first_seed_result: None,
            second_seed_result: None,
        }
    }

    pub fn complete(results: A, execution_time_ms: f64) -> Self {
        Self {
            results: Some(results),
            ..Self::base(execution_time_ms)
        }
    }

    /// A cancelled run: not an error, but marked incomplete and carrying
    /// whatever seeds finished.
    pub fn cancelled(
        partial: Option<A>,
        seeds_completed: usize,
        execution_time_ms: f64,
    ) -> Self {
        Self {
            results: partial,
            incomplete: Some(true),
            seeds_completed: Some(seeds_completed),
            ..Self::base(execution_time_ms)
        }
    }

    /// The first call of the two-phase protocol: both seed results plus the
    /// runtime extrapolation.
    pub fn timing(
        first: O,
        second: O,
        second_seed_time: f64,
        estimated_total_time: f64,
        execution_time_ms: f64,
    ) -> Self {
        Self {
            first_seed_result: Some(first),
            second_seed_result: Some(second),
            second_seed_time: Some(second_seed_time),
            estimated_total_time: Some(estimated_total_time),
            seeds_completed: Some(2),
            ..Self::base(execution_time_ms)
        }
    }
}
