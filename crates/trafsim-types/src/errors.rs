//! # trafsim-types::errors
//!
//! Defines the common error types used throughout the trafsim workspace.
//! Using `thiserror` provides clean, descriptive error handling. All error
//! variants must have a deterministic `Debug` implementation so that a
//! failing replication reports identically on every re-run of its seed.

use thiserror::Error;

/// A terminal condition raised by a simulation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// The number of customers in the system exceeded the configured safety
    /// cap. Under `rho > 1` settings the queue grows without bound; the cap
    /// turns that into a reportable condition instead of an allocation death.
    #[error("saturated system: {in_system} customers in system exceeds cap {cap}")]
    Saturated { cap: u64, in_system: u64 },

    /// The run was cancelled cooperatively. Carries how far it got.
    #[error("cancelled after {seeds_completed} of {num_seeds} seeds")]
    Cancelled {
        seeds_completed: usize,
        num_seeds: usize,
    },
}

/// A request failed validation. Carries the offending field names so the
/// boundary can report them to the caller in one round trip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid parameters: {}", fields.join(", "))]
pub struct InvalidParams {
    pub fields: Vec<String>,
}

impl InvalidParams {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

/// Collects offending field names during parameter validation.
#[derive(Debug, Default)]
pub struct FieldCheck {
    fields: Vec<String>,
}

impl FieldCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags `field` as invalid when `ok` is false.
    pub fn require(&mut self, ok: bool, field: &str) {
        if !ok {
            self.fields.push(field.to_string());
        }
    }

    pub fn finish(self) -> Result<(), InvalidParams> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(InvalidParams::new(self.fields))
        }
    }
}
