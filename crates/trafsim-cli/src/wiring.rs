//! # trafsim-cli::wiring
//!
//! The model registry and the request-file plumbing shared by the
//! subcommands.

use anyhow::Result;
use serde::de::DeserializeOwned;
use std::{fs, path::Path};
use trafsim_api::Request;

/// The central registry of available models: CLI name and description.
pub static MODEL_REGISTRY: &[(&str, &str)] = &[
    (
        "boom-gate",
        "Single-server boom gate (M/G/1, two-stage additive service)",
    ),
    (
        "two-way",
        "Two-way passing corridor with alternating one-way segments",
    ),
    (
        "car-park",
        "Car-park entry/exit: two queues, one server, priority disciplines",
    ),
];

/// Parses a request file by extension (JSON, YAML, or TOML).
pub fn parse_request<P, O>(path: &Path) -> Result<Request<P, O>>
where
    P: DeserializeOwned,
    O: DeserializeOwned,
{
    let content = fs::read_to_string(path)?;
    let request = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => return Err(anyhow::anyhow!("Unsupported request file extension")),
    };
    Ok(request)
}
