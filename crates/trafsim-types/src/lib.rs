//! # trafsim-types
//!
//! This crate provides the foundational, shared data types used across the
//! entire trafsim workspace. Its purpose is to break dependency cycles by
//! providing a stable, central location for the parameter blocks, result
//! records, and error types that `trafsim-engine`, `trafsim-api`, and
//! `trafsim-cli` all need to agree upon.

#![forbid(unsafe_code)]

pub mod errors;
pub mod params;
pub mod results;
pub mod time;
