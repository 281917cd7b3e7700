//! # trafsim-engine::engines
//!
//! The three simulation engines. Each owns its queue state and drives the
//! event kernel with engine-specific event kinds; nothing above an engine
//! looks inside its private state.

pub mod boom_gate;
pub mod car_park;
pub mod two_way;
