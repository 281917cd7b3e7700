//! # trafsim-cli::commands::list_models
//!
//! Implements the `list-models` subcommand.

use crate::wiring::MODEL_REGISTRY;
use anyhow::Result;

pub fn exec() -> Result<()> {
    println!("Available Models:");
    println!("{:<12} | {}", "Name", "Description");
    println!("{:-<12}-|-{:-<60}", "", "");

    for (name, description) in MODEL_REGISTRY {
        println!("{:<12} | {}", name, description);
    }

    Ok(())
}
