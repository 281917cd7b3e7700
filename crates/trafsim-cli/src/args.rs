//! # trafsim-cli::args
//!
//! Defines the command-line argument structure using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, default_value = "human")]
    pub log: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation request file against one of the models.
    Run(RunOpts),
    /// Validate a request file without running it.
    Validate {
        #[arg(value_enum)]
        model: ModelKind,
        #[arg(value_name = "REQUEST_PATH")]
        request: PathBuf,
    },
    /// List the available simulation models.
    ListModels,
}

#[derive(Args, Debug)]
pub struct RunOpts {
    /// Which simulation model the request targets.
    #[arg(short, long, value_enum)]
    pub model: ModelKind,

    /// Path to the request file (JSON, YAML, or TOML).
    #[arg(short, long)]
    pub request: PathBuf,

    /// Print batched-mode progress updates to stderr.
    #[arg(long)]
    pub progress: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    BoomGate,
    TwoWay,
    CarPark,
}

impl ModelKind {
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::BoomGate => "boom-gate",
            ModelKind::TwoWay => "two-way",
            ModelKind::CarPark => "car-park",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}
