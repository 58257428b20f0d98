//! CLI layer for mamo-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! running the replanning agent, searching the row index and inspecting
//! job priorities.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
