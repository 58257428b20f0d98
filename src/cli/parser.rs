//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::output::OutputFormat;
use crate::data::DEFAULT_TOP_JOBS;

/// Default machine treated as down when none is given.
pub const DEFAULT_DOWN_MACHINE: &str = "M004";

/// Default directory for audit artifacts.
pub const DEFAULT_AUDIT_DIR: &str = "artifacts/audit_logs";

/// mamo-rs: machine-outage replanning with a tool-using agent.
///
/// Loads the production tables, ranks jobs by critical ratio, indexes
/// every row for retrieval, and asks a chat model to replan around a
/// down machine.
#[derive(Parser, Debug)]
#[command(name = "mamo-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding jobs.csv, machines.csv, operations.csv,
    /// parts_suppliers.csv and job_parts.csv.
    #[arg(short, long, env = "MAMO_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replan around a down machine using the agent.
    ///
    /// Requires chat and embedding credentials (see README).
    #[command(after_help = r#"Examples:
  mamo-rs run                                   # Replan around M004
  mamo-rs run --down-machine M002 --top-jobs 5  # Different outage
  mamo-rs run --question "Which jobs move first?"
  mamo-rs run --max-steps 3 --no-audit
  mamo-rs --format json run | jq '.trace'
"#)]
    Run {
        /// Question override (defaults to the question template).
        #[arg(short, long)]
        question: Option<String>,

        /// Machine that is down.
        #[arg(short = 'm', long, default_value = DEFAULT_DOWN_MACHINE)]
        down_machine: String,

        /// Number of jobs to replan.
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_JOBS)]
        top_jobs: usize,

        /// Maximum model calls before giving up.
        #[arg(long)]
        max_steps: Option<usize>,

        /// Directory with system.md / question.md overrides.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,

        /// Directory for audit artifacts.
        #[arg(long, default_value = DEFAULT_AUDIT_DIR)]
        audit_dir: PathBuf,

        /// Skip writing audit artifacts.
        #[arg(long)]
        no_audit: bool,

        /// Reference time for critical ratios (RFC 3339, default: now).
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Search the row index directly.
    ///
    /// Embeds every row, then prints the closest matches to the query.
    #[command(after_help = r#"Examples:
  mamo-rs search "M004 lathe"            # Top 10 rows
  mamo-rs search "supplier risk" -k 3    # Top 3 rows
  mamo-rs --format json search "J002" | jq '.results[].source'
"#)]
    Search {
        /// Search query text.
        query: String,

        /// Maximum number of results.
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,
    },

    /// Show the CR table and available machines without calling a model.
    #[command(after_help = r#"Examples:
  mamo-rs priorities                       # Next 8 jobs by CR
  mamo-rs priorities --top-jobs 3
  mamo-rs priorities --as-of 2030-01-01T00:00:00Z
"#)]
    Priorities {
        /// Number of jobs to show.
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_JOBS)]
        top_jobs: usize,

        /// Reference time for critical ratios (RFC 3339, default: now).
        #[arg(long)]
        as_of: Option<String>,
    },
}
