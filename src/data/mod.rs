//! Operational input tables and the deterministic planning snapshot.
//!
//! The five CSV tables (jobs, machines, operations, parts/suppliers and the
//! job-to-part mapping) are loaded once per run. [`planning`] derives the
//! critical-ratio table and machine availability from them; both are handed
//! to the model as authoritative context.

pub mod planning;
pub mod table;

use std::path::Path;

use tracing::debug;

pub use planning::{DEFAULT_TOP_JOBS, PlanningSnapshot, SupplyRisk};
pub use table::Table;

use crate::error::DataError;

/// File name of the jobs table.
pub const JOBS_FILE: &str = "jobs.csv";
/// File name of the machines table.
pub const MACHINES_FILE: &str = "machines.csv";
/// File name of the operations table.
pub const OPERATIONS_FILE: &str = "operations.csv";
/// File name of the parts/suppliers table.
pub const PARTS_FILE: &str = "parts_suppliers.csv";
/// File name of the job-to-part mapping.
pub const JOB_PARTS_FILE: &str = "job_parts.csv";

/// All input tables for one run.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Pending jobs with due dates and priorities.
    pub jobs: Table,
    /// Machines with status and speed.
    pub machines: Table,
    /// Routing operations with process and setup times.
    pub operations: Table,
    /// Parts with supplier risk and lead time.
    pub parts: Table,
    /// Parts required per job.
    pub job_parts: Table,
}

impl Dataset {
    /// Loads all five tables from `dir`.
    ///
    /// Table names (used as evidence source tags) are the file stems.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Csv`] naming the first file that is missing or
    /// malformed.
    pub fn load(dir: &Path) -> Result<Self, DataError> {
        let load = |file: &str| {
            let name = file.trim_end_matches(".csv");
            Table::from_path(name, &dir.join(file))
        };

        let dataset = Self {
            jobs: load(JOBS_FILE)?,
            machines: load(MACHINES_FILE)?,
            operations: load(OPERATIONS_FILE)?,
            parts: load(PARTS_FILE)?,
            job_parts: load(JOB_PARTS_FILE)?,
        };

        debug!(
            jobs = dataset.jobs.len(),
            machines = dataset.machines.len(),
            operations = dataset.operations.len(),
            parts = dataset.parts.len(),
            job_parts = dataset.job_parts.len(),
            "dataset loaded"
        );

        Ok(dataset)
    }
}
