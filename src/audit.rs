//! Per-run audit artifacts: the final answer and the tool trace.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::agent::Trace;
use crate::error::{Error, Result};

/// Timestamp format used in artifact file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Paths written by [`AuditWriter::write`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditPaths {
    /// `incident_<ts>.json`.
    pub incident: PathBuf,
    /// `trace_<ts>.json`.
    pub trace: PathBuf,
}

/// Writes audit artifacts into one directory.
#[derive(Debug, Clone)]
pub struct AuditWriter {
    dir: PathBuf,
}

impl AuditWriter {
    /// Creates a writer targeting `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `incident_<ts>.json` and `trace_<ts>.json` for a run that
    /// finished at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audit`] if the directory or a file cannot be
    /// written.
    pub fn write(&self, answer: &str, trace: &Trace, at: DateTime<Utc>) -> Result<AuditPaths> {
        std::fs::create_dir_all(&self.dir).map_err(|source| Error::Audit {
            path: self.dir.clone(),
            source,
        })?;

        let ts = at.format(TIMESTAMP_FORMAT);
        let paths = AuditPaths {
            incident: self.dir.join(format!("incident_{ts}.json")),
            trace: self.dir.join(format!("trace_{ts}.json")),
        };

        write_file(
            &paths.incident,
            &serde_json::to_string_pretty(&incident_payload(answer))?,
        )?;
        write_file(&paths.trace, &serde_json::to_string_pretty(trace)?)?;

        info!(incident = %paths.incident.display(), trace = %paths.trace.display(), "audit artifacts saved");
        Ok(paths)
    }
}

/// The answer as JSON if it is an object, otherwise wrapped as `{"raw": ...}`.
#[must_use]
pub fn incident_payload(answer: &str) -> Value {
    match serde_json::from_str::<Value>(answer) {
        Ok(value @ Value::Object(_)) => value,
        _ => json!({ "raw": answer }),
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|source| Error::Audit {
        path: path.to_path_buf(),
        source,
    })
}
