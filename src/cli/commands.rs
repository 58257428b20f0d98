//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::agent::{AgentConfig, Incident};
use crate::audit::incident_payload;
use crate::cli::output::{OutputFormat, format_search_results, format_table, table_json};
use crate::cli::parser::{Cli, Commands};
use crate::data::{Dataset, PlanningSnapshot};
use crate::error::{Error, Result};
use crate::replan::{Pipeline, Replan};

// ==================== Parameter Structs ====================

/// Parameters for the run command.
#[derive(Debug, Clone)]
pub struct RunParams<'a> {
    /// Question override.
    pub question: Option<&'a str>,
    /// Machine that is down.
    pub down_machine: &'a str,
    /// Number of jobs to replan.
    pub top_jobs: usize,
    /// Step budget override.
    pub max_steps: Option<usize>,
    /// Prompt override directory.
    pub prompt_dir: Option<&'a Path>,
    /// Audit directory, `None` to skip writing artifacts.
    pub audit_dir: Option<&'a Path>,
    /// Reference time, RFC 3339.
    pub as_of: Option<&'a str>,
}

// ==================== Dispatch ====================

/// Executes the parsed command and returns its rendered output.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = cli.format;
    let data_dir = cli.data_dir.as_path();

    match &cli.command {
        Commands::Run {
            question,
            down_machine,
            top_jobs,
            max_steps,
            prompt_dir,
            audit_dir,
            no_audit,
            as_of,
        } => {
            let params = RunParams {
                question: question.as_deref(),
                down_machine,
                top_jobs: *top_jobs,
                max_steps: *max_steps,
                prompt_dir: prompt_dir.as_deref(),
                audit_dir: (!*no_audit).then_some(audit_dir.as_path()),
                as_of: as_of.as_deref(),
            };
            cmd_run(data_dir, &params, format)
        }
        Commands::Search { query, top_k } => cmd_search(data_dir, query, *top_k, format),
        Commands::Priorities { top_jobs, as_of } => {
            cmd_priorities(data_dir, *top_jobs, as_of.as_deref(), format)
        }
    }
}

/// Parses `--as-of`, defaulting to the current time.
///
/// # Errors
///
/// Returns [`Error::Command`] if the value is not RFC 3339.
pub fn parse_as_of(raw: Option<&str>) -> Result<DateTime<Utc>> {
    raw.map_or_else(
        || Ok(Utc::now()),
        |value| {
            DateTime::parse_from_rfc3339(value.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::Command(format!("invalid --as-of {value:?}: {e}")))
        },
    )
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Command(format!("Failed to create async runtime: {e}")))?;
    Ok(rt.block_on(future))
}

// ==================== Commands ====================

fn cmd_priorities(
    data_dir: &Path,
    top_jobs: usize,
    as_of: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let now = parse_as_of(as_of)?;
    let dataset = Dataset::load(data_dir)?;
    let snapshot = PlanningSnapshot::compute(&dataset, now, top_jobs)?;

    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "Critical ratio as of {}:\n", now.to_rfc3339());
            output.push_str(&format_table(&snapshot.cr_table));
            let _ = writeln!(output, "\nAvailable machines:\n");
            output.push_str(&format_table(&snapshot.available_machines));
            Ok(output)
        }
        OutputFormat::Json => Ok(format.to_json(&json!({
            "as_of": now.to_rfc3339(),
            "cr_table": table_json(&snapshot.cr_table),
            "available_machines": table_json(&snapshot.available_machines),
        }))),
    }
}

fn cmd_search(data_dir: &Path, query: &str, top_k: usize, format: OutputFormat) -> Result<String> {
    let dataset = Dataset::load(data_dir)?;
    let config = AgentConfig::builder().from_env().build()?;
    let pipeline = Pipeline::from_config(config)?;

    let results = block_on(pipeline.search(&dataset, query, top_k))??;

    match format {
        OutputFormat::Text => Ok(format_search_results(&results, query)),
        OutputFormat::Json => Ok(format.to_json(&json!({
            "query": query,
            "count": results.len(),
            "results": results.iter().map(|r| json!({
                "position": r.position,
                "score": r.score,
                "source": r.document.source(),
                "row_index": r.document.row_index(),
                "text": r.document.text(),
            })).collect::<Vec<_>>(),
        }))),
    }
}

fn cmd_run(data_dir: &Path, params: &RunParams<'_>, format: OutputFormat) -> Result<String> {
    let now = parse_as_of(params.as_of)?;
    let dataset = Dataset::load(data_dir)?;

    // Build agent configuration from env + CLI overrides
    let mut builder = AgentConfig::builder().from_env();
    if let Some(steps) = params.max_steps {
        builder = builder.max_steps(steps);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = builder.build()?;
    let pipeline = Pipeline::from_config(config)?;

    let incident = Incident {
        down_machine: params.down_machine.to_string(),
        top_jobs: params.top_jobs,
        question: params.question.map(str::to_string),
    };
    let audit_dir = params.audit_dir.map(PathBuf::from);

    let replan = block_on(pipeline.replan(&dataset, &incident, now, audit_dir))??;
    Ok(format_replan(&replan, format))
}

fn format_replan(replan: &Replan, format: OutputFormat) -> String {
    let run = &replan.run;
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            output.push_str(run.answer());
            output.push('\n');
            let _ = writeln!(
                output,
                "\n[{} steps, {} tool calls, {} tokens, {:.1}s{}]",
                run.outcome.steps(),
                run.trace.len(),
                run.usage.total_tokens,
                run.elapsed.as_secs_f64(),
                if run.outcome.is_exhausted() { ", step budget exhausted" } else { "" },
            );
            if let Some(ref paths) = replan.audit {
                let _ = writeln!(output, "Audit: {}", paths.incident.display());
                let _ = writeln!(output, "Trace: {}", paths.trace.display());
            }
            output
        }
        OutputFormat::Json => format.to_json(&json!({
            "answer": incident_payload(run.answer()),
            "exhausted": run.outcome.is_exhausted(),
            "steps": run.outcome.steps(),
            "trace": run.trace,
            "usage": run.usage,
            "elapsed_ms": u64::try_from(run.elapsed.as_millis()).unwrap_or(u64::MAX),
            "documents_indexed": replan.documents_indexed,
            "audit": replan.audit,
        })),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::{AgentRun, LoopOutcome, TokenUsage, Trace};
    use std::time::Duration;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    #[test]
    fn test_parse_as_of() {
        let parsed = parse_as_of(Some("2030-01-01T00:00:00Z"))
            .unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert_eq!(parsed.to_rfc3339(), "2030-01-01T00:00:00+00:00");

        assert!(matches!(parse_as_of(Some("tomorrow")), Err(Error::Command(_))));
        assert!(parse_as_of(None).is_ok());
    }

    #[test]
    fn test_cmd_priorities_text() {
        let output = cmd_priorities(&fixtures(), 2, Some("2030-01-01T00:00:00Z"), OutputFormat::Text)
            .unwrap_or_else(|e| panic!("priorities failed: {e}"));

        assert!(output.starts_with("Critical ratio as of 2030-01-01T00:00:00+00:00:"));
        let j002 = output.find("J002").unwrap_or_else(|| panic!("J002 missing"));
        let j001 = output.find("J001").unwrap_or_else(|| panic!("J001 missing"));
        assert!(j002 < j001);
        assert!(!output.contains("J004"));
        assert!(output.contains("M001"));
        assert!(!output.contains("M004"));
    }

    #[test]
    fn test_cmd_priorities_json() {
        let output = cmd_priorities(&fixtures(), 8, Some("2030-01-01T00:00:00Z"), OutputFormat::Json)
            .unwrap_or_else(|e| panic!("priorities failed: {e}"));
        let value: serde_json::Value =
            serde_json::from_str(&output).unwrap_or_else(|e| panic!("bad json: {e}"));

        let order: Vec<&str> = value["cr_table"]
            .as_array()
            .unwrap_or_else(|| panic!("cr_table not an array"))
            .iter()
            .filter_map(|row| row["job_id"].as_str())
            .collect();
        assert_eq!(order, ["J002", "J001", "J004", "J003"]);
        assert_eq!(value["cr_table"][0]["CR"], "6.000");
        assert_eq!(value["available_machines"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_cmd_priorities_missing_dir() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let result = cmd_priorities(dir.path(), 8, None, OutputFormat::Text);
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_format_replan_json_wraps_plain_answer() {
        let replan = Replan {
            run: AgentRun {
                outcome: LoopOutcome::Done {
                    content: "move J002 to M001".to_string(),
                    steps: 1,
                },
                trace: Trace::new(),
                transcript: Vec::new(),
                usage: TokenUsage::default(),
                elapsed: Duration::from_millis(1500),
            },
            snapshot: PlanningSnapshot {
                cr_table: crate::data::Table::new("cr_table", Vec::new(), Vec::new()),
                available_machines: crate::data::Table::new("available_machines", Vec::new(), Vec::new()),
            },
            documents_indexed: 22,
            audit: None,
        };

        let value: serde_json::Value =
            serde_json::from_str(&format_replan(&replan, OutputFormat::Json))
                .unwrap_or_else(|e| panic!("bad json: {e}"));
        assert_eq!(value["answer"]["raw"], "move J002 to M001");
        assert_eq!(value["exhausted"], false);
        assert_eq!(value["elapsed_ms"], 1500);

        let text = format_replan(&replan, OutputFormat::Text);
        assert!(text.starts_with("move J002 to M001\n"));
        assert!(text.contains("[1 steps, 0 tool calls, 0 tokens, 1.5s]"));
    }
}
