//! Critical-ratio prioritisation and machine availability.
//!
//! CR = hours until due / remaining processing hours. Lower CR means the job
//! is closer to missing its due date relative to the work left, so the table
//! is sorted ascending and truncated to the next `n` jobs.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::{Dataset, Table};
use crate::error::DataError;

/// Default number of jobs in the CR table.
pub const DEFAULT_TOP_JOBS: usize = 8;

/// Columns of the CR table, in output order.
pub const CR_COLUMNS: [&str; 9] = [
    "job_id",
    "priority",
    "priority_weight",
    "due_date",
    "remaining_proc_min",
    "CR",
    "avg_supplier_risk",
    "avg_lead_days",
    "part_count",
];

/// Columns of the available-machines table.
pub const MACHINE_COLUMNS: [&str; 3] = ["machine_id", "machine_type", "speed_factor"];

/// Aggregated supplier exposure for one job.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SupplyRisk {
    /// Mean supplier risk rating over the job's parts.
    pub avg_supplier_risk: f64,
    /// Mean supplier lead time in days.
    pub avg_lead_days: f64,
    /// Distinct parts required.
    pub part_count: usize,
}

/// Deterministic context computed once per run and closed over by tools.
#[derive(Debug, Clone)]
pub struct PlanningSnapshot {
    /// Next jobs ordered by ascending CR.
    pub cr_table: Table,
    /// Machines currently `UP`.
    pub available_machines: Table,
}

impl PlanningSnapshot {
    /// Computes the snapshot from the loaded dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] on missing columns or unparseable cells.
    pub fn compute(dataset: &Dataset, now: DateTime<Utc>, top_jobs: usize) -> Result<Self, DataError> {
        let remaining = remaining_processing(&dataset.operations)?;
        let risk = supply_risk(&dataset.job_parts, &dataset.parts)?;
        Ok(Self {
            cr_table: cr_table(&dataset.jobs, &remaining, &risk, now, top_jobs)?,
            available_machines: available_machines(&dataset.machines)?,
        })
    }
}

/// Remaining processing minutes per job: Σ(process + setup) over operations.
///
/// # Errors
///
/// Returns [`DataError`] if a required column is absent or a time is not
/// numeric.
pub fn remaining_processing(operations: &Table) -> Result<HashMap<String, f64>, DataError> {
    let job_col = operations.require_column("job_id")?;
    let process_col = operations.require_column("process_time_minutes")?;
    let setup_col = operations.require_column("setup_time_minutes")?;

    let mut remaining: HashMap<String, f64> = HashMap::new();
    for (row, cells) in operations.rows().iter().enumerate() {
        let process = parse_number(operations, row, process_col, cells)?.unwrap_or(0.0);
        let setup = parse_number(operations, row, setup_col, cells)?.unwrap_or(0.0);
        *remaining.entry(cells[job_col].clone()).or_default() += process + setup;
    }
    Ok(remaining)
}

/// Supplier risk per job, joining `job_parts` to `parts` on `part_id`.
///
/// Parts missing from the parts table still count towards `part_count`
/// but contribute no rating or lead time. Jobs without any parts are absent
/// from the map and read as [`SupplyRisk::default`].
///
/// # Errors
///
/// Returns [`DataError`] if a required column is absent or a rating is not
/// numeric.
pub fn supply_risk(job_parts: &Table, parts: &Table) -> Result<HashMap<String, SupplyRisk>, DataError> {
    let part_col = parts.require_column("part_id")?;
    let risk_col = parts.require_column("supplier_risk_rating")?;
    let lead_col = parts.require_column("lead_time_mean_days")?;

    let mut by_part: HashMap<&str, (Option<f64>, Option<f64>)> = HashMap::new();
    for (row, cells) in parts.rows().iter().enumerate() {
        let risk = parse_number(parts, row, risk_col, cells)?;
        let lead = parse_number(parts, row, lead_col, cells)?;
        by_part.entry(cells[part_col].as_str()).or_insert((risk, lead));
    }

    let jp_job = job_parts.require_column("job_id")?;
    let jp_part = job_parts.require_column("part_id")?;

    #[derive(Default)]
    struct Acc<'a> {
        risk_sum: f64,
        risk_n: usize,
        lead_sum: f64,
        lead_n: usize,
        parts: BTreeSet<&'a str>,
    }

    let mut acc: HashMap<&str, Acc<'_>> = HashMap::new();
    for cells in job_parts.rows() {
        let part = cells[jp_part].as_str();
        let entry = acc.entry(cells[jp_job].as_str()).or_default();
        entry.parts.insert(part);
        if let Some(&(risk, lead)) = by_part.get(part) {
            if let Some(r) = risk {
                entry.risk_sum += r;
                entry.risk_n += 1;
            }
            if let Some(l) = lead {
                entry.lead_sum += l;
                entry.lead_n += 1;
            }
        }
    }

    Ok(acc
        .into_iter()
        .map(|(job, a)| {
            (
                job.to_string(),
                SupplyRisk {
                    avg_supplier_risk: mean(a.risk_sum, a.risk_n),
                    avg_lead_days: mean(a.lead_sum, a.lead_n),
                    part_count: a.parts.len(),
                },
            )
        })
        .collect())
}

/// Builds the CR table: jobs with known remaining work, sorted by ascending
/// CR, truncated to `top_jobs`.
///
/// # Errors
///
/// Returns [`DataError`] if a required column is absent or a due date does
/// not parse.
pub fn cr_table(
    jobs: &Table,
    remaining: &HashMap<String, f64>,
    risk: &HashMap<String, SupplyRisk>,
    now: DateTime<Utc>,
    top_jobs: usize,
) -> Result<Table, DataError> {
    let job_col = jobs.require_column("job_id")?;
    let priority_col = jobs.require_column("priority")?;
    let weight_col = jobs.require_column("priority_weight")?;
    let due_col = jobs.require_column("due_date")?;

    let mut scored: Vec<(f64, Vec<String>)> = Vec::new();
    for (row, cells) in jobs.rows().iter().enumerate() {
        let job_id = &cells[job_col];
        let Some(&remaining_min) = remaining.get(job_id) else {
            continue;
        };
        let due = parse_due_date(&cells[due_col]).ok_or_else(|| DataError::InvalidValue {
            table: jobs.name().to_string(),
            row,
            column: "due_date".to_string(),
            value: cells[due_col].clone(),
        })?;

        #[allow(clippy::cast_precision_loss)]
        let hours_until_due = (due - now).num_seconds() as f64 / 3600.0;
        let cr = hours_until_due / (remaining_min / 60.0);
        let supply = risk.get(job_id).copied().unwrap_or_default();

        scored.push((
            cr,
            vec![
                job_id.clone(),
                cells[priority_col].clone(),
                cells[weight_col].clone(),
                cells[due_col].clone(),
                remaining_min.to_string(),
                format!("{cr:.3}"),
                supply.avg_supplier_risk.to_string(),
                supply.avg_lead_days.to_string(),
                supply.part_count.to_string(),
            ],
        ));
    }

    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.truncate(top_jobs);

    Ok(Table::new(
        "cr_table",
        CR_COLUMNS.iter().map(ToString::to_string).collect(),
        scored.into_iter().map(|(_, row)| row).collect(),
    ))
}

/// Machines whose `status` is exactly `UP`.
///
/// # Errors
///
/// Returns [`DataError::MissingColumn`] if a projected column is absent.
pub fn available_machines(machines: &Table) -> Result<Table, DataError> {
    let status_col = machines.require_column("status")?;
    let projected = MACHINE_COLUMNS
        .iter()
        .map(|c| machines.require_column(c))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = machines
        .rows()
        .iter()
        .filter(|cells| cells[status_col] == "UP")
        .map(|cells| projected.iter().map(|&i| cells[i].clone()).collect())
        .collect();

    Ok(Table::new(
        "available_machines",
        MACHINE_COLUMNS.iter().map(ToString::to_string).collect(),
        rows,
    ))
}

/// Parses a due date as RFC 3339, a naive timestamp, or a bare date
/// (midnight UTC).
#[must_use]
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses a numeric cell; empty cells are `None`.
fn parse_number(table: &Table, row: usize, col: usize, cells: &[String]) -> Result<Option<f64>, DataError> {
    let raw = cells[col].trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| DataError::InvalidValue {
            table: table.name().to_string(),
            row,
            column: table.columns()[col].clone(),
            value: raw.to_string(),
        })
}

#[allow(clippy::cast_precision_loss)]
fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 { 0.0 } else { sum / n as f64 }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table(name: &str, csv: &str) -> Table {
        Table::from_reader(name, csv.as_bytes()).unwrap_or_else(|e| panic!("{name}: {e}"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2029, 12, 31, 0, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("bad timestamp"))
    }

    #[test]
    fn test_cr_table_orders_by_lowest_ratio() {
        let jobs = table(
            "jobs",
            "job_id,priority,priority_weight,due_date\n\
             J1,1,1.0,2030-01-02\n\
             J2,2,1.0,2030-01-01\n",
        );
        let ops = table(
            "operations",
            "job_id,process_time_minutes,setup_time_minutes\nJ1,60,0\nJ2,120,0\n",
        );
        let remaining = remaining_processing(&ops).unwrap_or_else(|e| panic!("{e}"));
        let cr = cr_table(&jobs, &remaining, &HashMap::new(), now(), 2)
            .unwrap_or_else(|e| panic!("{e}"));

        let ids: Vec<_> = (0..cr.len()).filter_map(|r| cr.value(r, "job_id")).collect();
        assert_eq!(ids, vec!["J2", "J1"]);
        // J2: 24h until due / 2h remaining
        assert_eq!(cr.value(0, "CR"), Some("12.000"));
        assert_eq!(cr.value(0, "remaining_proc_min"), Some("120"));
        assert_eq!(cr.value(0, "part_count"), Some("0"));
    }

    #[test]
    fn test_cr_table_drops_jobs_without_operations_and_truncates() {
        let jobs = table(
            "jobs",
            "job_id,priority,priority_weight,due_date\n\
             J1,1,1.0,2030-01-05\n\
             J2,1,1.0,2030-01-03\n\
             J3,1,1.0,2030-01-01\n",
        );
        let ops = table(
            "operations",
            "job_id,process_time_minutes,setup_time_minutes\nJ1,60,0\nJ2,60,30\n",
        );
        let remaining = remaining_processing(&ops).unwrap_or_else(|e| panic!("{e}"));
        let cr = cr_table(&jobs, &remaining, &HashMap::new(), now(), 1)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cr.len(), 1);
        assert_eq!(cr.value(0, "job_id"), Some("J2"));
        assert_eq!(cr.value(0, "remaining_proc_min"), Some("90"));
    }

    #[test]
    fn test_cr_table_rejects_bad_due_date() {
        let jobs = table(
            "jobs",
            "job_id,priority,priority_weight,due_date\nJ1,1,1.0,next week\n",
        );
        let remaining = HashMap::from([("J1".to_string(), 60.0)]);
        let err = cr_table(&jobs, &remaining, &HashMap::new(), now(), 8).err();
        assert!(matches!(err, Some(DataError::InvalidValue { row: 0, .. })));
    }

    #[test]
    fn test_supply_risk_means_and_distinct_parts() {
        let parts = table(
            "parts_suppliers",
            "part_id,supplier_risk_rating,lead_time_mean_days\nP1,2,10\nP2,4,20\n",
        );
        let job_parts = table(
            "job_parts",
            "job_id,part_id\nJ1,P1\nJ1,P2\nJ1,P2\nJ2,P9\n",
        );
        let risk = supply_risk(&job_parts, &parts).unwrap_or_else(|e| panic!("{e}"));

        let j1 = risk["J1"];
        assert_eq!(j1.part_count, 2);
        // P2 appears twice in the mapping, so the mean is over three rows.
        assert!((j1.avg_supplier_risk - 10.0 / 3.0).abs() < 1e-9);
        assert!((j1.avg_lead_days - 50.0 / 3.0).abs() < 1e-9);

        let j2 = risk["J2"];
        assert_eq!(j2.part_count, 1);
        assert!(j2.avg_supplier_risk.abs() < f64::EPSILON);
    }

    #[test]
    fn test_available_machines_filters_up() {
        let machines = table(
            "machines",
            "machine_id,machine_type,status,speed_factor\n\
             M001,CNC,UP,1.0\n\
             M004,CNC,DOWN,1.2\n\
             M002,LATHE,UP,0.9\n",
        );
        let available = available_machines(&machines).unwrap_or_else(|e| panic!("{e}"));
        let csv = available.to_csv().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            csv,
            "machine_id,machine_type,speed_factor\nM001,CNC,1.0\nM002,LATHE,0.9\n"
        );
    }

    #[test]
    fn test_parse_due_date_formats() {
        assert!(parse_due_date("2030-01-01").is_some());
        assert!(parse_due_date("2030-01-01 08:30:00").is_some());
        assert!(parse_due_date("2030-01-01T08:30:00Z").is_some());
        assert!(parse_due_date("01/01/2030").is_none());
    }
}
