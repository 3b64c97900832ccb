use std::collections::BTreeMap;
use std::io::Read;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::db::Database;
use crate::models::{DailyLog, UpdateDailyLog, validate_daily_log};

/// A single row parsed from a daily metrics CSV. Empty cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub line: usize,
    pub date: String,
    pub weight_lb: Option<f64>,
    pub calories: Option<f64>,
    pub steps: Option<u32>,
    pub azm: Option<u32>,
    pub workout_done: Option<bool>,
}

/// Summary of what a CSV import would do / did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CsvImportSummary {
    pub rows_parsed: usize,
    pub logs_created: usize,
    pub logs_updated: usize,
    pub dates_spanned: usize,
    pub dry_run: bool,
}

/// Parse a daily metrics CSV from any reader.
///
/// Expected header: `Date,Weight,Calories,Steps,AZM,Workout`.
/// Only `Date` is required; other columns may be missing or empty.
pub fn parse_daily_csv<R: Read>(reader: R) -> Result<Vec<CsvRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let Some(idx_date) = col("Date") else {
        bail!("Missing required column: Date");
    };
    let idx_weight = col("Weight").or_else(|| col("Weight (lb)"));
    let idx_cal = col("Calories");
    let idx_steps = col("Steps");
    let idx_azm = col("AZM").or_else(|| col("Active Zone Minutes"));
    let idx_workout = col("Workout");

    let mut rows = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let line = i + 2;
        let record = result.with_context(|| format!("Failed to parse CSV row {line}"))?;

        let date = record.get(idx_date).unwrap_or("").trim().to_string();
        if date.is_empty() {
            continue;
        }

        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        rows.push(CsvRow {
            line,
            date,
            weight_lb: parse_number(cell(idx_weight), "Weight", line)?,
            calories: parse_number(cell(idx_cal), "Calories", line)?,
            steps: parse_count(cell(idx_steps), "Steps", line)?,
            azm: parse_count(cell(idx_azm), "AZM", line)?,
            workout_done: cell(idx_workout)
                .map(|v| parse_flag(v).with_context(|| format!("Row {line}: invalid Workout")))
                .transpose()?,
        });
    }

    Ok(rows)
}

fn parse_number(value: Option<&str>, column: &str, line: usize) -> Result<Option<f64>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let n: f64 = raw
        .replace(',', "")
        .parse()
        .with_context(|| format!("Row {line}: invalid {column} '{raw}'"))?;
    if !n.is_finite() || n < 0.0 {
        bail!("Row {line}: {column} must be a non-negative number");
    }
    Ok(Some(n))
}

#[allow(clippy::cast_sign_loss)]
fn parse_count(value: Option<&str>, column: &str, line: usize) -> Result<Option<u32>> {
    Ok(parse_number(value, column, line)?.map(|n| n.round().min(f64::from(u32::MAX)) as u32))
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "y" | "yes" | "true" | "x" | "done" => Ok(true),
        "0" | "n" | "no" | "false" | "-" => Ok(false),
        other => bail!("expected yes/no, got '{other}'"),
    }
}

/// Normalize a CSV date to a calendar date.
///
/// Accepts `YYYY-MM-DD`, `M/D/YYYY`, then `D/M/YYYY`.
pub fn normalize_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| anyhow::anyhow!("Cannot parse date: '{raw}'"))
}

impl CsvRow {
    #[must_use]
    pub fn as_update(&self) -> UpdateDailyLog {
        UpdateDailyLog {
            weight_lb: self.weight_lb,
            calories: self.calories,
            steps: self.steps,
            azm: self.azm,
            workout_done: self.workout_done,
        }
    }
}

/// Merge parsed rows into the stored logs. Columns left empty keep their stored value.
///
/// Every row is merged and validated before anything is written, so a bad row
/// leaves the database untouched. When `dry_run` is true, nothing is written.
pub fn import_daily_logs(db: &Database, rows: &[CsvRow], dry_run: bool) -> Result<CsvImportSummary> {
    let mut summary = CsvImportSummary {
        rows_parsed: rows.len(),
        dry_run,
        ..CsvImportSummary::default()
    };
    let mut merged: BTreeMap<NaiveDate, DailyLog> = BTreeMap::new();

    for row in rows {
        let date =
            normalize_date(&row.date).with_context(|| format!("Row {}: bad date", row.line))?;

        let (mut log, is_update) = match merged.remove(&date) {
            Some(pending) => (pending, true),
            None => match db.get_daily_log(date)? {
                Some(existing) => (existing, true),
                None => (DailyLog::empty(date), false),
            },
        };
        log.apply(&row.as_update());
        validate_daily_log(&log).with_context(|| format!("Row {}", row.line))?;
        merged.insert(date, log);

        if is_update {
            summary.logs_updated += 1;
        } else {
            summary.logs_created += 1;
        }
    }

    if !dry_run {
        let logs: Vec<DailyLog> = merged.values().cloned().collect();
        db.upsert_daily_logs(&logs)?;
    }

    summary.dates_spanned = merged.len();
    info!(
        rows = summary.rows_parsed,
        created = summary.logs_created,
        updated = summary.logs_updated,
        dry_run,
        "imported daily logs from CSV"
    );
    Ok(summary)
}
