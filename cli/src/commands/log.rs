use anyhow::Result;
use chrono::{Local, NaiveDate};

use pace_core::models::{DailyLog, UpdateDailyLog};
use pace_core::service::CoachService;

use super::helpers::{json_error, parse_date, weight_to_lb};

/// Fields supplied on the command line for one day's log.
pub(crate) struct LogFields {
    pub weight: Option<f64>,
    pub unit: String,
    pub calories: Option<f64>,
    pub steps: Option<u32>,
    pub azm: Option<u32>,
    pub workout: Option<bool>,
}

impl LogFields {
    pub(crate) fn to_update(&self) -> Result<UpdateDailyLog> {
        Ok(UpdateDailyLog {
            weight_lb: self
                .weight
                .map(|w| weight_to_lb(w, &self.unit))
                .transpose()?,
            calories: self.calories,
            steps: self.steps,
            azm: self.azm,
            workout_done: self.workout,
        })
    }
}

pub(crate) fn cmd_log(
    svc: &CoachService,
    date: Option<String>,
    fields: &LogFields,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let update = fields.to_update()?;
    let log = svc.log_day(date, &update, Local::now().date_naive())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
    } else {
        println!("Logged {}: {}", log.date, describe_log(&log));
    }
    Ok(())
}

pub(crate) fn cmd_delete(svc: &CoachService, date: &str, json: bool) -> Result<()> {
    let date: NaiveDate = parse_date(Some(date.to_string()))?;
    let deleted = svc.delete_log(date)?;

    if json {
        if deleted {
            println!("{}", serde_json::json!({ "deleted": date }));
        } else {
            println!("{}", json_error(&format!("No log for {date}")));
        }
    } else if deleted {
        println!("Deleted log for {date}");
    } else {
        eprintln!("No log for {date}");
    }
    Ok(())
}

/// One-line summary of the logged fields of a day.
pub(crate) fn describe_log(log: &DailyLog) -> String {
    let mut parts = Vec::new();
    if let Some(w) = log.logged_weight() {
        parts.push(format!("{w:.1} lb"));
    }
    if log.calories_logged() {
        parts.push(format!("{:.0} kcal", log.calories));
    }
    if log.steps_logged() {
        parts.push(format!("{} steps", log.steps));
    }
    if log.azm_logged() {
        parts.push(format!("{} AZM", log.azm));
    }
    if log.workout_done {
        parts.push("workout".to_string());
    }
    if parts.is_empty() {
        "nothing logged".to_string()
    } else {
        parts.join(", ")
    }
}
