use anyhow::Result;
use chrono::Utc;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pace_core::service::{CoachService, DayPoint};

use super::helpers::{format_delta, format_optional_weight, no_neg_zero};
use super::today::describe_calibration;

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Calories")]
    calories: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Steps")]
    steps: String,
    #[tabled(rename = "AZM")]
    azm: String,
    #[tabled(rename = "Workout")]
    workout: String,
    #[tabled(rename = "Delta")]
    delta: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn day_row(d: &DayPoint) -> DayRow {
    let cal = no_neg_zero(d.calories);
    DayRow {
        date: d.date.to_string(),
        weight: format_optional_weight(d.weight_lb),
        calories: format!("{cal:.0}"),
        target: d.calorie_target.to_string(),
        steps: d.steps.to_string(),
        azm: d.azm.to_string(),
        workout: (if d.workout_done { "yes" } else { "" }).to_string(),
        delta: format_delta(d.achieved_delta),
        status: d.status.to_string(),
    }
}

fn print_days(days: &[DayPoint]) {
    let rows: Vec<DayRow> = days.iter().map(day_row).collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..8)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_history(svc: &CoachService, days: u32, json: bool) -> Result<()> {
    let points = svc.history(Some(i64::from(days)))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    if points.is_empty() {
        eprintln!("No logs yet. Use `pace log` to record a day.");
        process::exit(2);
    }

    print_days(&points);
    Ok(())
}

pub(crate) fn cmd_progress(svc: &CoachService, json: bool) -> Result<()> {
    let report = svc.progress(Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(ref note) = report.notification {
        println!("{note}\n");
    }

    println!("=== Progress ===\n");
    println!(
        "  Weekly average:  {} lb",
        format_optional_weight(report.weekly_average_weight_lb)
    );
    println!("  Starting weight: {:.1} lb", report.starting_weight_lb);
    if let Some(target) = report.target_weight_lb {
        println!("  Target weight:   {target:.1} lb");
    }
    println!("  TDEE bias:       {:+} kcal", report.tdee_bias);
    match report.last_calibration_date {
        Some(at) => println!("  Last calibrated: {}", at.format("%Y-%m-%d")),
        None => println!("  Last calibrated: never"),
    }
    println!("  Calibration:     {}\n", describe_calibration(&report.calibration));

    if report.days.is_empty() {
        eprintln!("No logs yet. Use `pace log` to record a day.");
    } else {
        print_days(&report.days);
    }
    Ok(())
}
