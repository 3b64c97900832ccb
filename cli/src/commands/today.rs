use anyhow::{Result, bail};
use chrono::{Local, Timelike, Utc};

use pace_core::calibration::CalibrationOutcome;
use pace_core::service::{CoachService, DayOverview};

use super::helpers::{format_delta, parse_date};
use super::log::describe_log;

pub(crate) fn cmd_today(
    svc: &CoachService,
    date: Option<String>,
    hour: Option<u32>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let hour = match hour {
        Some(h) if h > 23 => bail!("Hour must be between 0 and 23"),
        Some(h) => h,
        None => Local::now().hour(),
    };

    let overview = svc.day_overview(date, hour, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        print_overview(&overview);
    }
    Ok(())
}

/// Human-readable summary of a calibration check.
pub(crate) fn describe_calibration(outcome: &CalibrationOutcome) -> String {
    match outcome {
        CalibrationOutcome::Skipped { reason } => format!("not run ({})", reason.describe()),
        CalibrationOutcome::WithinTolerance { trend } => format!(
            "on track ({:+.2} lb/week vs {:+.2} planned)",
            trend.actual_week_change, trend.planned_week_change
        ),
        CalibrationOutcome::Adjusted(adj) => format!(
            "bias {} -> {} kcal ({:+} kcal)",
            adj.previous_bias, adj.new_bias, adj.adjustment
        ),
    }
}

fn print_overview(o: &DayOverview) {
    if let Some(ref note) = o.notification {
        println!("{note}\n");
    }

    println!("=== {} ===\n", o.date);
    println!("  {}\n", o.coach_message);

    println!("  Logged:      {}", describe_log(&o.log));
    println!(
        "  Target:      {} kcal  (TDEE {:.0} {:+} bias)",
        o.calorie_target, o.tdee_base, o.tdee_bias
    );
    println!(
        "  Movement:    {} / {} steps, {} / {} AZM",
        o.log.steps, o.activity_targets.steps, o.log.azm, o.activity_targets.azm
    );
    println!(
        "  Plan:        {} kcal ({})",
        format_delta(o.achieved_delta),
        o.status
    );
    println!(
        "  Burn:        ~{} kcal ({}-{})",
        o.burn_estimate, o.burn_range.0, o.burn_range.1
    );
    println!(
        "  Workouts:    {} / {} this week",
        o.workouts_this_week, o.weekly_workout_goal
    );
    println!("  Weight ref:  {:.1} lb", o.reference_weight_lb);
    if o.goal_reached {
        println!("\n  Goal weight reached. Time to pick a new phase with `pace goal set`.");
    }
    println!("\n  Calibration: {}", describe_calibration(&o.calibration));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pace_core::calibration::{BiasAdjustment, SkipReason, WeeklyTrend};

    #[test]
    fn test_describe_skipped() {
        let outcome = CalibrationOutcome::Skipped {
            reason: SkipReason::NotDue,
        };
        assert_eq!(
            describe_calibration(&outcome),
            "not run (calibrated within the last 7 days)"
        );
    }

    #[test]
    fn test_describe_within_tolerance() {
        let outcome = CalibrationOutcome::WithinTolerance {
            trend: WeeklyTrend {
                actual_week_change: -0.9,
                planned_week_change: -1.0,
            },
        };
        assert_eq!(
            describe_calibration(&outcome),
            "on track (-0.90 lb/week vs -1.00 planned)"
        );
    }

    #[test]
    fn test_describe_adjusted() {
        let outcome = CalibrationOutcome::Adjusted(BiasAdjustment {
            trend: WeeklyTrend {
                actual_week_change: -0.2,
                planned_week_change: -1.0,
            },
            adjustment: -75,
            previous_bias: 0,
            new_bias: -75,
            calibrated_at: DateTime::<Utc>::UNIX_EPOCH,
        });
        assert_eq!(describe_calibration(&outcome), "bias 0 -> -75 kcal (-75 kcal)");
    }
}
