//! Adaptive TDEE bias calibration.
//!
//! Compares the last two weeks of logged weights against the trajectory the plan implies and nudges
//! the persisted bias by a fixed step when the two drift apart. `evaluate` is pure; persisting an
//! adjustment is left to the caller so that targets for the same pass are computed from the new bias.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::calculators::{planned_daily_delta, planned_week_change};
use crate::models::{AdaptiveModel, DailyLog, GoalSettings, MAX_TDEE_BIAS};

pub const MIN_HISTORY_DAYS: usize = 14;
pub const WINDOW_DAYS: usize = 7;
pub const MIN_WEIGHTS_PER_WINDOW: usize = 4;
pub const MIN_CALORIE_DAYS: usize = 5;
pub const CALIBRATION_INTERVAL_DAYS: i64 = 7;
pub const GAP_TOLERANCE_LB: f64 = 0.15;
pub const BIAS_STEP_KCAL: i64 = 75;

/// How many of the most recent logs are loaded for a calibration check.
pub const CALIBRATION_LOOKBACK_LOGS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    NotConfigured,
    InsufficientHistory,
    SparseWeights,
    LowCalorieTracking,
    NotDue,
}

impl SkipReason {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::NotConfigured => "profile or goals not set up",
            Self::InsufficientHistory => "fewer than 14 days of logs",
            Self::SparseWeights => "fewer than 4 weigh-ins in one of the last two weeks",
            Self::LowCalorieTracking => "fewer than 5 days of calories logged this week",
            Self::NotDue => "calibrated within the last 7 days",
        }
    }
}

/// Observed and planned weekly weight change, both in lb/week (positive = gain).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrend {
    pub actual_week_change: f64,
    pub planned_week_change: f64,
}

impl WeeklyTrend {
    #[must_use]
    pub fn gap(&self) -> f64 {
        self.actual_week_change - self.planned_week_change
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasAdjustment {
    pub trend: WeeklyTrend,
    /// Signed step that was requested; the stored bias may move less when clamped.
    pub adjustment: i64,
    pub previous_bias: i64,
    pub new_bias: i64,
    pub calibrated_at: DateTime<Utc>,
}

impl BiasAdjustment {
    #[must_use]
    pub fn notification(&self) -> String {
        let sign = if self.adjustment > 0 { "+" } else { "" };
        format!(
            "Coach Update: Calorie targets adjusted by {sign}{}kcal based on your {:.2}lb actual change vs {:.2}lb goal.",
            self.adjustment, self.trend.actual_week_change, self.trend.planned_week_change
        )
    }

    /// The adaptive model after this adjustment.
    #[must_use]
    pub fn apply_to(&self, model: &AdaptiveModel) -> AdaptiveModel {
        AdaptiveModel {
            tdee_bias: self.new_bias,
            last_calibration_date: Some(self.calibrated_at),
            ..model.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CalibrationOutcome {
    Skipped { reason: SkipReason },
    /// Trend is within tolerance. The model is left untouched so the check runs again next time.
    WithinTolerance { trend: WeeklyTrend },
    Adjusted(BiasAdjustment),
}

impl CalibrationOutcome {
    #[must_use]
    pub fn adjustment(&self) -> Option<&BiasAdjustment> {
        match self {
            Self::Adjusted(adj) => Some(adj),
            _ => None,
        }
    }
}

#[must_use]
pub fn clamp_bias(bias: i64) -> i64 {
    bias.clamp(-MAX_TDEE_BIAS, MAX_TDEE_BIAS)
}

/// Mean of the positive weights in a window, when there are enough of them.
#[allow(clippy::cast_precision_loss)]
fn window_average(window: &[&DailyLog]) -> Option<f64> {
    let weights: Vec<f64> = window.iter().filter_map(|l| l.logged_weight()).collect();
    if weights.len() < MIN_WEIGHTS_PER_WINDOW {
        return None;
    }
    Some(weights.iter().sum::<f64>() / weights.len() as f64)
}

fn is_due(model: &AdaptiveModel, now: DateTime<Utc>) -> bool {
    let last = model.last_calibration_date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    now - last > Duration::days(CALIBRATION_INTERVAL_DAYS)
}

/// Decide whether the bias should move, given recent logs in any order.
///
/// The two windows are the last 7 and the preceding 7 log records by date, not calendar weeks.
#[must_use]
pub fn evaluate(
    logs: &[DailyLog],
    goals: &GoalSettings,
    model: &AdaptiveModel,
    now: DateTime<Utc>,
) -> CalibrationOutcome {
    let skip = |reason: SkipReason| {
        debug!(reason = reason.describe(), "calibration skipped");
        CalibrationOutcome::Skipped { reason }
    };

    if logs.len() < MIN_HISTORY_DAYS {
        return skip(SkipReason::InsufficientHistory);
    }

    let mut sorted: Vec<&DailyLog> = logs.iter().collect();
    sorted.sort_by_key(|l| l.date);
    let n = sorted.len();
    let current = &sorted[n - WINDOW_DAYS..];
    let previous = &sorted[n - 2 * WINDOW_DAYS..n - WINDOW_DAYS];

    let (Some(curr_avg), Some(prev_avg)) = (window_average(current), window_average(previous))
    else {
        return skip(SkipReason::SparseWeights);
    };

    let calorie_days = current.iter().filter(|l| l.calories_logged()).count();
    if calorie_days < MIN_CALORIE_DAYS {
        return skip(SkipReason::LowCalorieTracking);
    }

    if !is_due(model, now) {
        return skip(SkipReason::NotDue);
    }

    let trend = WeeklyTrend {
        actual_week_change: curr_avg - prev_avg,
        planned_week_change: planned_week_change(planned_daily_delta(goals.mode, goals.goal_rate)),
    };
    let gap = trend.gap();

    let adjustment = if gap > GAP_TOLERANCE_LB {
        -BIAS_STEP_KCAL
    } else if gap < -GAP_TOLERANCE_LB {
        BIAS_STEP_KCAL
    } else {
        debug!(gap, "weight trend within tolerance");
        return CalibrationOutcome::WithinTolerance { trend };
    };

    let new_bias = clamp_bias(model.tdee_bias + adjustment);
    info!(
        gap,
        adjustment,
        previous_bias = model.tdee_bias,
        new_bias,
        "adjusting TDEE bias"
    );
    CalibrationOutcome::Adjusted(BiasAdjustment {
        trend,
        adjustment,
        previous_bias: model.tdee_bias,
        new_bias,
        calibrated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityStyle, GoalMode};
    use chrono::{NaiveDate, TimeZone};
    use proptest::prelude::*;

    fn goals(mode: GoalMode, rate: f64) -> GoalSettings {
        GoalSettings {
            mode,
            goal_rate: rate,
            activity_style: ActivityStyle::Standard,
            target_weight_lb: None,
            target_weight_customized: false,
            target_phase_weeks: None,
            start_date: None,
            updated_at: 0,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap()
    }

    /// 14 consecutive days with every day weighed and calories logged.
    /// The first week sits at `prev_weight`, the second at `curr_weight`.
    fn two_weeks(prev_weight: f64, curr_weight: f64) -> Vec<DailyLog> {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        (0..14)
            .map(|i| {
                let mut log = DailyLog::empty(start + Duration::days(i));
                log.weight_lb = Some(if i < 7 { prev_weight } else { curr_weight });
                log.calories = 2000.0;
                log
            })
            .collect()
    }

    #[test]
    fn test_gap_above_tolerance_decreases_bias() {
        // Plan: -1 lb/week. Actual: -0.8 lb/week. Gap +0.2.
        let logs = two_weeks(200.0, 199.2);
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &AdaptiveModel::default(), now());
        let adj = outcome.adjustment().expect("should adjust");
        assert_eq!(adj.adjustment, -75);
        assert_eq!(adj.new_bias, -75);
        assert!((adj.trend.gap() - 0.2).abs() < 1e-9);
        assert_eq!(adj.calibrated_at, now());
    }

    #[test]
    fn test_gap_below_tolerance_increases_bias() {
        // Maintenance, but losing 0.5 lb/week.
        let logs = two_weeks(180.0, 179.5);
        let model = AdaptiveModel {
            tdee_bias: 100,
            last_calibration_date: None,
        };
        let outcome = evaluate(&logs, &goals(GoalMode::Maintenance, 0.0), &model, now());
        assert_eq!(outcome.adjustment().unwrap().new_bias, 175);
    }

    #[test]
    fn test_within_tolerance_leaves_model_alone() {
        let logs = two_weeks(200.0, 199.1);
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &AdaptiveModel::default(), now());
        match outcome {
            CalibrationOutcome::WithinTolerance { trend } => {
                assert!((trend.gap() - 0.1).abs() < 1e-9);
            }
            other => panic!("expected WithinTolerance, got {other:?}"),
        }
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        // Flat weight against a 0.15 lb/week loss plan is a gap of exactly +0.15.
        let logs = two_weeks(200.0, 200.0);
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 0.15), &AdaptiveModel::default(), now());
        assert!(matches!(outcome, CalibrationOutcome::WithinTolerance { .. }));
    }

    #[test]
    fn test_requires_fourteen_logs() {
        let logs = two_weeks(200.0, 195.0)[1..].to_vec();
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &AdaptiveModel::default(), now());
        assert_eq!(
            outcome,
            CalibrationOutcome::Skipped {
                reason: SkipReason::InsufficientHistory
            }
        );
    }

    #[test]
    fn test_requires_four_weights_per_window() {
        let mut logs = two_weeks(200.0, 195.0);
        for log in &mut logs[..4] {
            log.weight_lb = None;
        }
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &AdaptiveModel::default(), now());
        assert_eq!(
            outcome,
            CalibrationOutcome::Skipped {
                reason: SkipReason::SparseWeights
            }
        );

        // Exactly four in the window is enough.
        let mut logs = two_weeks(200.0, 195.0);
        for log in &mut logs[..3] {
            log.weight_lb = Some(0.0);
        }
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &AdaptiveModel::default(), now());
        assert!(outcome.adjustment().is_some());
    }

    #[test]
    fn test_requires_five_calorie_days_in_current_week() {
        let mut logs = two_weeks(200.0, 195.0);
        for log in &mut logs[10..] {
            log.calories = 0.0;
        }
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &AdaptiveModel::default(), now());
        assert_eq!(
            outcome,
            CalibrationOutcome::Skipped {
                reason: SkipReason::LowCalorieTracking
            }
        );
    }

    #[test]
    fn test_not_due_within_seven_days() {
        let logs = two_weeks(200.0, 195.0);
        let model = AdaptiveModel {
            tdee_bias: 0,
            last_calibration_date: Some(now() - Duration::days(7)),
        };
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &model, now());
        assert_eq!(
            outcome,
            CalibrationOutcome::Skipped {
                reason: SkipReason::NotDue
            }
        );

        let model = AdaptiveModel {
            tdee_bias: 0,
            last_calibration_date: Some(now() - Duration::days(7) - Duration::seconds(1)),
        };
        assert!(evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &model, now())
            .adjustment()
            .is_some());
    }

    #[test]
    fn test_windows_use_latest_records_in_any_order() {
        let mut logs = two_weeks(200.0, 199.2);
        logs.reverse();
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &AdaptiveModel::default(), now());
        assert_eq!(outcome.adjustment().unwrap().adjustment, -75);
    }

    #[test]
    fn test_clamped_at_limit_still_reports_step() {
        let logs = two_weeks(200.0, 205.0);
        let model = AdaptiveModel {
            tdee_bias: -500,
            last_calibration_date: None,
        };
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &model, now());
        let adj = outcome.adjustment().unwrap();
        assert_eq!(adj.adjustment, -75);
        assert_eq!(adj.new_bias, -500);
        let updated = adj.apply_to(&model);
        assert_eq!(updated.last_calibration_date, Some(now()));
    }

    #[test]
    fn test_notification_text() {
        let logs = two_weeks(200.0, 199.2);
        let outcome = evaluate(&logs, &goals(GoalMode::FatLoss, 1.0), &AdaptiveModel::default(), now());
        assert_eq!(
            outcome.adjustment().unwrap().notification(),
            "Coach Update: Calorie targets adjusted by -75kcal based on your -0.80lb actual change vs -1.00lb goal."
        );

        let logs = two_weeks(180.0, 179.5);
        let outcome = evaluate(&logs, &goals(GoalMode::Maintenance, 0.0), &AdaptiveModel::default(), now());
        assert!(outcome
            .adjustment()
            .unwrap()
            .notification()
            .contains("adjusted by +75kcal"));
    }

    proptest! {
        #[test]
        fn prop_bias_never_leaves_limits(
            start in -500i64..=500,
            weekly_changes in proptest::collection::vec(-3.0f64..3.0, 1..40),
        ) {
            let goals = goals(GoalMode::FatLoss, 1.0);
            let mut model = AdaptiveModel { tdee_bias: start, last_calibration_date: None };
            let mut clock = now();
            for change in weekly_changes {
                let logs = two_weeks(200.0, 200.0 + change);
                if let CalibrationOutcome::Adjusted(adj) = evaluate(&logs, &goals, &model, clock) {
                    model = adj.apply_to(&model);
                }
                prop_assert!((-MAX_TDEE_BIAS..=MAX_TDEE_BIAS).contains(&model.tdee_bias));
                clock += Duration::days(8);
            }
        }
    }
}
