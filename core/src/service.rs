use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::adherence::{AdherenceInput, PlanStatus, plan_achieved_delta, plan_status};
use crate::calculators::{
    ActivityTargets, activity_targets, bmr, burn_range, calorie_target, estimate_burn,
    planned_daily_delta, reference_weight, stride_meters, tdee_base, weekly_workout_goal,
};
use crate::calibration::{
    self, BiasAdjustment, CALIBRATION_LOOKBACK_LOGS, CalibrationOutcome, SkipReason, WINDOW_DAYS,
};
use crate::coach::{CoachState, CoachTargets, matching_rule};
use crate::csv_import::{self, CsvImportSummary};
use crate::db::Database;
use crate::models::{
    AdaptiveModel, DailyLog, ExportData, GoalMode, GoalSettings, ImportSummary, InvalidInput,
    UpdateDailyLog, UserProfile, validate_bias, validate_daily_log, validate_export_data, validate_goal_settings,
    validate_profile,
};

/// How far back a daily log may be edited interactively.
pub const EDIT_WINDOW_DAYS: i64 = 7;

/// Calendar days searched for weigh-ins when computing a day's reference weight.
pub const REFERENCE_LOOKBACK_DAYS: i64 = 60;

/// Everything the coach knows about one day, computed after the calibration check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOverview {
    pub date: NaiveDate,
    pub log: DailyLog,
    pub logged: bool,
    pub reference_weight_lb: f64,
    pub bmr: f64,
    pub tdee_base: f64,
    pub tdee_bias: i64,
    pub planned_daily_delta: f64,
    pub calorie_target: i64,
    pub activity_targets: ActivityTargets,
    pub achieved_delta: Option<f64>,
    pub status: PlanStatus,
    pub coach_message: String,
    pub coach_rule: &'static str,
    pub burn_estimate: i64,
    pub burn_range: (i64, i64),
    pub workouts_this_week: u32,
    pub weekly_workout_goal: u32,
    pub goal_reached: bool,
    pub calibration: CalibrationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

/// One row of history: a stored day with its target and adherence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPoint {
    pub date: NaiveDate,
    pub weight_lb: Option<f64>,
    pub calories: f64,
    pub steps: u32,
    pub azm: u32,
    pub workout_done: bool,
    pub calorie_target: i64,
    pub achieved_delta: Option<f64>,
    pub status: PlanStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub weekly_average_weight_lb: Option<f64>,
    pub starting_weight_lb: f64,
    pub target_weight_lb: Option<f64>,
    pub tdee_bias: i64,
    pub last_calibration_date: Option<DateTime<Utc>>,
    pub calibration: CalibrationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
    pub days: Vec<DayPoint>,
}

/// Sunday that starts the week containing `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Mean of the positive weights among the most recent `n` logs (newest first input).
#[allow(clippy::cast_precision_loss)]
fn recent_average_weight(logs_newest_first: &[DailyLog], n: usize) -> Option<f64> {
    let weights: Vec<f64> = logs_newest_first
        .iter()
        .take(n)
        .filter_map(DailyLog::logged_weight)
        .collect();
    if weights.is_empty() {
        None
    } else {
        Some(weights.iter().sum::<f64>() / weights.len() as f64)
    }
}

pub struct CoachService {
    db: Database,
}

impl CoachService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Profile & goals ---

    pub fn get_profile(&self) -> Result<Option<UserProfile>> {
        self.db.get_profile()
    }

    pub fn require_profile(&self) -> Result<UserProfile> {
        self.db
            .get_profile()?
            .context("No profile found. Run `pace setup` first.")
    }

    pub fn set_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        validate_profile(profile)?;
        let saved = self.db.set_profile(profile)?;
        // Suggested target weights follow the starting weight until customised.
        if let Some(goals) = self.db.get_goals()? {
            if !goals.target_weight_customized {
                self.db
                    .set_goals(&goals.with_mode_defaults(saved.starting_weight_lb))?;
            }
        }
        Ok(saved)
    }

    pub fn get_goals(&self) -> Result<Option<GoalSettings>> {
        self.db.get_goals()
    }

    pub fn require_goals(&self) -> Result<GoalSettings> {
        self.db
            .get_goals()?
            .context("No goals set. Run `pace setup` or `pace goal set` first.")
    }

    /// Replace the active goals. Mode defaults are filled in from the profile's starting weight.
    pub fn set_goals(&self, goals: &GoalSettings) -> Result<GoalSettings> {
        validate_goal_settings(goals)?;
        let profile = self.require_profile()?;
        let goals = goals.clone().with_mode_defaults(profile.starting_weight_lb);
        self.db.set_goals(&goals)
    }

    /// Onboarding: save profile and goals together and start the goal phase on `today`.
    pub fn setup(
        &self,
        profile: &UserProfile,
        goals: &GoalSettings,
        today: NaiveDate,
    ) -> Result<(UserProfile, GoalSettings)> {
        validate_profile(profile)?;
        validate_goal_settings(goals)?;
        let profile = self.db.set_profile(profile)?;
        let mut goals = goals.clone();
        goals.start_date.get_or_insert(today);
        let goals = self.set_goals(&goals)?;
        info!(mode = %goals.mode, style = %goals.activity_style, "profile set up");
        Ok((profile, goals))
    }

    // --- Adaptive model ---

    pub fn get_adaptive_model(&self) -> Result<AdaptiveModel> {
        self.db.get_adaptive_model()
    }

    /// Manual override of the bias. The calibration clock is left alone.
    pub fn set_bias(&self, tdee_bias: i64) -> Result<AdaptiveModel> {
        validate_bias(tdee_bias)?;
        let mut model = self.db.get_adaptive_model()?;
        model.tdee_bias = tdee_bias;
        self.db.set_adaptive_model(&model)?;
        info!(tdee_bias, "TDEE bias set manually");
        Ok(model)
    }

    /// Run one calibration check and persist any adjustment before returning.
    pub fn calibrate(&self, now: DateTime<Utc>) -> Result<CalibrationOutcome> {
        let Some(goals) = self.db.get_goals()? else {
            return Ok(CalibrationOutcome::Skipped {
                reason: SkipReason::NotConfigured,
            });
        };
        if self.db.get_profile()?.is_none() {
            return Ok(CalibrationOutcome::Skipped {
                reason: SkipReason::NotConfigured,
            });
        }
        let model = self.db.get_adaptive_model()?;
        let logs = self.db.get_daily_logs(Some(CALIBRATION_LOOKBACK_LOGS))?;

        let outcome = calibration::evaluate(&logs, &goals, &model, now);
        if let CalibrationOutcome::Adjusted(adj) = &outcome {
            self.db
                .set_adaptive_model(&adj.apply_to(&model))
                .context("Failed to save calibrated bias")?;
        }
        Ok(outcome)
    }

    // --- Daily logs ---

    pub fn get_log(&self, date: NaiveDate) -> Result<Option<DailyLog>> {
        self.db.get_daily_log(date)
    }

    pub fn get_logs(&self, limit: Option<i64>) -> Result<Vec<DailyLog>> {
        self.db.get_daily_logs(limit)
    }

    /// Interactive edits accept `today` and up to `EDIT_WINDOW_DAYS` back, never the future.
    pub fn check_edit_window(date: NaiveDate, today: NaiveDate) -> Result<()> {
        if date > today {
            bail!("Cannot log future dates ({date})");
        }
        if today - date > Duration::days(EDIT_WINDOW_DAYS) {
            bail!("Logs can only be edited up to {EDIT_WINDOW_DAYS} days back ({date})");
        }
        Ok(())
    }

    /// Merge `update` onto the stored record for `date` and write the whole record back.
    ///
    /// Rejections of the input itself come back as [`InvalidInput`].
    pub fn log_day(
        &self,
        date: NaiveDate,
        update: &UpdateDailyLog,
        today: NaiveDate,
    ) -> Result<DailyLog> {
        Self::check_edit_window(date, today).map_err(InvalidInput::wrap)?;
        if update.is_empty() {
            return Err(InvalidInput(
                "Nothing to log. Pass at least one of weight, calories, steps, AZM, or workout."
                    .to_string(),
            )
            .into());
        }
        let mut log = self
            .db
            .get_daily_log(date)?
            .unwrap_or_else(|| DailyLog::empty(date));
        log.apply(update);
        validate_daily_log(&log).map_err(InvalidInput::wrap)?;
        self.db.upsert_daily_log(&log)
    }

    pub fn delete_log(&self, date: NaiveDate) -> Result<bool> {
        self.db.delete_daily_log(date)
    }

    // --- Coaching ---

    fn targets_for(
        profile: &UserProfile,
        goals: &GoalSettings,
        tdee_bias: i64,
        weight_lb: f64,
    ) -> (f64, f64, i64) {
        let bmr = bmr(profile, weight_lb);
        let base = tdee_base(bmr, goals.activity_style);
        let target = calorie_target(base, tdee_bias, goals.mode, goals.goal_rate);
        (bmr, base, target)
    }

    fn adherence_for(log: &DailyLog, goals: &GoalSettings, target: i64) -> Option<f64> {
        let movement = activity_targets(goals.activity_style);
        #[allow(clippy::cast_precision_loss)]
        let calorie_target = target as f64;
        plan_achieved_delta(&AdherenceInput {
            mode: goals.mode,
            planned_daily_delta: planned_daily_delta(goals.mode, goals.goal_rate),
            calories_eaten: log.calories,
            calorie_target,
            steps: f64::from(log.steps),
            steps_target: f64::from(movement.steps),
            azm: f64::from(log.azm),
            azm_target: f64::from(movement.azm),
        })
    }

    /// A full pass for one day: calibrate first, then targets, adherence, and the coach message.
    pub fn day_overview(
        &self,
        date: NaiveDate,
        current_hour: u32,
        now: DateTime<Utc>,
    ) -> Result<DayOverview> {
        let profile = self.require_profile()?;
        let goals = self.require_goals()?;

        let calibration = self.calibrate(now)?;
        let model = self.db.get_adaptive_model()?;

        let stored = self.db.get_daily_log(date)?;
        let logged = stored.is_some();
        let log = stored.unwrap_or_else(|| DailyLog::empty(date));

        let earlier = self.db.get_daily_logs_between(
            date - Duration::days(REFERENCE_LOOKBACK_DAYS),
            date - Duration::days(1),
        )?;
        let reference_weight_lb = reference_weight(&earlier, date, profile.starting_weight_lb);

        let (bmr, tdee_base, calorie_target) =
            Self::targets_for(&profile, &goals, model.tdee_bias, reference_weight_lb);
        let movement = activity_targets(goals.activity_style);
        let achieved_delta = Self::adherence_for(&log, &goals, calorie_target);

        #[allow(clippy::cast_precision_loss)]
        let coach_targets = CoachTargets {
            calories: calorie_target as f64,
            steps: f64::from(movement.steps),
            azm: f64::from(movement.azm),
        };
        let state = CoachState::from_log(&log, current_hour, coach_targets);
        let rule = matching_rule(&state);

        let burn_estimate = estimate_burn(
            reference_weight_lb,
            bmr,
            log.steps,
            stride_meters(profile.height_cm, profile.sex),
            log.azm,
        );

        let week_from = week_start(date);
        let week = self
            .db
            .get_daily_logs_between(week_from, week_from + Duration::days(6))?;
        #[allow(clippy::cast_possible_truncation)]
        let workouts_this_week = week.iter().filter(|l| l.workout_done).count() as u32;

        let goal_reached = match (goals.mode, goals.target_weight_lb) {
            (GoalMode::FatLoss, Some(t)) => reference_weight_lb <= t,
            (GoalMode::MuscleGain, Some(t)) => reference_weight_lb >= t,
            _ => false,
        };

        let notification = calibration.adjustment().map(BiasAdjustment::notification);

        Ok(DayOverview {
            date,
            logged,
            reference_weight_lb,
            bmr,
            tdee_base,
            tdee_bias: model.tdee_bias,
            planned_daily_delta: planned_daily_delta(goals.mode, goals.goal_rate),
            calorie_target,
            activity_targets: movement,
            achieved_delta,
            status: plan_status(goals.mode, achieved_delta),
            coach_message: rule.message(&state),
            coach_rule: rule.name,
            burn_estimate,
            burn_range: burn_range(burn_estimate),
            workouts_this_week,
            weekly_workout_goal: weekly_workout_goal(goals.activity_style),
            goal_reached,
            calibration,
            notification,
            log,
        })
    }

    /// Stored days, oldest first, each scored with the current bias against its own weight.
    fn score_days(
        profile: &UserProfile,
        goals: &GoalSettings,
        tdee_bias: i64,
        logs: &[DailyLog],
    ) -> Vec<DayPoint> {
        let mut days: Vec<DayPoint> = logs
            .iter()
            .map(|log| {
                let weight = log.logged_weight().unwrap_or(profile.starting_weight_lb);
                let (_, _, target) = Self::targets_for(profile, goals, tdee_bias, weight);
                let achieved_delta = Self::adherence_for(log, goals, target);
                DayPoint {
                    date: log.date,
                    weight_lb: log.logged_weight(),
                    calories: log.calories,
                    steps: log.steps,
                    azm: log.azm,
                    workout_done: log.workout_done,
                    calorie_target: target,
                    achieved_delta,
                    status: plan_status(goals.mode, achieved_delta),
                }
            })
            .collect();
        days.sort_by_key(|d| d.date);
        days
    }

    /// The most recent `limit` days, oldest first.
    pub fn history(&self, limit: Option<i64>) -> Result<Vec<DayPoint>> {
        let profile = self.require_profile()?;
        let goals = self.require_goals()?;
        let model = self.db.get_adaptive_model()?;
        let logs = self.db.get_daily_logs(limit)?;
        Ok(Self::score_days(&profile, &goals, model.tdee_bias, &logs))
    }

    /// Calibration check followed by a trend report over the lookback window.
    pub fn progress(&self, now: DateTime<Utc>) -> Result<ProgressReport> {
        let profile = self.require_profile()?;
        let goals = self.require_goals()?;

        let calibration = self.calibrate(now)?;
        let model = self.db.get_adaptive_model()?;
        let logs = self.db.get_daily_logs(Some(CALIBRATION_LOOKBACK_LOGS))?;

        Ok(ProgressReport {
            weekly_average_weight_lb: recent_average_weight(&logs, WINDOW_DAYS),
            starting_weight_lb: profile.starting_weight_lb,
            target_weight_lb: goals.target_weight_lb,
            tdee_bias: model.tdee_bias,
            last_calibration_date: model.last_calibration_date,
            notification: calibration.adjustment().map(BiasAdjustment::notification),
            calibration,
            days: Self::score_days(&profile, &goals, model.tdee_bias, &logs),
        })
    }

    // --- Backup / import ---

    pub fn export_all(&self) -> Result<ExportData> {
        self.db.export_all()
    }

    /// Validate a backup, wipe local data, then restore it.
    pub fn import_all(&self, data: &ExportData) -> Result<ImportSummary> {
        validate_export_data(data)?;
        let summary = self.db.import_all(data)?;
        info!(logs = summary.logs_imported, "restored backup");
        Ok(summary)
    }

    pub fn import_csv(&self, csv_data: &str, dry_run: bool) -> Result<CsvImportSummary> {
        let rows = csv_import::parse_daily_csv(csv_data.as_bytes())?;
        csv_import::import_daily_logs(&self.db, &rows, dry_run)
    }

    pub fn reset(&self) -> Result<()> {
        self.db.reset_all()?;
        info!("all data wiped");
        Ok(())
    }
}
