use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Absolute limit for the learned TDEE correction, in kcal/day.
pub const MAX_TDEE_BIAS: i64 = 500;

pub const MIN_AGE_YEARS: u32 = 16;
pub const MIN_STARTING_WEIGHT_LB: f64 = 100.0;
pub const MAX_STARTING_WEIGHT_LB: f64 = 600.0;

/// Distance of the suggested target weight from the starting weight.
pub const SUGGESTED_TARGET_OFFSET_LB: f64 = 15.0;

// --- Enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            _ => Err(format!("Invalid sex '{s}'. Must be one of: male, female")),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalMode {
    FatLoss,
    Maintenance,
    MuscleGain,
}

impl GoalMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FatLoss => "fat-loss",
            Self::Maintenance => "maintenance",
            Self::MuscleGain => "muscle-gain",
        }
    }
}

impl FromStr for GoalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "fat-loss" | "cut" => Ok(Self::FatLoss),
            "maintenance" | "maintain" => Ok(Self::Maintenance),
            "muscle-gain" | "bulk" => Ok(Self::MuscleGain),
            _ => Err(format!(
                "Invalid goal mode '{s}'. Must be one of: fat-loss, maintenance, muscle-gain"
            )),
        }
    }
}

impl fmt::Display for GoalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityStyle {
    LowCardio,
    Standard,
    HighActivity,
}

impl ActivityStyle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LowCardio => "low-cardio",
            Self::Standard => "standard",
            Self::HighActivity => "high-activity",
        }
    }
}

impl FromStr for ActivityStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "low-cardio" | "low" => Ok(Self::LowCardio),
            "standard" => Ok(Self::Standard),
            "high-activity" | "high" => Ok(Self::HighActivity),
            _ => Err(format!(
                "Invalid activity style '{s}'. Must be one of: low-cardio, standard, high-activity"
            )),
        }
    }
}

impl fmt::Display for ActivityStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Persisted records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub sex: Sex,
    pub age_years: u32,
    pub height_cm: f64,
    pub starting_weight_lb: f64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSettings {
    pub mode: GoalMode,
    /// Magnitude in lb/week; the sign comes from `mode`.
    pub goal_rate: f64,
    pub activity_style: ActivityStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight_lb: Option<f64>,
    #[serde(default)]
    pub target_weight_customized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_phase_weeks: Option<u32>,
    #[serde(rename = "startDateISO", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub updated_at: i64,
}

impl GoalSettings {
    /// Default target weight for a mode when the user has not picked one.
    #[must_use]
    pub fn suggested_target_weight(mode: GoalMode, starting_weight_lb: f64) -> Option<f64> {
        match mode {
            GoalMode::FatLoss => Some(starting_weight_lb - SUGGESTED_TARGET_OFFSET_LB),
            GoalMode::MuscleGain => Some(starting_weight_lb + SUGGESTED_TARGET_OFFSET_LB),
            GoalMode::Maintenance => None,
        }
    }

    /// Fill in mode-dependent defaults: the suggested target weight unless the user
    /// customised it, and no target weight / phase length where the mode has none.
    #[must_use]
    pub fn with_mode_defaults(mut self, starting_weight_lb: f64) -> Self {
        match self.mode {
            GoalMode::Maintenance => {
                self.target_weight_lb = None;
            }
            GoalMode::FatLoss | GoalMode::MuscleGain => {
                self.target_phase_weeks = None;
                if !self.target_weight_customized || self.target_weight_lb.is_none() {
                    self.target_weight_lb =
                        Self::suggested_target_weight(self.mode, starting_weight_lb);
                }
            }
        }
        self
    }
}

/// The learned correction applied on top of the formula TDEE.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveModel {
    pub tdee_bias: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_calibration_date: Option<DateTime<Utc>>,
}

/// One calendar day of metrics. Zero calories/steps/AZM means "not logged".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    #[serde(rename = "dateISO")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_lb: Option<f64>,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub steps: u32,
    #[serde(default)]
    pub azm: u32,
    #[serde(default)]
    pub workout_done: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl DailyLog {
    #[must_use]
    pub fn empty(date: NaiveDate) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            date,
            weight_lb: None,
            calories: 0.0,
            steps: 0,
            azm: 0,
            workout_done: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// The weight entry, if one was logged with a positive value.
    #[must_use]
    pub fn logged_weight(&self) -> Option<f64> {
        self.weight_lb.filter(|w| *w > 0.0)
    }

    #[must_use]
    pub fn weight_logged(&self) -> bool {
        self.logged_weight().is_some()
    }

    #[must_use]
    pub fn calories_logged(&self) -> bool {
        self.calories > 0.0
    }

    #[must_use]
    pub fn steps_logged(&self) -> bool {
        self.steps > 0
    }

    #[must_use]
    pub fn azm_logged(&self) -> bool {
        self.azm > 0
    }

    /// Calories as an explicit optional value; 0 reads as "no entry".
    #[must_use]
    pub fn logged_calories(&self) -> Option<f64> {
        self.calories_logged().then_some(self.calories)
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        !self.weight_logged()
            && !self.calories_logged()
            && !self.steps_logged()
            && !self.azm_logged()
            && !self.workout_done
    }

    /// Merge a partial update onto this record. Untouched fields keep their value.
    pub fn apply(&mut self, update: &UpdateDailyLog) {
        if let Some(w) = update.weight_lb {
            self.weight_lb = if w == 0.0 { None } else { Some(w) };
        }
        if let Some(c) = update.calories {
            self.calories = c;
        }
        if let Some(s) = update.steps {
            self.steps = s;
        }
        if let Some(a) = update.azm {
            self.azm = a;
        }
        if let Some(done) = update.workout_done {
            self.workout_done = done;
        }
        self.updated_at = Utc::now().timestamp_millis();
    }
}

/// Partial daily log edit. `None` leaves a field untouched; a weight of 0 clears it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDailyLog {
    pub weight_lb: Option<f64>,
    pub calories: Option<f64>,
    pub steps: Option<u32>,
    pub azm: Option<u32>,
    pub workout_done: Option<bool>,
}

impl UpdateDailyLog {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weight_lb.is_none()
            && self.calories.is_none()
            && self.steps.is_none()
            && self.azm.is_none()
            && self.workout_done.is_none()
    }
}

// --- Export / Import types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    #[serde(default = "default_export_version")]
    pub version: i64,
    #[serde(default)]
    pub exported_at: String,
    pub profile: Option<UserProfile>,
    pub goals: Option<GoalSettings>,
    #[serde(default)]
    pub adaptive: Option<AdaptiveModel>,
    #[serde(default)]
    pub logs: Vec<DailyLog>,
}

fn default_export_version() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub profile_imported: bool,
    pub goals_imported: bool,
    pub adaptive_imported: bool,
    pub logs_imported: i64,
}

// --- Validation ---

pub fn validate_profile(profile: &UserProfile) -> Result<()> {
    if profile.age_years < MIN_AGE_YEARS {
        bail!("This app is for ages {MIN_AGE_YEARS}+.");
    }
    if !profile.height_cm.is_finite() || profile.height_cm <= 0.0 {
        bail!("height_cm must be greater than 0");
    }
    let w = profile.starting_weight_lb;
    if !w.is_finite() || !(MIN_STARTING_WEIGHT_LB..=MAX_STARTING_WEIGHT_LB).contains(&w) {
        bail!(
            "Starting weight must be between {MIN_STARTING_WEIGHT_LB:.0} and {MAX_STARTING_WEIGHT_LB:.0} lb"
        );
    }
    if profile.timezone.trim().is_empty() {
        bail!("Timezone must not be empty");
    }
    Ok(())
}

pub fn validate_goal_settings(goals: &GoalSettings) -> Result<()> {
    if !goals.goal_rate.is_finite() || goals.goal_rate < 0.0 {
        bail!("Goal rate must be a non-negative number of lb/week");
    }
    if let Some(t) = goals.target_weight_lb {
        if !t.is_finite() || t <= 0.0 {
            bail!("Target weight must be greater than 0");
        }
    }
    if goals.target_phase_weeks == Some(0) {
        bail!("Target phase length must be at least 1 week");
    }
    Ok(())
}

/// Input rejected before anything was written. Carried inside `anyhow::Error`;
/// callers test for it with `Error::is::<InvalidInput>()`.
#[derive(Debug)]
pub struct InvalidInput(pub String);

impl InvalidInput {
    #[must_use]
    pub fn wrap(err: anyhow::Error) -> anyhow::Error {
        InvalidInput(format!("{err:#}")).into()
    }
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvalidInput {}

pub fn validate_daily_log(log: &DailyLog) -> Result<()> {
    if let Some(w) = log.weight_lb {
        if !w.is_finite() || w < 0.0 {
            bail!("Weight for {} must not be negative", log.date);
        }
    }
    if !log.calories.is_finite() || log.calories < 0.0 {
        bail!("Calories for {} must not be negative", log.date);
    }
    Ok(())
}

pub fn validate_bias(bias: i64) -> Result<()> {
    if !(-MAX_TDEE_BIAS..=MAX_TDEE_BIAS).contains(&bias) {
        bail!("TDEE bias must be between -{MAX_TDEE_BIAS} and {MAX_TDEE_BIAS} kcal");
    }
    Ok(())
}

/// Validate a backup bundle before it replaces local data.
pub fn validate_export_data(data: &ExportData) -> Result<()> {
    let Some(profile) = &data.profile else {
        bail!("Invalid backup: missing profile");
    };
    let Some(goals) = &data.goals else {
        bail!("Invalid backup: missing goals");
    };
    validate_profile(profile)?;
    validate_goal_settings(goals)?;
    if let Some(adaptive) = &data.adaptive {
        validate_bias(adaptive.tdee_bias)?;
    }
    for log in &data.logs {
        validate_daily_log(log)?;
    }
    Ok(())
}
