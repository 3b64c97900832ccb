//! Unit conversions and the metabolic formulas the coaching engine builds on.
//!
//! Everything here is a pure function of its arguments.

use chrono::NaiveDate;

use crate::models::{ActivityStyle, DailyLog, GoalMode, Sex, UserProfile};

pub const LBS_PER_KG: f64 = 2.20462;
pub const CM_PER_INCH: f64 = 2.54;
pub const CM_PER_FOOT: f64 = 30.48;
pub const METERS_PER_MILE: f64 = 1609.34;

/// Energy content of one pound of body mass.
pub const KCAL_PER_LB: f64 = 3500.0;

/// Daily kcal per 1 lb/week of goal rate (3500 / 7).
pub const KCAL_PER_LB_PER_WEEK: f64 = KCAL_PER_LB / 7.0;

/// Calorie targets are rounded to this step.
pub const TARGET_ROUNDING_KCAL: f64 = 50.0;

/// Number of recent weigh-ins averaged into the BMR reference weight.
pub const REFERENCE_WEIGHT_SAMPLES: usize = 7;

/// Daily movement targets for an activity style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ActivityTargets {
    pub steps: u32,
    pub azm: u32,
}

/// Round to the nearest integer with halves rounded up (toward positive infinity).
#[must_use]
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

// --- Units ---

#[must_use]
pub fn kg_to_lb(kg: f64) -> f64 {
    kg * LBS_PER_KG
}

#[must_use]
pub fn lb_to_kg(lb: f64) -> f64 {
    lb / LBS_PER_KG
}

#[must_use]
pub fn cm_to_in(cm: f64) -> f64 {
    cm / CM_PER_INCH
}

#[must_use]
pub fn in_to_cm(inches: f64) -> f64 {
    inches * CM_PER_INCH
}

/// Whole centimetres for a height given in feet and inches.
#[must_use]
pub fn feet_inches_to_cm(feet: f64, inches: f64) -> f64 {
    round_half_up(feet * CM_PER_FOOT + inches * CM_PER_INCH)
}

/// Feet and whole inches for a height in centimetres. Inches that round up to 12 show as 0.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn cm_to_feet_inches(cm: f64) -> (u32, u32) {
    let total_inches = cm_to_in(cm).max(0.0);
    let feet = (total_inches / 12.0).floor() as u32;
    let inches = round_half_up(total_inches % 12.0) as u32;
    (feet, if inches == 12 { 0 } else { inches })
}

#[must_use]
pub fn stride_meters(height_cm: f64, sex: Sex) -> f64 {
    let height_m = height_cm / 100.0;
    match sex {
        Sex::Male => height_m * 0.415,
        Sex::Female => height_m * 0.413,
    }
}

#[must_use]
pub fn distance_meters(steps: u32, stride_meters: f64) -> f64 {
    f64::from(steps) * stride_meters
}

#[must_use]
pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

// --- Activity tables ---

#[must_use]
pub fn activity_multiplier(style: ActivityStyle) -> f64 {
    match style {
        ActivityStyle::LowCardio => 1.35,
        ActivityStyle::Standard => 1.45,
        ActivityStyle::HighActivity => 1.55,
    }
}

#[must_use]
pub fn activity_targets(style: ActivityStyle) -> ActivityTargets {
    match style {
        ActivityStyle::LowCardio => ActivityTargets {
            steps: 8000,
            azm: 20,
        },
        ActivityStyle::Standard => ActivityTargets {
            steps: 9000,
            azm: 30,
        },
        ActivityStyle::HighActivity => ActivityTargets {
            steps: 10000,
            azm: 40,
        },
    }
}

/// Lifting sessions per week expected for an activity style.
#[must_use]
pub fn weekly_workout_goal(style: ActivityStyle) -> u32 {
    match style {
        ActivityStyle::LowCardio => 1,
        ActivityStyle::Standard => 2,
        ActivityStyle::HighActivity => 3,
    }
}

// --- Metabolism ---

/// Mifflin-St Jeor resting energy expenditure at the given body weight.
#[must_use]
pub fn bmr(profile: &UserProfile, weight_lb: f64) -> f64 {
    let kg = lb_to_kg(weight_lb);
    let base = 10.0 * kg + 6.25 * profile.height_cm - 5.0 * f64::from(profile.age_years);
    match profile.sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    }
}

#[must_use]
pub fn tdee_base(bmr: f64, style: ActivityStyle) -> f64 {
    bmr * activity_multiplier(style)
}

/// Signed kcal/day the plan aims for: negative for a deficit, positive for a surplus.
#[must_use]
pub fn planned_daily_delta(mode: GoalMode, rate_lb_per_week: f64) -> f64 {
    match mode {
        GoalMode::Maintenance => 0.0,
        GoalMode::FatLoss => -(rate_lb_per_week * KCAL_PER_LB_PER_WEEK),
        GoalMode::MuscleGain => rate_lb_per_week * KCAL_PER_LB_PER_WEEK,
    }
}

/// Weekly weight change in lb implied by a planned daily delta.
#[must_use]
pub fn planned_week_change(planned_daily_delta: f64) -> f64 {
    planned_daily_delta * 7.0 / KCAL_PER_LB
}

/// Daily calorie target rounded to the nearest 50 kcal.
#[must_use]
pub fn calorie_target(tdee_base: f64, tdee_bias: i64, mode: GoalMode, rate_lb_per_week: f64) -> i64 {
    #[allow(clippy::cast_precision_loss)]
    let raw = tdee_base + tdee_bias as f64 + planned_daily_delta(mode, rate_lb_per_week);
    (round_half_up(raw / TARGET_ROUNDING_KCAL) * TARGET_ROUNDING_KCAL) as i64
}

/// Estimated total burn for a day from resting energy, walking distance, and active zone minutes.
#[must_use]
pub fn estimate_burn(weight_lb: f64, bmr: f64, steps: u32, stride_meters: f64, azm: u32) -> i64 {
    let weight_kg = lb_to_kg(weight_lb);
    let miles = meters_to_miles(distance_meters(steps, stride_meters));
    let kcal_steps = 0.53 * weight_lb * miles;

    let azm = f64::from(azm);
    let cardio_mins = 0.2 * azm / 2.0;
    let fatburn_mins = azm - 2.0 * cardio_mins;
    let kcal_zone = 0.0175 * weight_kg * (fatburn_mins + 4.0 * cardio_mins);

    round_half_up(bmr + kcal_steps + kcal_zone) as i64
}

/// A ±20% band around a burn estimate.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn burn_range(burn: i64) -> (i64, i64) {
    let burn = burn as f64;
    (
        round_half_up(burn * 0.8) as i64,
        round_half_up(burn * 1.2) as i64,
    )
}

/// Body weight used for a day's BMR: the mean of the most recent weigh-ins dated before `day`,
/// or `fallback_lb` when there are none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reference_weight(logs: &[DailyLog], day: NaiveDate, fallback_lb: f64) -> f64 {
    let mut earlier: Vec<(NaiveDate, f64)> = logs
        .iter()
        .filter(|l| l.date < day)
        .filter_map(|l| l.logged_weight().map(|w| (l.date, w)))
        .collect();
    earlier.sort_by(|a, b| b.0.cmp(&a.0));
    earlier.truncate(REFERENCE_WEIGHT_SAMPLES);

    if earlier.is_empty() {
        return fallback_lb;
    }
    earlier.iter().map(|(_, w)| w).sum::<f64>() / earlier.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_TIMEZONE;
    use proptest::prelude::*;

    fn profile(sex: Sex) -> UserProfile {
        UserProfile {
            sex,
            age_years: 30,
            height_cm: 180.0,
            starting_weight_lb: 200.0,
            timezone: DEFAULT_TIMEZONE.to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn weighed(d: u32, w: f64) -> DailyLog {
        let mut log = DailyLog::empty(day(d));
        log.weight_lb = Some(w);
        log
    }

    #[test]
    fn test_unit_conversions() {
        assert!((kg_to_lb(100.0) - 220.462).abs() < 1e-9);
        assert!((lb_to_kg(220.462) - 100.0).abs() < 1e-9);
        assert!((in_to_cm(10.0) - 25.4).abs() < 1e-9);
        assert!((cm_to_in(25.4) - 10.0).abs() < 1e-9);
        assert!((meters_to_miles(1609.34) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_feet_inches_round_trip() {
        assert!((feet_inches_to_cm(5.0, 10.0) - 178.0).abs() < f64::EPSILON);
        assert_eq!(cm_to_feet_inches(178.0), (5, 10));
        assert_eq!(cm_to_feet_inches(182.88), (6, 0));
    }

    #[test]
    fn test_inches_rounding_to_twelve_shows_zero() {
        // 71.9 in -> 5 ft 11.9 in, which rounds to 12
        assert_eq!(cm_to_feet_inches(71.9 * 2.54), (5, 0));
    }

    #[test]
    fn test_stride_and_distance() {
        assert!((stride_meters(200.0, Sex::Male) - 0.83).abs() < 1e-9);
        assert!((stride_meters(200.0, Sex::Female) - 0.826).abs() < 1e-9);
        assert!((distance_meters(1000, 0.8) - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_activity_tables() {
        assert!((activity_multiplier(ActivityStyle::LowCardio) - 1.35).abs() < f64::EPSILON);
        assert!((activity_multiplier(ActivityStyle::HighActivity) - 1.55).abs() < f64::EPSILON);
        assert_eq!(
            activity_targets(ActivityStyle::Standard),
            ActivityTargets {
                steps: 9000,
                azm: 30
            }
        );
        assert_eq!(weekly_workout_goal(ActivityStyle::HighActivity), 3);
    }

    #[test]
    fn test_bmr_by_sex() {
        let weight = kg_to_lb(80.0);
        // 10*80 + 6.25*180 - 5*30 = 1775
        assert!((bmr(&profile(Sex::Male), weight) - 1780.0).abs() < 1e-6);
        assert!((bmr(&profile(Sex::Female), weight) - 1614.0).abs() < 1e-6);
    }

    #[test]
    fn test_planned_daily_delta() {
        assert!((planned_daily_delta(GoalMode::Maintenance, 1.0)).abs() < f64::EPSILON);
        assert!((planned_daily_delta(GoalMode::FatLoss, 1.0) + 500.0).abs() < f64::EPSILON);
        assert!((planned_daily_delta(GoalMode::MuscleGain, 0.5) - 250.0).abs() < f64::EPSILON);
        assert!((planned_week_change(-500.0) + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_calorie_target_rounds_to_fifty() {
        assert_eq!(calorie_target(2510.0, 0, GoalMode::FatLoss, 1.0), 2000);
        assert_eq!(calorie_target(2524.9, 0, GoalMode::Maintenance, 0.0), 2500);
        assert_eq!(calorie_target(2525.0, 0, GoalMode::Maintenance, 0.0), 2550);
        assert_eq!(calorie_target(2400.0, -75, GoalMode::MuscleGain, 0.5), 2600);
    }

    #[test]
    fn test_estimate_burn() {
        // No movement: burn is just BMR.
        assert_eq!(estimate_burn(200.0, 1800.4, 0, 0.75, 0), 1800);
        let with_movement = estimate_burn(200.0, 1800.0, 10000, 0.75, 30);
        assert!(with_movement > 1800);
    }

    #[test]
    fn test_burn_range() {
        assert_eq!(burn_range(2000), (1600, 2400));
        assert_eq!(burn_range(2003), (1602, 2404));
    }

    #[test]
    fn test_reference_weight_uses_seven_latest_before_day() {
        let mut logs: Vec<DailyLog> = (1..=9).map(|d| weighed(d, 200.0 - f64::from(d))).collect();
        logs.push(weighed(10, 100.0));
        // Days 2..=8 before day 9 -> 198..=192, mean 195
        let w = reference_weight(&logs, day(9), 210.0);
        assert!((w - 195.0).abs() < 1e-9);
    }

    #[test]
    fn test_reference_weight_falls_back() {
        let mut unweighed = DailyLog::empty(day(1));
        unweighed.calories = 2000.0;
        let logs = vec![unweighed, weighed(5, 180.0)];
        assert!((reference_weight(&logs, day(5), 210.0) - 210.0).abs() < f64::EPSILON);
        assert!((reference_weight(&[], day(5), 199.0) - 199.0).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn prop_calorie_target_is_multiple_of_fifty(
            age in 16u32..90,
            height in 120.0f64..220.0,
            weight in 100.0f64..600.0,
            male in any::<bool>(),
            style in 0usize..3,
            mode in 0usize..3,
            rate in 0.0f64..2.0,
            bias in -500i64..=500,
        ) {
            let profile = UserProfile {
                sex: if male { Sex::Male } else { Sex::Female },
                age_years: age,
                height_cm: height,
                starting_weight_lb: weight,
                timezone: DEFAULT_TIMEZONE.to_string(),
                created_at: 0,
                updated_at: 0,
            };
            let style = [ActivityStyle::LowCardio, ActivityStyle::Standard, ActivityStyle::HighActivity][style];
            let mode = [GoalMode::FatLoss, GoalMode::Maintenance, GoalMode::MuscleGain][mode];
            let base = tdee_base(bmr(&profile, weight), style);
            let target = calorie_target(base, bias, mode, rate);
            prop_assert_eq!(target % 50, 0);
        }
    }
}
