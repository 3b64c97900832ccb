//! Plan adherence: how much deficit or surplus a day actually ran once eating and movement are
//! both accounted for.

use std::fmt;

use serde::Serialize;

use crate::models::GoalMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdherenceInput {
    pub mode: GoalMode,
    pub planned_daily_delta: f64,
    pub calories_eaten: f64,
    pub calorie_target: f64,
    pub steps: f64,
    pub steps_target: f64,
    pub azm: f64,
    pub azm_target: f64,
}

fn capped_fraction(value: f64, target: f64) -> f64 {
    let denom = if target == 0.0 { 1.0 } else { target };
    (value / denom).min(1.0)
}

/// Signed achieved delta in kcal, negative for a net deficit and positive for a net surplus.
///
/// Returns `None` when no calories are logged for the day.
#[must_use]
pub fn plan_achieved_delta(input: &AdherenceInput) -> Option<f64> {
    if input.calories_eaten == 0.0 {
        return None;
    }

    let theoretical_total_burn = input.calorie_target - input.planned_daily_delta;
    let movement_frac = (capped_fraction(input.steps, input.steps_target)
        + capped_fraction(input.azm, input.azm_target))
        / 2.0;
    let movement_penalty = input.planned_daily_delta.abs() * (1.0 - movement_frac);
    let achieved = (theoretical_total_burn - movement_penalty) - input.calories_eaten;

    let delta = -achieved;
    Some(if delta == 0.0 { 0.0 } else { delta })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanStatus {
    Deficit,
    Surplus,
    #[serde(rename = "Plan Balance")]
    PlanBalance,
}

impl PlanStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Deficit => "Deficit",
            Self::Surplus => "Surplus",
            Self::PlanBalance => "Plan Balance",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display label for an achieved delta. A missing delta shows as `Deficit`.
#[must_use]
pub fn plan_status(mode: GoalMode, achieved_delta: Option<f64>) -> PlanStatus {
    let Some(delta) = achieved_delta else {
        return PlanStatus::Deficit;
    };
    match mode {
        GoalMode::Maintenance => PlanStatus::PlanBalance,
        GoalMode::FatLoss if delta < 0.0 => PlanStatus::Deficit,
        GoalMode::FatLoss => PlanStatus::Surplus,
        GoalMode::MuscleGain if delta > 0.0 => PlanStatus::Surplus,
        GoalMode::MuscleGain => PlanStatus::Deficit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fat_loss_day(calories: f64, steps: f64, azm: f64) -> AdherenceInput {
        AdherenceInput {
            mode: GoalMode::FatLoss,
            planned_daily_delta: -500.0,
            calories_eaten: calories,
            calorie_target: 2000.0,
            steps,
            steps_target: 10000.0,
            azm,
            azm_target: 30.0,
        }
    }

    #[test]
    fn test_perfect_day_matches_plan() {
        let delta = plan_achieved_delta(&fat_loss_day(2000.0, 10000.0, 30.0)).unwrap();
        assert!((delta + 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_under_eating_deepens_deficit() {
        let delta = plan_achieved_delta(&fat_loss_day(1500.0, 10000.0, 30.0)).unwrap();
        assert!((delta + 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_over_eating_cancels_deficit() {
        let delta = plan_achieved_delta(&fat_loss_day(2500.0, 10000.0, 30.0)).unwrap();
        assert!(delta.abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_movement_cancels_deficit() {
        let delta = plan_achieved_delta(&fat_loss_day(2000.0, 0.0, 0.0)).unwrap();
        assert!(delta.abs() < f64::EPSILON);
        assert!(delta.is_sign_positive());
    }

    #[test]
    fn test_half_movement_halves_penalty() {
        // Steps done, AZM missed: movement fraction 0.5, penalty 250.
        let delta = plan_achieved_delta(&fat_loss_day(2000.0, 12000.0, 0.0)).unwrap();
        assert!((delta + 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_calories_has_no_result() {
        assert!(plan_achieved_delta(&fat_loss_day(0.0, 10000.0, 30.0)).is_none());
    }

    #[test]
    fn test_zero_targets_do_not_divide_by_zero() {
        let input = AdherenceInput {
            steps_target: 0.0,
            azm_target: 0.0,
            ..fat_loss_day(2000.0, 0.0, 0.0)
        };
        let delta = plan_achieved_delta(&input).unwrap();
        assert!(delta.is_finite());
        assert!(delta.abs() < f64::EPSILON);
    }

    #[test]
    fn test_muscle_gain_surplus() {
        let input = AdherenceInput {
            mode: GoalMode::MuscleGain,
            planned_daily_delta: 250.0,
            calories_eaten: 3000.0,
            calorie_target: 3000.0,
            steps: 9000.0,
            steps_target: 9000.0,
            azm: 30.0,
            azm_target: 30.0,
        };
        let delta = plan_achieved_delta(&input).unwrap();
        assert!((delta - 250.0).abs() < f64::EPSILON);
        assert_eq!(plan_status(GoalMode::MuscleGain, Some(delta)), PlanStatus::Surplus);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(plan_status(GoalMode::FatLoss, Some(-10.0)).label(), "Deficit");
        assert_eq!(plan_status(GoalMode::FatLoss, Some(0.0)).label(), "Surplus");
        assert_eq!(plan_status(GoalMode::MuscleGain, Some(0.0)).label(), "Deficit");
        assert_eq!(plan_status(GoalMode::Maintenance, Some(-300.0)).label(), "Plan Balance");
        assert_eq!(plan_status(GoalMode::Maintenance, None).label(), "Deficit");
        assert_eq!(plan_status(GoalMode::MuscleGain, None).label(), "Deficit");
    }

    proptest! {
        #[test]
        fn prop_undefined_iff_no_calories(
            calories in prop_oneof![Just(0.0f64), 1.0f64..6000.0],
            target in 1000.0f64..4000.0,
            steps in 0.0f64..30000.0,
            azm in 0.0f64..120.0,
            rate in 0.0f64..2.0,
        ) {
            let input = AdherenceInput {
                mode: GoalMode::FatLoss,
                planned_daily_delta: -500.0 * rate,
                calories_eaten: calories,
                calorie_target: target,
                steps,
                steps_target: 9000.0,
                azm,
                azm_target: 30.0,
            };
            let result = plan_achieved_delta(&input);
            prop_assert_eq!(result.is_none(), calories == 0.0);
            prop_assert_eq!(result, plan_achieved_delta(&input));
        }
    }
}
