//! Coach message selection.
//!
//! The day's state is matched against [`RULES`] from top to bottom and the first rule that applies
//! supplies the message. The order of the table is the priority order.

use serde::Serialize;

use crate::models::DailyLog;

/// Hour at which the pacing window opens.
pub const PACING_START_HOUR: u32 = 6;
/// Hour at which the pacing window closes.
pub const PACING_END_HOUR: u32 = 22;
/// How far a metric may drift from the elapsed-day fraction and still count as "on" pace.
pub const PACING_BAND: f64 = 0.15;
/// Fraction of a target at which warnings and "close" nudges start.
pub const NEAR_TARGET_FRACTION: f64 = 0.75;

pub const MORNING_WEIGH_IN_START_HOUR: u32 = 6;
pub const MORNING_WEIGH_IN_END_HOUR: u32 = 10;
pub const EVENING_HOUR: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoachTargets {
    pub calories: f64,
    pub steps: f64,
    pub azm: f64,
}

/// Snapshot of a day as the coach sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachState {
    pub current_hour: u32,
    pub weight_logged: bool,
    pub calories_entered: bool,
    pub steps_entered: bool,
    pub azm_entered: bool,
    pub calories_eaten: f64,
    pub steps: f64,
    pub azm: f64,
    pub targets: CoachTargets,
}

impl CoachState {
    #[must_use]
    pub fn from_log(log: &DailyLog, current_hour: u32, targets: CoachTargets) -> Self {
        Self {
            current_hour,
            weight_logged: log.weight_logged(),
            calories_entered: log.calories_logged(),
            steps_entered: log.steps_logged(),
            azm_entered: log.azm_logged(),
            calories_eaten: log.calories,
            steps: f64::from(log.steps),
            azm: f64::from(log.azm),
            targets,
        }
    }

    fn nothing_logged(&self) -> bool {
        !self.weight_logged && !self.calories_entered && !self.steps_entered && !self.azm_entered
    }

    fn only_weight_logged(&self) -> bool {
        self.weight_logged && !self.calories_entered && !self.steps_entered && !self.azm_entered
    }

    /// Calories are lower-is-better.
    fn calories_hit(&self) -> bool {
        self.calories_entered && self.calories_eaten <= self.targets.calories
    }

    fn steps_hit(&self) -> bool {
        self.steps_entered && self.steps >= self.targets.steps
    }

    fn azm_hit(&self) -> bool {
        self.azm_entered && self.azm >= self.targets.azm
    }

    fn all_targets_hit(&self) -> bool {
        self.calories_hit() && self.steps_hit() && self.azm_hit()
    }

    fn all_entered(&self) -> bool {
        self.weight_logged && self.calories_entered && self.steps_entered && self.azm_entered
    }

    fn calories_near_target(&self) -> bool {
        self.calories_entered
            && self.calories_eaten >= NEAR_TARGET_FRACTION * self.targets.calories
            && self.calories_eaten < self.targets.calories
    }

    fn steps_close(&self) -> bool {
        self.steps_entered
            && self.steps >= NEAR_TARGET_FRACTION * self.targets.steps
            && self.steps < self.targets.steps
    }

    fn azm_close(&self) -> bool {
        self.azm_entered
            && self.azm >= NEAR_TARGET_FRACTION * self.targets.azm
            && self.azm < self.targets.azm
    }

    /// Fraction of the pacing window already elapsed, clamped to [0, 1].
    #[must_use]
    pub fn day_fraction(&self) -> f64 {
        let elapsed = f64::from(self.current_hour) - f64::from(PACING_START_HOUR);
        let span = f64::from(PACING_END_HOUR - PACING_START_HOUR);
        (elapsed / span).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Ahead,
    Behind,
    On,
}

impl Pace {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ahead => "ahead",
            Self::Behind => "behind",
            Self::On => "on",
        }
    }
}

#[must_use]
pub fn pace(value: f64, target: f64, day_fraction: f64) -> Pace {
    let target = if target == 0.0 { 1.0 } else { target };
    let frac = value / target;
    if frac > day_fraction + PACING_BAND {
        Pace::Ahead
    } else if frac < day_fraction - PACING_BAND {
        Pace::Behind
    } else {
        Pace::On
    }
}

fn pacing_summary(state: &CoachState) -> String {
    let day = state.day_fraction();
    let t = &state.targets;
    format!(
        "Cals {}, steps {}, AZM {} pace.",
        pace(state.calories_eaten, t.calories, day).as_str(),
        pace(state.steps, t.steps, day).as_str(),
        pace(state.azm, t.azm, day).as_str()
    )
}

#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Fixed(&'static str),
    PacingSummary,
}

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&CoachState) -> bool,
    pub reply: Reply,
}

impl Rule {
    #[must_use]
    pub fn message(&self, state: &CoachState) -> String {
        match self.reply {
            Reply::Fixed(text) => text.to_string(),
            Reply::PacingSummary => pacing_summary(state),
        }
    }
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "nothing-logged",
        applies: CoachState::nothing_logged,
        reply: Reply::Fixed("Please Begin by logging your weight."),
    },
    Rule {
        name: "only-weight-logged",
        applies: CoachState::only_weight_logged,
        reply: Reply::Fixed("Begin logging your day to start!"),
    },
    Rule {
        name: "morning-weigh-in",
        applies: |s| {
            (MORNING_WEIGH_IN_START_HOUR..MORNING_WEIGH_IN_END_HOUR).contains(&s.current_hour)
                && !s.weight_logged
        },
        reply: Reply::Fixed("Don’t forget to log your weight."),
    },
    Rule {
        name: "evening-weigh-in",
        applies: |s| s.current_hour >= EVENING_HOUR && s.all_targets_hit() && !s.weight_logged,
        reply: Reply::Fixed("Everything’s done — log your weight if you want a complete day."),
    },
    Rule {
        name: "day-complete",
        applies: |s| s.all_entered() && s.all_targets_hit(),
        reply: Reply::Fixed("You nailed today! Great job."),
    },
    Rule {
        name: "movement-complete-over",
        applies: |s| {
            s.steps_hit()
                && s.azm_hit()
                && s.calories_entered
                && s.calories_eaten > s.targets.calories
        },
        reply: Reply::Fixed("Movement complete. Now keep calories under target tomorrow."),
    },
    Rule {
        name: "movement-complete-under",
        applies: |s| s.steps_hit() && s.azm_hit() && s.calories_entered,
        reply: Reply::Fixed("Movement complete. Nice work keeping calories under target."),
    },
    Rule {
        name: "calories-near-target",
        applies: CoachState::calories_near_target,
        reply: Reply::Fixed("Careful—you're at 75% of your calorie target."),
    },
    Rule {
        name: "steps-close",
        applies: CoachState::steps_close,
        reply: Reply::Fixed("You’re close—keep it up!"),
    },
    Rule {
        name: "azm-close",
        applies: CoachState::azm_close,
        reply: Reply::Fixed("You’re close—keep it up!"),
    },
    Rule {
        name: "steps-done-azm-short",
        applies: |s| s.steps_hit() && s.azm_entered && s.azm < s.targets.azm,
        reply: Reply::Fixed("Yay! Steps complete. Now just work on AZM."),
    },
    Rule {
        name: "steps-done-azm-missing",
        applies: |s| s.steps_hit() && !s.azm_entered,
        reply: Reply::Fixed("Yay! Steps complete. Now just log AZM."),
    },
    Rule {
        name: "azm-done-steps-short",
        applies: |s| s.azm_hit() && s.steps_entered && s.steps < s.targets.steps,
        reply: Reply::Fixed("Yay! AZM complete. Now just work on steps."),
    },
    Rule {
        name: "azm-done-steps-missing",
        applies: |s| s.azm_hit() && !s.steps_entered,
        reply: Reply::Fixed("Yay! AZM complete. Now just log steps."),
    },
    Rule {
        name: "log-calories",
        applies: |s| !s.calories_entered,
        reply: Reply::Fixed("Log your calories."),
    },
    Rule {
        name: "log-steps",
        applies: |s| !s.steps_entered,
        reply: Reply::Fixed("Log your steps."),
    },
    Rule {
        name: "log-azm",
        applies: |s| !s.azm_entered,
        reply: Reply::Fixed("Log your AZM."),
    },
    Rule {
        name: "log-weight",
        applies: |s| !s.weight_logged,
        reply: Reply::Fixed("Log your weight."),
    },
    Rule {
        name: "pacing",
        applies: |_| true,
        reply: Reply::PacingSummary,
    },
];

/// The first rule in [`RULES`] that applies to `state`.
#[must_use]
pub fn matching_rule(state: &CoachState) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.applies)(state))
        .unwrap_or(&RULES[RULES.len() - 1])
}

#[must_use]
pub fn coach_message(state: &CoachState) -> String {
    matching_rule(state).message(state)
}
