use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Args;

use pace_core::calculators::weekly_workout_goal;
use pace_core::models::{
    ActivityStyle, DEFAULT_TIMEZONE, GoalMode, GoalSettings, Sex, UserProfile,
};
use pace_core::service::CoachService;

use super::helpers::{format_height, parse_height_cm, weight_to_lb};

const DEFAULT_GOAL_RATE: f64 = 1.0;
const DEFAULT_MAINTENANCE_WEEKS: u32 = 12;

#[derive(Args, Debug, Clone)]
pub(crate) struct ProfileFields {
    /// Sex used by the BMR formula: male or female
    #[arg(long)]
    pub sex: Option<Sex>,
    /// Age in years (16 or older)
    #[arg(long)]
    pub age: Option<u32>,
    /// Height in centimetres (178) or feet and inches (5'10")
    #[arg(long)]
    pub height: Option<String>,
    /// Starting weight
    #[arg(long)]
    pub weight: Option<f64>,
    /// Unit for --weight: lb or kg
    #[arg(long, default_value = "lb")]
    pub unit: String,
    /// IANA timezone name (default: America/New_York)
    #[arg(long)]
    pub timezone: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct GoalFields {
    /// Goal mode: fat-loss, maintenance, muscle-gain
    #[arg(long)]
    pub mode: Option<GoalMode>,
    /// Rate of change in lb/week
    #[arg(long)]
    pub rate: Option<f64>,
    /// Activity style: low-cardio, standard, high-activity
    #[arg(long)]
    pub activity: Option<ActivityStyle>,
    /// Target weight in lb (overrides the suggested target)
    #[arg(long)]
    pub target_weight: Option<f64>,
    /// Length of a maintenance phase in weeks
    #[arg(long)]
    pub phase_weeks: Option<u32>,
}

impl ProfileFields {
    fn starting_weight_lb(&self) -> Result<Option<f64>> {
        self.weight.map(|w| weight_to_lb(w, &self.unit)).transpose()
    }

    fn height_cm(&self) -> Result<Option<f64>> {
        self.height.as_deref().map(parse_height_cm).transpose()
    }

    fn is_empty(&self) -> bool {
        self.sex.is_none()
            && self.age.is_none()
            && self.height.is_none()
            && self.weight.is_none()
            && self.timezone.is_none()
    }

    /// Overlay the supplied fields onto `profile`.
    fn merge_into(&self, mut profile: UserProfile) -> Result<UserProfile> {
        if let Some(sex) = self.sex {
            profile.sex = sex;
        }
        if let Some(age) = self.age {
            profile.age_years = age;
        }
        if let Some(cm) = self.height_cm()? {
            profile.height_cm = cm;
        }
        if let Some(lb) = self.starting_weight_lb()? {
            profile.starting_weight_lb = lb;
        }
        if let Some(ref tz) = self.timezone {
            profile.timezone.clone_from(tz);
        }
        Ok(profile)
    }
}

impl GoalFields {
    fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.rate.is_none()
            && self.activity.is_none()
            && self.target_weight.is_none()
            && self.phase_weeks.is_none()
    }

    fn merge_into(&self, mut goals: GoalSettings) -> GoalSettings {
        if let Some(mode) = self.mode {
            goals.mode = mode;
        }
        if let Some(rate) = self.rate {
            goals.goal_rate = rate;
        }
        if let Some(style) = self.activity {
            goals.activity_style = style;
        }
        if let Some(target) = self.target_weight {
            goals.target_weight_lb = Some(target);
            goals.target_weight_customized = true;
        }
        if let Some(weeks) = self.phase_weeks {
            goals.target_phase_weeks = Some(weeks);
        }
        if goals.mode == GoalMode::Maintenance && goals.target_phase_weeks.is_none() {
            goals.target_phase_weeks = Some(DEFAULT_MAINTENANCE_WEEKS);
        }
        goals
    }
}

fn default_goals() -> GoalSettings {
    GoalSettings {
        mode: GoalMode::FatLoss,
        goal_rate: DEFAULT_GOAL_RATE,
        activity_style: ActivityStyle::Standard,
        target_weight_lb: None,
        target_weight_customized: false,
        target_phase_weeks: None,
        start_date: None,
        updated_at: 0,
    }
}

pub(crate) fn build_profile(fields: &ProfileFields) -> Result<UserProfile> {
    let Some(sex) = fields.sex else {
        bail!("--sex is required");
    };
    let Some(age_years) = fields.age else {
        bail!("--age is required");
    };
    let height_cm = fields.height_cm()?.context("--height is required")?;
    let starting_weight_lb = fields
        .starting_weight_lb()?
        .context("--weight is required")?;

    Ok(UserProfile {
        sex,
        age_years,
        height_cm,
        starting_weight_lb,
        timezone: fields
            .timezone
            .clone()
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        created_at: 0,
        updated_at: 0,
    })
}

pub(crate) fn cmd_setup(
    svc: &CoachService,
    profile: &ProfileFields,
    goals: &GoalFields,
    json: bool,
) -> Result<()> {
    let new_profile = build_profile(profile)?;
    let new_goals = goals.merge_into(default_goals());
    let (profile, goals) = svc.setup(&new_profile, &new_goals, Local::now().date_naive())?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "profile": profile, "goals": goals })
        );
    } else {
        println!("Profile saved.\n");
        print_profile(&profile);
        println!();
        print_goals(&goals);
        println!("\nNext: log today's numbers with `pace log`, then run `pace today`.");
    }
    Ok(())
}

pub(crate) fn cmd_profile_show(svc: &CoachService, json: bool) -> Result<()> {
    let profile = svc.require_profile()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        print_profile(&profile);
    }
    Ok(())
}

pub(crate) fn cmd_profile_set(svc: &CoachService, fields: &ProfileFields, json: bool) -> Result<()> {
    if fields.is_empty() {
        bail!("Nothing to change. Pass at least one of --sex, --age, --height, --weight, --timezone");
    }
    let current = svc.require_profile()?;
    let profile = svc.set_profile(&fields.merge_into(current)?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("Profile updated.\n");
        print_profile(&profile);
    }
    Ok(())
}

pub(crate) fn cmd_goal_show(svc: &CoachService, json: bool) -> Result<()> {
    let goals = svc.require_goals()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&goals)?);
    } else {
        print_goals(&goals);
    }
    Ok(())
}

pub(crate) fn cmd_goal_set(svc: &CoachService, fields: &GoalFields, json: bool) -> Result<()> {
    if fields.is_empty() {
        bail!(
            "Nothing to change. Pass at least one of --mode, --rate, --activity, --target-weight, --phase-weeks"
        );
    }
    let current = svc.require_goals()?;
    let goals = svc.set_goals(&fields.merge_into(current))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goals)?);
    } else {
        println!("Goals updated.\n");
        print_goals(&goals);
    }
    Ok(())
}

fn print_profile(profile: &UserProfile) {
    println!("  Sex:             {}", profile.sex);
    println!("  Age:             {}", profile.age_years);
    println!("  Height:          {}", format_height(profile.height_cm));
    println!("  Starting weight: {:.1} lb", profile.starting_weight_lb);
    println!("  Timezone:        {}", profile.timezone);
}

fn print_goals(goals: &GoalSettings) {
    println!("  Mode:            {}", goals.mode);
    if goals.mode != GoalMode::Maintenance {
        println!("  Rate:            {:.2} lb/week", goals.goal_rate);
    }
    println!(
        "  Activity:        {} ({} workouts/week)",
        goals.activity_style,
        weekly_workout_goal(goals.activity_style)
    );
    if let Some(target) = goals.target_weight_lb {
        let note = if goals.target_weight_customized {
            ""
        } else {
            " (suggested)"
        };
        println!("  Target weight:   {target:.1} lb{note}");
    }
    if let Some(weeks) = goals.target_phase_weeks {
        println!("  Phase length:    {weeks} weeks");
    }
    if let Some(start) = goals.start_date {
        println!("  Started:         {start}");
    }
}
