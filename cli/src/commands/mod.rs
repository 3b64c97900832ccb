mod bias;
mod data;
mod helpers;
mod history;
mod log;
mod profile;
mod today;

pub(crate) use bias::{cmd_bias_set, cmd_bias_show};
pub(crate) use data::{cmd_export, cmd_import_csv, cmd_import_json, cmd_reset};
pub(crate) use history::{cmd_history, cmd_progress};
pub(crate) use log::{LogFields, cmd_delete, cmd_log};
pub(crate) use profile::{
    GoalFields, ProfileFields, cmd_goal_set, cmd_goal_show, cmd_profile_set, cmd_profile_show,
    cmd_setup,
};
pub(crate) use today::cmd_today;
