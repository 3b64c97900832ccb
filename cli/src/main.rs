mod commands;
mod config;
mod logging;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    GoalFields, LogFields, ProfileFields, cmd_bias_set, cmd_bias_show, cmd_delete, cmd_export,
    cmd_goal_set, cmd_goal_show, cmd_history, cmd_import_csv, cmd_import_json, cmd_log,
    cmd_profile_set, cmd_profile_show, cmd_progress, cmd_reset, cmd_setup, cmd_today,
};
use crate::config::Config;
use crate::logging::LogFormat;
use pace_core::service::CoachService;

#[derive(Parser)]
#[command(
    name = "pace",
    version,
    about = "A local-first fitness coach with adaptive calorie targets",
    long_about = "\n\n  ██████╗  █████╗  ██████╗███████╗
  ██╔══██╗██╔══██╗██╔════╝██╔════╝
  ██████╔╝███████║██║     █████╗
  ██╔═══╝ ██╔══██║██║     ██╔══╝
  ██║     ██║  ██║╚██████╗███████╗
  ╚═╝     ╚═╝  ╚═╝ ╚═════╝╚══════╝
      eat, move, adjust, repeat.
"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Diagnostic log format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create your profile and goals in one step
    Setup {
        #[command(flatten)]
        profile: ProfileFields,
        #[command(flatten)]
        goals: GoalFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Show or change your goal, rate and activity style
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Log weight, calories, steps, AZM or a workout for a day
    Log {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Body weight (0 clears a logged weight)
        #[arg(short, long)]
        weight: Option<f64>,
        /// Unit for --weight: lb or kg
        #[arg(short, long, default_value = "lb")]
        unit: String,
        /// Calories eaten
        #[arg(short, long)]
        calories: Option<f64>,
        /// Step count
        #[arg(short, long)]
        steps: Option<u32>,
        /// Active Zone Minutes
        #[arg(short, long)]
        azm: Option<u32>,
        /// Mark the day's workout as done
        #[arg(long, conflicts_with = "no_workout")]
        workout: bool,
        /// Mark the day's workout as not done
        #[arg(long)]
        no_workout: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the log for a date
    Delete {
        /// Date (YYYY-MM-DD or today/yesterday)
        date: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Today's target, plan balance, burn estimate and coach message
    Today {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Hour of day (0-23) used for pacing, default: now
        #[arg(long)]
        hour: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent days with their plan balance
    History {
        /// Number of logged days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Weight trend, calibration state and recent adherence
    Progress {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or override the learned TDEE bias
    Bias {
        #[command(subcommand)]
        command: BiasCommands,
    },
    /// Export all data as a JSON backup
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import data from a backup or a CSV of daily metrics
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Delete all data
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the current profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one or more profile fields
    Set {
        #[command(flatten)]
        fields: ProfileFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Show the current goal settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one or more goal settings
    Set {
        #[command(flatten)]
        fields: GoalFields,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BiasCommands {
    /// Show the current bias and last calibration date
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the bias manually (-500 to 500 kcal)
    Set {
        /// Bias in kcal
        #[arg(allow_negative_numbers = true)]
        kcal: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Restore a JSON backup, replacing all existing data
    Json {
        /// Path to the backup file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge daily metrics from a CSV (Date,Weight,Calories,Steps,AZM,Workout)
    Csv {
        /// Path to the CSV file
        file: PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.log_format) {
        eprintln!("Warning: could not initialise logging: {e:#}");
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = CoachService::new(&config.db_path)?;

    match cli.command {
        Commands::Setup {
            profile,
            goals,
            json,
        } => cmd_setup(&svc, &profile, &goals, json),
        Commands::Profile { command } => match command {
            ProfileCommands::Show { json } => cmd_profile_show(&svc, json),
            ProfileCommands::Set { fields, json } => cmd_profile_set(&svc, &fields, json),
        },
        Commands::Goal { command } => match command {
            GoalCommands::Show { json } => cmd_goal_show(&svc, json),
            GoalCommands::Set { fields, json } => cmd_goal_set(&svc, &fields, json),
        },
        Commands::Log {
            date,
            weight,
            unit,
            calories,
            steps,
            azm,
            workout,
            no_workout,
            json,
        } => {
            let fields = LogFields {
                weight,
                unit,
                calories,
                steps,
                azm,
                workout: match (workout, no_workout) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            cmd_log(&svc, date, &fields, json)
        }
        Commands::Delete { date, json } => cmd_delete(&svc, &date, json),
        Commands::Today { date, hour, json } => cmd_today(&svc, date, hour, json),
        Commands::History { days, json } => cmd_history(&svc, days, json),
        Commands::Progress { json } => cmd_progress(&svc, json),
        Commands::Bias { command } => match command {
            BiasCommands::Show { json } => cmd_bias_show(&svc, json),
            BiasCommands::Set { kcal, json } => cmd_bias_set(&svc, kcal, json),
        },
        Commands::Export { output } => cmd_export(&svc, output.as_deref()),
        Commands::Import { command } => match command {
            ImportCommands::Json { file, json } => cmd_import_json(&svc, &file, json),
            ImportCommands::Csv {
                file,
                dry_run,
                json,
            } => cmd_import_csv(&svc, &file, dry_run, json),
        },
        Commands::Reset { yes, json } => cmd_reset(&svc, yes, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(svc, port, &bind, api_key, new_api_key).await
        }
    }
}
