use std::path::Path;

use anyhow::{Context, Result, bail};

use pace_core::models::ExportData;
use pace_core::service::CoachService;

pub(crate) fn cmd_export(svc: &CoachService, output: Option<&Path>) -> Result<()> {
    let data = svc.export_all()?;
    let body = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} daily logs to {}",
                data.logs.len(),
                path.display()
            );
        }
        None => println!("{body}"),
    }
    Ok(())
}

pub(crate) fn cmd_import_json(svc: &CoachService, path: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let data: ExportData = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a pace backup", path.display()))?;

    let summary = svc.import_all(&data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Import complete. Existing data was replaced.\n");
        println!("  Profile:        {}", yes_no(summary.profile_imported));
        println!("  Goals:          {}", yes_no(summary.goals_imported));
        println!("  Adaptive model: {}", yes_no(summary.adaptive_imported));
        println!("  Daily logs:     {}", summary.logs_imported);
    }
    Ok(())
}

pub(crate) fn cmd_import_csv(
    svc: &CoachService,
    path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let summary = svc.import_csv(&raw, dry_run)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if summary.rows_parsed == 0 {
        eprintln!("No rows found in CSV file.");
    } else {
        if dry_run {
            println!("Dry run, no changes made.\n");
        } else {
            println!("Import complete.\n");
        }
        println!("  Rows parsed:   {}", summary.rows_parsed);
        println!("  Days created:  {}", summary.logs_created);
        println!("  Days updated:  {}", summary.logs_updated);
        println!("  Dates spanned: {}", summary.dates_spanned);
    }
    Ok(())
}

pub(crate) fn cmd_reset(svc: &CoachService, yes: bool, json: bool) -> Result<()> {
    if !yes {
        bail!("This deletes your profile, goals, bias and every log. Re-run with --yes to confirm.");
    }
    svc.reset()?;
    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("All data deleted.");
    }
    Ok(())
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pace_core::models::{ActivityStyle, GoalMode, GoalSettings, Sex, UpdateDailyLog, UserProfile};

    fn seeded() -> CoachService {
        let svc = CoachService::new_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        svc.setup(
            &UserProfile {
                sex: Sex::Male,
                age_years: 40,
                height_cm: 180.0,
                starting_weight_lb: 210.0,
                timezone: "UTC".to_string(),
                created_at: 0,
                updated_at: 0,
            },
            &GoalSettings {
                mode: GoalMode::FatLoss,
                goal_rate: 1.0,
                activity_style: ActivityStyle::Standard,
                target_weight_lb: None,
                target_weight_customized: false,
                target_phase_weeks: None,
                start_date: None,
                updated_at: 0,
            },
            today,
        )
        .unwrap();
        svc.log_day(
            today,
            &UpdateDailyLog {
                weight_lb: Some(209.0),
                calories: Some(2000.0),
                ..UpdateDailyLog::default()
            },
            today,
        )
        .unwrap();
        svc
    }

    #[test]
    fn test_export_then_import_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("backup.json");

        let source = seeded();
        cmd_export(&source, Some(&path)).unwrap();

        let target = CoachService::new_in_memory().unwrap();
        cmd_import_json(&target, &path, true).unwrap();
        assert_eq!(target.get_logs(None).unwrap().len(), 1);
        assert_eq!(target.require_profile().unwrap().age_years, 40);
    }

    #[test]
    fn test_import_rejects_non_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("junk.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let svc = CoachService::new_in_memory().unwrap();
        let err = cmd_import_json(&svc, &path, false).unwrap_err();
        assert!(err.to_string().contains("not a pace backup"));
    }

    #[test]
    fn test_import_csv_dry_run() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("days.csv");
        std::fs::write(&path, "Date,Weight\n2025-05-01,208.5\n").unwrap();

        let svc = seeded();
        cmd_import_csv(&svc, &path, true, true).unwrap();
        assert_eq!(svc.get_logs(None).unwrap().len(), 1);

        cmd_import_csv(&svc, &path, false, true).unwrap();
        assert_eq!(svc.get_logs(None).unwrap().len(), 2);
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let svc = seeded();
        assert!(cmd_reset(&svc, false, false).is_err());
        assert!(svc.get_profile().unwrap().is_some());

        cmd_reset(&svc, true, false).unwrap();
        assert!(svc.get_profile().unwrap().is_none());
        assert!(svc.get_logs(None).unwrap().is_empty());
    }
}
