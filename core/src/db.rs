use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::models::{
    AdaptiveModel, DailyLog, ExportData, GoalSettings, ImportSummary, UserProfile,
};

const PROFILE_ID: &str = "me";
const GOALS_ID: &str = "current";
const ADAPTIVE_ID: &str = "default";

const DAILY_LOG_COLUMNS: &str =
    "date, weight_lb, calories, steps, azm, workout_done, created_at, updated_at";

pub struct Database {
    conn: Connection,
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
    )
}

fn parse_column<T: FromStr>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T::Err: ToString,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| conversion_error(idx, e.to_string()))
}

fn parse_date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| conversion_error(idx, format!("invalid date '{raw}': {e}")))
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            debug!(from = version, to = 1, "migrating database schema");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS user_profile (
                    id TEXT PRIMARY KEY,
                    sex TEXT NOT NULL,
                    age_years INTEGER NOT NULL,
                    height_cm REAL NOT NULL,
                    starting_weight_lb REAL NOT NULL,
                    timezone TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS goal_settings (
                    id TEXT PRIMARY KEY,
                    mode TEXT NOT NULL,
                    goal_rate REAL NOT NULL,
                    activity_style TEXT NOT NULL,
                    target_weight_lb REAL,
                    target_weight_customized INTEGER NOT NULL DEFAULT 0,
                    target_phase_weeks INTEGER,
                    start_date TEXT,
                    updated_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS adaptive_model (
                    id TEXT PRIMARY KEY,
                    tdee_bias INTEGER NOT NULL DEFAULT 0
                        CHECK (tdee_bias BETWEEN -500 AND 500),
                    last_calibration_date TEXT
                );

                CREATE TABLE IF NOT EXISTS daily_logs (
                    date TEXT PRIMARY KEY,
                    weight_lb REAL,
                    calories REAL NOT NULL DEFAULT 0,
                    steps INTEGER NOT NULL DEFAULT 0,
                    azm INTEGER NOT NULL DEFAULT 0,
                    workout_done INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Profile ---

    pub fn get_profile(&self) -> Result<Option<UserProfile>> {
        self.conn
            .query_row(
                "SELECT sex, age_years, height_cm, starting_weight_lb, timezone, created_at, updated_at
                 FROM user_profile WHERE id = ?1",
                params![PROFILE_ID],
                Self::profile_from_row,
            )
            .optional()
            .context("Failed to read profile")
    }

    /// Replace the stored profile. `created_at` is preserved across edits.
    pub fn set_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        let now = Utc::now().timestamp_millis();
        let created_at = if profile.created_at > 0 {
            profile.created_at
        } else {
            now
        };
        self.conn.execute(
            "INSERT INTO user_profile
                (id, sex, age_years, height_cm, starting_weight_lb, timezone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                sex = excluded.sex,
                age_years = excluded.age_years,
                height_cm = excluded.height_cm,
                starting_weight_lb = excluded.starting_weight_lb,
                timezone = excluded.timezone,
                updated_at = excluded.updated_at",
            params![
                PROFILE_ID,
                profile.sex.as_str(),
                profile.age_years,
                profile.height_cm,
                profile.starting_weight_lb,
                profile.timezone,
                created_at,
                now,
            ],
        )?;
        self.get_profile()?
            .context("Profile not found after save")
    }

    fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
        Ok(UserProfile {
            sex: parse_column(row, 0)?,
            age_years: row.get(1)?,
            height_cm: row.get(2)?,
            starting_weight_lb: row.get(3)?,
            timezone: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // --- Goals ---

    pub fn get_goals(&self) -> Result<Option<GoalSettings>> {
        self.conn
            .query_row(
                "SELECT mode, goal_rate, activity_style, target_weight_lb, target_weight_customized,
                        target_phase_weeks, start_date, updated_at
                 FROM goal_settings WHERE id = ?1",
                params![GOALS_ID],
                Self::goals_from_row,
            )
            .optional()
            .context("Failed to read goal settings")
    }

    /// Overwrite the active goal settings in full.
    pub fn set_goals(&self, goals: &GoalSettings) -> Result<GoalSettings> {
        let now = Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO goal_settings
                (id, mode, goal_rate, activity_style, target_weight_lb, target_weight_customized,
                 target_phase_weeks, start_date, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                mode = excluded.mode,
                goal_rate = excluded.goal_rate,
                activity_style = excluded.activity_style,
                target_weight_lb = excluded.target_weight_lb,
                target_weight_customized = excluded.target_weight_customized,
                target_phase_weeks = excluded.target_phase_weeks,
                start_date = excluded.start_date,
                updated_at = excluded.updated_at",
            params![
                GOALS_ID,
                goals.mode.as_str(),
                goals.goal_rate,
                goals.activity_style.as_str(),
                goals.target_weight_lb,
                goals.target_weight_customized,
                goals.target_phase_weeks,
                goals.start_date.map(date_key),
                now,
            ],
        )?;
        self.get_goals()?
            .context("Goal settings not found after save")
    }

    fn goals_from_row(row: &rusqlite::Row) -> rusqlite::Result<GoalSettings> {
        let start_date: Option<String> = row.get(6)?;
        let start_date = start_date
            .map(|s| {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|e| conversion_error(6, format!("invalid date '{s}': {e}")))
            })
            .transpose()?;
        Ok(GoalSettings {
            mode: parse_column(row, 0)?,
            goal_rate: row.get(1)?,
            activity_style: parse_column(row, 2)?,
            target_weight_lb: row.get(3)?,
            target_weight_customized: row.get(4)?,
            target_phase_weeks: row.get(5)?,
            start_date,
            updated_at: row.get(7)?,
        })
    }

    // --- Adaptive model ---

    /// The stored adaptive model, created with a zero bias on first access.
    pub fn get_adaptive_model(&self) -> Result<AdaptiveModel> {
        self.conn.execute(
            "INSERT OR IGNORE INTO adaptive_model (id, tdee_bias) VALUES (?1, 0)",
            params![ADAPTIVE_ID],
        )?;
        self.conn
            .query_row(
                "SELECT tdee_bias, last_calibration_date FROM adaptive_model WHERE id = ?1",
                params![ADAPTIVE_ID],
                Self::adaptive_from_row,
            )
            .context("Failed to read adaptive model")
    }

    pub fn set_adaptive_model(&self, model: &AdaptiveModel) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO adaptive_model (id, tdee_bias, last_calibration_date)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    tdee_bias = excluded.tdee_bias,
                    last_calibration_date = excluded.last_calibration_date",
                params![
                    ADAPTIVE_ID,
                    model.tdee_bias,
                    model.last_calibration_date.map(|d| d.to_rfc3339()),
                ],
            )
            .context("Failed to save adaptive model")?;
        Ok(())
    }

    fn adaptive_from_row(row: &rusqlite::Row) -> rusqlite::Result<AdaptiveModel> {
        let last: Option<String> = row.get(1)?;
        let last_calibration_date = last
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| conversion_error(1, format!("invalid timestamp '{s}': {e}")))
            })
            .transpose()?;
        Ok(AdaptiveModel {
            tdee_bias: row.get(0)?,
            last_calibration_date,
        })
    }

    // --- Daily logs ---

    pub fn get_daily_log(&self, date: NaiveDate) -> Result<Option<DailyLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs WHERE date = ?1"
        ))?;
        let mut rows = stmt.query(params![date_key(date)])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::daily_log_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Logs newest first, optionally limited to the `limit` most recent.
    pub fn get_daily_logs(&self, limit: Option<i64>) -> Result<Vec<DailyLog>> {
        let query = match limit {
            Some(n) => format!(
                "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs ORDER BY date DESC LIMIT {n}"
            ),
            None => format!("SELECT {DAILY_LOG_COLUMNS} FROM daily_logs ORDER BY date DESC"),
        };
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map([], Self::daily_log_from_row)?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    /// Logs with `from <= date <= to`, oldest first.
    pub fn get_daily_logs_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs
             WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC"
        ))?;
        let rows = stmt.query_map(params![date_key(from), date_key(to)], Self::daily_log_from_row)?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    /// Write a whole record for its date. The first `created_at` for a date is kept.
    pub fn upsert_daily_log(&self, log: &DailyLog) -> Result<DailyLog> {
        let now = Utc::now().timestamp_millis();
        let created_at = if log.created_at > 0 { log.created_at } else { now };
        let updated_at = if log.updated_at > 0 { log.updated_at } else { now };
        self.conn.execute(
            "INSERT INTO daily_logs
                (date, weight_lb, calories, steps, azm, workout_done, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(date) DO UPDATE SET
                weight_lb = excluded.weight_lb,
                calories = excluded.calories,
                steps = excluded.steps,
                azm = excluded.azm,
                workout_done = excluded.workout_done,
                updated_at = excluded.updated_at",
            params![
                date_key(log.date),
                log.weight_lb,
                log.calories,
                log.steps,
                log.azm,
                log.workout_done,
                created_at,
                updated_at,
            ],
        )?;
        self.get_daily_log(log.date)?
            .context("Daily log not found after upsert")
    }

    /// Upsert a batch of logs in one transaction. Either every log is written or none is.
    pub fn upsert_daily_logs(&self, logs: &[DailyLog]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for log in logs {
            self.upsert_daily_log(log)
                .with_context(|| format!("Failed to write log for {}", log.date))?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn delete_daily_log(&self, date: NaiveDate) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM daily_logs WHERE date = ?1", params![date_key(date)])?;
        Ok(rows > 0)
    }

    pub fn count_daily_logs(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM daily_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    fn daily_log_from_row(row: &rusqlite::Row) -> rusqlite::Result<DailyLog> {
        Ok(DailyLog {
            date: parse_date_column(row, 0)?,
            weight_lb: row.get(1)?,
            calories: row.get(2)?,
            steps: row.get(3)?,
            azm: row.get(4)?,
            workout_done: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    // --- Reset / Export / Import ---

    /// Remove every record, including the learned bias.
    pub fn reset_all(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "DELETE FROM daily_logs;
                 DELETE FROM adaptive_model;
                 DELETE FROM goal_settings;
                 DELETE FROM user_profile;",
            )
            .context("Failed to wipe data")?;
        Ok(())
    }

    pub fn export_all(&self) -> Result<ExportData> {
        let profile = self.get_profile()?;
        let goals = self.get_goals()?;
        let adaptive = self.get_adaptive_model()?;
        let mut logs = self.get_daily_logs(None)?;
        logs.reverse();

        Ok(ExportData {
            version: 1,
            exported_at: Local::now().to_rfc3339(),
            profile,
            goals,
            adaptive: Some(adaptive),
            logs,
        })
    }

    /// Replace all local data with the contents of a backup.
    #[allow(clippy::cast_possible_wrap)]
    pub fn import_all(&self, data: &ExportData) -> Result<ImportSummary> {
        let tx = self.conn.unchecked_transaction()?;
        self.reset_all()?;

        if let Some(profile) = &data.profile {
            self.set_profile(profile)?;
        }
        if let Some(goals) = &data.goals {
            self.set_goals(goals)?;
        }
        if let Some(adaptive) = &data.adaptive {
            self.set_adaptive_model(adaptive)?;
        }
        for log in &data.logs {
            self.upsert_daily_log(log)
                .with_context(|| format!("Failed to import log for {}", log.date))?;
        }
        tx.commit()?;

        Ok(ImportSummary {
            profile_imported: data.profile.is_some(),
            goals_imported: data.goals.is_some(),
            adaptive_imported: data.adaptive.is_some(),
            logs_imported: data.logs.len() as i64,
        })
    }
}
