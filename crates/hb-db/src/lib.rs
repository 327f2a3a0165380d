//! Storage layer for the heartbeat attendance tracker.
//!
//! Provides persistence for settings and the per-day ledger using `rusqlite`,
//! plus the accrual engine operations in [`mod@accrual`].
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization. The HTTP server
//! wraps it in a `Mutex`; each request holds the lock only for its own
//! read-modify-write.
//!
//! # Schema
//!
//! Dates are stored as TEXT in ISO `YYYY-MM-DD` form, so lexicographic
//! ordering matches chronological ordering. Categories are stored as their
//! stable string codes (`workday`, `weekend`, `half_leave`, `full_leave`,
//! `holiday`); unknown codes decode to `workday` rather than failing a whole
//! aggregate.
//!
//! The `time_required` column is a materialized value. Its only writers are
//! the accrual engine operations (settings apply, range materialization,
//! holiday apply/delete, heartbeat row creation); nothing else may touch it.

pub mod accrual;

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use hb_core::{Correction, DayCategory, LedgerEntry, Settings, SettingsError, WorkingDays};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored date string that is not `YYYY-MM-DD`.
    #[error("invalid date for ledger row {row_id}: {date}")]
    DateParse {
        row_id: i64,
        date: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A settings row that violates the settings invariants.
    #[error("invalid settings row: {0}")]
    InvalidSettings(#[from] SettingsError),
    /// An operation that needs settings found none.
    #[error("no settings configured")]
    SettingsMissing,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                device_id TEXT NOT NULL CHECK (LENGTH(device_id) > 0),
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                working_days TEXT NOT NULL,
                daily_required_minutes INTEGER NOT NULL CHECK (daily_required_minutes > 0),
                CHECK (start_date <= end_date)
            );

            -- Ledger: one row per device-day
            -- date: ISO 8601 (e.g. '2024-06-03')
            -- category: 'workday' | 'weekend' | 'half_leave' | 'full_leave' | 'holiday'
            CREATE TABLE IF NOT EXISTS ledger (
                id INTEGER PRIMARY KEY,
                device_id TEXT NOT NULL,
                date TEXT NOT NULL,
                category TEXT NOT NULL,
                time_recorded INTEGER NOT NULL DEFAULT 0 CHECK (time_recorded >= 0),
                time_required INTEGER NOT NULL DEFAULT 0 CHECK (time_required >= 0),
                description TEXT,
                UNIQUE (device_id, date)
            );

            CREATE INDEX IF NOT EXISTS idx_ledger_date ON ledger(date);
            CREATE INDEX IF NOT EXISTS idx_ledger_device_date ON ledger(device_id, date);

            -- Manual corrections: override recorded minutes for balance
            -- purposes without touching the raw ledger value
            CREATE TABLE IF NOT EXISTS corrections (
                date TEXT PRIMARY KEY,
                corrected_minutes INTEGER NOT NULL CHECK (corrected_minutes >= 0),
                reason TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Returns the settings row, if one has been configured.
    pub fn settings(&self) -> Result<Option<Settings>, DbError> {
        let raw = self
            .conn
            .query_row(
                "
                SELECT device_id, start_date, end_date, working_days, daily_required_minutes
                FROM settings WHERE id = 1
                ",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((device_id, start, end, working_days, daily_required)) = raw else {
            return Ok(None);
        };

        let start_date = parse_date(1, &start)?;
        let end_date = parse_date(1, &end)?;
        // Legacy day-name lists migrate here; writes always store the
        // canonical JSON array form.
        let working_days = WorkingDays::parse(&working_days)?;
        let daily_required_minutes = u32::try_from(daily_required)
            .map_err(|_| DbError::InvalidSettings(SettingsError::ZeroDailyRequirement))?;

        let settings = Settings::new(
            device_id,
            start_date,
            end_date,
            working_days,
            daily_required_minutes,
        )?;
        Ok(Some(settings))
    }

    /// Inserts or replaces the singleton settings row.
    pub fn save_settings(&self, settings: &Settings) -> Result<(), DbError> {
        save_settings_on(&self.conn, settings)
    }

    /// Returns the ledger row for a device-day, if it exists.
    pub fn ledger_entry(
        &self,
        device_id: &str,
        date: NaiveDate,
    ) -> Result<Option<LedgerEntry>, DbError> {
        ledger_entry_on(&self.conn, device_id, date)
    }

    /// Returns the device's ledger rows with dates in `[start, end]`,
    /// ordered by date.
    pub fn ledger_range(
        &self,
        device_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, device_id, date, category, time_recorded, time_required, description
            FROM ledger
            WHERE device_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![device_id, date_to_sql(start), date_to_sql(end)],
            raw_ledger_row,
        )?;
        collect_entries(rows)
    }

    /// Returns every holiday/leave override row, ordered by date.
    pub fn overrides(&self) -> Result<Vec<LedgerEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, device_id, date, category, time_recorded, time_required, description
            FROM ledger
            WHERE category IN ('half_leave', 'full_leave', 'holiday')
            ORDER BY date ASC
            ",
        )?;
        let rows = stmt.query_map([], raw_ledger_row)?;
        collect_entries(rows)
    }

    /// Inserts or replaces the correction for its date.
    pub fn set_correction(&self, correction: &Correction) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO corrections (date, corrected_minutes, reason)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(date) DO UPDATE SET
                corrected_minutes = excluded.corrected_minutes,
                reason = excluded.reason
            ",
            params![
                date_to_sql(correction.date),
                correction.corrected_minutes,
                correction.reason,
            ],
        )?;
        Ok(())
    }

    /// Removes the correction for a date. Returns `false` on a miss.
    pub fn delete_correction(&self, date: NaiveDate) -> Result<bool, DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM corrections WHERE date = ?1",
            params![date_to_sql(date)],
        )?;
        Ok(deleted > 0)
    }

    /// Returns all corrections, ordered by date.
    pub fn corrections(&self) -> Result<Vec<Correction>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, corrected_minutes, reason FROM corrections ORDER BY date ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut corrections = Vec::new();
        for row in rows {
            let (date, minutes, reason) = row?;
            corrections.push(Correction {
                date: parse_date(0, &date)?,
                corrected_minutes: u32::try_from(minutes).unwrap_or(0),
                reason,
            });
        }
        Ok(corrections)
    }

    /// Deletes ledger rows whose device is not the settings device.
    ///
    /// Orphans would otherwise corrupt aggregates silently; write paths call
    /// this before holiday and settings edits.
    pub fn purge_orphans(&self, device_id: &str) -> Result<usize, DbError> {
        let purged = self
            .conn
            .execute("DELETE FROM ledger WHERE device_id != ?1", params![device_id])?;
        if purged > 0 {
            tracing::info!(purged, device_id, "purged orphaned ledger rows");
        }
        Ok(purged)
    }
}

/// One ledger row before date/category decoding.
type RawLedgerRow = (i64, String, String, String, i64, i64, Option<String>);

fn raw_ledger_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLedgerRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn decode_entry(raw: RawLedgerRow) -> Result<LedgerEntry, DbError> {
    let (row_id, device_id, date, category, recorded, required, description) = raw;
    let date = parse_date(row_id, &date)?;
    Ok(LedgerEntry {
        device_id,
        date,
        category: DayCategory::parse_lossy(&category),
        time_recorded: u32::try_from(recorded).unwrap_or(0),
        time_required: u32::try_from(required).unwrap_or(0),
        description,
    })
}

fn collect_entries(
    rows: impl Iterator<Item = rusqlite::Result<RawLedgerRow>>,
) -> Result<Vec<LedgerEntry>, DbError> {
    let mut entries = Vec::new();
    for row in rows {
        entries.push(decode_entry(row?)?);
    }
    Ok(entries)
}

fn parse_date(row_id: i64, raw: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|source| DbError::DateParse {
        row_id,
        date: raw.to_string(),
        source,
    })
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn ledger_entry_on(
    conn: &Connection,
    device_id: &str,
    date: NaiveDate,
) -> Result<Option<LedgerEntry>, DbError> {
    let raw = conn
        .query_row(
            "
            SELECT id, device_id, date, category, time_recorded, time_required, description
            FROM ledger
            WHERE device_id = ?1 AND date = ?2
            ",
            params![device_id, date_to_sql(date)],
            raw_ledger_row,
        )
        .optional()?;
    raw.map(decode_entry).transpose()
}

fn save_settings_on(conn: &Connection, settings: &Settings) -> Result<(), DbError> {
    conn.execute(
        "
        INSERT INTO settings (id, device_id, start_date, end_date, working_days, daily_required_minutes)
        VALUES (1, ?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            device_id = excluded.device_id,
            start_date = excluded.start_date,
            end_date = excluded.end_date,
            working_days = excluded.working_days,
            daily_required_minutes = excluded.daily_required_minutes
        ",
        params![
            settings.device_id,
            date_to_sql(settings.start_date),
            date_to_sql(settings.end_date),
            settings.working_days.to_canonical(),
            settings.daily_required_minutes,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_settings() -> Settings {
        Settings::new(
            "dev-1",
            date(2024, 6, 1),
            date(2024, 6, 30),
            WorkingDays::default(),
            480,
        )
        .unwrap()
    }

    #[test]
    fn init_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("hb.db");
        {
            let db = Database::open(&path).unwrap();
            db.save_settings(&sample_settings()).unwrap();
        }
        // Re-opening re-runs init against the existing schema.
        let db = Database::open(&path).unwrap();
        assert_eq!(db.settings().unwrap(), Some(sample_settings()));
    }

    #[test]
    fn settings_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.settings().unwrap().is_none());

        let settings = sample_settings();
        db.save_settings(&settings).unwrap();
        assert_eq!(db.settings().unwrap(), Some(settings.clone()));

        // Saving again replaces the singleton row.
        let changed = Settings::new(
            "dev-1",
            date(2024, 1, 1),
            date(2024, 12, 31),
            WorkingDays::parse("[5,6]").unwrap(),
            360,
        )
        .unwrap();
        db.save_settings(&changed).unwrap();
        assert_eq!(db.settings().unwrap(), Some(changed));
    }

    #[test]
    fn legacy_working_days_migrate_on_read() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO settings (id, device_id, start_date, end_date, working_days, daily_required_minutes)
                 VALUES (1, 'dev-1', '2024-06-01', '2024-06-30', 'Mon,Tue,Wed,Thu,Fri', 480)",
                [],
            )
            .unwrap();

        let settings = db.settings().unwrap().unwrap();
        assert_eq!(settings.working_days, WorkingDays::default());
        assert_eq!(settings.working_days.to_canonical(), "[0,1,2,3,4]");
    }

    #[test]
    fn unknown_category_decodes_as_workday() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO ledger (device_id, date, category, time_recorded, time_required)
                 VALUES ('dev-1', '2024-06-03', 'mystery', 5, 480)",
                [],
            )
            .unwrap();

        let entry = db.ledger_entry("dev-1", date(2024, 6, 3)).unwrap().unwrap();
        assert_eq!(entry.category, DayCategory::Workday);
        assert_eq!(entry.time_recorded, 5);
    }

    #[test]
    fn ledger_range_is_ordered_and_bounded() {
        let db = Database::open_in_memory().unwrap();
        for (day, recorded) in [(5, 10), (3, 20), (9, 30)] {
            db.conn
                .execute(
                    "INSERT INTO ledger (device_id, date, category, time_recorded, time_required)
                     VALUES ('dev-1', ?1, 'workday', ?2, 480)",
                    params![format!("2024-06-{day:02}"), recorded],
                )
                .unwrap();
        }

        let rows = db
            .ledger_range("dev-1", date(2024, 6, 1), date(2024, 6, 5))
            .unwrap();
        assert_eq!(
            rows.iter().map(|r| r.date).collect::<Vec<_>>(),
            vec![date(2024, 6, 3), date(2024, 6, 5)]
        );
    }

    #[test]
    fn correction_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.corrections().unwrap().is_empty());

        let correction = Correction {
            date: date(2024, 6, 3),
            corrected_minutes: 480,
            reason: "agent offline".to_string(),
        };
        db.set_correction(&correction).unwrap();
        assert_eq!(db.corrections().unwrap(), vec![correction.clone()]);

        // Setting again replaces the value for the same date.
        let replaced = Correction {
            corrected_minutes: 450,
            reason: "recount".to_string(),
            ..correction
        };
        db.set_correction(&replaced).unwrap();
        assert_eq!(db.corrections().unwrap(), vec![replaced]);

        assert!(db.delete_correction(date(2024, 6, 3)).unwrap());
        assert!(!db.delete_correction(date(2024, 6, 3)).unwrap());
        assert!(db.corrections().unwrap().is_empty());
    }

    #[test]
    fn purge_orphans_keeps_settings_device() {
        let db = Database::open_in_memory().unwrap();
        for device in ["dev-1", "stray"] {
            db.conn
                .execute(
                    "INSERT INTO ledger (device_id, date, category) VALUES (?1, '2024-06-03', 'workday')",
                    params![device],
                )
                .unwrap();
        }

        assert_eq!(db.purge_orphans("dev-1").unwrap(), 1);
        assert!(db.ledger_entry("dev-1", date(2024, 6, 3)).unwrap().is_some());
        assert!(db.ledger_entry("stray", date(2024, 6, 3)).unwrap().is_none());
    }
}
