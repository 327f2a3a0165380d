//! The accrual engine: every write path that touches the ledger.
//!
//! Heartbeats increment recorded minutes one row at a time; settings and
//! holiday edits recompute the materialized `time_required` column in bulk.
//! Keeping all of these in one module is what makes the "only two writers"
//! rule checkable.

use chrono::NaiveDate;
use rusqlite::{Connection, params};

use hb_core::{DayCategory, LedgerEntry, OverrideKind, Settings};

use crate::{Database, DbError, date_to_sql, ledger_entry_on, save_settings_on};

/// Counts reported back from a holiday/leave range application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HolidayRangeOutcome {
    /// Days created or upgraded.
    pub added: usize,
    /// Days left untouched (weekends/holidays for leave requests, or
    /// higher-precedence categories already stored).
    pub skipped: usize,
}

/// Counts reported back from a range materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterializeOutcome {
    pub created: usize,
    pub updated: usize,
    /// Rows that failed in the row-at-a-time fallback pass.
    pub failed: usize,
}

impl Database {
    /// Records one heartbeat: fetch-or-create today's row and add one minute.
    ///
    /// Created rows default to `workday` with the requirement taken from
    /// settings; the increment itself is a single UPSERT, so concurrent
    /// heartbeats for the same device-day cannot lose updates. Recorded
    /// minutes have no upper bound here.
    pub fn record_heartbeat(
        &mut self,
        device_id: &str,
        today: NaiveDate,
    ) -> Result<LedgerEntry, DbError> {
        let settings = self.settings_or_default(device_id, today)?;
        let required = DayCategory::Workday.required_minutes(settings.daily_required_minutes);

        self.conn.execute(
            "
            INSERT INTO ledger (device_id, date, category, time_recorded, time_required)
            VALUES (?1, ?2, ?3, 1, ?4)
            ON CONFLICT(device_id, date) DO UPDATE SET
                time_recorded = time_recorded + 1
            ",
            params![
                device_id,
                date_to_sql(today),
                DayCategory::Workday.as_str(),
                required
            ],
        )?;

        let entry = self
            .ledger_entry(device_id, today)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
        tracing::debug!(
            device_id,
            date = %today,
            minutes = entry.time_recorded,
            "heartbeat recorded"
        );
        Ok(entry)
    }

    /// Returns the configured settings, creating month-of-today defaults for
    /// the given device when none exist yet.
    pub fn settings_or_default(
        &mut self,
        device_id: &str,
        today: NaiveDate,
    ) -> Result<Settings, DbError> {
        if let Some(settings) = self.settings()? {
            return Ok(settings);
        }
        let defaults = Settings::default_for_month(device_id, today)?;
        self.save_settings(&defaults)?;
        tracing::info!(device_id, "initialized default settings");
        Ok(defaults)
    }

    /// Persists new settings and recomputes `time_required` for every ledger
    /// row of the settings device from the row's existing category.
    ///
    /// Categories are not altered by a requirement change, and recorded
    /// minutes are never rewritten, so re-applying the same settings is a
    /// no-op.
    pub fn apply_settings_change(&mut self, settings: &Settings) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        save_settings_on(&tx, settings)?;
        tx.execute(
            "DELETE FROM ledger WHERE device_id != ?1",
            params![settings.device_id],
        )?;
        // The ELSE arm covers workday and the defensive unknown-as-workday
        // decode rule.
        tx.execute(
            "
            UPDATE ledger SET time_required = CASE category
                WHEN 'weekend' THEN 0
                WHEN 'full_leave' THEN 0
                WHEN 'holiday' THEN 0
                WHEN 'half_leave' THEN ?1 / 2
                ELSE ?1
            END
            WHERE device_id = ?2
            ",
            params![settings.daily_required_minutes, settings.device_id],
        )?;
        tx.commit()?;
        tracing::info!(
            device_id = %settings.device_id,
            daily_required_minutes = settings.daily_required_minutes,
            "settings applied, requirements recomputed"
        );
        Ok(())
    }

    /// Pre-populates the settings span: missing days get a classified row,
    /// existing days get their requirement recomputed from their stored
    /// category.
    ///
    /// Runs as one transaction; if that fails, falls back to one row at a
    /// time so a single bad row cannot block the whole batch.
    pub fn materialize_range(
        &mut self,
        settings: &Settings,
    ) -> Result<MaterializeOutcome, DbError> {
        self.purge_orphans(&settings.device_id)?;

        match self.materialize_bulk(settings) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "bulk materialization failed, retrying row by row"
                );
                Ok(self.materialize_fallback(settings))
            }
        }
    }

    fn materialize_bulk(&mut self, settings: &Settings) -> Result<MaterializeOutcome, DbError> {
        let tx = self.conn.transaction()?;
        let mut outcome = MaterializeOutcome::default();
        for date in span_days(settings.start_date, settings.end_date) {
            if materialize_day(&tx, settings, date)? {
                outcome.created += 1;
            } else {
                outcome.updated += 1;
            }
        }
        tx.commit()?;
        Ok(outcome)
    }

    fn materialize_fallback(&mut self, settings: &Settings) -> MaterializeOutcome {
        let mut outcome = MaterializeOutcome::default();
        for date in span_days(settings.start_date, settings.end_date) {
            match materialize_day(&self.conn, settings, date) {
                Ok(true) => outcome.created += 1,
                Ok(false) => outcome.updated += 1,
                Err(err) => {
                    outcome.failed += 1;
                    tracing::warn!(date = %date, error = %err, "failed to materialize day");
                }
            }
        }
        outcome
    }

    /// Applies a holiday or leave to every date in the inclusive range.
    ///
    /// Leave requests skip days that are already off (weekends and stored
    /// holidays); otherwise the stored category is upgraded only when the
    /// requested kind has equal-or-higher precedence. A prior holiday is
    /// never downgraded by a later leave request.
    pub fn apply_holiday_range(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        kind: OverrideKind,
        description: &str,
    ) -> Result<HolidayRangeOutcome, DbError> {
        let settings = self.settings()?.ok_or(DbError::SettingsMissing)?;
        self.purge_orphans(&settings.device_id)?;

        let description = if description.trim().is_empty() {
            kind.default_description()
        } else {
            description.trim()
        };
        let category = kind.category();
        let required = category.required_minutes(settings.daily_required_minutes);

        let tx = self.conn.transaction()?;
        let mut outcome = HolidayRangeOutcome::default();

        for date in span_days(start, end) {
            let existing = ledger_entry_on(&tx, &settings.device_id, date)?;

            let day_is_off = settings.working_days.classify(date) == DayCategory::Weekend
                || existing
                    .as_ref()
                    .is_some_and(|entry| entry.category == DayCategory::Holiday);
            if kind.is_leave() && day_is_off {
                outcome.skipped += 1;
                continue;
            }

            match existing {
                Some(entry) if entry.category > category => {
                    outcome.skipped += 1;
                }
                Some(_) => {
                    tx.execute(
                        "
                        UPDATE ledger
                        SET category = ?1, description = ?2, time_required = ?3
                        WHERE device_id = ?4 AND date = ?5
                        ",
                        params![
                            category.as_str(),
                            description,
                            required,
                            settings.device_id,
                            date_to_sql(date)
                        ],
                    )?;
                    outcome.added += 1;
                }
                None => {
                    tx.execute(
                        "
                        INSERT INTO ledger
                            (device_id, date, category, time_recorded, time_required, description)
                        VALUES (?1, ?2, ?3, 0, ?4, ?5)
                        ",
                        params![
                            settings.device_id,
                            date_to_sql(date),
                            category.as_str(),
                            required,
                            description
                        ],
                    )?;
                    outcome.added += 1;
                }
            }
        }

        tx.commit()?;
        tracing::info!(
            start = %start,
            end = %end,
            category = %category,
            added = outcome.added,
            skipped = outcome.skipped,
            "holiday range applied"
        );
        Ok(outcome)
    }

    /// Reverts a holiday/leave date back to what the working-day rule says.
    ///
    /// Returns `false` when the date has no override to delete.
    pub fn delete_holiday(&mut self, date: NaiveDate) -> Result<bool, DbError> {
        let settings = self.settings()?.ok_or(DbError::SettingsMissing)?;

        let existing = ledger_entry_on(&self.conn, &settings.device_id, date)?;
        let Some(entry) = existing else {
            return Ok(false);
        };
        if !entry.category.is_override() {
            return Ok(false);
        }

        let category = settings.working_days.classify(date);
        let required = category.required_minutes(settings.daily_required_minutes);
        self.conn.execute(
            "
            UPDATE ledger
            SET category = ?1, description = NULL, time_required = ?2
            WHERE device_id = ?3 AND date = ?4
            ",
            params![
                category.as_str(),
                required,
                settings.device_id,
                date_to_sql(date)
            ],
        )?;
        tracing::info!(date = %date, category = %category, "holiday deleted");
        Ok(true)
    }
}

/// Creates or refreshes one day of the span. Returns `true` when a row was
/// created. Existing rows keep their category and recorded minutes; only
/// the requirement is recomputed.
fn materialize_day(
    conn: &Connection,
    settings: &Settings,
    date: NaiveDate,
) -> Result<bool, DbError> {
    let existing = ledger_entry_on(conn, &settings.device_id, date)?;
    if let Some(entry) = existing {
        let required = entry
            .category
            .required_minutes(settings.daily_required_minutes);
        conn.execute(
            "UPDATE ledger SET time_required = ?1 WHERE device_id = ?2 AND date = ?3",
            params![required, settings.device_id, date_to_sql(date)],
        )?;
        return Ok(false);
    }

    let category = settings.working_days.classify(date);
    let required = category.required_minutes(settings.daily_required_minutes);
    conn.execute(
        "
        INSERT INTO ledger (device_id, date, category, time_recorded, time_required)
        VALUES (?1, ?2, ?3, 0, ?4)
        ",
        params![
            settings.device_id,
            date_to_sql(date),
            category.as_str(),
            required
        ],
    )?;
    Ok(true)
}

fn span_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |date| *date <= end)
}
