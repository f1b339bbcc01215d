//! SQLite-backed record store.
//!
//! One `alarms` table and one `timers` table, mapped 1:1 onto the domain
//! models. The connection sits behind a mutex so the store satisfies the
//! per-record write serialization the sessions assume.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{NaiveTime, Timelike, Utc};
use rusqlite::{params, Connection, Row};

use crate::error::StoreError;
use crate::lock;
use crate::model::{Alarm, Timer, WeekdaySet};
use crate::platform::RecordStore;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (and create if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: PathBuf::from(path),
            source,
        })?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn migrate(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS alarms (
                id                         INTEGER PRIMARY KEY AUTOINCREMENT,
                hour                       INTEGER NOT NULL,
                minute                     INTEGER NOT NULL,
                enabled                    INTEGER NOT NULL DEFAULT 1,
                label                      TEXT NOT NULL DEFAULT '',
                tone                       TEXT NOT NULL DEFAULT 'default',
                repeat_days                INTEGER NOT NULL DEFAULT 0,
                vibrate                    INTEGER NOT NULL DEFAULT 1,
                flash                      INTEGER NOT NULL DEFAULT 0,
                gradual_volume             INTEGER NOT NULL DEFAULT 1,
                volume                     INTEGER NOT NULL DEFAULT 80,
                snooze_enabled             INTEGER NOT NULL DEFAULT 1,
                snooze_minutes             INTEGER NOT NULL DEFAULT 10,
                snooze_count               INTEGER NOT NULL DEFAULT 0,
                max_snooze_count           INTEGER NOT NULL DEFAULT 3,
                pre_alarm_count            INTEGER NOT NULL DEFAULT 0,
                pre_alarm_interval_minutes INTEGER NOT NULL DEFAULT 7,
                created_at_ms              INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS timers (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                label         TEXT NOT NULL DEFAULT '',
                duration_ms   INTEGER NOT NULL,
                remaining_ms  INTEGER NOT NULL,
                running       INTEGER NOT NULL DEFAULT 0,
                paused        INTEGER NOT NULL DEFAULT 0,
                finished      INTEGER NOT NULL DEFAULT 0,
                started_at_ms INTEGER NOT NULL DEFAULT 0,
                paused_at_ms  INTEGER NOT NULL DEFAULT 0,
                end_at_ms     INTEGER NOT NULL DEFAULT 0,
                vibrate       INTEGER NOT NULL DEFAULT 1,
                created_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alarms_enabled ON alarms(enabled);
            CREATE INDEX IF NOT EXISTS idx_timers_running ON timers(running, paused);",
        )?;
        Ok(())
    }
}

fn alarm_from_row(row: &Row<'_>) -> rusqlite::Result<Alarm> {
    let hour: u32 = row.get("hour")?;
    let minute: u32 = row.get("minute")?;
    Ok(Alarm {
        id: row.get("id")?,
        time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default(),
        enabled: row.get("enabled")?,
        label: row.get("label")?,
        tone: row.get("tone")?,
        repeat_days: WeekdaySet::from_bits(row.get::<_, u8>("repeat_days")?),
        vibrate: row.get("vibrate")?,
        flash: row.get("flash")?,
        gradual_volume: row.get("gradual_volume")?,
        volume: row.get("volume")?,
        snooze_enabled: row.get("snooze_enabled")?,
        snooze_minutes: row.get("snooze_minutes")?,
        snooze_count: row.get("snooze_count")?,
        max_snooze_count: row.get("max_snooze_count")?,
        pre_alarm_count: row.get("pre_alarm_count")?,
        pre_alarm_interval_minutes: row.get("pre_alarm_interval_minutes")?,
        created_at_ms: row.get("created_at_ms")?,
    })
}

fn timer_from_row(row: &Row<'_>) -> rusqlite::Result<Timer> {
    Ok(Timer {
        id: row.get("id")?,
        label: row.get("label")?,
        duration_ms: row.get("duration_ms")?,
        remaining_ms: row.get("remaining_ms")?,
        running: row.get("running")?,
        paused: row.get("paused")?,
        finished: row.get("finished")?,
        started_at_ms: row.get("started_at_ms")?,
        paused_at_ms: row.get("paused_at_ms")?,
        end_at_ms: row.get("end_at_ms")?,
        vibrate: row.get("vibrate")?,
        created_at_ms: row.get("created_at_ms")?,
    })
}

const ALARM_COLUMNS: &str = "id, hour, minute, enabled, label, tone, repeat_days, vibrate, flash, \
    gradual_volume, volume, snooze_enabled, snooze_minutes, snooze_count, max_snooze_count, \
    pre_alarm_count, pre_alarm_interval_minutes, created_at_ms";

const TIMER_COLUMNS: &str = "id, label, duration_ms, remaining_ms, running, paused, finished, \
    started_at_ms, paused_at_ms, end_at_ms, vibrate, created_at_ms";

impl RecordStore for Database {
    fn get_alarm(&self, id: i64) -> Result<Option<Alarm>, StoreError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(&format!("SELECT {ALARM_COLUMNS} FROM alarms WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], alarm_from_row)?;
        Ok(rows.next().transpose()?)
    }

    fn get_enabled_alarms(&self) -> Result<Vec<Alarm>, StoreError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {ALARM_COLUMNS} FROM alarms WHERE enabled = 1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([], alarm_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn list_alarms(&self) -> Result<Vec<Alarm>, StoreError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(&format!("SELECT {ALARM_COLUMNS} FROM alarms ORDER BY id"))?;
        let rows = stmt.query_map([], alarm_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn save_alarm(&self, alarm: &Alarm) -> Result<i64, StoreError> {
        let conn = lock(&self.conn);
        let created_at_ms = if alarm.created_at_ms > 0 {
            alarm.created_at_ms
        } else {
            Utc::now().timestamp_millis()
        };
        if alarm.id == 0 {
            conn.execute(
                "INSERT INTO alarms (hour, minute, enabled, label, tone, repeat_days, vibrate,
                    flash, gradual_volume, volume, snooze_enabled, snooze_minutes, snooze_count,
                    max_snooze_count, pre_alarm_count, pre_alarm_interval_minutes, created_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    alarm.time.hour(),
                    alarm.time.minute(),
                    alarm.enabled,
                    alarm.label,
                    alarm.tone,
                    alarm.repeat_days.bits(),
                    alarm.vibrate,
                    alarm.flash,
                    alarm.gradual_volume,
                    alarm.volume,
                    alarm.snooze_enabled,
                    alarm.snooze_minutes,
                    alarm.snooze_count,
                    alarm.max_snooze_count,
                    alarm.pre_alarm_count,
                    alarm.pre_alarm_interval_minutes,
                    created_at_ms,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        } else {
            conn.execute(
                "UPDATE alarms SET hour = ?2, minute = ?3, enabled = ?4, label = ?5, tone = ?6,
                    repeat_days = ?7, vibrate = ?8, flash = ?9, gradual_volume = ?10, volume = ?11,
                    snooze_enabled = ?12, snooze_minutes = ?13, snooze_count = ?14,
                    max_snooze_count = ?15, pre_alarm_count = ?16, pre_alarm_interval_minutes = ?17
                 WHERE id = ?1",
                params![
                    alarm.id,
                    alarm.time.hour(),
                    alarm.time.minute(),
                    alarm.enabled,
                    alarm.label,
                    alarm.tone,
                    alarm.repeat_days.bits(),
                    alarm.vibrate,
                    alarm.flash,
                    alarm.gradual_volume,
                    alarm.volume,
                    alarm.snooze_enabled,
                    alarm.snooze_minutes,
                    alarm.snooze_count,
                    alarm.max_snooze_count,
                    alarm.pre_alarm_count,
                    alarm.pre_alarm_interval_minutes,
                ],
            )?;
            Ok(alarm.id)
        }
    }

    fn delete_alarm(&self, id: i64) -> Result<(), StoreError> {
        lock(&self.conn).execute("DELETE FROM alarms WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn update_snooze_count(&self, id: i64, count: u32) -> Result<(), StoreError> {
        let changed = lock(&self.conn).execute(
            "UPDATE alarms SET snooze_count = ?2 WHERE id = ?1",
            params![id, count],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn reset_snooze_count(&self, id: i64) -> Result<(), StoreError> {
        lock(&self.conn).execute(
            "UPDATE alarms SET snooze_count = 0 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    fn get_timer(&self, id: i64) -> Result<Option<Timer>, StoreError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(&format!("SELECT {TIMER_COLUMNS} FROM timers WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], timer_from_row)?;
        Ok(rows.next().transpose()?)
    }

    fn list_timers(&self) -> Result<Vec<Timer>, StoreError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(&format!("SELECT {TIMER_COLUMNS} FROM timers ORDER BY id"))?;
        let rows = stmt.query_map([], timer_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn insert_timer(&self, timer: &Timer) -> Result<i64, StoreError> {
        let conn = lock(&self.conn);
        conn.execute(
            "INSERT INTO timers (label, duration_ms, remaining_ms, running, paused, finished,
                started_at_ms, paused_at_ms, end_at_ms, vibrate, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                timer.label,
                timer.duration_ms,
                timer.remaining_ms,
                timer.running,
                timer.paused,
                timer.finished,
                timer.started_at_ms,
                timer.paused_at_ms,
                timer.end_at_ms,
                timer.vibrate,
                timer.created_at_ms,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_timer(&self, timer: &Timer) -> Result<(), StoreError> {
        let changed = lock(&self.conn).execute(
            "UPDATE timers SET label = ?2, duration_ms = ?3, remaining_ms = ?4, running = ?5,
                paused = ?6, finished = ?7, started_at_ms = ?8, paused_at_ms = ?9, end_at_ms = ?10,
                vibrate = ?11
             WHERE id = ?1",
            params![
                timer.id,
                timer.label,
                timer.duration_ms,
                timer.remaining_ms,
                timer.running,
                timer.paused,
                timer.finished,
                timer.started_at_ms,
                timer.paused_at_ms,
                timer.end_at_ms,
                timer.vibrate,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn update_timer_state(&self, id: i64, running: bool, paused: bool) -> Result<(), StoreError> {
        let changed = lock(&self.conn).execute(
            "UPDATE timers SET running = ?2, paused = ?3 WHERE id = ?1",
            params![id, running, paused],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn mark_timer_finished(&self, id: i64) -> Result<(), StoreError> {
        let changed = lock(&self.conn).execute(
            "UPDATE timers SET finished = 1, running = 0, paused = 0, remaining_ms = 0 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn delete_timer(&self, id: i64) -> Result<(), StoreError> {
        lock(&self.conn).execute("DELETE FROM timers WHERE id = ?1", params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn db() -> Database {
        Database::open_in_memory().expect("open")
    }

    #[test]
    fn alarm_round_trip() {
        let db = db();
        let mut alarm = Alarm::new(NaiveTime::from_hms_opt(6, 45, 0).expect("valid time"));
        alarm.label = "workout".into();
        alarm.repeat_days = WeekdaySet::from_days(&[Weekday::Mon, Weekday::Wed, Weekday::Fri]);
        alarm.flash = true;
        alarm.volume = 95;
        alarm.pre_alarm_count = 2;

        let id = db.save_alarm(&alarm).expect("save");
        let loaded = db.get_alarm(id).expect("get").expect("alarm");
        assert_eq!(loaded.time, alarm.time);
        assert_eq!(loaded.label, "workout");
        assert_eq!(loaded.repeat_days, alarm.repeat_days);
        assert!(loaded.flash);
        assert_eq!(loaded.volume, 95);
        assert_eq!(loaded.pre_alarm_count, 2);
        assert!(loaded.created_at_ms > 0);
    }

    #[test]
    fn update_keeps_the_id() {
        let db = db();
        let alarm = Alarm::new(NaiveTime::from_hms_opt(7, 0, 0).expect("valid time"));
        let id = db.save_alarm(&alarm).expect("save");

        let mut loaded = db.get_alarm(id).expect("get").expect("alarm");
        loaded.enabled = false;
        loaded.label = "off".into();
        assert_eq!(db.save_alarm(&loaded).expect("save"), id);
        assert_eq!(db.list_alarms().expect("list").len(), 1);
        assert!(db.get_enabled_alarms().expect("enabled").is_empty());
    }

    #[test]
    fn snooze_counter_updates() {
        let db = db();
        let id = db
            .save_alarm(&Alarm::new(NaiveTime::from_hms_opt(7, 0, 0).expect("valid time")))
            .expect("save");

        db.update_snooze_count(id, 3).expect("update");
        assert_eq!(db.get_alarm(id).expect("get").expect("alarm").snooze_count, 3);
        db.reset_snooze_count(id).expect("reset");
        assert_eq!(db.get_alarm(id).expect("get").expect("alarm").snooze_count, 0);
        assert!(matches!(
            db.update_snooze_count(999, 1),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn timer_round_trip_and_finish() {
        let db = db();
        let timer = Timer::new("tea", 300_000, true, 1_000);
        let id = db.insert_timer(&timer).expect("insert");

        let mut loaded = db.get_timer(id).expect("get").expect("timer");
        assert_eq!(loaded.duration_ms, 300_000);
        assert!(loaded.running);

        loaded.remaining_ms = 120_000;
        loaded.paused = true;
        loaded.running = false;
        db.update_timer(&loaded).expect("update");
        let reloaded = db.get_timer(id).expect("get").expect("timer");
        assert_eq!(reloaded.remaining_ms, 120_000);
        assert!(reloaded.paused);

        db.update_timer_state(id, true, false).expect("state");
        let resumed = db.get_timer(id).expect("get").expect("timer");
        assert!(resumed.running);
        assert!(!resumed.paused);

        db.mark_timer_finished(id).expect("finish");
        let finished = db.get_timer(id).expect("get").expect("timer");
        assert!(finished.finished);
        assert_eq!(finished.remaining_ms, 0);
    }

    #[test]
    fn opens_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("reveille.db");
        {
            let db = Database::open(&path).expect("open");
            db.save_alarm(&Alarm::new(NaiveTime::from_hms_opt(7, 0, 0).expect("valid time")))
                .expect("save");
        }
        let db = Database::open(&path).expect("reopen");
        assert_eq!(db.list_alarms().expect("list").len(), 1);
    }
}
