//! In-memory record store for tests and headless use.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::lock;
use crate::model::{Alarm, Timer};
use crate::platform::RecordStore;

#[derive(Default)]
struct Inner {
    alarms: BTreeMap<i64, Alarm>,
    timers: BTreeMap<i64, Timer>,
    next_alarm_id: i64,
    next_timer_id: i64,
}

/// [`RecordStore`] backed by plain maps. Writes are serialized by a single
/// mutex, matching the per-record consistency the sessions assume.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get_alarm(&self, id: i64) -> Result<Option<Alarm>, StoreError> {
        Ok(lock(&self.inner).alarms.get(&id).cloned())
    }

    fn get_enabled_alarms(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(lock(&self.inner)
            .alarms
            .values()
            .filter(|a| a.enabled)
            .cloned()
            .collect())
    }

    fn list_alarms(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(lock(&self.inner).alarms.values().cloned().collect())
    }

    fn save_alarm(&self, alarm: &Alarm) -> Result<i64, StoreError> {
        let mut inner = lock(&self.inner);
        let id = if alarm.id == 0 {
            inner.next_alarm_id += 1;
            inner.next_alarm_id
        } else {
            alarm.id
        };
        let mut stored = alarm.clone();
        stored.id = id;
        inner.alarms.insert(id, stored);
        Ok(id)
    }

    fn delete_alarm(&self, id: i64) -> Result<(), StoreError> {
        lock(&self.inner).alarms.remove(&id);
        Ok(())
    }

    fn update_snooze_count(&self, id: i64, count: u32) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        let alarm = inner.alarms.get_mut(&id).ok_or(StoreError::NotFound)?;
        alarm.snooze_count = count;
        Ok(())
    }

    fn reset_snooze_count(&self, id: i64) -> Result<(), StoreError> {
        if let Some(alarm) = lock(&self.inner).alarms.get_mut(&id) {
            alarm.snooze_count = 0;
        }
        Ok(())
    }

    fn get_timer(&self, id: i64) -> Result<Option<Timer>, StoreError> {
        Ok(lock(&self.inner).timers.get(&id).cloned())
    }

    fn list_timers(&self) -> Result<Vec<Timer>, StoreError> {
        Ok(lock(&self.inner).timers.values().cloned().collect())
    }

    fn insert_timer(&self, timer: &Timer) -> Result<i64, StoreError> {
        let mut inner = lock(&self.inner);
        inner.next_timer_id += 1;
        let id = inner.next_timer_id;
        let mut stored = timer.clone();
        stored.id = id;
        inner.timers.insert(id, stored);
        Ok(id)
    }

    fn update_timer(&self, timer: &Timer) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        if !inner.timers.contains_key(&timer.id) {
            return Err(StoreError::NotFound);
        }
        inner.timers.insert(timer.id, timer.clone());
        Ok(())
    }

    fn update_timer_state(&self, id: i64, running: bool, paused: bool) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        let timer = inner.timers.get_mut(&id).ok_or(StoreError::NotFound)?;
        timer.running = running;
        timer.paused = paused;
        Ok(())
    }

    fn mark_timer_finished(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        let timer = inner.timers.get_mut(&id).ok_or(StoreError::NotFound)?;
        timer.finished = true;
        timer.running = false;
        timer.paused = false;
        timer.remaining_ms = 0;
        Ok(())
    }

    fn delete_timer(&self, id: i64) -> Result<(), StoreError> {
        lock(&self.inner).timers.remove(&id);
        Ok(())
    }
}
