//! Interfaces to the platform collaborators.
//!
//! The core never talks to a database, an OS alarm service or a screen
//! directly; it goes through these traits. A trigger arriving from the
//! facility is just a [`TriggerPayload`] -- the ringing session is built
//! from that payload plus a store lookup, independent of how the wake-up
//! was delivered.

use serde::{Deserialize, Serialize};

use crate::error::{FacilityError, StoreError};
use crate::model::{Alarm, Timer};
use crate::slots::RequestId;

/// Inbound wake-up event delivered when a scheduled slot fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPayload {
    pub alarm_id: i64,
    pub is_pre_alarm: bool,
    pub pre_alarm_index: u32,
}

impl TriggerPayload {
    pub fn main(alarm_id: i64) -> Self {
        Self {
            alarm_id,
            is_pre_alarm: false,
            pre_alarm_index: 0,
        }
    }

    pub fn pre_alarm(alarm_id: i64, index: u32) -> Self {
        Self {
            alarm_id,
            is_pre_alarm: true,
            pre_alarm_index: index,
        }
    }
}

/// What kind of alert surface to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Alarm,
    PreAlarm,
    Timer,
}

/// Payload handed to the presentation sink when a surface opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AlertPayload {
    Alarm {
        alarm_id: i64,
        is_pre_alarm: bool,
        label: String,
    },
    Timer {
        timer_id: i64,
        label: String,
    },
}

/// Opaque handle to an open alert surface.
pub type SurfaceId = String;

/// Persistent record store for alarms and timers.
///
/// The sessions use only the lookup and state-mutation subset; the CRUD
/// entries exist for the outer create/update/toggle layer and the CLI.
/// Implementations serialize per-record writes.
pub trait RecordStore: Send + Sync {
    fn get_alarm(&self, id: i64) -> Result<Option<Alarm>, StoreError>;
    fn get_enabled_alarms(&self) -> Result<Vec<Alarm>, StoreError>;
    fn list_alarms(&self) -> Result<Vec<Alarm>, StoreError>;
    /// Insert when `alarm.id` is 0, update otherwise. Returns the id.
    fn save_alarm(&self, alarm: &Alarm) -> Result<i64, StoreError>;
    fn delete_alarm(&self, id: i64) -> Result<(), StoreError>;
    fn update_snooze_count(&self, id: i64, count: u32) -> Result<(), StoreError>;
    fn reset_snooze_count(&self, id: i64) -> Result<(), StoreError>;

    fn get_timer(&self, id: i64) -> Result<Option<Timer>, StoreError>;
    fn list_timers(&self) -> Result<Vec<Timer>, StoreError>;
    fn insert_timer(&self, timer: &Timer) -> Result<i64, StoreError>;
    fn update_timer(&self, timer: &Timer) -> Result<(), StoreError>;
    fn update_timer_state(&self, id: i64, running: bool, paused: bool) -> Result<(), StoreError>;
    /// Mark finished: `finished = true`, `remaining = 0`, not running.
    fn mark_timer_finished(&self, id: i64) -> Result<(), StoreError>;
    fn delete_timer(&self, id: i64) -> Result<(), StoreError>;
}

/// The platform's exact-timer service.
///
/// Submissions are exact, wake-capable and user-visible: a scheduled slot
/// must survive idle and low-power states and show up as a pending alert.
/// There is no inexact mode.
pub trait ExactTimerFacility: Send + Sync {
    /// Whether exact scheduling is currently authorized.
    fn can_schedule_exact(&self) -> bool;

    /// Reserve `id` to fire `payload` at `trigger_at_ms`. Re-submitting an
    /// id supersedes the previous reservation.
    fn submit_exact(
        &self,
        id: RequestId,
        trigger_at_ms: i64,
        payload: TriggerPayload,
    ) -> Result<(), FacilityError>;

    /// Release a slot. Cancelling an absent slot is a no-op, never an error.
    fn cancel(&self, id: RequestId);
}

/// Foreground presentation sink: full-screen alerts and progress updates.
pub trait AlertSink: Send + Sync {
    fn open_alert_surface(&self, kind: AlertKind, payload: &AlertPayload) -> SurfaceId;
    fn update_progress(&self, surface: &SurfaceId, remaining_ms: i64, total_ms: i64, paused: bool);
    /// Closing an already-closed surface is a no-op.
    fn close_alert_surface(&self, surface: &SurfaceId);
}

/// Sink that drops everything. For headless use and tests.
#[derive(Debug, Default)]
pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn open_alert_surface(&self, _kind: AlertKind, _payload: &AlertPayload) -> SurfaceId {
        uuid::Uuid::new_v4().to_string()
    }

    fn update_progress(&self, _surface: &SurfaceId, _remaining_ms: i64, _total_ms: i64, _paused: bool) {}

    fn close_alert_surface(&self, _surface: &SurfaceId) {}
}
