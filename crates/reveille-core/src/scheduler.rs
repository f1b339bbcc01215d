//! Alarm scheduling against the exact-timer facility.
//!
//! The protocol is cancel-first: every call wipes the alarm's whole slot
//! range before submitting anything new, so repeated calls are idempotent
//! and a disabled alarm ends up fully unscheduled. A submission failure
//! rolls the slots back to empty -- the facility is never left with a
//! half-scheduled alarm.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::ScheduleError;
use crate::model::Alarm;
use crate::platform::{ExactTimerFacility, TriggerPayload};
use crate::slots::{RequestId, MAX_PRE_ALARMS};
use crate::trigger::next_trigger;

const MINUTE_MS: i64 = 60_000;

pub struct AlarmScheduler {
    facility: Arc<dyn ExactTimerFacility>,
    clock: Arc<dyn Clock>,
}

impl AlarmScheduler {
    pub fn new(facility: Arc<dyn ExactTimerFacility>, clock: Arc<dyn Clock>) -> Self {
        Self { facility, clock }
    }

    /// Permission probe, passed through to the facility.
    pub fn can_schedule_exact(&self) -> bool {
        self.facility.can_schedule_exact()
    }

    /// (Re)schedule an alarm: cancel everything it may own, then submit the
    /// main trigger and any pre-alarms still in the future.
    ///
    /// Returns the main trigger instant in epoch milliseconds, or `None`
    /// when the alarm was only unscheduled (disabled, or no valid trigger).
    pub fn schedule(&self, alarm: &Alarm) -> Result<Option<i64>, ScheduleError> {
        if !self.facility.can_schedule_exact() {
            return Err(ScheduleError::PermissionDenied);
        }

        self.cancel(alarm.id);

        if !alarm.enabled {
            debug!(alarm_id = alarm.id, "alarm disabled, left unscheduled");
            return Ok(None);
        }

        let now_local = self.clock.now_local();
        let Some(trigger) = next_trigger(alarm.time, alarm.repeat_days, now_local) else {
            warn!(alarm_id = alarm.id, "no trigger instant found");
            return Ok(None);
        };
        let Some(main_ms) = self.clock.epoch_ms(trigger).filter(|ms| *ms > 0) else {
            warn!(alarm_id = alarm.id, %trigger, "trigger instant does not map to an epoch time");
            return Ok(None);
        };

        if let Err(err) = self.submit_slots(alarm, main_ms) {
            // Roll back so a failure leaves the alarm fully unscheduled.
            self.cancel(alarm.id);
            return Err(err.into());
        }

        debug!(
            alarm_id = alarm.id,
            trigger_at_ms = main_ms,
            pre_alarms = alarm.pre_alarm_count,
            "alarm scheduled"
        );
        Ok(Some(main_ms))
    }

    fn submit_slots(&self, alarm: &Alarm, main_ms: i64) -> Result<(), crate::error::FacilityError> {
        self.facility.submit_exact(
            RequestId::main(alarm.id),
            main_ms,
            TriggerPayload::main(alarm.id),
        )?;

        let interval_ms = i64::from(alarm.pre_alarm_interval_minutes) * MINUTE_MS;
        let now_ms = self.clock.now_ms();
        for i in 1..=alarm.pre_alarm_count.min(MAX_PRE_ALARMS) {
            let pre_ms = main_ms - i64::from(i) * interval_ms;
            if pre_ms <= now_ms {
                // Never schedule a pre-alarm in the past; skip, don't clamp.
                debug!(alarm_id = alarm.id, index = i, "pre-alarm already past, skipped");
                continue;
            }
            self.facility.submit_exact(
                RequestId::pre_alarm(alarm.id, i),
                pre_ms,
                TriggerPayload::pre_alarm(alarm.id, i),
            )?;
        }
        Ok(())
    }

    /// Submit a single one-shot snooze firing at `now + snooze_minutes`.
    ///
    /// Reuses the alarm's main slot id on purpose: a pending main trigger
    /// for the same alarm is superseded by the snooze.
    pub fn schedule_snooze(&self, alarm: &Alarm) -> Result<i64, ScheduleError> {
        if !self.facility.can_schedule_exact() {
            return Err(ScheduleError::PermissionDenied);
        }
        let at_ms = self.clock.now_ms() + i64::from(alarm.snooze_minutes) * MINUTE_MS;
        self.facility
            .submit_exact(RequestId::main(alarm.id), at_ms, TriggerPayload::main(alarm.id))?;
        debug!(alarm_id = alarm.id, trigger_at_ms = at_ms, "snooze scheduled");
        Ok(at_ms)
    }

    /// Best-effort cancellation of every slot the alarm could own.
    pub fn cancel(&self, alarm_id: i64) {
        for id in RequestId::all_for_cancel(alarm_id) {
            self.facility.cancel(id);
        }
    }
}
