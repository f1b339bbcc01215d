//! Ringing session: the life of a firing alarm.
//!
//! ```text
//! Starting -> Ringing -> { Snoozed, Dismissed }
//! ```
//!
//! A session is built from the trigger payload plus a store lookup and
//! nothing else. Entry actions (sound, vibration, flash) are independent:
//! a device that fails to start is logged and skipped, never fatal. Both
//! exits tear down every effect, abort the volume-ramp task and close the
//! alert surface; snooze additionally re-enters the scheduler with a
//! single one-shot slot keyed by the alarm's main request id.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::SessionContext;
use crate::effects::{FlashDevice, SoundDevice, VibrationDevice};
use crate::error::CoreError;
use crate::lock;
use crate::model::Alarm;
use crate::platform::{AlertKind, AlertPayload, AlertSink, RecordStore, SurfaceId, TriggerPayload};

/// Volume climbs from silence to the target over this window.
const GRADUAL_VOLUME_WINDOW_MS: u64 = 60_000;
const GRADUAL_VOLUME_STEPS: u32 = 20;

const VIBRATION_ON_MS: u64 = 1000;
const VIBRATION_OFF_MS: u64 = 500;
const FLASH_ON_MS: u64 = 1000;
const FLASH_OFF_MS: u64 = 500;

/// How a ringing session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingOutcome {
    Dismissed,
    Snoozed { until_ms: i64 },
}

/// One currently-ringing alarm.
pub struct RingingSession {
    alarm_id: i64,
    is_pre_alarm: bool,
    surface: Mutex<Option<SurfaceId>>,
    ramp_task: Mutex<Option<JoinHandle<()>>>,
    terminated: AtomicBool,
}

impl RingingSession {
    pub fn new(payload: TriggerPayload) -> Self {
        Self {
            alarm_id: payload.alarm_id,
            is_pre_alarm: payload.is_pre_alarm,
            surface: Mutex::new(None),
            ramp_task: Mutex::new(None),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn alarm_id(&self) -> i64 {
        self.alarm_id
    }

    pub fn is_pre_alarm(&self) -> bool {
        self.is_pre_alarm
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Ringing entry actions: open the alert surface and start the effects.
    ///
    /// Must run inside a tokio runtime (the volume ramp is a spawned task).
    pub(super) fn ring(&self, ctx: &SessionContext, alarm: &Alarm) {
        let kind = if self.is_pre_alarm {
            AlertKind::PreAlarm
        } else {
            AlertKind::Alarm
        };
        let payload = AlertPayload::Alarm {
            alarm_id: self.alarm_id,
            is_pre_alarm: self.is_pre_alarm,
            label: alarm.label.clone(),
        };
        *lock(&self.surface) = Some(ctx.sink.open_alert_surface(kind, &payload));

        self.start_sound(ctx, alarm);

        if alarm.vibrate {
            if let Err(err) = ctx.vibration.start_pattern(VIBRATION_ON_MS, VIBRATION_OFF_MS, true) {
                warn!(alarm_id = self.alarm_id, error = %err, "vibration failed to start");
            }
        }

        if alarm.flash && ctx.flash.has_flash() {
            if let Err(err) = ctx.flash.start_pattern(FLASH_ON_MS, FLASH_OFF_MS) {
                warn!(alarm_id = self.alarm_id, error = %err, "flash failed to start");
            }
        }

        info!(
            alarm_id = self.alarm_id,
            pre_alarm = self.is_pre_alarm,
            "alarm ringing"
        );
    }

    fn start_sound(&self, ctx: &SessionContext, alarm: &Alarm) {
        let target = f32::from(alarm.volume.min(100)) / 100.0;
        let initial = if alarm.gradual_volume { 0.0 } else { target };

        if let Err(err) = ctx.sound.play(true, initial) {
            warn!(alarm_id = self.alarm_id, error = %err, "alarm sound failed to start");
            return;
        }

        if alarm.gradual_volume {
            let sound = Arc::clone(&ctx.sound);
            let step = target / GRADUAL_VOLUME_STEPS as f32;
            let interval =
                Duration::from_millis(GRADUAL_VOLUME_WINDOW_MS / u64::from(GRADUAL_VOLUME_STEPS));
            let handle = tokio::spawn(async move {
                for i in 1..=GRADUAL_VOLUME_STEPS {
                    tokio::time::sleep(interval).await;
                    if let Err(err) = sound.set_volume(step * i as f32) {
                        warn!(error = %err, "volume ramp step failed");
                        break;
                    }
                }
            });
            *lock(&self.ramp_task) = Some(handle);
        }
    }

    /// Stop everything and reset the persisted snooze counter.
    ///
    /// Safe to call repeatedly and from any caller; the first call wins and
    /// later ones are no-ops. Effects are torn down even if the store write
    /// fails.
    pub fn dismiss(&self, ctx: &SessionContext) -> Result<(), CoreError> {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.teardown(ctx);
        ctx.store.reset_snooze_count(self.alarm_id)?;
        info!(alarm_id = self.alarm_id, "alarm dismissed");
        Ok(())
    }

    /// Snooze: persist the bumped counter and schedule the re-fire.
    ///
    /// Falls back to [`dismiss`](Self::dismiss) when snoozing is disabled,
    /// the counter is exhausted, or the record is gone -- in all of those
    /// cases no slot is submitted and the outcome is `Dismissed`.
    pub fn snooze(&self, ctx: &SessionContext) -> Result<RingOutcome, CoreError> {
        if self.is_terminated() {
            return Ok(RingOutcome::Dismissed);
        }

        let Some(alarm) = ctx.store.get_alarm(self.alarm_id)? else {
            debug!(alarm_id = self.alarm_id, "alarm record gone, dismissing");
            self.dismiss(ctx)?;
            return Ok(RingOutcome::Dismissed);
        };

        if !alarm.can_snooze() {
            debug!(
                alarm_id = self.alarm_id,
                snooze_count = alarm.snooze_count,
                max = alarm.max_snooze_count,
                "snooze not allowed, dismissing"
            );
            self.dismiss(ctx)?;
            return Ok(RingOutcome::Dismissed);
        }

        ctx.store
            .update_snooze_count(alarm.id, alarm.snooze_count + 1)?;
        let until_ms = ctx.scheduler.schedule_snooze(&alarm)?;

        if !self.terminated.swap(true, Ordering::SeqCst) {
            self.teardown(ctx);
        }
        info!(
            alarm_id = self.alarm_id,
            until_ms,
            count = alarm.snooze_count + 1,
            "alarm snoozed"
        );
        Ok(RingOutcome::Snoozed { until_ms })
    }

    fn teardown(&self, ctx: &SessionContext) {
        if let Some(handle) = lock(&self.ramp_task).take() {
            handle.abort();
        }
        ctx.sound.stop();
        ctx.vibration.cancel();
        ctx.flash.stop();
        if let Some(surface) = lock(&self.surface).take() {
            ctx.sink.close_alert_surface(&surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::effects::{SoundDevice, StubFlash, StubSound, StubVibration};
    use crate::error::EffectError;
    use crate::facility::StubFacility;
    use crate::platform::{ExactTimerFacility, RecordStore};
    use crate::scheduler::AlarmScheduler;
    use crate::session::handle_trigger;
    use crate::slots::RequestId;
    use crate::storage::MemoryStore;
    use chrono::{NaiveDate, NaiveTime};

    struct Harness {
        ctx: Arc<SessionContext>,
        store: Arc<MemoryStore>,
        facility: Arc<StubFacility>,
        sound: Arc<StubSound>,
        vibration: Arc<StubVibration>,
        flash: Arc<StubFlash>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let now = NaiveDate::from_ymd_opt(2024, 6, 3)
            .expect("valid date")
            .and_hms_opt(7, 0, 0)
            .expect("valid time");
        let store = Arc::new(MemoryStore::new());
        let facility = Arc::new(StubFacility::new());
        let sound = Arc::new(StubSound::new());
        let vibration = Arc::new(StubVibration::new());
        let flash = Arc::new(StubFlash::new(true));
        let clock = Arc::new(ManualClock::at(now));
        let scheduler = Arc::new(AlarmScheduler::new(
            Arc::clone(&facility) as Arc<dyn ExactTimerFacility>,
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let ctx = Arc::new(SessionContext {
            store: store.clone(),
            sink: Arc::new(crate::platform::NullAlertSink),
            sound: sound.clone(),
            vibration: vibration.clone(),
            flash: flash.clone(),
            clock: clock.clone(),
            scheduler,
            sessions: Default::default(),
        });
        Harness {
            ctx,
            store,
            facility,
            sound,
            vibration,
            flash,
            clock,
        }
    }

    fn saved_alarm(store: &MemoryStore) -> Alarm {
        let mut alarm = Alarm::new(NaiveTime::from_hms_opt(7, 0, 0).expect("valid time"));
        alarm.flash = true;
        let id = store.save_alarm(&alarm).expect("save");
        alarm.id = id;
        alarm
    }

    #[tokio::test]
    async fn ringing_starts_all_effects() {
        let h = harness();
        let alarm = saved_alarm(&h.store);

        let session = handle_trigger(&h.ctx, TriggerPayload::main(alarm.id))
            .expect("handle")
            .expect("session");
        assert!(!session.is_pre_alarm());
        assert!(h.sound.is_playing());
        // Gradual volume: playback starts silent.
        assert_eq!(h.sound.volume(), 0.0);
        assert!(h.vibration.is_active());
        assert!(h.flash.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn volume_ramps_to_target() {
        let h = harness();
        let alarm = saved_alarm(&h.store);
        handle_trigger(&h.ctx, TriggerPayload::main(alarm.id))
            .expect("handle")
            .expect("session");

        tokio::time::sleep(Duration::from_millis(61_000)).await;
        // Default volume 80 -> target 0.8 after the full 60 s ramp.
        assert!((h.sound.volume() - 0.8).abs() < 1e-3);
    }

    #[tokio::test]
    async fn immediate_volume_without_ramp() {
        let h = harness();
        let mut alarm = Alarm::new(NaiveTime::from_hms_opt(7, 0, 0).expect("valid time"));
        alarm.gradual_volume = false;
        alarm.volume = 60;
        let id = h.store.save_alarm(&alarm).expect("save");

        handle_trigger(&h.ctx, TriggerPayload::main(id))
            .expect("handle")
            .expect("session");
        assert!((h.sound.volume() - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn missing_alarm_is_a_benign_no_op() {
        let h = harness();
        let session = handle_trigger(&h.ctx, TriggerPayload::main(99)).expect("handle");
        assert!(session.is_none());
        assert!(!h.sound.is_playing());
        assert!(h.ctx.sessions.ringing().is_none());
    }

    #[tokio::test]
    async fn second_trigger_for_ringing_alarm_is_ignored() {
        let h = harness();
        let alarm = saved_alarm(&h.store);
        handle_trigger(&h.ctx, TriggerPayload::main(alarm.id))
            .expect("handle")
            .expect("session");
        assert_eq!(h.sound.play_calls(), 1);

        let second = handle_trigger(&h.ctx, TriggerPayload::main(alarm.id)).expect("handle");
        assert!(second.is_none());
        // Not queued, not double-started.
        assert_eq!(h.sound.play_calls(), 1);
    }

    #[tokio::test]
    async fn dismiss_stops_everything_and_resets_snooze() {
        let h = harness();
        let mut alarm = saved_alarm(&h.store);
        alarm.snooze_count = 2;
        h.store.save_alarm(&alarm).expect("save");

        let session = handle_trigger(&h.ctx, TriggerPayload::main(alarm.id))
            .expect("handle")
            .expect("session");
        h.ctx.sessions.release_ringing(&session);
        session.dismiss(&h.ctx).expect("dismiss");
        session.dismiss(&h.ctx).expect("dismiss twice");

        assert!(!h.sound.is_playing());
        assert!(!h.vibration.is_active());
        assert!(!h.flash.is_active());
        assert!(session.is_terminated());
        let stored = h.store.get_alarm(alarm.id).expect("get").expect("alarm");
        assert_eq!(stored.snooze_count, 0);
    }

    #[tokio::test]
    async fn snooze_bumps_counter_and_reuses_main_slot() {
        let h = harness();
        let alarm = saved_alarm(&h.store);
        let session = handle_trigger(&h.ctx, TriggerPayload::main(alarm.id))
            .expect("handle")
            .expect("session");

        let outcome = session.snooze(&h.ctx).expect("snooze");
        let expected = h.clock.now_ms() + 10 * 60_000;
        assert_eq!(outcome, RingOutcome::Snoozed { until_ms: expected });

        let stored = h.store.get_alarm(alarm.id).expect("get").expect("alarm");
        assert_eq!(stored.snooze_count, 1);
        assert_eq!(h.facility.pending(), vec![(RequestId::main(alarm.id), expected)]);
        assert!(!h.sound.is_playing());
        assert!(session.is_terminated());
    }

    #[tokio::test]
    async fn snooze_at_cap_behaves_as_dismiss() {
        let h = harness();
        let mut alarm = saved_alarm(&h.store);
        alarm.snooze_count = 3;
        alarm.max_snooze_count = 3;
        h.store.save_alarm(&alarm).expect("save");

        let session = handle_trigger(&h.ctx, TriggerPayload::main(alarm.id))
            .expect("handle")
            .expect("session");
        let outcome = session.snooze(&h.ctx).expect("snooze");

        assert_eq!(outcome, RingOutcome::Dismissed);
        // No slot submitted, counter not incremented.
        assert!(h.facility.pending().is_empty());
        let stored = h.store.get_alarm(alarm.id).expect("get").expect("alarm");
        assert!(stored.snooze_count <= 3);
        assert_ne!(stored.snooze_count, 4);
        assert!(!h.sound.is_playing());
    }

    #[tokio::test]
    async fn snooze_disabled_behaves_as_dismiss() {
        let h = harness();
        let mut alarm = saved_alarm(&h.store);
        alarm.snooze_enabled = false;
        h.store.save_alarm(&alarm).expect("save");

        let session = handle_trigger(&h.ctx, TriggerPayload::main(alarm.id))
            .expect("handle")
            .expect("session");
        assert_eq!(session.snooze(&h.ctx).expect("snooze"), RingOutcome::Dismissed);
        assert!(h.facility.pending().is_empty());
    }

    #[tokio::test]
    async fn pre_alarm_rings_with_tag() {
        let h = harness();
        let alarm = saved_alarm(&h.store);
        let session = handle_trigger(&h.ctx, TriggerPayload::pre_alarm(alarm.id, 1))
            .expect("handle")
            .expect("session");
        assert!(session.is_pre_alarm());
        assert!(h.sound.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_aborts_the_ramp_task() {
        let h = harness();
        let alarm = saved_alarm(&h.store);
        let session = handle_trigger(&h.ctx, TriggerPayload::main(alarm.id))
            .expect("handle")
            .expect("session");

        session.dismiss(&h.ctx).expect("dismiss");
        tokio::time::sleep(Duration::from_millis(61_000)).await;
        // The ramp never ran after the dismissal.
        assert_eq!(h.sound.volume(), 0.0);
        assert!(!h.sound.is_playing());
    }

    struct DeadSound;

    impl SoundDevice for DeadSound {
        fn play(&self, _looped: bool, _volume: f32) -> Result<(), EffectError> {
            Err(EffectError::new("sound", "speaker unavailable"))
        }

        fn set_volume(&self, _volume: f32) -> Result<(), EffectError> {
            Err(EffectError::new("sound", "speaker unavailable"))
        }

        fn stop(&self) {}
    }

    #[tokio::test]
    async fn sound_failure_does_not_block_other_effects() {
        let h = harness();
        let alarm = saved_alarm(&h.store);
        let ctx = Arc::new(SessionContext {
            sound: Arc::new(DeadSound),
            store: h.store.clone(),
            sink: Arc::new(crate::platform::NullAlertSink),
            vibration: h.vibration.clone(),
            flash: h.flash.clone(),
            clock: h.clock.clone(),
            scheduler: Arc::clone(&h.ctx.scheduler),
            sessions: Default::default(),
        });

        handle_trigger(&ctx, TriggerPayload::main(alarm.id))
            .expect("handle")
            .expect("session");
        assert!(h.vibration.is_active());
        assert!(h.flash.is_active());
    }
}
